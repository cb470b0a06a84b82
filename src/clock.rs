//! # Clock Module
//!
//! Time source injected into the flight state monitor and the position
//! control loop. Every inter-cycle wait goes through [`Clock::sleep`], so
//! tests and the simulator can advance virtual time instead of waiting on
//! the wall clock.

use async_trait::async_trait;
use std::time::Duration;

/// Source of inter-cycle delays
#[async_trait]
pub trait Clock: Send + Sync {
    /// Suspend the current maneuver for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_clock_sleeps() {
        let start = tokio::time::Instant::now();
        TokioClock.sleep(Duration::from_millis(5)).await;
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
