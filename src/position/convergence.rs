//! # Convergence Counters
//!
//! Hysteresis-windowed dwell tracking for the position control loop.
//!
//! A cycle inside the acceptance bounds adds to the dwell. Once the dwell
//! has started, cycles outside the bounds add to an excursion count; an
//! excursion longer than the grace limit resets both counts, so the full
//! dwell must be earned again.

/// Dwell and excursion counts (in control cycles) for one control loop run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceCounters {
    within_bounds: u32,
    out_of_bounds: u32,
    out_of_bounds_limit: u32,
    dwell_required: u32,
}

impl ConvergenceCounters {
    /// Creates zeroed counters.
    ///
    /// # Arguments
    ///
    /// * `out_of_bounds_limit` - Excursion cycles tolerated before a reset
    /// * `dwell_required` - In-bounds cycles needed to declare convergence
    #[must_use]
    pub fn new(out_of_bounds_limit: u32, dwell_required: u32) -> Self {
        Self {
            within_bounds: 0,
            out_of_bounds: 0,
            out_of_bounds_limit,
            dwell_required,
        }
    }

    /// Records one control cycle and reports whether the dwell is complete.
    ///
    /// # Examples
    ///
    /// ```
    /// use uav_maneuvers::position::ConvergenceCounters;
    ///
    /// let mut counters = ConvergenceCounters::new(10, 3);
    /// assert!(!counters.record(true));
    /// assert!(!counters.record(true));
    /// assert!(counters.record(true));
    /// ```
    pub fn record(&mut self, within_bounds: bool) -> bool {
        if within_bounds {
            self.within_bounds += 1;
        } else if self.within_bounds != 0 {
            self.out_of_bounds += 1;
        }

        if self.out_of_bounds > self.out_of_bounds_limit {
            self.within_bounds = 0;
            self.out_of_bounds = 0;
        }

        self.is_converged()
    }

    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.within_bounds >= self.dwell_required
    }

    /// In-bounds cycles accumulated since the last reset
    #[must_use]
    pub fn within_bounds(&self) -> u32 {
        self.within_bounds
    }

    /// Out-of-bounds cycles accumulated since the dwell started
    #[must_use]
    pub fn out_of_bounds(&self) -> u32 {
        self.out_of_bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_before_dwell_starts_is_ignored() {
        let mut counters = ConvergenceCounters::new(10, 50);
        for _ in 0..100 {
            assert!(!counters.record(false));
        }
        assert_eq!(counters.within_bounds(), 0);
        assert_eq!(counters.out_of_bounds(), 0);
    }

    #[test]
    fn test_converges_after_dwell() {
        let mut counters = ConvergenceCounters::new(10, 50);
        for cycle in 1..50 {
            assert!(!counters.record(true), "converged early at cycle {}", cycle);
        }
        assert!(counters.record(true));
    }

    #[test]
    fn test_brief_excursion_keeps_dwell() {
        let mut counters = ConvergenceCounters::new(10, 50);
        for _ in 0..30 {
            counters.record(true);
        }
        for _ in 0..10 {
            counters.record(false);
        }
        assert_eq!(counters.within_bounds(), 30);
        assert_eq!(counters.out_of_bounds(), 10);

        for _ in 0..19 {
            assert!(!counters.record(true));
        }
        assert!(counters.record(true));
    }

    #[test]
    fn test_sustained_excursion_resets_both_counters() {
        let mut counters = ConvergenceCounters::new(10, 50);
        for _ in 0..40 {
            counters.record(true);
        }
        for _ in 0..11 {
            counters.record(false);
        }
        assert_eq!(counters.within_bounds(), 0);
        assert_eq!(counters.out_of_bounds(), 0);

        // Dwell restarts from zero
        for _ in 0..49 {
            assert!(!counters.record(true));
        }
        assert!(counters.record(true));
    }

    #[test]
    fn test_interleaved_excursions_accumulate() {
        let mut counters = ConvergenceCounters::new(10, 50);
        counters.record(true);
        for _ in 0..11 {
            counters.record(false);
            counters.record(true);
        }
        // 11th excursion cycle exceeded the limit and reset, then one in-bounds cycle
        assert_eq!(counters.within_bounds(), 1);
        assert_eq!(counters.out_of_bounds(), 0);
    }
}
