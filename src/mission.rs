//! # Mission Runner
//!
//! Executes a configured sequence of maneuvers in order and stops at the
//! first failing step. Failed steps are not retried.
//!
//! Steps are read from the `[[mission.steps]]` tables of the config file:
//!
//! ```toml
//! [[mission.steps]]
//! action = "takeoff"
//!
//! [[mission.steps]]
//! action = "move"
//! x = 0.0
//! y = 6.0
//! z = 6.0
//! yaw = 30.0
//!
//! [[mission.steps]]
//! action = "land"
//! ```

use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::error::ManeuverError;
use crate::link::{CommandChannel, TelemetryFeed};
use crate::maneuver::Maneuvers;
use crate::position::Goal;

/// One mission step
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MissionStep {
    /// Monitored takeoff
    Takeoff,
    /// Offset move; tolerances fall back to the `[position]` defaults
    Move {
        x: f64,
        y: f64,
        z: f64,
        yaw: f64,
        #[serde(default)]
        position_tolerance: Option<f64>,
        #[serde(default)]
        yaw_tolerance: Option<f64>,
    },
    /// Monitored landing
    Land,
}

impl fmt::Display for MissionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Takeoff => f.write_str("takeoff"),
            Self::Move { x, y, z, yaw, .. } => {
                write!(f, "move by ({}, {}, {}) m to yaw {}°", x, y, z, yaw)
            }
            Self::Land => f.write_str("land"),
        }
    }
}

/// Why a mission did not complete
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MissionError {
    /// Control authority was refused before the first step
    #[error("mission not started: {0}")]
    Authority(#[source] ManeuverError),

    /// Step `step` (zero-based) failed
    #[error("mission step {step} failed: {source}")]
    Step {
        step: usize,
        #[source]
        source: ManeuverError,
    },

    /// A stop was requested; `completed` steps finished before it took effect
    #[error("mission stopped after {completed} steps")]
    Stopped { completed: usize },
}

/// Run `steps` in order.
///
/// Control authority is obtained first. `stop` is checked between steps, so
/// a step in progress always finishes its own braking and teardown.
///
/// # Arguments
///
/// * `maneuvers` - Orchestrator bound to the vehicle link
/// * `steps` - Steps to execute
/// * `stop` - Set to `true` to end the mission after the current step
///
/// # Errors
///
/// Returns the refused authority request, the index and outcome of the first
/// failing step, or the number of steps completed before a stop.
pub async fn run<F, K, C>(
    maneuvers: &Maneuvers<'_, F, K, C>,
    steps: &[MissionStep],
    stop: &watch::Receiver<bool>,
) -> Result<(), MissionError>
where
    F: TelemetryFeed,
    K: CommandChannel,
    C: Clock,
{
    let config = maneuvers.config();
    let ack_timeout = config.link.response_timeout();

    maneuvers
        .obtain_control_authority(ack_timeout)
        .await
        .map_err(MissionError::Authority)?;

    for (index, step) in steps.iter().enumerate() {
        if *stop.borrow() {
            warn!("Mission stopped after {}/{} steps", index, steps.len());
            return Err(MissionError::Stopped { completed: index });
        }

        info!("Mission step {}/{}: {}", index + 1, steps.len(), step);

        let outcome = match *step {
            MissionStep::Takeoff => maneuvers.takeoff(ack_timeout).await,
            MissionStep::Move {
                x,
                y,
                z,
                yaw,
                position_tolerance,
                yaw_tolerance,
            } => {
                let goal = Goal::new(x, y, z, yaw)
                    .with_position_tolerance(
                        position_tolerance.unwrap_or(config.position.position_tolerance_m),
                    )
                    .with_yaw_tolerance(yaw_tolerance.unwrap_or(config.position.yaw_tolerance_deg));
                maneuvers.move_to(&goal).await
            }
            MissionStep::Land => maneuvers.landing(ack_timeout).await,
        };

        if let Err(source) = outcome {
            error!("Mission aborted at step {}", index + 1);
            return Err(MissionError::Step { step: index, source });
        }
    }

    info!("Mission complete ({} steps)", steps.len());
    Ok(())
}
