//! # UAV Maneuvers Library
//!
//! Monitored takeoff, monitored landing and receding-setpoint offset moves
//! for a multirotor flight controller.
//!
//! The maneuvers drive an already-connected vehicle link through two async
//! seams ([`link::TelemetryFeed`] and [`link::CommandChannel`]) and wait on a
//! [`clock::Clock`], so they run unchanged against real hardware, the
//! in-process [`sim::SimulatedVehicle`], or mocks.

pub mod clock;
pub mod config;
pub mod error;
pub mod link;
pub mod maneuver;
pub mod mission;
pub mod monitor;
pub mod position;
pub mod sim;
pub mod transform;
