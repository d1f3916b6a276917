#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core tracking logic (hardware-agnostic).
//!
//! This crate provides the hardware-independent control stack of a dual-axis
//! solar tracker. All hardware interactions go through the traits in
//! `tracker_traits`; every component takes the current tick (`now_ms`)
//! explicitly and never reads a clock itself.
//!
//! ## Architecture
//!
//! - **Sensing**: differential light averaging per axis (`sensor`)
//! - **Decision**: adaptive-deadband tracking policy (`tracking`)
//! - **Output**: smoothed, kick-assisted PWM for an H-bridge (`actuator`)
//! - **Axis**: sensor + tracking + actuator behind overrides (`axis`)
//! - **Coordination**: shared anti-dither block for both axes (`coordinator`)
//! - **Safety**: debounced limit switches and the one-shot sweep (`endstop`)
//! - **Supervision**: modes, override composition and sleep entry (`supervisor`)
//! - **Loop**: clock, button and low-power hand-off (`runner`)

pub mod actuator;
pub mod axis;
pub mod builder;
pub mod button;
pub mod config;
pub mod conversions;
pub mod coordinator;
pub mod debounce;
pub mod display;
pub mod endstop;
pub mod environment;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod runner;
pub mod sensor;
pub mod supervisor;
pub mod tracking;
pub mod util;

pub use actuator::{ActuatorState, DutyPair, PwmActuator};
pub use axis::{AxisLogRecord, AxisOverrides, AxisUnit};
pub use builder::{Missing, Set, TrackerBuilder};
pub use button::{ButtonEvent, TouchButton};
pub use config::*;
pub use coordinator::{CoordinatorPhase, CoordinatorState, DualAxisCoordinator, HoldBlockState};
pub use debounce::Debouncer;
pub use display::{AxisView, DisplayFrame, DisplaySink};
pub use endstop::{EndstopSweepGuard, SweepState};
pub use environment::{EnvironmentSample, EnvironmentSampler};
pub use error::{BuildError, Result, TrackerError};
pub use runner::{RunParams, RunSummary, StopReason};
pub use sensor::{DifferentialLightSensor, LightSample};
pub use supervisor::{
    DynAxis, ModeSupervisor, SleepRequest, SystemMode, TickOutcome, compose_overrides,
};
pub use tracking::{AxisTrackingLogic, TrackingCommand};
