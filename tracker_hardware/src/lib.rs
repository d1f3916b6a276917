//! Simulated hardware for the tracker control stack.
//!
//! Everything here runs against a shared `TestClock`, so a simulation of
//! hours of tracking completes in milliseconds of wall time.

pub mod devices;
pub mod error;
pub mod plant;
pub mod replay;

pub use devices::{
    BridgeLog, FixedLimits, PowerLog, RecordingBridge, ScriptedButton, SimEnvironment, SimPower,
    SleepRecord,
};
pub use plant::{PlantAxis, PlantParams, SimBridge, SimLightPair, SimLimits, SimPlant};
pub use replay::ReplayLightPair;
