//! Application services layer.
//!
//! Orchestrates the connectivity, volume and event modules.

pub mod monitor;

pub use monitor::{
    LifecycleState, MonitorController, MonitorError, MonitorResult, MonitorStatus, MuteState,
};
