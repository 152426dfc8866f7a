// src/exec/mod.rs

//! Process supervision layer.
//!
//! - [`probe`] answers "is an instance of the helper already running
//!   system-wide?" behind a trait so tests can stub it.
//! - [`helper`] owns the helper subprocess: copy-in, launch, stdout/stderr
//!   capture, readiness detection, timeout enforcement.
//! - [`target`] owns the target subprocess: launch with an immediate-exit
//!   check, exit observation, idempotent termination.

pub mod helper;
pub mod probe;
pub mod target;

pub use helper::{HelperOutcome, HelperState, HelperSupervisor, HelperTiming};
pub use probe::{ProcessProbe, SystemProbe};
pub use target::{TargetHandle, TargetSupervisor};
