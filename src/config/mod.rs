// src/config/mod.rs

//! Optional run settings: the completion profile and every timing knob.
//!
//! Defaults match the production workflow (3 copy retries at 1 s, a 2
//! minute helper readiness timeout, 1 s completion polls). Everything is
//! overridable from a small TOML file so tests and unusual targets can run
//! with short durations.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{RawSettings, Settings};
