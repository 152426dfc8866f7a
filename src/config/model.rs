// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::exec::helper::HelperTiming;
use crate::fs::retry::RetrySettings;

/// Raw settings as deserialized from TOML, before validation.
///
/// Durations are strings like `"1s"`, `"250ms"`, `"2m"`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    #[serde(default)]
    pub profile: RawProfileSection,
    #[serde(default)]
    pub timing: RawTimingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProfileSection {
    /// Minimum number of recognized artifact names required to treat a run
    /// as complete when neither the flag file nor the companion artifact
    /// is present.
    pub min_known_files: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTimingSection {
    pub retry_attempts: Option<u32>,
    pub retry_delay: Option<String>,
    pub readiness_timeout: Option<String>,
    pub readiness_poll_interval: Option<String>,
    pub readiness_grace: Option<String>,
    pub target_settle: Option<String>,
    pub poll_interval: Option<String>,
    pub exit_grace: Option<String>,
}

/// Validated run settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub min_known_files: usize,
    pub retry: RetrySettings,
    pub helper: HelperTiming,
    /// How long to wait after launching the target before checking it did
    /// not exit immediately.
    pub target_settle: Duration,
    /// Interval between completion-evidence scans.
    pub poll_interval: Duration,
    /// Grace period for the target to self-terminate after completion
    /// evidence appears, before it is force-terminated.
    pub exit_grace: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_known_files: 1,
            retry: RetrySettings::default(),
            helper: HelperTiming::default(),
            target_settle: Duration::from_secs(2),
            poll_interval: Duration::from_secs(1),
            exit_grace: Duration::from_secs(5),
        }
    }
}
