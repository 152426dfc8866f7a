// src/config/validate.rs

//! Semantic validation of raw settings.

use std::time::Duration;

use crate::config::model::{RawSettings, Settings};
use crate::errors::{DumprunError, Result};

impl TryFrom<RawSettings> for Settings {
    type Error = DumprunError;

    fn try_from(raw: RawSettings) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(min) = raw.profile.min_known_files {
            if min == 0 {
                return Err(DumprunError::Config(
                    "profile.min_known_files must be at least 1".to_string(),
                ));
            }
            settings.min_known_files = min;
        }

        let t = raw.timing;
        if let Some(attempts) = t.retry_attempts {
            if attempts == 0 {
                return Err(DumprunError::Config(
                    "timing.retry_attempts must be at least 1".to_string(),
                ));
            }
            settings.retry.attempts = attempts;
        }

        apply_duration(&mut settings.retry.delay, t.retry_delay, "retry_delay")?;
        apply_duration(
            &mut settings.helper.readiness_timeout,
            t.readiness_timeout,
            "readiness_timeout",
        )?;
        apply_duration(
            &mut settings.helper.poll_interval,
            t.readiness_poll_interval,
            "readiness_poll_interval",
        )?;
        apply_duration(
            &mut settings.helper.ready_grace,
            t.readiness_grace,
            "readiness_grace",
        )?;
        apply_duration(&mut settings.target_settle, t.target_settle, "target_settle")?;
        apply_duration(&mut settings.poll_interval, t.poll_interval, "poll_interval")?;
        apply_duration(&mut settings.exit_grace, t.exit_grace, "exit_grace")?;

        if settings.poll_interval.is_zero() || settings.helper.poll_interval.is_zero() {
            return Err(DumprunError::Config(
                "poll intervals must be non-zero".to_string(),
            ));
        }

        Ok(settings)
    }
}

fn apply_duration(slot: &mut Duration, raw: Option<String>, key: &str) -> Result<()> {
    if let Some(s) = raw {
        *slot = parse_duration(&s)
            .map_err(|e| DumprunError::Config(format!("timing.{key}: {e}")))?;
    }
    Ok(())
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::RawSettings;

    #[test]
    fn parse_duration_accepts_common_forms() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("5weeks").is_err());
    }

    #[test]
    fn defaults_match_the_production_workflow() {
        let settings = Settings::try_from(RawSettings::default()).unwrap();
        assert_eq!(settings.min_known_files, 1);
        assert_eq!(settings.retry.attempts, 3);
        assert_eq!(settings.retry.delay, Duration::from_secs(1));
        assert_eq!(settings.helper.readiness_timeout, Duration::from_secs(120));
        assert_eq!(settings.helper.poll_interval, Duration::from_millis(100));
        assert_eq!(settings.helper.ready_grace, Duration::from_secs(1));
        assert_eq!(settings.target_settle, Duration::from_secs(2));
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.exit_grace, Duration::from_secs(5));
    }

    #[test]
    fn overrides_are_applied() {
        let raw: RawSettings = toml::from_str(
            r#"
            [profile]
            min_known_files = 3

            [timing]
            retry_attempts = 5
            retry_delay = "50ms"
            readiness_timeout = "10s"
            "#,
        )
        .unwrap();
        let settings = Settings::try_from(raw).unwrap();
        assert_eq!(settings.min_known_files, 3);
        assert_eq!(settings.retry.attempts, 5);
        assert_eq!(settings.retry.delay, Duration::from_millis(50));
        assert_eq!(settings.helper.readiness_timeout, Duration::from_secs(10));
    }

    #[test]
    fn zero_thresholds_are_rejected() {
        let raw: RawSettings = toml::from_str("[profile]\nmin_known_files = 0\n").unwrap();
        assert!(matches!(
            Settings::try_from(raw),
            Err(DumprunError::Config(_))
        ));

        let raw: RawSettings = toml::from_str("[timing]\nretry_attempts = 0\n").unwrap();
        assert!(matches!(
            Settings::try_from(raw),
            Err(DumprunError::Config(_))
        ));
    }
}
