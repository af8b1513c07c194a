use evidence_search::{MatchOptions, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_TIME_LIMIT_MINUTES: u64 = 10;
pub const DEFAULT_PREVIEW_LEN: usize = 10;

/// `[session]` section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub time_limit_minutes: u64,

    /// Exact limit in seconds; overrides `time_limit_minutes` when set
    pub limit_seconds: Option<u64>,

    pub page_size: usize,

    #[serde(flatten)]
    pub matching: MatchOptions,

    /// Ledgers are written under `<log_dir>/phase_b/`
    pub log_dir: PathBuf,

    /// Continue the clock from the first recorded start instead of restarting it
    pub resume_clock: bool,

    pub preview_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_limit_minutes: DEFAULT_TIME_LIMIT_MINUTES,
            limit_seconds: None,
            page_size: DEFAULT_PAGE_SIZE,
            matching: MatchOptions::default(),
            log_dir: PathBuf::from("logs"),
            resume_clock: false,
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn limit_seconds(&self) -> u64 {
        self.limit_seconds
            .unwrap_or_else(|| self.time_limit_minutes.saturating_mul(60))
    }

    /// Limit as written into the start record: whole minutes when exact, fractional
    /// otherwise.
    #[must_use]
    pub fn minutes_label(&self) -> String {
        let seconds = self.limit_seconds();
        if seconds % 60 == 0 {
            (seconds / 60).to_string()
        } else {
            format!("{}", seconds as f64 / 60.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_ten_minute_session() {
        let config = SessionConfig::default();
        assert_eq!(config.limit_seconds(), 600);
        assert_eq!(config.minutes_label(), "10");
        assert_eq!(config.page_size, 30);
        assert_eq!(config.matching, MatchOptions::default());
    }

    #[test]
    fn seconds_override_minutes() {
        let config = SessionConfig {
            limit_seconds: Some(90),
            ..Default::default()
        };
        assert_eq!(config.limit_seconds(), 90);
        assert_eq!(config.minutes_label(), "1.5");
    }

    #[test]
    fn matching_options_are_flattened_into_the_section() {
        let config: SessionConfig =
            serde_json::from_value(serde_json::json!({"threshold": 0.5, "min_len": 3}))
                .unwrap();
        assert_eq!(config.matching.threshold, 0.5);
        assert_eq!(config.matching.min_len, 3);
        assert!(config.matching.ignore_single_digit);
        assert_eq!(config.time_limit_minutes, 10);
    }
}
