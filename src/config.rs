//! Service configuration
//!
//! Settings that outlive a single discovery call, read from the environment
//! (and a `.env` file when the binary loads one).

use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_FRAME_DELAY_MS: u64 = 500;
pub const DEFAULT_ZOOM_PERCENT: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}

/// Configuration for the lookup client and player
#[derive(Debug, Clone, PartialEq)]
pub struct TimelapseConfig {
    /// Action API endpoint
    pub api_url: String,
    /// Sent with every request; wiki operators ask clients to identify themselves
    pub user_agent: String,
    /// Pause between playback frames
    pub frame_delay: Duration,
    /// Display-only scale for the rendering surface
    pub zoom_percent: u32,
}

impl Default for TimelapseConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: default_user_agent(),
            frame_delay: Duration::from_millis(DEFAULT_FRAME_DELAY_MS),
            zoom_percent: DEFAULT_ZOOM_PERCENT,
        }
    }
}

impl TimelapseConfig {
    /// Read `WIKI_API_URL`, `WIKI_USER_AGENT`, `TIMELAPSE_FRAME_DELAY_MS` and
    /// `TIMELAPSE_ZOOM_PERCENT`, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let frame_delay = match parse_number::<u64, _>(&lookup, "TIMELAPSE_FRAME_DELAY_MS")? {
            Some(ms) => Duration::from_millis(ms),
            None => defaults.frame_delay,
        };
        let zoom_percent =
            parse_number::<u32, _>(&lookup, "TIMELAPSE_ZOOM_PERCENT")?.unwrap_or(defaults.zoom_percent);

        Ok(Self {
            api_url: non_empty(lookup("WIKI_API_URL")).unwrap_or(defaults.api_url),
            user_agent: non_empty(lookup("WIKI_USER_AGENT")).unwrap_or(defaults.user_agent),
            frame_delay,
            zoom_percent,
        })
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_number<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup(key)) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        None => Ok(None),
    }
}
