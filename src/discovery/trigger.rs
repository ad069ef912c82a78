//! Trigger point resolution
//!
//! Turns a user-facing "notify me at..." setting into the single interval
//! index at which linear discovery fires its one-shot trigger.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where during discovery the trigger should fire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum CallbackSpec {
    /// Fraction of the way through, in `[0, 1]`
    Fraction(f64),
    /// This many intervals before completion
    CountdownFromEnd(u64),
    /// 1-based interval number
    AbsoluteIndex(u64),
}

impl Default for CallbackSpec {
    fn default() -> Self {
        CallbackSpec::Fraction(1.0)
    }
}

impl CallbackSpec {
    /// Decode the single-number encoding: `[0, 1]` is a fraction, negative
    /// values count down from the end, anything above 1 is a 1-based index.
    pub fn from_raw(value: f64) -> Self {
        if (0.0..=1.0).contains(&value) {
            CallbackSpec::Fraction(value)
        } else if value < 0.0 {
            CallbackSpec::CountdownFromEnd((-value).floor() as u64)
        } else if value.is_finite() {
            CallbackSpec::AbsoluteIndex(value.ceil() as u64)
        } else {
            CallbackSpec::Fraction(1.0)
        }
    }

    /// Convert a form setting into a callback.
    ///
    /// `Frame` takes a 0-based frame number, so frame 0 is the start.
    pub fn from_mode(mode: CallbackMode, value: f64) -> Self {
        match mode {
            CallbackMode::Percent => CallbackSpec::Fraction((value / 100.0).min(1.0)),
            CallbackMode::FramesToEnd if value == 0.0 => CallbackSpec::Fraction(1.0),
            CallbackMode::FramesToEnd => CallbackSpec::CountdownFromEnd(value.abs().floor() as u64),
            CallbackMode::Frame if value == 0.0 => CallbackSpec::Fraction(0.0),
            CallbackMode::Frame => CallbackSpec::AbsoluteIndex((value.abs().ceil() as u64).saturating_add(1)),
        }
    }
}

/// How the callback value in a form should be read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallbackMode {
    #[default]
    Percent,
    FramesToEnd,
    Frame,
}

impl fmt::Display for CallbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackMode::Percent => write!(f, "percent"),
            CallbackMode::FramesToEnd => write!(f, "frames-to-end"),
            CallbackMode::Frame => write!(f, "frame"),
        }
    }
}

impl FromStr for CallbackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" | "perc" => Ok(CallbackMode::Percent),
            "frames-to-end" | "to" => Ok(CallbackMode::FramesToEnd),
            "frame" | "abs" => Ok(CallbackMode::Frame),
            other => Err(format!(
                "unknown callback mode '{}' (expected percent, frames-to-end or frame)",
                other
            )),
        }
    }
}

/// Resolved trigger: an interval index, or fire before the first lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerPoint {
    /// 0-based; may be negative or past the end
    pub index: i64,
    pub immediate: bool,
}

impl TriggerPoint {
    pub fn fires_at(&self, index: usize) -> bool {
        !self.immediate && self.index == index as i64
    }

    /// True when the loop can never reach the index and only the
    /// end-of-discovery fallback will fire
    pub fn out_of_range(&self, rev_total: usize) -> bool {
        !self.immediate && (self.index < 0 || self.index >= rev_total as i64)
    }
}

/// Resolve a callback against the number of intervals. Ties round up.
pub fn resolve_trigger(spec: CallbackSpec, rev_total: usize) -> TriggerPoint {
    let last = rev_total as i64 - 1;
    match spec {
        CallbackSpec::Fraction(f) => {
            let f = if f.is_nan() { 0.0 } else { f.clamp(0.0, 1.0) };
            TriggerPoint {
                index: (f * last as f64).ceil() as i64,
                immediate: false,
            }
        }
        CallbackSpec::CountdownFromEnd(frames) => {
            let frames = i64::try_from(frames).unwrap_or(i64::MAX);
            TriggerPoint {
                index: last.saturating_sub(frames),
                immediate: rev_total as i64 <= frames,
            }
        }
        CallbackSpec::AbsoluteIndex(i) => TriggerPoint {
            index: i64::try_from(i.saturating_sub(1)).unwrap_or(i64::MAX),
            immediate: false,
        },
    }
}
