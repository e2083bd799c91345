//! Value formatters: turn a raw cell value into display text.
//!
//! A column names its formatter once at declaration time; the name is
//! resolved here into a [`Formatter`] variant so rendering never re-inspects
//! what kind of formatter it holds.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::value::Value;

/// Width of the `bar` formatter in cells.
pub const BAR_WIDTH: usize = 10;

const BAR_COMPLETE: &str = "\u{2588}"; // █
const BAR_REMAINING: &str = "\u{2591}"; // ░

/// Formatter callback signature.
pub type FormatFn = dyn Fn(&Value) -> String + Send + Sync;

/// A resolved value formatter.
#[derive(Clone, Default)]
pub enum Formatter {
    /// Literal textual representation of the value.
    #[default]
    Display,
    /// `42s`, `3:07`, `1:02:03`. Accepts durations or seconds.
    Duration,
    /// Ratio in `0.0..=1.0` as a right-aligned percentage.
    Percent,
    /// Ratio in `0.0..=1.0` as a block bar.
    Bar,
    /// Byte count with binary units.
    Bytes,
    /// Number with two decimals.
    Float,
    Custom(Arc<FormatFn>),
}

impl Formatter {
    /// Wrap a formatting closure.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Look up a built-in formatter by name.
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        Some(match name {
            "display" | "text" => Self::Display,
            "duration" => Self::Duration,
            "percent" => Self::Percent,
            "bar" => Self::Bar,
            "bytes" => Self::Bytes,
            "float" => Self::Float,
            _ => return None,
        })
    }

    /// Format `value` for display.
    #[must_use]
    pub fn apply(&self, value: &Value) -> String {
        match self {
            Self::Display => value.to_string(),
            Self::Duration => duration(value),
            Self::Percent => percent(value),
            Self::Bar => bar(value),
            Self::Bytes => bytes(value),
            Self::Float => value
                .as_f64()
                .map_or_else(|| value.to_string(), |x| format!("{x:.2}")),
            Self::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Display => f.write_str("Display"),
            Self::Duration => f.write_str("Duration"),
            Self::Percent => f.write_str("Percent"),
            Self::Bar => f.write_str("Bar"),
            Self::Bytes => f.write_str("Bytes"),
            Self::Float => f.write_str("Float"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Format a duration as a human-readable string.
#[must_use]
pub fn duration_text(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    if total_secs < 60 {
        format!("{total_secs}s")
    } else if total_secs < 3600 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{mins}:{secs:02}")
    } else {
        let hours = total_secs / 3600;
        let mins = (total_secs % 3600) / 60;
        let secs = total_secs % 60;
        format!("{hours}:{mins:02}:{secs:02}")
    }
}

fn duration(value: &Value) -> String {
    match value {
        Value::Duration(d) => duration_text(*d),
        other => match other.as_f64().map(Duration::try_from_secs_f64) {
            Some(Ok(d)) => duration_text(d),
            _ => other.to_string(),
        },
    }
}

fn percent(value: &Value) -> String {
    let Some(ratio) = value.as_f64() else {
        return value.to_string();
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pct = (ratio.max(0.0) * 100.0) as u32;
    format!("{pct:3}%")
}

fn bar(value: &Value) -> String {
    let Some(ratio) = value.as_f64() else {
        return value.to_string();
    };
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let filled = ((ratio.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!(
        "{}{}",
        BAR_COMPLETE.repeat(filled),
        BAR_REMAINING.repeat(BAR_WIDTH - filled)
    )
}

fn bytes(value: &Value) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let Some(mut amount) = value.as_f64() else {
        return value.to_string();
    };
    if amount < 1024.0 {
        return format!("{amount:.0} B");
    }
    let mut unit = 0;
    while amount >= 1024.0 && unit < UNITS.len() - 1 {
        amount /= 1024.0;
        unit += 1;
    }
    format!("{amount:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_text() {
        assert_eq!(duration_text(Duration::from_secs(42)), "42s");
        assert_eq!(duration_text(Duration::from_secs(187)), "3:07");
        assert_eq!(duration_text(Duration::from_secs(3723)), "1:02:03");
    }

    #[test]
    fn test_named_lookup() {
        assert!(Formatter::named("duration").is_some());
        assert!(Formatter::named("bar").is_some());
        assert!(Formatter::named("sparkles").is_none());
    }

    #[test]
    fn test_duration_accepts_seconds() {
        assert_eq!(Formatter::Duration.apply(&Value::from(65)), "1:05");
        assert_eq!(Formatter::Duration.apply(&Value::from("n/a")), "n/a");
    }

    #[test]
    fn test_duration_out_of_range_falls_back() {
        let huge = Value::Float(1e30);
        assert_eq!(Formatter::Duration.apply(&huge), huge.to_string());
        assert_eq!(Formatter::Duration.apply(&Value::Float(-2.5)), "-2.5");
        assert_eq!(Formatter::Duration.apply(&Value::Float(f64::NAN)), "NaN");
    }

    #[test]
    fn test_percent() {
        assert_eq!(Formatter::Percent.apply(&Value::from(0.42)), " 42%");
        assert_eq!(Formatter::Percent.apply(&Value::from(1.0)), "100%");
        assert_eq!(Formatter::Percent.apply(&Value::Empty), "");
    }

    #[test]
    fn test_bar() {
        let half = Formatter::Bar.apply(&Value::from(0.5));
        assert_eq!(half, format!("{}{}", "█".repeat(5), "░".repeat(5)));
        assert_eq!(crate::cells::width(&half), BAR_WIDTH);
        let over = Formatter::Bar.apply(&Value::from(3.0));
        assert_eq!(over, "█".repeat(10));
    }

    #[test]
    fn test_bytes() {
        assert_eq!(Formatter::Bytes.apply(&Value::from(512)), "512 B");
        assert_eq!(Formatter::Bytes.apply(&Value::from(1536)), "1.5 KiB");
        assert_eq!(Formatter::Bytes.apply(&Value::from(5 * 1024 * 1024)), "5.0 MiB");
    }

    #[test]
    fn test_float_and_custom() {
        assert_eq!(Formatter::Float.apply(&Value::from(1.0 / 3.0)), "0.33");
        let shout = Formatter::custom(|v| v.to_string().to_uppercase());
        assert_eq!(shout.apply(&Value::from("done")), "DONE");
    }
}
