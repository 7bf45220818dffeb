use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{errors::Error, Result};

/// Default level when the store has no `loglevel` entry (Python `WARNING`).
pub const DEFAULT_NUMERIC_LEVEL: i64 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Map a persisted numeric level (10 debug, 20 info, 30 warning, 40 error,
    /// 50 critical) onto the nearest filter at or below it.
    pub fn from_numeric(level: i64) -> Self {
        match level {
            i64::MIN..=9 => LogLevel::Trace,
            10..=19 => LogLevel::Debug,
            20..=29 => LogLevel::Info,
            30..=39 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    /// Read a `loglevel` store value; anything non-numeric means the default.
    pub fn from_value(value: Option<&Value>) -> Self {
        let numeric = value
            .and_then(|v| v.as_i64().or_else(|| v.as_str()?.trim().parse().ok()))
            .unwrap_or(DEFAULT_NUMERIC_LEVEL);
        Self::from_numeric(numeric)
    }

    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Initialize tracing for the process.
///
/// `RUST_LOG` overrides `level` when set.
pub fn init(service_name: &str, level: LogLevel) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let lvl = level.as_filter();
        EnvFilter::new(format!(
            "{lvl},ftg={lvl},ftg_core={lvl},ftg_telegram={lvl},{service_name}={lvl}"
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_levels_follow_python_thresholds() {
        assert_eq!(LogLevel::from_numeric(5), LogLevel::Trace);
        assert_eq!(LogLevel::from_numeric(10), LogLevel::Debug);
        assert_eq!(LogLevel::from_numeric(20), LogLevel::Info);
        assert_eq!(LogLevel::from_numeric(30), LogLevel::Warn);
        assert_eq!(LogLevel::from_numeric(40), LogLevel::Error);
        assert_eq!(LogLevel::from_numeric(50), LogLevel::Error);
    }

    #[test]
    fn store_value_parsing_defaults_to_warning() {
        assert_eq!(LogLevel::from_value(None), LogLevel::Warn);
        assert_eq!(LogLevel::from_value(Some(&json!(20))), LogLevel::Info);
        assert_eq!(LogLevel::from_value(Some(&json!("10"))), LogLevel::Debug);
        assert_eq!(LogLevel::from_value(Some(&json!([1]))), LogLevel::Warn);
    }
}
