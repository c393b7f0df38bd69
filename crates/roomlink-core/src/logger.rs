use std::error::Error;
use std::fmt::{self, Debug, Display};
use std::str::FromStr;
use std::sync::Once;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Prefix put in front of every message written through [`Logger`].
const PREFIX: &str = "[SDK] ";

static LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Severity levels, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Debug,
            1 => Self::Info,
            2 => Self::Warn,
            _ => Self::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// A structured field attached to a log line.
pub type Field<'a> = (&'a str, &'a dyn Debug);

struct Fields<'a>(&'a [Field<'a>]);

impl Display for Fields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.0 {
            write!(f, " {key}={value:?}")?;
        }
        Ok(())
    }
}

/// Process-wide leveled logger.
///
/// The level gate is global and shared by every client in the process.
/// Enabled lines are handed to `tracing`, so they end up wherever the
/// host's subscriber sends them (see [`init_logging`]).
pub struct Logger;

impl Logger {
    pub fn set_level(level: LogLevel) {
        LEVEL.store(level as u8, Ordering::Relaxed);
    }

    pub fn level() -> LogLevel {
        LogLevel::from_u8(LEVEL.load(Ordering::Relaxed))
    }

    pub fn enabled(level: LogLevel) -> bool {
        level >= Self::level()
    }

    pub fn debug(message: &str, fields: &[Field<'_>]) {
        if Self::enabled(LogLevel::Debug) {
            tracing::debug!("{PREFIX}{message}{}", Fields(fields));
        }
    }

    pub fn info(message: &str, fields: &[Field<'_>]) {
        if Self::enabled(LogLevel::Info) {
            tracing::info!("{PREFIX}{message}{}", Fields(fields));
        }
    }

    pub fn warn(message: &str, fields: &[Field<'_>]) {
        if Self::enabled(LogLevel::Warn) {
            tracing::warn!("{PREFIX}{message}{}", Fields(fields));
        }
    }

    /// Log an error line. The error slot is always recorded, `None` included.
    pub fn error(message: &str, error: Option<&dyn Error>, fields: &[Field<'_>]) {
        if Self::enabled(LogLevel::Error) {
            let error = error.map(|e| e.to_string());
            tracing::error!(error = ?error, "{PREFIX}{message}{}", Fields(fields));
        }
    }
}

/// Install a stderr `tracing` subscriber. Safe to call more than once.
///
/// Honours `RUST_LOG`, falling back to debug output for this crate so
/// that [`Logger`]'s own level is the effective gate.
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("roomlink_core=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .try_init();
    });
}

/// Serializes tests that touch the global level.
#[cfg(test)]
pub(crate) static LEVEL_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
