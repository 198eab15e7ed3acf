
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Syslog style severity of a log event.
///
/// Lower numeric values are more severe: `Emergency` is `0` and `Debug` is `7`.
/// Filters compare the numeric value, so `p <= threshold` means "at least as
/// severe as the threshold".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Priority {
  /// System is unusable
  Emergency = 0,
  /// Action must be taken immediately
  Alert = 1,
  /// Critical conditions
  Critical = 2,
  /// Error conditions
  Error = 3,
  /// Warning conditions
  Warning = 4,
  /// Normal but significant condition
  Notice = 5,
  /// Informational messages
  Info = 6,
  /// Debug-level messages
  Debug = 7,
}

impl Priority {
  pub const ALL: [Priority; 8] = [
    Priority::Emergency,
    Priority::Alert,
    Priority::Critical,
    Priority::Error,
    Priority::Warning,
    Priority::Notice,
    Priority::Info,
    Priority::Debug,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Priority::Emergency => "EMERGENCY",
      Priority::Alert => "ALERT",
      Priority::Critical => "CRITICAL",
      Priority::Error => "ERROR",
      Priority::Warning => "WARNING",
      Priority::Notice => "NOTICE",
      Priority::Info => "INFO",
      Priority::Debug => "DEBUG",
    }
  }

  #[inline]
  pub fn as_u8(&self) -> u8 {
    *self as u8
  }

  pub fn from_u8(value: u8) -> Option<Self> {
    Self::ALL.get(value as usize).copied()
  }

  /// True when `self` is at least as severe as `threshold`.
  #[inline]
  pub fn passes(&self, threshold: Priority) -> bool {
    self.as_u8() <= threshold.as_u8()
  }
}

impl fmt::Display for Priority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // pad() so width and alignment directives apply
    f.pad(self.as_str())
  }
}

impl TryFrom<u8> for Priority {
  type Error = u8;

  fn try_from(value: u8) -> Result<Self, u8> {
    Self::from_u8(value).ok_or(value)
  }
}

/// Error returned when a string does not name a priority.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority: {0}")]
pub struct ParsePriorityError(pub String);

impl FromStr for Priority {
  type Err = ParsePriorityError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "emergency" | "emerg" => Ok(Priority::Emergency),
      "alert" => Ok(Priority::Alert),
      "critical" | "crit" => Ok(Priority::Critical),
      "error" | "err" => Ok(Priority::Error),
      "warning" | "warn" => Ok(Priority::Warning),
      "notice" => Ok(Priority::Notice),
      "info" => Ok(Priority::Info),
      "debug" => Ok(Priority::Debug),
      _ => Err(ParsePriorityError(s.to_string())),
    }
  }
}

impl From<tracing::Level> for Priority {
  fn from(level: tracing::Level) -> Self {
    match level {
      tracing::Level::ERROR => Priority::Error,
      tracing::Level::WARN => Priority::Warning,
      tracing::Level::INFO => Priority::Info,
      // syslog has nothing below debug
      tracing::Level::DEBUG | tracing::Level::TRACE => Priority::Debug,
    }
  }
}
