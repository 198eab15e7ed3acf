//! # Config
//!
//! Deserializable settings for each sink. Every struct is `#[serde(default)]`
//! so a config file only needs the keys it changes; durations are written
//! the human way (`"30s"`, `"1h"`).
//!
//! ```rust
//! use logsink::config::RotateConfig;
//!
//! let config = RotateConfig::from_json_str(
//!   r#"{ "path": "/var/log/app.log", "rotate_interval": "1h" }"#,
//! ).unwrap();
//! assert_eq!(config.rotate_interval.as_secs(), 3600);
//! ```

mod __test__;

use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::buffer::{DEFAULT_MAX_BYTES, DEFAULT_MAX_RECORDS};
use crate::error::{Result, SinkError};
use crate::format::{LineFormat, BASIC_FIELDS, BASIC_FORMAT};

pub const DEFAULT_FILE_FLUSH_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_ROTATE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_ROTATE_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_STREAM_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H%M%S";
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;
pub const DEFAULT_ERROR_CAPACITY: usize = 16;

/// Template and ordered field list for rendering lines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
  pub template: String,
  pub fields: Vec<String>,
}

impl FormatConfig {
  pub fn build(&self) -> Result<LineFormat> {
    LineFormat::new(&self.template, &self.fields)
  }
}

impl Default for FormatConfig {
  fn default() -> Self {
    Self {
      template: BASIC_FORMAT.to_string(),
      fields: BASIC_FIELDS.iter().map(|f| f.to_string()).collect(),
    }
  }
}

/// Settings for [`crate::file_sink::BufferedFileSink`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
  pub path: PathBuf,
  #[serde(with = "humantime_serde")]
  pub flush_interval: Duration,
  #[serde(with = "humantime_serde")]
  pub reload_interval: Duration,
  /// In-memory output buffer size in bytes
  pub buffer_capacity: usize,
  /// Daemon errors kept until read; further errors are dropped
  pub error_capacity: usize,
  pub format: FormatConfig,
}

impl FileSinkConfig {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      ..Self::default()
    }
  }

  pub fn with_intervals(mut self, flush: Duration, reload: Duration) -> Self {
    self.flush_interval = flush;
    self.reload_interval = reload;
    self
  }

  pub fn with_format(mut self, format: FormatConfig) -> Self {
    self.format = format;
    self
  }

  pub fn validate(&self) -> Result<()> {
    require_path(&self.path)?;
    require_interval("flush_interval", self.flush_interval)?;
    require_interval("reload_interval", self.reload_interval)?;
    require_nonzero("buffer_capacity", self.buffer_capacity)?;
    require_nonzero("error_capacity", self.error_capacity)?;
    self.format.build().map(|_| ())
  }

  pub fn from_json_str(json: &str) -> Result<Self> {
    let config: Self = parse_json(json)?;
    config.validate()?;
    Ok(config)
  }
}

impl Default for FileSinkConfig {
  fn default() -> Self {
    Self {
      path: PathBuf::new(),
      flush_interval: DEFAULT_FILE_FLUSH_INTERVAL,
      reload_interval: DEFAULT_RELOAD_INTERVAL,
      buffer_capacity: DEFAULT_BUFFER_CAPACITY,
      error_capacity: DEFAULT_ERROR_CAPACITY,
      format: FormatConfig::default(),
    }
  }
}

/// Settings for [`crate::rotate::RotatingSink`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RotateConfig {
  pub path: PathBuf,
  #[serde(with = "humantime_serde")]
  pub rotate_interval: Duration,
  #[serde(with = "humantime_serde")]
  pub flush_interval: Duration,
  /// chrono strftime pattern appended to rotated file names
  pub timestamp_format: String,
  pub buffer_capacity: usize,
  pub error_capacity: usize,
  pub format: FormatConfig,
}

impl RotateConfig {
  pub fn new(path: impl Into<PathBuf>, rotate_interval: Duration) -> Self {
    Self {
      path: path.into(),
      rotate_interval,
      ..Self::default()
    }
  }

  pub fn with_flush_interval(mut self, interval: Duration) -> Self {
    self.flush_interval = interval;
    self
  }

  pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
    self.timestamp_format = format.into();
    self
  }

  pub fn with_format(mut self, format: FormatConfig) -> Self {
    self.format = format;
    self
  }

  pub fn validate(&self) -> Result<()> {
    require_path(&self.path)?;
    require_interval("rotate_interval", self.rotate_interval)?;
    require_interval("flush_interval", self.flush_interval)?;
    require_nonzero("buffer_capacity", self.buffer_capacity)?;
    require_nonzero("error_capacity", self.error_capacity)?;
    validate_timestamp_format(&self.timestamp_format)?;
    self.format.build().map(|_| ())
  }

  pub fn from_json_str(json: &str) -> Result<Self> {
    let config: Self = parse_json(json)?;
    config.validate()?;
    Ok(config)
  }
}

impl Default for RotateConfig {
  fn default() -> Self {
    Self {
      path: PathBuf::new(),
      rotate_interval: DEFAULT_ROTATE_INTERVAL,
      flush_interval: DEFAULT_ROTATE_FLUSH_INTERVAL,
      timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
      buffer_capacity: DEFAULT_BUFFER_CAPACITY,
      error_capacity: DEFAULT_ERROR_CAPACITY,
      format: FormatConfig::default(),
    }
  }
}

/// Settings for [`crate::stream::StreamWriter`] and [`crate::stream::StreamSink`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
  #[serde(with = "humantime_serde")]
  pub flush_interval: Duration,
  /// Flush before admitting a record once this many are buffered
  pub max_items: usize,
  /// Flush before admitting a record once this many bytes are buffered
  pub max_bytes: usize,
  /// Record slots allocated up front; must be at least `max_items`
  pub buffer_capacity: usize,
  pub error_capacity: usize,
  pub format: FormatConfig,
}

impl StreamConfig {
  pub fn with_thresholds(mut self, max_items: usize, max_bytes: usize) -> Self {
    self.max_items = max_items;
    self.max_bytes = max_bytes;
    self
  }

  pub fn with_flush_interval(mut self, interval: Duration) -> Self {
    self.flush_interval = interval;
    self
  }

  pub fn with_format(mut self, format: FormatConfig) -> Self {
    self.format = format;
    self
  }

  pub fn validate(&self) -> Result<()> {
    require_interval("flush_interval", self.flush_interval)?;
    require_nonzero("max_items", self.max_items)?;
    require_nonzero("max_bytes", self.max_bytes)?;
    require_nonzero("error_capacity", self.error_capacity)?;
    if self.max_items > self.buffer_capacity {
      return Err(SinkError::Config(format!(
        "max_items ({}) exceeds buffer_capacity ({})",
        self.max_items, self.buffer_capacity
      )));
    }
    self.format.build().map(|_| ())
  }

  pub fn from_json_str(json: &str) -> Result<Self> {
    let config: Self = parse_json(json)?;
    config.validate()?;
    Ok(config)
  }
}

impl Default for StreamConfig {
  fn default() -> Self {
    Self {
      flush_interval: DEFAULT_STREAM_FLUSH_INTERVAL,
      max_items: DEFAULT_MAX_RECORDS,
      max_bytes: DEFAULT_MAX_BYTES,
      buffer_capacity: DEFAULT_MAX_RECORDS,
      error_capacity: DEFAULT_ERROR_CAPACITY,
      format: FormatConfig::default(),
    }
  }
}

fn parse_json<T: DeserializeOwned>(json: &str) -> Result<T> {
  serde_json::from_str(json).map_err(|e| SinkError::Config(e.to_string()))
}

fn require_path(path: &std::path::Path) -> Result<()> {
  if path.as_os_str().is_empty() {
    return Err(SinkError::Config("path must not be empty".to_string()));
  }
  Ok(())
}

fn require_interval(name: &str, value: Duration) -> Result<()> {
  if value.is_zero() {
    return Err(SinkError::Config(format!("{} must be greater than zero", name)));
  }
  Ok(())
}

fn require_nonzero(name: &str, value: usize) -> Result<()> {
  if value == 0 {
    return Err(SinkError::Config(format!("{} must be greater than zero", name)));
  }
  Ok(())
}

fn validate_timestamp_format(format: &str) -> Result<()> {
  if format.is_empty() {
    return Err(SinkError::Config("timestamp_format must not be empty".to_string()));
  }
  if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
    return Err(SinkError::Config(format!(
      "timestamp_format {:?} is not a valid strftime pattern",
      format
    )));
  }
  // specifiers such as %D and %x expand to slashes
  let sample = Local::now().format(format).to_string();
  if sample.contains(std::path::MAIN_SEPARATOR) || sample.contains('/') {
    return Err(SinkError::Config(format!(
      "timestamp_format {:?} would produce a path separator",
      format
    )));
  }
  Ok(())
}
