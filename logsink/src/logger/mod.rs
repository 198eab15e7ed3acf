//! # Logger
//!
//! An explicitly constructed front end that turns `(priority, message)` into
//! [`Fields`] and hands them to each sink in order. There is no global
//! logger; pass a `Logger` (or an `Arc<Logger>`) to the code that logs.
//!
//! Cheap values (sequence number, event time) are captured when the event is
//! created. Everything else is rendered lazily, only if a sink asks for it.
//!
//! ```rust
//! use logsink::logger::Logger;
//! use logsink::sink::WriterSink;
//! use logsink::format::LineFormat;
//!
//! let logger = Logger::builder()
//!   .prefix("billing")
//!   .sink(WriterSink::new(Vec::new(), LineFormat::rich()))
//!   .build();
//! logger.info("invoice sent");
//! ```


use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::fields::{
  Fields, ELAPSED_TIME, EXECUTABLE, FULL_TIME, HOSTNAME, MESSAGE, PID, PREFIX,
  PRIORITY, SEQ, START_TIME, TIME,
};
use crate::priority::Priority;
use crate::sink::Sink;

/// `time` field layout, e.g. `Jan  2 15:04:05.000`.
pub const TIME_FORMAT: &str = "%b %e %H:%M:%S%.3f";

/// Process facts resolved on first use and shared by every event.
#[derive(Default)]
struct ProcessInfo {
  hostname: OnceLock<String>,
  executable: OnceLock<String>,
}

impl ProcessInfo {
  fn hostname(&self) -> &str {
    self
      .hostname
      .get_or_init(|| gethostname::gethostname().to_string_lossy().into_owned())
  }

  fn executable(&self) -> &str {
    self.executable.get_or_init(|| {
      std::env::current_exe()
        .ok()
        .and_then(|path| {
          path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
    })
  }
}

pub struct Logger {
  prefix: String,
  sinks: Vec<Arc<dyn Sink>>,
  seq: AtomicU64,
  start: DateTime<Local>,
  process: Arc<ProcessInfo>,
}

impl Logger {
  pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
    Self {
      prefix: String::new(),
      sinks,
      seq: AtomicU64::new(0),
      start: Local::now(),
      process: Arc::new(ProcessInfo::default()),
    }
  }

  pub fn builder() -> LoggerBuilder {
    LoggerBuilder::default()
  }

  pub fn prefix(&self) -> &str {
    &self.prefix
  }

  pub fn sink_count(&self) -> usize {
    self.sinks.len()
  }

  /// When the logger was created; the `start_time` field.
  pub fn start_time(&self) -> DateTime<Local> {
    self.start
  }

  /// Builds the field set for one event and takes the next sequence number.
  pub fn fields(&self, priority: Priority, message: impl Into<String>) -> Fields {
    let now = Local::now();
    let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
    let start = self.start;

    let mut fields = Fields::new();
    fields
      .insert_value(PRIORITY, priority)
      .insert_value(MESSAGE, message.into())
      .insert_value(PREFIX, self.prefix.as_str())
      .insert_value(SEQ, seq)
      .insert_value(PID, std::process::id())
      .insert_value(FULL_TIME, now)
      .insert_value(START_TIME, start)
      .insert(TIME, move || now.format(TIME_FORMAT).to_string())
      .insert(ELAPSED_TIME, move || (now - start).to_std().unwrap_or_default());

    let process = Arc::clone(&self.process);
    fields.insert(HOSTNAME, move || process.hostname().to_string());
    let process = Arc::clone(&self.process);
    fields.insert(EXECUTABLE, move || process.executable().to_string());

    fields
  }

  /// Dispatches one event to every sink.
  pub fn log(&self, priority: Priority, message: impl Into<String>) {
    let fields = self.fields(priority, message);
    self.log_fields(&fields);
  }

  /// Dispatches an already assembled field set.
  pub fn log_fields(&self, fields: &Fields) {
    for sink in &self.sinks {
      sink.log(fields);
    }
  }

  pub fn emergency(&self, message: impl Into<String>) {
    self.log(Priority::Emergency, message)
  }

  pub fn alert(&self, message: impl Into<String>) {
    self.log(Priority::Alert, message)
  }

  pub fn critical(&self, message: impl Into<String>) {
    self.log(Priority::Critical, message)
  }

  pub fn error(&self, message: impl Into<String>) {
    self.log(Priority::Error, message)
  }

  pub fn warning(&self, message: impl Into<String>) {
    self.log(Priority::Warning, message)
  }

  pub fn notice(&self, message: impl Into<String>) {
    self.log(Priority::Notice, message)
  }

  pub fn info(&self, message: impl Into<String>) {
    self.log(Priority::Info, message)
  }

  pub fn debug(&self, message: impl Into<String>) {
    self.log(Priority::Debug, message)
  }
}

impl std::fmt::Debug for Logger {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Logger")
      .field("prefix", &self.prefix)
      .field("sinks", &self.sinks.len())
      .field("seq", &self.seq.load(Ordering::Relaxed))
      .finish()
  }
}

#[derive(Default)]
pub struct LoggerBuilder {
  prefix: String,
  sinks: Vec<Arc<dyn Sink>>,
}

impl LoggerBuilder {
  /// Value of the `prefix` field.
  pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
    self.prefix = prefix.into();
    self
  }

  pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
    self.sinks.push(Arc::new(sink));
    self
  }

  /// Adds a sink that is also held elsewhere, e.g. to flush or close it.
  pub fn shared_sink(mut self, sink: Arc<dyn Sink>) -> Self {
    self.sinks.push(sink);
    self
  }

  pub fn build(self) -> Logger {
    let mut logger = Logger::new(self.sinks);
    logger.prefix = self.prefix;
    logger
  }
}
