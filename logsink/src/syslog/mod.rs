//! # Syslog Sink
//!
//! Renders each event and hands it to the system logger at the event's own
//! priority. Events without a priority go out as [`Priority::Error`]. Raw
//! [`SyslogSink::write`] calls use the priority the sink was created with.
//!
//! The transport sits behind [`SyslogBackend`]. [`SyslogSink::connect`]
//! uses the local unix socket through the `syslog` crate.


use std::sync::{Mutex, MutexGuard};

use crate::error::{BoxError, Result, SinkError};
use crate::fields::Fields;
use crate::format::LineFormat;
use crate::priority::Priority;
use crate::sink::{ReloadSink, Sink};

/// Something that accepts one message per call at a given severity.
pub trait SyslogBackend: Send {
  fn send(&mut self, priority: Priority, message: &str) -> std::result::Result<(), BoxError>;

  /// Drops and reestablishes the connection.
  fn reconnect(&mut self) -> std::result::Result<(), BoxError> {
    Ok(())
  }
}

/// The local syslog daemon, reached over `/dev/log` or its platform
/// equivalent, tagged as `LOG_USER`.
#[cfg(unix)]
pub struct UnixSyslog {
  tag: String,
  logger: ::syslog::Logger<::syslog::LoggerBackend, ::syslog::Formatter3164>,
}

#[cfg(unix)]
impl UnixSyslog {
  pub fn connect(tag: impl Into<String>) -> Result<Self> {
    let tag = tag.into();
    let logger = ::syslog::unix(formatter(&tag)).map_err(|e| SinkError::Syslog(e.to_string().into()))?;
    Ok(Self { tag, logger })
  }

  pub fn tag(&self) -> &str {
    &self.tag
  }
}

#[cfg(unix)]
fn formatter(tag: &str) -> ::syslog::Formatter3164 {
  ::syslog::Formatter3164 {
    facility: ::syslog::Facility::LOG_USER,
    hostname: None,
    process: tag.to_string(),
    pid: std::process::id(),
  }
}

#[cfg(unix)]
impl SyslogBackend for UnixSyslog {
  fn send(&mut self, priority: Priority, message: &str) -> std::result::Result<(), BoxError> {
    let logger = &mut self.logger;
    let sent = match priority {
      Priority::Emergency => logger.emerg(message),
      Priority::Alert => logger.alert(message),
      Priority::Critical => logger.crit(message),
      Priority::Error => logger.err(message),
      Priority::Warning => logger.warning(message),
      Priority::Notice => logger.notice(message),
      Priority::Info => logger.info(message),
      Priority::Debug => logger.debug(message),
    };
    sent.map_err(|e| e.to_string().into())
  }

  fn reconnect(&mut self) -> std::result::Result<(), BoxError> {
    self.logger = ::syslog::unix(formatter(&self.tag)).map_err(|e| e.to_string())?;
    Ok(())
  }
}

struct SyslogState<B> {
  // None once closed
  backend: Option<B>,
  line: String,
}

/// A sink writing every event to syslog.
pub struct SyslogSink<B> {
  priority: Priority,
  format: LineFormat,
  state: Mutex<SyslogState<B>>,
}

#[cfg(unix)]
impl SyslogSink<UnixSyslog> {
  /// Connects to the local syslog daemon as `tag`. `priority` is used for
  /// [`SyslogSink::write`] and never filters events.
  pub fn connect(priority: Priority, tag: impl Into<String>, format: LineFormat) -> Result<Self> {
    Ok(Self::with_backend(UnixSyslog::connect(tag)?, priority, format))
  }
}

impl<B: SyslogBackend> SyslogSink<B> {
  pub fn with_backend(backend: B, priority: Priority, format: LineFormat) -> Self {
    Self {
      priority,
      format,
      state: Mutex::new(SyslogState {
        backend: Some(backend),
        line: String::with_capacity(256),
      }),
    }
  }

  fn lock(&self) -> Result<MutexGuard<'_, SyslogState<B>>> {
    Ok(self.state.lock()?)
  }

  pub fn priority(&self) -> Priority {
    self.priority
  }

  /// Sends `bytes` as one message at the sink's priority. Invalid UTF-8 is
  /// replaced rather than rejected.
  pub fn write(&self, bytes: &[u8]) -> Result<usize> {
    let mut state = self.lock()?;
    let backend = state.backend.as_mut().ok_or(SinkError::Closed)?;
    backend
      .send(self.priority, &String::from_utf8_lossy(bytes))
      .map_err(SinkError::Syslog)?;
    Ok(bytes.len())
  }

  fn log_line(&self, fields: &Fields) -> Result<()> {
    let priority = fields.priority().unwrap_or(Priority::Error);
    let mut state = self.lock()?;
    let SyslogState { backend, line } = &mut *state;
    let backend = backend.as_mut().ok_or(SinkError::Closed)?;
    line.clear();
    self.format.render(fields, line);
    backend.send(priority, line.as_str()).map_err(SinkError::Syslog)
  }

  /// Reconnects the backend.
  pub fn reload(&self) -> Result<()> {
    let mut state = self.lock()?;
    let backend = state.backend.as_mut().ok_or(SinkError::Closed)?;
    backend.reconnect().map_err(SinkError::Syslog)
  }

  /// Nothing is buffered; this only reports whether the sink is open.
  pub fn flush(&self) -> Result<()> {
    match self.lock()?.backend {
      Some(_) => Ok(()),
      None => Err(SinkError::Closed),
    }
  }

  /// Drops the connection. Closing twice is a no-op.
  pub fn close(&self) -> Result<()> {
    self.lock()?.backend = None;
    Ok(())
  }

  pub fn is_open(&self) -> bool {
    self.lock().map(|state| state.backend.is_some()).unwrap_or(false)
  }

  /// Consumes the sink and returns the backend, if still open.
  pub fn into_backend(self) -> Option<B> {
    match self.state.into_inner() {
      Ok(state) => state.backend,
      Err(poisoned) => poisoned.into_inner().backend,
    }
  }
}

impl<B: SyslogBackend> Sink for SyslogSink<B> {
  fn log(&self, fields: &Fields) {
    if let Err(e) = self.log_line(fields) {
      tracing::warn!(error = %e, "syslog sink dropped a line");
    }
  }
}

impl<B: SyslogBackend> ReloadSink for SyslogSink<B> {
  fn reload(&self) -> Result<()> {
    SyslogSink::reload(self)
  }

  fn flush(&self) -> Result<()> {
    SyslogSink::flush(self)
  }

  fn close(&self) -> Result<()> {
    SyslogSink::close(self)
  }
}

impl<B> std::fmt::Debug for SyslogSink<B> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SyslogSink")
      .field("priority", &self.priority)
      .field("format", &self.format.template().as_str())
      .finish()
  }
}
