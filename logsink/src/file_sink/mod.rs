//! # Buffered File Sink
//!
//! Appends rendered lines to an in-memory buffer in front of one file. A
//! background daemon flushes the buffer every `flush_interval` (30s by
//! default) and reloads the file every `reload_interval` (1h by default).
//!
//! Reload closes and reopens the same path. When an external tool renames
//! the file underneath the process (logrotate's default mode), the next
//! reload starts a fresh file at the original name without a restart.
//!
//! All operations take the same lock, so a write never interleaves with a
//! flush or a reload. The daemon has no stop signal; it exits once every
//! handle to the sink has been dropped.

mod __test__;

use crossbeam_channel::{select, tick, Receiver, Sender};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use crate::config::FileSinkConfig;
use crate::daemon::{spawn_named, ErrorChannel};
use crate::error::{Result, SinkError};
use crate::fields::Fields;
use crate::format::LineFormat;
use crate::sink::{ReloadSink, Sink};

const SINK_NAME: &str = "file";

/// Opens `path` for appending, creating it when missing.
pub(crate) fn open_append(path: &Path) -> Result<File> {
  OpenOptions::new()
    .read(true)
    .append(true)
    .create(true)
    .open(path)
    .map_err(|source| SinkError::Open {
      path: path.to_path_buf(),
      source,
    })
}

/// One append-mode file behind a `BufWriter`, plus the scratch line that
/// sinks render into. Shared by the buffered and rotating file sinks.
pub(crate) struct LogFile {
  path: PathBuf,
  capacity: usize,
  out: Option<BufWriter<File>>,
  line: String,
}

impl LogFile {
  pub(crate) fn open(path: &Path, capacity: usize) -> Result<Self> {
    let file = open_append(path)?;
    Ok(Self {
      path: path.to_path_buf(),
      capacity,
      out: Some(BufWriter::with_capacity(capacity, file)),
      line: String::with_capacity(256),
    })
  }

  pub(crate) fn is_open(&self) -> bool {
    self.out.is_some()
  }

  pub(crate) fn buffered_bytes(&self) -> usize {
    self.out.as_ref().map_or(0, |out| out.buffer().len())
  }

  pub(crate) fn write(&mut self, bytes: &[u8]) -> Result<usize> {
    let out = self.out.as_mut().ok_or(SinkError::Closed)?;
    out.write_all(bytes)?;
    Ok(bytes.len())
  }

  /// Renders `fields` into the scratch line and appends it.
  pub(crate) fn write_line(&mut self, format: &LineFormat, fields: &Fields) -> Result<()> {
    let out = self.out.as_mut().ok_or(SinkError::Closed)?;
    self.line.clear();
    format.render(fields, &mut self.line);
    out.write_all(self.line.as_bytes())?;
    Ok(())
  }

  pub(crate) fn flush(&mut self) -> Result<()> {
    match self.out.as_mut() {
      Some(out) => Ok(out.flush()?),
      None => Err(SinkError::Closed),
    }
  }

  /// Flushes and drops the handle. A failed flush keeps it. No-op when closed.
  pub(crate) fn release(&mut self) -> Result<()> {
    if self.out.is_none() {
      return Ok(());
    }
    self.flush()?;
    self.out = None;
    Ok(())
  }

  /// Opens `path` again. On failure the file stays closed.
  pub(crate) fn reopen(&mut self) -> Result<()> {
    let file = open_append(&self.path)?;
    self.out = Some(BufWriter::with_capacity(self.capacity, file));
    Ok(())
  }

  /// Flush, release, reopen.
  pub(crate) fn reload(&mut self) -> Result<()> {
    self.flush()?;
    self.out = None;
    self.reopen()
  }
}

struct Shared {
  format: LineFormat,
  file: Mutex<LogFile>,
  path: PathBuf,
  errors: ErrorChannel,
  // Never sent on; dropping it tells the daemon the sink is gone.
  _alive: Sender<()>,
}

impl Shared {
  fn lock(&self) -> Result<MutexGuard<'_, LogFile>> {
    Ok(self.file.lock()?)
  }

  /// Daemon tick: flush unless the sink has been closed.
  fn tick_flush(&self) {
    let result = self.lock().and_then(|mut file| {
      if file.is_open() {
        file.flush()
      } else {
        Ok(())
      }
    });
    if let Err(e) = result {
      self.errors.report(SINK_NAME, e);
    }
  }

  /// Daemon tick: reload unless the sink has been closed.
  fn tick_reload(&self) {
    let result = self.lock().and_then(|mut file| {
      if file.is_open() {
        file.reload()
      } else {
        Ok(())
      }
    });
    match result {
      Ok(()) => tracing::debug!(path = %self.path.display(), "file sink reloaded"),
      Err(e) => {
        self.errors.report(SINK_NAME, e);
      },
    }
  }
}

/// A sink that buffers output in memory and periodically flushes it to a file.
///
/// Cloning yields another handle to the same sink.
///
/// # Example
/// ```rust,no_run
/// use logsink::config::FileSinkConfig;
/// use logsink::file_sink::BufferedFileSink;
///
/// let sink = BufferedFileSink::open(FileSinkConfig::new("/var/log/app.log"))?;
/// sink.write(b"started\n")?;
/// sink.flush()?;
/// # Ok::<(), logsink::error::SinkError>(())
/// ```
#[derive(Clone)]
pub struct BufferedFileSink {
  shared: Arc<Shared>,
}

impl BufferedFileSink {
  /// Opens (or creates) the configured file and starts the flush/reload daemon.
  pub fn open(config: FileSinkConfig) -> Result<Self> {
    config.validate()?;
    let format = config.format.build()?;
    let Opened {
      inner,
      alive_receiver,
    } = Self::open_with(
      &config.path,
      format,
      config.buffer_capacity,
      config.error_capacity,
    )?;

    let weak = Arc::downgrade(&inner.shared);
    let flush_every = config.flush_interval;
    let reload_every = config.reload_interval;
    spawn_named("logsink-file", move || {
      daemon(weak, alive_receiver, flush_every, reload_every)
    })?;

    Ok(inner)
  }

  /// Opens `path` with default intervals and the basic line format.
  pub fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
    Self::open(FileSinkConfig::new(path))
  }

  fn open_with(
    path: &Path,
    format: LineFormat,
    buffer_capacity: usize,
    error_capacity: usize,
  ) -> Result<Opened> {
    let file = LogFile::open(path, buffer_capacity)?;
    let (alive_tx, alive_rx) = crossbeam_channel::bounded(0);
    let shared = Arc::new(Shared {
      format,
      file: Mutex::new(file),
      path: path.to_path_buf(),
      errors: ErrorChannel::new(error_capacity),
      _alive: alive_tx,
    });
    Ok(Opened {
      inner: Self { shared },
      alive_receiver: alive_rx,
    })
  }

  /// Appends raw bytes to the buffer.
  pub fn write(&self, bytes: &[u8]) -> Result<usize> {
    self.shared.lock()?.write(bytes)
  }

  /// Pushes buffered bytes to the OS.
  pub fn flush(&self) -> Result<()> {
    self.shared.lock()?.flush()
  }

  /// Flushes, closes and reopens the same path.
  ///
  /// If the reopen fails the sink is left closed and the error is returned.
  pub fn reload(&self) -> Result<()> {
    self.shared.lock()?.reload()
  }

  /// Flushes and releases the file handle. Closing twice is a no-op.
  pub fn close(&self) -> Result<()> {
    self.shared.lock()?.release()
  }

  pub fn path(&self) -> &Path {
    &self.shared.path
  }

  pub fn is_open(&self) -> bool {
    self.shared.lock().map(|file| file.is_open()).unwrap_or(false)
  }

  /// Bytes written but not yet flushed.
  pub fn buffered_bytes(&self) -> usize {
    self.shared.lock().map(|file| file.buffered_bytes()).unwrap_or(0)
  }

  /// Errors hit by the background daemon.
  pub fn errors(&self) -> Receiver<SinkError> {
    self.shared.errors.receiver()
  }
}

struct Opened {
  inner: BufferedFileSink,
  alive_receiver: Receiver<()>,
}

fn daemon(
  shared: Weak<Shared>,
  alive: Receiver<()>,
  flush_every: Duration,
  reload_every: Duration,
) {
  let flush = tick(flush_every);
  let reload = tick(reload_every);

  loop {
    select! {
      recv(flush) -> _ => match shared.upgrade() {
        Some(shared) => shared.tick_flush(),
        None => break,
      },
      recv(reload) -> _ => match shared.upgrade() {
        Some(shared) => shared.tick_reload(),
        None => break,
      },
      // only fires once the last handle is gone
      recv(alive) -> _ => break,
    }
  }
}

impl Sink for BufferedFileSink {
  fn log(&self, fields: &Fields) {
    let result = self
      .shared
      .lock()
      .and_then(|mut file| file.write_line(&self.shared.format, fields));
    if let Err(e) = result {
      tracing::warn!(path = %self.shared.path.display(), error = %e, "file sink dropped a line");
    }
  }
}

impl ReloadSink for BufferedFileSink {
  fn reload(&self) -> Result<()> {
    BufferedFileSink::reload(self)
  }

  fn flush(&self) -> Result<()> {
    BufferedFileSink::flush(self)
  }

  fn close(&self) -> Result<()> {
    BufferedFileSink::close(self)
  }
}

impl std::fmt::Debug for BufferedFileSink {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BufferedFileSink")
      .field("path", &self.shared.path)
      .field("format", &self.shared.format.template().as_str())
      .finish()
  }
}
