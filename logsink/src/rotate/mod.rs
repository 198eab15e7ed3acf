//! # Rotating Sink
//!
//! A buffered file sink that archives its file on a schedule. Each rotation
//! renames `<path>` to `<path>.<timestamp>` and starts a fresh `<path>`.
//!
//! ## Rotation sequence
//!
//! 1. `on_pre_rotate` on every subscriber, in registration order. The first
//!    failure aborts: nothing has been closed or renamed yet.
//! 2. Flush and release the file handle.
//! 3. Rename to the archive name. A name already taken gets a `.1`, `.2`, ...
//!    suffix. If the rename fails the original path is reopened.
//! 4. `on_post_rotate` with the archive path. The first failure skips the
//!    remaining hooks but the rename stays in place.
//! 5. Reopen `<path>`.
//!
//! `reload` is bracketed the same way by `on_pre_reload` / `on_post_reload`,
//! without the rename.
//!
//! Hooks run while the sink's lock is held. A slow hook stalls every writer
//! of this sink, so keep them short.
//!
//! ## Daemon
//!
//! [`RotatingSink::run`] blocks on two tickers (rotate, flush) and the stop
//! signal. Errors from periodic work go to [`RotatingSink::errors`].


use chrono::{DateTime, Local};
use crossbeam_channel::{select, tick, Receiver};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::RotateConfig;
use crate::daemon::{spawn_named, ErrorChannel, StopSignal};
use crate::error::{BoxError, HookKind, Result, SinkError};
use crate::fields::Fields;
use crate::file_sink::LogFile;
use crate::format::LineFormat;
use crate::sink::{ReloadSink, Sink};

const SINK_NAME: &str = "rotate";

type HookResult = std::result::Result<(), BoxError>;

/// Observer of rotate and reload events. Every hook defaults to a no-op.
pub trait Subscriber: Send + Sync {
  /// Called before anything is closed. An error cancels the rotation.
  fn on_pre_rotate(&self, _at: DateTime<Local>) -> HookResult {
    Ok(())
  }

  /// Called with the archive path once the rename has happened.
  fn on_post_rotate(&self, _archived: &Path) -> HookResult {
    Ok(())
  }

  fn on_pre_reload(&self) -> HookResult {
    Ok(())
  }

  fn on_post_reload(&self) -> HookResult {
    Ok(())
  }
}

impl<T: Subscriber + ?Sized> Subscriber for Arc<T> {
  fn on_pre_rotate(&self, at: DateTime<Local>) -> HookResult {
    (**self).on_pre_rotate(at)
  }

  fn on_post_rotate(&self, archived: &Path) -> HookResult {
    (**self).on_post_rotate(archived)
  }

  fn on_pre_reload(&self) -> HookResult {
    (**self).on_pre_reload()
  }

  fn on_post_reload(&self) -> HookResult {
    (**self).on_post_reload()
  }
}

struct RotateState {
  file: LogFile,
  subscribers: Vec<Arc<dyn Subscriber>>,
}

/// A file sink that periodically renames its file and starts a new one.
pub struct RotatingSink {
  path: PathBuf,
  timestamp_format: String,
  rotate_interval: Duration,
  flush_interval: Duration,
  format: LineFormat,
  state: Mutex<RotateState>,
  signal: StopSignal,
  errors: ErrorChannel,
}

impl RotatingSink {
  /// Opens (or creates) the configured file. The daemon is not started;
  /// call [`RotatingSink::run`] or [`RotatingSink::spawn`].
  pub fn open(config: RotateConfig) -> Result<Self> {
    config.validate()?;
    let format = config.format.build()?;
    let file = LogFile::open(&config.path, config.buffer_capacity)?;

    Ok(Self {
      state: Mutex::new(RotateState {
        file,
        subscribers: Vec::new(),
      }),
      path: config.path,
      timestamp_format: config.timestamp_format,
      rotate_interval: config.rotate_interval,
      flush_interval: config.flush_interval,
      format,
      signal: StopSignal::new(),
      errors: ErrorChannel::new(config.error_capacity),
    })
  }

  fn lock(&self) -> Result<MutexGuard<'_, RotateState>> {
    Ok(self.state.lock()?)
  }

  /// Appends a subscriber. Notification order is registration order.
  pub fn subscribe<T: Subscriber + 'static>(&self, subscriber: T) -> Result<()> {
    self.lock()?.subscribers.push(Arc::new(subscriber));
    Ok(())
  }

  /// The active file; stable across rotations.
  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn is_open(&self) -> bool {
    self
      .lock()
      .map(|state| state.file.is_open())
      .unwrap_or(false)
  }

  /// Appends raw bytes to the buffer.
  pub fn write(&self, bytes: &[u8]) -> Result<usize> {
    self.lock()?.file.write(bytes)
  }

  pub fn flush(&self) -> Result<()> {
    self.lock()?.file.flush()
  }

  /// Rotates using the current local time.
  pub fn rotate(&self) -> Result<PathBuf> {
    self.rotate_at(Local::now())
  }

  /// Rotates as of `at` and returns the archive path.
  pub fn rotate_at(&self, at: DateTime<Local>) -> Result<PathBuf> {
    let mut state = self.lock()?;
    if !state.file.is_open() {
      return Err(SinkError::Closed);
    }
    let subscribers = state.subscribers.clone();

    for subscriber in &subscribers {
      subscriber
        .on_pre_rotate(at)
        .map_err(|e| SinkError::hook(HookKind::PreRotate, e))?;
    }

    // a failed flush keeps the handle so the sink stays usable
    state.file.release()?;

    let archived = self.archive_name(at);
    if let Err(source) = fs::rename(&self.path, &archived) {
      if let Err(e) = state.file.reopen() {
        tracing::warn!(path = %self.path.display(), error = %e, "could not reopen after failed rename");
      }
      return Err(SinkError::Rename {
        from: self.path.clone(),
        to: archived,
        source,
      });
    }
    tracing::debug!(
      path = %self.path.display(),
      archived = %archived.display(),
      "rotated log file"
    );

    let hooks = subscribers.iter().try_for_each(|subscriber| {
      subscriber
        .on_post_rotate(&archived)
        .map_err(|e| SinkError::hook(HookKind::PostRotate, e))
    });
    state.file.reopen()?;
    hooks?;

    Ok(archived)
  }

  /// `<path>.<timestamp>`, with a numeric suffix when that name exists.
  fn archive_name(&self, at: DateTime<Local>) -> PathBuf {
    let mut base = OsString::from(self.path.as_os_str());
    base.push(".");
    base.push(at.format(&self.timestamp_format).to_string());

    let candidate = PathBuf::from(&base);
    if !candidate.exists() {
      return candidate;
    }
    (1u32..)
      .map(|n| {
        let mut name = base.clone();
        name.push(format!(".{}", n));
        PathBuf::from(name)
      })
      .find(|p| !p.exists())
      .unwrap_or(candidate)
  }

  /// Flushes, closes and reopens the same path between the reload hooks.
  pub fn reload(&self) -> Result<()> {
    let mut state = self.lock()?;
    if !state.file.is_open() {
      return Err(SinkError::Closed);
    }
    let subscribers = state.subscribers.clone();

    for subscriber in &subscribers {
      subscriber
        .on_pre_reload()
        .map_err(|e| SinkError::hook(HookKind::PreReload, e))?;
    }

    state.file.reload()?;
    tracing::debug!(path = %self.path.display(), "reloaded log file");

    for subscriber in &subscribers {
      subscriber
        .on_post_reload()
        .map_err(|e| SinkError::hook(HookKind::PostReload, e))?;
    }
    Ok(())
  }

  /// Flushes and releases the file, and stops the daemon if one is running.
  /// Closing twice is a no-op.
  pub fn close(&self) -> Result<()> {
    self.signal.stop();
    self.lock()?.file.release()
  }

  /// Runs the rotate/flush daemon on the calling thread until [`RotatingSink::stop`].
  pub fn run(&self) {
    let rotate = tick(self.rotate_interval);
    let flush = tick(self.flush_interval);
    let stop = self.signal.stop_receiver().clone();

    loop {
      select! {
        recv(stop) -> _ => break,
        recv(rotate) -> _ => {
          if let Err(e) = self.rotate() {
            self.report(e);
          }
        },
        recv(flush) -> _ => {
          if let Err(e) = self.flush() {
            self.report(e);
          }
        },
      }
    }

    tracing::debug!(path = %self.path.display(), "rotate daemon stopped");
    self.signal.mark_done();
  }

  fn report(&self, error: SinkError) {
    // a tick that raced with close has nothing to do
    if !matches!(error, SinkError::Closed) {
      self.errors.report(SINK_NAME, error);
    }
  }

  /// Starts [`RotatingSink::run`] on a background thread.
  pub fn spawn(self: &Arc<Self>) -> Result<JoinHandle<()>> {
    let sink = Arc::clone(self);
    Ok(spawn_named("logsink-rotate", move || sink.run())?)
  }

  /// Asks the daemon to exit after its current operation.
  pub fn stop(&self) {
    self.signal.stop();
  }

  /// Receives one `()` once [`RotatingSink::run`] has returned.
  pub fn done(&self) -> Receiver<()> {
    self.signal.done()
  }

  /// Errors from periodic rotate and flush.
  pub fn errors(&self) -> Receiver<SinkError> {
    self.errors.receiver()
  }
}

impl Sink for RotatingSink {
  fn log(&self, fields: &Fields) {
    let result = self
      .lock()
      .and_then(|mut state| state.file.write_line(&self.format, fields));
    if let Err(e) = result {
      tracing::warn!(path = %self.path.display(), error = %e, "rotating sink dropped a line");
    }
  }
}

impl ReloadSink for RotatingSink {
  fn reload(&self) -> Result<()> {
    RotatingSink::reload(self)
  }

  fn flush(&self) -> Result<()> {
    RotatingSink::flush(self)
  }

  fn close(&self) -> Result<()> {
    RotatingSink::close(self)
  }
}

impl std::fmt::Debug for RotatingSink {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RotatingSink")
      .field("path", &self.path)
      .field("rotate_interval", &self.rotate_interval)
      .field("timestamp_format", &self.timestamp_format)
      .finish()
  }
}
