
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Boxed error returned by user supplied hooks and remote stream targets.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, SinkError>;

/// Identifies which subscriber hook rejected a rotate or reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
  PreRotate,
  PostRotate,
  PreReload,
  PostReload,
}

impl HookKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      HookKind::PreRotate => "pre-rotate",
      HookKind::PostRotate => "post-rotate",
      HookKind::PreReload => "pre-reload",
      HookKind::PostReload => "post-reload",
    }
  }

  /// Pre hooks veto the operation, post hooks only report.
  pub fn is_pre(&self) -> bool {
    matches!(self, HookKind::PreRotate | HookKind::PreReload)
  }
}

impl fmt::Display for HookKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Errors produced by sinks, their daemons and their configuration.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
  /// The backing file could neither be opened nor created
  #[error("unable to open or create {}: {source}", path.display())]
  Open {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Write, flush or close on the backing resource failed
  #[error("io error: {0}")]
  Io(#[from] io::Error),

  /// Operation attempted on a sink whose handle has been released
  #[error("sink is closed")]
  Closed,

  /// Renaming the active file during rotation failed
  #[error("unable to rename {} to {}: {source}", from.display(), to.display())]
  Rename {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  /// A subscriber hook returned an error
  #[error("{hook} hook failed: {source}")]
  Hook {
    hook: HookKind,
    #[source]
    source: BoxError,
  },

  /// The remote stream rejected a batch
  #[error("stream error: {0}")]
  Stream(#[source] BoxError),

  /// The syslog connection failed or refused a message
  #[error("syslog error: {0}")]
  Syslog(#[source] BoxError),

  /// Append on a full record buffer
  #[error("record buffer overflow (capacity {capacity})")]
  BufferOverflow { capacity: usize },

  /// Malformed format template or template/field mismatch
  #[error("format error: {0}")]
  Format(String),

  /// Invalid configuration value
  #[error("configuration error: {0}")]
  Config(String),

  /// A thread panicked while holding the sink lock
  #[error("sink lock poisoned")]
  Poisoned,
}

impl SinkError {
  pub fn hook(hook: HookKind, source: BoxError) -> Self {
    SinkError::Hook { hook, source }
  }
}

impl<T> From<std::sync::PoisonError<T>> for SinkError {
  fn from(_: std::sync::PoisonError<T>) -> Self {
    SinkError::Poisoned
  }
}
