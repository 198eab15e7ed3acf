//! # Sink
//!
//! A sink consumes the [`Fields`] of one log event and renders them to its
//! backing resource. The logger only ever needs [`Sink::log`]; sinks that own
//! a reloadable resource also implement [`ReloadSink`].
//!
//! `log` returns nothing on purpose: a failing sink must not stop the logger
//! from reaching the others. Sinks report write failures through `tracing`
//! or through their daemon error channel instead.


use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::fields::Fields;
use crate::format::LineFormat;
use crate::priority::Priority;

/// Core trait for log sinks.
pub trait Sink: Send + Sync {
  /// Render and deliver one event.
  fn log(&self, fields: &Fields);
}

/// A sink whose backing resource can be flushed, reopened and released.
pub trait ReloadSink: Sink {
  /// Flush, release and reacquire the backing resource.
  fn reload(&self) -> Result<()>;

  /// Push buffered bytes to the backing resource.
  fn flush(&self) -> Result<()>;

  /// Flush and release the backing resource.
  fn close(&self) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
  fn log(&self, fields: &Fields) {
    (**self).log(fields)
  }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
  fn log(&self, fields: &Fields) {
    (**self).log(fields)
  }
}

impl<S: ReloadSink + ?Sized> ReloadSink for Arc<S> {
  fn reload(&self) -> Result<()> {
    (**self).reload()
  }

  fn flush(&self) -> Result<()> {
    (**self).flush()
  }

  fn close(&self) -> Result<()> {
    (**self).close()
  }
}

struct WriterState<W> {
  out: W,
  line: String,
}

/// Renders each event straight to an [`io::Write`], one `write_all` per line.
pub struct WriterSink<W: Write + Send> {
  format: LineFormat,
  state: Mutex<WriterState<W>>,
}

impl<W: Write + Send> WriterSink<W> {
  pub fn new(out: W, format: LineFormat) -> Self {
    Self {
      format,
      state: Mutex::new(WriterState {
        out,
        line: String::with_capacity(256),
      }),
    }
  }

  pub fn format(&self) -> &LineFormat {
    &self.format
  }

  /// Consumes the sink and returns the writer.
  pub fn into_inner(self) -> W {
    match self.state.into_inner() {
      Ok(state) => state.out,
      Err(poisoned) => poisoned.into_inner().out,
    }
  }
}

impl WriterSink<io::Stdout> {
  pub fn stdout(format: LineFormat) -> Self {
    Self::new(io::stdout(), format)
  }
}

impl WriterSink<io::Stderr> {
  pub fn stderr(format: LineFormat) -> Self {
    Self::new(io::stderr(), format)
  }
}

impl<W: Write + Send> Sink for WriterSink<W> {
  fn log(&self, fields: &Fields) {
    if let Ok(mut state) = self.state.lock() {
      let WriterState { out, line } = &mut *state;
      line.clear();
      self.format.render(fields, line);
      if let Err(e) = out.write_all(line.as_bytes()) {
        tracing::warn!(error = %e, "writer sink dropped a line");
      }
    }
  }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
  fn log(&self, _fields: &Fields) {}
}

/// Forwards only events at least as severe as `threshold`.
///
/// Severity follows syslog numbering, so an event passes when its priority
/// value is numerically `<=` the threshold. Events without a `priority`
/// field are dropped.
#[derive(Debug, Clone)]
pub struct FilterSink<S> {
  threshold: Priority,
  target: S,
}

impl<S: Sink> FilterSink<S> {
  pub fn new(threshold: Priority, target: S) -> Self {
    Self { threshold, target }
  }

  pub fn threshold(&self) -> Priority {
    self.threshold
  }

  pub fn target(&self) -> &S {
    &self.target
  }
}

impl<S: Sink> Sink for FilterSink<S> {
  fn log(&self, fields: &Fields) {
    if fields.priority().is_some_and(|p| p.passes(self.threshold)) {
      self.target.log(fields);
    }
  }
}
