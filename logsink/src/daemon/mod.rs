//! # Daemon plumbing
//!
//! Sinks with periodic work (flush, reload, rotate) run it on one background
//! thread per sink. The thread waits on `crossbeam_channel` tickers and a stop
//! receiver; everything it does goes through the sink's public, locked
//! operations, so a tick never interleaves with a caller's write.
//!
//! Two channels face the operator:
//! - an error channel, bounded and written with `try_send`. A full channel
//!   drops the newest error with a `tracing` warning, so an operator who never
//!   reads it can not stall the daemon.
//! - a stop/done pair. `stop` is cooperative: the loop only sees it between
//!   operations, never in the middle of one.

mod __test__;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::io;
use std::thread::{self, JoinHandle};

use crate::error::SinkError;

/// Bounded channel carrying errors hit by a background daemon.
#[derive(Debug)]
pub struct ErrorChannel {
  sender: Sender<SinkError>,
  receiver: Receiver<SinkError>,
}

impl ErrorChannel {
  pub fn new(capacity: usize) -> Self {
    let (sender, receiver) = bounded(capacity.max(1));
    Self { sender, receiver }
  }

  /// Queues `error` without blocking. Returns `false` if it was dropped.
  pub fn report(&self, sink: &str, error: SinkError) -> bool {
    match self.sender.try_send(error) {
      Ok(()) => true,
      Err(TrySendError::Full(error)) => {
        tracing::warn!(sink, error = %error, "error channel full, dropping daemon error");
        false
      },
      Err(TrySendError::Disconnected(error)) => {
        tracing::warn!(sink, error = %error, "error channel closed, dropping daemon error");
        false
      },
    }
  }

  pub fn receiver(&self) -> Receiver<SinkError> {
    self.receiver.clone()
  }

  /// Errors waiting to be read.
  pub fn pending(&self) -> usize {
    self.receiver.len()
  }
}

/// Cooperative stop request plus a completion notice for a `run` loop.
#[derive(Debug)]
pub struct StopSignal {
  stop_tx: Sender<()>,
  stop_rx: Receiver<()>,
  done_tx: Sender<()>,
  done_rx: Receiver<()>,
}

impl StopSignal {
  pub fn new() -> Self {
    let (stop_tx, stop_rx) = bounded(1);
    let (done_tx, done_rx) = bounded(1);
    Self {
      stop_tx,
      stop_rx,
      done_tx,
      done_rx,
    }
  }

  /// Asks the loop to exit. Never blocks; repeated calls are harmless.
  pub fn stop(&self) {
    let _ = self.stop_tx.try_send(());
  }

  /// The receiver a `run` loop selects on.
  pub fn stop_receiver(&self) -> &Receiver<()> {
    &self.stop_rx
  }

  /// Called by the loop on its way out.
  pub fn mark_done(&self) {
    let _ = self.done_tx.try_send(());
  }

  /// Yields one `()` after the loop has returned.
  pub fn done(&self) -> Receiver<()> {
    self.done_rx.clone()
  }
}

impl Default for StopSignal {
  fn default() -> Self {
    Self::new()
  }
}

/// Spawns a named daemon thread.
pub fn spawn_named<F>(name: &str, body: F) -> io::Result<JoinHandle<()>>
where
  F: FnOnce() + Send + 'static,
{
  thread::Builder::new().name(name.to_string()).spawn(body)
}
