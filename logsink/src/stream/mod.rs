//! # Stream
//!
//! Batches records for a remote target that accepts many records per call.
//!
//! [`StreamWriter`] buffers each write in a [`RecordBuffer`] and sends the
//! batch with one [`Stream::put`] when a threshold is reached. Thresholds are
//! checked *before* a record is admitted: if the buffer already holds
//! `max_items` records or `max_bytes` bytes it is flushed first, and only then
//! is the new record appended. A flushed batch therefore never contains the
//! record that triggered it, and a single record larger than `max_bytes` is
//! still accepted.
//!
//! Delivery is at most once. A failed `put` drops the batch and the error is
//! returned; retrying is left to the caller or to the [`Stream`] itself.
//!
//! [`StreamSink`] puts a lock and a flush daemon around a writer so it can be
//! handed to a logger.


use crossbeam_channel::{select, tick, Receiver};
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::buffer::{RecordBuffer, StreamRecord, DEFAULT_MAX_BYTES, DEFAULT_MAX_RECORDS};
use crate::config::StreamConfig;
use crate::daemon::{spawn_named, ErrorChannel, StopSignal};
use crate::error::{BoxError, Result, SinkError};
use crate::fields::Fields;
use crate::format::LineFormat;
use crate::sink::{ReloadSink, Sink};

const SINK_NAME: &str = "stream";

/// A remote target accepting batches of byte records.
pub trait Stream: Send {
  /// Whatever the target answers with for one batch.
  type Response;

  /// Delivers `records` in order, in one call.
  fn put(&mut self, records: &[StreamRecord]) -> std::result::Result<Self::Response, BoxError>;

  /// Releases the target.
  fn close(&mut self) -> std::result::Result<(), BoxError>;
}

/// Buffers records and sends them to a [`Stream`] in batches.
#[derive(Debug)]
pub struct StreamWriter<S> {
  stream: S,
  buffer: RecordBuffer,
  max_items: usize,
  max_bytes: usize,
}

impl<S: Stream> StreamWriter<S> {
  /// A writer with the default thresholds: 500 records or 1 MiB.
  pub fn new(stream: S) -> Self {
    Self {
      stream,
      buffer: RecordBuffer::new(DEFAULT_MAX_RECORDS),
      max_items: DEFAULT_MAX_RECORDS,
      max_bytes: DEFAULT_MAX_BYTES,
    }
  }

  /// A writer flushing at `max_items` records or `max_bytes` bytes.
  pub fn with_thresholds(stream: S, max_items: usize, max_bytes: usize) -> Result<Self> {
    if max_items == 0 || max_bytes == 0 {
      return Err(SinkError::Config(
        "stream thresholds must be greater than zero".to_string(),
      ));
    }
    Ok(Self {
      stream,
      buffer: RecordBuffer::new(max_items),
      max_items,
      max_bytes,
    })
  }

  pub fn from_config(stream: S, config: &StreamConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self {
      stream,
      buffer: RecordBuffer::new(config.buffer_capacity),
      max_items: config.max_items,
      max_bytes: config.max_bytes,
    })
  }

  fn over_threshold(&self) -> bool {
    self.buffer.count() >= self.max_items || self.buffer.size() >= self.max_bytes
  }

  /// Copies `bytes` into the batch, flushing the current batch first when it
  /// is at a threshold.
  ///
  /// An empty write admits nothing. If the preceding flush fails the batch is
  /// lost, `bytes` is still admitted and the flush error is returned.
  pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
    if bytes.is_empty() {
      return Ok(0);
    }

    let flushed = if self.over_threshold() {
      self.flush().map(|_| ())
    } else {
      Ok(())
    };
    self.buffer.append(bytes)?;

    flushed.map(|()| bytes.len())
  }

  /// Sends the buffered batch in one `put` and empties the buffer.
  ///
  /// The buffer is emptied even when `put` fails. An empty buffer makes no
  /// call and returns `Ok(None)`.
  pub fn flush(&mut self) -> Result<Option<S::Response>> {
    if self.buffer.is_empty() {
      return Ok(None);
    }

    let count = self.buffer.count();
    let result = self.stream.put(self.buffer.records());
    self.buffer.reset();

    match result {
      Ok(response) => {
        tracing::trace!(records = count, "stream batch delivered");
        Ok(Some(response))
      },
      Err(e) => Err(SinkError::Stream(e)),
    }
  }

  /// Drops buffered records without sending them.
  pub fn reset(&mut self) {
    self.buffer.reset();
  }

  /// Closes the target. Buffered records are not flushed.
  pub fn close(&mut self) -> Result<()> {
    self.stream.close().map_err(SinkError::Stream)
  }

  pub fn buffered_items(&self) -> usize {
    self.buffer.count()
  }

  pub fn buffered_bytes(&self) -> usize {
    self.buffer.size()
  }

  pub fn thresholds(&self) -> (usize, usize) {
    (self.max_items, self.max_bytes)
  }

  pub fn get_ref(&self) -> &S {
    &self.stream
  }

  pub fn get_mut(&mut self) -> &mut S {
    &mut self.stream
  }

  /// Returns the target; buffered records are discarded.
  pub fn into_inner(self) -> S {
    self.stream
  }

  fn renew_buffer(&mut self) {
    self.buffer = RecordBuffer::new(self.buffer.capacity());
  }
}

/// A [`Stream`] writing every record to an [`io::Write`](std::io::Write).
///
/// The response is the number of records delivered.
#[derive(Debug)]
pub struct WriterStream<W> {
  out: W,
}

impl<W: Write + Send> WriterStream<W> {
  pub fn new(out: W) -> Self {
    Self { out }
  }

  pub fn get_ref(&self) -> &W {
    &self.out
  }

  pub fn into_inner(self) -> W {
    self.out
  }
}

impl<W: Write + Send> Stream for WriterStream<W> {
  type Response = usize;

  fn put(&mut self, records: &[StreamRecord]) -> std::result::Result<usize, BoxError> {
    for record in records {
      self.out.write_all(record)?;
    }
    self.out.flush()?;
    Ok(records.len())
  }

  fn close(&mut self) -> std::result::Result<(), BoxError> {
    Ok(self.out.flush()?)
  }
}

struct StreamState<S> {
  writer: StreamWriter<S>,
  line: String,
  closed: bool,
}

/// A lock-guarded [`StreamWriter`] with a periodic flush daemon.
pub struct StreamSink<S> {
  format: LineFormat,
  flush_interval: Duration,
  state: Mutex<StreamState<S>>,
  signal: StopSignal,
  errors: ErrorChannel,
}

impl<S: Stream> StreamSink<S> {
  pub fn new(stream: S, config: StreamConfig) -> Result<Self> {
    let format = config.format.build()?;
    let writer = StreamWriter::from_config(stream, &config)?;
    Ok(Self {
      format,
      flush_interval: config.flush_interval,
      state: Mutex::new(StreamState {
        writer,
        line: String::with_capacity(256),
        closed: false,
      }),
      signal: StopSignal::new(),
      errors: ErrorChannel::new(config.error_capacity),
    })
  }

  fn lock(&self) -> Result<MutexGuard<'_, StreamState<S>>> {
    let state = self.state.lock()?;
    if state.closed {
      return Err(SinkError::Closed);
    }
    Ok(state)
  }

  pub fn write(&self, bytes: &[u8]) -> Result<usize> {
    self.lock()?.writer.write(bytes)
  }

  pub fn flush(&self) -> Result<()> {
    self.lock()?.writer.flush().map(|_| ())
  }

  /// Flushes, then continues with a freshly allocated batch buffer against
  /// the same target.
  pub fn reload(&self) -> Result<()> {
    let mut state = self.lock()?;
    let flushed = state.writer.flush().map(|_| ());
    state.writer.renew_buffer();
    flushed
  }

  /// Closes the target without flushing and stops the daemon. Closing twice
  /// is a no-op.
  pub fn close(&self) -> Result<()> {
    self.signal.stop();
    let mut state = self.state.lock()?;
    if state.closed {
      return Ok(());
    }
    state.closed = true;
    state.writer.close()
  }

  pub fn buffered_items(&self) -> usize {
    self
      .state
      .lock()
      .map(|state| state.writer.buffered_items())
      .unwrap_or(0)
  }

  /// Runs the flush daemon on the calling thread until [`StreamSink::stop`].
  pub fn run(&self) {
    let flush = tick(self.flush_interval);
    let stop = self.signal.stop_receiver().clone();

    loop {
      select! {
        recv(stop) -> _ => break,
        recv(flush) -> _ => match self.flush() {
          Ok(()) | Err(SinkError::Closed) => {},
          Err(e) => {
            self.errors.report(SINK_NAME, e);
          },
        },
      }
    }

    tracing::debug!("stream daemon stopped");
    self.signal.mark_done();
  }

  pub fn stop(&self) {
    self.signal.stop();
  }

  pub fn done(&self) -> Receiver<()> {
    self.signal.done()
  }

  pub fn errors(&self) -> Receiver<SinkError> {
    self.errors.receiver()
  }
}

impl<S: Stream + 'static> StreamSink<S> {
  /// Starts [`StreamSink::run`] on a background thread.
  pub fn spawn(self: &Arc<Self>) -> Result<JoinHandle<()>> {
    let sink = Arc::clone(self);
    Ok(spawn_named("logsink-stream", move || sink.run())?)
  }
}

impl<S: Stream> Sink for StreamSink<S> {
  fn log(&self, fields: &Fields) {
    let result = self.lock().and_then(|mut state| {
      let StreamState { writer, line, .. } = &mut *state;
      line.clear();
      self.format.render(fields, line);
      writer.write(line.as_bytes()).map(|_| ())
    });
    if let Err(e) = result {
      tracing::warn!(error = %e, "stream sink dropped a line");
    }
  }
}

impl<S: Stream> ReloadSink for StreamSink<S> {
  fn reload(&self) -> Result<()> {
    StreamSink::reload(self)
  }

  fn flush(&self) -> Result<()> {
    StreamSink::flush(self)
  }

  fn close(&self) -> Result<()> {
    StreamSink::close(self)
  }
}
