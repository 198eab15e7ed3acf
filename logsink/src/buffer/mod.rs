
use crate::error::{Result, SinkError};

/// Default number of records a batch buffer can hold.
pub const DEFAULT_MAX_RECORDS: usize = 500;

/// Default byte budget for a batch (1 MiB).
pub const DEFAULT_MAX_BYTES: usize = 1024 * 1024;

/// A single record sent to a remote stream.
pub type StreamRecord = Vec<u8>;

/// A fixed-capacity, ordered sequence of byte records.
///
/// Tracks the number of records and the sum of their lengths since the last
/// [`RecordBuffer::reset`]. Unlike the ring buffers used elsewhere for
/// snapshots, nothing is ever evicted: appending to a full buffer fails with
/// [`SinkError::BufferOverflow`] and the caller is expected to drain first.
///
/// # Example
/// ```rust
/// use logsink::buffer::RecordBuffer;
///
/// let mut buffer = RecordBuffer::new(2);
/// buffer.append(b"ab").unwrap();
/// buffer.append(b"cde").unwrap();
/// assert_eq!(buffer.count(), 2);
/// assert_eq!(buffer.size(), 5);
/// assert!(buffer.append(b"f").is_err());
///
/// buffer.reset();
/// assert!(buffer.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RecordBuffer {
  records: Vec<StreamRecord>,
  capacity: usize,
  size: usize,
}

impl RecordBuffer {
  /// Creates an empty buffer with storage for `capacity` records.
  pub fn new(capacity: usize) -> Self {
    Self {
      records: Vec::with_capacity(capacity),
      capacity,
      size: 0,
    }
  }

  /// Copies `bytes` into a new record at the end of the buffer.
  pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
    if self.records.len() >= self.capacity {
      return Err(SinkError::BufferOverflow {
        capacity: self.capacity,
      });
    }
    self.records.push(bytes.to_vec());
    self.size += bytes.len();
    Ok(())
  }

  /// Records in admission order.
  pub fn records(&self) -> &[StreamRecord] {
    &self.records
  }

  /// Returns the buffer to empty. Storage is kept for reuse.
  pub fn reset(&mut self) {
    self.records.clear();
    self.size = 0;
  }

  /// Number of records appended since the last reset.
  #[inline]
  pub fn count(&self) -> usize {
    self.records.len()
  }

  /// Total bytes across all records.
  #[inline]
  pub fn size(&self) -> usize {
    self.size
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  #[inline]
  pub fn is_full(&self) -> bool {
    self.records.len() >= self.capacity
  }

  pub fn remaining_capacity(&self) -> usize {
    self.capacity.saturating_sub(self.records.len())
  }
}

impl Default for RecordBuffer {
  fn default() -> Self {
    Self::new(DEFAULT_MAX_RECORDS)
  }
}
