#[cfg(test)]
mod tests {
  use std::time::Duration;

  use crate::daemon::{spawn_named, ErrorChannel, StopSignal};
  use crate::error::SinkError;

  #[test]
  fn test_error_channel_delivers_in_order() {
    let errors = ErrorChannel::new(4);
    assert!(errors.report("test", SinkError::Closed));
    assert!(errors.report("test", SinkError::Poisoned));

    let rx = errors.receiver();
    assert!(matches!(rx.try_recv(), Ok(SinkError::Closed)));
    assert!(matches!(rx.try_recv(), Ok(SinkError::Poisoned)));
    assert!(rx.try_recv().is_err());
  }

  #[test]
  fn test_full_error_channel_never_blocks() {
    let errors = ErrorChannel::new(1);
    assert!(errors.report("test", SinkError::Closed));
    // second report is dropped rather than waiting for a reader
    assert!(!errors.report("test", SinkError::Poisoned));
    assert_eq!(errors.pending(), 1);
  }

  #[test]
  fn test_zero_capacity_is_clamped() {
    let errors = ErrorChannel::new(0);
    assert!(errors.report("test", SinkError::Closed));
  }

  #[test]
  fn test_stop_is_idempotent_and_buffered() {
    let signal = StopSignal::new();
    signal.stop();
    signal.stop();
    assert!(signal.stop_receiver().try_recv().is_ok());
    assert!(signal.stop_receiver().try_recv().is_err());
  }

  #[test]
  fn test_done_after_mark() {
    let signal = StopSignal::new();
    let done = signal.done();
    assert!(done.try_recv().is_err());
    signal.mark_done();
    assert!(done.recv_timeout(Duration::from_secs(1)).is_ok());
  }

  #[test]
  fn test_spawn_named() {
    let handle = spawn_named("logsink-test", || {
      assert_eq!(std::thread::current().name(), Some("logsink-test"));
    })
    .unwrap();
    handle.join().unwrap();
  }
}
