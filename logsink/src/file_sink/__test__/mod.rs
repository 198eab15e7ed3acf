#[cfg(test)]
mod tests {
  use std::fs;
  use std::sync::Arc;
  use std::thread;
  use std::time::{Duration, Instant};

  use tempfile::tempdir;

  use crate::config::FileSinkConfig;
  use crate::error::SinkError;
  use crate::fields::{Fields, MESSAGE, PRIORITY, TIME};
  use crate::file_sink::{BufferedFileSink, LogFile};
  use crate::format::LineFormat;
  use crate::priority::Priority;
  use crate::sink::{ReloadSink, Sink};

  const MESSAGE_BYTES: &[u8] = b"message";

  fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
      if check() {
        return true;
      }
      thread::sleep(Duration::from_millis(20));
    }
    check()
  }

  #[test]
  fn test_open_creates_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("new.log");
    assert!(!path.exists());

    let sink = BufferedFileSink::open_path(&path).unwrap();
    assert!(path.exists());
    assert!(sink.is_open());
    assert_eq!(sink.path(), path.as_path());
  }

  #[test]
  fn test_open_appends_to_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("existing.log");
    fs::write(&path, "old\n").unwrap();

    let sink = BufferedFileSink::open_path(&path).unwrap();
    sink.write(b"new\n").unwrap();
    sink.flush().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
  }

  #[test]
  fn test_open_failure_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("app.log");

    match BufferedFileSink::open_path(&path) {
      Err(SinkError::Open { path: p, .. }) => assert_eq!(p, path),
      other => panic!("expected open error, got {:?}", other.map(|_| ())),
    }
  }

  #[test]
  fn test_writes_stay_buffered_until_flush() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("buffered.log");
    let sink = BufferedFileSink::open_path(&path).unwrap();

    sink.write(b"first\n").unwrap();
    sink.write(b"second\n").unwrap();
    assert_eq!(fs::read(&path).unwrap().len(), 0);
    assert_eq!(sink.buffered_bytes(), 13);

    sink.flush().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    assert_eq!(sink.buffered_bytes(), 0);
  }

  #[test]
  fn test_log_renders_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("format.log");
    let sink = BufferedFileSink::open_path(&path).unwrap();

    let fields = Fields::new()
      .with(TIME, "now")
      .with(PRIORITY, Priority::Info)
      .with(MESSAGE, "foo");
    sink.log(&fields);
    sink.log(&fields);
    sink.close().unwrap();

    assert_eq!(
      fs::read_to_string(&path).unwrap(),
      "now [INFO] foo\nnow [INFO] foo\n"
    );
  }

  #[test]
  fn test_reload_picks_up_renamed_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    let moved = dir.path().join("app.log.1");
    let sink = BufferedFileSink::open_path(&path).unwrap();

    sink.write(b"before\n").unwrap();
    // an operator moves the file away under the running process
    fs::rename(&path, &moved).unwrap();
    sink.reload().unwrap();
    sink.write(b"after\n").unwrap();
    sink.flush().unwrap();

    assert_eq!(fs::read_to_string(&moved).unwrap(), "before\n");
    assert_eq!(fs::read_to_string(&path).unwrap(), "after\n");
  }

  #[test]
  fn test_close_flushes_and_rejects_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("closed.log");
    let sink = BufferedFileSink::open_path(&path).unwrap();

    sink.write(b"last words\n").unwrap();
    sink.close().unwrap();
    assert!(!sink.is_open());
    assert_eq!(fs::read_to_string(&path).unwrap(), "last words\n");

    assert!(matches!(sink.write(b"x"), Err(SinkError::Closed)));
    assert!(matches!(sink.flush(), Err(SinkError::Closed)));
    assert!(matches!(sink.reload(), Err(SinkError::Closed)));
    // closing again is harmless
    sink.close().unwrap();
  }

  #[test]
  fn test_daemon_flushes_periodically() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("daemon.log");
    let config = FileSinkConfig::new(&path)
      .with_intervals(Duration::from_millis(50), Duration::from_secs(3600));
    let sink = BufferedFileSink::open(config).unwrap();

    sink.write(b"tick\n").unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
      fs::read_to_string(&path).map(|s| s == "tick\n").unwrap_or(false)
    }));
    assert!(sink.errors().try_recv().is_err());
  }

  #[test]
  fn test_daemon_reloads_periodically() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reload.log");
    let moved = dir.path().join("reload.log.old");
    let config = FileSinkConfig::new(&path)
      .with_intervals(Duration::from_secs(3600), Duration::from_millis(50));
    let sink = BufferedFileSink::open(config).unwrap();

    fs::rename(&path, &moved).unwrap();
    // the daemon reload recreates the original path
    assert!(wait_until(Duration::from_secs(5), || path.exists()));
    drop(sink);
  }

  #[test]
  fn test_drop_flushes_buffer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("drop.log");
    {
      let sink = BufferedFileSink::open_path(&path).unwrap();
      sink.write(b"kept\n").unwrap();
    }
    assert_eq!(fs::read_to_string(&path).unwrap(), "kept\n");
  }

  #[test]
  fn test_concurrent_write_and_reload() {
    const N: usize = 10;
    let dir = tempdir().unwrap();

    let sinks: Vec<Arc<BufferedFileSink>> = (0..N)
      .map(|i| {
        let path = dir.path().join(format!("file_sink_test_{}.log", i));
        Arc::new(BufferedFileSink::open_path(path).unwrap())
      })
      .collect();

    let mut handles = Vec::new();
    for sink in &sinks {
      let writer = Arc::clone(sink);
      handles.push(thread::spawn(move || {
        for _ in 0..N {
          assert_eq!(writer.write(MESSAGE_BYTES).unwrap(), MESSAGE_BYTES.len());
        }
        writer.flush().unwrap();
      }));

      let reloader = Arc::clone(sink);
      handles.push(thread::spawn(move || {
        ReloadSink::reload(&reloader).unwrap();
      }));
    }
    for handle in handles {
      handle.join().unwrap();
    }

    for sink in &sinks {
      sink.close().unwrap();
      let content = fs::read(sink.path()).unwrap();
      assert_eq!(content.len(), MESSAGE_BYTES.len() * N);
      assert_eq!(content, MESSAGE_BYTES.repeat(N));
    }
  }

  #[test]
  fn test_log_file_release_and_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    let mut file = LogFile::open(&path, 1024).unwrap();

    file.write(b"one\n").unwrap();
    assert_eq!(file.buffered_bytes(), 4);
    file.release().unwrap();
    assert!(!file.is_open());
    assert_eq!(fs::read(&path).unwrap(), b"one\n");

    // releasing twice is fine, writing is not
    file.release().unwrap();
    assert!(matches!(file.write(b"x"), Err(SinkError::Closed)));
    assert!(matches!(file.flush(), Err(SinkError::Closed)));
    assert!(matches!(file.reload(), Err(SinkError::Closed)));

    file.reopen().unwrap();
    file.write(b"two\n").unwrap();
    file.flush().unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"one\ntwo\n");
  }

  #[test]
  fn test_log_file_write_line_reuses_scratch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    let mut file = LogFile::open(&path, 1024).unwrap();
    let format = LineFormat::new("%s\n", &[MESSAGE]).unwrap();

    for message in ["a longer first line", "short"] {
      let fields = Fields::new().with(MESSAGE, message);
      file.write_line(&format, &fields).unwrap();
    }
    file.flush().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "a longer first line\nshort\n");
  }

  #[test]
  fn test_log_file_reload_follows_rename() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    let moved = dir.path().join("app.log.old");
    let mut file = LogFile::open(&path, 1024).unwrap();

    file.write(b"before\n").unwrap();
    fs::rename(&path, &moved).unwrap();
    file.reload().unwrap();
    file.write(b"after\n").unwrap();
    file.flush().unwrap();

    assert_eq!(fs::read(&moved).unwrap(), b"before\n");
    assert_eq!(fs::read(&path).unwrap(), b"after\n");
  }
}
