use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing_subscriber::layer::SubscriberExt;

use logsink::bridge::SinkLayer;
use logsink::config::{FileSinkConfig, RotateConfig, StreamConfig};
use logsink::error::BoxError;
use logsink::file_sink::BufferedFileSink;
use logsink::format::LineFormat;
use logsink::rotate::{RotatingSink, Subscriber};
use logsink::sink::{FilterSink, ReloadSink, WriterSink};
use logsink::stream::{StreamSink, WriterStream};
use logsink::syslog::SyslogSink;
use logsink::{Logger, Priority};

/// Prints every archive the rotating sink produces.
struct AnnounceRotation;

impl Subscriber for AnnounceRotation {
  fn on_post_rotate(&self, archived: &Path) -> Result<(), BoxError> {
    println!("archived {}", archived.display());
    Ok(())
  }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  // diagnostics from the sinks themselves
  tracing_subscriber::fmt().with_writer(io::stderr).init();

  let dir = tempfile::tempdir()?;
  println!("writing logs under {}", dir.path().display());

  // flushes every 200ms instead of every 30s so the demo shows output quickly
  let file = Arc::new(BufferedFileSink::open(
    FileSinkConfig::new(dir.path().join("app.log"))
      .with_intervals(Duration::from_millis(200), Duration::from_secs(3600)),
  )?);

  let rotating = Arc::new(RotatingSink::open(
    RotateConfig::new(dir.path().join("rotating.log"), Duration::from_secs(1))
      .with_flush_interval(Duration::from_millis(200)),
  )?);
  rotating.subscribe(AnnounceRotation)?;
  let rotate_daemon = rotating.spawn()?;

  // a stand-in for a remote ingestion endpoint: batches land on stdout
  let stream = Arc::new(StreamSink::new(
    WriterStream::new(io::stdout()),
    StreamConfig::default()
      .with_thresholds(5, 64 * 1024)
      .with_flush_interval(Duration::from_millis(500)),
  )?);
  let stream_daemon = stream.spawn()?;

  let mut builder = Logger::builder()
    .prefix("demo")
    .shared_sink(file.clone())
    .shared_sink(rotating.clone())
    .shared_sink(stream.clone())
    .sink(FilterSink::new(
      Priority::Error,
      WriterSink::stderr(LineFormat::syslog()),
    ));

  // warnings and worse also go to the local syslog daemon, when there is one
  match SyslogSink::connect(Priority::Warning, "logsink-demo", LineFormat::syslog()) {
    Ok(syslog) => builder = builder.sink(FilterSink::new(Priority::Warning, syslog)),
    Err(e) => tracing::warn!(error = %e, "syslog unavailable, skipping"),
  }
  let logger = Arc::new(builder.build());

  logger.info("application started");
  logger.warning("cache is cold");
  logger.error("upstream timed out");

  // events from code instrumented with `tracing` reach the same sinks
  let layered = tracing_subscriber::registry().with(SinkLayer::new(logger.clone()));
  tracing::subscriber::with_default(layered, || {
    for i in 1..=12 {
      tracing::info!(item = i, "processing");
      thread::sleep(Duration::from_millis(150));
    }
    tracing::error!(target: "demo::worker", "item 7 failed validation");
  });

  logger.notice("shutting down");

  rotating.stop();
  rotate_daemon.join().ok();
  stream.stop();
  stream_daemon.join().ok();

  ReloadSink::close(&file)?;
  ReloadSink::close(&rotating)?;
  stream.flush()?;
  ReloadSink::close(&stream)?;

  for entry in std::fs::read_dir(dir.path())? {
    let entry = entry?;
    println!("{} ({} bytes)", entry.path().display(), entry.metadata()?.len());
  }
  Ok(())
}
