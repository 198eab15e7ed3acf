#[cfg(test)]
mod tests {
  use std::path::PathBuf;
  use std::time::Duration;

  use crate::config::{
    FileSinkConfig, FormatConfig, RotateConfig, StreamConfig, DEFAULT_TIMESTAMP_FORMAT,
  };
  use crate::error::SinkError;

  #[test]
  fn test_file_defaults() {
    let config = FileSinkConfig::new("/tmp/app.log");
    assert_eq!(config.flush_interval, Duration::from_secs(30));
    assert_eq!(config.reload_interval, Duration::from_secs(3600));
    assert_eq!(config.format, FormatConfig::default());
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_rotate_from_json_with_humantime() {
    let config = RotateConfig::from_json_str(
      r#"{
        "path": "/var/log/app.log",
        "rotate_interval": "1h",
        "flush_interval": "2s",
        "format": { "template": "[%s] %s\n", "fields": ["priority", "message"] }
      }"#,
    )
    .unwrap();

    assert_eq!(config.path, PathBuf::from("/var/log/app.log"));
    assert_eq!(config.rotate_interval, Duration::from_secs(3600));
    assert_eq!(config.flush_interval, Duration::from_secs(2));
    assert_eq!(config.timestamp_format, DEFAULT_TIMESTAMP_FORMAT);
    assert_eq!(config.format.fields, vec!["priority", "message"]);
  }

  #[test]
  fn test_missing_path_is_rejected() {
    let err = RotateConfig::from_json_str("{}").unwrap_err();
    assert!(matches!(err, SinkError::Config(_)));
  }

  #[test]
  fn test_zero_interval_is_rejected() {
    let config = FileSinkConfig::new("/tmp/a.log").with_intervals(Duration::ZERO, Duration::from_secs(1));
    assert!(matches!(config.validate(), Err(SinkError::Config(_))));
  }

  #[test]
  fn test_bad_timestamp_format_is_rejected() {
    let slash = RotateConfig::new("/tmp/a.log", Duration::from_secs(1)).with_timestamp_format("%Y/%m");
    assert!(slash.validate().is_err());

    let invalid = RotateConfig::new("/tmp/a.log", Duration::from_secs(1)).with_timestamp_format("%Q");
    assert!(invalid.validate().is_err());
  }

  #[test]
  fn test_timestamp_specifiers_expanding_to_slashes_are_rejected() {
    for format in ["%D", "%x", "%Y-%D"] {
      let config = RotateConfig::new("/tmp/a.log", Duration::from_secs(1)).with_timestamp_format(format);
      assert!(matches!(config.validate(), Err(SinkError::Config(_))), "{}", format);
    }

    let fine = RotateConfig::new("/tmp/a.log", Duration::from_secs(1)).with_timestamp_format("%F_%T");
    assert!(fine.validate().is_ok());
  }

  #[test]
  fn test_format_mismatch_is_rejected() {
    let config = FileSinkConfig::new("/tmp/a.log").with_format(FormatConfig {
      template: "%s %s".to_string(),
      fields: vec!["message".to_string()],
    });
    assert!(matches!(config.validate(), Err(SinkError::Format(_))));
  }

  #[test]
  fn test_stream_thresholds_must_fit_buffer() {
    let ok = StreamConfig::default().with_thresholds(2, 4);
    assert!(ok.validate().is_ok());

    let too_many = StreamConfig {
      buffer_capacity: 10,
      ..StreamConfig::default()
    }
    .with_thresholds(11, 4);
    assert!(matches!(too_many.validate(), Err(SinkError::Config(_))));
  }

  #[test]
  fn test_stream_defaults_from_empty_json() {
    let config = StreamConfig::from_json_str("{}").unwrap();
    assert_eq!(config.max_items, 500);
    assert_eq!(config.max_bytes, 1024 * 1024);
    assert_eq!(config.flush_interval, Duration::from_secs(5));
  }

  #[test]
  fn test_malformed_json() {
    assert!(matches!(
      StreamConfig::from_json_str("{ not json"),
      Err(SinkError::Config(_))
    ));
  }
}
