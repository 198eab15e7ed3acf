//! # Fields
//!
//! A log event is handed to sinks as a set of named, lazily computed values.
//! Each value is produced by a thunk that runs the first time any sink asks
//! for it; later lookups, from the same sink or another one, reuse the cached
//! result. A logger with three sinks therefore takes one sequence number and
//! one timestamp per event, no matter how many sinks render it.
//!
//! Sinks never fail on a missing field: they substitute [`MISSING_FIELD`].


use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use crate::priority::Priority;

/// Rendered in place of a field the event does not carry.
pub const MISSING_FIELD: &str = "???";

pub const TIME: &str = "time";
pub const FULL_TIME: &str = "full_time";
pub const START_TIME: &str = "start_time";
pub const ELAPSED_TIME: &str = "elapsed_time";
pub const PRIORITY: &str = "priority";
pub const MESSAGE: &str = "message";
pub const PREFIX: &str = "prefix";
pub const SEQ: &str = "seq";
pub const PID: &str = "pid";
pub const EXECUTABLE: &str = "executable";
pub const HOSTNAME: &str = "hostname";
pub const TARGET: &str = "target";

/// The value of a single field once evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  Str(String),
  Int(i64),
  Uint(u64),
  Priority(Priority),
  Time(DateTime<Local>),
  Duration(Duration),
}

impl FieldValue {
  pub fn as_priority(&self) -> Option<Priority> {
    match self {
      FieldValue::Priority(p) => Some(*p),
      _ => None,
    }
  }

  pub fn is_integer(&self) -> bool {
    matches!(self, FieldValue::Int(_) | FieldValue::Uint(_))
  }
}

impl fmt::Display for FieldValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FieldValue::Str(s) => f.pad(s),
      FieldValue::Int(v) => fmt::Display::fmt(v, f),
      FieldValue::Uint(v) => fmt::Display::fmt(v, f),
      FieldValue::Priority(p) => fmt::Display::fmt(p, f),
      FieldValue::Time(t) => f.pad(&t.format("%Y-%m-%d %H:%M:%S%.3f %:z").to_string()),
      FieldValue::Duration(d) => f.pad(&format!("{:?}", d)),
    }
  }
}

impl From<&str> for FieldValue {
  fn from(v: &str) -> Self {
    FieldValue::Str(v.to_string())
  }
}

impl From<String> for FieldValue {
  fn from(v: String) -> Self {
    FieldValue::Str(v)
  }
}

impl From<i64> for FieldValue {
  fn from(v: i64) -> Self {
    FieldValue::Int(v)
  }
}

impl From<i32> for FieldValue {
  fn from(v: i32) -> Self {
    FieldValue::Int(v as i64)
  }
}

impl From<u64> for FieldValue {
  fn from(v: u64) -> Self {
    FieldValue::Uint(v)
  }
}

impl From<u32> for FieldValue {
  fn from(v: u32) -> Self {
    FieldValue::Uint(v as u64)
  }
}

impl From<usize> for FieldValue {
  fn from(v: usize) -> Self {
    FieldValue::Uint(v as u64)
  }
}

impl From<Priority> for FieldValue {
  fn from(v: Priority) -> Self {
    FieldValue::Priority(v)
  }
}

impl From<DateTime<Local>> for FieldValue {
  fn from(v: DateTime<Local>) -> Self {
    FieldValue::Time(v)
  }
}

impl From<Duration> for FieldValue {
  fn from(v: Duration) -> Self {
    FieldValue::Duration(v)
  }
}

type Thunk = Box<dyn Fn() -> FieldValue + Send + Sync>;

struct LazyField {
  thunk: Thunk,
  value: OnceLock<FieldValue>,
}

impl LazyField {
  fn get(&self) -> &FieldValue {
    self.value.get_or_init(|| (self.thunk)())
  }
}

/// Named, lazily evaluated values describing one log event.
#[derive(Default)]
pub struct Fields {
  entries: HashMap<String, LazyField>,
}

impl Fields {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers a thunk for `name`, replacing any previous one.
  ///
  /// The thunk runs at most once, on the first [`Fields::get`] for `name`.
  pub fn insert<F, V>(&mut self, name: impl Into<String>, thunk: F) -> &mut Self
  where
    F: Fn() -> V + Send + Sync + 'static,
    V: Into<FieldValue>,
  {
    self.entries.insert(
      name.into(),
      LazyField {
        thunk: Box::new(move || thunk().into()),
        value: OnceLock::new(),
      },
    );
    self
  }

  /// Registers an already computed value.
  pub fn insert_value(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
    let value = value.into();
    let cell = OnceLock::new();
    let _ = cell.set(value.clone());
    self.entries.insert(
      name.into(),
      LazyField {
        thunk: Box::new(move || value.clone()),
        value: cell,
      },
    );
    self
  }

  /// Builder flavour of [`Fields::insert_value`].
  pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
    self.insert_value(name, value);
    self
  }

  pub fn get(&self, name: &str) -> Option<&FieldValue> {
    self.entries.get(name).map(LazyField::get)
  }

  /// The event priority, if the `priority` field is present and holds one.
  pub fn priority(&self) -> Option<Priority> {
    self.get(PRIORITY).and_then(FieldValue::as_priority)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.entries.contains_key(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl fmt::Debug for Fields {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // only report what has already been evaluated, never force a thunk
    let mut map = f.debug_map();
    for (name, field) in &self.entries {
      match field.value.get() {
        Some(v) => map.entry(name, v),
        None => map.entry(name, &"<lazy>"),
      };
    }
    map.finish()
  }
}
