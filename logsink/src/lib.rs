pub mod bridge;
pub mod buffer;
pub mod config;
pub mod daemon;
pub mod error;
pub mod fields;
pub mod file_sink;
pub mod format;
pub mod logger;
pub mod priority;
pub mod rotate;
pub mod sink;
pub mod stream;
pub mod syslog;

pub use error::{Result, SinkError};
pub use fields::{FieldValue, Fields};
pub use logger::Logger;
pub use priority::Priority;
pub use sink::{FilterSink, ReloadSink, Sink};
