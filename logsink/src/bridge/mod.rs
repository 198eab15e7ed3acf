
use std::fmt::Write;
use std::sync::Arc;

use tracing::{field::Field, Event as TracingEvent, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

use crate::fields::TARGET;
use crate::logger::Logger;
use crate::priority::Priority;

/// Feeds `tracing` events into a [`Logger`].
///
/// The event level becomes the priority, the `message` field the message and
/// the event target the `target` field. Any other event fields are appended
/// to the message as ` key=value`.
#[derive(Debug, Clone)]
pub struct SinkLayer {
  logger: Arc<Logger>,
}

impl SinkLayer {
  pub fn new(logger: Arc<Logger>) -> Self {
    Self { logger }
  }

  pub fn logger(&self) -> &Arc<Logger> {
    &self.logger
  }
}

impl<T> Layer<T> for SinkLayer
where
  T: Subscriber + for<'a> LookupSpan<'a>,
{
  fn on_event(&self, event: &TracingEvent<'_>, _ctx: Context<'_, T>) {
    let metadata = event.metadata();
    let priority = Priority::from(*metadata.level());

    let mut visitor = MessageVisitor::default();
    event.record(&mut visitor);

    let mut fields = self.logger.fields(priority, visitor.finish());
    fields.insert_value(TARGET, metadata.target());
    self.logger.log_fields(&fields);
  }
}

#[derive(Default)]
struct MessageVisitor {
  message: Option<String>,
  extra: String,
}

impl MessageVisitor {
  fn finish(self) -> String {
    let mut message = self.message.unwrap_or_default();
    message.push_str(&self.extra);
    message
  }
}

impl tracing::field::Visit for MessageVisitor {
  fn record_str(&mut self, field: &Field, value: &str) {
    if field.name() == "message" {
      self.message = Some(value.to_string());
    } else {
      let _ = write!(self.extra, " {}={}", field.name(), value);
    }
  }

  fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
    if field.name() == "message" {
      self.message = Some(format!("{:?}", value));
    } else {
      let _ = write!(self.extra, " {}={:?}", field.name(), value);
    }
  }
}
