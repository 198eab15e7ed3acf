//! # Format
//!
//! Sinks render an event by pairing a printf-style template with an ordered
//! list of field names. Each value directive in the template consumes the
//! next field, so `"%s [%s] %s\n"` with `["time", "priority", "message"]`
//! renders `now [INFO] foo\n`.
//!
//! Supported directives: `%s`, `%v`, `%d`, `%x`, `%X`, `%q` with optional
//! `-` (left align) and `0` (zero pad) flags, a width and a `.precision`
//! that truncates string output. `%%` is a literal percent sign. Widths and
//! precisions are capped at [`MAX_WIDTH`].

mod __test__;

use std::fmt::Write;

use crate::error::{Result, SinkError};
use crate::fields::{FieldValue, Fields, MISSING_FIELD};

/// `"%s [%s] %s\n"` over `time, priority, message`.
pub const BASIC_FORMAT: &str = "%s [%s] %s\n";
pub const BASIC_FIELDS: &[&str] = &["time", "priority", "message"];

/// `"%s [%9s] %d %s - %s\n"` over `time, priority, seq, prefix, message`.
pub const RICH_FORMAT: &str = "%s [%9s] %d %s - %s\n";
pub const RICH_FIELDS: &[&str] = &["time", "priority", "seq", "prefix", "message"];

/// `"[%s] %s\n"` over `priority, message`.
pub const SYSLOG_FORMAT: &str = "[%s] %s\n";
pub const SYSLOG_FIELDS: &[&str] = &["priority", "message"];

/// Largest width or precision a directive may carry.
pub const MAX_WIDTH: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
  Display,
  Decimal,
  LowerHex,
  UpperHex,
  Quoted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Directive {
  verb: Verb,
  left: bool,
  zero: bool,
  width: Option<usize>,
  precision: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
  Literal(String),
  Value(Directive),
}

/// A parsed printf-style template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
  source: String,
  segments: Vec<Segment>,
}

impl Template {
  pub fn parse(source: &str) -> Result<Self> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
      if c != '%' {
        literal.push(c);
        continue;
      }

      if chars.peek() == Some(&'%') {
        chars.next();
        literal.push('%');
        continue;
      }

      let mut directive = Directive {
        verb: Verb::Display,
        left: false,
        zero: false,
        width: None,
        precision: None,
      };

      while let Some(&flag) = chars.peek() {
        match flag {
          '-' => directive.left = true,
          '0' => directive.zero = true,
          _ => break,
        }
        chars.next();
      }

      directive.width = take_number(&mut chars, source)?;
      if chars.peek() == Some(&'.') {
        chars.next();
        directive.precision = Some(take_number(&mut chars, source)?.unwrap_or(0));
      }

      directive.verb = match chars.next() {
        Some('s') | Some('v') => Verb::Display,
        Some('d') => Verb::Decimal,
        Some('x') => Verb::LowerHex,
        Some('X') => Verb::UpperHex,
        Some('q') => Verb::Quoted,
        Some(other) => {
          return Err(SinkError::Format(format!(
            "unsupported verb %{} in {:?}",
            other, source
          )))
        },
        None => {
          return Err(SinkError::Format(format!(
            "dangling % at end of {:?}",
            source
          )))
        },
      };

      if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(&mut literal)));
      }
      segments.push(Segment::Value(directive));
    }

    if !literal.is_empty() {
      segments.push(Segment::Literal(literal));
    }

    Ok(Self {
      source: source.to_string(),
      segments,
    })
  }

  /// Number of value directives, i.e. how many arguments a render consumes.
  pub fn arity(&self) -> usize {
    self
      .segments
      .iter()
      .filter(|s| matches!(s, Segment::Value(_)))
      .count()
  }

  pub fn as_str(&self) -> &str {
    &self.source
  }

  /// Renders positionally; a `None` argument prints [`MISSING_FIELD`].
  pub fn render<'a, I>(&self, args: I, out: &mut String)
  where
    I: IntoIterator<Item = Option<&'a FieldValue>>,
  {
    let mut args = args.into_iter();
    for segment in &self.segments {
      match segment {
        Segment::Literal(text) => out.push_str(text),
        Segment::Value(directive) => match args.next().flatten() {
          Some(value) => render_value(directive, value, out),
          None => pad_into(directive, MISSING_FIELD, false, out),
        },
      }
    }
  }
}

/// Reads a width or precision, rejecting anything above [`MAX_WIDTH`].
fn take_number<I>(chars: &mut std::iter::Peekable<I>, source: &str) -> Result<Option<usize>>
where
  I: Iterator<Item = char>,
{
  let mut value: Option<usize> = None;
  while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
    chars.next();
    let next = value
      .unwrap_or(0)
      .checked_mul(10)
      .and_then(|v| v.checked_add(digit as usize))
      .filter(|v| *v <= MAX_WIDTH);
    match next {
      Some(v) => value = Some(v),
      None => {
        return Err(SinkError::Format(format!(
          "width or precision above {} in {:?}",
          MAX_WIDTH, source
        )))
      },
    }
  }
  Ok(value)
}

fn render_value(directive: &Directive, value: &FieldValue, out: &mut String) {
  let numeric = value.is_integer();
  let text = match (directive.verb, value) {
    (Verb::LowerHex, FieldValue::Int(v)) => format_signed_hex(*v, false),
    (Verb::LowerHex, FieldValue::Uint(v)) => format!("{:x}", v),
    (Verb::UpperHex, FieldValue::Int(v)) => format_signed_hex(*v, true),
    (Verb::UpperHex, FieldValue::Uint(v)) => format!("{:X}", v),
    (Verb::LowerHex, other) => hex_bytes(&other.to_string(), false),
    (Verb::UpperHex, other) => hex_bytes(&other.to_string(), true),
    (Verb::Quoted, other) => format!("{:?}", other.to_string()),
    (Verb::Display, other) | (Verb::Decimal, other) => truncate(other.to_string(), directive.precision),
  };
  pad_into(directive, &text, numeric, out);
}

fn format_signed_hex(v: i64, upper: bool) -> String {
  let magnitude = v.unsigned_abs();
  let digits = if upper {
    format!("{:X}", magnitude)
  } else {
    format!("{:x}", magnitude)
  };
  if v < 0 {
    format!("-{}", digits)
  } else {
    digits
  }
}

fn hex_bytes(text: &str, upper: bool) -> String {
  let mut out = String::with_capacity(text.len() * 2);
  for byte in text.as_bytes() {
    let _ = if upper {
      write!(out, "{:02X}", byte)
    } else {
      write!(out, "{:02x}", byte)
    };
  }
  out
}

fn truncate(text: String, precision: Option<usize>) -> String {
  match precision {
    Some(max) if text.chars().count() > max => text.chars().take(max).collect(),
    _ => text,
  }
}

fn pad_into(directive: &Directive, text: &str, numeric: bool, out: &mut String) {
  let len = text.chars().count();
  let fill = directive.width.unwrap_or(0).saturating_sub(len);
  if fill == 0 {
    out.push_str(text);
    return;
  }

  if directive.left {
    out.push_str(text);
    out.extend(std::iter::repeat(' ').take(fill));
  } else if directive.zero && numeric {
    // zeros go between the sign and the digits
    let (sign, digits) = match text.strip_prefix('-') {
      Some(rest) => ("-", rest),
      None => ("", text),
    };
    out.push_str(sign);
    out.extend(std::iter::repeat('0').take(fill));
    out.push_str(digits);
  } else {
    out.extend(std::iter::repeat(' ').take(fill));
    out.push_str(text);
  }
}

/// A template bound to the ordered field names it renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFormat {
  template: Template,
  fields: Vec<String>,
}

impl LineFormat {
  /// Fails when the template's value directives and `fields` disagree in count.
  pub fn new<S: AsRef<str>>(template: &str, fields: &[S]) -> Result<Self> {
    let template = Template::parse(template)?;
    if template.arity() != fields.len() {
      return Err(SinkError::Format(format!(
        "template {:?} expects {} values but {} fields were given",
        template.as_str(),
        template.arity(),
        fields.len()
      )));
    }
    Ok(Self {
      template,
      fields: fields.iter().map(|f| f.as_ref().to_string()).collect(),
    })
  }

  pub fn basic() -> Self {
    Self::preset(BASIC_FORMAT, BASIC_FIELDS)
  }

  pub fn rich() -> Self {
    Self::preset(RICH_FORMAT, RICH_FIELDS)
  }

  pub fn syslog() -> Self {
    Self::preset(SYSLOG_FORMAT, SYSLOG_FIELDS)
  }

  fn preset(template: &str, fields: &[&str]) -> Self {
    let template = Template::parse(template).unwrap_or_else(|e| unreachable!("preset template: {}", e));
    Self {
      template,
      fields: fields.iter().map(|f| f.to_string()).collect(),
    }
  }

  pub fn template(&self) -> &Template {
    &self.template
  }

  pub fn fields(&self) -> &[String] {
    &self.fields
  }

  /// Appends the rendered line for `fields` to `out`.
  pub fn render(&self, fields: &Fields, out: &mut String) {
    self
      .template
      .render(self.fields.iter().map(|name| fields.get(name)), out);
  }

  pub fn render_to_string(&self, fields: &Fields) -> String {
    let mut out = String::with_capacity(128);
    self.render(fields, &mut out);
    out
  }
}

impl Default for LineFormat {
  fn default() -> Self {
    Self::basic()
  }
}
