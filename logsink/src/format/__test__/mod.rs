#[cfg(test)]
mod tests {
  use crate::error::SinkError;
  use crate::fields::{FieldValue, Fields};
  use crate::format::{LineFormat, Template, BASIC_FIELDS, BASIC_FORMAT, MAX_WIDTH};
  use crate::priority::Priority;

  fn render(template: &str, args: &[FieldValue]) -> String {
    let template = Template::parse(template).unwrap();
    let mut out = String::new();
    template.render(args.iter().map(Some), &mut out);
    out
  }

  #[test]
  fn test_basic_line() {
    let format = LineFormat::new(BASIC_FORMAT, BASIC_FIELDS).unwrap();
    let fields = Fields::new()
      .with("time", "now")
      .with("priority", "INFO")
      .with("message", "foo");
    assert_eq!(format.render_to_string(&fields), "now [INFO] foo\n");
  }

  #[test]
  fn test_missing_field_renders_placeholder() {
    let format = LineFormat::syslog();
    let fields = Fields::new().with("message", "hello!");
    assert_eq!(format.render_to_string(&fields), "[???] hello!\n");
  }

  #[test]
  fn test_rich_preset_pads_priority() {
    let format = LineFormat::rich();
    let fields = Fields::new()
      .with("time", "t")
      .with("priority", Priority::Info)
      .with("seq", 7u64)
      .with("prefix", "app")
      .with("message", "up");
    assert_eq!(format.render_to_string(&fields), "t [     INFO] 7 app - up\n");
  }

  #[test]
  fn test_literal_percent() {
    assert_eq!(render("100%% %s", &[FieldValue::from("done")]), "100% done");
  }

  #[test]
  fn test_width_and_alignment() {
    assert_eq!(render("[%5s]", &[FieldValue::from("ab")]), "[   ab]");
    assert_eq!(render("[%-5s]", &[FieldValue::from("ab")]), "[ab   ]");
    assert_eq!(render("[%05d]", &[FieldValue::from(-42i64)]), "[-0042]");
    // zero flag does not apply to strings
    assert_eq!(render("[%05s]", &[FieldValue::from("ab")]), "[   ab]");
  }

  #[test]
  fn test_precision_truncates() {
    assert_eq!(render("%.3s", &[FieldValue::from("abcdef")]), "abc");
    assert_eq!(render("%6.2s|", &[FieldValue::from("abcdef")]), "    ab|");
  }

  #[test]
  fn test_hex_and_quote() {
    assert_eq!(render("%x", &[FieldValue::from(255u64)]), "ff");
    assert_eq!(render("%X", &[FieldValue::from(-255i64)]), "-FF");
    assert_eq!(render("%x", &[FieldValue::from("hi")]), "6869");
    assert_eq!(render("%q", &[FieldValue::from("a\"b")]), "\"a\\\"b\"");
  }

  #[test]
  fn test_too_few_args_use_placeholder() {
    let template = Template::parse("%s-%s").unwrap();
    let mut out = String::new();
    template.render(vec![Some(&FieldValue::from("a"))], &mut out);
    assert_eq!(out, "a-???");
  }

  #[test]
  fn test_arity() {
    assert_eq!(Template::parse(BASIC_FORMAT).unwrap().arity(), 3);
    assert_eq!(Template::parse("no values %%").unwrap().arity(), 0);
  }

  #[test]
  fn test_unsupported_verb_is_rejected() {
    assert!(matches!(Template::parse("%z"), Err(SinkError::Format(_))));
    assert!(matches!(Template::parse("trailing %"), Err(SinkError::Format(_))));
  }

  #[test]
  fn test_arity_mismatch_is_rejected() {
    let err = LineFormat::new("%s %s\n", &["message"]).unwrap_err();
    assert!(matches!(err, SinkError::Format(_)));
  }

  #[test]
  fn test_multibyte_width() {
    assert_eq!(render("[%4s]", &[FieldValue::from("é")]), "[   é]");
  }

  #[test]
  fn test_oversized_width_is_rejected() {
    for template in ["%99999999999999999999s\n", "%1000000000000s\n", "%.99999999999999999999s\n", "%4097s\n"] {
      let err = LineFormat::new(template, &["message"]).unwrap_err();
      assert!(matches!(err, SinkError::Format(_)), "{}", template);
    }
  }

  #[test]
  fn test_width_at_limit_is_accepted() {
    let template = format!("%{}s", MAX_WIDTH);
    let line = render(&template, &[FieldValue::from("x")]);
    assert_eq!(line.len(), MAX_WIDTH);
    assert!(line.ends_with('x'));
  }
}
