//! Total, failure-free clean-up of raw record values.
//!
//! [`Sanitizer::apply`] runs, in this order: trim, HTML-escape, numeric
//! coercion, boolean coercion, country normalization. The order is fixed.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use super::countries::CountryTable;
use super::outcome::compose;
use crate::domain::model::Record;

static NUMERIC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").expect("numeric pattern is valid"));

const TRUE_WORDS: [&str; 3] = ["true", "yes", "1"];
const FALSE_WORDS: [&str; 3] = ["false", "no", "0"];

fn map_strings(mut record: Record, f: impl Fn(&str) -> Option<Value>) -> Record {
    for value in record.data.values_mut() {
        let replacement = match value {
            Value::String(s) => f(s.as_str()),
            _ => None,
        };
        if let Some(replacement) = replacement {
            *value = replacement;
        }
    }
    record
}

/// Trims string values, turns `\n` into a space and drops `\r`.
pub fn trim_text_fields(record: Record) -> Record {
    map_strings(record, |s| {
        Some(Value::String(s.trim().replace('\n', " ").replace('\r', "")))
    })
}

pub fn escape_html_text(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Escapes `& < > " '` in string values. Not idempotent: `&lt;` becomes `&amp;lt;`.
pub fn escape_html(record: Record) -> Record {
    map_strings(record, |s| Some(Value::String(escape_html_text(s))))
}

/// Strings that look like `-12`, `3.5` become floats.
pub fn convert_numeric_fields(record: Record) -> Record {
    map_strings(record, |s| {
        let trimmed = s.trim();
        if !NUMERIC_PATTERN.is_match(trimmed) {
            return None;
        }
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
    })
}

/// `true`/`yes`/`1` and `false`/`no`/`0`, any case, become booleans.
pub fn convert_booleans(record: Record) -> Record {
    map_strings(record, |s| {
        let word = s.trim().to_lowercase();
        if TRUE_WORDS.contains(&word.as_str()) {
            Some(Value::Bool(true))
        } else if FALSE_WORDS.contains(&word.as_str()) {
            Some(Value::Bool(false))
        } else {
            None
        }
    })
}

#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    countries: Arc<CountryTable>,
}

impl Sanitizer {
    pub fn new(countries: Arc<CountryTable>) -> Self {
        Self { countries }
    }

    pub fn apply(&self, record: Record) -> Record {
        let countries = Arc::clone(&self.countries);
        let steps: Vec<Box<dyn Fn(Record) -> Record>> = vec![
            Box::new(trim_text_fields),
            Box::new(escape_html),
            Box::new(convert_numeric_fields),
            Box::new(convert_booleans),
            Box::new(move |r: Record| countries.normalize_record(r)),
        ];
        compose(steps)(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sanitizer() -> Sanitizer {
        Sanitizer::new(Arc::new(CountryTable::default()))
    }

    #[test]
    fn test_trim_removes_whitespace_and_newlines() {
        let record = Record::new()
            .with("name", "  Juan\n")
            .with("note", "Hola\r\nMundo  ");
        let result = trim_text_fields(record);
        assert_eq!(result.get_str("name"), Some("Juan"));
        assert_eq!(result.get_str("note"), Some("Hola Mundo"));
    }

    #[test]
    fn test_escape_html_replaces_special_characters() {
        let record = Record::new().with("comment", r#"<script>alert("x")</script>"#);
        let result = escape_html(record);
        assert_eq!(
            result.get_str("comment"),
            Some("&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;")
        );
    }

    #[test]
    fn test_escape_html_escapes_ampersand_and_quote() {
        assert_eq!(escape_html_text("Tom & Jerry's"), "Tom &amp; Jerry&#x27;s");
    }

    #[test]
    fn test_convert_numeric_fields_parses_valid_numbers() {
        let record = Record::new()
            .with("amount", "123.45")
            .with("count", "10")
            .with("delta", "-3")
            .with("text", "abc");
        let result = convert_numeric_fields(record);
        assert_eq!(result.get("amount"), Some(&json!(123.45)));
        assert_eq!(result.get("count"), Some(&json!(10.0)));
        assert_eq!(result.get("delta"), Some(&json!(-3.0)));
        assert_eq!(result.get_str("text"), Some("abc"));
    }

    #[test]
    fn test_convert_numeric_fields_ignores_invalid_numbers() {
        let record = Record::new().with("value", "12.3.4").with("other", "1e5");
        let result = convert_numeric_fields(record);
        assert_eq!(result.get_str("value"), Some("12.3.4"));
        assert_eq!(result.get_str("other"), Some("1e5"));
    }

    #[test]
    fn test_convert_booleans_recognizes_values() {
        let record = Record::new()
            .with("a", "true")
            .with("b", "YES")
            .with("c", "1")
            .with("x", "false")
            .with("y", " No ")
            .with("z", "0")
            .with("flag", "maybe");
        let result = convert_booleans(record);
        for key in ["a", "b", "c"] {
            assert_eq!(result.get(key), Some(&json!(true)));
        }
        for key in ["x", "y", "z"] {
            assert_eq!(result.get(key), Some(&json!(false)));
        }
        assert_eq!(result.get_str("flag"), Some("maybe"));
    }

    #[test]
    fn test_numeric_runs_before_boolean_coercion() {
        let result = sanitizer().apply(Record::new().with("flag", "1"));
        assert_eq!(result.get("flag"), Some(&json!(1.0)));
    }

    #[test]
    fn test_sanitize_applies_all_steps() {
        let record = Record::new()
            .with("Merchant_Country", "United States")
            .with("note", "  <b>Oferta</b>\n")
            .with("amount", "99.99")
            .with("confirmed", "yes");
        let result = sanitizer().apply(record);

        assert_eq!(result.get_str("Merchant_Country"), Some("US"));
        assert_eq!(result.get_str("note"), Some("&lt;b&gt;Oferta&lt;/b&gt;"));
        assert_eq!(result.get("amount"), Some(&json!(99.99)));
        assert_eq!(result.get("confirmed"), Some(&json!(true)));
    }

    #[test]
    fn test_sanitize_normalizes_country_names() {
        let result = sanitizer().apply(Record::new().with("Merchant_Country", " México "));
        assert_eq!(result.get_str("Merchant_Country"), Some("MX"));

        let result = sanitizer().apply(Record::new().with("Merchant_Country", "Atlantis"));
        assert_eq!(result.get_str("Merchant_Country"), Some("Atlantis"));
    }

    #[test]
    fn test_non_escaping_steps_are_idempotent() {
        let record = Record::new()
            .with("Merchant_Country", "Mexico")
            .with("note", "  plain text \r\n")
            .with("amount", "42.5")
            .with("confirmed", "no");
        let once = sanitizer().apply(record);

        let twice = convert_booleans(convert_numeric_fields(trim_text_fields(once.clone())));
        let twice = CountryTable::default().normalize_record(twice);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_escaping_is_single_pass_only() {
        let once = escape_html(Record::new().with("note", "<b>"));
        assert_eq!(once.get_str("note"), Some("&lt;b&gt;"));

        let twice = escape_html(once);
        assert_eq!(twice.get_str("note"), Some("&amp;lt;b&amp;gt;"));
    }
}
