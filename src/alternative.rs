//! Component B: the atomic predicate `field op value`.

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;

use unicode_general_category::{get_general_category, GeneralCategory};

use crate::error::{Error, Result};
use crate::value::{FieldValue, Value};

/// Characters the source format treats as punctuation even though Unicode's
/// general-category tables do not mark them as such (notably `+`, `<`, `=`,
/// `>`, `^`, `_`).
const EXTRA_PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_{|}~`";

fn is_punctuation(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::ConnectorPunctuation
            | GeneralCategory::DashPunctuation
            | GeneralCategory::OpenPunctuation
            | GeneralCategory::ClosePunctuation
            | GeneralCategory::InitialPunctuation
            | GeneralCategory::FinalPunctuation
            | GeneralCategory::OtherPunctuation
    ) || EXTRA_PUNCTUATION.contains(c)
}

fn contains_punctuation(s: &str) -> bool {
    s.chars().any(is_punctuation)
}

/// One of the eleven restriction operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Missing,
    Equal,
    NotEqual,
    StartsWith,
    EndsWith,
    Contains,
    LessThan,
    GreaterThan,
    LexLess,
    LexGreater,
    Comment,
}

impl Operator {
    fn from_char(c: char) -> Option<Operator> {
        Some(match c {
            '!' => Operator::Missing,
            '=' => Operator::Equal,
            '/' => Operator::NotEqual,
            '^' => Operator::StartsWith,
            '$' => Operator::EndsWith,
            '~' => Operator::Contains,
            '<' => Operator::LessThan,
            '>' => Operator::GreaterThan,
            '{' => Operator::LexLess,
            '}' => Operator::LexGreater,
            '#' => Operator::Comment,
            _ => return None,
        })
    }

    fn as_char(self) -> char {
        match self {
            Operator::Missing => '!',
            Operator::Equal => '=',
            Operator::NotEqual => '/',
            Operator::StartsWith => '^',
            Operator::EndsWith => '$',
            Operator::Contains => '~',
            Operator::LessThan => '<',
            Operator::GreaterThan => '>',
            Operator::LexLess => '{',
            Operator::LexGreater => '}',
            Operator::Comment => '#',
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char(self.as_char())
    }
}

/// `field op value`: the atomic predicate an evaluation either satisfies or
/// doesn't.
#[derive(Debug, Clone)]
pub struct Alternative {
    field: String,
    op: Operator,
    value: Value,
}

/// Escape `\`, `&` and `|` in that order. The order matters: escaping `\`
/// last would double-escape the backslashes just introduced by the `&`/`|`
/// substitutions, and the single-character lookahead in `parse` could not
/// tell the difference on the way back.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('&', "\\&")
        .replace('|', "\\|")
}

impl Alternative {
    /// Build and validate an alternative directly from its parts.
    pub fn new(field: impl Into<String>, op: Operator, value: Value, allow_id: bool) -> Result<Self> {
        let field = field.into();
        if contains_punctuation(&field) {
            log::warn!("rejected alternative field {field:?}: contains punctuation");
            return Err(Error::InvalidField);
        }
        if field.is_empty() {
            if !allow_id {
                log::warn!("rejected unique id alternative: not allowed in this position");
                return Err(Error::InvalidUniqueId);
            }
            if !matches!(op, Operator::Equal) {
                log::warn!("rejected unique id alternative: must use the `=` operator");
                return Err(Error::InvalidUniqueId);
            }
        }
        Ok(Alternative { field, op, value })
    }

    pub fn is_unique_id(&self) -> bool {
        self.field.is_empty()
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Parse one alternative from the start of `s`, returning it along with
    /// whatever text follows the alternative (with a trailing `|` consumed,
    /// a trailing `&` left in place for the caller).
    pub fn parse(s: &str, allow_id: bool) -> Result<(Alternative, &str)> {
        log::trace!("parsing alternative from {s:?}");
        let op_pos = s.find(is_punctuation).ok_or(Error::NoOperator)?;
        let field = &s[..op_pos];
        let op_char = s[op_pos..].chars().next().expect("find guarantees a char");
        let op = Operator::from_char(op_char).ok_or(Error::UnknownOperator)?;

        let rest = &s[op_pos + op_char.len_utf8()..];
        let mut value = String::new();
        let mut consumed_end = rest.len();
        let mut escaping = false;
        for (i, c) in rest.char_indices() {
            if escaping {
                value.push(c);
                escaping = false;
                continue;
            }
            match c {
                '\\' => escaping = true,
                '|' => {
                    consumed_end = i + 1;
                    break;
                }
                '&' => {
                    consumed_end = i;
                    break;
                }
                _ => value.push(c),
            }
        }

        let alt = Alternative::new(field, op, Value::String(value), allow_id)?;
        log::trace!("parsed alternative {alt}");
        Ok((alt, &rest[consumed_end..]))
    }

    /// Render this alternative back to its textual form.
    pub fn to_text(&self) -> String {
        format!("{}{}{}", self.field, self.op, escape(&self.value.canonical()))
    }

    /// Evaluate this alternative against a runtime context.
    pub fn evaluate(&self, vals: &HashMap<String, FieldValue>) -> (bool, String) {
        log::trace!("evaluating alternative {self}");
        if matches!(self.op, Operator::Comment) {
            return (true, String::new());
        }

        let field_value = vals.get(&self.field);
        if field_value.is_none() {
            if self.is_unique_id() {
                let v = self.value.canonical();
                if v.contains('-') {
                    return (false, format!("unknown version {v}"));
                }
            }
            if matches!(self.op, Operator::Missing) {
                return (true, String::new());
            }
            return (false, format!("{} is missing", self.field));
        }

        if matches!(self.op, Operator::Missing) {
            return (false, format!("{} is present", self.field));
        }

        let actual = field_value.expect("checked above").resolve();

        match self.op {
            Operator::Missing | Operator::Comment => unreachable!("handled above"),
            Operator::Equal => {
                if actual.canonical() == self.value.canonical() {
                    (true, String::new())
                } else {
                    (false, format!("!= {}", self.value))
                }
            }
            Operator::NotEqual => {
                if actual.canonical() != self.value.canonical() {
                    (true, String::new())
                } else {
                    (false, format!("= {}", self.value))
                }
            }
            Operator::StartsWith => {
                if actual.canonical().starts_with(&self.value.canonical()) {
                    (true, String::new())
                } else {
                    (false, format!("does not start with {}", self.value))
                }
            }
            Operator::EndsWith => {
                if actual.canonical().ends_with(&self.value.canonical()) {
                    (true, String::new())
                } else {
                    (false, format!("does not end with {}", self.value))
                }
            }
            Operator::Contains => {
                if actual.canonical().contains(&self.value.canonical()) {
                    (true, String::new())
                } else {
                    (false, format!("does not contain {}", self.value))
                }
            }
            Operator::LessThan => match actual.numeric_cmp(&self.value) {
                Some(std::cmp::Ordering::Less) => (true, String::new()),
                _ => (false, format!(">= {}", self.value)),
            },
            Operator::GreaterThan => match actual.numeric_cmp(&self.value) {
                Some(std::cmp::Ordering::Greater) => (true, String::new()),
                _ => (false, format!("<= {}", self.value)),
            },
            Operator::LexLess => {
                if actual.lex_cmp(&self.value) == std::cmp::Ordering::Less {
                    (true, String::new())
                } else {
                    (false, format!("is the same or ordered after {actual}"))
                }
            }
            Operator::LexGreater => {
                if actual.lex_cmp(&self.value) == std::cmp::Ordering::Greater {
                    (true, String::new())
                } else {
                    (false, format!("is the same or ordered before {actual}"))
                }
            }
        }
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_alternative() {
        let (alt, rest) = Alternative::parse("ab<cd|", false).unwrap();
        assert_eq!(alt.field(), "ab");
        assert!(matches!(alt.op, Operator::LessThan));
        assert_eq!(alt.value().canonical(), "cd");
        assert_eq!(rest, "");
    }

    #[test]
    fn parse_stops_before_ampersand() {
        let (alt, rest) = Alternative::parse("method^list&time>1", false).unwrap();
        assert_eq!(alt.field(), "method");
        assert_eq!(alt.value().canonical(), "list");
        assert_eq!(rest, "&time>1");
    }

    #[test]
    fn escape_round_trips_through_parse() {
        let alt = Alternative::new("f", Operator::Equal, Value::String("a&b|c\\d".into()), false).unwrap();
        let text = alt.to_text();
        let (parsed, rest) = Alternative::parse(&text, false).unwrap();
        assert_eq!(parsed.value().canonical(), "a&b|c\\d");
        assert_eq!(rest, "");
    }

    #[test]
    fn rejects_punctuation_in_field() {
        let err = Alternative::new("a.b", Operator::Equal, Value::String("x".into()), false);
        assert!(matches!(err, Err(Error::InvalidField)));
    }

    #[test]
    fn unique_id_requires_equal_and_allow_id() {
        assert!(Alternative::new("", Operator::Equal, Value::String("3".into()), true).is_ok());
        assert!(Alternative::new("", Operator::Equal, Value::String("3".into()), false).is_err());
        assert!(Alternative::new("", Operator::LessThan, Value::String("3".into()), true).is_err());
    }

    #[test]
    fn evaluate_missing_field() {
        let alt = Alternative::new("x", Operator::Missing, Value::String("".into()), false).unwrap();
        let vals = HashMap::new();
        let (ok, _) = alt.evaluate(&vals);
        assert!(ok);
    }

    #[test]
    fn evaluate_equal_uses_canonical_form() {
        let alt = Alternative::new("time", Operator::Equal, Value::Int64(5), false).unwrap();
        let mut vals = HashMap::new();
        vals.insert("time".to_string(), FieldValue::Value(Value::String("5".into())));
        let (ok, _) = alt.evaluate(&vals);
        assert!(ok);
    }
}
