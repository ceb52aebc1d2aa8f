//! Component C: a disjunction of alternatives.

use std::collections::HashMap;
use std::fmt;

use crate::alternative::{Alternative, Operator};
use crate::error::{Error, Result};
use crate::value::{FieldValue, Value};

/// A non-empty disjunction: satisfied if any contained alternative is.
#[derive(Debug, Clone)]
pub struct Restriction {
    alternatives: Vec<Alternative>,
}

impl Restriction {
    /// Build a restriction from alternatives already parsed or constructed.
    /// Fails if empty, or if a unique-id alternative is combined with any
    /// other alternative.
    pub fn new(alternatives: Vec<Alternative>) -> Result<Self> {
        if alternatives.is_empty() {
            log::warn!("rejected restriction with no alternatives");
            return Err(Error::MalformedText);
        }
        if alternatives.len() > 1 && alternatives[0].is_unique_id() {
            log::warn!("rejected restriction combining a unique id with other alternatives");
            return Err(Error::UniqueIdHasAlternatives);
        }
        Ok(Restriction { alternatives })
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// Parse one restriction (a run of `|`-joined alternatives) from the
    /// start of `s`, returning it along with whatever follows a leading `&`
    /// (or the empty string once the input is exhausted).
    pub fn parse(s: &str, allow_id: bool) -> Result<(Restriction, &str)> {
        let mut alternatives = Vec::new();
        let mut rest = s;
        let mut allow_id = allow_id;
        loop {
            if let Some(after) = rest.strip_prefix('&') {
                rest = after;
                break;
            }
            let (alt, after) = Alternative::parse(rest, allow_id)?;
            alternatives.push(alt);
            rest = after;
            allow_id = false;
            if rest.is_empty() {
                break;
            }
        }
        let restriction = Restriction::new(alternatives)?;
        Ok((restriction, rest))
    }

    pub fn to_text(&self) -> String {
        self.alternatives
            .iter()
            .map(Alternative::to_text)
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Evaluate as a disjunction; on failure, the reasons from every
    /// alternative are joined with `" AND "` — a literal joiner, not a
    /// logical claim.
    pub fn evaluate(&self, vals: &HashMap<String, FieldValue>) -> (bool, String) {
        let mut reasons = Vec::with_capacity(self.alternatives.len());
        for alt in &self.alternatives {
            let (ok, reason) = alt.evaluate(vals);
            if ok {
                return (true, String::new());
            }
            reasons.push(reason);
        }
        (false, reasons.join(" AND "))
    }

    /// Build the single-alternative restriction that encodes a unique id,
    /// optionally versioned. When `version` is absent the literal value is
    /// just `id`, with no trailing separator.
    pub fn unique_id(id: impl fmt::Display, version: Option<impl fmt::Display>) -> Result<Self> {
        let id = id.to_string();
        if id.contains('-') {
            log::warn!("rejected unique id containing a hyphen");
            return Err(Error::HyphenInUniqueId);
        }
        let literal = match version {
            Some(v) => format!("{id}-{v}"),
            None => id,
        };
        let alt = Alternative::new("", Operator::Equal, Value::String(literal), true)?;
        Restriction::new(vec![alt])
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_restrictions() {
        let (r1, rest) = Restriction::parse("method^list|method^get&time>100", false).unwrap();
        assert_eq!(r1.alternatives().len(), 2);
        let (r2, rest2) = Restriction::parse(rest, false).unwrap();
        assert_eq!(r2.alternatives().len(), 1);
        assert_eq!(rest2, "");
    }

    #[test]
    fn disjunction_semantics() {
        let (r, _) = Restriction::parse("method^list|method^get", false).unwrap();
        let mut vals = HashMap::new();
        vals.insert(
            "method".to_string(),
            FieldValue::Value(Value::String("listpeers".into())),
        );
        let (ok, _) = r.evaluate(&vals);
        assert!(ok);
    }

    #[test]
    fn unique_id_without_version_has_no_separator() {
        let r = Restriction::unique_id(3, None::<&str>).unwrap();
        assert_eq!(r.to_text(), "=3");
    }

    #[test]
    fn unique_id_with_version() {
        let r = Restriction::unique_id(3, Some(2)).unwrap();
        assert_eq!(r.to_text(), "=3-2");
    }

    #[test]
    fn unique_id_rejects_hyphen() {
        assert!(Restriction::unique_id("a-b", None::<&str>).is_err());
    }

    #[test]
    fn unique_id_cannot_have_extra_alternatives() {
        let (alt, _) = Alternative::parse("=3", true).unwrap();
        let (alt2, _) = Alternative::parse("method^list", false).unwrap();
        let err = Restriction::new(vec![alt, alt2]);
        assert!(matches!(err, Err(Error::UniqueIdHasAlternatives)));
    }
}
