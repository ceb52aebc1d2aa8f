//! The heterogeneous scalar type carried by alternatives, and the
//! deferred-evaluation wrapper ([`FieldValue`]) a host uses to supply field
//! values at check time.

use std::fmt;

/// A scalar value: the right-hand side of an alternative, or a field value
/// supplied by the host at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    Bool(bool),
}

impl Value {
    /// The canonical string form used for equality and substring operators.
    /// This is the single source of truth for "what does this value look
    /// like as text" — every comparison routes through it.
    pub fn canonical(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Int64(i) => i.to_string(),
            Value::UInt64(u) => u.to_string(),
            Value::Float64(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{f:.0}")
                } else {
                    f.to_string()
                }
            }
            Value::Bool(b) => b.to_string(),
        }
    }

    /// Attempt to parse this value's canonical form as an `i64`.
    fn as_int(&self) -> Option<i64> {
        self.canonical().parse::<i64>().ok()
    }

    /// Attempt to parse this value's canonical form as an `f64`.
    fn as_float(&self) -> Option<f64> {
        self.canonical().parse::<f64>().ok()
    }

    /// Numeric comparison with an int-then-float fallback, per the
    /// restriction language's `<`/`>` operators. Returns `None` when neither
    /// side parses as a number by either route ("incomparable").
    pub fn numeric_cmp(&self, other: &Value) -> Option<std::cmp::Ordering> {
        if let (Some(a), Some(b)) = (self.as_int(), other.as_int()) {
            return Some(a.cmp(&b));
        }
        if let (Some(a), Some(b)) = (self.as_float(), other.as_float()) {
            return a.partial_cmp(&b);
        }
        None
    }

    /// Lexicographic-prefix ordering used by the `{`/`}` operators: `self`
    /// is "lex-less" than `other` if its canonical form is a strict prefix
    /// of `other`'s, or if it is ordinarily less within their shared
    /// prefix length.
    pub fn lex_cmp(&self, other: &Value) -> std::cmp::Ordering {
        let a = self.canonical();
        let b = other.canonical();
        let shared = a.len().min(b.len());
        match a.as_bytes()[..shared].cmp(&b.as_bytes()[..shared]) {
            std::cmp::Ordering::Equal => a.len().cmp(&b.len()),
            other => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt64(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float64(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A value supplied by the host at check time: either concrete, or a
/// zero-argument provider invoked lazily — at most once per alternative
/// evaluation — so hosts can defer expensive lookups until an alternative
/// actually references that field.
pub enum FieldValue {
    Value(Value),
    Provider(Box<dyn Fn() -> Value>),
}

impl FieldValue {
    /// Resolve to a concrete value, invoking the provider if this is one.
    pub fn resolve(&self) -> Value {
        match self {
            FieldValue::Value(v) => v.clone(),
            FieldValue::Provider(p) => p(),
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            FieldValue::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Value(v)
    }
}

impl<F> From<F> for FieldValue
where
    F: Fn() -> Value + 'static,
{
    fn from(f: F) -> Self {
        FieldValue::Provider(Box::new(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_forms() {
        assert_eq!(Value::Int64(-5).canonical(), "-5");
        assert_eq!(Value::UInt64(5).canonical(), "5");
        assert_eq!(Value::Bool(true).canonical(), "true");
        assert_eq!(Value::Float64(12444.0).canonical(), "12444");
    }

    #[test]
    fn numeric_cmp_falls_back_to_float() {
        let a = Value::Float64(123.45);
        let b = Value::Int64(12444);
        assert_eq!(a.numeric_cmp(&b), Some(std::cmp::Ordering::Less));
    }

    #[test]
    fn numeric_cmp_incomparable() {
        let a = Value::String("not a number".into());
        let b = Value::Int64(1);
        assert_eq!(a.numeric_cmp(&b), None);
    }

    #[test]
    fn lex_cmp_prefix_ordering() {
        let short = Value::String("ab".into());
        let long = Value::String("abc".into());
        assert_eq!(short.lex_cmp(&long), std::cmp::Ordering::Less);
        assert_eq!(long.lex_cmp(&short), std::cmp::Ordering::Greater);
        assert_eq!(short.lex_cmp(&short.clone()), std::cmp::Ordering::Equal);
    }

    #[test]
    fn provider_resolves_lazily() {
        use std::cell::Cell;
        use std::rc::Rc;
        let calls = Rc::new(Cell::new(0));
        let calls2 = calls.clone();
        let fv: FieldValue = (move || {
            calls2.set(calls2.get() + 1);
            Value::Int64(42)
        })
        .into();
        assert_eq!(calls.get(), 0);
        assert_eq!(fv.resolve(), Value::Int64(42));
        assert_eq!(calls.get(), 1);
    }
}
