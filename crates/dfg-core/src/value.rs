//! Scalar payloads carried by base-type nodes.
//!
//! Only the four base types (`Int`, `Float`, `Bool`, `Str`) hold data. Literal
//! tokens in expressions are typed by [`Value::infer`]; when the parameter
//! receiving a literal names a concrete base type, [`Value::coerce`] is used
//! instead.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of scalar a base-type node holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseKind {
    Int,
    Float,
    Bool,
    Str,
}

impl BaseKind {
    /// Every base kind, in registration order.
    pub const ALL: [BaseKind; 4] = [BaseKind::Int, BaseKind::Float, BaseKind::Bool, BaseKind::Str];

    /// The registered type name for this kind.
    pub fn type_name(self) -> &'static str {
        match self {
            BaseKind::Int => "Int",
            BaseKind::Float => "Float",
            BaseKind::Bool => "Bool",
            BaseKind::Str => "Str",
        }
    }

    pub fn from_type_name(name: &str) -> Option<BaseKind> {
        BaseKind::ALL.into_iter().find(|k| k.type_name() == name)
    }
}

impl fmt::Display for BaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A scalar value stored on a base-type node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn kind(&self) -> BaseKind {
        match self {
            Value::Int(_) => BaseKind::Int,
            Value::Float(_) => BaseKind::Float,
            Value::Bool(_) => BaseKind::Bool,
            Value::Str(_) => BaseKind::Str,
        }
    }

    /// Type an unquoted literal token.
    ///
    /// Digits with at most one leading `-` and at most one `.` are numeric
    /// (`Float` when a dot is present), `true`/`false`/`yes`/`no` in any case
    /// are `Bool`, everything else is `Str`.
    pub fn infer(literal: &str) -> Value {
        if let Some(number) = parse_number(literal) {
            return number;
        }
        if let Some(b) = parse_bool(literal) {
            return Value::Bool(b);
        }
        Value::Str(literal.to_string())
    }

    /// Convert a literal to a specific base kind, if its text allows it.
    pub fn coerce(literal: &str, kind: BaseKind) -> Option<Value> {
        match kind {
            BaseKind::Str => Some(Value::Str(literal.to_string())),
            BaseKind::Bool => parse_bool(literal).map(Value::Bool),
            BaseKind::Int => match parse_number(literal)? {
                Value::Int(i) => Some(Value::Int(i)),
                Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Some(Value::Int(f as i64))
                }
                _ => None,
            },
            BaseKind::Float => match parse_number(literal)? {
                Value::Int(i) => Some(Value::Float(i as f64)),
                other => Some(other),
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; `Int` widens to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Literal text that re-infers to the same kind where possible.
    ///
    /// Floats always carry a decimal point so `2.0` does not come back as `Int`.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                let s = f.to_string();
                if s.contains('.') || !f.is_finite() {
                    s
                } else {
                    format!("{s}.0")
                }
            }
            Value::Bool(b) => b.to_string(),
            Value::Str(s) => s.clone(),
        }
    }

    /// Ordering used by the comparison qualifiers.
    ///
    /// Numbers compare numerically across `Int`/`Float`, strings
    /// lexicographically, booleans `false < true`. Mixed kinds do not compare.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }

    /// Equality that treats `Int(2)` and `Float(2.0)` as the same value.
    pub fn loosely_eq(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

fn parse_number(literal: &str) -> Option<Value> {
    let body = literal.strip_prefix('-').unwrap_or(literal);
    let mut digits = 0usize;
    let mut dots = 0usize;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return None,
        }
    }
    if digits == 0 || dots > 1 {
        return None;
    }
    if dots == 0 {
        if let Ok(i) = literal.parse::<i64>() {
            return Some(Value::Int(i));
        }
    }
    literal.parse::<f64>().ok().map(Value::Float)
}

fn parse_bool(literal: &str) -> Option<bool> {
    match literal.to_ascii_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}
