//! Bind values and the polymorphic leaf operand.
//!
//! A leaf's `value` arrives as a scalar, a `{start, end}` range object or an
//! explicit list. [`FilterValue`] captures that shape once, at the decode
//! boundary, and [`FilterValue::values`] flattens it into the ordered bind
//! sequence the compiler emits placeholders for.

use serde::{Deserialize, Serialize};

/// SQL parameter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
}

impl Value {
    /// Whether this is SQL `NULL`.
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                // u64 beyond i64::MAX and all fractional numbers
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            },
            // Objects have no bind representation; pass their JSON text through.
            obj @ serde_json::Value::Object(_) => Self::String(obj.to_string()),
        }
    }
}

/// The operand of a leaf filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// A single value.
    Scalar(Value),
    /// A range with optional bounds, used by `between` and `notBetween`.
    Range {
        /// Lower bound.
        start: Option<Value>,
        /// Upper bound.
        end: Option<Value>,
    },
    /// An explicit list of values.
    List(Vec<Value>),
}

impl FilterValue {
    /// Create a scalar operand.
    pub fn scalar(v: impl Into<Value>) -> Self {
        Self::Scalar(v.into())
    }

    /// Create a list operand.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Create a range with both bounds present.
    pub fn range(start: impl Into<Value>, end: impl Into<Value>) -> Self {
        Self::Range {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }

    /// Create a range with only a lower bound.
    pub fn from_start(start: impl Into<Value>) -> Self {
        Self::Range {
            start: Some(start.into()),
            end: None,
        }
    }

    /// Create a range with only an upper bound.
    pub fn until(end: impl Into<Value>) -> Self {
        Self::Range {
            start: None,
            end: Some(end.into()),
        }
    }

    /// Flatten into the ordered bind sequence.
    ///
    /// Absent range bounds are skipped, so a half-open range yields one value.
    pub fn values(&self) -> Vec<Value> {
        match self {
            Self::Scalar(v) => vec![v.clone()],
            Self::Range { start, end } => [start, end]
                .into_iter()
                .flatten()
                .filter(|v| !v.is_null())
                .cloned()
                .collect(),
            Self::List(items) => items.clone(),
        }
    }

    /// Decode from the JSON wire form.
    ///
    /// Objects are ranges (`start`/`end`, `null` counts as absent), arrays are
    /// lists and everything else is a scalar.
    pub fn from_json(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Object(mut map) => {
                let mut bound = |key: &str| {
                    map.remove(key)
                        .map(Value::from)
                        .filter(|v| !v.is_null())
                };
                let start = bound("start");
                let end = bound("end");
                Self::Range { start, end }
            },
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            },
            scalar => Self::Scalar(Value::from(scalar)),
        }
    }
}

impl From<Value> for FilterValue {
    fn from(v: Value) -> Self {
        Self::Scalar(v)
    }
}

impl<'de> Deserialize<'de> for FilterValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Self::from_json)
    }
}
