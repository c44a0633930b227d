//! Filter tree produced by the query-builder UI.
//!
//! # Wire format
//!
//! ```json
//! {
//!   "glue": "or",
//!   "rules": [
//!     { "field": "age", "condition": { "type": "between", "filter": { "start": 18, "end": 65 } } },
//!     { "field": "status", "includes": ["active", "trial"] },
//!     { "field": "json:cfg.plan", "filter": "equal", "value": "pro" }
//!   ]
//! }
//! ```
//!
//! `rules` (or `data`) makes a node composite even when it is an empty array.
//! The operator and operand are read from `condition.type`/`condition.filter`,
//! then `type`/`filter`, then `filter`/`value`, in that order.

use serde::Deserialize;

use crate::error::Result;
use crate::value::{FilterValue, Value};

/// Boolean connective of a composite node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Glue {
    /// All children must match.
    #[default]
    And,
    /// At least one child must match.
    Or,
}

impl Glue {
    /// Parse a glue name. Only `or` (any case) selects [`Glue::Or`].
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("or") {
            Self::Or
        } else {
            Self::And
        }
    }

    /// The SQL separator used between child fragments.
    pub const fn separator(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// A single comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leaf {
    /// Field identifier, possibly a `[table.]json:column.key[:type]` reference.
    pub field: String,
    /// Operator name. Empty means the leaf filters nothing.
    pub operator: String,
    /// Operand for the operator.
    pub value: Option<FilterValue>,
    /// Membership values; when non-empty they replace operator dispatch.
    pub includes: Option<Vec<Value>>,
    /// Key into the configured alias map supplying the operand.
    pub alias: Option<String>,
    /// Name of a registered predicate wrapping the field expression.
    pub predicate: Option<String>,
}

impl Leaf {
    /// Create a leaf comparing `field` with `operator`.
    pub fn new(field: impl Into<String>, operator: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            ..Self::default()
        }
    }

    /// Set the operand.
    #[must_use]
    pub fn value(mut self, value: impl Into<FilterValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set a membership list.
    #[must_use]
    pub fn includes<T: Into<Value>>(mut self, items: impl IntoIterator<Item = T>) -> Self {
        self.includes = Some(items.into_iter().map(Into::into).collect());
        self
    }

    /// Take the operand from the alias map.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Wrap the field with a registered predicate.
    #[must_use]
    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }
}

/// Children combined with a boolean connective.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composite {
    /// Connective between the children.
    pub glue: Glue,
    /// Children in emission order.
    pub rules: Vec<FilterNode>,
}

/// A node of the filter tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawNode")]
pub enum FilterNode {
    /// Children joined by `AND`/`OR`.
    Composite(Composite),
    /// One comparison.
    Leaf(Leaf),
}

impl Default for FilterNode {
    fn default() -> Self {
        Self::Leaf(Leaf::default())
    }
}

impl From<Leaf> for FilterNode {
    fn from(leaf: Leaf) -> Self {
        Self::Leaf(leaf)
    }
}

impl FilterNode {
    /// Decode a filter tree from its JSON wire form.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// A leaf comparing `field` against a scalar with `operator`.
    pub fn leaf(field: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Leaf(Leaf::new(field, operator).value(value.into()))
    }

    /// Children that must all match.
    pub fn and(rules: Vec<Self>) -> Self {
        Self::Composite(Composite {
            glue: Glue::And,
            rules,
        })
    }

    /// Children of which at least one must match.
    pub fn or(rules: Vec<Self>) -> Self {
        Self::Composite(Composite {
            glue: Glue::Or,
            rules,
        })
    }

    /// Whether the node compiles to nothing: a leaf without a field.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Leaf(leaf) if leaf.field.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCondition {
    #[serde(rename = "type")]
    kind: Option<String>,
    filter: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNode {
    glue: Option<String>,
    #[serde(alias = "data")]
    rules: Option<Vec<RawNode>>,
    field: Option<String>,
    alias: Option<String>,
    predicate: Option<String>,
    includes: Option<Vec<serde_json::Value>>,
    condition: Option<RawCondition>,
    #[serde(rename = "type")]
    kind: Option<String>,
    filter: Option<serde_json::Value>,
    value: Option<serde_json::Value>,
}

impl RawNode {
    /// Pick the operator name and operand out of the accepted wire shapes.
    fn operator_and_value(
        condition: Option<RawCondition>,
        kind: Option<String>,
        filter: Option<serde_json::Value>,
        value: Option<serde_json::Value>,
    ) -> (String, Option<serde_json::Value>) {
        if let Some(cond) = condition {
            return (cond.kind.unwrap_or_default(), cond.filter);
        }
        if let Some(kind) = kind {
            return (kind, filter.or(value));
        }
        let operator = match filter {
            Some(serde_json::Value::String(name)) => name,
            _ => String::new(),
        };
        (operator, value)
    }
}

impl From<RawNode> for FilterNode {
    fn from(raw: RawNode) -> Self {
        if let Some(rules) = raw.rules {
            return Self::Composite(Composite {
                glue: raw.glue.as_deref().map(Glue::parse).unwrap_or_default(),
                rules: rules.into_iter().map(Self::from).collect(),
            });
        }

        let (operator, value) =
            RawNode::operator_and_value(raw.condition, raw.kind, raw.filter, raw.value);

        Self::Leaf(Leaf {
            field: raw.field.unwrap_or_default(),
            operator,
            value: value.map(FilterValue::from_json),
            includes: raw
                .includes
                .map(|items| items.into_iter().map(Value::from).collect()),
            alias: raw.alias,
            predicate: raw.predicate,
        })
    }
}
