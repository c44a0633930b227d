//! Filter tree compilation.
//!
//! Walks a [`FilterNode`] depth-first, left to right, asking the [`Dialect`]
//! for one placeholder per bind value in the order the values are emitted.
//! The returned SQL therefore always carries exactly as many placeholders as
//! there are entries in [`CompiledFilter::values`], in the same order.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{Placeholders, SqlConfig};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::field::resolve_field;
use crate::node::{Composite, FilterNode, Leaf};
use crate::value::{FilterValue, Value};

/// Built-in comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Equal,
    /// `<>`
    NotEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessOrEqual,
    /// `>=`
    GreaterOrEqual,
    /// Substring match.
    Contains,
    /// Negated substring match.
    NotContains,
    /// Prefix match.
    BeginsWith,
    /// Negated prefix match.
    NotBeginsWith,
    /// Suffix match.
    EndsWith,
    /// Negated suffix match.
    NotEndsWith,
    /// Strictly inside a range.
    Between,
    /// Strictly outside a range.
    NotBetween,
}

/// How an operator renders.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Compare(&'static str),
    Contains { negated: bool },
    StartsWith { negated: bool },
    EndsWith { negated: bool },
    Range { negated: bool },
}

impl Operator {
    /// Every built-in operator.
    pub const ALL: [Self; 14] = [
        Self::Equal,
        Self::NotEqual,
        Self::Less,
        Self::Greater,
        Self::LessOrEqual,
        Self::GreaterOrEqual,
        Self::Contains,
        Self::NotContains,
        Self::BeginsWith,
        Self::NotBeginsWith,
        Self::EndsWith,
        Self::NotEndsWith,
        Self::Between,
        Self::NotBetween,
    ];

    /// Look up a built-in operator by its wire name (case-sensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// The wire name, e.g. `lessOrEqual`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "notEqual",
            Self::Less => "less",
            Self::Greater => "greater",
            Self::LessOrEqual => "lessOrEqual",
            Self::GreaterOrEqual => "greaterOrEqual",
            Self::Contains => "contains",
            Self::NotContains => "notContains",
            Self::BeginsWith => "beginsWith",
            Self::NotBeginsWith => "notBeginsWith",
            Self::EndsWith => "endsWith",
            Self::NotEndsWith => "notEndsWith",
            Self::Between => "between",
            Self::NotBetween => "notBetween",
        }
    }

    const fn shape(self) -> Shape {
        match self {
            Self::Equal => Shape::Compare("="),
            Self::NotEqual => Shape::Compare("<>"),
            Self::Less => Shape::Compare("<"),
            Self::Greater => Shape::Compare(">"),
            Self::LessOrEqual => Shape::Compare("<="),
            Self::GreaterOrEqual => Shape::Compare(">="),
            Self::Contains => Shape::Contains { negated: false },
            Self::NotContains => Shape::Contains { negated: true },
            Self::BeginsWith => Shape::StartsWith { negated: false },
            Self::NotBeginsWith => Shape::StartsWith { negated: true },
            Self::EndsWith => Shape::EndsWith { negated: false },
            Self::NotEndsWith => Shape::EndsWith { negated: true },
            Self::Between => Shape::Range { negated: false },
            Self::NotBetween => Shape::Range { negated: true },
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| Error::UnknownOperator {
            operator: s.to_string(),
        })
    }
}

/// Compiled SQL fragment with its bind values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[must_use = "CompiledFilter must be embedded in a query to have any effect"]
pub struct CompiledFilter {
    /// SQL fragment without `WHERE` or a statement terminator.
    pub sql: String,
    /// Bind values, one per placeholder, in placeholder order.
    pub values: Vec<Value>,
}

impl CompiledFilter {
    fn new(sql: String, values: Vec<Value>) -> Self {
        Self { sql, values }
    }

    /// Whether the filter is a no-op.
    pub const fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Compile a filter tree into a SQL fragment and its bind values.
///
/// The dialect is reset first, so a single `Postgres` instance can be reused
/// for consecutive compilations and always numbers from `$1`.
///
/// # Example
///
/// ```
/// use querysql::{FilterNode, MySql, SqlConfig, compile};
///
/// let tree = FilterNode::from_json(
///     r#"{ "glue": "or", "rules": [
///         { "field": "a", "type": "less", "filter": 1 },
///         { "field": "b", "type": "greater", "filter": "abc" }
///     ] }"#,
/// ).unwrap();
///
/// let compiled = compile(&tree, &SqlConfig::default(), &mut MySql).unwrap();
/// assert_eq!(compiled.sql, "( a < ? OR b > ? )");
/// assert_eq!(compiled.values.len(), 2);
/// ```
pub fn compile<D: Dialect + ?Sized>(
    node: &FilterNode,
    config: &SqlConfig,
    dialect: &mut D,
) -> Result<CompiledFilter> {
    dialect.reset();
    debug!(dialect = dialect.name(), "compiling filter");
    let compiled = compile_node(node, config, dialect)?;
    debug!(
        dialect = dialect.name(),
        sql_len = compiled.sql.len(),
        values = compiled.values.len(),
        "compiled filter"
    );
    Ok(compiled)
}

fn compile_node<D: Dialect + ?Sized>(
    node: &FilterNode,
    config: &SqlConfig,
    dialect: &mut D,
) -> Result<CompiledFilter> {
    match node {
        FilterNode::Leaf(leaf) => compile_leaf(leaf, config, dialect),
        FilterNode::Composite(composite) => compile_composite(composite, config, dialect),
    }
}

/// Join children with the glue; parenthesize only when two or more remain.
///
/// No-op children (empty SQL) are dropped first and do not count toward
/// parenthesization.
fn compile_composite<D: Dialect + ?Sized>(
    composite: &Composite,
    config: &SqlConfig,
    dialect: &mut D,
) -> Result<CompiledFilter> {
    let mut fragments = Vec::with_capacity(composite.rules.len());
    let mut values = Vec::new();

    for rule in &composite.rules {
        let child = compile_node(rule, config, dialect)?;
        values.extend(child.values);
        // No-op children leave no trace in the joined text
        if !child.sql.is_empty() {
            fragments.push(child.sql);
        }
    }

    let joined = fragments.join(composite.glue.separator());
    let sql = if fragments.len() > 1 {
        format!("( {joined} )")
    } else {
        joined
    };

    Ok(CompiledFilter::new(sql, values))
}

fn compile_leaf<D: Dialect + ?Sized>(
    leaf: &Leaf,
    config: &SqlConfig,
    dialect: &mut D,
) -> Result<CompiledFilter> {
    if leaf.field.is_empty() {
        return Ok(CompiledFilter::default());
    }

    if !config.whitelist().allows(&leaf.field) {
        debug!(field = %leaf.field, "field rejected by whitelist");
        return Err(Error::FieldNotWhitelisted {
            field: leaf.field.clone(),
        });
    }

    let resolved = resolve_field(dialect, &leaf.field)?;
    let mut name = resolved.name;

    if let Some(predicate) = &leaf.predicate {
        let Some(handler) = config.get_predicate(predicate) else {
            debug!(field = %leaf.field, predicate = %predicate, "unknown predicate");
            return Err(Error::UnknownPredicate {
                predicate: predicate.clone(),
            });
        };
        name = handler(name.as_str(), predicate.as_str())?;
    }

    // Membership lists preempt the operator entirely
    if let Some(includes) = leaf.includes.as_ref().filter(|items| !items.is_empty()) {
        let sql = dialect.in_clause(&name, includes.len());
        return Ok(CompiledFilter::new(sql, includes.clone()));
    }

    if leaf.operator.is_empty() {
        return Ok(CompiledFilter::default());
    }

    let operand = leaf
        .alias
        .as_deref()
        .and_then(|alias| config.get_alias(alias))
        .or(leaf.value.as_ref());

    trace!(
        field = %leaf.field,
        operator = %leaf.operator,
        is_json = resolved.is_json,
        "compiling leaf"
    );

    if let Some(op) = Operator::from_name(&leaf.operator) {
        return build_condition(dialect, op, &name, resolved.is_json, operand);
    }

    if let Some(handler) = config.get_operation(&leaf.operator) {
        let values = operation_values(operand);
        let mut next = || dialect.placeholder();
        let mut placeholders = Placeholders::new(&mut next);
        let (sql, values) = handler(
            name.as_str(),
            leaf.operator.as_str(),
            values.as_slice(),
            &mut placeholders,
        )?;
        if placeholders.issued() != values.len() {
            return Err(Error::operation(
                leaf.operator.as_str(),
                format!(
                    "returned {} values for {} placeholders",
                    values.len(),
                    placeholders.issued()
                ),
            ));
        }
        return Ok(CompiledFilter::new(sql, values));
    }

    debug!(field = %leaf.field, operator = %leaf.operator, "unknown operator");
    Err(Error::UnknownOperator {
        operator: leaf.operator.clone(),
    })
}

/// Operand values as a custom operation sees them.
///
/// Ranges keep both positions, `NULL` marking the absent side.
fn operation_values(operand: Option<&FilterValue>) -> Vec<Value> {
    match operand {
        None => Vec::new(),
        Some(FilterValue::Range { start, end }) => [start, end]
            .into_iter()
            .map(|bound| bound.clone().unwrap_or(Value::Null))
            .collect(),
        Some(other) => other.values(),
    }
}

/// Build a single built-in condition.
fn build_condition<D: Dialect + ?Sized>(
    dialect: &mut D,
    op: Operator,
    field: &str,
    is_json: bool,
    operand: Option<&FilterValue>,
) -> Result<CompiledFilter> {
    let (sql, value) = match op.shape() {
        Shape::Range { negated } => return build_range(dialect, op, field, negated, operand),
        Shape::Compare(cmp) => {
            let value = single_value(op, operand)?;
            (format!("{field} {cmp} {}", dialect.placeholder()), value)
        },
        Shape::Contains { negated } => {
            let value = single_value(op, operand)?;
            (dialect.contains_clause(field, negated, is_json), value)
        },
        Shape::StartsWith { negated } => {
            let value = single_value(op, operand)?;
            (dialect.starts_with_clause(field, negated, is_json), value)
        },
        Shape::EndsWith { negated } => {
            let value = single_value(op, operand)?;
            (dialect.ends_with_clause(field, negated, is_json), value)
        },
    };

    Ok(CompiledFilter::new(sql, vec![value]))
}

/// The one value a single-placeholder operator binds.
fn single_value(op: Operator, operand: Option<&FilterValue>) -> Result<Value> {
    let wrong = |actual| Error::WrongArity {
        operator: op.name().to_string(),
        expected: 1,
        actual,
    };

    match operand {
        None => Err(wrong(0)),
        Some(FilterValue::Scalar(v)) => Ok(v.clone()),
        Some(FilterValue::List(items)) => match items.as_slice() {
            [v] => Ok(v.clone()),
            _ => Err(wrong(items.len())),
        },
        Some(range @ FilterValue::Range { .. }) => Err(wrong(range.values().len())),
    }
}

/// Split an operand into `(start, end)` bounds, treating `NULL` as absent.
fn range_bounds(
    op: Operator,
    operand: Option<&FilterValue>,
) -> Result<(Option<Value>, Option<Value>)> {
    let bound = |v: Option<&Value>| v.filter(|v| !v.is_null()).cloned();
    let wrong = |actual| Error::WrongArity {
        operator: op.name().to_string(),
        expected: 2,
        actual,
    };

    match operand {
        None => Ok((None, None)),
        Some(FilterValue::Range { start, end }) => Ok((bound(start.as_ref()), bound(end.as_ref()))),
        Some(FilterValue::List(items)) => match items.as_slice() {
            [start, end] => Ok((bound(Some(start)), bound(Some(end)))),
            _ => Err(wrong(items.len())),
        },
        Some(FilterValue::Scalar(_)) => Err(wrong(1)),
    }
}

/// Build `between` / `notBetween`, degrading to one side when a bound is absent.
fn build_range<D: Dialect + ?Sized>(
    dialect: &mut D,
    op: Operator,
    field: &str,
    negated: bool,
    operand: Option<&FilterValue>,
) -> Result<CompiledFilter> {
    let (lower, upper, glue) = if negated {
        ("<", ">", "OR")
    } else {
        (">", "<", "AND")
    };

    match range_bounds(op, operand)? {
        (Some(start), Some(end)) => {
            let first = dialect.placeholder();
            let second = dialect.placeholder();
            let sql = format!("( {field} {lower} {first} {glue} {field} {upper} {second} )");
            Ok(CompiledFilter::new(sql, vec![start, end]))
        },
        (Some(start), None) => {
            let sql = format!("{field} {lower} {}", dialect.placeholder());
            Ok(CompiledFilter::new(sql, vec![start]))
        },
        (None, Some(end)) => {
            let sql = format!("{field} {upper} {}", dialect.placeholder());
            Ok(CompiledFilter::new(sql, vec![end]))
        },
        (None, None) => Err(Error::WrongArity {
            operator: op.name().to_string(),
            expected: 2,
            actual: 0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Postgres};
    use crate::node::Leaf;

    fn mysql(node: &FilterNode) -> Result<CompiledFilter> {
        compile(node, &SqlConfig::default(), &mut MySql)
    }

    fn pg(node: &FilterNode) -> Result<CompiledFilter> {
        compile(node, &SqlConfig::default(), &mut Postgres::new())
    }

    #[test]
    fn test_operator_names_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_name(op.name()), Some(op));
            assert_eq!(op.name().parse::<Operator>().unwrap(), op);
        }
        assert_eq!(Operator::from_name("Equal"), None);
        assert!(matches!(
            "range100".parse::<Operator>(),
            Err(Error::UnknownOperator { .. })
        ));
    }

    #[test]
    fn test_empty_node() {
        let out = mysql(&FilterNode::default()).unwrap();
        assert!(out.is_empty());
        assert!(out.values.is_empty());
    }

    #[test]
    fn test_leaf_without_operator_is_noop() {
        let out = pg(&FilterNode::Leaf(Leaf::new("a", ""))).unwrap();
        assert!(out.is_empty());
        assert!(out.values.is_empty());
    }

    #[test]
    fn test_comparisons() {
        let cases = [
            ("equal", "a = ?"),
            ("notEqual", "a <> ?"),
            ("less", "a < ?"),
            ("greater", "a > ?"),
            ("lessOrEqual", "a <= ?"),
            ("greaterOrEqual", "a >= ?"),
        ];
        for (op, expected) in cases {
            let out = mysql(&FilterNode::leaf("a", op, 1)).unwrap();
            assert_eq!(out.sql, expected);
            assert_eq!(out.values, vec![Value::Int(1)]);
        }
    }

    #[test]
    fn test_between_both_bounds() {
        let node = FilterNode::Leaf(Leaf::new("a", "between").value(FilterValue::range(1, 2)));
        assert_eq!(mysql(&node).unwrap().sql, "( a > ? AND a < ? )");
        let out = pg(&node).unwrap();
        assert_eq!(out.sql, "( a > $1 AND a < $2 )");
        assert_eq!(out.values, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_range_degrades_to_one_side() {
        let cases = [
            ("between", FilterValue::from_start(1), "a > ?", Value::Int(1)),
            ("between", FilterValue::until(2), "a < ?", Value::Int(2)),
            ("notBetween", FilterValue::from_start(1), "a < ?", Value::Int(1)),
            ("notBetween", FilterValue::until(2), "a > ?", Value::Int(2)),
        ];
        for (op, value, sql, bound) in cases {
            let out = mysql(&FilterNode::Leaf(Leaf::new("a", op).value(value))).unwrap();
            assert_eq!(out.sql, sql, "{op}");
            assert_eq!(out.values, vec![bound]);
        }
    }

    #[test]
    fn test_not_between_both_bounds() {
        let node = FilterNode::Leaf(Leaf::new("a", "notBetween").value(FilterValue::range(1, 2)));
        assert_eq!(pg(&node).unwrap().sql, "( a < $1 OR a > $2 )");
    }

    #[test]
    fn test_range_without_bounds_is_wrong_arity() {
        let empty = FilterValue::Range {
            start: None,
            end: None,
        };
        let err = mysql(&FilterNode::Leaf(Leaf::new("a", "between").value(empty))).unwrap_err();
        assert!(matches!(err, Error::WrongArity { actual: 0, .. }));

        let err = mysql(&FilterNode::Leaf(Leaf::new("a", "notBetween"))).unwrap_err();
        assert!(matches!(err, Error::WrongArity { ref operator, .. } if operator == "notBetween"));
    }

    #[test]
    fn test_range_from_list() {
        let node =
            FilterNode::Leaf(Leaf::new("a", "between").value(FilterValue::list([Value::Null, Value::Int(9)])));
        let out = mysql(&node).unwrap();
        assert_eq!(out.sql, "a < ?");
        assert_eq!(out.values, vec![Value::Int(9)]);

        let node = FilterNode::Leaf(Leaf::new("a", "between").value(FilterValue::list([1, 2, 3])));
        assert!(matches!(mysql(&node), Err(Error::WrongArity { actual: 3, .. })));
    }

    #[test]
    fn test_single_value_operator_arity() {
        let err = mysql(&FilterNode::Leaf(Leaf::new("a", "equal"))).unwrap_err();
        assert!(matches!(err, Error::WrongArity { expected: 1, actual: 0, .. }));

        let node = FilterNode::Leaf(Leaf::new("a", "equal").value(FilterValue::range(1, 2)));
        assert!(matches!(mysql(&node), Err(Error::WrongArity { actual: 2, .. })));

        let node = FilterNode::Leaf(Leaf::new("a", "equal").value(FilterValue::list([7])));
        assert_eq!(mysql(&node).unwrap().values, vec![Value::Int(7)]);
    }

    #[test]
    fn test_includes() {
        let node = FilterNode::Leaf(Leaf::new("a", "").includes([1, 2, 3]));
        let out = mysql(&node).unwrap();
        assert_eq!(out.sql, "a IN(?,?,?)");
        assert_eq!(out.values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(pg(&node).unwrap().sql, "a IN($1,$2,$3)");
    }

    #[test]
    fn test_includes_preempts_operator() {
        let node = FilterNode::Leaf(Leaf::new("a", "equal").value(Value::Int(5)).includes(["x"]));
        let out = mysql(&node).unwrap();
        assert_eq!(out.sql, "a IN(?)");
        assert_eq!(out.values, vec![Value::String("x".into())]);
    }

    #[test]
    fn test_empty_includes_falls_back_to_operator() {
        let node = FilterNode::Leaf(
            Leaf::new("a", "equal")
                .value(Value::Int(5))
                .includes(Vec::<Value>::new()),
        );
        assert_eq!(mysql(&node).unwrap().sql, "a = ?");
    }

    #[test]
    fn test_single_child_not_parenthesized() {
        let node = FilterNode::or(vec![FilterNode::leaf("a", "less", 1)]);
        assert_eq!(mysql(&node).unwrap().sql, "a < ?");
    }

    #[test]
    fn test_composite_glue() {
        let rules = vec![FilterNode::leaf("a", "less", 1), FilterNode::leaf("b", "greater", "abc")];
        let and = mysql(&FilterNode::and(rules.clone())).unwrap();
        assert_eq!(and.sql, "( a < ? AND b > ? )");
        let or = mysql(&FilterNode::or(rules)).unwrap();
        assert_eq!(or.sql, "( a < ? OR b > ? )");
        assert_eq!(or.values, vec![Value::Int(1), Value::String("abc".into())]);
    }

    #[test]
    fn test_composite_skips_noop_children() {
        let node = FilterNode::and(vec![
            FilterNode::default(),
            FilterNode::leaf("a", "equal", 1),
            FilterNode::and(vec![]),
        ]);
        assert_eq!(mysql(&node).unwrap().sql, "a = ?");
    }

    #[test]
    fn test_empty_composite() {
        let out = pg(&FilterNode::and(vec![])).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_nested_numbering_is_global() {
        let inner = FilterNode::or(vec![FilterNode::leaf("a", "less", 1), FilterNode::leaf("b", "greater", 2)]);
        let node = FilterNode::and(vec![inner.clone(), inner, FilterNode::leaf("c", "equal", 3)]);
        assert_eq!(
            pg(&node).unwrap().sql,
            "( ( a < $1 OR b > $2 ) AND ( a < $3 OR b > $4 ) AND c = $5 )"
        );
    }

    #[test]
    fn test_compile_resets_dialect() {
        let node = FilterNode::leaf("a", "equal", 1);
        let mut dialect = Postgres::new();
        let first = compile(&node, &SqlConfig::default(), &mut dialect).unwrap();
        let second = compile(&node, &SqlConfig::default(), &mut dialect).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.sql, "a = $1");
    }

    #[test]
    fn test_first_error_aborts() {
        let node = FilterNode::and(vec![
            FilterNode::leaf("a", "equal", 1),
            FilterNode::leaf("b", "nope", 1),
            FilterNode::leaf("c", "alsoNope", 1),
        ]);
        let err = mysql(&node).unwrap_err();
        assert!(matches!(err, Error::UnknownOperator { ref operator } if operator == "nope"));
    }

    #[test]
    fn test_dyn_dialect() {
        let mut dialect: Box<dyn Dialect> = Box::new(Postgres::new());
        let out = compile(&FilterNode::leaf("a", "equal", 1), &SqlConfig::default(), dialect.as_mut())
            .unwrap();
        assert_eq!(out.sql, "a = $1");
    }
}
