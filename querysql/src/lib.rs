//! Compile query-builder filter trees into parameterized SQL.
//!
//! A filter tree, as produced by a visual query builder and decoded from
//! JSON, becomes a SQL fragment plus the ordered bind values for its
//! placeholders. The same tree targets Postgres (`$1, $2, ...`) or `MySQL`
//! (`?`) through the [`Dialect`] trait.
//!
//! # Example
//!
//! ```
//! use querysql::{FilterNode, SqlConfig, Value, compile_postgres};
//!
//! let tree = FilterNode::from_json(r#"{
//!     "glue": "and",
//!     "rules": [
//!         { "field": "age", "condition": { "type": "between", "filter": { "start": 18 } } },
//!         { "field": "json:cfg.plan", "condition": { "type": "equal", "filter": "pro" } },
//!         { "field": "status", "includes": ["active", "trial"] }
//!     ]
//! }"#).unwrap();
//!
//! let config = SqlConfig::new().allow_fields(&["age", "json:cfg.plan", "status"]);
//! let compiled = compile_postgres(&tree, &config).unwrap();
//!
//! assert_eq!(
//!     compiled.sql,
//!     r#"( age > $1 AND ("cfg"->'plan')::text = $2 AND status IN($3,$4) )"#
//! );
//! assert_eq!(compiled.values[0], Value::Int(18));
//! ```
//!
//! # Extension points
//!
//! - [`SqlConfig::allow_fields`] / [`SqlConfig::allow_if`] - field whitelist
//! - [`SqlConfig::operation`] - operators beyond the built-in set
//! - [`SqlConfig::predicate`] - rewrite a field expression before comparison
//! - [`SqlConfig::alias`] - operands supplied by the caller instead of the tree

mod compile;
mod config;
mod dialect;
mod error;
mod field;
mod node;
mod validate;
mod value;

pub use compile::{CompiledFilter, Operator, compile};
pub use config::{ConfigFile, CustomOperation, CustomPredicate, Placeholders, SqlConfig};
pub use dialect::{Dialect, MySql, Postgres};
pub use error::{Error, Result};
pub use field::{DEFAULT_JSON_TYPE, JSON_MARKER, JsonCast, JsonField, ResolvedField, resolve_field};
pub use node::{Composite, FilterNode, Glue, Leaf};
pub use validate::{FieldPredicate, Whitelist, is_valid_sql_identifier};
pub use value::{FilterValue, Value};

/// Compile for Postgres with a fresh placeholder counter.
pub fn compile_postgres(node: &FilterNode, config: &SqlConfig) -> Result<CompiledFilter> {
    compile(node, config, &mut Postgres::new())
}

/// Compile for `MySQL`.
pub fn compile_mysql(node: &FilterNode, config: &SqlConfig) -> Result<CompiledFilter> {
    compile(node, config, &mut MySql)
}
