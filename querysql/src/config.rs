//! Compile-time configuration: whitelist, custom operations, predicates and
//! aliases.
//!
//! # Example
//!
//! ```
//! use querysql::{SqlConfig, Value};
//!
//! let config = SqlConfig::new()
//!     .allow_fields(&["a", "b", "created"])
//!     .operation("is null", |field, _op, _values, _ph| {
//!         Ok((format!("{field} IS NULL"), vec![]))
//!     })
//!     .predicate("year", |field, _name| Ok(format!("EXTRACT(YEAR FROM {field})")))
//!     .alias("today", Value::from("2024-01-01"));
//!
//! assert!(config.whitelist().allows("a"));
//! assert!(config.get_operation("is null").is_some());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::Result;
use crate::validate::Whitelist;
use crate::value::{FilterValue, Value};

/// Placeholder source handed to a [`CustomOperation`].
///
/// Draws from the dialect compiling the tree, so `$n` numbering continues
/// across custom and built-in leaves. Every returned value needs exactly one
/// placeholder taken from here, in value order.
pub struct Placeholders<'a> {
    next: &'a mut dyn FnMut() -> String,
    issued: usize,
}

impl<'a> Placeholders<'a> {
    pub(crate) fn new(next: &'a mut dyn FnMut() -> String) -> Self {
        Self { next, issued: 0 }
    }

    /// The next placeholder of the active dialect.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> String {
        self.issued += 1;
        (self.next)()
    }

    /// How many placeholders were handed out.
    pub const fn issued(&self) -> usize {
        self.issued
    }
}

impl fmt::Debug for Placeholders<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Placeholders")
            .field("issued", &self.issued)
            .finish_non_exhaustive()
    }
}

/// Handler for an operator outside the built-in set.
///
/// Receives the resolved field expression, the operator name, the leaf's
/// operand values and a placeholder source. Returns the SQL fragment together
/// with the values its placeholders consume.
///
/// A range operand always arrives as two entries, `[start, end]`, with
/// [`Value::Null`] standing in for an absent bound.
pub type CustomOperation = Arc<
    dyn Fn(&str, &str, &[Value], &mut Placeholders<'_>) -> Result<(String, Vec<Value>)> + Send + Sync,
>;

/// Handler rewriting a field expression, e.g. wrapping it in `EXTRACT`.
///
/// Receives the resolved field expression and the predicate name.
pub type CustomPredicate = Arc<dyn Fn(&str, &str) -> Result<String> + Send + Sync>;

/// Configuration consulted while compiling a filter tree.
///
/// Read-only during compilation, so one config can be shared between
/// threads compiling with their own dialect instances.
#[derive(Clone, Default)]
pub struct SqlConfig {
    whitelist: Whitelist,
    operations: HashMap<String, CustomOperation>,
    predicates: HashMap<String, CustomPredicate>,
    aliases: HashMap<String, FilterValue>,
}

impl SqlConfig {
    /// Create an empty configuration: every field allowed, no extensions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whitelist.
    #[must_use]
    pub fn whitelist_with(mut self, whitelist: Whitelist) -> Self {
        self.whitelist = whitelist;
        self
    }

    /// Add exact field names to the whitelist.
    #[must_use]
    pub fn allow_fields(mut self, fields: &[&str]) -> Self {
        self.whitelist = self.whitelist.allow_fields(fields);
        self
    }

    /// Set the whitelist predicate.
    #[must_use]
    pub fn allow_if(mut self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.whitelist = self.whitelist.allow_if(predicate);
        self
    }

    /// Register a custom operation.
    #[must_use]
    pub fn operation(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&str, &str, &[Value], &mut Placeholders<'_>) -> Result<(String, Vec<Value>)>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.operations.insert(name.into(), Arc::new(handler));
        self
    }

    /// Register a custom predicate.
    #[must_use]
    pub fn predicate(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&str, &str) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.predicates.insert(name.into(), Arc::new(handler));
        self
    }

    /// Register an alias supplying a leaf's operand.
    #[must_use]
    pub fn alias(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.aliases.insert(name.into(), value.into());
        self
    }

    /// The field whitelist.
    pub const fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Look up a custom operation by exact name.
    pub fn get_operation(&self, name: &str) -> Option<&CustomOperation> {
        self.operations.get(name)
    }

    /// Look up a custom predicate by exact name.
    pub fn get_predicate(&self, name: &str) -> Option<&CustomPredicate> {
        self.predicates.get(name)
    }

    /// Look up an alias.
    pub fn get_alias(&self, name: &str) -> Option<&FilterValue> {
        self.aliases.get(name)
    }
}

impl fmt::Debug for SqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut operations: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        operations.sort_unstable();
        let mut predicates: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        predicates.sort_unstable();

        f.debug_struct("SqlConfig")
            .field("whitelist", &self.whitelist)
            .field("operations", &operations)
            .field("predicates", &predicates)
            .field("aliases", &self.aliases)
            .finish()
    }
}

/// The declarative part of [`SqlConfig`], loadable from a config file.
///
/// ```toml
/// whitelist = ["a", "b"]
/// whitelist_prefixes = ["json:cfg."]
///
/// [aliases]
/// today = "2024-01-01"
/// ids = [1, 2, 3]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Exact field names to allow.
    pub whitelist: Option<Vec<String>>,
    /// Allow any field starting with one of these prefixes.
    pub whitelist_prefixes: Vec<String>,
    /// Alias name to operand.
    pub aliases: HashMap<String, FilterValue>,
}

impl ConfigFile {
    /// Build the runtime configuration.
    pub fn into_config(self) -> SqlConfig {
        let mut whitelist = Whitelist::new();
        if let Some(fields) = &self.whitelist {
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            whitelist = whitelist.allow_fields(&fields);
        }
        if !self.whitelist_prefixes.is_empty() {
            let prefixes = self.whitelist_prefixes;
            whitelist =
                whitelist.allow_if(move |field| prefixes.iter().any(|p| field.starts_with(p.as_str())));
        }

        SqlConfig {
            whitelist,
            aliases: self.aliases,
            ..SqlConfig::default()
        }
    }
}
