//! Field whitelist.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied test deciding whether a field may be used.
pub type FieldPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Controls which field identifiers may appear in compiled SQL.
///
/// The guard sees the raw identifier as written in the filter tree, before
/// any JSON rewriting, so `json:cfg.a` is whitelisted as `json:cfg.a`.
///
/// Two layers, either of which admits a field:
/// 1. Static set - exact field names
/// 2. Predicate - arbitrary test on the name
///
/// With neither configured every field is allowed. A static set that is
/// present but empty admits nothing on its own.
#[derive(Clone, Default)]
pub struct Whitelist {
    fields: Option<HashSet<String>>,
    predicate: Option<FieldPredicate>,
}

impl Whitelist {
    /// Create a whitelist that allows every field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add exact field names to the static set.
    #[must_use]
    pub fn allow_fields(mut self, fields: &[&str]) -> Self {
        self.fields
            .get_or_insert_with(HashSet::new)
            .extend(fields.iter().map(|s| (*s).to_string()));
        self
    }

    /// Set the predicate consulted for fields missing from the static set.
    #[must_use]
    pub fn allow_if(mut self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Whether any restriction is configured.
    pub const fn is_restricted(&self) -> bool {
        self.fields.is_some() || self.predicate.is_some()
    }

    /// Check a raw field identifier.
    pub fn allows(&self, field: &str) -> bool {
        if !self.is_restricted() {
            return true;
        }

        self.fields.as_ref().is_some_and(|set| set.contains(field))
            || self.predicate.as_ref().is_some_and(|allow| allow(field))
    }
}

impl fmt::Debug for Whitelist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Whitelist")
            .field("fields", &self.fields)
            .field("predicate", &self.predicate.as_ref().map(|_| "Fn(&str) -> bool"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_allows_all() {
        let whitelist = Whitelist::new();
        assert!(!whitelist.is_restricted());
        assert!(whitelist.allows("anything"));
        assert!(whitelist.allows("json:cfg.a"));
    }

    #[test]
    fn test_static_set() {
        let whitelist = Whitelist::new().allow_fields(&["a", "b"]);
        assert!(whitelist.allows("a"));
        assert!(whitelist.allows("b"));
        assert!(!whitelist.allows("c"));
    }

    #[test]
    fn test_empty_static_set_denies() {
        let whitelist = Whitelist::new().allow_fields(&[]);
        assert!(whitelist.is_restricted());
        assert!(!whitelist.allows("a"));
    }

    #[test]
    fn test_allow_fields_accumulates() {
        let whitelist = Whitelist::new().allow_fields(&["a"]).allow_fields(&["b"]);
        assert!(whitelist.allows("a"));
        assert!(whitelist.allows("b"));
    }

    #[test]
    fn test_predicate_only() {
        let whitelist = Whitelist::new().allow_if(|f| f.starts_with("json:cfg."));
        assert!(whitelist.allows("json:cfg.a"));
        assert!(!whitelist.allows("json:cfgx.a"));
        assert!(!whitelist.allows("a"));
    }

    #[test]
    fn test_set_or_predicate() {
        let whitelist = Whitelist::new()
            .allow_fields(&["json:cfg.b"])
            .allow_if(|f| f.starts_with("json:cfg.a"));
        assert!(whitelist.allows("json:cfg.a"));
        assert!(whitelist.allows("json:cfg.b"));
        assert!(!whitelist.allows("json:cfg.c"));
    }

    #[test]
    fn test_debug_hides_closure() {
        let whitelist = Whitelist::new().allow_if(|_| true);
        let dbg = format!("{whitelist:?}");
        assert!(dbg.contains("Fn(&str) -> bool"));
    }
}
