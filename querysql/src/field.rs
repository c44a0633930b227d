//! Field reference resolution.
//!
//! A field identifier may address a key inside a JSON column:
//!
//! ```text
//! [<table>.]json:<column>.<key>[:<type>]
//! ```
//!
//! The identifier is split on `.` into at most three parts. Two parts with the
//! first starting with `json:` carry no table; three parts with the second
//! starting with `json:` are qualified by the first. Anything else is an
//! ordinary column name and passes through untouched.

use tracing::trace;

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::validate::is_valid_sql_identifier;

/// Marker prefix of a JSON column reference.
pub const JSON_MARKER: &str = "json:";

/// Cast target of a JSON value when no type is declared.
pub const DEFAULT_JSON_TYPE: &str = "text";

/// A parsed `[table.]json:column.key[:type]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonField<'a> {
    /// Optional table qualifier.
    pub table: Option<&'a str>,
    /// JSON column holding the document.
    pub column: &'a str,
    /// Top-level key inside the document.
    pub key: &'a str,
    /// Declared type, as written.
    pub ty: Option<&'a str>,
}

/// How an extracted JSON value is cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonCast<'a> {
    /// Cast to text and then to `DATE`.
    Date,
    /// Cast straight to the named type.
    To(&'a str),
}

impl<'a> JsonField<'a> {
    /// Parse a field identifier. Returns `None` when it is not a JSON reference.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let mut parts = raw.splitn(3, '.');
        let first = parts.next()?;
        let second = parts.next()?;

        let (table, column, rest) = match parts.next() {
            None => (None, first.strip_prefix(JSON_MARKER)?, second),
            Some(third) => (Some(first), second.strip_prefix(JSON_MARKER)?, third),
        };

        let (key, ty) = match rest.split_once(':') {
            Some((key, ty)) => (key, Some(ty)),
            None => (rest, None),
        };

        if column.is_empty() || key.is_empty() {
            return None;
        }

        Some(Self {
            table,
            column,
            key,
            ty,
        })
    }

    /// The cast applied to the extracted value.
    ///
    /// An omitted type means text and `number` is an alias for `numeric`.
    pub fn cast(&self) -> JsonCast<'a> {
        match self.ty {
            None => JsonCast::To(DEFAULT_JSON_TYPE),
            Some("date") => JsonCast::Date,
            Some("number") => JsonCast::To("numeric"),
            Some(ty) => JsonCast::To(ty),
        }
    }
}

/// A field after dialect resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    /// SQL expression for the field.
    pub name: String,
    /// Whether the expression extracts a value from a JSON column.
    pub is_json: bool,
}

impl ResolvedField {
    fn plain(raw: &str) -> Self {
        Self {
            name: raw.to_string(),
            is_json: false,
        }
    }
}

/// Resolve a raw field identifier into the dialect's SQL expression.
///
/// Dialects without JSON support receive the identifier unchanged with
/// `is_json == false`. When the dialect does rewrite the reference, a
/// declared type that is not a plain identifier is rejected since it ends up
/// as a cast target.
pub fn resolve_field<D: Dialect + ?Sized>(dialect: &D, raw: &str) -> Result<ResolvedField> {
    let Some(json) = JsonField::parse(raw) else {
        return Ok(ResolvedField::plain(raw));
    };

    let Some(name) = dialect.json_field(&json) else {
        return Ok(ResolvedField::plain(raw));
    };

    // Only a rewrite splices the type into a cast
    if let Some(ty) = json.ty
        && !is_valid_sql_identifier(ty)
    {
        return Err(Error::InvalidJsonType {
            field: raw.to_string(),
            ty: ty.to_string(),
        });
    }

    trace!(field = raw, expr = %name, "resolved JSON field");
    Ok(ResolvedField {
        name,
        is_json: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Postgres};

    #[test]
    fn test_parse_without_table() {
        let f = JsonField::parse("json:cfg.a").unwrap();
        assert_eq!(f.table, None);
        assert_eq!(f.column, "cfg");
        assert_eq!(f.key, "a");
        assert_eq!(f.ty, None);
        assert_eq!(f.cast(), JsonCast::To("text"));
    }

    #[test]
    fn test_parse_with_table_and_type() {
        let f = JsonField::parse("mytable.json:cfg.b:numeric").unwrap();
        assert_eq!(f.table, Some("mytable"));
        assert_eq!(f.column, "cfg");
        assert_eq!(f.key, "b");
        assert_eq!(f.ty, Some("numeric"));
    }

    #[test]
    fn test_parse_casts() {
        assert_eq!(JsonField::parse("json:cfg.c:date").unwrap().cast(), JsonCast::Date);
        assert_eq!(
            JsonField::parse("json:cfg.c:number").unwrap().cast(),
            JsonCast::To("numeric")
        );
        assert_eq!(
            JsonField::parse("json:cfg.c:boolean").unwrap().cast(),
            JsonCast::To("boolean")
        );
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        for raw in [
            "a",
            "t.a",
            "json:cfg",
            "cfg.json:a",
            "json:cfg.a.b",
            "t.cfg.json:a",
            "a.b.c",
            "json:.a",
            "json:cfg.",
            "",
        ] {
            assert_eq!(JsonField::parse(raw), None, "{raw}");
        }
    }

    #[test]
    fn test_parse_keeps_dots_in_qualified_key() {
        let f = JsonField::parse("t.json:cfg.a.b").unwrap();
        assert_eq!(f.table, Some("t"));
        assert_eq!(f.key, "a.b");
    }

    #[test]
    fn test_resolve_plain_field() {
        let resolved = resolve_field(&Postgres::new(), "name").unwrap();
        assert_eq!(resolved.name, "name");
        assert!(!resolved.is_json);
    }

    #[test]
    fn test_resolve_json_postgres() {
        let resolved = resolve_field(&Postgres::new(), "json:cfg.a").unwrap();
        assert_eq!(resolved.name, r#"("cfg"->'a')::text"#);
        assert!(resolved.is_json);
    }

    #[test]
    fn test_resolve_json_mysql_passes_through() {
        let resolved = resolve_field(&MySql, "json:cfg.a").unwrap();
        assert_eq!(resolved.name, "json:cfg.a");
        assert!(!resolved.is_json);
    }

    #[test]
    fn test_resolve_rejects_unsafe_type() {
        let err = resolve_field(&Postgres::new(), "json:cfg.a:text; DROP TABLE x").unwrap_err();
        assert!(matches!(err, Error::InvalidJsonType { ref ty, .. } if ty == "text; DROP TABLE x"));
    }

    #[test]
    fn test_type_not_checked_without_rewrite() {
        let resolved = resolve_field(&MySql, "json:cfg.a:double precision").unwrap();
        assert_eq!(resolved.name, "json:cfg.a:double precision");
        assert!(!resolved.is_json);

        let err = resolve_field(&Postgres::new(), "json:cfg.a:double precision").unwrap_err();
        assert!(matches!(err, Error::InvalidJsonType { .. }));
    }
}
