//! SQL dialect implementations for Postgres and `MySQL`.
//!
//! Each dialect handles the specific syntax differences between databases:
//! placeholder style, JSON field addressing and the pattern-match idioms
//! behind `contains`, `beginsWith` and `endsWith`.

use crate::field::{JsonCast, JsonField};

/// SQL dialect trait for database-specific syntax.
///
/// Every method that emits a placeholder takes `&mut self` so that numbered
/// dialects can advance their counter. Placeholders must be requested in the
/// same order their values appear in the output.
pub trait Dialect {
    /// Short name used in logs (e.g. `postgres`).
    fn name(&self) -> &'static str;

    /// Produce the next parameter placeholder (e.g. `$3` or `?`).
    fn placeholder(&mut self) -> String;

    /// Forget any placeholder state from a previous compilation.
    fn reset(&mut self) {}

    /// Rewrite a JSON field reference into a native extraction expression.
    ///
    /// Returns `None` when the dialect has no JSON addressing, in which case
    /// the identifier is used verbatim.
    fn json_field(&self, _field: &JsonField<'_>) -> Option<String> {
        None
    }

    /// Format a substring test (`contains` / `notContains`).
    fn contains_clause(&mut self, field: &str, negated: bool, is_json: bool) -> String;

    /// Format a prefix test (`beginsWith` / `notBeginsWith`).
    fn starts_with_clause(&mut self, field: &str, negated: bool, is_json: bool) -> String;

    /// Format a suffix test (`endsWith` / `notEndsWith`).
    fn ends_with_clause(&mut self, field: &str, negated: bool, is_json: bool) -> String;

    /// Format an IN clause with one placeholder per value (e.g. `a IN($1,$2)`).
    fn in_clause(&mut self, field: &str, count: usize) -> String {
        let marks: Vec<String> = (0..count).map(|_| self.placeholder()).collect();
        format!("{field} IN({})", marks.join(","))
    }
}

#[inline]
const fn like(negated: bool) -> &'static str {
    if negated { "NOT LIKE" } else { "LIKE" }
}

/// Postgres dialect.
///
/// Placeholders are numbered `$1, $2, ...` across the whole statement. JSON
/// fields are addressed with `->` and cast to their declared type.
#[derive(Debug, Clone, Default)]
pub struct Postgres {
    counter: usize,
}

impl Postgres {
    /// Create a dialect whose next placeholder is `$1`.
    pub const fn new() -> Self {
        Self { counter: 0 }
    }
}

/// Double-quote an identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote a string literal.
fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

impl Dialect for Postgres {
    #[inline]
    fn name(&self) -> &'static str {
        "postgres"
    }

    #[inline]
    fn placeholder(&mut self) -> String {
        self.counter += 1;
        format!("${}", self.counter)
    }

    #[inline]
    fn reset(&mut self) {
        self.counter = 0;
    }

    fn json_field(&self, field: &JsonField<'_>) -> Option<String> {
        let column = match field.table {
            Some(table) => format!("{}.{}", quote_ident(table), quote_ident(field.column)),
            None => quote_ident(field.column),
        };
        let extract = format!("({column}->{})", quote_literal(field.key));

        Some(match field.cast() {
            JsonCast::Date => format!("CAST({extract}::text AS DATE)"),
            JsonCast::To(ty) => format!("{extract}::{ty}"),
        })
    }

    fn contains_clause(&mut self, field: &str, negated: bool, is_json: bool) -> String {
        let op = like(negated);
        let ph = self.placeholder();
        // JSONB text values keep their quotes when cast to text
        if is_json {
            format!("{field} {op} '\"%' || {ph} || '%\"'")
        } else {
            format!("{field} {op} '%' || {ph} || '%'")
        }
    }

    fn starts_with_clause(&mut self, field: &str, negated: bool, is_json: bool) -> String {
        let op = like(negated);
        let ph = self.placeholder();
        if is_json {
            format!("{field} {op} '\"' || {ph} || '%'")
        } else {
            format!("{field} {op} {ph} || '%'")
        }
    }

    fn ends_with_clause(&mut self, field: &str, negated: bool, is_json: bool) -> String {
        let op = like(negated);
        let ph = self.placeholder();
        if is_json {
            format!("{field} {op} '%' || {ph} || '\"'")
        } else {
            format!("{field} {op} '%' || {ph}")
        }
    }
}

/// `MySQL` dialect.
///
/// Every placeholder is `?`, so the dialect is stateless. There is no JSON
/// field addressing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    #[inline]
    fn name(&self) -> &'static str {
        "mysql"
    }

    #[inline]
    fn placeholder(&mut self) -> String {
        "?".to_string()
    }

    fn contains_clause(&mut self, field: &str, negated: bool, _is_json: bool) -> String {
        let cmp = if negated { "= 0" } else { "> 0" };
        format!("INSTR({field}, {}) {cmp}", self.placeholder())
    }

    fn starts_with_clause(&mut self, field: &str, negated: bool, _is_json: bool) -> String {
        format!("{field} {} CONCAT({}, '%')", like(negated), self.placeholder())
    }

    fn ends_with_clause(&mut self, field: &str, negated: bool, _is_json: bool) -> String {
        format!("{field} {} CONCAT('%', {})", like(negated), self.placeholder())
    }
}
