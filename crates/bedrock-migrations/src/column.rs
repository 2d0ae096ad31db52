//! Normalized column definitions and their semantic comparison.
//!
//! A column definition is a normalized string: base SQL type token, optional
//! `UNIQUE`, optional `NOT NULL`, optional `DEFAULT <value>`, optional
//! `REFERENCES <table>(<column>)`. A primary-key field collapses to the
//! single fixed token [`SERIAL_PRIMARY_KEY`]. The change detector never
//! compares raw strings directly; it goes through [`is_equal`], which knows
//! the engine-specific surface forms a live schema reports.

/// The fixed definition of a serial primary-key column.
pub const SERIAL_PRIMARY_KEY: &str = "SERIAL PRIMARY KEY";

/// How an introspected serial primary key reads back from the live schema.
/// The `SERIAL` keyword is syntactic sugar for an integer with a sequence
/// default; it never survives introspection.
pub const INTROSPECTED_SERIAL: &str = "INTEGER UNIQUE NOT NULL";

/// Compares two column definitions for semantic equality.
///
/// Definitions are equal if:
/// - their textual forms match exactly, or
/// - one is `SERIAL PRIMARY KEY` and the other is `INTEGER UNIQUE NOT NULL`,
///   or
/// - their non-DEFAULT tokens match and their DEFAULT values match after
///   stripping type casts and quoting.
pub fn is_equal(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    if (a == SERIAL_PRIMARY_KEY && b == INTROSPECTED_SERIAL)
        || (b == SERIAL_PRIMARY_KEY && a == INTROSPECTED_SERIAL)
    {
        return true;
    }
    defaults_match(a, b)
}

/// A column definition split into the pieces an ALTER COLUMN needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnParts {
    /// The base SQL type token (e.g. `VARCHAR(254)`, `TIMESTAMP WITH TIME
    /// ZONE`).
    pub base_type: String,
    /// Whether the definition carries `UNIQUE`.
    pub unique: bool,
    /// Whether the definition carries `NOT NULL`.
    pub not_null: bool,
}

/// Decomposes a column definition into base type and constraint flags.
///
/// The base type is everything before the first constraint keyword, so
/// multi-word types (`DOUBLE PRECISION`, `TIMESTAMP WITH TIME ZONE`) survive
/// intact.
pub fn decompose(definition: &str) -> ColumnParts {
    let markers = [" UNIQUE", " NOT NULL", " DEFAULT ", " REFERENCES "];
    let cut = markers
        .iter()
        .filter_map(|m| definition.find(m))
        .min()
        .unwrap_or(definition.len());

    ColumnParts {
        base_type: definition[..cut].trim().to_string(),
        unique: definition.contains(" UNIQUE"),
        not_null: definition.contains("NOT NULL"),
    }
}

/// Splits a definition at its ` DEFAULT ` clause.
///
/// The default value runs to the end of the definition unless a
/// ` REFERENCES ` clause follows it.
fn split_default(definition: &str) -> (String, Option<String>) {
    let Some(pos) = definition.find(" DEFAULT ") else {
        return (definition.to_string(), None);
    };
    let head = &definition[..pos];
    let rest = &definition[pos + " DEFAULT ".len()..];
    if let Some(refs) = rest.find(" REFERENCES ") {
        let value = rest[..refs].trim().to_string();
        let tail = &rest[refs..];
        (format!("{head}{tail}"), Some(value))
    } else {
        (head.to_string(), Some(rest.trim().to_string()))
    }
}

/// Normalizes a DEFAULT value for comparison: strips a trailing `::type`
/// cast and surrounding single quotes. A live schema reports
/// `'draft'::character varying` where the declared default is `'draft'`.
fn normalize_default(value: &str) -> String {
    let mut v = value.trim();
    if let Some(pos) = v.find("::") {
        v = v[..pos].trim_end();
    }
    v.trim_matches('\'').to_string()
}

fn defaults_match(a: &str, b: &str) -> bool {
    let (head_a, default_a) = split_default(a);
    let (head_b, default_b) = split_default(b);
    match (default_a, default_b) {
        (Some(da), Some(db)) => head_a == head_b && normalize_default(&da) == normalize_default(&db),
        _ => false,
    }
}
