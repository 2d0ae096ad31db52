//! Mapping from declared field types to normalized SQL column definitions.
//!
//! [`map_field`] converts one field's host type plus its declarative options
//! into a column definition string; [`desired_columns`] runs the mapper over
//! a whole field list, flattening embedded structs and skipping many-to-many
//! fields (those become junction tables, not columns).

use std::collections::BTreeMap;

use bedrock_core::{BedrockError, BedrockResult};
use bedrock_db::{FieldDef, FieldKind};

use crate::column::SERIAL_PRIMARY_KEY;

/// Computes the desired column map for a model's field list.
///
/// Embedded struct fields are expanded recursively and merged into the same
/// column set; this is how shared base fields (id, timestamps) are inherited
/// without redeclaration. Many-to-many fields contribute no column here.
///
/// # Errors
///
/// Returns [`BedrockError::UnmappableType`] for a type override the mapper
/// does not recognize, or [`BedrockError::Migration`] for a malformed
/// relation target.
pub fn desired_columns(fields: &[FieldDef]) -> BedrockResult<BTreeMap<String, String>> {
    let mut columns = BTreeMap::new();
    collect(fields, &mut columns)?;
    Ok(columns)
}

fn collect(fields: &[FieldDef], columns: &mut BTreeMap<String, String>) -> BedrockResult<()> {
    for field in fields {
        if let FieldKind::Embedded { fields: inner } = &field.kind {
            collect(inner, columns)?;
            continue;
        }
        if field.options.many_to_many.is_some() {
            continue;
        }
        columns.insert(field.column_name(), map_field(field)?);
    }
    Ok(())
}

/// Maps a single scalar field to its normalized column definition.
///
/// Precedence: `primary_key` wins over everything and emits
/// `SERIAL PRIMARY KEY`; a foreign-key or one-to-one relation emits an
/// integer reference column; otherwise the base type from the host type is
/// followed by `UNIQUE`, `NOT NULL`, and `DEFAULT <value>` in that fixed
/// order.
///
/// # Errors
///
/// Returns [`BedrockError::UnmappableType`] when a type override is not
/// recognized for the field's host type, and [`BedrockError::Migration`]
/// when a relation target is not of the form `table.column`.
pub fn map_field(field: &FieldDef) -> BedrockResult<String> {
    if field.options.primary_key {
        return Ok(SERIAL_PRIMARY_KEY.to_string());
    }

    if let Some(target) = &field.options.foreign_key {
        let (table, column) = parse_relation_target(&field.name, target)?;
        return Ok(format!("INTEGER NOT NULL REFERENCES {table}({column})"));
    }
    if let Some(target) = &field.options.one_to_one {
        let (table, column) = parse_relation_target(&field.name, target)?;
        return Ok(format!(
            "INTEGER UNIQUE NOT NULL REFERENCES {table}({column})"
        ));
    }

    let mut definition = base_type(field)?;
    if field.options.unique {
        definition.push_str(" UNIQUE");
    }
    if !field.options.null {
        definition.push_str(" NOT NULL");
    }
    if let Some(default) = &field.options.default {
        if !default.is_empty() {
            definition.push_str(" DEFAULT ");
            definition.push_str(default);
        }
    }
    Ok(definition)
}

/// The base SQL type of a field, honoring the type override where one is
/// recognized.
fn base_type(field: &FieldDef) -> BedrockResult<String> {
    if let Some(override_name) = &field.options.type_override {
        return mapped_override(field, override_name);
    }

    match &field.kind {
        FieldKind::Bool => Ok("BOOLEAN".to_string()),
        FieldKind::SmallInt => Ok("SMALLINT".to_string()),
        FieldKind::Int => Ok("INTEGER".to_string()),
        FieldKind::BigInt => Ok("BIGINT".to_string()),
        FieldKind::Float => Ok("DOUBLE PRECISION".to_string()),
        FieldKind::Text => Ok(match field.options.max_length {
            Some(n) if n > 0 => format!("VARCHAR({n})"),
            _ => "TEXT".to_string(),
        }),
        FieldKind::Timestamp => Ok("TIMESTAMP WITH TIME ZONE".to_string()),
        FieldKind::Bytes => Ok("BYTEA".to_string()),
        FieldKind::Json => Ok("JSONB".to_string()),
        FieldKind::Array { element } => {
            let inner = base_type(&FieldDef::new(field.name.clone(), (**element).clone()))?;
            Ok(format!("{inner}[]"))
        }
        FieldKind::Embedded { .. } => Err(unmappable(field, "embedded struct")),
    }
}

/// Resolves a type override against the field's host type.
///
/// `numeric` is honored on floating-point fields; the literal SQL keywords
/// (`date`, `time`, `uuid`, `interval`, `tsvector`) are honored on string
/// and timestamp fields. Anything else is an error rather than a silent
/// degradation, so an unsupported type never mis-declares the schema.
fn mapped_override(field: &FieldDef, override_name: &str) -> BedrockResult<String> {
    let lowered = override_name.to_lowercase();
    match (&field.kind, lowered.as_str()) {
        (FieldKind::Float, "numeric") => Ok("NUMERIC".to_string()),
        (
            FieldKind::Text | FieldKind::Timestamp,
            "date" | "time" | "uuid" | "interval" | "tsvector",
        ) => Ok(lowered.to_uppercase()),
        _ => Err(unmappable(field, override_name)),
    }
}

fn parse_relation_target<'a>(
    field_name: &str,
    target: &'a str,
) -> BedrockResult<(&'a str, &'a str)> {
    target.split_once('.').filter(|(t, c)| !t.is_empty() && !c.is_empty()).ok_or_else(|| {
        BedrockError::Migration(format!(
            "Invalid relation target '{target}' on field '{field_name}': expected table.column"
        ))
    })
}

fn unmappable(field: &FieldDef, kind: &str) -> BedrockError {
    BedrockError::UnmappableType {
        field: field.name.clone(),
        kind: kind.to_string(),
    }
}
