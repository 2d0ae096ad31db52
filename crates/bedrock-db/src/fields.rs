//! Declarative field metadata for models.
//!
//! This module defines the field description system the migration engine
//! consumes: [`FieldKind`] names the host type of a field, [`FieldOptions`]
//! carries the parsed declarative options, and [`FieldDef`] ties the two
//! together with the field's name and optional explicit column name.

/// The host type of a declared field.
///
/// Each variant corresponds to a Rust type a model field can carry. The type
/// mapper turns a `FieldKind` (plus options) into a SQL column definition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum FieldKind {
    /// A boolean field.
    Bool,
    /// A 16-bit signed integer.
    SmallInt,
    /// A 32-bit signed integer.
    Int,
    /// A 64-bit signed integer.
    BigInt,
    /// A floating-point number.
    Float,
    /// A string field.
    Text,
    /// A timestamp field.
    Timestamp,
    /// Raw binary data.
    Bytes,
    /// A structured / map value stored as JSON.
    Json,
    /// A homogeneous array of another field kind.
    Array {
        /// The element kind of the array.
        element: Box<FieldKind>,
    },
    /// An embedded struct whose fields are flattened into the parent model's
    /// column set. This is how shared base fields (id, created/updated
    /// timestamps) are inherited by every model without redeclaration.
    Embedded {
        /// The fields of the embedded struct.
        fields: Vec<FieldDef>,
    },
}

/// A many-to-many relation declared on a field.
///
/// The relation is realized as a junction table with two integer foreign-key
/// columns. The column names default to `from_id`/`to_id` and can be
/// overridden per field.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ManyToMany {
    /// The junction ("through") table name.
    pub through: String,
    /// The column pointing at the declaring model. Defaults to `from_id`.
    pub from_column: Option<String>,
    /// The column pointing at the related model. Defaults to `to_id`.
    pub to_column: Option<String>,
}

impl ManyToMany {
    /// Creates a relation through the named junction table with default
    /// column names.
    pub fn through(table: impl Into<String>) -> Self {
        Self {
            through: table.into(),
            from_column: None,
            to_column: None,
        }
    }

    /// Overrides the "from" column name.
    #[must_use]
    pub fn from_column(mut self, column: impl Into<String>) -> Self {
        self.from_column = Some(column.into());
        self
    }

    /// Overrides the "to" column name.
    #[must_use]
    pub fn to_column(mut self, column: impl Into<String>) -> Self {
        self.to_column = Some(column.into());
        self
    }
}

/// Parsed declarative options of a field.
///
/// At most one of `foreign_key`, `one_to_one`, `many_to_many` may be set per
/// field; the type mapper rejects nothing here, it simply gives `primary_key`
/// precedence, then the relational options, then the plain constraints.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct FieldOptions {
    /// Whether this field is the primary key.
    pub primary_key: bool,
    /// Whether a UNIQUE constraint is applied.
    pub unique: bool,
    /// Whether NULL is allowed in the database.
    pub null: bool,
    /// Whether the field may be left blank in forms. Carried through for the
    /// surrounding application; the column definition ignores it.
    pub blank: bool,
    /// Whether a database index should be created.
    pub index: bool,
    /// Default value rendered verbatim into `DEFAULT <value>`.
    pub default: Option<String>,
    /// Maximum character length; turns a text field into `VARCHAR(n)`.
    pub max_length: Option<usize>,
    /// Explicit SQL type override (e.g. "date", "uuid", "numeric").
    pub type_override: Option<String>,
    /// A many-to-one relation target as `"table.column"`.
    pub foreign_key: Option<String>,
    /// A one-to-one relation target as `"table.column"`.
    pub one_to_one: Option<String>,
    /// A many-to-many relation via a junction table.
    pub many_to_many: Option<ManyToMany>,
}

/// Complete definition of a model field.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldDef {
    /// The Rust field name.
    pub name: String,
    /// Explicit database column name; when absent the snake_cased field name
    /// is used.
    pub column: Option<String>,
    /// The host type of the field.
    pub kind: FieldKind,
    /// The parsed declarative options.
    pub options: FieldOptions,
}

impl FieldDef {
    /// Creates a new `FieldDef` with default options.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            column: None,
            kind,
            options: FieldOptions::default(),
        }
    }

    /// Sets an explicit database column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Marks this field as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.options.primary_key = true;
        self
    }

    /// Marks this field as having a UNIQUE constraint.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.options.unique = true;
        self
    }

    /// Allows NULL values in the database.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.options.null = true;
        self
    }

    /// Allows the field to be left blank in forms.
    #[must_use]
    pub fn blank(mut self) -> Self {
        self.options.blank = true;
        self
    }

    /// Marks this field as having a database index.
    #[must_use]
    pub fn index(mut self) -> Self {
        self.options.index = true;
        self
    }

    /// Sets the default value, rendered verbatim into the column definition.
    #[must_use]
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.options.default = Some(value.into());
        self
    }

    /// Sets the maximum character length.
    #[must_use]
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.options.max_length = Some(max_length);
        self
    }

    /// Sets an explicit SQL type override.
    #[must_use]
    pub fn type_override(mut self, sql_type: impl Into<String>) -> Self {
        self.options.type_override = Some(sql_type.into());
        self
    }

    /// Declares a many-to-one relation to `"table.column"`.
    #[must_use]
    pub fn foreign_key(mut self, target: impl Into<String>) -> Self {
        self.options.foreign_key = Some(target.into());
        self
    }

    /// Declares a one-to-one relation to `"table.column"`.
    #[must_use]
    pub fn one_to_one(mut self, target: impl Into<String>) -> Self {
        self.options.one_to_one = Some(target.into());
        self
    }

    /// Declares a many-to-many relation.
    #[must_use]
    pub fn many_to_many(mut self, relation: ManyToMany) -> Self {
        self.options.many_to_many = Some(relation);
        self
    }

    /// Resolves the database column name: an explicit name wins, otherwise
    /// the field name converted to snake_case.
    pub fn column_name(&self) -> String {
        self.column
            .clone()
            .unwrap_or_else(|| to_snake_case(&self.name))
    }

    /// Returns `true` if this field declares any relation.
    pub fn is_relation(&self) -> bool {
        self.options.foreign_key.is_some()
            || self.options.one_to_one.is_some()
            || self.options.many_to_many.is_some()
    }
}

/// Converts an identifier to snake_case.
///
/// `CreatedAt` becomes `created_at`, `userID` becomes `user_id`. Identifiers
/// already in snake_case pass through unchanged.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if i > 0 && (prev_lower || (chars[i - 1].is_uppercase() && next_lower)) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
