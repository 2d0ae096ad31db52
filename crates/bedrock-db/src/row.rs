//! The generic result row and typed extraction.
//!
//! Backends return [`Row`]s: an ordered list of column names paired with
//! [`Value`]s. The [`FromValue`] trait converts a `Value` into a concrete
//! Rust type when reading a column.

use crate::value::Value;
use bedrock_core::BedrockError;

/// A single result row from a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row from parallel column-name and value vectors.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// The column names of this row, in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The values of this row, in result order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Extracts the value of the named column, converted to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`BedrockError::Database`] if the column does not exist or
    /// the value cannot be converted to `T`.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T, BedrockError> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| BedrockError::Database(format!("No such column: {column}")))?;
        T::from_value(&self.values[idx])
    }

    /// Extracts the value at the given index, converted to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`BedrockError::Database`] if the index is out of range or
    /// the value cannot be converted to `T`.
    pub fn get_by_index<T: FromValue>(&self, index: usize) -> Result<T, BedrockError> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| BedrockError::Database(format!("Column index {index} out of range")))?;
        T::from_value(value)
    }
}

/// Conversion from a [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    /// Converts a `Value` into `Self`.
    ///
    /// # Errors
    ///
    /// Returns [`BedrockError::Database`] if the value has the wrong variant.
    fn from_value(value: &Value) -> Result<Self, BedrockError>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, BedrockError> {
        Ok(value.clone())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, BedrockError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(BedrockError::Database(format!(
                "Cannot convert {other:?} to String"
            ))),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, BedrockError> {
        match value {
            Value::Int(i) => Ok(*i),
            other => Err(BedrockError::Database(format!(
                "Cannot convert {other:?} to i64"
            ))),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, BedrockError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as Self),
            other => Err(BedrockError::Database(format!(
                "Cannot convert {other:?} to f64"
            ))),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, BedrockError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(BedrockError::Database(format!(
                "Cannot convert {other:?} to bool"
            ))),
        }
    }
}

impl FromValue for chrono::DateTime<chrono::Utc> {
    fn from_value(value: &Value) -> Result<Self, BedrockError> {
        match value {
            Value::DateTimeTz(dt) => Ok(*dt),
            Value::DateTime(dt) => Ok(dt.and_utc()),
            other => Err(BedrockError::Database(format!(
                "Cannot convert {other:?} to DateTime<Utc>"
            ))),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, BedrockError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
