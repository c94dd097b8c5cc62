//! Dataset - Column-major table description
//!
//! The viewer deals with data in columnar format since that matches the way
//! most data sources store it. `data[i]` across all columns is the same row.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single cell value as it travels over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// Display form used by text renderers
    pub fn display(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

/// A single named column holding the locally known slice of its data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    pub name: String,

    /// Type label reported by the source (e.g. "int", "string")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,

    #[serde(default)]
    pub data: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, data: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            column_type: None,
            data,
        }
    }

    /// Set the type label
    pub fn with_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    /// Same name and type with no data
    pub fn empty_like(&self) -> Self {
        Self {
            name: self.name.clone(),
            column_type: self.column_type.clone(),
            data: Vec::new(),
        }
    }

    /// Copy of rows `[start, start + len)` of this column
    pub fn slice(&self, start: usize, len: usize) -> Self {
        let end = (start + len).min(self.data.len());
        let start = start.min(end);
        Self {
            name: self.name.clone(),
            column_type: self.column_type.clone(),
            data: self.data[start..end].to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn generate_dataset_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A data set that can be displayed in the data viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataSet {
    #[serde(default = "generate_dataset_id")]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub columns: Vec<Column>,

    /// Total rows at the source; unknown until the source reports it
    #[serde(rename = "rowCount", default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
}

impl DataSet {
    /// Create a dataset with a generated id
    pub fn new(title: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            id: generate_dataset_id(),
            title: title.into(),
            columns,
            row_count: None,
        }
    }

    /// Set the id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the authoritative row count
    pub fn with_row_count(mut self, row_count: usize) -> Self {
        self.row_count = Some(row_count);
        self
    }

    /// Rows present in the columns (all columns must agree)
    pub fn loaded_rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Authoritative row count if known, else the locally loaded count
    pub fn total_rows(&self) -> usize {
        self.row_count.unwrap_or_else(|| self.loaded_rows())
    }

    /// Check that every column has the same length
    pub fn validate(&self) -> Result<()> {
        let expected = self.loaded_rows();
        for column in &self.columns {
            if column.len() != expected {
                return Err(Error::SchemaMismatch {
                    expected: format!("{expected} rows in column '{}'", column.name),
                    actual: format!("{} rows", column.len()),
                });
            }
        }
        Ok(())
    }
}
