//! Shared data model for parsed tables.
//!
//! Parsed payloads are untyped: every cell is either SQL NULL or text.
//! Column typing lives only in the declared schema ([`ColumnInfo`]), never
//! in the records themselves; SQLite applies numeric affinity at insert.

use std::fmt;

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One parsed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Null,
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Cell::Null => "",
            Cell::Text(s) => s,
        }
    }

    /// NULL and the empty string are both excluded from type inference.
    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Cell::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// An ordered row of cells, aligned to its table's header.
pub type Record = Vec<Cell>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Datetime,
}

impl ColumnType {
    /// Declared SQL type. Datetime values are stored as ISO-8601 text.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Datetime => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Datetime => "DATETIME",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A bounded, header-aligned batch of records. Every record has exactly
/// `header.len()` cells and `columns.len() == header.len()`.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub table_name: String,
    pub header: Vec<String>,
    pub records: Vec<Record>,
    pub columns: Vec<ColumnInfo>,
}

/// A fully materialised table, used by the whole-input parse path.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub header: Vec<String>,
    pub records: Vec<Record>,
    pub columns: Vec<ColumnInfo>,
}

/// Trim header names and reject empty or duplicate (case-sensitive) names.
pub fn validate_header(table: &str, raw: Vec<String>) -> Result<Vec<String>> {
    let header: Vec<String> = raw.into_iter().map(|h| h.trim().to_string()).collect();
    for (i, name) in header.iter().enumerate() {
        if name.is_empty() {
            return Err(Error::parse(table, format!("empty column name at index {i}")));
        }
        if header[..i].contains(name) {
            return Err(Error::DuplicateColumn {
                table: table.to_string(),
                column: name.clone(),
            });
        }
    }
    Ok(header)
}
