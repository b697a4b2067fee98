#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use ds_columnar::{Column, ColumnError};
use ds_types::Scalar;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("column {name:?} has {column_len} rows but the table has {row_count}")]
    LengthMismatch {
        name: String,
        row_count: usize,
        column_len: usize,
    },
    #[error("column {name:?} is not present in the table")]
    MissingColumn { name: String },
    #[error("column {name:?} appears more than once")]
    DuplicateColumn { name: String },
    #[error(transparent)]
    Column(#[from] ColumnError),
}

/// Named columns of equal length, addressed by row position.
///
/// Tournament exports land here: one table of decklists with win/loss
/// stats, one of final standings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    row_count: usize,
    columns: BTreeMap<String, Column>,
}

impl Table {
    pub fn new(row_count: usize, columns: BTreeMap<String, Column>) -> Result<Self, FrameError> {
        for (name, column) in &columns {
            if column.len() != row_count {
                return Err(FrameError::LengthMismatch {
                    name: name.clone(),
                    row_count,
                    column_len: column.len(),
                });
            }
        }

        Ok(Self { row_count, columns })
    }

    /// Build a table from raw values, inferring each column's dtype.
    ///
    /// The first column fixes the row count.
    pub fn from_columns<N>(columns: Vec<(N, Vec<Scalar>)>) -> Result<Self, FrameError>
    where
        N: Into<String>,
    {
        let mut row_count = None;
        let mut out = BTreeMap::new();

        for (name, values) in columns {
            let name = name.into();
            let expected = *row_count.get_or_insert(values.len());
            if values.len() != expected {
                return Err(FrameError::LengthMismatch {
                    name,
                    row_count: expected,
                    column_len: values.len(),
                });
            }
            if out.contains_key(&name) {
                return Err(FrameError::DuplicateColumn { name });
            }
            out.insert(name, Column::from_values(values)?);
        }

        Self::new(row_count.unwrap_or(0), out)
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    #[must_use]
    pub fn columns(&self) -> &BTreeMap<String, Column> {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn require_column(&self, name: &str) -> Result<&Column, FrameError> {
        self.column(name).ok_or_else(|| FrameError::MissingColumn {
            name: name.to_owned(),
        })
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }
}
