#![forbid(unsafe_code)]

use ds_types::{DType, Scalar, TypeError, cast_scalar, infer_dtype};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    dtype: DType,
    values: Vec<Scalar>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColumnError {
    #[error("row position {position} is out of bounds for column of length {len}")]
    PositionOutOfBounds { position: usize, len: usize },
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl Column {
    /// Construct a column, coercing every value to `dtype`.
    pub fn new(dtype: DType, values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let values = values
            .into_iter()
            .map(|value| cast_scalar(value, dtype))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { dtype, values })
    }

    pub fn from_values(values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let dtype = infer_dtype(&values)?;
        Self::new(dtype, values)
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    /// Gather rows by position; `None` slots become the dtype's missing marker.
    pub fn reindex_by_positions(&self, positions: &[Option<usize>]) -> Result<Self, ColumnError> {
        let values = positions
            .iter()
            .map(|slot| match slot {
                Some(idx) => self.values.get(*idx).cloned().ok_or(
                    ColumnError::PositionOutOfBounds {
                        position: *idx,
                        len: self.values.len(),
                    },
                ),
                None => Ok(Scalar::missing_for_dtype(self.dtype)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dtype: self.dtype,
            values,
        })
    }
}
