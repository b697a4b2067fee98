#![forbid(unsafe_code)]

//! Value distributions over sparse deck x card count matrices.
//!
//! Rows are tournament entries, columns are tracked cards. Profiles never
//! densify the matrix: only stored entries are visited and the zero bucket
//! is derived from each column's stored-entry count.

mod profile;
mod source;
mod vocabulary;

use thiserror::Error;

pub use profile::{Bucket, ColumnProfile, ProfileOptions, profile_columns};
pub use source::{CellValue, ColumnSource, DenseMatrix};
pub use vocabulary::{
    Board, CardProfile, CardVocabulary, SIDEBOARD_SUFFIX, decks_with_card, profile_card,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("invalid shape {rows}x{cols}: frequencies are undefined for a matrix with no rows")]
    InvalidShape { rows: usize, cols: usize },
    #[error("column {column} stores {stored} entries but the matrix only has {rows} rows")]
    OverfullColumn {
        column: usize,
        stored: usize,
        rows: usize,
    },
    #[error("entry ({row}, {col}) lies outside a {rows}x{cols} matrix")]
    EntryOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("dense matrix of shape {rows}x{cols} does not hold {len} values")]
    DenseLength { rows: usize, cols: usize, len: usize },
    #[error("dense row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("card {card:?} is not in the vocabulary")]
    UnknownCard { card: String },
}
