#![forbid(unsafe_code)]

//! Statistics over competitive card-game tournament results.
//!
//! - [`profile_columns`] turns a sparse deck x card count matrix into one
//!   value distribution per card column, zeros included, without densifying.
//! - [`fuzzy_join`] joins a decklist table to a standings table on player
//!   name, pairing repeated names by closest rank.
//!
//! The two halves are independent; this crate re-exports both.

pub use ds_columnar::{Column, ColumnError};
pub use ds_frame::{FrameError, Table};
pub use ds_join::{
    DistanceMatrix, JoinError, JoinOptions, JoinResult, JoinSide, JoinSummary, JoinedRecord,
    LARGE_GROUP_CELLS, MatchPhase, PayloadPolicy, fuzzy_join, fuzzy_join_table,
};
pub use ds_sparse::{
    Board, Bucket, CardProfile, CardVocabulary, CellValue, ColumnProfile, ColumnSource,
    DenseMatrix, ProfileError, ProfileOptions, SIDEBOARD_SUFFIX, decks_with_card, profile_card,
    profile_columns,
};
pub use ds_types::{DType, NullKind, Scalar, TypeError};

/// Sparse matrix type the dashboard loads card vectors into.
pub type DeckMatrix = sprs::CsMat<u32>;
