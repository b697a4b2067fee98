#![forbid(unsafe_code)]

//! Join two tournament tables on player name when names repeat.
//!
//! Names unique in both tables are matched by plain equality. Names that
//! repeat in either table are matched greedily by closest rank. This join is
//! lossy: rows without a counterpart, and surplus rows of a repeated name
//! beyond `min(left count, right count)`, are dropped. They are reported by
//! [`JoinResult::unmatched_left`] / [`JoinResult::unmatched_right`] and never
//! emitted as rows. Callers needing outer-join semantics must add those rows
//! back themselves.
//!
//! The rank-distance phase allocates `|left group| x |right group|` cells per
//! repeated name, so a single name with very many entries is quadratic.

mod distance;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use ds_columnar::{Column, ColumnError};
use ds_frame::{FrameError, Table};
use ds_types::Scalar;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use distance::DistanceMatrix;

/// Groups above this many distance cells are reported as a scaling hazard.
pub const LARGE_GROUP_CELLS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinSide {
    Left,
    Right,
}

impl fmt::Display for JoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Name unique in both tables.
    Exact,
    /// Name repeated in at least one table; paired by closest rank.
    RankDistance,
}

/// Which columns a rank-distance match carries when materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadPolicy {
    /// Every column of both rows, whichever phase matched them.
    #[default]
    AllColumns,
    /// Rank-distance rows carry only the name and both ranks; every other
    /// cell is missing. Exact rows still carry all columns.
    KeysOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOptions {
    pub name_column: String,
    pub rank_column: String,
    /// Appended to a right-hand column whose name the left table already uses.
    pub right_suffix: String,
    pub payload: PayloadPolicy,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            name_column: "Player".to_owned(),
            rank_column: "Rank".to_owned(),
            right_suffix: "_standings".to_owned(),
            payload: PayloadPolicy::AllColumns,
        }
    }
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("{side} table has no {column:?} column")]
    MissingKey { side: JoinSide, column: String },
    #[error("{side} row {row}: name {value} is not text")]
    InvalidName {
        side: JoinSide,
        row: usize,
        value: String,
    },
    #[error("{side} row {row}: rank {value} is not a finite number")]
    InvalidRank {
        side: JoinSide,
        row: usize,
        value: String,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Column(#[from] ColumnError),
}

/// One left row paired with one right row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedRecord {
    pub name: String,
    pub left_row: usize,
    pub right_row: usize,
    /// `None` when the cell is missing or not a finite number. Only
    /// rank-distance matches require a rank.
    pub left_rank: Option<f64>,
    pub right_rank: Option<f64>,
    pub phase: MatchPhase,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSummary {
    pub exact: usize,
    pub rank_distance: usize,
    pub ambiguous_names: usize,
    pub dropped_left: usize,
    pub dropped_right: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinResult {
    records: Vec<JoinedRecord>,
    ambiguous_names: Vec<String>,
    unmatched_left: Vec<usize>,
    unmatched_right: Vec<usize>,
}

impl JoinResult {
    /// Exact matches in left row order, then rank-distance matches grouped by
    /// name in pick order.
    #[must_use]
    pub fn records(&self) -> &[JoinedRecord] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<JoinedRecord> {
        self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Names repeated in either table, left first-appearance order first.
    #[must_use]
    pub fn ambiguous_names(&self) -> &[String] {
        &self.ambiguous_names
    }

    #[must_use]
    pub fn unmatched_left(&self) -> &[usize] {
        &self.unmatched_left
    }

    #[must_use]
    pub fn unmatched_right(&self) -> &[usize] {
        &self.unmatched_right
    }

    #[must_use]
    pub fn summary(&self) -> JoinSummary {
        let exact = self
            .records
            .iter()
            .filter(|record| record.phase == MatchPhase::Exact)
            .count();
        JoinSummary {
            exact,
            rank_distance: self.records.len() - exact,
            ambiguous_names: self.ambiguous_names.len(),
            dropped_left: self.unmatched_left.len(),
            dropped_right: self.unmatched_right.len(),
        }
    }

    /// Materialize the joined rows.
    ///
    /// `left` and `right` must be the tables the result was computed from.
    /// Output columns: the name column, the left rank under its own name, the
    /// right rank under the suffixed name, then every payload column. A right
    /// payload column whose name the left already uses gets `right_suffix`.
    pub fn to_table(
        &self,
        left: &Table,
        right: &Table,
        options: &JoinOptions,
    ) -> Result<Table, JoinError> {
        let left_keys = self
            .records
            .iter()
            .map(|record| Some(record.left_row))
            .collect::<Vec<_>>();
        let right_keys = self
            .records
            .iter()
            .map(|record| Some(record.right_row))
            .collect::<Vec<_>>();

        let carries_payload = |record: &JoinedRecord| {
            record.phase == MatchPhase::Exact || options.payload == PayloadPolicy::AllColumns
        };
        let left_payload = self
            .records
            .iter()
            .map(|record| carries_payload(record).then_some(record.left_row))
            .collect::<Vec<_>>();
        let right_payload = self
            .records
            .iter()
            .map(|record| carries_payload(record).then_some(record.right_row))
            .collect::<Vec<_>>();

        let name_col = options.name_column.as_str();
        let rank_col = options.rank_column.as_str();
        let suffixed = |name: &str| format!("{name}{}", options.right_suffix);

        let mut columns = BTreeMap::<String, Column>::new();
        let mut insert = |name: String, column: Column| {
            if columns.contains_key(&name) {
                return Err(JoinError::Frame(FrameError::DuplicateColumn { name }));
            }
            columns.insert(name, column);
            Ok(())
        };

        let left_name = key_column(left, JoinSide::Left, name_col)?;
        let left_rank = key_column(left, JoinSide::Left, rank_col)?;
        let right_rank = key_column(right, JoinSide::Right, rank_col)?;

        insert(name_col.to_owned(), left_name.reindex_by_positions(&left_keys)?)?;
        insert(rank_col.to_owned(), left_rank.reindex_by_positions(&left_keys)?)?;
        insert(suffixed(rank_col), right_rank.reindex_by_positions(&right_keys)?)?;

        for (name, column) in left.columns() {
            if name == name_col || name == rank_col {
                continue;
            }
            insert(name.clone(), column.reindex_by_positions(&left_payload)?)?;
        }
        for (name, column) in right.columns() {
            if name == name_col || name == rank_col {
                continue;
            }
            let out_name = if left.has_column(name) {
                suffixed(name)
            } else {
                name.clone()
            };
            insert(out_name, column.reindex_by_positions(&right_payload)?)?;
        }

        Ok(Table::new(self.records.len(), columns)?)
    }
}

fn key_column<'a>(table: &'a Table, side: JoinSide, name: &str) -> Result<&'a Column, JoinError> {
    table.require_column(name).map_err(|err| match err {
        FrameError::MissingColumn { name } => JoinError::MissingKey { side, column: name },
        other => JoinError::Frame(other),
    })
}

/// Names and ranks of one table, by row.
struct KeyColumns<'a> {
    side: JoinSide,
    names: Vec<Option<&'a str>>,
    rank_cells: &'a [Scalar],
    ranks: Vec<Option<f64>>,
}

impl<'a> KeyColumns<'a> {
    fn extract(table: &'a Table, side: JoinSide, options: &JoinOptions) -> Result<Self, JoinError> {
        let names = key_column(table, side, &options.name_column)?;
        let rank_cells = key_column(table, side, &options.rank_column)?.values();

        let names = names
            .values()
            .iter()
            .enumerate()
            .map(|(row, value)| match value {
                Scalar::Utf8(name) => Ok(Some(name.as_str())),
                value if value.is_missing() => Ok(None),
                other => Err(JoinError::InvalidName {
                    side,
                    row,
                    value: other.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ranks = rank_cells
            .iter()
            .map(|value| value.to_f64().ok().filter(|rank| rank.is_finite()))
            .collect();

        Ok(Self {
            side,
            names,
            rank_cells,
            ranks,
        })
    }

    /// Rank of a row the rank-distance phase needs; anything but a finite
    /// number is an error there.
    fn required_rank(&self, row: usize) -> Result<f64, JoinError> {
        self.ranks[row].ok_or_else(|| JoinError::InvalidRank {
            side: self.side,
            row,
            value: self.rank_cells[row].to_string(),
        })
    }
}

/// Row positions per name, with names in first-seen order.
struct NameGroups<'a> {
    order: Vec<&'a str>,
    rows: HashMap<&'a str, Vec<usize>>,
}

impl<'a> NameGroups<'a> {
    fn build(names: &[Option<&'a str>]) -> Self {
        let mut order = Vec::new();
        let mut rows = HashMap::<&str, Vec<usize>>::new();
        for (row, name) in names.iter().enumerate() {
            let Some(name) = *name else {
                continue;
            };
            rows.entry(name)
                .or_insert_with(|| {
                    order.push(name);
                    Vec::new()
                })
                .push(row);
        }
        Self { order, rows }
    }

    fn count(&self, name: &str) -> usize {
        self.rows.get(name).map_or(0, Vec::len)
    }
}

/// Join `left` and `right` on the name column, pairing repeated names by
/// closest rank.
///
/// Names must be text or missing (missing names never match); this is checked
/// before any matching. Ranks are only read for repeated names present on
/// both sides, and there they must be finite numbers.
///
/// Tie-break: among equal rank differences the pair with the lowest left
/// position within the name group wins, then the lowest right position.
pub fn fuzzy_join(
    left: &Table,
    right: &Table,
    options: &JoinOptions,
) -> Result<JoinResult, JoinError> {
    let left_keys = KeyColumns::extract(left, JoinSide::Left, options)?;
    let right_keys = KeyColumns::extract(right, JoinSide::Right, options)?;

    let left_groups = NameGroups::build(&left_keys.names);
    let right_groups = NameGroups::build(&right_keys.names);

    let mut ambiguous = Vec::<&str>::new();
    let mut ambiguous_set = HashSet::<&str>::new();
    for &name in left_groups.order.iter().chain(&right_groups.order) {
        if (left_groups.count(name) > 1 || right_groups.count(name) > 1)
            && ambiguous_set.insert(name)
        {
            ambiguous.push(name);
        }
    }

    let mut records = Vec::new();
    let mut left_matched = vec![false; left_keys.names.len()];
    let mut right_matched = vec![false; right_keys.names.len()];

    for (left_row, name) in left_keys.names.iter().enumerate() {
        let Some(name) = *name else {
            continue;
        };
        if ambiguous_set.contains(name) {
            continue;
        }
        let Some(&[right_row]) = right_groups.rows.get(name).map(Vec::as_slice) else {
            continue;
        };

        left_matched[left_row] = true;
        right_matched[right_row] = true;
        records.push(JoinedRecord {
            name: name.to_owned(),
            left_row,
            right_row,
            left_rank: left_keys.ranks[left_row],
            right_rank: right_keys.ranks[right_row],
            phase: MatchPhase::Exact,
        });
    }

    for &name in &ambiguous {
        let (Some(left_rows), Some(right_rows)) =
            (left_groups.rows.get(name), right_groups.rows.get(name))
        else {
            continue;
        };

        #[cfg(feature = "tracing")]
        {
            let cells = left_rows.len() * right_rows.len();
            if cells > LARGE_GROUP_CELLS {
                tracing::warn!(
                    name,
                    left = left_rows.len(),
                    right = right_rows.len(),
                    cells,
                    "large repeated-name group in rank-distance join"
                );
            }
        }

        let left_ranks = left_rows
            .iter()
            .map(|&row| left_keys.required_rank(row))
            .collect::<Result<Vec<_>, _>>()?;
        let right_ranks = right_rows
            .iter()
            .map(|&row| right_keys.required_rank(row))
            .collect::<Result<Vec<_>, _>>()?;

        for (i, j) in DistanceMatrix::from_ranks(&left_ranks, &right_ranks).greedy_pairs() {
            let (left_row, right_row) = (left_rows[i], right_rows[j]);
            left_matched[left_row] = true;
            right_matched[right_row] = true;
            records.push(JoinedRecord {
                name: name.to_owned(),
                left_row,
                right_row,
                left_rank: Some(left_ranks[i]),
                right_rank: Some(right_ranks[j]),
                phase: MatchPhase::RankDistance,
            });
        }
    }

    let unmatched = |matched: Vec<bool>| {
        matched
            .into_iter()
            .enumerate()
            .filter_map(|(row, hit)| (!hit).then_some(row))
            .collect::<Vec<_>>()
    };

    let result = JoinResult {
        records,
        ambiguous_names: ambiguous.into_iter().map(str::to_owned).collect(),
        unmatched_left: unmatched(left_matched),
        unmatched_right: unmatched(right_matched),
    };

    #[cfg(feature = "tracing")]
    {
        let summary = result.summary();
        tracing::debug!(
            exact = summary.exact,
            rank_distance = summary.rank_distance,
            ambiguous_names = summary.ambiguous_names,
            dropped_left = summary.dropped_left,
            dropped_right = summary.dropped_right,
            "fuzzy player join finished"
        );
    }

    Ok(result)
}

/// [`fuzzy_join`] followed by [`JoinResult::to_table`].
pub fn fuzzy_join_table(
    left: &Table,
    right: &Table,
    options: &JoinOptions,
) -> Result<Table, JoinError> {
    fuzzy_join(left, right, options)?.to_table(left, right, options)
}
