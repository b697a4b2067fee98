//! Per-column value distributions over a deck matrix.
//!
//! Only stored entries are visited. Every row a column does not store is an
//! implicit zero and is added to that column's `0` bucket, on top of any zeros
//! the source stored explicitly.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ProfileError;
use crate::source::ColumnSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileOptions {
    /// Report frequencies (`count / rows`) instead of raw counts.
    pub normalize: bool,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self { normalize: true }
    }
}

/// Totally ordered bucket key: `-0.0` folds into `0.0` and every NaN into one
/// canonical NaN.
#[derive(Debug, Clone, Copy)]
struct CellKey(f64);

impl CellKey {
    const ZERO: Self = Self(0.0);

    fn new(value: f64) -> Self {
        if value == 0.0 {
            Self::ZERO
        } else if value.is_nan() {
            Self(f64::NAN)
        } else {
            Self(value)
        }
    }
}

impl PartialEq for CellKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellKey {}

impl PartialOrd for CellKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub value: f64,
    pub count: usize,
}

/// Distribution of one column's values across every row of the matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub(crate) column: usize,
    row_count: usize,
    normalized: bool,
    buckets: Vec<Bucket>,
}

impl ColumnProfile {
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Buckets in ascending value order.
    #[must_use]
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    #[must_use]
    pub fn count(&self, value: f64) -> usize {
        let key = CellKey::new(value);
        self.buckets
            .binary_search_by(|bucket| CellKey::new(bucket.value).cmp(&key))
            .map_or(0, |pos| self.buckets[pos].count)
    }

    #[must_use]
    pub fn frequency(&self, value: f64) -> f64 {
        if self.row_count == 0 {
            return 0.0;
        }
        self.count(value) as f64 / self.row_count as f64
    }

    /// `(value, weight)` pairs where the weight is a frequency when the
    /// profile was normalized and a count otherwise.
    pub fn weights(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let denom = if self.normalized {
            self.row_count as f64
        } else {
            1.0
        };
        self.buckets
            .iter()
            .map(move |bucket| (bucket.value, bucket.count as f64 / denom))
    }

    /// Sum of all weights: the row count, or 1.0 when normalized.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.weights().map(|(_, weight)| weight).sum()
    }
}

/// Profile every column of `source`, in column order.
///
/// Runs in O(stored entries + columns). Zero rows is an error only when
/// normalizing; the raw counts of an empty matrix are well defined (every
/// profile is empty).
pub fn profile_columns<S>(
    source: &S,
    options: ProfileOptions,
) -> Result<Vec<ColumnProfile>, ProfileError>
where
    S: ColumnSource + ?Sized,
{
    let (rows, cols) = source.shape();
    if rows == 0 && options.normalize {
        return Err(ProfileError::InvalidShape { rows, cols });
    }

    let mut tallies = vec![BTreeMap::<CellKey, usize>::new(); cols];
    let mut stored = vec![0_usize; cols];
    let mut out_of_bounds = None;

    source.for_each_stored(&mut |row, col, value| {
        if row >= rows || col >= cols {
            out_of_bounds.get_or_insert((row, col));
            return;
        }
        stored[col] += 1;
        *tallies[col].entry(CellKey::new(value)).or_insert(0) += 1;
    });

    if let Some((row, col)) = out_of_bounds {
        return Err(ProfileError::EntryOutOfBounds {
            row,
            col,
            rows,
            cols,
        });
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        rows,
        cols,
        stored = stored.iter().sum::<usize>(),
        normalize = options.normalize,
        "profiling deck matrix columns"
    );

    tallies
        .into_iter()
        .zip(stored)
        .enumerate()
        .map(|(column, (mut tally, explicit))| {
            let Some(implicit) = rows.checked_sub(explicit) else {
                return Err(ProfileError::OverfullColumn {
                    column,
                    stored: explicit,
                    rows,
                });
            };
            if implicit > 0 {
                *tally.entry(CellKey::ZERO).or_insert(0) += implicit;
            }

            Ok(ColumnProfile {
                column,
                row_count: rows,
                normalized: options.normalize,
                buckets: tally
                    .into_iter()
                    .map(|(key, count)| Bucket {
                        value: key.0,
                        count,
                    })
                    .collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use sprs::{CsMat, TriMat};

    use super::{Bucket, ProfileOptions, profile_columns};
    use crate::ProfileError;
    use crate::source::{ColumnSource, DenseMatrix};

    const COUNTS: ProfileOptions = ProfileOptions { normalize: false };

    fn decks() -> CsMat<u32> {
        // 4 decks x 3 cards; card 2 is never played.
        let mut tri = TriMat::new((4, 3));
        tri.add_triplet(0, 0, 4);
        tri.add_triplet(1, 0, 4);
        tri.add_triplet(2, 0, 2);
        tri.add_triplet(3, 1, 1);
        tri.to_csc()
    }

    /// Stores every entry it is given verbatim, zeros and duplicates included.
    struct Triples {
        shape: (usize, usize),
        entries: Vec<(usize, usize, f64)>,
    }

    impl ColumnSource for Triples {
        fn shape(&self) -> (usize, usize) {
            self.shape
        }

        fn for_each_stored(&self, visit: &mut dyn FnMut(usize, usize, f64)) {
            for &(row, col, value) in &self.entries {
                visit(row, col, value);
            }
        }
    }

    #[test]
    fn counts_include_implicit_zeros() {
        let profiles = profile_columns(&decks(), COUNTS).expect("profile");
        assert_eq!(profiles.len(), 3);

        assert_eq!(
            profiles[0].buckets(),
            &[
                Bucket {
                    value: 0.0,
                    count: 1
                },
                Bucket {
                    value: 2.0,
                    count: 1
                },
                Bucket {
                    value: 4.0,
                    count: 2
                },
            ]
        );
        assert_eq!(profiles[1].count(0.0), 3);
        assert_eq!(profiles[1].count(1.0), 1);
        for profile in &profiles {
            assert_eq!(profile.total(), 4.0);
        }
    }

    #[test]
    fn unplayed_card_normalizes_to_all_zero() {
        let profiles = profile_columns(&decks(), ProfileOptions::default()).expect("profile");
        let weights: Vec<_> = profiles[2].weights().collect();
        assert_eq!(weights, vec![(0.0, 1.0)]);
    }

    #[test]
    fn normalized_weights_sum_to_one() {
        let profiles = profile_columns(&decks(), ProfileOptions::default()).expect("profile");
        for profile in &profiles {
            assert!((profile.total() - 1.0).abs() < 1e-12);
        }
        assert_eq!(profiles[0].frequency(4.0), 0.5);
        assert_eq!(profiles[0].frequency(3.0), 0.0);
    }

    #[test]
    fn dense_input_matches_sparse_input() {
        let dense = DenseMatrix::from_rows(vec![
            vec![4_u32, 0, 0],
            vec![4, 0, 0],
            vec![2, 0, 0],
            vec![0, 1, 0],
        ])
        .expect("dense");

        for options in [COUNTS, ProfileOptions::default()] {
            assert_eq!(
                profile_columns(&dense, options).expect("dense profile"),
                profile_columns(&decks(), options).expect("sparse profile")
            );
        }
    }

    #[test]
    fn explicit_zeros_merge_with_implicit_zeros() {
        let source = Triples {
            shape: (3, 1),
            entries: vec![(0, 0, 0.0), (1, 0, -0.0), (2, 0, 3.0)],
        };
        let profiles = profile_columns(&source, COUNTS).expect("profile");
        assert_eq!(profiles[0].count(0.0), 2);
        assert_eq!(profiles[0].count(3.0), 1);
        assert_eq!(profiles[0].buckets().len(), 2);
    }

    #[test]
    fn zero_rows_cannot_be_normalized() {
        let empty: CsMat<u32> = TriMat::new((0, 2)).to_csc();
        let err = profile_columns(&empty, ProfileOptions::default()).expect_err("must fail");
        assert!(matches!(err, ProfileError::InvalidShape { rows: 0, cols: 2 }));

        let counts = profile_columns(&empty, COUNTS).expect("counts are defined");
        assert_eq!(counts.len(), 2);
        assert!(counts.iter().all(|profile| profile.buckets().is_empty()));
    }

    #[test]
    fn overfull_column_is_rejected() {
        let source = Triples {
            shape: (1, 1),
            entries: vec![(0, 0, 1.0), (0, 0, 2.0)],
        };
        let err = profile_columns(&source, COUNTS).expect_err("must fail");
        assert!(matches!(
            err,
            ProfileError::OverfullColumn {
                column: 0,
                stored: 2,
                rows: 1
            }
        ));
    }

    #[test]
    fn out_of_bounds_entry_is_rejected() {
        let source = Triples {
            shape: (2, 1),
            entries: vec![(5, 0, 1.0)],
        };
        let err = profile_columns(&source, COUNTS).expect_err("must fail");
        assert!(matches!(err, ProfileError::EntryOutOfBounds { row: 5, col: 0, .. }));
    }

    #[test]
    fn profile_round_trips_through_json() {
        let profiles = profile_columns(&decks(), ProfileOptions::default()).expect("profile");
        let json = serde_json::to_string(&profiles).expect("serialize");
        let back: Vec<super::ColumnProfile> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, profiles);
    }
}
