//! Card-name to column lookup for deck matrices.
//!
//! A card tracked on both boards owns two columns: `"<card>"` for the
//! mainboard and `"<card>_SB"` for the sideboard.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sprs::CsMat;

use crate::ProfileError;
use crate::profile::{ColumnProfile, ProfileOptions, profile_columns};
use crate::source::{CellValue, ColumnSource};

pub const SIDEBOARD_SUFFIX: &str = "_SB";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Board {
    Main,
    Side,
}

impl Board {
    pub const BOTH: [Self; 2] = [Self::Main, Self::Side];

    #[must_use]
    pub fn column_name(self, card: &str) -> String {
        match self {
            Self::Main => card.to_owned(),
            Self::Side => format!("{card}{SIDEBOARD_SUFFIX}"),
        }
    }

    /// Split a column name into its base card name and board.
    #[must_use]
    pub fn split(column_name: &str) -> (&str, Self) {
        match column_name.strip_suffix(SIDEBOARD_SUFFIX) {
            Some(card) => (card, Self::Side),
            None => (column_name, Self::Main),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardVocabulary {
    columns: BTreeMap<String, usize>,
}

impl CardVocabulary {
    #[must_use]
    pub fn new(columns: BTreeMap<String, usize>) -> Self {
        Self { columns }
    }

    /// Vocabulary where the i-th name owns column i.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| (name.into(), idx))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        self.columns.get(column_name).copied()
    }

    #[must_use]
    pub fn column(&self, card: &str, board: Board) -> Option<usize> {
        self.column_index(&board.column_name(card))
    }

    /// Distinct base card names, sorted.
    #[must_use]
    pub fn card_names(&self) -> Vec<&str> {
        self.columns
            .keys()
            .map(|name| Board::split(name).0)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn columns_for(&self, card: &str) -> Result<Vec<(Board, usize)>, ProfileError> {
        let found = Board::BOTH
            .into_iter()
            .filter_map(|board| self.column(card, board).map(|col| (board, col)))
            .collect::<Vec<_>>();
        if found.is_empty() {
            return Err(ProfileError::UnknownCard {
                card: card.to_owned(),
            });
        }
        Ok(found)
    }
}

impl FromIterator<(String, usize)> for CardVocabulary {
    fn from_iter<T: IntoIterator<Item = (String, usize)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Rows (decks) that run at least one copy of `card` on either board, sorted.
///
/// Reads just the card's columns when the matrix is column-compressed and
/// makes a single pass over the stored entries otherwise.
pub fn decks_with_card<N: CellValue>(
    matrix: &CsMat<N>,
    vocabulary: &CardVocabulary,
    card: &str,
) -> Result<Vec<usize>, ProfileError> {
    let targets = vocabulary
        .columns_for(card)?
        .into_iter()
        .map(|(_, col)| col)
        .collect::<Vec<_>>();

    let mut rows = BTreeSet::new();
    if matrix.is_csc() {
        for &col in &targets {
            let Some(view) = matrix.outer_view(col) else {
                continue;
            };
            rows.extend(
                view.iter()
                    .filter(|(_, value)| value.to_f64() > 0.0)
                    .map(|(row, _)| row),
            );
        }
    } else {
        rows.extend(
            matrix
                .iter()
                .filter(|(value, (_, col))| targets.contains(col) && value.to_f64() > 0.0)
                .map(|(_, (row, _))| row),
        );
    }

    Ok(rows.into_iter().collect())
}

/// Mainboard and sideboard distributions for one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardProfile {
    pub card: String,
    pub main: Option<ColumnProfile>,
    pub side: Option<ColumnProfile>,
}

/// Restricts a source to a handful of its columns, renumbered from zero.
struct Projection<'a, S: ?Sized> {
    source: &'a S,
    columns: &'a [usize],
}

impl<S: ColumnSource + ?Sized> ColumnSource for Projection<'_, S> {
    fn shape(&self) -> (usize, usize) {
        (self.source.shape().0, self.columns.len())
    }

    fn for_each_stored(&self, visit: &mut dyn FnMut(usize, usize, f64)) {
        self.source.for_each_stored_in(self.columns, visit);
    }
}

/// Profile only the columns belonging to `card`.
///
/// A CSC matrix is read through the card's own column slices, so the cost is
/// the card's stored entries. Any other source is scanned in full, which is
/// O(stored entries) per call.
pub fn profile_card<S>(
    source: &S,
    vocabulary: &CardVocabulary,
    card: &str,
    options: ProfileOptions,
) -> Result<CardProfile, ProfileError>
where
    S: ColumnSource + ?Sized,
{
    let targets = vocabulary.columns_for(card)?;
    let columns = targets.iter().map(|&(_, col)| col).collect::<Vec<_>>();
    let cols = source.shape().1;
    if let Some(&col) = columns.iter().find(|&&col| col >= cols) {
        return Err(ProfileError::EntryOutOfBounds {
            row: 0,
            col,
            rows: source.shape().0,
            cols,
        });
    }

    let projected = profile_columns(
        &Projection {
            source,
            columns: &columns,
        },
        options,
    )?;

    let mut out = CardProfile {
        card: card.to_owned(),
        main: None,
        side: None,
    };
    for ((board, col), mut profile) in targets.into_iter().zip(projected) {
        profile.column = col;
        match board {
            Board::Main => out.main = Some(profile),
            Board::Side => out.side = Some(profile),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use sprs::{CsMat, TriMat};

    use super::{Board, CardVocabulary, decks_with_card, profile_card};
    use crate::ProfileError;
    use crate::profile::ProfileOptions;

    fn vocabulary() -> CardVocabulary {
        CardVocabulary::from_names(["Brainstorm", "Brainstorm_SB", "Force of Will", "Pyroblast_SB"])
    }

    fn decks() -> TriMat<u32> {
        let mut tri = TriMat::new((5, 4));
        tri.add_triplet(0, 0, 4);
        tri.add_triplet(1, 1, 1);
        tri.add_triplet(2, 2, 3);
        tri.add_triplet(3, 0, 2);
        tri.add_triplet(3, 1, 1);
        tri.add_triplet(4, 3, 2);
        tri
    }

    #[test]
    fn card_names_strip_the_sideboard_suffix() {
        assert_eq!(
            vocabulary().card_names(),
            vec!["Brainstorm", "Force of Will", "Pyroblast"]
        );
    }

    #[test]
    fn board_columns_resolve_by_naming_convention() {
        let vocab = vocabulary();
        assert_eq!(vocab.column("Brainstorm", Board::Main), Some(0));
        assert_eq!(vocab.column("Brainstorm", Board::Side), Some(1));
        assert_eq!(vocab.column("Pyroblast", Board::Main), None);
        assert_eq!(Board::split("Pyroblast_SB"), ("Pyroblast", Board::Side));
    }

    #[test]
    fn decks_with_card_checks_both_boards_in_either_storage() {
        let csc: CsMat<u32> = decks().to_csc();
        let csr: CsMat<u32> = decks().to_csr();
        let vocab = vocabulary();

        for matrix in [&csc, &csr] {
            assert_eq!(
                decks_with_card(matrix, &vocab, "Brainstorm").expect("known"),
                vec![0, 1, 3]
            );
            assert_eq!(
                decks_with_card(matrix, &vocab, "Pyroblast").expect("known"),
                vec![4]
            );
        }
    }

    #[test]
    fn unknown_card_is_an_error() {
        let csc: CsMat<u32> = decks().to_csc();
        let err = decks_with_card(&csc, &vocabulary(), "Lightning Bolt").expect_err("must fail");
        assert!(matches!(err, ProfileError::UnknownCard { card } if card == "Lightning Bolt"));
    }

    #[test]
    fn profile_card_reports_each_board() {
        let csc: CsMat<u32> = decks().to_csc();
        let out = profile_card(
            &csc,
            &vocabulary(),
            "Brainstorm",
            ProfileOptions { normalize: false },
        )
        .expect("profile");

        let main = out.main.expect("mainboard column");
        assert_eq!(main.column(), 0);
        assert_eq!(main.count(0.0), 3);
        assert_eq!(main.count(4.0), 1);
        assert_eq!(main.count(2.0), 1);

        let side = out.side.expect("sideboard column");
        assert_eq!(side.column(), 1);
        assert_eq!(side.count(1.0), 2);
        assert_eq!(side.count(0.0), 3);
    }

    #[test]
    fn profile_card_with_one_board_leaves_the_other_empty() {
        let csc: CsMat<u32> = decks().to_csc();
        let out = profile_card(&csc, &vocabulary(), "Pyroblast", ProfileOptions::default())
            .expect("profile");
        assert!(out.main.is_none());
        assert_eq!(out.side.expect("sideboard").frequency(2.0), 0.2);
    }

    #[test]
    fn profile_card_agrees_across_storage_orders() {
        let csc: CsMat<u32> = decks().to_csc();
        let csr: CsMat<u32> = decks().to_csr();
        let vocab = vocabulary();

        for card in ["Brainstorm", "Force of Will", "Pyroblast"] {
            assert_eq!(
                profile_card(&csr, &vocab, card, ProfileOptions::default()).expect("csr"),
                profile_card(&csc, &vocab, card, ProfileOptions::default()).expect("csc"),
            );
        }
    }
}
