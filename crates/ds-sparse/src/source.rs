use sprs::CsMat;

use crate::ProfileError;

/// Numeric cell types a deck matrix can hold.
pub trait CellValue: Copy {
    fn to_f64(self) -> f64;
}

macro_rules! impl_cell_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CellValue for $ty {
                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_cell_value!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);

/// Anything that can report its shape and walk its stored entries.
///
/// Entries that are not visited are implicit zeros. A source may visit
/// explicit zeros; the profiler folds them into the zero bucket.
pub trait ColumnSource {
    /// `(rows, cols)`.
    fn shape(&self) -> (usize, usize);

    /// Visit every stored entry as `(row, col, value)`, in any order.
    fn for_each_stored(&self, visit: &mut dyn FnMut(usize, usize, f64));

    /// Visit the stored entries of `columns` only, reporting each entry's
    /// position within `columns` in place of its column index.
    ///
    /// The default walks every stored entry. Sources with column access
    /// override it to touch only the selected columns.
    fn for_each_stored_in(&self, columns: &[usize], visit: &mut dyn FnMut(usize, usize, f64)) {
        scan_selected(self, columns, visit);
    }
}

fn scan_selected<S: ColumnSource + ?Sized>(
    source: &S,
    columns: &[usize],
    visit: &mut dyn FnMut(usize, usize, f64),
) {
    source.for_each_stored(&mut |row, col, value| {
        if let Some(pos) = columns.iter().position(|&wanted| wanted == col) {
            visit(row, pos, value);
        }
    });
}

impl<N: CellValue> ColumnSource for CsMat<N> {
    fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    fn for_each_stored(&self, visit: &mut dyn FnMut(usize, usize, f64)) {
        for (value, (row, col)) in self.iter() {
            visit(row, col, value.to_f64());
        }
    }

    /// CSC storage reads just the selected outer slices.
    fn for_each_stored_in(&self, columns: &[usize], visit: &mut dyn FnMut(usize, usize, f64)) {
        if !self.is_csc() {
            scan_selected(self, columns, visit);
            return;
        }
        for (pos, &col) in columns.iter().enumerate() {
            let Some(slice) = self.outer_view(col) else {
                continue;
            };
            for (row, value) in slice.iter() {
                visit(row, pos, value.to_f64());
            }
        }
    }
}

/// Row-major dense matrix. Every cell counts as stored, zeros included.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix<N> {
    rows: usize,
    cols: usize,
    data: Vec<N>,
}

impl<N: CellValue> DenseMatrix<N> {
    pub fn new(rows: usize, cols: usize, data: Vec<N>) -> Result<Self, ProfileError> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(ProfileError::DenseLength {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from nested rows; every row must have the width of the first.
    pub fn from_rows(rows: Vec<Vec<N>>) -> Result<Self, ProfileError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);

        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != n_cols {
                return Err(ProfileError::RaggedRow {
                    row,
                    expected: n_cols,
                    found: values.len(),
                });
            }
            data.extend(values);
        }

        Self::new(n_rows, n_cols, data)
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<N> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col).copied()
    }
}

impl<N: CellValue> ColumnSource for DenseMatrix<N> {
    fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn for_each_stored(&self, visit: &mut dyn FnMut(usize, usize, f64)) {
        if self.cols == 0 {
            return;
        }
        for (pos, value) in self.data.iter().enumerate() {
            visit(pos / self.cols, pos % self.cols, value.to_f64());
        }
    }

    fn for_each_stored_in(&self, columns: &[usize], visit: &mut dyn FnMut(usize, usize, f64)) {
        for row in 0..self.rows {
            for (pos, &col) in columns.iter().enumerate() {
                if let Some(value) = self.get(row, col) {
                    visit(row, pos, value.to_f64());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use sprs::{CsMat, TriMat};

    use super::{ColumnSource, DenseMatrix};
    use crate::ProfileError;

    fn collect(source: &dyn ColumnSource) -> Vec<(usize, usize, f64)> {
        let mut out = Vec::new();
        source.for_each_stored(&mut |row, col, value| out.push((row, col, value)));
        out.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        out
    }

    #[test]
    fn csr_and_csc_visit_the_same_entries() {
        let mut tri = TriMat::new((3, 2));
        tri.add_triplet(0, 1, 4_u32);
        tri.add_triplet(2, 0, 1_u32);
        let csr: CsMat<u32> = tri.to_csr();
        let csc: CsMat<u32> = tri.to_csc();

        assert_eq!(csr.shape(), (3, 2));
        assert_eq!(collect(&csr), vec![(0, 1, 4.0), (2, 0, 1.0)]);
        assert_eq!(collect(&csr), collect(&csc));
    }

    #[test]
    fn column_subset_is_renumbered_in_both_storage_orders() {
        let mut tri = TriMat::new((3, 3));
        tri.add_triplet(0, 0, 1_u32);
        tri.add_triplet(1, 2, 5_u32);
        tri.add_triplet(2, 1, 7_u32);
        tri.add_triplet(2, 2, 2_u32);
        let csc: CsMat<u32> = tri.to_csc();
        let csr: CsMat<u32> = tri.to_csr();

        let subset = |source: &dyn ColumnSource| {
            let mut out = Vec::new();
            source.for_each_stored_in(&[2, 0], &mut |row, pos, value| out.push((row, pos, value)));
            out.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
            out
        };
        assert_eq!(subset(&csc), vec![(0, 1, 1.0), (1, 0, 5.0), (2, 0, 2.0)]);
        assert_eq!(subset(&csr), subset(&csc));
    }

    #[test]
    fn dense_matrix_visits_zeros_too() {
        let dense = DenseMatrix::from_rows(vec![vec![0_u8, 2], vec![1, 0]]).expect("dense");
        assert_eq!(
            collect(&dense),
            vec![(0, 0, 0.0), (0, 1, 2.0), (1, 0, 1.0), (1, 1, 0.0)]
        );
        assert_eq!(dense.get(0, 1), Some(2));
        assert_eq!(dense.get(2, 0), None);
    }

    #[test]
    fn ragged_dense_rows_are_rejected() {
        let err = DenseMatrix::from_rows(vec![vec![1_i32, 2], vec![3]]).expect_err("must fail");
        assert!(matches!(
            err,
            ProfileError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn dense_length_must_match_shape() {
        let err = DenseMatrix::new(2, 2, vec![1.0_f64; 3]).expect_err("must fail");
        assert!(matches!(err, ProfileError::DenseLength { len: 3, .. }));
    }
}
