/// Row-major matrix of absolute rank differences between the left and right
/// rows sharing one ambiguous name.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<f64>,
}

impl DistanceMatrix {
    #[must_use]
    pub fn from_ranks(left: &[f64], right: &[f64]) -> Self {
        let cells = left
            .iter()
            .flat_map(|l| right.iter().map(move |r| (l - r).abs()))
            .collect();
        Self {
            rows: left.len(),
            cols: right.len(),
            cells,
        }
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col).copied()
    }

    /// Smallest finite cell; ties go to the first cell in row-major order.
    fn argmin(&self) -> Option<(usize, usize)> {
        let mut best: Option<(usize, f64)> = None;
        for (pos, &cell) in self.cells.iter().enumerate() {
            if !cell.is_finite() {
                continue;
            }
            if best.is_none_or(|(_, current)| cell < current) {
                best = Some((pos, cell));
            }
        }
        best.map(|(pos, _)| (pos / self.cols, pos % self.cols))
    }

    fn mask(&mut self, row: usize, col: usize) {
        for c in 0..self.cols {
            self.cells[row * self.cols + c] = f64::INFINITY;
        }
        for r in 0..self.rows {
            self.cells[r * self.cols + col] = f64::INFINITY;
        }
    }

    /// Greedily pair rows and columns by smallest remaining distance, masking
    /// each matched row and column, until one side is exhausted.
    ///
    /// Consumes the matrix. Returns `(row, col)` pairs in pick order.
    #[must_use]
    pub fn greedy_pairs(mut self) -> Vec<(usize, usize)> {
        let target = self.rows.min(self.cols);
        let mut pairs = Vec::with_capacity(target);
        while pairs.len() < target {
            let Some((row, col)) = self.argmin() else {
                break;
            };
            pairs.push((row, col));
            self.mask(row, col);
        }
        pairs
    }
}
