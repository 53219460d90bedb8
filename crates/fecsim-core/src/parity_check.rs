//! Parity-Check Matrix — sparse bipartite structure over GF(2)
//!
//! Stores a check matrix H as adjacency lists in both directions: for each
//! check node the connected variable nodes, and for each variable node the
//! connected check nodes. Immutable once built; shared by the systematic
//! encoder construction and the iterative decoders.
//!
//! ## Example
//!
//! ```rust
//! use fecsim_core::parity_check::ParityCheckMatrix;
//!
//! let h = ParityCheckMatrix::hamming_7_4();
//! assert_eq!(h.check_count(), 3);
//! assert_eq!(h.var_count(), 7);
//! assert!(h.is_codeword(&[false; 7]));
//! ```

/// Sparse parity-check matrix, check nodes x variable nodes, over GF(2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParityCheckMatrix {
    check_count: usize,
    var_count: usize,
    check_rows: Vec<Vec<usize>>,
    var_cols: Vec<Vec<usize>>,
}

impl ParityCheckMatrix {
    /// Build from a dense 0/1 matrix, row-major.
    ///
    /// Ragged rows are tolerated; entries beyond the first row's width are
    /// ignored.
    pub fn from_dense(matrix: &[Vec<u8>]) -> Self {
        let check_count = matrix.len();
        let var_count = matrix.first().map_or(0, |row| row.len());

        let mut check_rows = vec![Vec::new(); check_count];
        let mut var_cols = vec![Vec::new(); var_count];

        for (r, row) in matrix.iter().enumerate() {
            for (c, &entry) in row.iter().enumerate().take(var_count) {
                if entry != 0 {
                    check_rows[r].push(c);
                    var_cols[c].push(r);
                }
            }
        }

        Self {
            check_count,
            var_count,
            check_rows,
            var_cols,
        }
    }

    /// Expand a protograph into a quasi-cyclic matrix.
    ///
    /// Non-negative entries are circulant shifts, `-1` is an all-zero block,
    /// `z` is the expansion factor.
    pub fn from_protograph(proto: &[Vec<i32>], z: usize) -> Self {
        let block_rows = proto.len();
        let block_cols = proto.first().map_or(0, |row| row.len());
        let check_count = block_rows * z;
        let var_count = block_cols * z;

        let mut check_rows = vec![Vec::new(); check_count];
        let mut var_cols = vec![Vec::new(); var_count];

        for (br, row) in proto.iter().enumerate() {
            for (bc, &shift) in row.iter().enumerate().take(block_cols) {
                if shift < 0 {
                    continue;
                }
                let s = shift as usize % z;
                for k in 0..z {
                    let r = br * z + k;
                    let c = bc * z + (k + s) % z;
                    check_rows[r].push(c);
                    var_cols[c].push(r);
                }
            }
        }

        Self {
            check_count,
            var_count,
            check_rows,
            var_cols,
        }
    }

    /// The (7,4) Hamming code check matrix, a common smoke-test fixture.
    pub fn hamming_7_4() -> Self {
        Self::from_dense(&[
            vec![1, 1, 1, 0, 1, 0, 0],
            vec![1, 1, 0, 1, 0, 1, 0],
            vec![1, 0, 1, 1, 0, 0, 1],
        ])
    }

    /// Number of check nodes (rows).
    pub fn check_count(&self) -> usize {
        self.check_count
    }

    /// Number of variable nodes (columns, codeword length).
    pub fn var_count(&self) -> usize {
        self.var_count
    }

    /// Variable indices connected to check `c`.
    pub fn check_row(&self, c: usize) -> &[usize] {
        &self.check_rows[c]
    }

    /// All check rows.
    pub fn check_rows(&self) -> &[Vec<usize>] {
        &self.check_rows
    }

    /// Check indices connected to variable `v`.
    pub fn var_col(&self, v: usize) -> &[usize] {
        &self.var_cols[v]
    }

    /// Total number of edges (ones) in the matrix.
    pub fn edge_count(&self) -> usize {
        self.check_rows.iter().map(Vec::len).sum()
    }

    /// Design rate `(n - m) / n`, assuming full-rank H.
    pub fn design_rate(&self) -> f64 {
        if self.var_count == 0 {
            return 0.0;
        }
        (self.var_count - self.check_count) as f64 / self.var_count as f64
    }

    /// Syndrome of a word: one parity per check, true = unsatisfied.
    pub fn syndrome(&self, word: &[bool]) -> Vec<bool> {
        self.check_rows
            .iter()
            .map(|vars| {
                vars.iter()
                    .filter(|&&v| word.get(v).copied().unwrap_or(false))
                    .count()
                    % 2
                    != 0
            })
            .collect()
    }

    /// True when every check is satisfied.
    pub fn is_codeword(&self, word: &[bool]) -> bool {
        self.check_rows.iter().all(|vars| {
            vars.iter()
                .filter(|&&v| word.get(v).copied().unwrap_or(false))
                .count()
                % 2
                == 0
        })
    }

    /// Densify back to a 0/1 matrix. Used by the generator construction.
    pub fn to_dense(&self) -> Vec<Vec<bool>> {
        let mut rows = vec![vec![false; self.var_count]; self.check_count];
        for (r, vars) in self.check_rows.iter().enumerate() {
            for &v in vars {
                rows[r][v] = true;
            }
        }
        rows
    }
}
