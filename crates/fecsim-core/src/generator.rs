//! Systematic Generator Construction — turn a parity-check matrix into an encoder
//!
//! Gauss-Jordan elimination over GF(2) drives H into reduced row-echelon
//! form. Columns that never host a pivot are the information positions; the
//! pivot columns are parity positions whose value is a XOR of information
//! bits read straight off the reduced rows. The generator is stored sparsely
//! as one support set per codeword position: encoding XORs the listed
//! message bits, `O(N * avg_support)` per frame.
//!
//! Restricted to the information positions the generator is the identity,
//! so the code is systematic with the message bits scattered at
//! [`SystematicGenerator::info_bit_positions`].
//!
//! ## Example
//!
//! ```rust
//! use fecsim_core::parity_check::ParityCheckMatrix;
//! use fecsim_core::generator::SystematicGenerator;
//!
//! let h = ParityCheckMatrix::hamming_7_4();
//! let gen = SystematicGenerator::from_parity_check(&h, 4, 7).unwrap();
//!
//! assert_eq!(gen.info_bit_positions().len(), 4);
//!
//! let mut codeword = vec![false; 7];
//! gen.encode_frame(&[false; 4], &mut codeword);
//! assert_eq!(codeword, vec![false; 7]);
//! ```

use std::fmt;

use crate::parity_check::ParityCheckMatrix;
use crate::stage::FrameEncoder;

/// Construction failure: the derived code does not match the caller's
/// expectations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    /// The derived K or N differs from the expected value.
    DimensionMismatch {
        dimension: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The information-position set does not have exactly K entries.
    LengthMismatch { expected: usize, actual: usize },
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorError::DimensionMismatch {
                dimension,
                expected,
                actual,
            } => write!(
                f,
                "built generator has {dimension} = {actual}, expected {expected}"
            ),
            GeneratorError::LengthMismatch { expected, actual } => write!(
                f,
                "information positions count {actual} does not equal K = {expected}"
            ),
        }
    }
}

impl std::error::Error for GeneratorError {}

/// Systematic GF(2) generator derived from a parity-check matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystematicGenerator {
    k: usize,
    n: usize,
    info_positions: Vec<usize>,
    /// Per codeword position, the message-bit ordinals XORed together.
    supports: Vec<Vec<usize>>,
}

impl SystematicGenerator {
    /// Derive the generator from `h`, verifying the resulting dimensions
    /// against `expected_k` and `expected_n`.
    pub fn from_parity_check(
        h: &ParityCheckMatrix,
        expected_k: usize,
        expected_n: usize,
    ) -> Result<Self, GeneratorError> {
        let n = h.var_count();
        let m = h.check_count();
        let mut rows = h.to_dense();

        // Gauss-Jordan: sweep columns left to right, claim one pivot row per
        // column when possible and clear that column everywhere else.
        let mut pivot_cols: Vec<usize> = Vec::with_capacity(m);
        for col in 0..n {
            let rank = pivot_cols.len();
            if rank == m {
                break;
            }
            let Some(src) = (rank..m).find(|&r| rows[r][col]) else {
                continue;
            };
            rows.swap(rank, src);
            for r in 0..m {
                if r != rank && rows[r][col] {
                    // rows[r] ^= rows[rank]
                    let (head, tail) = rows.split_at_mut(rank.max(r));
                    let (dst, src_row) = if r < rank {
                        (&mut head[r], &tail[0])
                    } else {
                        (&mut tail[0], &head[rank])
                    };
                    for (d, s) in dst.iter_mut().zip(src_row.iter()) {
                        *d ^= *s;
                    }
                }
            }
            pivot_cols.push(col);
        }

        let rank = pivot_cols.len();
        let k = n - rank;

        let mut is_pivot = vec![false; n];
        for &c in &pivot_cols {
            is_pivot[c] = true;
        }
        let info_positions: Vec<usize> = (0..n).filter(|&c| !is_pivot[c]).collect();

        if k != expected_k {
            return Err(GeneratorError::DimensionMismatch {
                dimension: "K",
                expected: expected_k,
                actual: k,
            });
        }
        if n != expected_n {
            return Err(GeneratorError::DimensionMismatch {
                dimension: "N",
                expected: expected_n,
                actual: n,
            });
        }
        if info_positions.len() != k {
            return Err(GeneratorError::LengthMismatch {
                expected: k,
                actual: info_positions.len(),
            });
        }

        // Reduced rows now read: x[pivot] + sum(x[info cols with a one]) = 0,
        // so each pivot position is the XOR of the listed message bits.
        let mut supports = vec![Vec::new(); n];
        for (ordinal, &col) in info_positions.iter().enumerate() {
            supports[col] = vec![ordinal];
        }
        for (row, &pivot_col) in pivot_cols.iter().enumerate() {
            supports[pivot_col] = info_positions
                .iter()
                .enumerate()
                .filter(|&(_, &c)| rows[row][c])
                .map(|(ordinal, _)| ordinal)
                .collect();
        }

        Ok(Self {
            k,
            n,
            info_positions,
            supports,
        })
    }

    /// Message length K.
    pub fn info_len(&self) -> usize {
        self.k
    }

    /// Codeword length N.
    pub fn codeword_len(&self) -> usize {
        self.n
    }

    /// Codeword positions carrying the message bits, ascending.
    pub fn info_bit_positions(&self) -> &[usize] {
        &self.info_positions
    }

    /// Encode a single frame. `info.len() == K`, `codeword.len() == N`.
    pub fn encode_frame(&self, info: &[bool], codeword: &mut [bool]) {
        for (x, support) in codeword.iter_mut().zip(self.supports.iter()) {
            let mut parity = false;
            for &j in support {
                parity ^= info[j];
            }
            *x = parity;
        }
    }

    /// Materialize row `i` of G (the codeword of the i-th unit message).
    /// Intended for tests and matrix export, not the encode path.
    pub fn generator_row(&self, i: usize) -> Vec<bool> {
        self.supports
            .iter()
            .map(|support| support.contains(&i))
            .collect()
    }
}

impl FrameEncoder for SystematicGenerator {
    fn info_len(&self) -> usize {
        self.k
    }

    fn codeword_len(&self) -> usize {
        self.n
    }

    fn encode(&self, info: &[bool], codeword: &mut [bool]) {
        for (u, x) in info.chunks(self.k).zip(codeword.chunks_mut(self.n)) {
            self.encode_frame(u, x);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hamming_generator() -> SystematicGenerator {
        let h = ParityCheckMatrix::hamming_7_4();
        SystematicGenerator::from_parity_check(&h, 4, 7).unwrap()
    }

    #[test]
    fn test_hamming_dimensions() {
        let gen = hamming_generator();
        assert_eq!(gen.info_len(), 4);
        assert_eq!(gen.codeword_len(), 7);

        let pos = gen.info_bit_positions();
        assert_eq!(pos.len(), 4);
        let mut sorted = pos.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 4, "positions must be distinct");
        assert!(pos.iter().all(|&p| p < 7));
    }

    #[test]
    fn test_all_zero_message() {
        let gen = hamming_generator();
        let mut codeword = vec![true; 7];
        gen.encode_frame(&[false; 4], &mut codeword);
        assert_eq!(codeword, vec![false; 7]);
    }

    #[test]
    fn test_every_codeword_satisfies_h() {
        let h = ParityCheckMatrix::hamming_7_4();
        let gen = SystematicGenerator::from_parity_check(&h, 4, 7).unwrap();

        let mut codeword = vec![false; 7];
        for msg in 0u8..16 {
            let info: Vec<bool> = (0..4).map(|i| (msg >> i) & 1 == 1).collect();
            gen.encode_frame(&info, &mut codeword);
            assert!(h.is_codeword(&codeword), "message {msg:#06b} broke a check");
        }
    }

    #[test]
    fn test_dual_orthogonality() {
        let h = ParityCheckMatrix::hamming_7_4();
        let gen = SystematicGenerator::from_parity_check(&h, 4, 7).unwrap();

        for row in 0..h.check_count() {
            let h_row = h.check_row(row);
            for i in 0..gen.info_len() {
                let g_row = gen.generator_row(i);
                let dot = h_row.iter().filter(|&&v| g_row[v]).count() % 2;
                assert_eq!(dot, 0, "H row {row} not orthogonal to G row {i}");
            }
        }
    }

    #[test]
    fn test_systematic_identity() {
        let gen = hamming_generator();
        let pos = gen.info_bit_positions();

        let mut codeword = vec![false; 7];
        for i in 0..4 {
            let mut info = vec![false; 4];
            info[i] = true;
            gen.encode_frame(&info, &mut codeword);
            assert!(codeword[pos[i]], "unit message {i} missing at its position");
            for (j, &p) in pos.iter().enumerate() {
                assert_eq!(codeword[p], i == j);
            }
        }
    }

    #[test]
    fn test_rank_deficient_h() {
        // Duplicated row: rank 1, so K = 3 - 1 = 2.
        let h = ParityCheckMatrix::from_dense(&[vec![1, 1, 0], vec![1, 1, 0]]);
        let gen = SystematicGenerator::from_parity_check(&h, 2, 3).unwrap();
        assert_eq!(gen.info_len(), 2);
        assert_eq!(gen.info_bit_positions().len(), 2);
    }

    #[test]
    fn test_k_equals_n_minus_rank_for_random_h() {
        // Pseudo-random dense matrices; the mismatch error reports the
        // derived K, which must then construct cleanly and satisfy the
        // information-position invariants.
        let mut state = 0x2545_F491_4F6C_DD1Du64;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        for trial in 0..8 {
            let m = 3 + trial % 4;
            let n = 9 + trial;
            let dense: Vec<Vec<u8>> = (0..m)
                .map(|_| (0..n).map(|_| (next() & 1) as u8).collect())
                .collect();
            let h = ParityCheckMatrix::from_dense(&dense);

            let derived_k = match SystematicGenerator::from_parity_check(&h, usize::MAX, n) {
                Err(GeneratorError::DimensionMismatch {
                    dimension: "K",
                    actual,
                    ..
                }) => actual,
                other => panic!("expected K mismatch probe, got {other:?}"),
            };
            assert!(derived_k >= n - m, "rank cannot exceed row count");

            let gen = SystematicGenerator::from_parity_check(&h, derived_k, n).unwrap();
            let pos = gen.info_bit_positions();
            assert_eq!(pos.len(), derived_k);
            let mut uniq = pos.to_vec();
            uniq.sort_unstable();
            uniq.dedup();
            assert_eq!(uniq.len(), derived_k);
            assert!(pos.iter().all(|&p| p < n));

            // Every unit message must still satisfy H.
            let mut codeword = vec![false; n];
            for i in 0..derived_k {
                let mut info = vec![false; derived_k];
                info[i] = true;
                gen.encode_frame(&info, &mut codeword);
                assert!(h.is_codeword(&codeword), "trial {trial}, unit {i}");
            }
        }
    }

    #[test]
    fn test_expected_k_mismatch() {
        let h = ParityCheckMatrix::hamming_7_4();
        let err = SystematicGenerator::from_parity_check(&h, 5, 7).unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::DimensionMismatch {
                dimension: "K",
                expected: 5,
                actual: 4,
            }
        ));
    }

    #[test]
    fn test_expected_n_mismatch() {
        let h = ParityCheckMatrix::hamming_7_4();
        let err = SystematicGenerator::from_parity_check(&h, 4, 8).unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::DimensionMismatch { dimension: "N", .. }
        ));
    }

    #[test]
    fn test_batched_encode() {
        let gen = hamming_generator();
        let h = ParityCheckMatrix::hamming_7_4();

        let info = vec![
            true, false, true, true, // frame 0
            false, true, false, true, // frame 1
        ];
        let mut coded = vec![false; 14];
        FrameEncoder::encode(&gen, &info, &mut coded);

        assert!(h.is_codeword(&coded[..7]));
        assert!(h.is_codeword(&coded[7..]));

        // Frames encode independently.
        let mut single = vec![false; 7];
        gen.encode_frame(&info[..4], &mut single);
        assert_eq!(&coded[..7], &single[..]);
    }
}
