//! Block Interleaver — deterministic permutation of coded bits
//!
//! Spreads adjacent coded bits across the frame so that channel error
//! bursts land on distant codeword positions. The inverse permutation is
//! precomputed and applied to LLRs before decoding.
//!
//! ## Example
//!
//! ```rust
//! use fecsim_core::interleaver::BlockInterleaver;
//!
//! let il = BlockInterleaver::rectangular(3, 4).unwrap(); // 12-bit frames
//! let bits: Vec<bool> = (0..12).map(|i| i % 5 == 0).collect();
//!
//! let mut scattered = vec![false; 12];
//! il.interleave(&bits, &mut scattered);
//!
//! let llrs: Vec<f64> = scattered.iter().map(|&b| if b { -1.0 } else { 1.0 }).collect();
//! let mut restored = vec![0.0; 12];
//! il.deinterleave(&llrs, &mut restored);
//!
//! for (bit, llr) in bits.iter().zip(restored.iter()) {
//!     assert_eq!(*bit, *llr < 0.0);
//! }
//! ```

use crate::stage::StageError;

/// Fixed permutation over one codeword, with its inverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInterleaver {
    /// `out[i] = in[forward[i]]`
    forward: Vec<usize>,
    inverse: Vec<usize>,
}

impl BlockInterleaver {
    /// Classic row-write / column-read rectangular interleaver over
    /// `rows * cols` bits.
    pub fn rectangular(rows: usize, cols: usize) -> Result<Self, StageError> {
        if rows == 0 || cols == 0 {
            return Err(StageError::config(
                "interleaver.shape",
                format!("rows and cols must be positive, got {rows}x{cols}"),
            ));
        }
        let mut forward = Vec::with_capacity(rows * cols);
        for c in 0..cols {
            for r in 0..rows {
                forward.push(r * cols + c);
            }
        }
        Self::from_permutation(forward)
    }

    /// Build from an explicit permutation of `0..n`.
    pub fn from_permutation(forward: Vec<usize>) -> Result<Self, StageError> {
        let n = forward.len();
        let mut inverse = vec![usize::MAX; n];
        for (i, &src) in forward.iter().enumerate() {
            if src >= n {
                return Err(StageError::config(
                    "interleaver.permutation",
                    format!("index {src} out of range for length {n}"),
                ));
            }
            if inverse[src] != usize::MAX {
                return Err(StageError::config(
                    "interleaver.permutation",
                    format!("index {src} appears twice"),
                ));
            }
            inverse[src] = i;
        }
        Ok(Self { forward, inverse })
    }

    /// Frame length the permutation covers.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// True for the degenerate zero-length permutation.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Permute a batch of coded frames. Lengths must be equal multiples of
    /// [`Self::len`].
    pub fn interleave(&self, input: &[bool], output: &mut [bool]) {
        let n = self.forward.len();
        for (src, dst) in input.chunks(n).zip(output.chunks_mut(n)) {
            for (i, &from) in self.forward.iter().enumerate() {
                dst[i] = src[from];
            }
        }
    }

    /// Undo the permutation on a batch of LLR frames.
    pub fn deinterleave(&self, input: &[f64], output: &mut [f64]) {
        let n = self.inverse.len();
        for (src, dst) in input.chunks(n).zip(output.chunks_mut(n)) {
            for (i, &from) in self.inverse.iter().enumerate() {
                dst[i] = src[from];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangular_is_bijection() {
        let il = BlockInterleaver::rectangular(4, 8).unwrap();
        assert_eq!(il.len(), 32);
        let mut seen = vec![false; 32];
        for i in 0..32 {
            let mut input = vec![false; 32];
            input[i] = true;
            let mut out = vec![false; 32];
            il.interleave(&input, &mut out);
            let hits: Vec<usize> = (0..32).filter(|&j| out[j]).collect();
            assert_eq!(hits.len(), 1);
            assert!(!seen[hits[0]]);
            seen[hits[0]] = true;
        }
    }

    #[test]
    fn test_round_trip() {
        let il = BlockInterleaver::rectangular(5, 7).unwrap();
        let bits: Vec<bool> = (0..35).map(|i| (i * 13) % 3 == 0).collect();
        let mut scattered = vec![false; 35];
        il.interleave(&bits, &mut scattered);

        let llrs: Vec<f64> = scattered.iter().map(|&b| if b { -2.0 } else { 2.0 }).collect();
        let mut restored = vec![0.0; 35];
        il.deinterleave(&llrs, &mut restored);

        for (i, (&bit, &llr)) in bits.iter().zip(restored.iter()).enumerate() {
            assert_eq!(bit, llr < 0.0, "position {i}");
        }
    }

    #[test]
    fn test_spreads_adjacent_bits() {
        let il = BlockInterleaver::rectangular(4, 4).unwrap();
        let mut input = vec![false; 16];
        input[0] = true;
        input[1] = true;
        let mut out = vec![false; 16];
        il.interleave(&input, &mut out);
        let hits: Vec<usize> = (0..16).filter(|&j| out[j]).collect();
        assert!(hits[1] - hits[0] >= 4, "burst not spread: {hits:?}");
    }

    #[test]
    fn test_rejects_duplicate_index() {
        assert!(BlockInterleaver::from_permutation(vec![0, 1, 1]).is_err());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(BlockInterleaver::from_permutation(vec![0, 3]).is_err());
    }

    #[test]
    fn test_batched_frames() {
        let il = BlockInterleaver::rectangular(2, 3).unwrap();
        let bits = vec![true, false, false, false, false, false, // frame 0
                        false, false, false, false, false, true]; // frame 1
        let mut out = vec![false; 12];
        il.interleave(&bits, &mut out);
        assert_eq!(out[..6].iter().filter(|&&b| b).count(), 1);
        assert_eq!(out[6..].iter().filter(|&&b| b).count(), 1);
    }
}
