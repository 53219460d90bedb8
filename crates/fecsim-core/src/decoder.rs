//! Belief-Propagation Decoder — iterative message passing on a parity-check graph
//!
//! Flooding-schedule decoder with either Sum-Product or scaled Min-Sum check
//! updates. Messages live in flat edge arrays laid out check-major, with a
//! per-variable edge index built once at construction; scratch buffers are
//! reused across frames. Iteration stops early as soon as the hard decision
//! satisfies every check.
//!
//! Information bits are extracted at the systematic positions supplied at
//! construction, which for generators derived from H are scattered over the
//! codeword rather than packed at the front.
//!
//! ## Example
//!
//! ```rust
//! use fecsim_core::parity_check::ParityCheckMatrix;
//! use fecsim_core::generator::SystematicGenerator;
//! use fecsim_core::decoder::{BeliefPropagationDecoder, CheckUpdate};
//! use fecsim_core::stage::SoftDecoder;
//!
//! let h = ParityCheckMatrix::hamming_7_4();
//! let gen = SystematicGenerator::from_parity_check(&h, 4, 7).unwrap();
//! let mut dec = BeliefPropagationDecoder::for_generator(&h, &gen,
//!     CheckUpdate::MinSum { scale: 0.8 }, 20).unwrap();
//!
//! let info = [true, false, true, true];
//! let mut codeword = vec![false; 7];
//! gen.encode_frame(&info, &mut codeword);
//!
//! let llrs: Vec<f64> = codeword.iter().map(|&b| if b { -4.0 } else { 4.0 }).collect();
//! let mut out = vec![false; 4];
//! dec.decode(&llrs, &mut out).unwrap();
//! assert_eq!(out, info);
//! ```

use crate::generator::SystematicGenerator;
use crate::parity_check::ParityCheckMatrix;
use crate::stage::{SoftDecoder, StageError, StageFault};

/// Check-node update rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CheckUpdate {
    /// Exact tanh-domain update.
    SumProduct,
    /// Two-minima approximation with a normalization factor.
    MinSum { scale: f64 },
}

/// Iterative decoder over a [`ParityCheckMatrix`].
#[derive(Debug, Clone)]
pub struct BeliefPropagationDecoder {
    h: ParityCheckMatrix,
    info_positions: Vec<usize>,
    update: CheckUpdate,
    max_iterations: usize,
    edge_var: Vec<usize>,
    check_offsets: Vec<usize>,
    var_edges: Vec<Vec<usize>>,
    v2c: Vec<f64>,
    c2v: Vec<f64>,
    posterior: Vec<f64>,
    hard: Vec<bool>,
    tanh_scratch: Vec<f64>,
}

impl BeliefPropagationDecoder {
    /// Build a decoder extracting information bits at `info_positions`.
    pub fn new(
        h: ParityCheckMatrix,
        info_positions: Vec<usize>,
        update: CheckUpdate,
        max_iterations: usize,
    ) -> Result<Self, StageError> {
        let n = h.var_count();
        if max_iterations == 0 {
            return Err(StageError::config(
                "decoder.max_iterations",
                "iteration budget must be at least 1",
            ));
        }
        if let CheckUpdate::MinSum { scale } = update {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(StageError::config(
                    "decoder.scale",
                    format!("min-sum factor must be finite and positive, got {scale}"),
                ));
            }
        }
        let mut seen = vec![false; n];
        for &p in &info_positions {
            if p >= n {
                return Err(StageError::config(
                    "decoder.info_positions",
                    format!("position {p} out of range for N = {n}"),
                ));
            }
            if seen[p] {
                return Err(StageError::config(
                    "decoder.info_positions",
                    format!("position {p} listed twice"),
                ));
            }
            seen[p] = true;
        }

        let mut edge_var = Vec::with_capacity(h.edge_count());
        let mut check_offsets = Vec::with_capacity(h.check_count() + 1);
        let mut var_edges = vec![Vec::new(); n];
        check_offsets.push(0);
        for vars in h.check_rows() {
            for &v in vars {
                var_edges[v].push(edge_var.len());
                edge_var.push(v);
            }
            check_offsets.push(edge_var.len());
        }

        let edges = edge_var.len();
        let max_degree = h.check_rows().iter().map(Vec::len).max().unwrap_or(0);
        Ok(Self {
            h,
            info_positions,
            update,
            max_iterations,
            edge_var,
            check_offsets,
            var_edges,
            v2c: vec![0.0; edges],
            c2v: vec![0.0; edges],
            posterior: vec![0.0; n],
            hard: vec![false; n],
            tanh_scratch: vec![0.0; max_degree],
        })
    }

    /// Build a decoder matched to a systematic generator derived from the
    /// same parity-check matrix.
    pub fn for_generator(
        h: &ParityCheckMatrix,
        generator: &SystematicGenerator,
        update: CheckUpdate,
        max_iterations: usize,
    ) -> Result<Self, StageError> {
        Self::new(
            h.clone(),
            generator.info_bit_positions().to_vec(),
            update,
            max_iterations,
        )
    }

    /// Iteration budget per frame.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    fn update_checks(&mut self) {
        let m = self.h.check_count();
        for c in 0..m {
            let lo = self.check_offsets[c];
            let hi = self.check_offsets[c + 1];
            match self.update {
                CheckUpdate::MinSum { scale } => {
                    let mut sign = 1.0f64;
                    let mut min1 = f64::MAX;
                    let mut min2 = f64::MAX;
                    let mut argmin = lo;
                    for e in lo..hi {
                        let x = self.v2c[e];
                        if x < 0.0 {
                            sign = -sign;
                        }
                        let mag = x.abs();
                        if mag < min1 {
                            min2 = min1;
                            min1 = mag;
                            argmin = e;
                        } else if mag < min2 {
                            min2 = mag;
                        }
                    }
                    for e in lo..hi {
                        let excl_mag = if e == argmin { min2 } else { min1 };
                        let excl_sign = if self.v2c[e] < 0.0 { -sign } else { sign };
                        self.c2v[e] = excl_sign * excl_mag * scale;
                    }
                }
                CheckUpdate::SumProduct => {
                    let degree = hi - lo;
                    let tanh = &mut self.tanh_scratch[..degree];
                    let mut total = 1.0f64;
                    for (t, e) in tanh.iter_mut().zip(lo..hi) {
                        *t = (self.v2c[e] / 2.0).tanh().clamp(-1.0 + 1e-15, 1.0 - 1e-15);
                        total *= *t;
                    }
                    for (i, e) in (lo..hi).enumerate() {
                        let excl = total / tanh[i];
                        self.c2v[e] = 2.0 * excl.clamp(-1.0 + 1e-15, 1.0 - 1e-15).atanh();
                    }
                }
            }
        }
    }
}

impl SoftDecoder for BeliefPropagationDecoder {
    fn info_len(&self) -> usize {
        self.info_positions.len()
    }

    fn codeword_len(&self) -> usize {
        self.h.var_count()
    }

    fn decode(&mut self, llrs: &[f64], info: &mut [bool]) -> Result<(), StageFault> {
        let n = self.h.var_count();
        let k = self.info_positions.len();
        let frames = llrs.len() / n.max(1);

        for f in 0..frames {
            let frame = &llrs[f * n..(f + 1) * n];
            if frame.iter().any(|l| !l.is_finite()) {
                return Err(StageFault::new(
                    "bp-decoder",
                    format!("non-finite LLR in frame {f}"),
                ));
            }

            for e in 0..self.edge_var.len() {
                self.v2c[e] = frame[self.edge_var[e]];
            }

            for _ in 0..self.max_iterations {
                self.update_checks();

                for v in 0..n {
                    let mut total = frame[v];
                    for &e in &self.var_edges[v] {
                        total += self.c2v[e];
                    }
                    self.posterior[v] = total;
                    self.hard[v] = total < 0.0;
                }

                if self.h.is_codeword(&self.hard) {
                    break;
                }

                for e in 0..self.edge_var.len() {
                    self.v2c[e] = self.posterior[self.edge_var[e]] - self.c2v[e];
                }
            }

            let out = &mut info[f * k..(f + 1) * k];
            for (bit, &p) in out.iter_mut().zip(self.info_positions.iter()) {
                *bit = self.hard[p];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (ParityCheckMatrix, SystematicGenerator) {
        let h = ParityCheckMatrix::hamming_7_4();
        let gen = SystematicGenerator::from_parity_check(&h, 4, 7).unwrap();
        (h, gen)
    }

    fn llrs_for(codeword: &[bool], magnitude: f64) -> Vec<f64> {
        codeword
            .iter()
            .map(|&b| if b { -magnitude } else { magnitude })
            .collect()
    }

    #[test]
    fn test_clean_decode_min_sum() {
        let (h, gen) = fixture();
        let mut dec =
            BeliefPropagationDecoder::for_generator(&h, &gen, CheckUpdate::MinSum { scale: 0.8 }, 30)
                .unwrap();

        let mut codeword = vec![false; 7];
        for msg in 0u8..16 {
            let info: Vec<bool> = (0..4).map(|i| (msg >> i) & 1 == 1).collect();
            gen.encode_frame(&info, &mut codeword);
            let llrs = llrs_for(&codeword, 5.0);
            let mut out = vec![false; 4];
            dec.decode(&llrs, &mut out).unwrap();
            assert_eq!(out, info, "message {msg:#06b}");
        }
    }

    #[test]
    fn test_clean_decode_sum_product() {
        let (h, gen) = fixture();
        let mut dec =
            BeliefPropagationDecoder::for_generator(&h, &gen, CheckUpdate::SumProduct, 30).unwrap();

        let info = [false, true, true, false];
        let mut codeword = vec![false; 7];
        gen.encode_frame(&info, &mut codeword);
        let mut out = vec![false; 4];
        dec.decode(&llrs_for(&codeword, 4.0), &mut out).unwrap();
        assert_eq!(out, info);
    }

    #[test]
    fn test_corrects_weakened_bit() {
        let (h, gen) = fixture();
        let mut dec =
            BeliefPropagationDecoder::for_generator(&h, &gen, CheckUpdate::MinSum { scale: 0.8 }, 50)
                .unwrap();

        let info = [true, false, true, false];
        let mut codeword = vec![false; 7];
        gen.encode_frame(&info, &mut codeword);
        let mut llrs = llrs_for(&codeword, 3.0);
        llrs[2] *= -0.4; // flip and weaken one position

        let mut out = vec![false; 4];
        dec.decode(&llrs, &mut out).unwrap();
        assert_eq!(out, info);
    }

    #[test]
    fn test_batched_decode() {
        let (h, gen) = fixture();
        let mut dec =
            BeliefPropagationDecoder::for_generator(&h, &gen, CheckUpdate::MinSum { scale: 0.8 }, 30)
                .unwrap();

        let info_a = [true, true, false, false];
        let info_b = [false, true, false, true];
        let mut cw = vec![false; 14];
        let mut frame_a = vec![false; 7];
        let mut frame_b = vec![false; 7];
        gen.encode_frame(&info_a, &mut frame_a);
        gen.encode_frame(&info_b, &mut frame_b);
        cw[..7].copy_from_slice(&frame_a);
        cw[7..].copy_from_slice(&frame_b);

        let llrs = llrs_for(&cw, 5.0);
        let mut out = vec![false; 8];
        dec.decode(&llrs, &mut out).unwrap();
        assert_eq!(&out[..4], &info_a);
        assert_eq!(&out[4..], &info_b);
    }

    #[test]
    fn test_non_finite_llr_faults() {
        let (h, gen) = fixture();
        let mut dec =
            BeliefPropagationDecoder::for_generator(&h, &gen, CheckUpdate::MinSum { scale: 0.8 }, 10)
                .unwrap();
        let mut llrs = vec![1.0; 7];
        llrs[3] = f64::NAN;
        let mut out = vec![false; 4];
        let fault = dec.decode(&llrs, &mut out).unwrap_err();
        assert_eq!(fault.stage, "bp-decoder");
    }

    #[test]
    fn test_rejects_bad_construction() {
        let h = ParityCheckMatrix::hamming_7_4();
        assert!(BeliefPropagationDecoder::new(
            h.clone(),
            vec![0, 1, 2, 9],
            CheckUpdate::SumProduct,
            10
        )
        .is_err());
        assert!(BeliefPropagationDecoder::new(
            h.clone(),
            vec![0, 0, 1, 2],
            CheckUpdate::SumProduct,
            10
        )
        .is_err());
        assert!(
            BeliefPropagationDecoder::new(h.clone(), vec![0, 1], CheckUpdate::SumProduct, 0).is_err()
        );
        assert!(BeliefPropagationDecoder::new(
            h,
            vec![0, 1],
            CheckUpdate::MinSum { scale: -1.0 },
            10
        )
        .is_err());
    }

    #[test]
    fn test_min_sum_and_sum_product_agree_clean() {
        let (h, gen) = fixture();
        let info = [true, false, false, true];
        let mut codeword = vec![false; 7];
        gen.encode_frame(&info, &mut codeword);
        let llrs = llrs_for(&codeword, 6.0);

        let mut ms =
            BeliefPropagationDecoder::for_generator(&h, &gen, CheckUpdate::MinSum { scale: 0.8 }, 30)
                .unwrap();
        let mut sp =
            BeliefPropagationDecoder::for_generator(&h, &gen, CheckUpdate::SumProduct, 30).unwrap();

        let mut out_ms = vec![false; 4];
        let mut out_sp = vec![false; 4];
        ms.decode(&llrs, &mut out_ms).unwrap();
        sp.decode(&llrs, &mut out_sp).unwrap();
        assert_eq!(out_ms, out_sp);
        assert_eq!(out_ms, info.to_vec());
    }
}
