//! LLR Quantizer — saturating uniform quantization of soft values
//!
//! Emulates fixed-point receiver front-ends: LLRs are clipped to a dynamic
//! range and snapped to a uniform grid of `2^bits` levels before they reach
//! the decoder.
//!
//! ## Example
//!
//! ```rust
//! use fecsim_core::quantizer::LlrQuantizer;
//!
//! let q = LlrQuantizer::new(4, 8.0).unwrap();
//! assert_eq!(q.quantize(100.0), 7.0);   // saturates at +(range - step)
//! assert_eq!(q.quantize(-100.0), -8.0); // and at -range
//! assert_eq!(q.quantize(0.4), 0.0);     // snaps to the grid
//! ```

use crate::stage::StageError;

/// Uniform mid-tread quantizer with saturation.
#[derive(Debug, Clone, PartialEq)]
pub struct LlrQuantizer {
    bits: u32,
    range: f64,
    step: f64,
    max_level: i64,
    min_level: i64,
}

impl LlrQuantizer {
    /// `bits` in 2..=16 total quantizer bits; `range` the saturation
    /// magnitude (positive, finite).
    pub fn new(bits: u32, range: f64) -> Result<Self, StageError> {
        if !(2..=16).contains(&bits) {
            return Err(StageError::config(
                "quantizer.bits",
                format!("bit depth must be in 2..=16, got {bits}"),
            ));
        }
        if !range.is_finite() || range <= 0.0 {
            return Err(StageError::config(
                "quantizer.range",
                format!("range must be finite and positive, got {range}"),
            ));
        }
        let half = 1i64 << (bits - 1);
        let step = range / half as f64;
        Ok(Self {
            bits,
            range,
            step,
            max_level: half - 1,
            min_level: -half,
        })
    }

    /// Total quantizer bits.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Saturation magnitude.
    pub fn range(&self) -> f64 {
        self.range
    }

    /// Quantize one value.
    pub fn quantize(&self, llr: f64) -> f64 {
        let level = (llr / self.step).round() as i64;
        let level = level.clamp(self.min_level, self.max_level);
        level as f64 * self.step
    }

    /// Quantize a batch in place.
    pub fn quantize_in_place(&self, llrs: &mut [f64]) {
        for llr in llrs.iter_mut() {
            *llr = self.quantize(*llr);
        }
    }
}
