//! BPSK Modem — antipodal mapping and soft demodulation
//!
//! Maps bit 0 to `+1` and bit 1 to `-1` on the real axis of the complex
//! baseband, one bit per symbol. Demodulation produces LLRs scaled by the
//! channel noise variance: `llr = 2 * re(y) / sigma^2`, positive meaning
//! "more likely 0". With a noiseless channel the scale saturates to a large
//! finite constant so that loopback chains stay on finite arithmetic.
//!
//! ## Example
//!
//! ```rust
//! use fecsim_core::modem::BpskModem;
//! use fecsim_core::stage::Modem;
//!
//! let modem = BpskModem::new(0.5).unwrap();
//! let bits = [false, true, true, false];
//! let mut symbols = vec![num_complex::Complex64::new(0.0, 0.0); 4];
//! modem.modulate(&bits, &mut symbols);
//! assert_eq!(symbols[0].re, 1.0);
//! assert_eq!(symbols[1].re, -1.0);
//!
//! let mut llrs = vec![0.0; 4];
//! modem.demodulate(&symbols, &mut llrs);
//! assert!(llrs[0] > 0.0 && llrs[1] < 0.0);
//! ```

use num_complex::Complex64;

use crate::stage::{Modem, StageError};

/// LLR scale used when sigma is exactly zero (noiseless loopback).
const NOISELESS_LLR_SCALE: f64 = 1.0e12;

/// Binary phase-shift keying modem.
#[derive(Debug, Clone, PartialEq)]
pub struct BpskModem {
    sigma: f64,
    llr_scale: f64,
}

impl BpskModem {
    /// Create a modem for a channel with per-component noise deviation
    /// `sigma`. `sigma` must be finite and non-negative; zero selects the
    /// saturated noiseless LLR scale.
    pub fn new(sigma: f64) -> Result<Self, StageError> {
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(StageError::config(
                "modem.sigma",
                format!("noise deviation must be finite and >= 0, got {sigma}"),
            ));
        }
        let llr_scale = if sigma > 0.0 {
            2.0 / (sigma * sigma)
        } else {
            NOISELESS_LLR_SCALE
        };
        Ok(Self { sigma, llr_scale })
    }

    /// The configured noise deviation.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl Modem for BpskModem {
    fn bits_per_symbol(&self) -> usize {
        1
    }

    fn symbols_for(&self, coded_bits: usize) -> usize {
        coded_bits
    }

    fn modulate(&self, bits: &[bool], symbols: &mut [Complex64]) {
        for (bit, sym) in bits.iter().zip(symbols.iter_mut()) {
            *sym = Complex64::new(if *bit { -1.0 } else { 1.0 }, 0.0);
        }
    }

    fn demodulate(&self, symbols: &[Complex64], llrs: &mut [f64]) {
        for (sym, llr) in symbols.iter().zip(llrs.iter_mut()) {
            *llr = sym.re * self.llr_scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative_sigma() {
        assert!(BpskModem::new(-0.1).is_err());
        assert!(BpskModem::new(f64::NAN).is_err());
    }

    #[test]
    fn test_antipodal_mapping() {
        let modem = BpskModem::new(1.0).unwrap();
        let bits = [false, true];
        let mut symbols = vec![Complex64::new(0.0, 0.0); 2];
        modem.modulate(&bits, &mut symbols);
        assert_eq!(symbols[0], Complex64::new(1.0, 0.0));
        assert_eq!(symbols[1], Complex64::new(-1.0, 0.0));
    }

    #[test]
    fn test_llr_scale() {
        let modem = BpskModem::new(0.5).unwrap();
        let symbols = [Complex64::new(0.8, 0.3)];
        let mut llrs = [0.0];
        modem.demodulate(&symbols, &mut llrs);
        // 2 * 0.8 / 0.25
        assert!((llrs[0] - 6.4).abs() < 1e-12);
    }

    #[test]
    fn test_noiseless_llrs_finite() {
        let modem = BpskModem::new(0.0).unwrap();
        let symbols = [Complex64::new(1.0, 0.0), Complex64::new(-1.0, 0.0)];
        let mut llrs = [0.0; 2];
        modem.demodulate(&symbols, &mut llrs);
        assert!(llrs.iter().all(|l| l.is_finite()));
        assert!(llrs[0] > 0.0 && llrs[1] < 0.0);
    }

    #[test]
    fn test_one_bit_per_symbol() {
        let modem = BpskModem::new(1.0).unwrap();
        assert_eq!(modem.bits_per_symbol(), 1);
        assert_eq!(modem.symbols_for(128), 128);
    }
}
