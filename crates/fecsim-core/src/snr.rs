//! Noise Sweep — SNR conventions and derived noise deviation
//!
//! A sweep is an ordered list of SNR levels in dB plus the convention they
//! are expressed in: energy per channel symbol (Es/N0) or energy per
//! information bit (Eb/N0). Each level resolves to an [`SnrPoint`] carrying
//! both views and the AWGN per-component deviation
//! `sigma = sqrt(1 / (2 * 10^(Es/N0 / 10)))` for unit-energy symbols.
//!
//! ## Example
//!
//! ```rust
//! use fecsim_core::snr::{SnrSweep, SnrType};
//!
//! let sweep = SnrSweep::from_range(0.0, 2.0, 0.5, SnrType::InfoBitEnergy).unwrap();
//! let points = sweep.points(0.5, 1); // rate-1/2 code, BPSK
//! assert_eq!(points.len(), 5);
//! // Eb/N0 0 dB at rate 1/2 is Es/N0 ≈ -3.01 dB
//! assert!((points[0].esn0_db + 3.0103).abs() < 1e-3);
//! ```

use serde::{Deserialize, Serialize};

use crate::stage::StageError;

/// Which energy normalization the configured SNR levels use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnrType {
    /// Levels are Es/N0: energy per transmitted symbol.
    #[serde(rename = "es")]
    SymbolEnergy,
    /// Levels are Eb/N0: energy per information bit.
    #[serde(rename = "eb")]
    InfoBitEnergy,
}

/// Convert Eb/N0 to Es/N0 for a given code rate and modulation order.
pub fn ebn0_to_esn0(ebn0_db: f64, code_rate: f64, bits_per_symbol: usize) -> f64 {
    ebn0_db + 10.0 * (code_rate * bits_per_symbol as f64).log10()
}

/// Convert Es/N0 back to Eb/N0.
pub fn esn0_to_ebn0(esn0_db: f64, code_rate: f64, bits_per_symbol: usize) -> f64 {
    esn0_db - 10.0 * (code_rate * bits_per_symbol as f64).log10()
}

/// Per-component AWGN deviation for unit-energy symbols at `esn0_db`.
pub fn esn0_to_sigma(esn0_db: f64) -> f64 {
    (1.0 / (2.0 * 10f64.powf(esn0_db / 10.0))).sqrt()
}

/// One resolved level of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnrPoint {
    /// The configured level, in the sweep's convention.
    pub snr_db: f64,
    /// Information-bit energy view.
    pub ebn0_db: f64,
    /// Symbol energy view.
    pub esn0_db: f64,
    /// Derived AWGN per-component deviation.
    pub sigma: f64,
}

impl SnrPoint {
    /// Resolve one configured level.
    pub fn resolve(
        snr_db: f64,
        snr_type: SnrType,
        code_rate: f64,
        bits_per_symbol: usize,
    ) -> Self {
        let (ebn0_db, esn0_db) = match snr_type {
            SnrType::SymbolEnergy => (
                esn0_to_ebn0(snr_db, code_rate, bits_per_symbol),
                snr_db,
            ),
            SnrType::InfoBitEnergy => (
                snr_db,
                ebn0_to_esn0(snr_db, code_rate, bits_per_symbol),
            ),
        };
        Self {
            snr_db,
            ebn0_db,
            esn0_db,
            sigma: esn0_to_sigma(esn0_db),
        }
    }
}

/// Ordered list of SNR levels with their convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnrSweep {
    levels: Vec<f64>,
    snr_type: SnrType,
}

impl SnrSweep {
    /// Sweep over an explicit list of levels.
    pub fn from_levels(levels: Vec<f64>, snr_type: SnrType) -> Self {
        Self { levels, snr_type }
    }

    /// Sweep from `min` to `max` inclusive in `step` increments.
    pub fn from_range(
        min_db: f64,
        max_db: f64,
        step_db: f64,
        snr_type: SnrType,
    ) -> Result<Self, StageError> {
        if !step_db.is_finite() || step_db <= 0.0 {
            return Err(StageError::config(
                "snr.step",
                format!("step must be finite and positive, got {step_db}"),
            ));
        }
        if !min_db.is_finite() || !max_db.is_finite() || max_db < min_db {
            return Err(StageError::config(
                "snr.range",
                format!("invalid range {min_db}..{max_db}"),
            ));
        }
        let mut levels = Vec::new();
        let mut snr = min_db;
        // Half-step slack keeps the top level in despite rounding drift.
        while snr <= max_db + step_db / 2.0 {
            levels.push(snr);
            snr += step_db;
        }
        Ok(Self { levels, snr_type })
    }

    /// The configured levels.
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// The configured convention.
    pub fn snr_type(&self) -> SnrType {
        self.snr_type
    }

    /// Resolve every level for a given code rate and modulation order.
    pub fn points(&self, code_rate: f64, bits_per_symbol: usize) -> Vec<SnrPoint> {
        self.levels
            .iter()
            .map(|&snr| SnrPoint::resolve(snr, self.snr_type, code_rate, bits_per_symbol))
            .collect()
    }
}
