//! Error-Rate Curves — turning point reports into BER/FER data
//!
//! Collects completed noise-point records into a curve, exports CSV for
//! plotting, attaches normal-approximation confidence intervals to the
//! measured rates, and provides the theoretical uncoded BPSK reference
//! `0.5 * erfc(sqrt(Eb/N0))` for sanity overlays.
//!
//! ## Example
//!
//! ```rust
//! use fecsim_core::ber::ErrorRateCurve;
//!
//! let reference = ErrorRateCurve::theoretical_bpsk(&[0.0, 4.0, 8.0]);
//! assert!(reference[0].1 > reference[1].1);
//! assert!((reference[0].1 - 0.0786).abs() < 0.01);
//! ```

use serde::{Deserialize, Serialize};

use crate::simulation::SnrPointReport;

/// One row of a measured error-rate curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub snr_db: f64,
    pub frames: u64,
    pub frame_errors: u64,
    pub bit_errors: u64,
    pub ber: f64,
    pub fer: f64,
}

/// Measured BER/FER curve over a sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorRateCurve {
    points: Vec<CurvePoint>,
}

impl ErrorRateCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a curve from completed point reports.
    pub fn from_reports(reports: &[SnrPointReport]) -> Self {
        let points = reports
            .iter()
            .map(|r| CurvePoint {
                snr_db: r.snr_db,
                frames: r.counters.frames,
                frame_errors: r.counters.frame_errors,
                bit_errors: r.counters.bit_errors,
                ber: r.ber(),
                fer: r.fer(),
            })
            .collect();
        Self { points }
    }

    /// Append one row.
    pub fn push(&mut self, point: CurvePoint) {
        self.points.push(point);
    }

    /// All rows, in sweep order.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// CSV export, one row per noise point.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("snr_db,frames,frame_errors,bit_errors,ber,fer\n");
        for p in &self.points {
            csv.push_str(&format!(
                "{:.2},{},{},{},{:.10},{:.10}\n",
                p.snr_db, p.frames, p.frame_errors, p.bit_errors, p.ber, p.fer
            ));
        }
        csv
    }

    /// Theoretical uncoded BPSK BER over AWGN for the given Eb/N0 levels.
    pub fn theoretical_bpsk(ebn0_db: &[f64]) -> Vec<(f64, f64)> {
        ebn0_db
            .iter()
            .map(|&snr| {
                let ebn0 = 10f64.powf(snr / 10.0);
                (snr, 0.5 * erfc(ebn0.sqrt()))
            })
            .collect()
    }
}

/// Normal-approximation confidence interval on a measured error rate.
///
/// `errors` out of `trials`, at confidence 0.90, 0.95 or 0.99 (other values
/// use a probit approximation). Returns `(lower, upper)` clipped to [0, 1].
pub fn confidence_interval(errors: u64, trials: u64, confidence: f64) -> (f64, f64) {
    if trials == 0 {
        return (0.0, 1.0);
    }
    let p = errors as f64 / trials as f64;
    let n = trials as f64;
    let z = z_score(confidence);
    let margin = z * (p * (1.0 - p) / n).sqrt();
    ((p - margin).max(0.0), (p + margin).min(1.0))
}

fn z_score(confidence: f64) -> f64 {
    match () {
        _ if (confidence - 0.90).abs() < 0.001 => 1.645,
        _ if (confidence - 0.95).abs() < 0.001 => 1.960,
        _ if (confidence - 0.99).abs() < 0.001 => 2.576,
        _ => {
            // Rational probit approximation.
            let p = (1.0 - confidence) / 2.0;
            let t = (-2.0 * p.ln()).sqrt();
            t - (2.515517 + 0.802853 * t + 0.010328 * t * t)
                / (1.0 + 1.432788 * t + 0.189269 * t * t + 0.001308 * t * t * t)
        }
    }
}

/// Complementary error function (Abramowitz & Stegun 7.1.26).
pub fn erfc(x: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.3275911 * x.abs());
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    let result = poly * (-x * x).exp();
    if x >= 0.0 {
        result
    } else {
        2.0 - result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{FrameCounters, StopReason};
    use std::time::Duration;

    fn report(snr_db: f64, frames: u64, fe: u64, be: u64) -> SnrPointReport {
        SnrPointReport {
            snr_db,
            ebn0_db: snr_db,
            esn0_db: snr_db,
            sigma: 1.0,
            counters: FrameCounters {
                frames,
                frame_errors: fe,
                bit_errors: be,
            },
            info_bits_per_frame: 100,
            elapsed: Duration::from_secs(1),
            termination: StopReason::TargetReached,
            termination_tag: "frame-error-target".to_string(),
        }
    }

    #[test]
    fn test_curve_from_reports() {
        let reports = vec![report(0.0, 1_000, 100, 500), report(1.0, 10_000, 100, 800)];
        let curve = ErrorRateCurve::from_reports(&reports);
        assert_eq!(curve.points().len(), 2);
        assert!((curve.points()[0].fer - 0.1).abs() < 1e-12);
        assert!((curve.points()[0].ber - 500.0 / 100_000.0).abs() < 1e-12);
    }

    #[test]
    fn test_csv_header_and_rows() {
        let curve = ErrorRateCurve::from_reports(&[report(2.5, 100, 10, 42)]);
        let csv = curve.to_csv();
        assert!(csv.starts_with("snr_db,frames,frame_errors,bit_errors,ber,fer\n"));
        assert!(csv.contains("2.50,100,10,42"));
    }

    #[test]
    fn test_erfc_anchors() {
        assert!((erfc(0.0) - 1.0).abs() < 1e-6);
        assert!(erfc(5.0) < 1e-10);
        assert!((erfc(-5.0) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_theoretical_bpsk_monotone() {
        let curve = ErrorRateCurve::theoretical_bpsk(&[0.0, 2.0, 4.0, 6.0, 8.0]);
        for pair in curve.windows(2) {
            assert!(pair[1].1 < pair[0].1);
        }
        // Known anchor: ~7.86e-2 at 0 dB.
        assert!((curve[0].1 - 0.0786).abs() < 0.01);
    }

    #[test]
    fn test_confidence_interval_brackets_estimate() {
        let (lo, hi) = confidence_interval(10, 100, 0.95);
        assert!(lo < 0.1 && 0.1 < hi);
        assert!(lo > 0.0 && hi < 0.5);
    }

    #[test]
    fn test_confidence_interval_empty() {
        assert_eq!(confidence_interval(0, 0, 0.95), (0.0, 1.0));
    }

    #[test]
    fn test_confidence_tightens_with_trials() {
        let (lo_a, hi_a) = confidence_interval(10, 100, 0.95);
        let (lo_b, hi_b) = confidence_interval(100, 1_000, 0.95);
        assert!(hi_b - lo_b < hi_a - lo_a);
    }
}
