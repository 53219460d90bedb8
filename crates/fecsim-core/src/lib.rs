//! # fecsim-core — Monte-Carlo error-rate engine for coded links
//!
//! This crate measures the bit and frame error rate of forward-error-
//! correction chains (encoder → modulator → channel → demodulator →
//! decoder) over a sweep of noise levels. Worker threads each own a private
//! chain instance and deterministic PRNG streams; thread-local error
//! counters are periodically reduced into a shared monitor whose stopping
//! predicate decides when a noise point has collected enough frame errors.
//!
//! ## Signal flow
//!
//! ```text
//! source → [crc] → encoder → [interleaver] → modem → channel
//!        → demod → [quantizer] → [deinterleave] → decoder → monitor
//! ```
//!
//! Optional stages in brackets. Every stage family sits behind a trait in
//! [`stage`], so concrete codecs and modems plug into the same chain.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fecsim_core::chain::ChainBuilder;
//! use fecsim_core::channel::AwgnChannel;
//! use fecsim_core::decoder::{BeliefPropagationDecoder, CheckUpdate};
//! use fecsim_core::generator::SystematicGenerator;
//! use fecsim_core::modem::BpskModem;
//! use fecsim_core::parity_check::ParityCheckMatrix;
//! use fecsim_core::simulation::{MonteCarloSimulator, SimConfig};
//! use fecsim_core::snr::{SnrSweep, SnrType};
//! use fecsim_core::source::RandomSource;
//!
//! let h = ParityCheckMatrix::hamming_7_4();
//! let sweep = SnrSweep::from_range(0.0, 4.0, 0.5, SnrType::InfoBitEnergy).unwrap();
//! let points = sweep.points(4.0 / 7.0, 1);
//!
//! let sim = MonteCarloSimulator::new(SimConfig {
//!     max_frame_errors: 100,
//!     seed: 42,
//!     ..Default::default()
//! });
//!
//! let report = sim
//!     .run(&points, |point, seed| {
//!         let gen = SystematicGenerator::from_parity_check(&h, 4, 7)
//!             .map_err(|e| fecsim_core::stage::StageError::config("encoder", e.to_string()))?;
//!         let dec = BeliefPropagationDecoder::for_generator(
//!             &h, &gen, CheckUpdate::MinSum { scale: 0.8 }, 30)?;
//!         ChainBuilder::new()
//!             .source(Box::new(RandomSource::new(seed.stream(1))))
//!             .encoder(Box::new(gen))
//!             .modem(Box::new(BpskModem::new(point.sigma)?))
//!             .channel(Box::new(AwgnChannel::new(point.sigma, seed.stream(2))?))
//!             .decoder(Box::new(dec))
//!             .build()
//!     })
//!     .unwrap();
//!
//! for point in &report.points {
//!     println!("{:.2} dB: BER {:.3e} FER {:.3e}", point.snr_db, point.ber(), point.fer());
//! }
//! ```

pub mod ber;
pub mod chain;
pub mod channel;
pub mod crc;
pub mod decoder;
pub mod generator;
pub mod interleaver;
pub mod logging;
pub mod modem;
pub mod monitor;
pub mod parity_check;
pub mod quantizer;
pub mod simulation;
pub mod snr;
pub mod source;
pub mod stage;
pub mod uncoded;

pub use ber::ErrorRateCurve;
pub use chain::{Chain, ChainBuilder};
pub use channel::AwgnChannel;
pub use decoder::{BeliefPropagationDecoder, CheckUpdate};
pub use generator::{GeneratorError, SystematicGenerator};
pub use modem::BpskModem;
pub use monitor::{FrameCounters, GlobalMonitor, StopCriteria, StopReason};
pub use parity_check::ParityCheckMatrix;
pub use simulation::{
    BenchmarkReport, ChainSeed, MonteCarloSimulator, SimConfig, SimulationError, SimulationReport,
    SnrPointReport,
};
pub use snr::{SnrPoint, SnrSweep, SnrType};
pub use source::RandomSource;
pub use stage::{StageError, StageFault};
