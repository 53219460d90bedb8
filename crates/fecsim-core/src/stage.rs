//! Chain Stage Contract — processing interfaces for the coded link
//!
//! Every element of a simulated transmission chain (source, encoder, modem,
//! channel, decoder) implements one of the traits below. Stage methods
//! operate on flat buffers holding one batch of frames: a buffer of length
//! `frames * per_frame_len`, with frames laid out back to back. Stages are
//! deterministic given their input buffers and internal PRNG state; a stage
//! may advance its own PRNG as a side effect but never touches another
//! stage's state.
//!
//! Size consistency between stages is checked once, when the chain is
//! assembled, and never on the per-frame path. An inconsistent setup is a
//! [`StageError::Configuration`] carrying the offending field.

use num_complex::Complex64;
use std::fmt;

/// Construction-time stage or chain configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// A stage parameter or a pair of neighbouring stages is inconsistent.
    Configuration {
        /// The configuration field at fault.
        field: &'static str,
        /// Human-readable description of the inconsistency.
        message: String,
    },
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Configuration { field, message } => {
                write!(f, "invalid configuration for `{field}`: {message}")
            }
        }
    }
}

impl std::error::Error for StageError {}

impl StageError {
    /// Shorthand used by stage constructors and the chain builder.
    pub fn config(field: &'static str, message: impl Into<String>) -> Self {
        StageError::Configuration {
            field,
            message: message.into(),
        }
    }
}

/// Runtime fault raised by a stage while processing a batch.
///
/// Faults are rare (numeric faults, exhausted resources). They abort the
/// sweep: the scheduler cancels the remaining workers cooperatively and
/// reports the fault with its frame context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFault {
    /// Name of the stage that faulted.
    pub stage: &'static str,
    /// What went wrong.
    pub message: String,
}

impl StageFault {
    pub fn new(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for StageFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage `{}` faulted: {}", self.stage, self.message)
    }
}

impl std::error::Error for StageFault {}

/// Produces information bits, one batch of frames at a time.
pub trait BitSource: Send {
    /// Fill `bits` (length `frames * payload_len`) with fresh data.
    fn generate(&mut self, bits: &mut [bool]);
}

/// Maps information frames to codewords.
pub trait FrameEncoder: Send {
    /// Information bits per frame (K).
    fn info_len(&self) -> usize;

    /// Coded bits per frame (N).
    fn codeword_len(&self) -> usize;

    /// Encode `frames` back-to-back information frames into codewords.
    ///
    /// `info.len()` is a multiple of [`Self::info_len`] and `codeword.len()`
    /// the matching multiple of [`Self::codeword_len`].
    fn encode(&self, info: &[bool], codeword: &mut [bool]);
}

/// Maps coded bits to channel symbols and received symbols to LLRs.
///
/// The LLR sign convention follows the decoders in this crate: positive
/// means "more likely 0", negative "more likely 1".
pub trait Modem: Send {
    /// Bits carried per channel symbol.
    fn bits_per_symbol(&self) -> usize;

    /// Number of symbols produced for `coded_bits` input bits.
    fn symbols_for(&self, coded_bits: usize) -> usize;

    /// Modulate a batch of coded bits into I/Q symbols.
    fn modulate(&self, bits: &[bool], symbols: &mut [Complex64]);

    /// Demodulate received symbols into per-bit LLRs.
    fn demodulate(&self, symbols: &[Complex64], llrs: &mut [f64]);
}

/// Applies channel impairments to a batch of symbols.
pub trait TransmissionChannel: Send {
    /// Write the received symbols for `input` into `output`.
    ///
    /// Advances the channel's private noise generator.
    fn transmit(&mut self, input: &[Complex64], output: &mut [Complex64]);
}

/// Recovers information bits from soft channel values.
pub trait SoftDecoder: Send {
    /// Information bits per frame (K). Must match the encoder.
    fn info_len(&self) -> usize;

    /// Coded bits per frame (N). Must match the encoder.
    fn codeword_len(&self) -> usize;

    /// Decode a batch of LLR frames into information bits.
    ///
    /// `llrs.len()` is a multiple of [`Self::codeword_len`]; `info` receives
    /// the matching multiple of [`Self::info_len`] bits.
    fn decode(&mut self, llrs: &[f64], info: &mut [bool]) -> Result<(), StageFault>;
}
