//! Uncoded Pass-Through — identity encoder and hard-decision slicer
//!
//! The rate-1 baseline: codeword equals message, decoding is a sign
//! decision per LLR. Useful for calibrating a chain against theoretical
//! uncoded BER and as the lightest stage pair in scheduler tests.

use crate::stage::{FrameEncoder, SoftDecoder, StageError, StageFault};

/// Identity encoder, K = N.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncodedEncoder {
    len: usize,
}

impl UncodedEncoder {
    pub fn new(len: usize) -> Result<Self, StageError> {
        if len == 0 {
            return Err(StageError::config(
                "uncoded.len",
                "frame length must be positive",
            ));
        }
        Ok(Self { len })
    }
}

impl FrameEncoder for UncodedEncoder {
    fn info_len(&self) -> usize {
        self.len
    }

    fn codeword_len(&self) -> usize {
        self.len
    }

    fn encode(&self, info: &[bool], codeword: &mut [bool]) {
        codeword.copy_from_slice(info);
    }
}

/// Sign slicer: negative LLR decides bit 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardDecisionDecoder {
    len: usize,
}

impl HardDecisionDecoder {
    pub fn new(len: usize) -> Result<Self, StageError> {
        if len == 0 {
            return Err(StageError::config(
                "uncoded.len",
                "frame length must be positive",
            ));
        }
        Ok(Self { len })
    }
}

impl SoftDecoder for HardDecisionDecoder {
    fn info_len(&self) -> usize {
        self.len
    }

    fn codeword_len(&self) -> usize {
        self.len
    }

    fn decode(&mut self, llrs: &[f64], info: &mut [bool]) -> Result<(), StageFault> {
        for (llr, bit) in llrs.iter().zip(info.iter_mut()) {
            *bit = *llr < 0.0;
        }
        Ok(())
    }
}
