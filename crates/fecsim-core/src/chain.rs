//! Transmission Chain — one complete encode–transmit–decode path
//!
//! A chain owns its stages and the buffers between them; nothing is shared
//! across threads. Stage dimensions are reconciled once in
//! [`ChainBuilder::build`] — a mismatch is a [`StageError::Configuration`]
//! before the first frame is simulated, and nothing is re-validated on the
//! per-frame path. Buffers are allocated for one batch
//! (`frames_per_batch` frames) and reused for the lifetime of the chain.
//!
//! Stage order: source → (crc) → encoder → (interleaver) → modem → channel
//! → demodulation → (quantizer) → (deinterleave) → decoder → error count.
//!
//! ## Example
//!
//! ```rust
//! use fecsim_core::chain::ChainBuilder;
//! use fecsim_core::channel::AwgnChannel;
//! use fecsim_core::modem::BpskModem;
//! use fecsim_core::monitor::FrameCounters;
//! use fecsim_core::source::RandomSource;
//! use fecsim_core::uncoded::{HardDecisionDecoder, UncodedEncoder};
//!
//! let mut chain = ChainBuilder::new()
//!     .source(Box::new(RandomSource::new(1)))
//!     .encoder(Box::new(UncodedEncoder::new(32).unwrap()))
//!     .modem(Box::new(BpskModem::new(0.0).unwrap()))
//!     .channel(Box::new(AwgnChannel::new(0.0, 2).unwrap()))
//!     .decoder(Box::new(HardDecisionDecoder::new(32).unwrap()))
//!     .build()
//!     .unwrap();
//!
//! let mut counters = FrameCounters::default();
//! chain.simulate_batch(&mut counters).unwrap();
//! assert_eq!(counters.frames, 1);
//! assert_eq!(counters.frame_errors, 0); // noiseless loopback
//! ```

use num_complex::Complex64;
use tracing::debug;

use crate::crc::FrameCrc;
use crate::interleaver::BlockInterleaver;
use crate::monitor::FrameCounters;
use crate::quantizer::LlrQuantizer;
use crate::stage::{
    BitSource, FrameEncoder, Modem, SoftDecoder, StageError, StageFault, TransmissionChannel,
};

/// Assembles and validates a [`Chain`].
pub struct ChainBuilder {
    source: Option<Box<dyn BitSource>>,
    crc: Option<FrameCrc>,
    encoder: Option<Box<dyn FrameEncoder>>,
    interleaver: Option<BlockInterleaver>,
    modem: Option<Box<dyn Modem>>,
    channel: Option<Box<dyn TransmissionChannel>>,
    quantizer: Option<LlrQuantizer>,
    decoder: Option<Box<dyn SoftDecoder>>,
    frames_per_batch: usize,
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            crc: None,
            encoder: None,
            interleaver: None,
            modem: None,
            channel: None,
            quantizer: None,
            decoder: None,
            frames_per_batch: 1,
        }
    }

    pub fn source(mut self, source: Box<dyn BitSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn crc(mut self, crc: FrameCrc) -> Self {
        self.crc = Some(crc);
        self
    }

    pub fn encoder(mut self, encoder: Box<dyn FrameEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn interleaver(mut self, interleaver: BlockInterleaver) -> Self {
        self.interleaver = Some(interleaver);
        self
    }

    pub fn modem(mut self, modem: Box<dyn Modem>) -> Self {
        self.modem = Some(modem);
        self
    }

    pub fn channel(mut self, channel: Box<dyn TransmissionChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn quantizer(mut self, quantizer: LlrQuantizer) -> Self {
        self.quantizer = Some(quantizer);
        self
    }

    pub fn decoder(mut self, decoder: Box<dyn SoftDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Frames processed together per batch (inter-frame level).
    pub fn frames_per_batch(mut self, frames: usize) -> Self {
        self.frames_per_batch = frames;
        self
    }

    /// Reconcile stage dimensions and allocate the batch buffers.
    pub fn build(self) -> Result<Chain, StageError> {
        let source = self
            .source
            .ok_or_else(|| StageError::config("source", "no bit source supplied"))?;
        let encoder = self
            .encoder
            .ok_or_else(|| StageError::config("encoder", "no encoder supplied"))?;
        let modem = self
            .modem
            .ok_or_else(|| StageError::config("modem", "no modem supplied"))?;
        let channel = self
            .channel
            .ok_or_else(|| StageError::config("channel", "no channel supplied"))?;
        let decoder = self
            .decoder
            .ok_or_else(|| StageError::config("decoder", "no decoder supplied"))?;

        if self.frames_per_batch == 0 {
            return Err(StageError::config(
                "frames_per_batch",
                "batch must hold at least one frame",
            ));
        }

        let k = encoder.info_len();
        let n = encoder.codeword_len();
        if k == 0 || n == 0 || k > n {
            return Err(StageError::config(
                "encoder",
                format!("inconsistent encoder dimensions K = {k}, N = {n}"),
            ));
        }
        if decoder.info_len() != k {
            return Err(StageError::config(
                "decoder",
                format!(
                    "decoder K = {} does not match encoder K = {k}",
                    decoder.info_len()
                ),
            ));
        }
        if decoder.codeword_len() != n {
            return Err(StageError::config(
                "decoder",
                format!(
                    "decoder N = {} does not match encoder N = {n}",
                    decoder.codeword_len()
                ),
            ));
        }
        let payload = match &self.crc {
            Some(crc) if crc.width() >= k => {
                return Err(StageError::config(
                    "crc",
                    format!("checksum width {} leaves no payload in K = {k}", crc.width()),
                ));
            }
            Some(crc) => k - crc.width(),
            None => k,
        };
        if let Some(il) = &self.interleaver {
            if il.len() != n {
                return Err(StageError::config(
                    "interleaver",
                    format!("permutation length {} does not match N = {n}", il.len()),
                ));
            }
        }

        let frames = self.frames_per_batch;
        let symbols = modem.symbols_for(n);
        Ok(Chain {
            source,
            crc: self.crc,
            encoder,
            interleaver: self.interleaver,
            modem,
            channel,
            quantizer: self.quantizer,
            decoder,
            frames,
            payload,
            k,
            n,
            trace_limit: None,
            trace: false,
            src_bits: vec![false; frames * payload],
            enc_in: vec![false; frames * k],
            coded: vec![false; frames * n],
            tx_bits: vec![false; frames * n],
            tx_symbols: vec![Complex64::new(0.0, 0.0); frames * symbols],
            rx_symbols: vec![Complex64::new(0.0, 0.0); frames * symbols],
            raw_llrs: vec![0.0; frames * n],
            llrs: vec![0.0; frames * n],
            decoded: vec![false; frames * k],
        })
    }
}

/// One worker's private transmission chain.
pub struct Chain {
    source: Box<dyn BitSource>,
    crc: Option<FrameCrc>,
    encoder: Box<dyn FrameEncoder>,
    interleaver: Option<BlockInterleaver>,
    modem: Box<dyn Modem>,
    channel: Box<dyn TransmissionChannel>,
    quantizer: Option<LlrQuantizer>,
    decoder: Box<dyn SoftDecoder>,
    frames: usize,
    payload: usize,
    k: usize,
    n: usize,
    trace: bool,
    trace_limit: Option<usize>,
    src_bits: Vec<bool>,
    enc_in: Vec<bool>,
    coded: Vec<bool>,
    tx_bits: Vec<bool>,
    tx_symbols: Vec<Complex64>,
    rx_symbols: Vec<Complex64>,
    raw_llrs: Vec<f64>,
    llrs: Vec<f64>,
    decoded: Vec<bool>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("frames", &self.frames)
            .field("payload", &self.payload)
            .field("k", &self.k)
            .field("n", &self.n)
            .field("trace", &self.trace)
            .field("trace_limit", &self.trace_limit)
            .finish_non_exhaustive()
    }
}

impl Chain {
    /// Information bits generated by the source per frame (K minus the CRC).
    pub fn payload_len(&self) -> usize {
        self.payload
    }

    /// Information bits per frame entering the encoder (K).
    pub fn info_len(&self) -> usize {
        self.k
    }

    /// Coded bits per frame (N).
    pub fn codeword_len(&self) -> usize {
        self.n
    }

    /// Frames per batch.
    pub fn frames_per_batch(&self) -> usize {
        self.frames
    }

    /// Enable per-stage buffer tracing at debug level, previewing at most
    /// `limit` elements per buffer (all of them when `None`).
    pub fn set_trace(&mut self, limit: Option<usize>) {
        self.trace = true;
        self.trace_limit = limit;
    }

    fn trace_bits(&self, stage: &str, bits: &[bool]) {
        if self.trace {
            debug!(stage, data = %preview_bits(bits, self.trace_limit));
        }
    }

    fn trace_reals(&self, stage: &str, values: &[f64]) {
        if self.trace {
            debug!(stage, data = %preview_reals(values, self.trace_limit));
        }
    }

    fn trace_symbols(&self, stage: &str, symbols: &[Complex64]) {
        if self.trace {
            debug!(stage, data = %preview_symbols(symbols, self.trace_limit));
        }
    }

    /// Push one batch up to the decoder input, leaving LLRs ready.
    fn propagate_front(&mut self) {
        self.source.generate(&mut self.src_bits);
        self.trace_bits("source", &self.src_bits);

        if let Some(crc) = &self.crc {
            for (payload, frame) in self
                .src_bits
                .chunks(self.payload)
                .zip(self.enc_in.chunks_mut(self.k))
            {
                crc.append(payload, frame);
            }
            self.trace_bits("crc", &self.enc_in);
        } else {
            self.enc_in.copy_from_slice(&self.src_bits);
        }

        self.encoder.encode(&self.enc_in, &mut self.coded);
        self.trace_bits("encoder", &self.coded);

        if let Some(il) = &self.interleaver {
            il.interleave(&self.coded, &mut self.tx_bits);
            self.trace_bits("interleaver", &self.tx_bits);
        } else {
            self.tx_bits.copy_from_slice(&self.coded);
        }

        self.modem.modulate(&self.tx_bits, &mut self.tx_symbols);
        self.trace_symbols("modulate", &self.tx_symbols);

        self.channel.transmit(&self.tx_symbols, &mut self.rx_symbols);
        self.trace_symbols("channel", &self.rx_symbols);

        self.modem.demodulate(&self.rx_symbols, &mut self.raw_llrs);
        self.trace_reals("demodulate", &self.raw_llrs);

        if let Some(q) = &self.quantizer {
            q.quantize_in_place(&mut self.raw_llrs);
            self.trace_reals("quantizer", &self.raw_llrs);
        }

        if let Some(il) = &self.interleaver {
            il.deinterleave(&self.raw_llrs, &mut self.llrs);
        } else {
            self.llrs.copy_from_slice(&self.raw_llrs);
        }
    }

    /// Simulate one batch end to end and record per-frame outcomes.
    pub fn simulate_batch(&mut self, counters: &mut FrameCounters) -> Result<(), StageFault> {
        self.propagate_front();

        self.decoder.decode(&self.llrs, &mut self.decoded)?;
        self.trace_bits("decoder", &self.decoded);

        for f in 0..self.frames {
            let sent = &self.src_bits[f * self.payload..(f + 1) * self.payload];
            let received = &self.decoded[f * self.k..f * self.k + self.payload];
            let bit_errors = sent
                .iter()
                .zip(received.iter())
                .filter(|(a, b)| a != b)
                .count() as u64;

            let mut in_error = bit_errors > 0;
            if let Some(crc) = &self.crc {
                if !crc.check(&self.decoded[f * self.k..(f + 1) * self.k]) {
                    in_error = true;
                }
            }
            counters.record(bit_errors, in_error);
        }
        Ok(())
    }

    /// Fill the decoder input once. Used by the decoder benchmark loop.
    pub fn prime_decoder_input(&mut self) {
        self.propagate_front();
    }

    /// Run only the decoder on the current LLR buffer.
    pub fn decode_current(&mut self) -> Result<(), StageFault> {
        self.decoder.decode(&self.llrs, &mut self.decoded)
    }
}

fn preview_bits(bits: &[bool], limit: Option<usize>) -> String {
    let shown = limit.unwrap_or(bits.len()).min(bits.len());
    let mut out: String = bits[..shown].iter().map(|&b| if b { '1' } else { '0' }).collect();
    if shown < bits.len() {
        out.push_str("...");
    }
    out
}

fn preview_reals(values: &[f64], limit: Option<usize>) -> String {
    let shown = limit.unwrap_or(values.len()).min(values.len());
    let mut out = values[..shown]
        .iter()
        .map(|v| format!("{v:.3}"))
        .collect::<Vec<_>>()
        .join(" ");
    if shown < values.len() {
        out.push_str(" ...");
    }
    out
}

fn preview_symbols(symbols: &[Complex64], limit: Option<usize>) -> String {
    let shown = limit.unwrap_or(symbols.len()).min(symbols.len());
    let mut out = symbols[..shown]
        .iter()
        .map(|s| format!("{:.3}{:+.3}j", s.re, s.im))
        .collect::<Vec<_>>()
        .join(" ");
    if shown < symbols.len() {
        out.push_str(" ...");
    }
    out
}
