//! Monte-Carlo Simulation — multi-threaded error-rate measurement
//!
//! For each noise point the scheduler builds one private [`Chain`] per
//! worker thread, lets every worker loop batches against its own PRNG
//! streams, and merges thread-local counters into a shared
//! [`GlobalMonitor`] on a configurable reduction cadence. The stopping
//! decision is evaluated on merged totals only; once it fires, workers
//! finish their current batch, fold in their leftovers and exit, and the
//! scheduler joins them all before recording the point and moving on.
//!
//! Worker `w` derives its seeds from `config.seed + w`, so frame content is
//! reproducible for a fixed (seed, thread count) pair regardless of OS
//! scheduling. Changing the thread count reassigns frames to different
//! streams and is expected to change exact bit-level results while keeping
//! the statistics.
//!
//! Configuration errors (missing stages, dimension mismatches) surface
//! before any worker is spawned and abort the run with no partial point. A
//! runtime fault in one worker cancels the others cooperatively and aborts
//! the sweep with the point and frame context attached.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::chain::Chain;
use crate::monitor::{FrameCounters, GlobalMonitor, StopCriteria, StopReason};
use crate::snr::SnrPoint;
use crate::stage::{StageError, StageFault};

/// Seed material handed to the chain builder for one worker.
///
/// `base` already combines the run seed with the worker index. Builders
/// that need several independent streams (source, channel) derive them with
/// [`ChainSeed::stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSeed {
    /// Worker index in `0..n_threads`.
    pub worker_index: usize,
    /// Run seed combined with the worker index.
    pub base: u64,
}

impl ChainSeed {
    /// Derive an independent stream seed for one stage.
    pub fn stream(&self, salt: u64) -> u64 {
        (self.base ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15))
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407)
    }
}

/// All scheduler knobs, passed by value at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Frame errors to collect per noise point (primary stop criterion).
    pub max_frame_errors: u64,
    /// Optional cap on simulated frames per point.
    pub max_frames: Option<u64>,
    /// Optional cap on wall time per point.
    pub stop_time: Option<Duration>,
    /// Worker threads. `None` resolves to the available hardware
    /// parallelism, or to 1 under debug.
    pub threads: Option<usize>,
    /// When positive, replaces the simulation with a decoder-only
    /// throughput loop of this many decode calls per worker.
    pub benchs: u64,
    /// Trace stage buffers and force a single worker (unless `threads` was
    /// given explicitly).
    pub debug: bool,
    /// Cap on elements shown per traced buffer. Setting this implies
    /// `debug`.
    pub debug_limit: Option<usize>,
    /// Use the legacy event tag on "target reached" reports. Cosmetic only.
    pub legacy_termination: bool,
    /// Run seed; worker `w` uses `seed + w`.
    pub seed: u64,
    /// Batches a worker accumulates locally between reductions.
    pub reduce_every: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_frame_errors: 100,
            max_frames: None,
            stop_time: None,
            threads: None,
            benchs: 0,
            debug: false,
            debug_limit: None,
            legacy_termination: false,
            seed: 0,
            reduce_every: 1,
        }
    }
}

impl SimConfig {
    /// Debug is on when either flag was set.
    pub fn debug_enabled(&self) -> bool {
        self.debug || self.debug_limit.is_some()
    }

    /// Resolve the worker count. An explicit positive request always wins;
    /// debug only forces a single worker when no request was given.
    pub fn resolved_threads(&self) -> Result<usize, StageError> {
        match self.threads {
            Some(0) => Err(StageError::config(
                "threads",
                "thread count must be positive",
            )),
            Some(t) => Ok(t),
            None if self.debug_enabled() => Ok(1),
            None => Ok(thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)),
        }
    }
}

/// Result record for one completed noise point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnrPointReport {
    /// The level as configured.
    pub snr_db: f64,
    /// Information-bit energy view.
    pub ebn0_db: f64,
    /// Symbol energy view.
    pub esn0_db: f64,
    /// Noise deviation used.
    pub sigma: f64,
    /// Merged counters across all workers.
    pub counters: FrameCounters,
    /// Source payload bits per frame, for rate computations.
    pub info_bits_per_frame: u64,
    /// Wall time spent in the point.
    pub elapsed: Duration,
    /// Why sampling stopped.
    pub termination: StopReason,
    /// Event tag for downstream consumers; shape depends on the legacy
    /// flag, semantics do not.
    pub termination_tag: String,
}

impl SnrPointReport {
    /// Measured bit error rate.
    pub fn ber(&self) -> f64 {
        self.counters.ber(self.info_bits_per_frame)
    }

    /// Measured frame error rate.
    pub fn fer(&self) -> f64 {
        self.counters.fer()
    }

    /// Simulated information throughput in bits per second.
    pub fn info_throughput_bps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        (self.counters.frames * self.info_bits_per_frame) as f64 / secs
    }
}

/// Decoder-only throughput record for one noise point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub snr_db: f64,
    pub workers: usize,
    /// Total decode calls across workers.
    pub decoder_runs: u64,
    /// Information bits recovered per decode call.
    pub info_bits_per_run: u64,
    /// Longest per-worker wall time.
    pub elapsed: Duration,
}

impl BenchmarkReport {
    /// Aggregate decoder throughput in information bits per second.
    pub fn info_throughput_bps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        (self.decoder_runs * self.info_bits_per_run) as f64 / secs
    }
}

/// Outcome of a whole sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    /// One record per completed noise point, in sweep order.
    pub points: Vec<SnrPointReport>,
    /// Decoder benchmark records (benchmark mode only).
    pub benchmarks: Vec<BenchmarkReport>,
    /// True when the sweep ended on external cancellation; the in-progress
    /// point is discarded, completed points are kept.
    pub cancelled: bool,
    /// Wall time for the whole run.
    pub elapsed: Duration,
}

/// Fatal simulation failure.
#[derive(Debug)]
pub enum SimulationError {
    /// Chain or scheduler configuration rejected before any worker started.
    Configuration(StageError),
    /// A worker faulted mid-point; the sweep was aborted.
    Worker {
        snr_db: f64,
        frames_at_failure: u64,
        fault: StageFault,
        /// Merged totals at abort time, for diagnostics.
        counters: FrameCounters,
    },
    /// Thread infrastructure failure (spawn or join).
    Thread { message: String },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Configuration(err) => write!(f, "configuration error: {err}"),
            SimulationError::Worker {
                snr_db,
                frames_at_failure,
                fault,
                ..
            } => write!(
                f,
                "worker fault at {snr_db} dB after ~{frames_at_failure} frames: {fault}"
            ),
            SimulationError::Thread { message } => write!(f, "thread error: {message}"),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Configuration(err) => Some(err),
            SimulationError::Worker { fault, .. } => Some(fault),
            SimulationError::Thread { .. } => None,
        }
    }
}

impl From<StageError> for SimulationError {
    fn from(err: StageError) -> Self {
        SimulationError::Configuration(err)
    }
}

struct WorkerFailure {
    fault: StageFault,
}

/// Multi-threaded Monte-Carlo error-rate scheduler.
pub struct MonteCarloSimulator {
    config: SimConfig,
    cancel: Arc<AtomicBool>,
}

impl MonteCarloSimulator {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Shared flag for external cancellation. Setting it stops the sweep at
    /// the next batch boundary; the in-progress point is discarded.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the sweep. `build_chain` is invoked once per (point, worker) on
    /// the scheduler thread and must produce a fully validated chain.
    pub fn run<F>(&self, points: &[SnrPoint], build_chain: F) -> Result<SimulationReport, SimulationError>
    where
        F: Fn(&SnrPoint, &ChainSeed) -> Result<Chain, StageError>,
    {
        let threads = self.config.resolved_threads()?;
        let run_start = Instant::now();
        let mut report = SimulationReport {
            points: Vec::new(),
            benchmarks: Vec::new(),
            cancelled: false,
            elapsed: Duration::ZERO,
        };

        for point in points {
            if self.cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                break;
            }

            let chains = self.build_worker_chains(point, threads, &build_chain)?;

            if self.config.benchs > 0 {
                let bench = self.run_benchmark_point(point, chains)?;
                info!(
                    snr_db = point.snr_db,
                    decoder_runs = bench.decoder_runs,
                    throughput_bps = bench.info_throughput_bps(),
                    "decoder benchmark point done"
                );
                report.benchmarks.push(bench);
                continue;
            }

            match self.run_monte_carlo_point(point, chains)? {
                Some(point_report) => {
                    info!(
                        snr_db = point_report.snr_db,
                        frames = point_report.counters.frames,
                        frame_errors = point_report.counters.frame_errors,
                        bit_errors = point_report.counters.bit_errors,
                        termination = point_report.termination_tag.as_str(),
                        "noise point done"
                    );
                    report.points.push(point_report);
                }
                None => {
                    warn!(snr_db = point.snr_db, "sweep cancelled, point discarded");
                    report.cancelled = true;
                    break;
                }
            }
        }

        report.elapsed = run_start.elapsed();
        Ok(report)
    }

    fn build_worker_chains<F>(
        &self,
        point: &SnrPoint,
        threads: usize,
        build_chain: &F,
    ) -> Result<Vec<Chain>, SimulationError>
    where
        F: Fn(&SnrPoint, &ChainSeed) -> Result<Chain, StageError>,
    {
        let mut chains = Vec::with_capacity(threads);
        for w in 0..threads {
            let seed = ChainSeed {
                worker_index: w,
                base: self.config.seed.wrapping_add(w as u64),
            };
            let mut chain = build_chain(point, &seed)?;
            if self.config.debug_enabled() {
                chain.set_trace(self.config.debug_limit);
            }
            chains.push(chain);
        }
        Ok(chains)
    }

    /// Returns `Ok(None)` when the point ended on external cancellation.
    fn run_monte_carlo_point(
        &self,
        point: &SnrPoint,
        chains: Vec<Chain>,
    ) -> Result<Option<SnrPointReport>, SimulationError> {
        let threads = chains.len();
        let info_bits_per_frame = chains[0].payload_len() as u64;
        info!(
            snr_db = point.snr_db,
            sigma = point.sigma,
            threads,
            "starting noise point"
        );

        let monitor = Arc::new(GlobalMonitor::new(StopCriteria {
            max_frame_errors: self.config.max_frame_errors,
            max_frames: self.config.max_frames,
            stop_time: self.config.stop_time,
        }));
        let failure: Arc<Mutex<Option<WorkerFailure>>> = Arc::new(Mutex::new(None));
        let reduce_every = self.config.reduce_every.max(1);
        let point_start = Instant::now();

        let mut handles = Vec::with_capacity(threads);
        for (w, mut chain) in chains.into_iter().enumerate() {
            let worker_monitor = Arc::clone(&monitor);
            let worker_failure = Arc::clone(&failure);
            let worker_cancel = Arc::clone(&self.cancel);

            let spawned = thread::Builder::new()
                .name(format!("mc-worker-{w}"))
                .spawn(move || {
                    worker_loop(
                        &mut chain,
                        &worker_monitor,
                        &worker_failure,
                        &worker_cancel,
                        reduce_every,
                        point_start,
                    )
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Stop the workers already running before bailing out.
                    monitor.halt_on_fault();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(SimulationError::Thread {
                        message: format!("failed to spawn worker {w}: {e}"),
                    });
                }
            }
        }

        let mut panicked = false;
        for handle in handles {
            if handle.join().is_err() {
                panicked = true;
            }
        }
        let elapsed = point_start.elapsed();
        let totals = monitor.snapshot();

        let worker_failure = failure.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(failed) = worker_failure {
            return Err(SimulationError::Worker {
                snr_db: point.snr_db,
                frames_at_failure: totals.frames,
                fault: failed.fault,
                counters: totals,
            });
        }
        if panicked {
            return Err(SimulationError::Thread {
                message: format!("a worker panicked at {} dB", point.snr_db),
            });
        }

        match monitor.stop_reason() {
            Some(StopReason::Cancelled) => Ok(None),
            Some(reason) => Ok(Some(SnrPointReport {
                snr_db: point.snr_db,
                ebn0_db: point.ebn0_db,
                esn0_db: point.esn0_db,
                sigma: point.sigma,
                counters: totals,
                info_bits_per_frame,
                elapsed,
                termination: reason,
                termination_tag: reason.label(self.config.legacy_termination).to_string(),
            })),
            None => Err(SimulationError::Thread {
                message: format!("noise point {} dB finished without a stop reason", point.snr_db),
            }),
        }
    }

    fn run_benchmark_point(
        &self,
        point: &SnrPoint,
        chains: Vec<Chain>,
    ) -> Result<BenchmarkReport, SimulationError> {
        let workers = chains.len();
        let info_bits_per_run =
            (chains[0].info_len() * chains[0].frames_per_batch()) as u64;
        let benchs = self.config.benchs;

        let mut handles = Vec::with_capacity(workers);
        for (w, mut chain) in chains.into_iter().enumerate() {
            let spawned = thread::Builder::new()
                .name(format!("bench-worker-{w}"))
                .spawn(move || -> Result<Duration, StageFault> {
                    chain.prime_decoder_input();
                    let start = Instant::now();
                    for _ in 0..benchs {
                        chain.decode_current()?;
                    }
                    Ok(start.elapsed())
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(SimulationError::Thread {
                        message: format!("failed to spawn benchmark worker {w}: {e}"),
                    });
                }
            }
        }

        let mut longest = Duration::ZERO;
        for handle in handles {
            match handle.join() {
                Ok(Ok(elapsed)) => longest = longest.max(elapsed),
                Ok(Err(fault)) => {
                    return Err(SimulationError::Worker {
                        snr_db: point.snr_db,
                        frames_at_failure: 0,
                        fault,
                        counters: FrameCounters::default(),
                    })
                }
                Err(_) => {
                    return Err(SimulationError::Thread {
                        message: format!("a benchmark worker panicked at {} dB", point.snr_db),
                    })
                }
            }
        }

        Ok(BenchmarkReport {
            snr_db: point.snr_db,
            workers,
            decoder_runs: benchs * workers as u64,
            info_bits_per_run,
            elapsed: longest,
        })
    }
}

fn worker_loop(
    chain: &mut Chain,
    monitor: &GlobalMonitor,
    failure: &Mutex<Option<WorkerFailure>>,
    cancel: &AtomicBool,
    reduce_every: usize,
    point_start: Instant,
) {
    let mut local = FrameCounters::default();
    let mut batches_since_reduce = 0usize;

    loop {
        if monitor.is_stopped() {
            break;
        }
        if cancel.load(Ordering::Relaxed) {
            monitor.cancel();
            break;
        }

        if let Err(fault) = chain.simulate_batch(&mut local) {
            let mut slot = failure.lock().unwrap_or_else(|e| e.into_inner());
            slot.get_or_insert(WorkerFailure { fault });
            drop(slot);
            monitor.halt_on_fault();
            break;
        }

        batches_since_reduce += 1;
        if batches_since_reduce >= reduce_every {
            batches_since_reduce = 0;
            if monitor.reduce(local.take(), point_start.elapsed()) {
                break;
            }
        }
    }

    // Fold in whatever the last partial reduction window accumulated, so
    // the reported totals cover every finished batch.
    monitor.absorb(local.take());
}
