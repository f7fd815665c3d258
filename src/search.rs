//! The search contract shared by both backends: configuration, live
//! statistics, the terminal outcome, and runtime backend selection.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::cpu::CpuGenerator;
use crate::error::Result;
use crate::gpu::GpuSearcher;
use crate::pattern::Pattern;

/// Everything a single search needs, threaded through explicitly.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub pattern: Pattern,
    pub table_path: PathBuf,
    /// CPU worker threads; 0 means one per core.
    pub threads: usize,
    /// Skip GPU enumeration entirely.
    pub force_cpu: bool,
}

/// A found wallet, already CPU-verified.
#[derive(Clone, Debug)]
pub struct FoundWallet {
    /// 0x-prefixed lowercase hex address.
    pub address: String,
    /// 64-char lowercase hex private key.
    pub private_key: String,
    pub attempts: u64,
    pub elapsed: Duration,
}

/// How a search ended. Cancellation is an ordinary outcome, not an error.
#[derive(Clone, Debug)]
pub enum SearchOutcome {
    Found(FoundWallet),
    Cancelled,
}

/// Monotonic attempts counter plus the wall-clock start, readable
/// concurrently from the progress loop while a backend is running.
pub struct SearchStats {
    attempts: AtomicU64,
    started: Instant,
}

impl SearchStats {
    pub fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn add_attempts(&self, n: u64) {
        self.attempts.fetch_add(n, Ordering::Relaxed);
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Average attempts per second since start.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.attempts() as f64 / secs
        } else {
            0.0
        }
    }
}

/// The two shapes a search engine can take, chosen at runtime from device
/// enumeration rather than at build time.
pub enum Backend {
    Cpu(CpuGenerator),
    Gpu(GpuSearcher),
}

impl Backend {
    /// Prefer the GPU; fall back to the CPU generator when enumeration or
    /// setup fails (and say why).
    pub fn select(config: &SearchConfig) -> Self {
        if !config.force_cpu {
            match GpuSearcher::new(&config.pattern.descriptor(), &config.table_path) {
                Ok(gpu) => return Backend::Gpu(gpu),
                Err(e) => {
                    eprintln!("[!] GPU unavailable: {}", e);
                    eprintln!("[!] Falling back to CPU");
                }
            }
        }
        Backend::Cpu(CpuGenerator::new(config.pattern.clone(), config.threads))
    }

    pub fn name(&self) -> String {
        match self {
            Backend::Cpu(cpu) => cpu.name(),
            Backend::Gpu(gpu) => gpu.name(),
        }
    }

    /// Run until a verified match, cancellation, or a fatal error. All
    /// device teardown happens on drop, on every exit path.
    pub fn run(&self, cancel: &AtomicBool, stats: &SearchStats) -> Result<SearchOutcome> {
        match self {
            Backend::Cpu(cpu) => cpu.run(cancel, stats),
            Backend::Gpu(gpu) => gpu.run(cancel, stats),
        }
    }
}
