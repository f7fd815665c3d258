//! GPU backend stub for platforms without Metal.
//!
//! Keeps the `Backend::Gpu` variant compiling everywhere; construction
//! reports `NoGpuAvailable` and the caller falls back to the CPU generator.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use crate::error::{Result, SearchError};
use crate::pattern::PatternDescriptor;
use crate::search::{SearchOutcome, SearchStats};

pub struct GpuSearcher {
    _private: (),
}

impl GpuSearcher {
    pub fn new(_descriptor: &PatternDescriptor, _table_path: &Path) -> Result<Self> {
        Err(SearchError::NoGpuAvailable(
            "GPU acceleration requires Metal (macOS)".into(),
        ))
    }

    pub fn name(&self) -> String {
        "GPU (unavailable)".into()
    }

    pub fn run(&self, _cancel: &AtomicBool, _stats: &SearchStats) -> Result<SearchOutcome> {
        Err(SearchError::NoGpuAvailable(
            "GPU backend is not built on this platform".into(),
        ))
    }

    pub fn verify_batch(&self, _base_key: &[u8; 32], _count: u32) -> Result<Vec<[u8; 20]>> {
        Err(SearchError::NoGpuAvailable(
            "GPU backend is not built on this platform".into(),
        ))
    }
}
