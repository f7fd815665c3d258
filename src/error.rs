use thiserror::Error;

/// Errors surfaced by the search engine.
///
/// A user-requested stop is deliberately not represented here: cancellation
/// is a normal terminal outcome (`search::SearchOutcome::Cancelled`), not a
/// failure.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Device enumeration found no usable GPU. The caller is expected to
    /// fall back to the CPU generator.
    #[error("no GPU available: {0}")]
    NoGpuAvailable(String),

    /// The precomputed table is missing and could not be regenerated, or it
    /// is present with the wrong size. Fatal for the GPU backend.
    #[error("precomputed table unavailable: {0}")]
    TableUnavailable(String),

    /// Context/queue/pipeline creation or kernel compilation failed.
    /// On compile failure `detail` carries the build log verbatim.
    #[error("device init failed ({stage}): {detail}")]
    DeviceInit { stage: &'static str, detail: String },

    /// Read/write/enqueue error mid-search. Fatal for the current search;
    /// the caller may start a fresh one.
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// The address reported by the device does not match the CPU
    /// re-derivation from the reconstructed private key. Indicates a kernel
    /// bug; never swallowed, no result is emitted.
    #[error("verification mismatch: device reported {device}, CPU derived {cpu}")]
    VerificationMismatch { device: String, cpu: String },

    /// Pattern characters outside 0-9a-f, or combined length over 40
    /// nibbles, or an empty pattern. Reported before any device work.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
