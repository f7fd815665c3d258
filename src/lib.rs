//! hexvane: GPU-accelerated vanity address search for Ethereum.
//!
//! Architecture:
//! - `field` / `keccak`: host twins of the device kernel's arithmetic
//! - `table`: the 64 MiB precomputed multiples-of-G table
//! - `gpu`: Metal host orchestration (per-batch loop, CPU verification)
//! - `cpu`: portable fallback generator
//! - `search`: the backend-agnostic search contract
//!
//! The kernel itself lives in `src/vanity.metal` and is compiled from
//! source at startup.

pub mod cli;
pub mod cpu;
pub mod crypto;
pub mod error;
pub mod field;
pub mod keccak;
pub mod pattern;
pub mod search;
pub mod selftest;
pub mod table;
pub mod uint256;
pub mod wallet;

#[cfg(target_os = "macos")]
#[path = "gpu.rs"]
pub mod gpu;

#[cfg(not(target_os = "macos"))]
#[path = "gpu_stub.rs"]
pub mod gpu;
