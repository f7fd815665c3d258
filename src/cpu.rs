//! CPU fallback generator: a worker pool drawing fresh random keys and
//! matching on raw address bytes.
//!
//! Orders of magnitude slower than the GPU path, but runs anywhere and
//! shares the exact same matcher and result contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::SecretKey;
use rand::rngs::OsRng;

use crate::crypto;
use crate::error::Result;
use crate::pattern::{Pattern, PatternDescriptor};
use crate::search::{FoundWallet, SearchOutcome, SearchStats};

/// How many attempts a worker makes between cancellation checks.
const CHECK_INTERVAL: u64 = 64;

pub struct CpuGenerator {
    /// Pattern pre-processed once; the hot loop never touches strings.
    matcher: PatternDescriptor,
    threads: usize,
}

impl CpuGenerator {
    pub fn new(pattern: Pattern, threads: usize) -> Self {
        let threads = if threads == 0 {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            threads
        };
        Self {
            matcher: pattern.descriptor(),
            threads,
        }
    }

    pub fn name(&self) -> String {
        format!("CPU ({} threads)", self.threads)
    }

    /// Run the worker pool until one worker finds a match or the token is
    /// cancelled. The first finder wins; everyone else drains out.
    pub fn run(&self, cancel: &AtomicBool, stats: &SearchStats) -> Result<SearchOutcome> {
        let done = AtomicBool::new(false);
        let found: Mutex<Option<FoundWallet>> = Mutex::new(None);

        thread::scope(|scope| {
            for _ in 0..self.threads {
                scope.spawn(|| self.worker(cancel, stats, &done, &found));
            }
        });

        let winner = found.into_inner().expect("worker mutex poisoned");
        match winner {
            Some(wallet) => Ok(SearchOutcome::Found(wallet)),
            None => Ok(SearchOutcome::Cancelled),
        }
    }

    fn worker(
        &self,
        cancel: &AtomicBool,
        stats: &SearchStats,
        done: &AtomicBool,
        found: &Mutex<Option<FoundWallet>>,
    ) {
        loop {
            if cancel.load(Ordering::Relaxed) || done.load(Ordering::Relaxed) {
                return;
            }
            for _ in 0..CHECK_INTERVAL {
                let secret = SecretKey::random(&mut OsRng);
                let encoded = secret.public_key().to_encoded_point(false);
                let mut xy = [0u8; 64];
                xy.copy_from_slice(&encoded.as_bytes()[1..65]);
                let address = crypto::pubkey_to_address(&xy);
                stats.add_attempts(1);

                if self.matcher.matches(&address) {
                    // first winner publishes, the rest stand down
                    if !done.swap(true, Ordering::SeqCst) {
                        let wallet = FoundWallet {
                            address: crypto::address_hex(&address),
                            private_key: hex::encode(secret.to_bytes()),
                            attempts: stats.attempts(),
                            elapsed: stats.elapsed(),
                        };
                        *found.lock().expect("worker mutex poisoned") = Some(wallet);
                    }
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchStats;

    #[test]
    fn cancelled_before_start_returns_cancelled() {
        let gen = CpuGenerator::new(Pattern::new("ffff", "").unwrap(), 2);
        let cancel = AtomicBool::new(true);
        let stats = SearchStats::new();
        match gen.run(&cancel, &stats).unwrap() {
            SearchOutcome::Cancelled => {}
            SearchOutcome::Found(_) => panic!("cancelled search must not report a result"),
        }
    }

    #[test]
    fn finds_and_verifies_single_nibble_prefix() {
        // 1-in-16 per attempt; effectively instant
        let gen = CpuGenerator::new(Pattern::new("a", "").unwrap(), 2);
        let cancel = AtomicBool::new(false);
        let stats = SearchStats::new();
        match gen.run(&cancel, &stats).unwrap() {
            SearchOutcome::Found(w) => {
                assert!(w.address.starts_with("0xa"));
                // re-derive from the reported key, byte for byte
                let key: [u8; 32] = hex::decode(&w.private_key).unwrap().try_into().unwrap();
                let addr = crypto::derive_address(&key).unwrap();
                assert_eq!(crypto::address_hex(&addr), w.address);
                assert!(w.attempts > 0);
            }
            SearchOutcome::Cancelled => panic!("search was not cancelled"),
        }
    }
}
