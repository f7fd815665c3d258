//! End-to-end search tests over the portable CPU backend.
//!
//! Single-nibble patterns keep the expected attempt count around 16, so
//! these complete in well under a second while still exercising the full
//! pipeline: pattern validation, the worker pool, byte-level matching,
//! and re-derivation of the reported key.

use std::sync::atomic::AtomicBool;

use hexvane::cpu::CpuGenerator;
use hexvane::crypto;
use hexvane::error::SearchError;
use hexvane::pattern::Pattern;
use hexvane::search::{SearchOutcome, SearchStats};

fn run_to_completion(pattern: Pattern) -> hexvane::search::FoundWallet {
    let generator = CpuGenerator::new(pattern, 2);
    let cancel = AtomicBool::new(false);
    let stats = SearchStats::new();
    match generator.run(&cancel, &stats).expect("cpu search cannot fail") {
        SearchOutcome::Found(wallet) => wallet,
        SearchOutcome::Cancelled => panic!("search ended without cancellation or result"),
    }
}

fn rederive(wallet: &hexvane::search::FoundWallet) -> String {
    let key: [u8; 32] = hex::decode(&wallet.private_key)
        .expect("key is hex")
        .try_into()
        .expect("key is 32 bytes");
    let addr = crypto::derive_address(&key).expect("reported key must be valid");
    crypto::address_hex(&addr)
}

#[test]
fn prefix_search_finds_verified_match() {
    let wallet = run_to_completion(Pattern::new("d", "").unwrap());
    assert!(wallet.address.starts_with("0xd"));
    assert_eq!(rederive(&wallet), wallet.address);
    assert_eq!(wallet.address.len(), 42);
    assert_eq!(wallet.private_key.len(), 64);
}

#[test]
fn suffix_search_finds_verified_match() {
    let wallet = run_to_completion(Pattern::new("", "b").unwrap());
    assert!(wallet.address.ends_with('b'));
    assert_eq!(rederive(&wallet), wallet.address);
}

#[test]
fn combined_prefix_and_suffix_search() {
    let wallet = run_to_completion(Pattern::new("a", "b").unwrap());
    assert!(wallet.address.starts_with("0xa"));
    assert!(wallet.address.ends_with('b'));
    assert_eq!(rederive(&wallet), wallet.address);
}

#[test]
fn invalid_characters_rejected_before_any_work() {
    assert!(matches!(
        Pattern::new("ghi", ""),
        Err(SearchError::InvalidPattern(_))
    ));
}

#[test]
fn over_length_pattern_rejected_before_any_work() {
    let too_long = "a".repeat(41);
    assert!(matches!(
        Pattern::new(&too_long, ""),
        Err(SearchError::InvalidPattern(_))
    ));
}

#[test]
fn cancellation_is_a_terminal_outcome_not_an_error() {
    // an impossible-in-time pattern plus a pre-set token: the pool must
    // drain immediately and report Cancelled
    let generator = CpuGenerator::new(Pattern::new("0123456789abcdef", "").unwrap(), 2);
    let cancel = AtomicBool::new(true);
    let stats = SearchStats::new();
    match generator.run(&cancel, &stats).unwrap() {
        SearchOutcome::Cancelled => {}
        SearchOutcome::Found(_) => panic!("cancelled search produced a result"),
    }
}

#[test]
fn stats_count_attempts() {
    let generator = CpuGenerator::new(Pattern::new("7", "").unwrap(), 1);
    let cancel = AtomicBool::new(false);
    let stats = SearchStats::new();
    generator.run(&cancel, &stats).unwrap();
    assert!(stats.attempts() > 0);
}
