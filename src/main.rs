use std::io::{stdout, Write};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{bounded, RecvTimeoutError};

use hexvane::cli::{self, Args};
use hexvane::error::SearchError;
use hexvane::pattern::{Pattern, PatternDescriptor};
use hexvane::search::{Backend, FoundWallet, SearchConfig, SearchOutcome, SearchStats};
use hexvane::uint256::Uint256;
use hexvane::{crypto, gpu, selftest, wallet};

fn main() {
    let args = Args::parse();

    println!("\n\x1b[1;36m╔══════════════════════════════════════════════════╗");
    println!("║   HEXVANE  •  Ethereum Vanity Address Generator  ║");
    println!("╚══════════════════════════════════════════════════╝\x1b[0m\n");

    // a bug in the kernel-twin math means missed or wrong matches, so
    // refuse to run if anything diverges from the reference stack
    if !selftest::run_self_test() {
        process::exit(1);
    }

    if args.verify_gpu {
        process::exit(if run_gpu_verification(&args) { 0 } else { 1 });
    }

    let pattern = match Pattern::new(&args.prefix, &args.suffix) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("[✗] {}", e);
            process::exit(1);
        }
    };

    println!(
        "[🎯] Target: 0x{}…{}  (1 in {} addresses)",
        pattern.prefix(),
        pattern.suffix(),
        cli::format_number(pattern.difficulty() as u64)
    );

    let config = SearchConfig {
        pattern,
        table_path: args.table.clone(),
        threads: args.threads,
        force_cpu: args.cpu,
    };

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            println!("\n[!] Stopping...");
            cancel.store(true, Ordering::SeqCst);
        })
        .ok();
    }

    let backend = Backend::select(&config);
    println!("[▶] Engine: {}  (Ctrl+C to stop)\n", backend.name());

    let stats = Arc::new(SearchStats::new());
    let (tx, rx) = bounded(1);
    let search_cancel = cancel.clone();
    let search_stats = stats.clone();
    let handle = thread::spawn(move || {
        let outcome = backend.run(&search_cancel, &search_stats);
        tx.send(outcome).ok();
    });

    // progress line in the main thread, driven purely by the atomic counter
    const SPINNER: [char; 4] = ['◐', '◓', '◑', '◒'];
    let mut frame = 0usize;
    let outcome = loop {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(outcome) => break outcome,
            Err(RecvTimeoutError::Timeout) => {
                print!(
                    "\r[{}] {} | {} attempts | {}    ",
                    SPINNER[frame % SPINNER.len()],
                    cli::format_rate(stats.rate()),
                    cli::format_number(stats.attempts()),
                    cli::format_duration(stats.elapsed().as_secs_f64())
                );
                stdout().flush().ok();
                frame += 1;
            }
            Err(RecvTimeoutError::Disconnected) => {
                break Err(SearchError::Dispatch(
                    "search thread terminated unexpectedly".into(),
                ));
            }
        }
    };
    handle.join().ok();
    println!();

    match outcome {
        Ok(SearchOutcome::Found(found)) => {
            report(&found);
            match wallet::save(&args.output, &found) {
                Ok(path) => println!("[💾] Saved to {}", path.display()),
                Err(e) => eprintln!("[!] Save failed: {}", e),
            }
        }
        Ok(SearchOutcome::Cancelled) => {
            println!(
                "[■] Stopped after {} attempts in {}",
                cli::format_number(stats.attempts()),
                cli::format_duration(stats.elapsed().as_secs_f64())
            );
        }
        Err(e) => {
            eprintln!("[✗] {}", e);
            process::exit(1);
        }
    }
}

fn report(found: &FoundWallet) {
    println!("\n\x1b[1;32m╔══════════════════════════════════════════════════╗");
    println!("║                 ✨ ADDRESS FOUND ✨               ║");
    println!("╚══════════════════════════════════════════════════╝\x1b[0m\n");
    println!("  Address:     \x1b[1m{}\x1b[0m", found.address);
    println!("  Private Key: {}", found.private_key);
    println!(
        "\n  {} attempts in {} ({})",
        cli::format_number(found.attempts),
        cli::format_duration(found.elapsed.as_secs_f64()),
        cli::format_rate(found.attempts as f64 / found.elapsed.as_secs_f64().max(1e-9))
    );
    println!("\n  \x1b[1;31m⚠ Keep the private key secret!\x1b[0m\n");
}

/// Drive the verification kernel over a batch of sequential keys and
/// compare every spot-checked lane against the CPU reference.
fn run_gpu_verification(args: &Args) -> bool {
    println!("[🔍] Cross-validating the GPU kernel against the CPU...");

    let searcher = match gpu::GpuSearcher::new(&PatternDescriptor::default(), &args.table) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[✗] {}", e);
            return false;
        }
    };

    let mut base = [0u8; 32];
    base[31] = 1;
    let count = 1024u32;
    let addresses = match searcher.verify_batch(&base, count) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("[✗] {}", e);
            return false;
        }
    };

    let mut all_passed = true;
    for offset in [0u32, 1, 2, 255, 256, 1000, 1023] {
        let key = Uint256::from_be_bytes(&base).wrapping_add_u32(offset);
        let cpu = crypto::derive_address(&key.to_be_bytes()).expect("spot-check keys are valid");
        let dev = addresses[offset as usize];
        if cpu == dev {
            println!("  [✓] base + {:<4} → {}", offset, crypto::address_hex(&cpu));
        } else {
            eprintln!(
                "  [✗] base + {}: device {} != cpu {}",
                offset,
                crypto::address_hex(&dev),
                crypto::address_hex(&cpu)
            );
            all_passed = false;
        }
    }

    if all_passed {
        println!("[✓] GPU kernel verified against the CPU reference\n");
    } else {
        eprintln!("[✗] GPU KERNEL MISMATCH - do not trust search results\n");
    }
    all_passed
}
