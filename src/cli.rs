//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

/// GPU-accelerated Ethereum vanity address generator.
#[derive(Parser, Debug, Clone)]
#[command(name = "hexvane", version, about, long_about = None)]
pub struct Args {
    /// Desired address prefix, hex (a leading 0x is accepted)
    #[arg(short, long, default_value = "", value_name = "HEX")]
    pub prefix: String,

    /// Desired address suffix, hex
    #[arg(short, long, default_value = "", value_name = "HEX")]
    pub suffix: String,

    /// Force the CPU backend even when a GPU is available
    #[arg(long)]
    pub cpu: bool,

    /// Worker threads for the CPU backend (0 = one per core)
    #[arg(short, long, default_value_t = 0, value_name = "N")]
    pub threads: usize,

    /// Where to write the found wallet
    #[arg(short, long, default_value = "wallet.txt", value_name = "PATH")]
    pub output: PathBuf,

    /// Precomputed point table (generated on first run)
    #[arg(long, default_value = "tables.bin", value_name = "PATH")]
    pub table: PathBuf,

    /// Cross-validate the GPU kernel against the CPU and exit
    #[arg(long)]
    pub verify_gpu: bool,
}

/// Thousands separator for big attempt counts.
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Human-readable rate.
pub fn format_rate(per_second: f64) -> String {
    if per_second >= 1_000_000.0 {
        format!("{:.2}M/s", per_second / 1_000_000.0)
    } else if per_second >= 1_000.0 {
        format!("{:.1}K/s", per_second / 1_000.0)
    } else {
        format!("{:.0}/s", per_second)
    }
}

/// Human-readable elapsed time.
pub fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        format!("{}m {}s", (secs / 60.0) as u64, (secs % 60.0) as u64)
    } else {
        format!("{}h {}m", (secs / 3600.0) as u64, ((secs % 3600.0) / 60.0) as u64)
    }
}
