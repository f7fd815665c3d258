//! Wallet file sink.
//!
//! Plain UTF-8 with the address, private key, and search statistics.
//! Created with user-only permissions on Unix, and never clobbers an
//! earlier find: an existing file pushes the new one to a numbered name.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::Result;
use crate::search::FoundWallet;

/// Write the wallet next to `path`, returning the path actually used.
pub fn save(path: &Path, wallet: &FoundWallet) -> Result<PathBuf> {
    let target = unique_path(path);
    let content = format!(
        "Ethereum Vanity Address\n\
         =======================\n\
         \n\
         Address:     {}\n\
         Private Key: {}\n\
         \n\
         Statistics:\n\
         \x20 Time:     {:.1}s\n\
         \x20 Attempts: {}\n\
         \n\
         Generated: {}\n\
         \n\
         WARNING: Keep this private key secret and secure!\n",
        wallet.address,
        wallet.private_key,
        wallet.elapsed.as_secs_f64(),
        wallet.attempts,
        Local::now().format("%Y-%m-%d %H:%M:%S"),
    );

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&target)?;
    file.write_all(content.as_bytes())?;
    Ok(target)
}

/// `wallet.txt`, or `wallet-2.txt`, `wallet-3.txt`, ... if taken.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wallet".into());
    let ext = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "txt".into());
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut n = 2u32;
    loop {
        let candidate = dir.join(format!("{}-{}.{}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
