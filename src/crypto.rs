//! Reference key and address derivation on the CPU.
//!
//! Everything here goes through `k256` and `sha3`, fully independent of the
//! hand-rolled kernel math in `field`/`keccak`. Every match the device
//! reports is re-derived through this path before it is surfaced.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::SecretKey;
use sha3::{Digest, Keccak256};

/// secp256k1 curve order n, big-endian.
pub const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFE, 0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36,
    0x41, 0x41,
];

/// Check that a candidate private key is usable (0 < key < n).
#[inline]
pub fn is_valid_private_key(key: &[u8; 32]) -> bool {
    if key.iter().all(|&b| b == 0) {
        return false;
    }
    for i in 0..32 {
        if key[i] < SECP256K1_ORDER[i] {
            return true;
        }
        if key[i] > SECP256K1_ORDER[i] {
            return false;
        }
    }
    false
}

/// Uncompressed public key coordinates (X || Y, 64 big-endian bytes) for a
/// private key. `None` if the key is zero or not below the curve order.
pub fn derive_pubkey(private_key: &[u8; 32]) -> Option<[u8; 64]> {
    let secret = SecretKey::from_slice(private_key).ok()?;
    let encoded = secret.public_key().to_encoded_point(false);
    let bytes = encoded.as_bytes();
    // skip the 0x04 SEC1 tag
    let mut xy = [0u8; 64];
    xy.copy_from_slice(&bytes[1..65]);
    Some(xy)
}

/// Ethereum address of an uncompressed public key: low 20 bytes of
/// Keccak-256 over X || Y.
pub fn pubkey_to_address(xy: &[u8; 64]) -> [u8; 20] {
    let digest = Keccak256::digest(xy);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest[12..32]);
    addr
}

/// Ethereum address for a private key.
pub fn derive_address(private_key: &[u8; 32]) -> Option<[u8; 20]> {
    Some(pubkey_to_address(&derive_pubkey(private_key)?))
}

/// Format a raw address as 0x-prefixed lowercase hex.
pub fn address_hex(address: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(address))
}
