//! Pattern validation, the device descriptor, and the byte-level matcher.
//!
//! A pattern is a hex prefix and/or suffix over the 40-character address
//! body. Both sides match on raw address bytes, never on formatted strings,
//! with nibble-accurate handling of odd-length patterns.

use crate::error::{Result, SearchError};

/// Hex nibbles in a 20-byte address.
pub const ADDRESS_NIBBLES: usize = 40;

/// Byte size of the packed device descriptor.
pub const DESCRIPTOR_BYTES: usize = 44;

/// A validated, normalised (lowercase, no `0x`) search pattern.
#[derive(Clone, Debug)]
pub struct Pattern {
    prefix: String,
    suffix: String,
}

impl Pattern {
    /// Validate and normalise user input. A leading `0x` on the prefix is
    /// tolerated. Rejects non-hex characters, a combined length over 40
    /// nibbles, and the empty pattern (which would match every address).
    pub fn new(prefix: &str, suffix: &str) -> Result<Self> {
        let prefix = prefix
            .trim()
            .to_ascii_lowercase()
            .trim_start_matches("0x")
            .to_string();
        let suffix = suffix.trim().to_ascii_lowercase();

        for (name, part) in [("prefix", &prefix), ("suffix", &suffix)] {
            if let Some(bad) = part.chars().find(|c| !c.is_ascii_hexdigit()) {
                return Err(SearchError::InvalidPattern(format!(
                    "{} contains '{}'; only hex characters (0-9, a-f) are allowed",
                    name, bad
                )));
            }
        }
        if prefix.is_empty() && suffix.is_empty() {
            return Err(SearchError::InvalidPattern(
                "prefix and suffix are both empty".into(),
            ));
        }
        if prefix.len() + suffix.len() > ADDRESS_NIBBLES {
            return Err(SearchError::InvalidPattern(format!(
                "combined length {} exceeds the {} hex characters of an address",
                prefix.len() + suffix.len(),
                ADDRESS_NIBBLES
            )));
        }
        Ok(Self { prefix, suffix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Expected number of attempts: 16^(pattern nibbles).
    pub fn difficulty(&self) -> f64 {
        16f64.powi((self.prefix.len() + self.suffix.len()) as i32)
    }

    /// Pack into the fixed-layout descriptor uploaded to the device.
    pub fn descriptor(&self) -> PatternDescriptor {
        let mut d = PatternDescriptor::default();
        d.prefix_nibbles = self.prefix.len() as u8;
        d.prefix_is_odd = (self.prefix.len() % 2 == 1) as u8;
        d.suffix_nibbles = self.suffix.len() as u8;
        d.suffix_is_odd = (self.suffix.len() % 2 == 1) as u8;

        // odd prefix: right-pad with a 0 nibble
        let mut padded = self.prefix.clone();
        if d.prefix_is_odd == 1 {
            padded.push('0');
        }
        let bytes = hex::decode(&padded).expect("validated hex");
        d.prefix_bytes[..bytes.len()].copy_from_slice(&bytes);

        // odd suffix: left-pad with a 0 nibble so the low nibble lines up
        let mut padded = self.suffix.clone();
        if d.suffix_is_odd == 1 {
            padded.insert(0, '0');
        }
        let bytes = hex::decode(&padded).expect("validated hex");
        d.suffix_bytes[..bytes.len()].copy_from_slice(&bytes);

        d
    }

    /// Byte-level match on a raw 20-byte address, the same predicate the
    /// kernel evaluates.
    pub fn matches(&self, address: &[u8; 20]) -> bool {
        self.descriptor().matches(address)
    }

    /// String-level match on the 40-char lowercase hex body. Only used to
    /// cross-check the byte-level predicate.
    pub fn matches_hex(&self, body: &str) -> bool {
        body.starts_with(&self.prefix) && body.ends_with(&self.suffix)
    }
}

/// Fixed-layout pattern blob read by the kernel at fixed offsets:
///
/// ```text
/// [ 0, 20)  prefix bytes (odd length right-padded with a 0 nibble)
/// 20        prefix nibble length
/// 21        prefix is odd (0/1)
/// [22, 42)  suffix bytes (odd length left-padded with a 0 nibble)
/// 42        suffix nibble length
/// 43        suffix is odd (0/1)
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct PatternDescriptor {
    pub prefix_bytes: [u8; 20],
    pub suffix_bytes: [u8; 20],
    pub prefix_nibbles: u8,
    pub prefix_is_odd: u8,
    pub suffix_nibbles: u8,
    pub suffix_is_odd: u8,
}

impl PatternDescriptor {
    pub fn to_bytes(&self) -> [u8; DESCRIPTOR_BYTES] {
        let mut out = [0u8; DESCRIPTOR_BYTES];
        out[0..20].copy_from_slice(&self.prefix_bytes);
        out[20] = self.prefix_nibbles;
        out[21] = self.prefix_is_odd;
        out[22..42].copy_from_slice(&self.suffix_bytes);
        out[42] = self.suffix_nibbles;
        out[43] = self.suffix_is_odd;
        out
    }

    /// The matcher the kernel runs, expressed on the host for the CPU
    /// backend and the tests. Whole-byte compares except the boundary
    /// nibble: high nibble for an odd prefix, low nibble for an odd suffix.
    pub fn matches(&self, address: &[u8; 20]) -> bool {
        if self.prefix_nibbles > 0 {
            let nbytes = (self.prefix_nibbles as usize + 1) / 2;
            for i in 0..nbytes - 1 {
                if address[i] != self.prefix_bytes[i] {
                    return false;
                }
            }
            let got = address[nbytes - 1];
            let want = self.prefix_bytes[nbytes - 1];
            if self.prefix_is_odd == 1 {
                if got & 0xF0 != want & 0xF0 {
                    return false;
                }
            } else if got != want {
                return false;
            }
        }
        if self.suffix_nibbles > 0 {
            let nbytes = (self.suffix_nibbles as usize + 1) / 2;
            let start = 20 - nbytes;
            for i in 0..nbytes {
                let got = address[start + i];
                let want = self.suffix_bytes[i];
                if i == 0 && self.suffix_is_odd == 1 {
                    if got & 0x0F != want & 0x0F {
                        return false;
                    }
                } else if got != want {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(hex_body: &str) -> [u8; 20] {
        let mut a = [0u8; 20];
        a.copy_from_slice(&hex::decode(hex_body).unwrap());
        a
    }

    const BODY: &str = "deadbeef00112233445566778899aabbccddeefb";

    #[test]
    fn rejects_non_hex() {
        assert!(matches!(
            Pattern::new("ghi", ""),
            Err(SearchError::InvalidPattern(_))
        ));
        assert!(matches!(
            Pattern::new("", "xyz"),
            Err(SearchError::InvalidPattern(_))
        ));
    }

    #[test]
    fn rejects_over_length() {
        let long = "a".repeat(41);
        assert!(matches!(
            Pattern::new(&long, ""),
            Err(SearchError::InvalidPattern(_))
        ));
        // 40 nibbles combined is still legal
        assert!(Pattern::new(&"a".repeat(20), &"b".repeat(20)).is_ok());
    }

    #[test]
    fn rejects_empty_pattern() {
        assert!(matches!(
            Pattern::new("", ""),
            Err(SearchError::InvalidPattern(_))
        ));
    }

    #[test]
    fn normalises_case_and_0x() {
        let p = Pattern::new("0xDEAD", "BEeF").unwrap();
        assert_eq!(p.prefix(), "dead");
        assert_eq!(p.suffix(), "beef");
    }

    #[test]
    fn even_prefix_and_suffix() {
        let p = Pattern::new("dead", "eefb").unwrap();
        assert!(p.matches(&addr(BODY)));
        let p = Pattern::new("deae", "").unwrap();
        assert!(!p.matches(&addr(BODY)));
    }

    #[test]
    fn single_nibble_prefix_matches_first_hex_char_exactly() {
        let p = Pattern::new("d", "").unwrap();
        assert!(p.matches(&addr(BODY)));
        // 0xd? must match, 0x?d must not
        assert!(p.matches(&addr("d0112233445566778899aabbccddeeff00112233")));
        assert!(!p.matches(&addr("0d112233445566778899aabbccddeeff00112233")));
    }

    #[test]
    fn single_nibble_suffix_matches_last_hex_char_exactly() {
        let p = Pattern::new("", "b").unwrap();
        assert!(p.matches(&addr(BODY)));
        assert!(!p.matches(&addr("deadbeef00112233445566778899aabbccddeebf")));
    }

    #[test]
    fn odd_prefix_three_nibbles() {
        let p = Pattern::new("dea", "").unwrap();
        assert!(p.matches(&addr(BODY)));
        assert!(!p.matches(&addr("debdbeef00112233445566778899aabbccddeefb")));
    }

    #[test]
    fn odd_suffix_three_nibbles() {
        let p = Pattern::new("", "efb").unwrap();
        assert!(p.matches(&addr(BODY)));
        assert!(!p.matches(&addr("deadbeef00112233445566778899aabbccddeffb")));
    }

    #[test]
    fn byte_predicate_agrees_with_string_predicate() {
        // round-trip property over a spread of patterns and addresses
        let bodies = [
            BODY,
            "0000000000000000000000000000000000000000",
            "a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5",
            "d00dbeef00112233445566778899aabbccddeefb",
        ];
        let patterns = [
            ("d", ""),
            ("", "b"),
            ("dead", "eefb"),
            ("a", "5"),
            ("dea", "efb"),
            ("00", "00"),
        ];
        for (pre, suf) in patterns {
            let p = Pattern::new(pre, suf).unwrap();
            for body in bodies {
                assert_eq!(
                    p.matches(&addr(body)),
                    p.matches_hex(body),
                    "verdicts diverge for ({}, {}) on {}",
                    pre,
                    suf,
                    body
                );
            }
        }
    }

    #[test]
    fn descriptor_layout() {
        let p = Pattern::new("abc", "de").unwrap();
        let bytes = p.descriptor().to_bytes();
        assert_eq!(&bytes[0..2], &[0xab, 0xc0]); // right-padded
        assert_eq!(bytes[20], 3);
        assert_eq!(bytes[21], 1);
        assert_eq!(bytes[22], 0xde);
        assert_eq!(bytes[42], 2);
        assert_eq!(bytes[43], 0);

        let p = Pattern::new("", "f").unwrap();
        let bytes = p.descriptor().to_bytes();
        assert_eq!(bytes[22], 0x0f); // left-padded
        assert_eq!(bytes[42], 1);
        assert_eq!(bytes[43], 1);
    }

    #[test]
    fn full_length_pattern_pins_every_nibble() {
        let p = Pattern::new(BODY, "").unwrap();
        assert!(p.matches(&addr(BODY)));
        assert!(!p.matches(&addr("deadbeef00112233445566778899aabbccddeefc")));
    }
}
