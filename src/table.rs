//! The precomputed multiples-of-G table.
//!
//! `tables.bin` holds 2^20 affine points, 64 bytes each: X then Y as 32
//! little-endian bytes. Entry i is i*G; entry 0 is all zero (the point at
//! infinity). Generated once with the reference library and reused on every
//! later run; a file with the wrong size is rejected outright, since
//! truncated or corrupted data would feed arbitrary garbage to the kernel
//! as curve points.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{ProjectivePoint, Scalar};
use memmap2::Mmap;
use rayon::prelude::*;

use crate::error::{Result, SearchError};

pub const TABLE_ENTRIES: usize = 1 << 20;
pub const ENTRY_BYTES: usize = 64;
pub const TABLE_BYTES: usize = TABLE_ENTRIES * ENTRY_BYTES;

/// Entries generated per parallel chunk. Each chunk pays one scalar
/// multiplication for its start point, then walks by point addition.
const GEN_CHUNK: usize = 8192;

/// Loaded table bytes, either memory-mapped from disk or freshly generated.
pub enum Table {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Table {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Table::Mapped(map) => map,
            Table::Owned(buf) => buf,
        }
    }

    /// The 64-byte record for entry i.
    pub fn entry(&self, i: usize) -> &[u8] {
        &self.bytes()[i * ENTRY_BYTES..(i + 1) * ENTRY_BYTES]
    }
}

/// Open the table, or generate and persist it on first run.
pub fn load_or_generate(path: &Path) -> Result<Table> {
    if path.exists() {
        let file = File::open(path).map_err(|e| {
            SearchError::TableUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        let len = file
            .metadata()
            .map_err(|e| SearchError::TableUnavailable(e.to_string()))?
            .len();
        if len != TABLE_BYTES as u64 {
            return Err(SearchError::TableUnavailable(format!(
                "{} is {} bytes, expected {}; delete it and restart",
                path.display(),
                len,
                TABLE_BYTES
            )));
        }
        let map = unsafe { Mmap::map(&file) }
            .map_err(|e| SearchError::TableUnavailable(format!("mmap failed: {}", e)))?;
        return Ok(Table::Mapped(map));
    }

    println!("[⚙] First-time setup: generating {} MB point table (one-off)...", TABLE_BYTES / (1024 * 1024));
    let started = Instant::now();
    let data = generate_entries(TABLE_ENTRIES);
    println!("[✓] Table generated in {:.1}s", started.elapsed().as_secs_f64());

    match File::create(path).and_then(|mut f| f.write_all(&data)) {
        Ok(()) => println!("[✓] Saved to {}", path.display()),
        // keep searching with the in-memory copy; next run regenerates
        Err(e) => eprintln!("[!] Could not save {}: {}", path.display(), e),
    }
    Ok(Table::Owned(data))
}

/// Generate the first `count` table entries. Parallel across chunks: chunk
/// k starts from (k*GEN_CHUNK)*G and steps by repeated addition of G.
pub fn generate_entries(count: usize) -> Vec<u8> {
    let mut buf = vec![0u8; count * ENTRY_BYTES];
    buf.par_chunks_mut(GEN_CHUNK * ENTRY_BYTES)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let start = chunk_idx * GEN_CHUNK;
            let mut point = if start == 0 {
                ProjectivePoint::GENERATOR
            } else {
                ProjectivePoint::GENERATOR * Scalar::from(start as u64)
            };
            for (j, entry) in chunk.chunks_exact_mut(ENTRY_BYTES).enumerate() {
                let i = start + j;
                if i == 0 {
                    // infinity marker stays all zero
                    continue;
                }
                write_point(entry, &point);
                point += ProjectivePoint::GENERATOR;
            }
        });
    buf
}

/// Serialise one affine point as X || Y, 32 little-endian bytes each.
fn write_point(entry: &mut [u8], point: &ProjectivePoint) {
    let encoded = point.to_affine().to_encoded_point(false);
    let x = encoded.x().expect("table points are never infinity");
    let y = encoded.y().expect("table points are never infinity");
    for (dst, src) in entry[0..32].iter_mut().zip(x.iter().rev()) {
        *dst = *src;
    }
    for (dst, src) in entry[32..64].iter_mut().zip(y.iter().rev()) {
        *dst = *src;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{AffinePoint, FieldElement, JacobianPoint, GX, GY};

    fn entry_point(data: &[u8], i: usize) -> AffinePoint {
        let e = &data[i * ENTRY_BYTES..(i + 1) * ENTRY_BYTES];
        AffinePoint {
            x: FieldElement::from_le_bytes(&e[0..32].try_into().unwrap()),
            y: FieldElement::from_le_bytes(&e[32..64].try_into().unwrap()),
        }
    }

    #[test]
    fn entry_zero_is_all_zero() {
        let data = generate_entries(4);
        assert!(data[0..ENTRY_BYTES].iter().all(|&b| b == 0));
    }

    #[test]
    fn entry_one_is_the_generator() {
        // S7 known answer: Gx = 0x79BE667E...F81798, Gy = 0x483ADA77...B10D4B8
        let data = generate_entries(4);
        let g = entry_point(&data, 1);
        assert_eq!(g.x, GX);
        assert_eq!(g.y, GY);
        assert_eq!(
            hex::encode(g.x.to_be_bytes()),
            "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert_eq!(
            hex::encode(g.y.to_be_bytes()),
            "483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
        );
    }

    #[test]
    fn entries_follow_the_add_g_recurrence() {
        // enough entries to cross one parallel chunk boundary
        let count = GEN_CHUNK + 32;
        let data = generate_entries(count);
        let g = AffinePoint::generator();
        for i in [1, 2, 3, 17, GEN_CHUNK - 1, GEN_CHUNK, GEN_CHUNK + 1] {
            let prev = JacobianPoint::from_affine(&entry_point(&data, i - 1));
            let sum = prev.add_mixed(&g);
            let expect = sum.to_affine(&sum.z.inv());
            assert_eq!(
                expect,
                entry_point(&data, i),
                "entry {} != entry {} + G",
                i,
                i - 1
            );
        }
    }

    #[test]
    fn existing_full_size_table_is_mapped_not_regenerated() {
        let path = std::env::temp_dir().join(format!(
            "hexvane_table_idempotence_{}.bin",
            std::process::id()
        ));
        std::fs::write(&path, vec![0u8; TABLE_BYTES]).unwrap();
        let table = load_or_generate(&path).unwrap();
        assert!(matches!(table, Table::Mapped(_)));
        assert_eq!(table.bytes().len(), TABLE_BYTES);
        assert_eq!(table.entry(TABLE_ENTRIES - 1).len(), ENTRY_BYTES);
        drop(table);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn wrong_size_file_is_rejected() {
        let path = std::env::temp_dir().join("hexvane_truncated_table_test.bin");
        std::fs::write(&path, vec![0u8; 1024]).unwrap();
        let err = load_or_generate(&path).err().expect("must reject");
        assert!(matches!(err, SearchError::TableUnavailable(_)));
        std::fs::remove_file(&path).ok();
    }
}
