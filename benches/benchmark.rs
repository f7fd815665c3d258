use criterion::{black_box, criterion_group, criterion_main, Criterion};
use k256::SecretKey;
use rand::rngs::OsRng;

use hexvane::crypto;
use hexvane::field::{batch_invert, FieldElement, JacobianPoint, LANES, GX, GY};
use hexvane::keccak;
use hexvane::pattern::Pattern;

/// Field multiplication, the kernel's dominant operation.
fn bench_field_mul(c: &mut Criterion) {
    let a = GX;
    let b = GY;
    c.bench_function("field_mul", |bench| {
        bench.iter(|| black_box(black_box(&a).mul(black_box(&b))))
    });
}

/// Fermat inversion, amortised to one call per 256 lanes on the device.
fn bench_field_inv(c: &mut Criterion) {
    let a = GX;
    c.bench_function("field_inv", |bench| {
        bench.iter(|| black_box(black_box(&a).inv()))
    });
}

/// The full 256-lane batch inversion versus 256 single inversions.
fn bench_batch_invert(c: &mut Criterion) {
    let mut z = [FieldElement::ZERO; LANES];
    for (i, slot) in z.iter_mut().enumerate() {
        *slot = FieldElement([i as u32 + 2, 1, 0, 0, 0, 0, 0, 0]).mul(&GX);
    }
    c.bench_function("batch_invert_256", |bench| {
        bench.iter(|| black_box(batch_invert(black_box(&z))))
    });
}

/// Mixed Jacobian+affine addition, one per lane per batch.
fn bench_mixed_add(c: &mut Criterion) {
    let base = JacobianPoint::from_affine(&hexvane::field::AffinePoint::generator());
    let mut x = [0u8; 32];
    let mut y = [0u8; 32];
    hex::decode_to_slice(
        "c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5",
        &mut x,
    )
    .unwrap();
    hex::decode_to_slice(
        "1ae168fea63dc339a3c58419466ceaeef7f632653266d0e1236431a950cfe52a",
        &mut y,
    )
    .unwrap();
    let two_g = hexvane::field::AffinePoint {
        x: FieldElement::from_be_bytes(&x),
        y: FieldElement::from_be_bytes(&y),
    };
    c.bench_function("mixed_add", |bench| {
        bench.iter(|| black_box(black_box(&base).add_mixed(black_box(&two_g))))
    });
}

/// Keccak-256 over the 64-byte public-key block.
fn bench_keccak(c: &mut Criterion) {
    let input = [0xA5u8; 64];
    c.bench_function("keccak256_pubkey_block", |bench| {
        bench.iter(|| black_box(keccak::keccak256(black_box(&input))))
    });
}

/// One CPU-backend attempt: key generation plus address derivation.
fn bench_cpu_attempt(c: &mut Criterion) {
    use k256::elliptic_curve::sec1::ToEncodedPoint;
    c.bench_function("cpu_attempt", |bench| {
        bench.iter(|| {
            let secret = SecretKey::random(&mut OsRng);
            let encoded = secret.public_key().to_encoded_point(false);
            let mut xy = [0u8; 64];
            xy.copy_from_slice(&encoded.as_bytes()[1..65]);
            black_box(crypto::pubkey_to_address(&xy))
        })
    });
}

/// The byte-level matcher on its own.
fn bench_pattern_match(c: &mut Criterion) {
    let matcher = Pattern::new("dead", "beef").unwrap().descriptor();
    let address = [0x11u8; 20];
    c.bench_function("pattern_match", |bench| {
        bench.iter(|| black_box(matcher.matches(black_box(&address))))
    });
}

criterion_group!(
    benches,
    bench_field_mul,
    bench_field_inv,
    bench_batch_invert,
    bench_mixed_add,
    bench_keccak,
    bench_cpu_attempt,
    bench_pattern_match
);
criterion_main!(benches);
