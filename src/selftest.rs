//! Startup self-test.
//!
//! Runs before any search and cross-checks the hand-rolled kernel math
//! (the host twins in `field` and `keccak`) against the `k256`/`sha3`
//! reference stack. A bug in that math means silently missed or wrong
//! matches, so failure aborts the program.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{ProjectivePoint, Scalar};
use sha3::{Digest, Keccak256};

use crate::crypto;
use crate::field::{batch_invert, AffinePoint, FieldElement, JacobianPoint, GX, GY, LANES};
use crate::keccak;
use crate::pattern::Pattern;
use crate::uint256::Uint256;

/// k*G as an `AffinePoint` via the reference library.
fn reference_point(k: u64) -> AffinePoint {
    let point = ProjectivePoint::GENERATOR * Scalar::from(k);
    let encoded = point.to_affine().to_encoded_point(false);
    let x: [u8; 32] = encoded.x().expect("non-infinity").as_slice().try_into().unwrap();
    let y: [u8; 32] = encoded.y().expect("non-infinity").as_slice().try_into().unwrap();
    AffinePoint {
        x: FieldElement::from_be_bytes(&x),
        y: FieldElement::from_be_bytes(&y),
    }
}

/// Verify the kernel-twin math against the reference implementation.
/// Returns false (after reporting every failure) if anything diverges.
pub fn run_self_test() -> bool {
    println!("[🔍] Running self-test...");
    let mut all_passed = true;
    let mut check = |name: &str, ok: bool| {
        if ok {
            println!("  [✓] {}", name);
        } else {
            eprintln!("  [✗] {}", name);
            all_passed = false;
        }
    };

    // field reduction: 2^128 squared folds to the reduction constant
    let two_128 = FieldElement([0, 0, 0, 0, 1, 0, 0, 0]);
    check(
        "field multiply (2^128)^2 = 2^32 + 977",
        two_128.square() == FieldElement([0x3D1, 1, 0, 0, 0, 0, 0, 0]),
    );

    // Fermat inversion round-trips
    let two = FieldElement([2, 0, 0, 0, 0, 0, 0, 0]);
    check(
        "field inversion 2 * inv(2) = 1",
        two.mul(&two.inv()) == FieldElement::ONE,
    );
    check(
        "field inversion Gx * inv(Gx) = 1",
        GX.mul(&GX.inv()) == FieldElement::ONE,
    );

    // generator constants agree with the reference library
    let g = reference_point(1);
    check("generator constants match k256", g.x == GX && g.y == GY);

    // mixed addition against the reference curve: 5G + 7G = 12G
    let five_g = JacobianPoint::from_affine(&reference_point(5));
    let twelve = five_g.add_mixed(&reference_point(7));
    let twelve_affine = twelve.to_affine(&twelve.z.inv());
    check("mixed addition 5G + 7G = 12G", twelve_affine == reference_point(12));

    // gid 0: infinity table entry must pass the base point through
    let base = JacobianPoint::from_affine(&reference_point(9));
    let through = base.add_mixed(&AffinePoint::INFINITY);
    check(
        "infinity entry passes the base point through",
        through.to_affine(&through.z.inv()) == reference_point(9),
    );

    // workgroup batch inversion inverts every lane
    let mut z = [FieldElement::ZERO; LANES];
    for (i, slot) in z.iter_mut().enumerate() {
        *slot = FieldElement([i as u32 + 3, 1, 0, 0, 0, 0, 0, 0]).mul(&GY);
    }
    let inv = batch_invert(&z);
    check(
        "batch inversion over 256 lanes",
        z.iter()
            .zip(inv.iter())
            .all(|(a, b)| a.mul(b) == FieldElement::ONE),
    );

    // Keccak permutation against the known answer and the sha3 crate
    check(
        "Keccak-256 empty-input known answer",
        hex::encode(keccak::keccak256(&[]))
            == "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470",
    );
    let pubkey_one = crypto::derive_pubkey(&key_bytes(1)).expect("key 1 is valid");
    let reference: [u8; 32] = Keccak256::digest(pubkey_one).into();
    check(
        "Keccak-256 of G matches the sha3 crate",
        keccak::keccak256(&pubkey_one) == reference,
    );

    // end-to-end address derivation known answer
    check(
        "address of private key 1",
        crypto::derive_address(&key_bytes(1))
            .map(|a| crypto::address_hex(&a))
            .as_deref()
            == Some("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"),
    );

    // private-key reconstruction: base + gid with carry
    let mut base = [0u8; 32];
    base[24..32].copy_from_slice(&u64::MAX.to_be_bytes());
    let reconstructed = Uint256::from_be_bytes(&base).wrapping_add_u32(1);
    let mut expected = [0u8; 32];
    expected[23] = 1;
    check(
        "key reconstruction carries across limbs",
        reconstructed.to_be_bytes() == expected,
    );

    // nibble-boundary matching
    let addr_a = crypto::derive_address(&key_bytes(1)).expect("valid"); // 0x7e5f...5bdf
    let odd_prefix = Pattern::new("7", "").expect("valid pattern");
    let odd_suffix = Pattern::new("", "f").expect("valid pattern");
    let wrong = Pattern::new("8", "").expect("valid pattern");
    check(
        "odd-nibble pattern boundaries",
        odd_prefix.matches(&addr_a) && odd_suffix.matches(&addr_a) && !wrong.matches(&addr_a),
    );

    if all_passed {
        println!("[✓] Self-test passed\n");
    } else {
        eprintln!("[✗] SELF-TEST FAILED - results would be unreliable, aborting\n");
    }
    all_passed
}

fn key_bytes(n: u8) -> [u8; 32] {
    let mut k = [0u8; 32];
    k[31] = n;
    k
}
