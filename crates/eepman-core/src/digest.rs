//! SHA-256 digest wrapper (the "Digest" external adapter of spec `4.8`).

use sha2::{Digest, Sha256};

/// Length in bytes of a lowercase-hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Computes the SHA-256 digest of `bytes`, hex-encoded lowercase.
///
/// A minimal local encoder is used rather than a general-purpose hex crate:
/// the footer format is a fixed-width, fixed-case field, and spelling the
/// encoding out inline avoids having to fight a dependency's default casing.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(DIGEST_HEX_LEN);
    for byte in digest {
        out.push(hex_nibble(byte >> 4));
        out.push(hex_nibble(byte & 0x0f));
    }
    out
}

fn hex_nibble(n: u8) -> char {
    match n {
        0..=9 => (b'0' + n) as char,
        10..=15 => (b'a' + (n - 10)) as char,
        _ => unreachable!("nibble out of range"),
    }
}
