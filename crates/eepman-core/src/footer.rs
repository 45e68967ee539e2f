//! Footer codec (spec `4.2`).
//!
//! The footer occupies the last block of a replica: a 5-byte magic tag,
//! a 64-byte lowercase-hex SHA-256 digest, and a 10-byte zero-padded decimal
//! write counter. The remainder of the footer block is unspecified and is
//! zeroed by the writer before any footer write (see [`zero_footer_block`]).
//!
//! Magic length note: spec `3. DATA MODEL` and `6. EXTERNAL INTERFACES` both
//! give the magic field as occupying 5 bytes (`footer_len = 5 + 64 + 10`,
//! and the offset table `offset 0..4`), while the prose spells the tag as
//! the 6-character string `eepman`. Since the numeric footer length recurs
//! throughout the capacity arithmetic (pool capacity `C`, the minimum block
//! size rejection), that arithmetic is treated as authoritative and the
//! on-disk magic is the 5-byte prefix `eepma` (see `DESIGN.md`).

use std::fs::File;
use std::io::{Seek, SeekFrom};

use crate::block_io;
use crate::digest::DIGEST_HEX_LEN;
use crate::error::{EepmanError, Result};

/// On-disk magic tag identifying an initialised replica.
pub const FOOTER_MAGIC: &[u8; MAGIC_LEN] = b"eepma";

/// Length in bytes of the magic tag.
pub const MAGIC_LEN: usize = 5;

/// Width in decimal digits of the zero-padded write counter.
pub const COUNTER_DIGITS: usize = 10;

/// Total size of the footer region: magic + digest + counter.
pub const FOOTER_LEN: usize = MAGIC_LEN + DIGEST_HEX_LEN + COUNTER_DIGITS;

/// Largest write counter representable in [`COUNTER_DIGITS`] decimal digits.
pub const MAX_COUNTER: u64 = 9_999_999_999;

/// Outcome of reading a replica's footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FooterKind {
    /// A well-formed footer with the given digest and write counter.
    Valid { digest_hex: String, counter: u64 },
    /// The magic tag did not match; the replica is uninitialised.
    BadMagic,
}

/// Seeks to the start of the footer block (`-block_size` from end).
fn seek_to_footer(file: &mut File, block_size: u64) -> Result<()> {
    file.seek(SeekFrom::End(-(block_size as i64)))?;
    Ok(())
}

/// Reads and parses the footer block of an already-open, already-positioned
/// replica handle.
pub fn read_footer(file: &mut File, block_size: u64) -> Result<FooterKind> {
    seek_to_footer(file, block_size)?;

    let mut magic = [0u8; MAGIC_LEN];
    block_io::read_exact(file, &mut magic)?;
    if &magic != FOOTER_MAGIC {
        return Ok(FooterKind::BadMagic);
    }

    let mut digest_buf = [0u8; DIGEST_HEX_LEN];
    block_io::read_exact(file, &mut digest_buf)?;
    let digest_hex = String::from_utf8(digest_buf.to_vec())
        .map_err(|_| EepmanError::Invalid("footer digest is not valid UTF-8".into()))?;

    let mut counter_buf = [0u8; COUNTER_DIGITS];
    block_io::read_exact(file, &mut counter_buf)?;
    let counter_str = std::str::from_utf8(&counter_buf)
        .map_err(|_| EepmanError::Invalid("footer counter is not valid UTF-8".into()))?;
    let counter: u64 = counter_str
        .parse()
        .map_err(|_| EepmanError::Invalid(format!("footer counter {counter_str:?} is not decimal")))?;

    Ok(FooterKind::Valid { digest_hex, counter })
}

/// Writes the footer block: magic, digest, then zero-padded counter.
///
/// The caller must have already zeroed the footer block via
/// [`zero_footer_block`].
pub fn write_footer(file: &mut File, digest_hex: &str, counter: u64, block_size: u64) -> Result<()> {
    debug_assert_eq!(digest_hex.len(), DIGEST_HEX_LEN);
    debug_assert!(counter <= MAX_COUNTER);

    seek_to_footer(file, block_size)?;
    block_io::write_exact(file, FOOTER_MAGIC)?;
    block_io::write_exact(file, digest_hex.as_bytes())?;
    let counter_str = format!("{counter:0width$}", width = COUNTER_DIGITS);
    block_io::write_exact(file, counter_str.as_bytes())?;
    Ok(())
}

/// Zeroes the entire footer block. Must precede any [`write_footer`] call so
/// that a crash between the zero-write and the footer write leaves the
/// footer unambiguously invalid (`BadMagic`) rather than stale-but-valid.
pub fn zero_footer_block(file: &mut File, block_size: u64) -> Result<()> {
    seek_to_footer(file, block_size)?;
    let zeros = vec![0u8; block_size as usize];
    block_io::write_exact(file, &zeros)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn replica_file(block_size: u64, block_count: u64) -> File {
        let file = tempfile::tempfile().unwrap();
        file.set_len(block_size * block_count).unwrap();
        file
    }

    #[test]
    fn blank_replica_reports_bad_magic() {
        let mut file = replica_file(256, 4);
        let footer = read_footer(&mut file, 256).unwrap();
        assert_eq!(footer, FooterKind::BadMagic);
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut file = replica_file(256, 4);
        let digest = "a".repeat(DIGEST_HEX_LEN);
        zero_footer_block(&mut file, 256).unwrap();
        write_footer(&mut file, &digest, 42, 256).unwrap();
        let footer = read_footer(&mut file, 256).unwrap();
        assert_eq!(
            footer,
            FooterKind::Valid {
                digest_hex: digest,
                counter: 42
            }
        );
    }

    #[test]
    fn counter_is_zero_padded_to_ten_digits() {
        let mut file = replica_file(256, 4);
        let digest = "b".repeat(DIGEST_HEX_LEN);
        zero_footer_block(&mut file, 256).unwrap();
        write_footer(&mut file, &digest, 7, 256).unwrap();
        file.seek(SeekFrom::End(-(COUNTER_DIGITS as i64))).unwrap();
        let mut counter_buf = [0u8; COUNTER_DIGITS];
        block_io::read_exact(&mut file, &mut counter_buf).unwrap();
        assert_eq!(&counter_buf, b"0000000007");
    }

    #[test]
    fn footer_len_matches_spec_arithmetic() {
        assert_eq!(FOOTER_LEN, 79);
    }
}
