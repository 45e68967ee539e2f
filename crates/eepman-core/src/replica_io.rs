//! Replica I/O (spec `4.3`): whole-document read/write with footer update
//! and last-block zeroing.

use std::fs::File;
use std::io::{Seek, SeekFrom};

use crate::block_io;
use crate::digest;
use crate::error::{EepmanError, Result};
use crate::footer::{self, MAX_COUNTER};
use crate::replica::ReplicaDescriptor;

/// Reads the document region of an already-open, already-locked replica.
///
/// Reads in `block_size`-sized chunks for up to `block_count - 1` blocks,
/// stopping as soon as a NUL byte is seen. Bytes after the first NUL within
/// the scanned block are never included in the result (they are scanned but
/// discarded, matching the read-time "zero the tail in memory" rule -- the
/// returned vector is already truncated, so there is nothing stale to leak
/// into a subsequent digest computation).
pub fn read_document_bytes(file: &mut File, block_size: u64, block_count: u64, capacity: usize) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(0))?;

    let max_blocks = block_count.saturating_sub(1);
    let mut out = Vec::with_capacity(capacity.min(block_size as usize * max_blocks as usize));

    for _ in 0..max_blocks {
        if out.len() >= capacity {
            break;
        }
        let chunk_len = (block_size as usize).min(capacity - out.len());
        let mut chunk = vec![0u8; chunk_len];
        block_io::read_exact(file, &mut chunk)?;

        if let Some(pos) = chunk.iter().position(|&b| b == 0) {
            out.extend_from_slice(&chunk[..pos]);
            return Ok(out);
        }
        out.extend_from_slice(&chunk);
    }

    Ok(out)
}

/// Writes `bytes` as the document on `replica`, then updates its footer.
///
/// First zero-writes the footer block, then writes `bytes` in
/// `block_size`-sized chunks (zero-padding and stopping at the block that
/// first contains the terminating NUL), then writes the new footer with an
/// incremented counter. If `bytes`'s digest equals the replica's last-known
/// digest, the whole call is a no-op and the counter is not advanced
/// (spec `4.3`, "If the new digest equals the cached digest...").
///
/// A document that does not fit in the `block_count - 1` blocks available
/// for document storage is rejected outright (`own_capacity` is exactly
/// that many bytes) rather than silently truncated -- truncating would
/// leave the footer's digest describing the full, untruncated `bytes`
/// while the on-disk content is shorter, making the replica fail its own
/// digest check on the very next read.
///
/// Returns `true` if a write actually occurred.
pub fn write_document(replica: &mut ReplicaDescriptor, bytes: &[u8]) -> Result<bool> {
    let digest_hex = digest::sha256_hex(bytes);
    if digest_hex == replica.digest_hex {
        return Ok(false);
    }

    if bytes.len() > replica.own_capacity() {
        return Err(EepmanError::Invalid(format!(
            "document of {} bytes exceeds replica capacity of {} bytes",
            bytes.len(),
            replica.own_capacity()
        )));
    }
    if replica.counter >= MAX_COUNTER {
        return Err(EepmanError::CounterExhausted);
    }

    let block_size = replica.block_size;
    let block_count = replica.block_count;
    let file = replica
        .handle
        .as_mut()
        .ok_or_else(|| EepmanError::Invalid("replica handle is not open".into()))?;

    footer::zero_footer_block(file, block_size)?;
    file.seek(SeekFrom::Start(0))?;

    let max_blocks = block_count.saturating_sub(1);
    let mut written = 0usize;
    for _ in 0..max_blocks {
        let remaining = bytes.len() - written;
        let block_len = block_size as usize;
        let take = remaining.min(block_len);

        let mut chunk = vec![0u8; block_len];
        chunk[..take].copy_from_slice(&bytes[written..written + take]);
        block_io::write_exact(file, &chunk)?;
        written += take;

        if take < block_len {
            // This block held the terminating NUL; nothing further to write.
            break;
        }
        if written == bytes.len() {
            // Document exactly fills whole blocks (spec I5 boundary case):
            // no terminator is written, matching the fully-packed read path.
            break;
        }
    }

    let counter = replica.counter + 1;
    footer::write_footer(file, &digest_hex, counter, block_size)?;
    replica.counter = counter;
    replica.digest_hex = digest_hex;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReplicaSpec;
    use std::path::PathBuf;

    fn open_replica(block_size: u64, block_count: u64) -> ReplicaDescriptor {
        let spec = ReplicaSpec {
            path: PathBuf::from("/tmp/unused"),
            block_size,
            block_count,
        };
        let mut descriptor = crate::replica::Pool::build(vec![spec]).replicas.remove(0);
        let file = tempfile::tempfile().unwrap();
        file.set_len(block_size * block_count).unwrap();
        descriptor.handle = Some(file);
        descriptor
    }

    #[test]
    fn write_then_read_round_trips_short_document() {
        let mut replica = open_replica(64, 8);
        write_document(&mut replica, b"{}").unwrap();
        assert_eq!(replica.counter, 1);

        let file = replica.handle.as_mut().unwrap();
        let bytes = read_document_bytes(file, 64, 8, replica.own_capacity()).unwrap();
        assert_eq!(bytes, b"{}");
    }

    #[test]
    fn second_identical_write_is_a_no_op() {
        let mut replica = open_replica(64, 8);
        assert!(write_document(&mut replica, b"{}").unwrap());
        assert!(!write_document(&mut replica, b"{}").unwrap());
        assert_eq!(replica.counter, 1);
    }

    #[test]
    fn counter_increments_once_per_distinct_write() {
        let mut replica = open_replica(64, 8);
        write_document(&mut replica, br#"{"a":"1"}"#).unwrap();
        write_document(&mut replica, br#"{"a":"2"}"#).unwrap();
        assert_eq!(replica.counter, 2);
    }

    #[test]
    fn exact_fit_document_has_no_terminator_and_reads_back_in_full() {
        // One 128-byte data block (block_count=2: 1 data block + footer),
        // filled exactly: no NUL terminator is ever written or needed.
        let mut replica = open_replica(128, 2);
        let doc = vec![b'x'; 128];
        write_document(&mut replica, &doc).unwrap();
        let file = replica.handle.as_mut().unwrap();
        let bytes = read_document_bytes(file, 128, 2, replica.own_capacity()).unwrap();
        assert_eq!(bytes.len(), 128);
        assert_eq!(bytes, doc);
    }

    #[test]
    fn oversized_document_is_rejected() {
        let mut replica = open_replica(64, 8);
        let too_big = vec![b'x'; replica.own_capacity() + 1];
        assert!(write_document(&mut replica, &too_big).is_err());
    }

    #[test]
    fn rejected_write_leaves_the_previous_document_and_footer_untouched() {
        // block_size=64, block_count=8 => 7 data blocks, capacity = 448.
        // A document one byte over capacity must never partially land: the
        // footer would then describe a digest that the truncated on-disk
        // content can no longer reproduce.
        let mut replica = open_replica(64, 8);
        write_document(&mut replica, br#"{"a":"1"}"#).unwrap();
        let before_digest = replica.digest_hex.clone();
        let before_counter = replica.counter;

        let too_big = vec![b'x'; replica.own_capacity() + 1];
        assert!(write_document(&mut replica, &too_big).is_err());

        assert_eq!(replica.digest_hex, before_digest);
        assert_eq!(replica.counter, before_counter);
        let file = replica.handle.as_mut().unwrap();
        let bytes = read_document_bytes(file, 64, 8, replica.own_capacity()).unwrap();
        assert_eq!(bytes, br#"{"a":"1"}"#);
    }

    #[test]
    fn stale_tail_bytes_do_not_survive_a_shorter_rewrite() {
        let mut replica = open_replica(64, 8);
        write_document(&mut replica, &vec![b'x'; 200]).unwrap();
        write_document(&mut replica, b"{}").unwrap();
        let file = replica.handle.as_mut().unwrap();
        let bytes = read_document_bytes(file, 64, 8, replica.own_capacity()).unwrap();
        assert_eq!(bytes, b"{}");
    }
}
