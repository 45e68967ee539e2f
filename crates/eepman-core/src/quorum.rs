//! Quorum selector (spec `4.5`).
//!
//! Chooses the authoritative replica from a pool of open, locked handles:
//! the highest write counter among replicas with a valid footer, tie-broken
//! by the first candidate (in pool order) whose content digest verifies.

use crate::digest;
use crate::error::{EepmanError, Result};
use crate::footer::{self, FooterKind};
use crate::replica::Pool;
use crate::replica_io;

/// Runs quorum selection over `pool`, setting `pool.authoritative` and the
/// winning replica's `buffer`/`digest_hex`/`counter` on success.
///
/// All other replicas' footers are recorded (`digest_hex`/`counter`) but
/// their `buffer` is left empty -- only the winner's document is cached.
pub fn select_authoritative(pool: &mut Pool) -> Result<usize> {
    let mut footers = Vec::with_capacity(pool.replicas.len());
    for replica in pool.replicas.iter_mut() {
        let file = replica
            .handle
            .as_mut()
            .ok_or_else(|| EepmanError::Invalid("replica handle is not open".into()))?;
        let found = footer::read_footer(file, replica.block_size)?;
        // Record every replica's own footer, not just the eventual winner's,
        // so repair can tell an already-consistent replica from a stale one
        // instead of treating every non-authoritative descriptor's untouched
        // `counter=0`/`digest=""` defaults as a mismatch.
        if let FooterKind::Valid { digest_hex, counter } = &found {
            replica.digest_hex = digest_hex.clone();
            replica.counter = *counter;
        }
        footers.push(found);
    }

    let max_counter = footers
        .iter()
        .filter_map(|f| match f {
            FooterKind::Valid { counter, .. } => Some(*counter),
            FooterKind::BadMagic => None,
        })
        .max();

    let Some(max_counter) = max_counter else {
        return Err(EepmanError::NoGoodDevices);
    };

    for (index, found) in footers.into_iter().enumerate() {
        let FooterKind::Valid { digest_hex, counter } = found else {
            continue;
        };
        if counter != max_counter {
            continue;
        }

        let replica = &mut pool.replicas[index];
        let file = replica.handle.as_mut().expect("locked above");
        let bytes = replica_io::read_document_bytes(file, replica.block_size, replica.block_count, pool.capacity)?;
        let computed = digest::sha256_hex(&bytes);

        if computed == digest_hex {
            replica.digest_hex = digest_hex;
            replica.counter = counter;
            replica.buffer = Some(bytes);
            pool.authoritative = index;
            return Ok(index);
        }

        log::debug!(
            "eepman: replica {} at counter {counter} failed digest verification, skipping",
            replica.path.display()
        );
        replica.buffer = None;
    }

    Err(EepmanError::NoGoodDevices)
}
