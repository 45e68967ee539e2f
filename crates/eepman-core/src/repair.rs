//! Pool repair (spec `4.6`): brings every non-authoritative replica back to
//! the authoritative replica's content and counter after quorum selection.

use crate::error::Result;
use crate::replica::Pool;
use crate::replica_io;

/// Repairs every replica in `pool` whose footer counter or digest disagrees
/// with the authoritative replica, by cloning the authoritative document
/// into it.
///
/// `pool.authoritative` and the authoritative replica's `buffer` must
/// already be set (by [`crate::quorum::select_authoritative`]) before this
/// is called.
pub fn repair_pool(pool: &mut Pool) -> Result<()> {
    let auth = pool.authoritative;
    let auth_counter = pool.replicas[auth].counter;
    let auth_digest = pool.replicas[auth].digest_hex.clone();
    let auth_bytes = pool.replicas[auth]
        .buffer
        .clone()
        .unwrap_or_default();

    for index in 0..pool.replicas.len() {
        if index == auth {
            continue;
        }
        let needs_repair = {
            let replica = &pool.replicas[index];
            replica.counter != auth_counter || replica.digest_hex != auth_digest
        };
        if !needs_repair {
            continue;
        }
        log::info!(
            "eepman: repairing replica {} from authoritative replica {}",
            pool.replicas[index].path.display(),
            pool.replicas[auth].path.display(),
        );
        clone_into(&mut pool.replicas[index], &auth_bytes, auth_counter);
    }

    Ok(())
}

/// Clones `bytes` into `dest`, landing exactly on `target_counter`.
///
/// Presets `dest.counter` to `target_counter - 1` (saturating at 0) and
/// clears `dest.digest_hex` so [`replica_io::write_document`]'s no-op check
/// never short-circuits the clone, then performs the write. `dest.buffer`
/// is deliberately never populated here -- the clone only ever borrows the
/// authoritative replica's bytes, it does not take ownership of them.
fn clone_into(dest: &mut crate::replica::ReplicaDescriptor, bytes: &[u8], target_counter: u64) {
    dest.digest_hex.clear();
    dest.counter = target_counter.saturating_sub(1);
    if let Err(e) = replica_io::write_document(dest, bytes) {
        log::warn!("eepman: failed to repair replica {}: {e}", dest.path.display());
    }
    dest.buffer = None;
}
