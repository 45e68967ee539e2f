//! Replica descriptor and pool (spec `3. DATA MODEL`).

use std::fs::File;
use std::path::PathBuf;

use crate::config::ReplicaSpec;

/// One physical EEPROM device, as a slot in the pool.
///
/// `handle` is populated only for the duration of an operation (by the lock
/// manager); `buffer` is populated only for the authoritative replica and
/// replaced wholesale on every successful write.
pub struct ReplicaDescriptor {
    pub path: PathBuf,
    pub block_size: u64,
    pub block_count: u64,
    pub handle: Option<File>,
    /// Last-known content digest. Empty string means "unknown" -- the same
    /// sentinel `repair` uses to force a clone's no-op check to fail.
    pub digest_hex: String,
    pub counter: u64,
    pub buffer: Option<Vec<u8>>,
}

impl ReplicaDescriptor {
    fn new(spec: ReplicaSpec) -> Self {
        Self {
            path: spec.path,
            block_size: spec.block_size,
            block_count: spec.block_count,
            handle: None,
            digest_hex: String::new(),
            counter: 0,
            buffer: None,
        }
    }

    /// Document capacity of this replica alone: the final block is reserved
    /// for the footer, so the document region is only the first
    /// `block_count - 1` blocks. See [`Pool::capacity`] for the pool-wide
    /// capacity used throughout the engine.
    pub fn own_capacity(&self) -> usize {
        (self.block_size * self.block_count.saturating_sub(1)) as usize
    }
}

/// A read-only snapshot of one replica, returned by `Store::info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaInfo {
    pub path: PathBuf,
    pub block_size: u64,
    pub block_count: u64,
    pub total_bytes: u64,
}

/// The ordered sequence of replica descriptors, plus pool-wide derived state.
pub struct Pool {
    pub replicas: Vec<ReplicaDescriptor>,
    /// `C`: the largest serialised document the whole pool can hold, i.e.
    /// the minimum of each replica's own capacity.
    pub capacity: usize,
    /// Index into `replicas` of the current authoritative replica.
    pub authoritative: usize,
}

impl Pool {
    /// Builds a pool from configuration specs, computing the pool-wide
    /// capacity and warning about replicas whose geometry differs from the
    /// rest of the pool (spec `4.8`).
    pub fn build(specs: Vec<ReplicaSpec>) -> Self {
        let reference = specs.first().map(|s| (s.block_size, s.block_count));
        let mut capacity = usize::MAX;
        let mut replicas = Vec::with_capacity(specs.len());

        for spec in specs {
            if let Some((ref_block_size, ref_block_count)) = reference {
                if spec.block_size != ref_block_size || spec.block_count != ref_block_count {
                    log::warn!(
                        "eepman: replica {} is {}x{} bytes, differs from pool reference {}x{}",
                        spec.path.display(),
                        spec.block_size,
                        spec.block_count,
                        ref_block_size,
                        ref_block_count,
                    );
                }
            }
            let replica = ReplicaDescriptor::new(spec);
            capacity = capacity.min(replica.own_capacity());
            replicas.push(replica);
        }

        if replicas.is_empty() {
            capacity = 0;
        }

        Self {
            replicas,
            capacity,
            authoritative: 0,
        }
    }

    pub fn info(&self) -> Vec<ReplicaInfo> {
        self.replicas
            .iter()
            .map(|r| ReplicaInfo {
                path: r.path.clone(),
                block_size: r.block_size,
                block_count: r.block_count,
                total_bytes: r.block_size * r.block_count,
            })
            .collect()
    }
}
