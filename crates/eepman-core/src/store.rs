//! Store façade (spec `4.7`): the public entry points of the replicated
//! storage engine, serialised under a single process-wide mutex.

use std::path::PathBuf;

use parking_lot::Mutex;

use crate::config::{self, DEFAULT_CONFIG_PATH};
use crate::digest;
use crate::document::Document;
use crate::error::{EepmanError, Result};
use crate::lock;
use crate::quorum;
use crate::repair;
use crate::replica::{Pool, ReplicaInfo};
use crate::replica_io;

/// Outcome of [`Store::verify`]. The discriminants match the stable integer
/// codes of spec `4.7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Reserved: the authoritative replica could not be re-established.
    /// Not reachable through normal operation (see `OPEN QUESTION
    /// RESOLUTIONS` in the design notes).
    Unverifiable = 0,
    /// Every replica verified on the first pass; nothing needed repair.
    AllGood = 1,
    /// At least one replica failed verification but was repaired.
    Repaired = 2,
}

struct Inner {
    pool: Pool,
    config_path: PathBuf,
    initialised: bool,
}

/// The replicated storage engine's public handle.
///
/// All operations serialise under a single `parking_lot::Mutex`; within
/// that, every device-touching operation acquires and releases OS-level
/// advisory locks on the whole pool (spec `5. CONCURRENCY & RESOURCE MODEL`).
pub struct Store {
    inner: Mutex<Inner>,
}

impl Store {
    /// Builds a store that will read its replica set from `config_path`
    /// on the first [`Store::initialise`] call.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                pool: Pool::build(Vec::new()),
                config_path: config_path.into(),
                initialised: false,
            }),
        }
    }

    /// Builds a store reading from the default configuration path
    /// (`/etc/eeprom-manager.conf`).
    pub fn with_default_config() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration, builds the pool, selects the authoritative
    /// replica, and repairs divergent replicas. Idempotent: a second call
    /// is a no-op returning `Ok(())`.
    pub fn initialise(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.initialised {
            return Ok(());
        }

        let specs = config::load_config(&inner.config_path)?;
        let mut pool = Pool::build(specs);
        run_locked(&mut pool, |pool| {
            quorum::select_authoritative(pool)?;
            repair::repair_pool(pool)
        })?;

        inner.pool = pool;
        inner.initialised = true;
        Ok(())
    }

    /// Inserts or replaces `key -> value` across every replica. A `None`
    /// value is stored as the empty string. When `no_create` is set, fails
    /// with [`EepmanError::JsonKeyNotFound`] if `key` is not already present.
    pub fn set(&self, key: &str, value: Option<&str>, no_create: bool) -> Result<()> {
        let mut inner = self.inner.lock();
        ensure_initialised(&inner)?;
        let capacity = inner.pool.capacity;

        run_locked(&mut inner.pool, |pool| {
            let mut doc = Document::parse(authoritative_bytes(pool))?;
            if no_create && !doc.contains_key(key) {
                return Err(EepmanError::JsonKeyNotFound(key.to_string()));
            }
            doc.set(key, value);
            let bytes = doc.to_compact_bytes()?;
            if bytes.len() > capacity {
                return Err(EepmanError::WriteJsonTooLong {
                    len: bytes.len(),
                    capacity,
                });
            }
            write_to_all_replicas(pool, &bytes)
        })
    }

    /// Fetches `key`'s value from the authoritative document.
    pub fn get(&self, key: &str) -> Result<String> {
        let inner = self.inner.lock();
        ensure_initialised(&inner)?;
        let doc = Document::parse(authoritative_bytes(&inner.pool))?;
        doc.get(key).map(str::to_string)
    }

    /// Removes `key` from the document across every replica, if present.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        ensure_initialised(&inner)?;
        let capacity = inner.pool.capacity;

        run_locked(&mut inner.pool, |pool| {
            let mut doc = Document::parse(authoritative_bytes(pool))?;
            doc.remove(key);
            let bytes = doc.to_compact_bytes()?;
            if bytes.len() > capacity {
                return Err(EepmanError::WriteJsonTooLong {
                    len: bytes.len(),
                    capacity,
                });
            }
            write_to_all_replicas(pool, &bytes)
        })
    }

    /// Enumerates the currently-defined keys, in undefined order.
    pub fn keys(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock();
        ensure_initialised(&inner)?;
        Ok(Document::parse(authoritative_bytes(&inner.pool))?.keys())
    }

    /// Replaces the document with `{}` across every replica. The
    /// authoritative replica afterward is the first pool entry.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        ensure_initialised(&inner)?;

        run_locked(&mut inner.pool, |pool| {
            write_to_all_replicas(pool, b"{}")?;
            pool.authoritative = 0;
            pool.replicas[0].buffer = Some(b"{}".to_vec());
            Ok(())
        })
    }

    /// Re-runs quorum selection, then for each non-authoritative replica
    /// re-reads its on-disk content and recomputes its digest -- a replica
    /// whose footer still claims agreement with the authoritative one but
    /// whose actual content has been corrupted underneath it is caught here,
    /// not just ones whose footer counter or digest visibly disagree.
    pub fn verify(&self) -> Result<VerifyOutcome> {
        let mut inner = self.inner.lock();
        ensure_initialised(&inner)?;

        run_locked(&mut inner.pool, |pool| match quorum::select_authoritative(pool) {
            Err(EepmanError::NoGoodDevices) => Ok(VerifyOutcome::Unverifiable),
            Err(e) => Err(e),
            Ok(auth) => {
                let auth_digest = pool.replicas[auth].digest_hex.clone();
                let mut any_mismatch = false;

                for index in 0..pool.replicas.len() {
                    if index == auth {
                        continue;
                    }
                    let replica = &mut pool.replicas[index];
                    let file = replica
                        .handle
                        .as_mut()
                        .ok_or_else(|| EepmanError::Invalid("replica handle is not open".into()))?;
                    let bytes = replica_io::read_document_bytes(
                        file,
                        replica.block_size,
                        replica.block_count,
                        pool.capacity,
                    )?;
                    if digest::sha256_hex(&bytes) != auth_digest {
                        any_mismatch = true;
                        // The footer may still (falsely) claim agreement;
                        // clear it so repair does not skip this replica.
                        replica.digest_hex.clear();
                    }
                }

                repair::repair_pool(pool)?;
                Ok(if any_mismatch { VerifyOutcome::Repaired } else { VerifyOutcome::AllGood })
            }
        })
    }

    /// A read-only snapshot of the pool, in configuration order.
    pub fn info(&self) -> Result<Vec<ReplicaInfo>> {
        let inner = self.inner.lock();
        ensure_initialised(&inner)?;
        Ok(inner.pool.info())
    }

    /// Consumes the store, dropping the pool. Replica handles are never
    /// held between operations, so there is nothing further to release.
    pub fn shutdown(self) {}
}

fn ensure_initialised(inner: &Inner) -> Result<()> {
    if inner.initialised {
        Ok(())
    } else {
        Err(EepmanError::Invalid("store has not been initialised".into()))
    }
}

fn authoritative_bytes(pool: &Pool) -> &[u8] {
    pool.replicas[pool.authoritative].buffer.as_deref().unwrap_or(b"{}")
}

/// Writes `bytes` to the authoritative replica first (caching its buffer),
/// then to every other replica, per spec `4.7` ("authoritative first, then
/// clones to the rest").
fn write_to_all_replicas(pool: &mut Pool, bytes: &[u8]) -> Result<()> {
    let auth = pool.authoritative;
    replica_io::write_document(&mut pool.replicas[auth], bytes)?;
    pool.replicas[auth].buffer = Some(bytes.to_vec());

    for index in 0..pool.replicas.len() {
        if index == auth {
            continue;
        }
        replica_io::write_document(&mut pool.replicas[index], bytes)?;
    }
    Ok(())
}

/// Acquires locks on `pool`, runs `f`, and releases the locks unconditionally.
fn run_locked<F, R>(pool: &mut Pool, f: F) -> Result<R>
where
    F: FnOnce(&mut Pool) -> Result<R>,
{
    lock::acquire_all(pool)?;
    let result = f(pool);
    lock::release_all(pool);
    result
}
