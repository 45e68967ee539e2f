//! Lock manager (spec `4.4`).
//!
//! Acquires an exclusive, whole-file OS-level advisory lock (`flock`) on
//! every replica in pool order before any I/O, and releases them in forward
//! order afterward. `libc::flock` is used directly (via the already-open
//! `std::fs::File`'s raw fd) rather than a dedicated advisory-lock crate --
//! none of this corpus's repos pull one in, and the donor workspace already
//! depends on `libc` pervasively for exactly this class of raw POSIX call.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;

use crate::error::Result;
use crate::replica::Pool;

/// Opens every replica's device file read-write (close-on-exec) and takes
/// an exclusive advisory lock on each, in pool order.
///
/// On failure, any locks and handles already acquired in this call are
/// released before the error is returned.
pub fn acquire_all(pool: &mut Pool) -> Result<()> {
    let mut acquired = Vec::with_capacity(pool.replicas.len());

    for (index, replica) in pool.replicas.iter_mut().enumerate() {
        match open_and_lock(&replica.path) {
            Ok(file) => {
                replica.handle = Some(file);
                acquired.push(index);
            }
            Err(e) => {
                for &done in &acquired {
                    release_one(&mut pool.replicas[done]);
                }
                return Err(e.into());
            }
        }
    }

    Ok(())
}

/// Releases every replica's lock and closes its handle, in forward order,
/// tolerating `EINTR` on unlock.
pub fn release_all(pool: &mut Pool) {
    for replica in pool.replicas.iter_mut() {
        release_one(replica);
    }
}

fn open_and_lock(path: &std::path::Path) -> std::io::Result<File> {
    loop {
        let opened = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_CLOEXEC)
            .open(path);

        let file = match opened {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        // SAFETY: `file` owns a valid, open fd for the duration of this call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc == 0 {
            return Ok(file);
        }
        let err = std::io::Error::last_os_error();
        if err.kind() == ErrorKind::Interrupted {
            continue;
        }
        return Err(err);
    }
}

fn release_one(replica: &mut crate::replica::ReplicaDescriptor) {
    let Some(file) = replica.handle.take() else {
        return;
    };
    let fd = file.as_raw_fd();
    loop {
        // SAFETY: `fd` is valid until `file` is dropped below.
        let rc = unsafe { libc::flock(fd, libc::LOCK_UN) };
        if rc == 0 || std::io::Error::last_os_error().kind() != ErrorKind::Interrupted {
            break;
        }
    }
    drop(file);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReplicaSpec;
    use std::path::PathBuf;

    fn replica_spec_at(path: &std::path::Path, block_size: u64, block_count: u64) -> ReplicaSpec {
        ReplicaSpec {
            path: path.to_path_buf(),
            block_size,
            block_count,
        }
    }

    #[test]
    fn acquire_and_release_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("replica0");
        std::fs::write(&path, vec![0u8; 256 * 4]).unwrap();

        let mut pool = Pool::build(vec![replica_spec_at(&path, 256, 4)]);
        acquire_all(&mut pool).unwrap();
        assert!(pool.replicas[0].handle.is_some());
        release_all(&mut pool);
        assert!(pool.replicas[0].handle.is_none());
    }

    #[test]
    fn acquire_fails_cleanly_when_a_replica_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("replica0");
        std::fs::write(&good, vec![0u8; 256 * 4]).unwrap();
        let missing = dir.path().join("does-not-exist");

        let mut pool = Pool::build(vec![
            replica_spec_at(&good, 256, 4),
            replica_spec_at(&missing, 256, 4),
        ]);
        let result = acquire_all(&mut pool);
        assert!(result.is_err());
        assert!(pool.replicas[0].handle.is_none());
        assert!(pool.replicas[1].handle.is_none());
    }
}
