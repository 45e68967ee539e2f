//! Block I/O primitives (spec `4.1`).
//!
//! Two operations on an already-positioned, already-open replica handle:
//! [`read_exact`] and [`write_exact`]. Both loop until the whole buffer is
//! transferred or a bounded retry budget is exhausted, restarting on
//! `Interrupted`. Offset positioning is the caller's responsibility; neither
//! function seeks.

use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};

/// Maximum number of loop iterations before a transfer is declared failed.
const MAX_ATTEMPTS: u32 = 100;

/// Reads exactly `buf.len()` bytes from `file` at its current position.
pub fn read_exact(file: &mut File, buf: &mut [u8]) -> io::Result<()> {
    let mut filled = 0;
    let mut attempts = 0;
    while filled < buf.len() {
        if attempts >= MAX_ATTEMPTS {
            return Err(io::Error::new(
                ErrorKind::Other,
                "read_exact: retry budget exhausted",
            ));
        }
        match file.read(&mut buf[filled..]) {
            Ok(0) => attempts += 1,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => attempts += 1,
            Err(e) => {
                attempts += 1;
                if attempts >= MAX_ATTEMPTS {
                    return Err(e);
                }
            }
        }
    }
    Ok(())
}

/// Writes exactly `buf` to `file` at its current position, then issues a
/// durability barrier (`fsync`).
pub fn write_exact(file: &mut File, buf: &[u8]) -> io::Result<()> {
    let mut written = 0;
    let mut attempts = 0;
    while written < buf.len() {
        if attempts >= MAX_ATTEMPTS {
            return Err(io::Error::new(
                ErrorKind::Other,
                "write_exact: retry budget exhausted",
            ));
        }
        match file.write(&buf[written..]) {
            Ok(0) => attempts += 1,
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => attempts += 1,
            Err(e) => {
                attempts += 1;
                if attempts >= MAX_ATTEMPTS {
                    return Err(e);
                }
            }
        }
    }
    file.sync_all()
}
