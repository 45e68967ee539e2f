//! Configuration reader (the "Config reader" external adapter of spec `4.8`).
//!
//! Text format, one replica per non-comment line:
//!
//! ```text
//! <path>  <block_size>  <total_bytes>
//! ```
//!
//! Whitespace-separated; lines whose first non-whitespace character is `#`
//! are comments; malformed lines are skipped with a warning rather than
//! aborting the whole load.

use std::path::{Path, PathBuf};

use crate::error::{EepmanError, Result};
use crate::footer::FOOTER_LEN;

/// Default configuration path, used when the caller does not override it.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/eeprom-manager.conf";

/// Matches the original replica-descriptor path buffer's 100-byte limit.
const MAX_PATH_LEN: usize = 100;

/// A single parsed configuration line: one candidate replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaSpec {
    pub path: PathBuf,
    pub block_size: u64,
    pub block_count: u64,
}

/// Loads and parses the configuration file at `path`.
///
/// Only the file-open itself is fatal; individual malformed or rejected
/// lines are logged as warnings and skipped, per spec `4.8`.
pub fn load_config(path: &Path) -> Result<Vec<ReplicaSpec>> {
    let text = std::fs::read_to_string(path).map_err(|source| EepmanError::Config {
        context: path.to_path_buf(),
        source,
    })?;

    let mut specs = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if let Some(spec) = parse_line(path, lineno + 1, line) {
            specs.push(spec);
        }
    }
    Ok(specs)
}

fn parse_line(config_path: &Path, lineno: usize, line: &str) -> Option<ReplicaSpec> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() < 3 {
        log::warn!(
            "eepman: {}:{lineno}: expected `<path> <block_size> <total_bytes>`, skipping",
            config_path.display()
        );
        return None;
    }

    let (path_str, block_size_str, total_bytes_str) = (fields[0], fields[1], fields[2]);

    if path_str.len() > MAX_PATH_LEN {
        log::warn!(
            "eepman: {}:{lineno}: replica path longer than {MAX_PATH_LEN} bytes, skipping",
            config_path.display()
        );
        return None;
    }

    let Ok(block_size) = block_size_str.parse::<u64>() else {
        log::warn!(
            "eepman: {}:{lineno}: block size {block_size_str:?} is not a non-negative integer, skipping",
            config_path.display()
        );
        return None;
    };

    let Ok(total_bytes) = total_bytes_str.parse::<u64>() else {
        log::warn!(
            "eepman: {}:{lineno}: total size {total_bytes_str:?} is not a non-negative integer, skipping",
            config_path.display()
        );
        return None;
    };

    if block_size < FOOTER_LEN as u64 {
        log::warn!(
            "eepman: {}:{lineno}: block size {block_size} cannot hold a {FOOTER_LEN}-byte footer, skipping",
            config_path.display()
        );
        return None;
    }

    if block_size == 0 || total_bytes % block_size != 0 {
        log::warn!(
            "eepman: {}:{lineno}: total size {total_bytes} is not a multiple of block size {block_size}, skipping",
            config_path.display()
        );
        return None;
    }

    Some(ReplicaSpec {
        path: PathBuf::from(path_str),
        block_size,
        block_count: total_bytes / block_size,
    })
}
