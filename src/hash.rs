//! Content identity for the duplicate pass.

use crate::output::OutputFormatter;
use crate::scanner::FileRecord;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::warn;

/// 128-bit digest of the full file contents (BLAKE3, truncated).
pub fn content_hash(path: &Path) -> io::Result<u128> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;

    let mut truncated = [0u8; 16];
    truncated.copy_from_slice(&hasher.finalize().as_bytes()[..16]);
    Ok(u128::from_le_bytes(truncated))
}

/// Hashes records in parallel, keeping their original order.
///
/// Files that cannot be read are logged and dropped.
pub fn hash_records(records: Vec<FileRecord>) -> Vec<(u128, FileRecord)> {
    let progress = OutputFormatter::create_progress_bar(records.len() as u64);
    progress.set_message("hashing");

    let hashed: Vec<_> = records
        .into_par_iter()
        .progress_with(progress.clone())
        .filter_map(|record| match content_hash(&record.path) {
            Ok(hash) => Some((hash, record)),
            Err(e) => {
                warn!("Cannot hash {}: {}", record.path.display(), e);
                None
            }
        })
        .collect();

    progress.finish_and_clear();
    hashed
}
