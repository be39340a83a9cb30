//! Pure decision logic shared by the passes.
//!
//! Nothing here touches the filesystem: each function takes records or names
//! and returns what should happen, so the rules can be tested in isolation.

use crate::scanner::FileRecord;
use std::collections::HashMap;
use std::hash::Hash;

/// Which of two colliding files survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The file already in the index survives; the incoming one goes.
    KeepKept,
    /// The incoming file survives; the one in the index goes.
    KeepIncoming,
}

/// Tie-break rule applied on a collision.
pub type Rule = fn(&FileRecord, &FileRecord) -> Verdict;

/// Duplicate-content rule: the strictly older file survives.
///
/// On equal modification times the incoming file counts as the newer one, so
/// the file seen first survives.
pub fn older_wins(kept: &FileRecord, incoming: &FileRecord) -> Verdict {
    if incoming.modified < kept.modified {
        Verdict::KeepIncoming
    } else {
        Verdict::KeepKept
    }
}

/// Same-name rule: the newer file survives.
///
/// On equal modification times the file seen first counts as the older one,
/// so the incoming file survives.
pub fn newer_wins(kept: &FileRecord, incoming: &FileRecord) -> Verdict {
    if incoming.modified >= kept.modified {
        Verdict::KeepIncoming
    } else {
        Verdict::KeepKept
    }
}

/// A collision between two files sharing an identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub survivor: FileRecord,
    pub loser: FileRecord,
}

/// Maps an identity key to the file currently kept for it.
///
/// After every collision the index holds the survivor, whether or not the
/// loser actually gets removed afterwards.
#[derive(Debug)]
pub struct IdentityIndex<K> {
    kept: HashMap<K, FileRecord>,
    rule: Rule,
}

impl<K: Eq + Hash> IdentityIndex<K> {
    pub fn new(rule: Rule) -> Self {
        Self {
            kept: HashMap::new(),
            rule,
        }
    }

    /// Adds a file under `key`, returning the collision it causes, if any.
    pub fn offer(&mut self, key: K, incoming: FileRecord) -> Option<Collision> {
        let rule = self.rule;
        let Some(kept) = self.kept.get_mut(&key) else {
            self.kept.insert(key, incoming);
            return None;
        };

        match rule(kept, &incoming) {
            Verdict::KeepKept => Some(Collision {
                survivor: kept.clone(),
                loser: incoming,
            }),
            Verdict::KeepIncoming => {
                let loser = std::mem::replace(kept, incoming.clone());
                Some(Collision {
                    survivor: incoming,
                    loser,
                })
            }
        }
    }

    /// The file currently kept under `key`.
    pub fn get(&self, key: &K) -> Option<&FileRecord> {
        self.kept.get(key)
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

/// True if `name` ends with any configured temporary suffix.
pub fn matches_temporary(name: &str, suffixes: &[String]) -> bool {
    suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
}

/// Returns the cleaned stem if it contains any troublesome character.
pub fn renamed_stem(stem: &str, troublesome: &[char], substitute: char) -> Option<String> {
    if !stem.chars().any(|c| troublesome.contains(&c)) {
        return None;
    }
    Some(
        stem.chars()
            .map(|c| if troublesome.contains(&c) { substitute } else { c })
            .collect(),
    )
}

/// Builds the new file name for a record, keeping its extension verbatim.
pub fn renamed_file_name(record: &FileRecord, troublesome: &[char], substitute: char) -> Option<String> {
    let stem = renamed_stem(&record.stem, troublesome, substitute)?;
    Some(match &record.extension {
        Some(extension) => format!("{}.{}", stem, extension),
        None => stem,
    })
}

/// True if the low permission bits differ from `target`.
pub fn needs_chmod(mode: u32, target: u32) -> bool {
    mode & 0o777 != target & 0o777
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn record(path: &str, age_secs: u64) -> FileRecord {
        let path = PathBuf::from(path);
        FileRecord {
            name: path.file_name().unwrap().to_string_lossy().into_owned(),
            stem: path.file_stem().unwrap().to_string_lossy().into_owned(),
            extension: path.extension().map(|e| e.to_string_lossy().into_owned()),
            parent: path.parent().unwrap().to_path_buf(),
            path,
            size: 1,
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 - age_secs),
            mode: 0o644,
        }
    }

    #[test]
    fn test_older_wins() {
        let old = record("/a/old.txt", 100);
        let new = record("/b/new.txt", 10);

        assert_eq!(older_wins(&new, &old), Verdict::KeepIncoming);
        assert_eq!(older_wins(&old, &new), Verdict::KeepKept);
        // Equal times: the incoming file is treated as newer and loses.
        assert_eq!(older_wins(&old, &old.clone()), Verdict::KeepKept);
    }

    #[test]
    fn test_newer_wins() {
        let old = record("/a/x.txt", 100);
        let new = record("/b/x.txt", 10);

        assert_eq!(newer_wins(&old, &new), Verdict::KeepIncoming);
        assert_eq!(newer_wins(&new, &old), Verdict::KeepKept);
        // Equal times: the incoming file wins.
        assert_eq!(newer_wins(&old, &record("/c/x.txt", 100)), Verdict::KeepIncoming);
    }

    #[test]
    fn test_index_holds_survivor_when_incoming_wins() {
        let mut index = IdentityIndex::new(older_wins);
        let newer = record("/a/copy.txt", 10);
        let older = record("/b/orig.txt", 100);

        assert!(index.offer(1u128, newer.clone()).is_none());
        let collision = index.offer(1u128, older.clone()).unwrap();

        assert_eq!(collision.survivor, older);
        assert_eq!(collision.loser, newer);
        assert_eq!(index.get(&1), Some(&older));
    }

    #[test]
    fn test_index_holds_survivor_when_kept_wins() {
        let mut index = IdentityIndex::new(older_wins);
        let older = record("/a/orig.txt", 100);
        let newer = record("/b/copy.txt", 10);

        index.offer(7u128, older.clone());
        let collision = index.offer(7u128, newer.clone()).unwrap();

        assert_eq!(collision.survivor, older);
        assert_eq!(collision.loser, newer);
        // The index keeps pointing at the survivor, never at the loser.
        assert_eq!(index.get(&7), Some(&older));
    }

    #[test]
    fn test_index_chain_keeps_oldest() {
        let mut index = IdentityIndex::new(older_wins);
        let files = [
            record("/a/1", 50),
            record("/a/2", 200),
            record("/a/3", 10),
            record("/a/4", 150),
        ];
        let mut losers = Vec::new();
        for f in &files {
            if let Some(c) = index.offer("k", f.clone()) {
                losers.push(c.loser.path);
            }
        }

        assert_eq!(index.get(&"k").unwrap().path, PathBuf::from("/a/2"));
        assert_eq!(losers.len(), 3);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_index_distinct_keys_do_not_collide() {
        let mut index = IdentityIndex::new(newer_wins);
        assert!(index.offer("a.txt".to_string(), record("/a/a.txt", 1)).is_none());
        assert!(index.offer("b.txt".to_string(), record("/a/b.txt", 1)).is_none());
        assert_eq!(index.len(), 2);
        assert!(!index.is_empty());
    }

    #[test]
    fn test_matches_temporary() {
        let suffixes = vec!["~".to_string(), ".tmp".to_string()];
        assert!(matches_temporary("draft.tmp", &suffixes));
        assert!(matches_temporary("notes.txt~", &suffixes));
        assert!(!matches_temporary("draft.txt", &suffixes));
        assert!(!matches_temporary("tmp", &suffixes));
        assert!(!matches_temporary("anything", &[]));
    }

    #[test]
    fn test_renamed_file_name() {
        let troublesome = vec![':', '?'];
        let bad = record("/d/bad:name?.txt", 0);
        assert_eq!(
            renamed_file_name(&bad, &troublesome, '_').as_deref(),
            Some("bad_name_.txt")
        );

        let clean = record("/d/clean.txt", 0);
        assert_eq!(renamed_file_name(&clean, &troublesome, '_'), None);
    }

    #[test]
    fn test_extension_is_never_rewritten() {
        let troublesome = vec!['?'];
        let record = record("/d/name.t?t", 0);
        assert_eq!(renamed_file_name(&record, &troublesome, '_'), None);
    }

    #[test]
    fn test_renamed_stem_with_dot_in_set() {
        let troublesome = vec!['.'];
        assert_eq!(
            renamed_stem("archive.tar", &troublesome, '-').as_deref(),
            Some("archive-tar")
        );
    }

    #[test]
    fn test_needs_chmod() {
        assert!(!needs_chmod(0o644, 0o644));
        assert!(needs_chmod(0o777, 0o644));
        assert!(!needs_chmod(0o4644, 0o644));
    }
}
