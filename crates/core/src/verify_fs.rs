//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! Filesystem verification against a stored [`Database`].
//!
//! Two independent strategies, matching the two ways a check can be
//! asked for: starting from a database (confirm every stored entry still
//! matches, or is gone) and starting from a directory (confirm every file
//! found on disk is known and unchanged, optionally also reporting
//! entries the database has but the directory no longer does).

use crate::db::{Database, EntryValue};
use crate::error::HTableError;
use crate::htable::display_key;
use crate::primitive::Primitive;
use crate::stats::Statistics;
use crate::walker::FileWalker;
use std::collections::HashSet;
use std::path::Path;

/// The verdict for one entity compared against its stored code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Matched,
    Changed,
    New,
    Deleted,
}

/// One verification result: the entity's key (path or segment id) and
/// its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    pub key: String,
    pub outcome: VerifyOutcome,
}

pub struct FsVerifier<'a> {
    primitive: &'a Primitive,
    stats: &'a mut Statistics,
}

impl<'a> FsVerifier<'a> {
    pub fn new(primitive: &'a Primitive, stats: &'a mut Statistics) -> Self {
        Self { primitive, stats }
    }

    fn recompute_whole_file(&self, path: &Path) -> Result<EntryValue, std::io::Error> {
        Ok(EntryValue::WholeFile {
            code: self.primitive.code_file(path)?,
        })
    }

    /// Strategy 1: walk every whole-file entry already in `db`, confirming
    /// its file still exists and still matches. ELF segment entries (value
    /// length `tag_size + 8`) belong to process verification, not this
    /// strategy, and are skipped here.
    pub fn verify_from_database(&mut self, db: &Database) -> Vec<VerifyResult> {
        let mut results = Vec::new();
        let tag_size = self.primitive.tag_size();
        for kp in db.table.iter() {
            if kp.value.len() != tag_size {
                self.stats.skipped_segments += 1;
                continue;
            }

            let key = display_key(&kp.key).into_owned();
            self.stats.total_files += 1;
            let path = Path::new(&key);
            if !path.exists() {
                self.stats.deleted_files += 1;
                results.push(VerifyResult {
                    key,
                    outcome: VerifyOutcome::Deleted,
                });
                continue;
            }

            let stored = match EntryValue::decode(&kp.value, tag_size) {
                Ok(v) => v,
                Err(_) => {
                    self.stats.skipped_files += 1;
                    continue;
                }
            };

            match self.recompute_whole_file(path) {
                Ok(current) if current == stored => {
                    self.stats.hashed_files += 1;
                    results.push(VerifyResult {
                        key,
                        outcome: VerifyOutcome::Matched,
                    });
                }
                Ok(_) => {
                    self.stats.changed_files += 1;
                    results.push(VerifyResult {
                        key,
                        outcome: VerifyOutcome::Changed,
                    });
                }
                Err(e) => {
                    log::warn!("{}: {}", key, e);
                    self.stats.skipped_files += 1;
                }
            }
        }
        results
    }

    /// Strategy 2: walk the directory, comparing every file found to
    /// `db`. Files on disk but absent from `db` are reported as `New`.
    /// When `search_deleted` is set, entries present in `db` but not
    /// found on disk during this same pass are also reported as
    /// `Deleted` (otherwise deletions are only detected by
    /// [`Self::verify_from_database`]).
    pub fn verify_from_directory(
        &mut self,
        walker: &FileWalker,
        db: &Database,
        search_deleted: bool,
    ) -> Result<Vec<VerifyResult>, HTableError> {
        let mut results = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for entry in walker.walk().filter_map(Result::ok) {
            let key = entry.path.to_string_lossy().to_string();
            seen.insert(key.clone());
            self.stats.total_files += 1;

            match db.table.get_pair_str(&key) {
                Some(kp) => {
                    let stored = EntryValue::decode(&kp.value, self.primitive.tag_size())?;
                    match self.recompute_whole_file(&entry.path) {
                        Ok(current) if current == stored => {
                            self.stats.hashed_files += 1;
                            results.push(VerifyResult {
                                key,
                                outcome: VerifyOutcome::Matched,
                            });
                        }
                        Ok(_) => {
                            self.stats.changed_files += 1;
                            results.push(VerifyResult {
                                key,
                                outcome: VerifyOutcome::Changed,
                            });
                        }
                        Err(e) => {
                            log::warn!("{}: {}", key, e);
                            self.stats.skipped_files += 1;
                        }
                    }
                }
                None => {
                    self.stats.new_files += 1;
                    results.push(VerifyResult {
                        key,
                        outcome: VerifyOutcome::New,
                    });
                }
            }
        }

        if search_deleted {
            for kp in db.table.iter() {
                if kp.value.len() != self.primitive.tag_size() {
                    continue;
                }
                let key = display_key(&kp.key).into_owned();
                if !seen.contains(&key) {
                    self.stats.deleted_files += 1;
                    results.push(VerifyResult {
                        key,
                        outcome: VerifyOutcome::Deleted,
                    });
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlSet;
    use crate::evaluate::{ElfMode, Evaluator};
    use crate::htable::HashTable;
    use std::fs;
    use tempfile::tempdir;

    fn build_database(dir: &std::path::Path, primitive: &Primitive) -> Database {
        let mut control = ControlSet::new();
        control.add_include_path(dir.to_string_lossy().to_string());
        let walker = FileWalker::new(control);
        let mut table = HashTable::new(16).unwrap();
        let mut stats = Statistics::default();
        let mut evaluator = Evaluator::new(primitive, &mut table, &mut stats, ElfMode::IgnoreSegments);
        evaluator.run(&walker).unwrap();
        Database::new(table, crate::db::Format::Binary)
    }

    #[test]
    fn unchanged_files_match() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"stable content").unwrap();
        let primitive = Primitive::from_config(Some("streebog256"), None).unwrap();
        let db = build_database(dir.path(), &primitive);

        let mut stats = Statistics::default();
        let mut verifier = FsVerifier::new(&primitive, &mut stats);
        let results = verifier.verify_from_database(&db);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].outcome, VerifyOutcome::Matched);
    }

    #[test]
    fn changed_file_is_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"original content").unwrap();
        let primitive = Primitive::from_config(Some("streebog256"), None).unwrap();
        let db = build_database(dir.path(), &primitive);

        fs::write(&path, b"mutated content!").unwrap();

        let mut stats = Statistics::default();
        let mut verifier = FsVerifier::new(&primitive, &mut stats);
        let results = verifier.verify_from_database(&db);

        assert_eq!(results[0].outcome, VerifyOutcome::Changed);
        assert_eq!(stats.changed_files, 1);
    }

    #[test]
    fn deleted_file_detected_from_database_strategy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"will be deleted").unwrap();
        let primitive = Primitive::from_config(Some("streebog256"), None).unwrap();
        let db = build_database(dir.path(), &primitive);

        fs::remove_file(&path).unwrap();

        let mut stats = Statistics::default();
        let mut verifier = FsVerifier::new(&primitive, &mut stats);
        let results = verifier.verify_from_database(&db);

        assert_eq!(results[0].outcome, VerifyOutcome::Deleted);
        assert_eq!(stats.deleted_files, 1);
    }

    #[test]
    fn directory_strategy_without_search_deleted_ignores_deletions() {
        let dir = tempdir().unwrap();
        let kept = dir.path().join("kept.txt");
        let removed = dir.path().join("removed.txt");
        fs::write(&kept, b"kept").unwrap();
        fs::write(&removed, b"removed").unwrap();
        let primitive = Primitive::from_config(Some("streebog256"), None).unwrap();
        let db = build_database(dir.path(), &primitive);

        fs::remove_file(&removed).unwrap();

        let mut control = ControlSet::new();
        control.add_include_path(dir.path().to_string_lossy().to_string());
        let walker = FileWalker::new(control);

        let mut stats = Statistics::default();
        let mut verifier = FsVerifier::new(&primitive, &mut stats);
        let results = verifier.verify_from_directory(&walker, &db, false).unwrap();

        assert!(results.iter().all(|r| r.outcome != VerifyOutcome::Deleted));
        assert_eq!(stats.deleted_files, 0);
    }

    #[test]
    fn directory_strategy_with_search_deleted_reports_deletions() {
        let dir = tempdir().unwrap();
        let kept = dir.path().join("kept.txt");
        let removed = dir.path().join("removed.txt");
        fs::write(&kept, b"kept").unwrap();
        fs::write(&removed, b"removed").unwrap();
        let primitive = Primitive::from_config(Some("streebog256"), None).unwrap();
        let db = build_database(dir.path(), &primitive);

        fs::remove_file(&removed).unwrap();

        let mut control = ControlSet::new();
        control.add_include_path(dir.path().to_string_lossy().to_string());
        let walker = FileWalker::new(control);

        let mut stats = Statistics::default();
        let mut verifier = FsVerifier::new(&primitive, &mut stats);
        let results = verifier.verify_from_directory(&walker, &db, true).unwrap();

        assert_eq!(stats.deleted_files, 1);
        assert!(results
            .iter()
            .any(|r| r.outcome == VerifyOutcome::Deleted && r.key.ends_with("removed.txt")));
    }

    #[test]
    fn new_file_on_disk_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let primitive = Primitive::from_config(Some("streebog256"), None).unwrap();
        let db = build_database(dir.path(), &primitive);

        fs::write(dir.path().join("new.txt"), b"brand new").unwrap();

        let mut control = ControlSet::new();
        control.add_include_path(dir.path().to_string_lossy().to_string());
        let walker = FileWalker::new(control);

        let mut stats = Statistics::default();
        let mut verifier = FsVerifier::new(&primitive, &mut stats);
        let results = verifier.verify_from_directory(&walker, &db, false).unwrap();

        assert!(results
            .iter()
            .any(|r| r.outcome == VerifyOutcome::New && r.key.ends_with("new.txt")));
        assert_eq!(stats.new_files, 1);
    }

    #[test]
    fn elf_segment_entries_are_skipped_not_mismatched() {
        use crate::db::EntryValue;

        let dir = tempdir().unwrap();
        let path = dir.path().join("lib.so");
        fs::write(&path, b"whatever bytes").unwrap();
        let primitive = Primitive::from_config(Some("streebog256"), None).unwrap();

        let mut table = HashTable::new(16).unwrap();
        let segment_key = format!("{}/00000000", path.to_string_lossy());
        let value = EntryValue::ElfSegment {
            size: 14,
            code: primitive.code_ptr(b"segment bytes"),
        }
        .encode();
        table.add(segment_key.as_bytes(), &value).unwrap();
        let db = Database::new(table, crate::db::Format::Binary);

        let mut stats = Statistics::default();
        let mut verifier = FsVerifier::new(&primitive, &mut stats);
        let results = verifier.verify_from_database(&db);

        assert!(results.is_empty());
        assert_eq!(stats.skipped_segments, 1);
        assert_eq!(stats.changed_files, 0);
    }
}
