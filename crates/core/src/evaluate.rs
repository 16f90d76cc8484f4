//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! Drives one evaluation pass: walks entries, computes integrity codes,
//! and stores them. Per-entity failures are logged and counted; only
//! configuration problems (bad bucket count, unsupported primitive) ever
//! propagate as an `Err` from this module.

use crate::db::EntryValue;
use crate::elf::ElfAnalyzer;
use crate::error::IcodeError;
use crate::htable::HashTable;
use crate::primitive::Primitive;
use crate::stats::Statistics;
use crate::walker::{FileWalker, WalkEntry};

/// How ELF objects are evaluated. The default, `IgnoreSegments`, treats
/// every entry as a plain file. `WithSegments` hashes both the whole
/// file and, for ELF objects, each non-writable loadable segment --
/// these are independent conditions, not a choice between them.
/// `OnlySegments` hashes only the segments of ELF objects and skips the
/// whole-file code entirely, falling back to whole-file hashing only
/// for non-ELF entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfMode {
    IgnoreSegments,
    WithSegments,
    OnlySegments,
}

/// An optional byte-range restriction for whole-file hashing, driven by
/// `--offset`/`--size`. `size == -1` means "to end of file".
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub offset: u64,
    pub size: i64,
}

/// Computes and stores integrity codes for a set of walked entries.
pub struct Evaluator<'a> {
    primitive: &'a Primitive,
    table: &'a mut HashTable,
    stats: &'a mut Statistics,
    elf_mode: ElfMode,
    fragment: Option<Fragment>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        primitive: &'a Primitive,
        table: &'a mut HashTable,
        stats: &'a mut Statistics,
        elf_mode: ElfMode,
    ) -> Self {
        Self {
            primitive,
            table,
            stats,
            elf_mode,
            fragment: None,
        }
    }

    /// Restrict whole-file hashing to one byte range (`--offset`/`--size`).
    pub fn with_fragment(mut self, fragment: Option<Fragment>) -> Self {
        self.fragment = fragment;
        self
    }

    /// Evaluate one walked entry. Never returns an error: every failure
    /// mode is an expected per-entity outcome, logged and reflected in
    /// [`Statistics`].
    pub fn evaluate_entry(&mut self, entry: &WalkEntry) {
        self.stats.total_files += 1;

        if entry.is_symlink {
            self.stats.skipped_links += 1;
            return;
        }

        if self.elf_mode == ElfMode::IgnoreSegments {
            self.hash_whole_file(entry);
            return;
        }

        match ElfAnalyzer::segments(&entry.path) {
            Ok(segments) if !segments.is_empty() => {
                self.stats.executables += 1;
                self.hash_segments(entry, &segments);
                if self.elf_mode == ElfMode::WithSegments {
                    self.hash_whole_file(entry);
                }
            }
            Ok(_) | Err(_) => {
                // Not an ELF object, or one with no loadable segments:
                // both modes fall back to whole-file hashing.
                self.hash_whole_file(entry);
            }
        }
    }

    fn hash_segments(&mut self, entry: &WalkEntry, segments: &[crate::elf::ElfSegment]) {
        let mmap = match ElfAnalyzer::map(&entry.path) {
            Ok(mmap) => mmap,
            Err(e) => {
                log::warn!("{}: failed to map for segment hashing: {}", entry.path.display(), e);
                self.stats.skipped_executables += 1;
                return;
            }
        };
        for seg in segments {
            let bytes = ElfAnalyzer::segment_bytes(&mmap, seg);
            let code = self.primitive.code_ptr(bytes);
            let value = EntryValue::ElfSegment {
                size: seg.file_size,
                code,
            }
            .encode();
            match self.table.add(seg.segment_id.as_bytes(), &value) {
                Ok(()) => {
                    self.stats.segments += 1;
                    self.stats.hashed_files += 1;
                }
                Err(e) => {
                    log::warn!("{}: {}", seg.segment_id, e);
                    self.stats.skipped_segments += 1;
                }
            }
        }
    }

    fn hash_whole_file(&mut self, entry: &WalkEntry) {
        let code = match self.fragment {
            Some(fragment) => self.primitive.code_file_range(&entry.path, fragment.offset, fragment.size),
            None => self.primitive.code_file(&entry.path),
        };
        let code = match code {
            Ok(code) => code,
            Err(e) => {
                log::warn!("{}: {}", entry.path.display(), e);
                self.stats.skipped_files += 1;
                return;
            }
        };
        let value = EntryValue::WholeFile { code }.encode();
        let key = entry.path.to_string_lossy();
        match self.table.add_str(&key, &value) {
            Ok(()) => self.stats.hashed_files += 1,
            Err(e) => {
                log::warn!("{}: {}", key, e);
                self.stats.skipped_files += 1;
            }
        }
    }

    /// Evaluate every entry a [`FileWalker`] produces.
    pub fn run(&mut self, walker: &FileWalker) -> Result<(), IcodeError> {
        for entry in walker.walk() {
            match entry {
                Ok(entry) => self.evaluate_entry(&entry),
                Err(e) => log::warn!("walk error: {}", e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlSet;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn evaluates_plain_files_and_hashes_them() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        fs::write(dir.path().join("b.txt"), b"world").unwrap();

        let mut control = ControlSet::new();
        control.add_include_path(dir.path().to_string_lossy().to_string());
        let walker = FileWalker::new(control);

        let primitive = Primitive::from_config(Some("streebog256"), None).unwrap();
        let mut table = HashTable::new(16).unwrap();
        let mut stats = Statistics::default();
        let mut evaluator = Evaluator::new(&primitive, &mut table, &mut stats, ElfMode::IgnoreSegments);
        evaluator.run(&walker).unwrap();

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.hashed_files, 2);
        assert_eq!(stats.skipped_files, 0);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn duplicate_path_is_counted_as_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"hello").unwrap();

        let primitive = Primitive::from_config(Some("streebog256"), None).unwrap();
        let mut table = HashTable::new(16).unwrap();
        let mut stats = Statistics::default();
        let entry = WalkEntry {
            path: path.clone(),
            is_symlink: false,
        };
        let mut evaluator = Evaluator::new(&primitive, &mut table, &mut stats, ElfMode::IgnoreSegments);
        evaluator.evaluate_entry(&entry);
        evaluator.evaluate_entry(&entry);

        assert_eq!(stats.hashed_files, 1);
        assert_eq!(stats.skipped_files, 1);
    }

    #[test]
    fn whole_file_key_is_nul_terminated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hello.bin");
        fs::write(&path, b"hello").unwrap();

        let primitive = Primitive::from_config(Some("streebog256"), None).unwrap();
        let mut table = HashTable::new(16).unwrap();
        let mut stats = Statistics::default();
        let entry = WalkEntry {
            path: path.clone(),
            is_symlink: false,
        };
        let mut evaluator = Evaluator::new(&primitive, &mut table, &mut stats, ElfMode::IgnoreSegments);
        evaluator.evaluate_entry(&entry);

        let key = path.to_string_lossy().into_owned();
        assert!(table.get_str(&key).is_some());
        let kp = table.get_pair_str(&key).unwrap();
        assert_eq!(kp.key.last(), Some(&0u8));
    }

    #[test]
    fn fragment_restricts_whole_file_hashing_to_a_byte_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, b"0123456789").unwrap();

        let primitive = Primitive::from_config(Some("crc64"), None).unwrap();
        let mut table = HashTable::new(16).unwrap();
        let mut stats = Statistics::default();
        let entry = WalkEntry {
            path: path.clone(),
            is_symlink: false,
        };
        let mut evaluator = Evaluator::new(&primitive, &mut table, &mut stats, ElfMode::IgnoreSegments)
            .with_fragment(Some(Fragment { offset: 2, size: 3 }));
        evaluator.evaluate_entry(&entry);

        let key = path.to_string_lossy().into_owned();
        let stored = table.get_str(&key).unwrap();
        let expected = primitive.code_ptr(b"234");
        assert_eq!(stored, expected.as_slice());
    }
}
