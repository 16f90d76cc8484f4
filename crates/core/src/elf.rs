//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! ELF `PT_LOAD` segment analysis.
//!
//! Maps an ELF object read-only and enumerates its loadable, non-writable
//! segments -- the parts of an executable or shared object whose contents
//! matter for integrity verification (writable segments hold runtime
//! state and are expected to change).

use crate::error::EntityError;
use goblin::elf::Elf;
use goblin::elf::program_header::{PF_W, PT_LOAD};
use memmap2::Mmap;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;

/// One loadable, non-writable ELF segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfSegment {
    /// `"<path>/<hex8(p_offset)>"`, unique within one file's segment set.
    pub segment_id: String,
    pub file_offset: u64,
    pub file_size: u64,
    pub vaddr: u64,
}

/// A read-only, scoped memory map. `Drop` always unmaps; the wrapper
/// exists so callers never hold a raw `Mmap` past the scope they intend.
pub struct MmapGuard(Mmap);

impl Deref for MmapGuard {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

/// Parses ELF program headers and extracts non-writable `PT_LOAD` segments.
pub struct ElfAnalyzer;

impl ElfAnalyzer {
    /// Map `path` and return its non-writable `PT_LOAD` segments.
    pub fn segments(path: &Path) -> Result<Vec<ElfSegment>, EntityError> {
        let mmap = Self::map(path)?;
        let elf = Elf::parse(&mmap).map_err(|e| EntityError::NotElf(e.to_string()))?;

        let path_str = path.to_string_lossy();
        let segments = elf
            .program_headers
            .iter()
            .filter(|ph| ph.p_type == PT_LOAD && ph.p_flags & PF_W == 0)
            .map(|ph| ElfSegment {
                segment_id: format!("{}/{:08x}", path_str, ph.p_offset),
                file_offset: ph.p_offset,
                file_size: ph.p_filesz,
                vaddr: ph.p_vaddr,
            })
            .collect();
        Ok(segments)
    }

    /// Map `path` read-only for the duration of the returned guard.
    pub fn map(path: &Path) -> Result<MmapGuard, EntityError> {
        let file = File::open(path).map_err(|source| EntityError::OpenFile {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        // SAFETY: the mapped file is treated as read-only for the guard's
        // lifetime; the caller does not mutate the backing file concurrently.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| EntityError::MmapFile {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        Ok(MmapGuard(mmap))
    }

    /// Return the byte range for one segment out of an already-mapped file.
    pub fn segment_bytes<'a>(mmap: &'a MmapGuard, segment: &ElfSegment) -> &'a [u8] {
        let start = segment.file_offset as usize;
        let end = start + segment.file_size as usize;
        &mmap[start..end]
    }

    /// Cheap ELF classification by magic number alone, without parsing
    /// program headers. Used to pick the ELF vs. non-ELF lookup strategy
    /// when correlating a live memory mapping with a database entry.
    pub fn is_elf(path: &Path) -> bool {
        let mut magic = [0u8; 4];
        match File::open(path).and_then(|mut f| std::io::Read::read_exact(&mut f, &mut magic)) {
            Ok(()) => magic == [0x7f, b'E', b'L', b'F'],
            Err(_) => false,
        }
    }
}
