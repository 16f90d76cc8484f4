//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! Run statistics accumulated over a verification or evaluation pass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters updated as files, executables, and processes are visited.
///
/// Each counter is incremented at exactly one call site and never reset
/// mid-run.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Statistics {
    pub total_files: u64,
    pub hashed_files: u64,
    pub skipped_files: u64,
    pub deleted_files: u64,
    pub changed_files: u64,
    pub new_files: u64,
    pub executables: u64,
    pub skipped_executables: u64,
    pub skipped_links: u64,
    pub processes: u64,
    pub skipped_processes: u64,
    pub segments: u64,
    pub skipped_segments: u64,
    pub total_lines: u64,
    pub skipped_lines: u64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any changed or deleted entries were observed this run.
    pub fn has_failures(&self) -> bool {
        self.changed_files > 0 || self.deleted_files > 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "the total files checked: {}, of which:", self.total_files)?;
        writeln!(f, " - hashed: {}", self.hashed_files)?;
        writeln!(f, " - skipped: {}", self.skipped_files)?;
        writeln!(f, " - new: {}", self.new_files)?;
        writeln!(f, " - changed: {}", self.changed_files)?;
        writeln!(f, " - deleted: {}", self.deleted_files)?;
        writeln!(f, "executables: {} (skipped: {})", self.executables, self.skipped_executables)?;
        writeln!(f, "segments: {} (skipped: {})", self.segments, self.skipped_segments)?;
        writeln!(f, "processes: {} (skipped: {})", self.processes, self.skipped_processes)?;
        write!(f, "lines read: {} (skipped: {})", self.total_lines, self.skipped_lines)
    }
}
