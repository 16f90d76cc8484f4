//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! Exit-code and report rendering: a human-readable summary or, with
//! `--json`, a machine-readable one.

use icode_core::Statistics;
use serde::Serialize;

/// Process exit codes. `Ok` and the two verification-failure codes are
/// distinguished so scripts can tell "ran fine, found differences" apart
/// from "could not run at all".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Ok = 0,
    ChangedFiles = 10,
    DeletedFiles = 11,
    IoOrConfig = 12,
    InvalidArgs = 13,
    Internal = 14,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as u8 as i32
    }
}

/// Which run produced a [`Report`], since the two modes derive a
/// nonzero exit code from different statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Computing and storing codes: nonzero iff any file was skipped.
    Evaluate,
    /// Checking stored codes: nonzero iff any file was skipped, changed,
    /// deleted, or newly discovered.
    Verify,
}

/// A run's outcome, printable as either a human summary or JSON.
#[derive(Debug, Serialize)]
pub struct Report {
    pub stats: Statistics,
    pub changed: Vec<String>,
    pub deleted: Vec<String>,
    pub new: Vec<String>,
}

impl Report {
    pub fn new(stats: Statistics) -> Self {
        Self {
            stats,
            changed: Vec::new(),
            deleted: Vec::new(),
            new: Vec::new(),
        }
    }

    /// Derive the process exit code from this report's contents. Evaluate
    /// mode exits nonzero iff any file was skipped; verify mode exits
    /// nonzero iff any file was skipped, changed, deleted, or newly
    /// discovered.
    pub fn exit_code(&self, mode: Mode) -> ExitCode {
        match mode {
            Mode::Evaluate => {
                if self.stats.skipped_files > 0 {
                    ExitCode::ChangedFiles
                } else {
                    ExitCode::Ok
                }
            }
            Mode::Verify => {
                if self.stats.deleted_files > 0 {
                    ExitCode::DeletedFiles
                } else if self.stats.changed_files > 0 || self.stats.skipped_files > 0 || self.stats.new_files > 0 {
                    ExitCode::ChangedFiles
                } else {
                    ExitCode::Ok
                }
            }
        }
    }

    pub fn print_json(&self) -> serde_json::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }

    pub fn print_human(&self, quiet: bool, show_stat: bool) {
        if !quiet {
            for key in &self.changed {
                println!("changed: {key}");
            }
            for key in &self.deleted {
                println!("deleted: {key}");
            }
            for key in &self.new {
                println!("new: {key}");
            }
        }
        if show_stat && !quiet {
            println!("{}", self.stats);
        }
    }
}
