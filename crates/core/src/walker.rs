//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! Recursive filesystem traversal honoring a [`ControlSet`].

use crate::control::ControlSet;
use glob::Pattern;
use std::path::PathBuf;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("failed to read directory entry: {0}")]
    Io(#[from] walkdir::Error),
}

/// One entry produced by [`FileWalker`]: a regular file that survived the
/// include/exclude filtering.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub is_symlink: bool,
}

/// Walks the directories and files named in a [`ControlSet`], yielding
/// every surviving regular file as an iterator item rather than invoking
/// a callback.
pub struct FileWalker {
    patterns: Vec<Pattern>,
    control: ControlSet,
}

impl FileWalker {
    pub fn new(control: ControlSet) -> Self {
        let patterns = control
            .include_files
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        Self { patterns, control }
    }

    fn name_matches(&self, name: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(name))
    }

    /// Iterate over every surviving file across all configured include
    /// paths and individually-named include files.
    pub fn walk(&self) -> impl Iterator<Item = Result<WalkEntry, WalkError>> + '_ {
        let direct_files = self.control.include_files.iter().filter_map(|f| {
            let path = PathBuf::from(f);
            path.is_file().then_some(Ok(WalkEntry {
                path,
                is_symlink: false,
            }))
        });

        let walked = self.control.include_paths.iter().flat_map(move |root| {
            WalkDir::new(root)
                .into_iter()
                .filter_map(move |entry| match entry {
                    Ok(entry) => {
                        let path = entry.path();
                        let path_str = path.to_string_lossy();
                        if self.control.is_path_excluded(&path_str) {
                            return None;
                        }
                        let file_type = entry.file_type();
                        let is_symlink = file_type.is_symlink();
                        if is_symlink {
                            let name = entry.file_name().to_string_lossy();
                            if self.control.is_link_excluded(&name) {
                                return None;
                            }
                        }
                        if !file_type.is_file() {
                            return None;
                        }
                        if self.control.is_file_excluded(&path_str) {
                            return None;
                        }
                        let name = entry.file_name().to_string_lossy();
                        if !self.name_matches(&name) {
                            return None;
                        }
                        Some(Ok(WalkEntry {
                            path: path.to_path_buf(),
                            is_symlink,
                        }))
                    }
                    Err(e) => Some(Err(WalkError::from(e))),
                })
        });

        direct_files.chain(walked)
    }
}
