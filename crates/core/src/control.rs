//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! Inclusion/exclusion control for filesystem and process traversal.

use std::collections::HashSet;

/// The set of path/file inclusion and exclusion rules applied by
/// [`crate::walker::FileWalker`] and the process verifier.
#[derive(Debug, Default, Clone)]
pub struct ControlSet {
    /// Top-level directories or files to walk.
    pub include_paths: Vec<String>,
    /// Glob patterns selecting which file names are considered.
    pub include_files: Vec<String>,
    /// Directory paths pruned entirely from traversal.
    pub exclude_paths: HashSet<String>,
    /// Absolute file paths skipped wherever they are found.
    pub exclude_files: HashSet<String>,
    /// Symlink targets skipped wherever they are found.
    pub exclude_links: HashSet<String>,
}

impl ControlSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_include_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.include_paths.push(path.into());
        self
    }

    pub fn add_include_file(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.include_files.push(pattern.into());
        self
    }

    pub fn add_exclude_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.exclude_paths.insert(path.into());
        self
    }

    pub fn add_exclude_file(&mut self, name: impl Into<String>) -> &mut Self {
        self.exclude_files.insert(name.into());
        self
    }

    pub fn add_exclude_link(&mut self, name: impl Into<String>) -> &mut Self {
        self.exclude_links.insert(name.into());
        self
    }

    /// True if `path` falls under one of the excluded directories.
    pub fn is_path_excluded(&self, path: &str) -> bool {
        self.exclude_paths
            .iter()
            .any(|excluded| path.starts_with(excluded.as_str()))
    }

    /// True if `path` (the entry's absolute path, not just its basename)
    /// is excluded.
    pub fn is_file_excluded(&self, path: &str) -> bool {
        self.exclude_files.contains(path)
    }

    /// True if the symlink target name is excluded.
    pub fn is_link_excluded(&self, name: &str) -> bool {
        self.exclude_links.contains(name)
    }
}
