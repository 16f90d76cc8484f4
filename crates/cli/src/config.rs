//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! Hand-rolled INI-style reader for the `[control]` / `[options]`
//! configuration file format.
//!
//! `[control]` lines are `key = value` pairs, with keys `path`, `file`,
//! `exclude`, `exclude-link` mapped to their CLI equivalents. A line with
//! no `=` is an unnamed entry, classified by checking whether it names a
//! directory or a regular file on disk. `[options]` lines are `key =
//! value` pairs overriding CLI defaults. Unknown `[control]` keys are
//! logged and ignored.

use icode_core::ControlSet;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Default)]
pub struct FileConfig {
    pub control: ControlSet,
    pub options: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Control,
    Options,
}

/// Parse a configuration file at `path` into a [`FileConfig`].
pub fn load(path: &Path) -> anyhow::Result<FileConfig> {
    let text = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read config file {}: {e}", path.display()))?;
    Ok(parse(&text))
}

fn parse(text: &str) -> FileConfig {
    let mut config = FileConfig::default();
    let mut section = Section::None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            section = match &line[1..line.len() - 1] {
                "control" => Section::Control,
                "options" => Section::Options,
                _ => Section::None,
            };
            continue;
        }

        match section {
            Section::Control => apply_control_line(&mut config.control, line),
            Section::Options => {
                if let Some((key, value)) = line.split_once('=') {
                    config
                        .options
                        .insert(key.trim().to_string(), value.trim().to_string());
                }
            }
            Section::None => {}
        }
    }

    config
}

/// Add `entry` to `control` as either an include path or an include file,
/// depending on whether it names a directory or a regular file on disk.
fn dispatch_by_fs_type(control: &mut ControlSet, entry: &str) {
    match fs::metadata(entry) {
        Ok(m) if m.is_dir() => {
            control.add_include_path(entry.to_string());
        }
        _ => {
            control.add_include_file(entry.to_string());
        }
    }
}

/// Add `entry` to `control`'s exclude set, dispatched by filesystem type
/// the same way `--exclude` is documented to behave.
fn dispatch_exclude_by_fs_type(control: &mut ControlSet, entry: &str) {
    match fs::metadata(entry) {
        Ok(m) if m.is_dir() => {
            control.add_exclude_path(entry.to_string());
        }
        _ => {
            control.add_exclude_file(entry.to_string());
        }
    }
}

fn apply_control_line(control: &mut ControlSet, line: &str) {
    let Some((key, value)) = line.split_once('=') else {
        dispatch_by_fs_type(control, line);
        return;
    };
    let key = key.trim();
    let value = value.trim();

    match key {
        "path" => {
            control.add_include_path(value.to_string());
        }
        "file" => {
            control.add_include_file(value.to_string());
        }
        "exclude" => {
            dispatch_exclude_by_fs_type(control, value);
        }
        "exclude-link" => {
            control.add_exclude_link(value.to_string());
        }
        other => {
            log::warn!("unknown [control] key '{other}', ignoring");
        }
    }
}
