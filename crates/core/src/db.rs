//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! Persistent storage of computed integrity codes.
//!
//! A [`Database`] is a [`HashTable`](crate::htable::HashTable) plus the
//! on-disk format it was loaded from or will be saved as. Three formats
//! are supported: the binary wire format, and two text formats (`linux`:
//! `<hex> <filename>`, and `bsd`: `<method> (<filename>) = <hex>`).
//! Loading tries binary first and falls back to text only on a
//! recoverable parse error; file-access errors are never retried.

use crate::error::{ConfigError, EntityError, HTableError, IcodeError};
use crate::htable::{display_key, HashTable};
use crate::stats::Statistics;
use std::fs;
use std::path::Path;

/// On-disk representation of a [`Database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Binary,
    Linux,
    Bsd,
}

/// The decoded shape of one stored value: either a whole-file code, or a
/// tagged ELF-segment code carrying the segment's file size alongside its
/// integrity code. The wire representation inside the hash table's raw
/// value bytes is untagged and length-discriminated; this type is the
/// only place that length-based dispatch happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    WholeFile { code: Vec<u8> },
    ElfSegment { size: u64, code: Vec<u8> },
}

impl EntryValue {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            EntryValue::WholeFile { code } => code.clone(),
            EntryValue::ElfSegment { size, code } => {
                let mut out = Vec::with_capacity(8 + code.len());
                out.extend_from_slice(&size.to_le_bytes());
                out.extend_from_slice(code);
                out
            }
        }
    }

    /// Decode a raw stored value, given the tag size of the primitive
    /// that produced it. A value of exactly `tag_size` bytes is a whole
    /// file; one of `tag_size + 8` bytes is an ELF segment (the extra 8
    /// bytes are the little-endian segment size).
    pub fn decode(bytes: &[u8], tag_size: usize) -> Result<Self, HTableError> {
        if bytes.len() == tag_size {
            Ok(EntryValue::WholeFile {
                code: bytes.to_vec(),
            })
        } else if bytes.len() == tag_size + 8 {
            let mut size_bytes = [0u8; 8];
            size_bytes.copy_from_slice(&bytes[..8]);
            Ok(EntryValue::ElfSegment {
                size: u64::from_le_bytes(size_bytes),
                code: bytes[8..].to_vec(),
            })
        } else {
            Err(HTableError::WrongLength(bytes.len() as u64))
        }
    }
}

/// A hash table of computed integrity codes, tied to the format it should
/// be persisted in.
pub struct Database {
    pub table: HashTable,
    pub format: Format,
}

impl Database {
    pub fn new(table: HashTable, format: Format) -> Self {
        Self { table, format }
    }

    /// Load a database from `path`. If `path`'s format is not pinned by
    /// the caller, binary is tried first; a recoverable parse error (but
    /// not a file-access error) falls back to text parsing.
    pub fn load(path: &Path, bucket_count: usize, stats: &mut Statistics) -> Result<Self, IcodeError> {
        let bytes = fs::read(path).map_err(|source| EntityError::AccessFile {
            path: path.display().to_string(),
            source,
        })?;

        match HashTable::from_binary(&bytes) {
            Ok(table) => return Ok(Self::new(table, Format::Binary)),
            Err(err) => {
                log::debug!(
                    "trying to read {} in text format after binary parse failed: {}",
                    path.display(),
                    err
                );
            }
        }

        let mut table = HashTable::new(bucket_count)?;
        let text = String::from_utf8_lossy(&bytes);
        let mut format = Format::Linux;
        stats.total_lines = 0;
        stats.skipped_lines = 0;
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            stats.total_lines += 1;
            match parse_line(line) {
                Ok((filename, code, detected)) => {
                    format = detected;
                    if table.add_str(&filename, &code).is_err() {
                        stats.skipped_lines += 1;
                    }
                }
                Err(_) => stats.skipped_lines += 1,
            }
        }
        Ok(Self::new(table, format))
    }

    /// Save this database to `path` in its configured format.
    pub fn save(&self, path: &Path, tag: bool) -> Result<(), IcodeError> {
        match self.format {
            Format::Binary => {
                fs::write(path, self.table.to_binary()).map_err(IcodeError::Io)?;
            }
            Format::Linux | Format::Bsd => {
                let mut out = String::new();
                for kp in self.table.iter() {
                    let filename = display_key(&kp.key);
                    let hex = hex::encode(&kp.value);
                    if tag || self.format == Format::Bsd {
                        out.push_str(&format!("icode ({}) = {}\n", filename, hex));
                    } else {
                        out.push_str(&format!("{} {}\n", hex, filename));
                    }
                }
                fs::write(path, out).map_err(IcodeError::Io)?;
            }
        }
        Ok(())
    }
}

/// Parse one text-format line. Tokenizes on the first `(` the way the
/// original reader does: no parenthesis means linux format
/// (`<hex> <filename>`); a parenthesis means bsd format
/// (`<method> (<filename>) = <hex>`).
fn parse_line(line: &str) -> Result<(String, Vec<u8>, Format), ConfigError> {
    if let Some(paren_pos) = line.find('(') {
        let after = &line[paren_pos + 1..];
        let close_pos = after
            .find(')')
            .ok_or_else(|| ConfigError::InvalidLine(line.to_string()))?;
        let filename = after[..close_pos].to_string();
        let rest = &after[close_pos + 1..];
        let hex_part = rest.trim_start_matches([' ', '=']).trim();
        let code =
            hex::decode(hex_part).map_err(|_| ConfigError::InvalidLine(line.to_string()))?;
        Ok((filename, code, Format::Bsd))
    } else {
        let mut parts = line.splitn(2, ' ');
        let hex_tok = parts
            .next()
            .ok_or_else(|| ConfigError::InvalidLine(line.to_string()))?;
        let filename = parts
            .next()
            .ok_or_else(|| ConfigError::InvalidLine(line.to_string()))?
            .trim()
            .to_string();
        let code = hex::decode(hex_tok).map_err(|_| ConfigError::InvalidLine(line.to_string()))?;
        Ok((filename, code, Format::Linux))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn entry_value_round_trips_whole_file() {
        let value = EntryValue::WholeFile {
            code: vec![1, 2, 3, 4],
        };
        let encoded = value.encode();
        let decoded = EntryValue::decode(&encoded, 4).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn entry_value_round_trips_elf_segment() {
        let value = EntryValue::ElfSegment {
            size: 4096,
            code: vec![0xaa; 32],
        };
        let encoded = value.encode();
        assert_eq!(encoded.len(), 8 + 32);
        let decoded = EntryValue::decode(&encoded, 32).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn entry_value_decode_rejects_unexpected_length() {
        assert!(EntryValue::decode(&[0u8; 5], 32).is_err());
    }

    #[test]
    fn parse_linux_format_line() {
        let (name, code, fmt) = parse_line("deadbeef /bin/ls").unwrap();
        assert_eq!(name, "/bin/ls");
        assert_eq!(code, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(fmt, Format::Linux);
    }

    #[test]
    fn parse_bsd_format_line() {
        let (name, code, fmt) = parse_line("streebog256 (/bin/ls) = cafebabe").unwrap();
        assert_eq!(name, "/bin/ls");
        assert_eq!(code, vec![0xca, 0xfe, 0xba, 0xbe]);
        assert_eq!(fmt, Format::Bsd);
    }

    #[test]
    fn load_falls_back_from_binary_to_text() {
        let tmp = NamedTempFile::new().unwrap();
        fs::write(tmp.path(), "deadbeef /etc/hosts\ncafebabe /etc/passwd\n").unwrap();

        let mut stats = Statistics::default();
        let db = Database::load(tmp.path(), 16, &mut stats).expect("text fallback should succeed");

        assert_eq!(db.format, Format::Linux);
        assert_eq!(stats.total_lines, 2);
        assert_eq!(stats.skipped_lines, 0);
        assert_eq!(
            db.table.get_str("/etc/hosts"),
            Some([0xde, 0xad, 0xbe, 0xef].as_ref())
        );
        assert_eq!(
            db.table.get_str("/etc/passwd"),
            Some([0xca, 0xfe, 0xba, 0xbe].as_ref())
        );
    }

    #[test]
    fn load_reads_binary_without_fallback() {
        let mut table = HashTable::new(16).unwrap();
        table.add(b"/bin/ls", &[1, 2, 3, 4]).unwrap();
        let tmp = NamedTempFile::new().unwrap();
        fs::write(tmp.path(), table.to_binary()).unwrap();

        let mut stats = Statistics::default();
        let db = Database::load(tmp.path(), 16, &mut stats).unwrap();
        assert_eq!(db.format, Format::Binary);
        assert_eq!(db.table.get(b"/bin/ls"), Some([1, 2, 3, 4].as_ref()));
    }

    #[test]
    fn load_skips_malformed_lines_but_keeps_going() {
        let tmp = NamedTempFile::new().unwrap();
        fs::write(tmp.path(), "not-hex-data /bin/a\ndeadbeef /bin/b\n").unwrap();

        let mut stats = Statistics::default();
        let db = Database::load(tmp.path(), 16, &mut stats).unwrap();
        assert_eq!(stats.total_lines, 2);
        assert_eq!(stats.skipped_lines, 1);
        assert_eq!(db.table.get_str("/bin/b"), Some([0xde, 0xad, 0xbe, 0xef].as_ref()));
    }

    #[test]
    fn save_linux_format_strips_nul_terminator_from_key() {
        let mut table = HashTable::new(16).unwrap();
        table.add_str("hello.bin", &[0xde, 0xad, 0xbe, 0xef]).unwrap();
        let db = Database::new(table, Format::Linux);

        let tmp = NamedTempFile::new().unwrap();
        db.save(tmp.path(), false).unwrap();

        let text = fs::read_to_string(tmp.path()).unwrap();
        assert_eq!(text, "deadbeef hello.bin\n");
    }
}
