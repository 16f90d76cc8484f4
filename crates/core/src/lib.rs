//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! # icode_core
//!
//! Core library for computing and verifying file and process integrity
//! codes: hash tables of per-entity codes, a derived-key manager, a
//! pluggable hash/HMAC/CMAC primitive facade, a recursive file walker, an
//! ELF segment analyzer, a binary/text database codec, and both
//! filesystem and (on Unix) live-process verification.
//!
//! ## Quick Start
//!
//! ```rust
//! use icode_core::{ControlSet, ElfMode, Evaluator, FileWalker, HashTable, Primitive, Statistics};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut control = ControlSet::new();
//! control.add_include_path(".".to_string());
//! let walker = FileWalker::new(control);
//!
//! let primitive = Primitive::from_config(Some("streebog256"), None)?;
//! let mut table = HashTable::new(16)?;
//! let mut stats = Statistics::new();
//! let mut evaluator = Evaluator::new(&primitive, &mut table, &mut stats, ElfMode::IgnoreSegments);
//! evaluator.run(&walker)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`htable`] — the key/value hash table and its binary wire codec.
//! - [`kdf`] — per-entity key derivation from one master key.
//! - [`primitive`] — hash / HMAC / CMAC engine selection and evaluation.
//! - [`walker`] — recursive filesystem traversal honoring a [`ControlSet`].
//! - [`elf`] — ELF `PT_LOAD` segment analysis.
//! - [`db`] — the on-disk database (binary, linux-text, bsd-text formats).
//! - [`evaluate`] — drives one evaluation pass over walked entries.
//! - [`verify_fs`] — filesystem verification against a stored database.
//! - [`verify_proc`] — live process memory verification (Unix only).

pub mod control;
pub mod db;
pub mod elf;
pub mod error;
pub mod evaluate;
pub mod htable;
pub mod kdf;
pub mod primitive;
pub mod secret;
pub mod stats;
pub mod verify_fs;
pub mod walker;

#[cfg(unix)]
pub mod verify_proc;

pub use control::ControlSet;
pub use db::{Database, EntryValue, Format};
pub use elf::{ElfAnalyzer, ElfSegment, MmapGuard};
pub use error::{ConfigError, EntityError, HTableError, IcodeError, PrimitiveError};
pub use evaluate::{ElfMode, Evaluator, Fragment};
pub use htable::{display_key, djb_hash, HashFn, HashTable, KeyPair};
pub use kdf::{cmac_blocks_floor, derive_entity_key, DerivedKey, MasterKey};
pub use primitive::{CmacAlg, HashEngine, HmacAlg, Primitive, StreamState, UnkeyedAlg};
pub use secret::Secret;
pub use stats::Statistics;
pub use verify_fs::{FsVerifier, VerifyOutcome, VerifyResult};
pub use walker::{FileWalker, WalkEntry, WalkError};

#[cfg(unix)]
pub use verify_proc::{MemSegment, ProcVerifyResult, ProcessVerifier, PtraceGuard};
