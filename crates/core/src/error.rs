//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! Unified error hierarchy for the integrity engine.

use thiserror::Error;

/// Top-level unified error type for `icode_core` operations.
#[derive(Error, Debug)]
pub enum IcodeError {
    #[error("hash table operation failed")]
    HTable(#[from] HTableError),

    #[error("primitive selection or evaluation failed")]
    Primitive(#[from] PrimitiveError),

    #[error("entity access failed")]
    Entity(#[from] EntityError),

    #[error("configuration error")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors related to the hash table and its binary/text codecs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HTableError {
    #[error("key already exists in table")]
    KeyExists,

    #[error("key not found in table")]
    KeyNotFound,

    #[error("table element is null or uninitialized")]
    NullElement,

    #[error("length field out of bounds: {0}")]
    WrongLength(u64),

    #[error("stored data does not match expected length")]
    NotEqualData,

    #[error("allocation would exceed reasonable bounds")]
    OutOfMemory,

    #[error("zero-length key or value is not permitted")]
    ZeroLength,

    #[error("malformed binary stream: {0}")]
    ReadData(String),
}

/// Errors related to integrity primitive selection and evaluation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    #[error("key usage does not match requested engine")]
    KeyUsage,

    #[error("unknown or unsupported OID name: {0}")]
    OidName(String),

    #[error("key engine {0} is not supported for integrity codes")]
    UnsupportedKeyUsage(String),
}

/// Errors related to accessing a filesystem entity (file, directory, process).
#[derive(Error, Debug)]
pub enum EntityError {
    #[error("cannot access {path}: {source}")]
    AccessFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open {path}: {source}")]
    OpenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed reading data from {path}")]
    ReadData { path: String },

    #[error("failed to map {path} into memory: {source}")]
    MmapFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not an ELF object: {0}")]
    NotElf(String),

    #[error("process {0} is not accessible")]
    ProcessAccess(i32),
}

/// Errors related to configuration and setup, caught before any entity is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required pointer or value was not provided")]
    NullPointer,

    #[error("bucket count {0} is out of range (expected 16..=4096)")]
    InvalidBucketCount(usize),

    #[error("unrecognized database format: {0}")]
    UnknownFormat(String),

    #[error("invalid configuration line: {0}")]
    InvalidLine(String),
}
