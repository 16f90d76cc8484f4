//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! Integrity primitive facade: selects and evaluates the configured
//! hash / HMAC / CMAC engine over a file, byte range, or in-memory buffer.

use crate::error::PrimitiveError;
use crate::kdf::DerivedKey;
use aes::Aes256;
use cmac::Cmac;
use crc::{Crc, CRC_64_ECMA_182};
use digest::Digest as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use streebog::Streebog256;

static CRC64_ECMA182: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// Unkeyed hash algorithms available with no key file supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnkeyedAlg {
    /// GOST R 34.11-2012, 256-bit output. The default when no algorithm
    /// is named.
    Streebog256,
    /// CRC-64/ECMA-182.
    Crc64,
}

impl UnkeyedAlg {
    fn from_name(name: &str) -> Result<Self, PrimitiveError> {
        match name {
            "streebog256" => Ok(Self::Streebog256),
            "crc64" => Ok(Self::Crc64),
            other => Err(PrimitiveError::OidName(other.to_string())),
        }
    }

    fn tag_size(self) -> usize {
        match self {
            Self::Streebog256 => 32,
            Self::Crc64 => 8,
        }
    }
}

/// HMAC algorithms available when a key with `hmac_function` engine is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacAlg {
    HmacSha256,
}

impl HmacAlg {
    fn tag_size(self) -> usize {
        match self {
            Self::HmacSha256 => 32,
        }
    }
}

/// Block-cipher CMAC algorithms available when a key with `block_cipher`
/// engine is supplied. The OID is named `cmac-<cipher-name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmacAlg {
    CmacAes256,
}

impl CmacAlg {
    fn tag_size(self) -> usize {
        match self {
            Self::CmacAes256 => 16,
        }
    }

    pub fn oid_name(self) -> &'static str {
        match self {
            Self::CmacAes256 => "cmac-aes256",
        }
    }
}

/// Which engine a configured [`Primitive`] evaluates entities with.
pub enum HashEngine {
    Unkeyed(UnkeyedAlg),
    Hmac(HmacAlg, DerivedKey),
    Cmac(CmacAlg, DerivedKey),
}

/// Selects, and then evaluates, one integrity primitive for a run.
pub struct Primitive {
    engine: HashEngine,
}

impl Primitive {
    /// Select an engine the way the original evaluator does: no key file
    /// means an unkeyed hash; a key whose engine is `hmac_function` means
    /// HMAC; a key whose engine is `block_cipher` means CMAC named
    /// `cmac-<cipher-name>`; anything else is unsupported.
    pub fn from_config(alg: Option<&str>, key: Option<DerivedKey>) -> Result<Self, PrimitiveError> {
        match key {
            None => {
                let alg = UnkeyedAlg::from_name(alg.unwrap_or("streebog256"))?;
                Ok(Self {
                    engine: HashEngine::Unkeyed(alg),
                })
            }
            Some(derived) => match alg {
                Some(name) if name.starts_with("hmac") => Ok(Self {
                    engine: HashEngine::Hmac(HmacAlg::HmacSha256, derived),
                }),
                Some(name) if name.starts_with("cmac") || name == "aes256" => Ok(Self {
                    engine: HashEngine::Cmac(CmacAlg::CmacAes256, derived),
                }),
                None => Err(PrimitiveError::KeyUsage),
                Some(other) => Err(PrimitiveError::UnsupportedKeyUsage(other.to_string())),
            },
        }
    }

    pub fn tag_size(&self) -> usize {
        match &self.engine {
            HashEngine::Unkeyed(alg) => alg.tag_size(),
            HashEngine::Hmac(alg, _) => alg.tag_size(),
            HashEngine::Cmac(alg, _) => alg.tag_size(),
        }
    }

    /// Compute the integrity code of an entire file.
    pub fn code_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        let mut file = File::open(path)?;
        let mut state = self.clean();
        let mut buf = [0u8; 65536];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            state.update(&buf[..n]);
        }
        Ok(state.finalize())
    }

    /// Compute the integrity code of a byte range within a file.
    /// `length == -1` means "until end of file", matching `code_file`.
    pub fn code_file_range(&self, path: &Path, offset: u64, length: i64) -> std::io::Result<Vec<u8>> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut state = self.clean();
        let mut buf = [0u8; 65536];
        let mut remaining: i64 = length;
        loop {
            let want = if length < 0 {
                buf.len()
            } else {
                buf.len().min(remaining.max(0) as usize)
            };
            if want == 0 {
                break;
            }
            let n = file.read(&mut buf[..want])?;
            if n == 0 {
                break;
            }
            state.update(&buf[..n]);
            if length >= 0 {
                remaining -= n as i64;
                if remaining <= 0 {
                    break;
                }
            }
        }
        Ok(state.finalize())
    }

    /// Compute the integrity code of an in-memory buffer (used for mmap'd
    /// ELF segments).
    pub fn code_ptr(&self, data: &[u8]) -> Vec<u8> {
        let mut state = self.clean();
        state.update(data);
        state.finalize()
    }

    /// Start a fresh streaming computation.
    pub fn clean(&self) -> StreamState {
        match &self.engine {
            HashEngine::Unkeyed(UnkeyedAlg::Streebog256) => StreamState::Streebog(Box::new(Streebog256::new())),
            HashEngine::Unkeyed(UnkeyedAlg::Crc64) => StreamState::Crc64(Box::new(CRC64_ECMA182.digest())),
            HashEngine::Hmac(HmacAlg::HmacSha256, key) => {
                let mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
                    .expect("HMAC accepts keys of any length");
                StreamState::Hmac(Box::new(mac))
            }
            HashEngine::Cmac(CmacAlg::CmacAes256, key) => {
                let mac = <Cmac<Aes256> as Mac>::new_from_slice(key.as_bytes())
                    .expect("derived CMAC-AES256 key is always exactly 32 bytes");
                StreamState::Cmac(Box::new(mac))
            }
        }
    }
}

/// Holds in-progress streaming state for one of the four supported
/// engines so callers can feed data incrementally.
pub enum StreamState {
    Streebog(Box<Streebog256>),
    Crc64(Box<crc::Digest<'static, u64>>),
    Hmac(Box<Hmac<Sha256>>),
    Cmac(Box<Cmac<Aes256>>),
}

impl StreamState {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            StreamState::Streebog(d) => d.update(data),
            StreamState::Crc64(d) => d.update(data),
            StreamState::Hmac(m) => m.update(data),
            StreamState::Cmac(m) => m.update(data),
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self {
            StreamState::Streebog(d) => d.finalize().to_vec(),
            StreamState::Crc64(d) => d.finalize().to_be_bytes().to_vec(),
            StreamState::Hmac(m) => m.finalize().into_bytes().to_vec(),
            StreamState::Cmac(m) => m.finalize().into_bytes().to_vec(),
        }
    }
}
