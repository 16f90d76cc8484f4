//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! Per-entity key derivation.
//!
//! Every entity (file path, ELF segment, process) that needs a keyed
//! integrity code derives its own key from one master key via HKDF-SHA256,
//! rather than reusing the master key directly across entities.

use crate::secret::Secret;
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Operator-supplied master key material. Never used directly for MAC
/// computation; only as HKDF input key material.
pub type MasterKey = Secret<Vec<u8>>;

/// A key derived from a [`MasterKey`] for one specific entity label.
/// Zeroized on drop, like the master key it comes from.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey(Vec<u8>);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Derive a key of `out_len` bytes for `label` from `master`, using
/// HKDF-SHA256 with no salt (the master key is already high-entropy).
pub fn derive_entity_key(master: &MasterKey, label: &[u8], out_len: usize) -> DerivedKey {
    let hk = Hkdf::<Sha256>::new(None, master.expose_secret());
    let mut out = vec![0u8; out_len];
    // `label.len()` is always far below HKDF's `255 * hash_len` cap for the
    // labels this engine produces (file paths, segment ids); expand cannot
    // fail in practice here.
    hk.expand(label, &mut out)
        .expect("HKDF expand output length is always within RFC 5869 bounds");
    DerivedKey(out)
}

/// Block-cipher resource accounting for CMAC keys: how many cipher blocks
/// a derived key may still process before requiring rotation, computed
/// as `floor(max_bytes / tag_size)`.
///
/// The budget returned here is never replenished once a key is derived
/// again for the same label in the same run; it is a per-call value,
/// recomputed from scratch rather than carried across derivations.
pub fn cmac_blocks_floor(max_bytes: u64, tag_size: u64) -> u64 {
    if tag_size == 0 {
        return 0;
    }
    max_bytes / tag_size
}
