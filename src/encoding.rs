//! Shared hashing and canonical encoding
//!
//! Every commitment in the system is SHA-256 over a canonical byte form,
//! rendered as 64 lowercase hex characters. The canonical byte form is
//! compact JSON: separators `","` and `":"`, UTF-8, no insignificant
//! whitespace. This whitespace policy is fixed and must never change;
//! the bytes feed commitment hashes.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Previous-hash of the first ledger record.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// SHA-256 of arbitrary bytes as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compact deterministic JSON for a serializable value.
///
/// Struct fields serialize in declaration order; map-valued fields use
/// `BTreeMap`, so keys come out ASCII-sorted at every depth. The
/// `preserve_order` feature of serde_json must stay disabled for the same
/// reason.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// True iff `s` is a well-formed hash rendering: exactly 64 lowercase hex chars.
pub fn is_hex_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
