//! Commitment construction and verification
//!
//! A battle entry is committed on chain as a salted SHA-256 digest before
//! its content is public. The byte layout fed to the digest is the one
//! wire contract this crate owns: the on-chain verifier recomputes the
//! same bytes at reveal time, so field order and integer width here must
//! never change.
//!
//! Layout, in order:
//! 1. For each verse in list order: lyrics UTF-8 bytes, then `start_ms`
//!    as 8 bytes big-endian, then `end_ms` as 8 bytes big-endian.
//! 2. Recording reference UTF-8 bytes.
//! 3. Nonce as 8 bytes big-endian.

use rand::rngs::OsRng;
use rand::RngCore;
use rechat_common::model::Verse;
use sha2::{Digest, Sha256};

/// Compute the commit hash for a battle entry
///
/// Deterministic: identical verses (content and order), recording ref and
/// nonce always produce the same digest. Returns the lowercase hex form
/// (64 characters).
pub fn commit_hash(verses: &[Verse], recording_ref: &str, nonce: u64) -> String {
    let mut hasher = Sha256::new();

    for verse in verses {
        hasher.update(verse.lyrics.as_bytes());
        hasher.update(verse.start_ms.to_be_bytes());
        hasher.update(verse.end_ms.to_be_bytes());
    }

    hasher.update(recording_ref.as_bytes());
    hasher.update(nonce.to_be_bytes());

    format!("{:x}", hasher.finalize())
}

/// Generate a fresh commitment nonce from OS randomness
///
/// Generated once per session at commit time and never reused. The nonce
/// stays private until the session's reveal completes.
pub fn generate_nonce() -> u64 {
    OsRng.next_u64()
}

/// Check a revealed entry against a previously stored commit hash
///
/// Recomputes the commitment from the disclosed inputs and compares
/// against `expected_hash` (ASCII case-insensitive; this crate always
/// emits lowercase). Reports only match/mismatch, never which input
/// differed.
pub fn verify_reveal(
    verses: &[Verse],
    recording_ref: &str,
    nonce: u64,
    expected_hash: &str,
) -> bool {
    commit_hash(verses, recording_ref, nonce).eq_ignore_ascii_case(expected_hash)
}
