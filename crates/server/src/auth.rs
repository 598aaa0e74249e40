//! Password storage and verification (spec §4.H "Authentication").
//!
//! Entries in [`common::Config::auth`] are `username -> stored`, where
//! `stored` is either `salt:hash` (SHA-256 of `salt || password`, both
//! hex-encoded) or, for legacy accounts, the plaintext password with no
//! colon. Both forms are compared in constant time so a timing side
//! channel can't distinguish a near-miss from a wrong guess.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Hash `password` under a freshly generated random salt, returning the
/// `salt:hash` form stored in [`common::Config::auth`].
pub fn hash_password(password: &str) -> String {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = hex_encode(&salt_bytes);
    let hash = hex_encode(&digest(&salt, password));
    format!("{salt}:{hash}")
}

/// Check `password` against one stored entry from [`common::Config::auth`].
pub fn verify_password(stored: &str, password: &str) -> bool {
    match stored.split_once(':') {
        Some((salt, expected_hash)) => {
            let actual_hash = hex_encode(&digest(salt, password));
            constant_time_eq(actual_hash.as_bytes(), expected_hash.as_bytes())
        }
        // Legacy plaintext entry: pad both sides to a common length before
        // comparing so the compare is still constant-time in the length
        // that matters (the stored secret), per spec §4.H.
        None => constant_time_eq_padded(stored.as_bytes(), password.as_bytes()),
    }
}

fn digest(salt: &str, password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{b:02x}").expect("writing to a String never fails");
    }
    out
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Constant-time comparison that also hides the length mismatch itself by
/// comparing against a common padded length, rather than short-circuiting
/// on `a.len() != b.len()` as [`constant_time_eq`] does.
fn constant_time_eq_padded(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut diff = (a.len() != b.len()) as u8;
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_round_trips() {
        let stored = hash_password("hunter2");
        assert!(verify_password(&stored, "hunter2"));
        assert!(!verify_password(&stored, "hunter3"));
    }

    #[test]
    fn legacy_plaintext_entries_still_verify() {
        assert!(verify_password("hunter2", "hunter2"));
        assert!(!verify_password("hunter2", "hunter3"));
        assert!(!verify_password("short", "much-longer-guess"));
    }
}
