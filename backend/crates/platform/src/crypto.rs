//! Cryptographic Utilities
//!
//! Opaque token generation, digests for derived identifiers, and the
//! comparison used wherever a presented secret meets a stored one.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Fill a fresh buffer from the OS CSPRNG
fn os_random(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Opaque URL-safe token carrying `entropy_bytes` of randomness
///
/// 32 bytes encode to 43 characters.
pub fn random_token(entropy_bytes: usize) -> String {
    to_base64_url(&os_random(entropy_bytes))
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Unpadded URL-safe base64
pub fn to_base64_url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare two secrets without an early exit on the first differing byte
///
/// Only the length leaks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
