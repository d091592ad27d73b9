//! Password Policy and Hashing
//!
//! NIST SP 800-63B compliant password handling with:
//! - Configurable length policy with common-pattern rejection
//! - Argon2id hashing (memory-hard, recommended by OWASP)
//! - Optional application-wide pepper
//! - Zeroization of sensitive data
//!
//! Login input is never re-checked against the policy: a password that was
//! valid when it was set must keep verifying after the policy tightens, so
//! [`ClearTextPassword::candidate`] only normalizes.

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

// ============================================================================
// Constants (NIST SP 800-63B compliant)
// ============================================================================

/// Minimum password length (NIST: SHALL be at least 8)
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length (NIST: SHOULD permit at least 64)
pub const MAX_PASSWORD_LENGTH: usize = 128;

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    #[error("Password is too common or follows a predictable pattern")]
    CommonPattern,
}

/// Password hashing/verification errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid Argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Policy
// ============================================================================

/// Rules applied to newly chosen passwords
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub reject_common_patterns: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            max_length: MAX_PASSWORD_LENGTH,
            reject_common_patterns: true,
        }
    }
}

impl PasswordPolicy {
    /// Check an already NFKC-normalized password
    pub fn check(&self, normalized: &str) -> Result<(), PasswordPolicyError> {
        if normalized.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        // NIST: count Unicode code points, not bytes
        let char_count = normalized.chars().count();
        if char_count < self.min_length {
            return Err(PasswordPolicyError::TooShort {
                min: self.min_length,
                actual: char_count,
            });
        }
        if char_count > self.max_length {
            return Err(PasswordPolicyError::TooLong {
                max: self.max_length,
                actual: char_count,
            });
        }

        if normalized
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        if self.reject_common_patterns && is_common_pattern(normalized) {
            return Err(PasswordPolicyError::CommonPattern);
        }

        Ok(())
    }
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// Does not implement `Clone`; Debug output is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Normalize and validate a newly chosen password
    pub fn new(raw: String, policy: &PasswordPolicy) -> Result<Self, PasswordPolicyError> {
        let candidate = Self::candidate(raw);
        policy.check(&candidate.0)?;
        Ok(candidate)
    }

    /// Normalize a password presented for verification
    pub fn candidate(raw: String) -> Self {
        let mut raw = raw;
        // NIST: Unicode NFKC normalization before processing
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();
        Self(normalized)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn peppered(&self, pepper: Option<&[u8]>) -> Zeroizing<Vec<u8>> {
        let mut bytes = self.0.as_bytes().to_vec();
        if let Some(p) = pepper {
            bytes.extend_from_slice(p);
        }
        Zeroizing::new(bytes)
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Hashed password in PHC string format
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Create from PHC string (e.g., from database)
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    /// Get the PHC string for storage
    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Argon2id hasher
// ============================================================================

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    /// OWASP recommendation: m=19456 (19 MiB), t=2, p=1
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Argon2id hasher bound to a parameter set and optional pepper
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
    pepper: Option<Zeroizing<Vec<u8>>>,
}

impl Argon2Hasher {
    pub fn new(params: HashingParams, pepper: Option<Vec<u8>>) -> Result<Self, PasswordHashError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| PasswordHashError::InvalidParams(e.to_string()))?;

        Ok(Self {
            params,
            pepper: pepper.map(Zeroizing::new),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    fn pepper(&self) -> Option<&[u8]> {
        self.pepper.as_deref().map(|p| p.as_slice())
    }

    /// Hash a password with a fresh 128-bit salt
    pub fn hash(&self, password: &ClearTextPassword) -> Result<HashedPassword, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let input = password.peppered(self.pepper());

        let hash = self
            .argon2()
            .hash_password(&input, &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }

    /// Verify a password against a stored hash
    ///
    /// Parameters are read from the PHC string, so hashes created under
    /// older cost settings keep verifying.
    pub fn verify(&self, password: &ClearTextPassword, hashed: &HashedPassword) -> bool {
        let Ok(parsed) = PasswordHash::new(&hashed.hash) else {
            return false;
        };
        let input = password.peppered(self.pepper());

        // Argon2 uses constant-time comparison internally
        self.argon2().verify_password(&input, &parsed).is_ok()
    }

    /// Whether a stored hash was produced with a different algorithm or cost
    pub fn needs_rehash(&self, hashed: &HashedPassword) -> bool {
        let Ok(parsed) = PasswordHash::new(&hashed.hash) else {
            return true;
        };

        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }

        match Params::try_from(&parsed) {
            Ok(stored) => {
                stored.m_cost() != self.params.m_cost()
                    || stored.t_cost() != self.params.t_cost()
                    || stored.p_cost() != self.params.p_cost()
            }
            Err(_) => true,
        }
    }
}

impl fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argon2Hasher")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .field("pepper", &self.pepper.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Check for common weak patterns
fn is_common_pattern(password: &str) -> bool {
    let lower = password.to_lowercase();

    // All same character (e.g., "aaaaaaaa")
    let mut chars = lower.chars();
    if let Some(first) = chars.next() {
        if chars.all(|c| c == first) {
            return true;
        }
    }

    if is_sequential_numbers(&lower) {
        return true;
    }

    const KEYBOARD_PATTERNS: &[&str] = &[
        "qwerty",
        "asdfgh",
        "zxcvbn",
        "qazwsx",
        "1qaz2wsx",
    ];
    if KEYBOARD_PATTERNS.iter().any(|p| lower.contains(p)) {
        return true;
    }

    const COMMON_PASSWORDS: &[&str] = &[
        "password",
        "password1",
        "password123",
        "abcdefgh",
        "letmein",
        "welcome",
        "admin123",
        "iloveyou",
        "sunshine",
        "football",
        "baseball",
        "trustno1",
    ];

    COMMON_PASSWORDS.contains(&lower.as_str())
}

/// Check if string is made of sequential digits only
fn is_sequential_numbers(s: &str) -> bool {
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() < 4 {
        return false;
    }

    let is_ascending = digits
        .windows(2)
        .all(|w| w[1] == w[0] + 1 || (w[0] == 9 && w[1] == 0));

    let is_descending = digits
        .windows(2)
        .all(|w| w[0] == w[1] + 1 || (w[0] == 0 && w[1] == 9));

    is_ascending || is_descending
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Cheap parameters so debug-build tests stay fast
    fn test_hasher(pepper: Option<&[u8]>) -> Argon2Hasher {
        Argon2Hasher::new(
            HashingParams {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            pepper.map(|p| p.to_vec()),
        )
        .unwrap()
    }

    #[test]
    fn test_password_too_short() {
        let result = ClearTextPassword::new("short".to_string(), &PasswordPolicy::default());
        assert!(matches!(result, Err(PasswordPolicyError::TooShort { min: 8, actual: 5 })));
    }

    #[test]
    fn test_password_too_long() {
        let long_password = "ab".repeat(MAX_PASSWORD_LENGTH);
        let result = ClearTextPassword::new(long_password, &PasswordPolicy::default());
        assert!(matches!(result, Err(PasswordPolicyError::TooLong { .. })));
    }

    #[test]
    fn test_password_whitespace_only() {
        let result = ClearTextPassword::new("        ".to_string(), &PasswordPolicy::default());
        assert!(matches!(result, Err(PasswordPolicyError::EmptyOrWhitespace)));
    }

    #[test]
    fn test_password_common_pattern() {
        let policy = PasswordPolicy::default();
        for weak in ["password123", "qwertyuiop", "12345678", "zzzzzzzzz"] {
            let result = ClearTextPassword::new(weak.to_string(), &policy);
            assert!(
                matches!(result, Err(PasswordPolicyError::CommonPattern)),
                "{weak} should be rejected"
            );
        }
    }

    #[test]
    fn test_policy_can_relax_common_patterns() {
        let policy = PasswordPolicy {
            reject_common_patterns: false,
            ..PasswordPolicy::default()
        };
        assert!(ClearTextPassword::new("password123".to_string(), &policy).is_ok());
    }

    #[test]
    fn test_valid_and_unicode_passwords() {
        let policy = PasswordPolicy::default();
        assert!(ClearTextPassword::new("MySecure#Pass2024!".to_string(), &policy).is_ok());
        assert!(ClearTextPassword::new("パスワード安全です!".to_string(), &policy).is_ok());
    }

    #[test]
    fn test_candidate_skips_policy() {
        let candidate = ClearTextPassword::candidate("short".to_string());
        assert!(!candidate.is_empty());
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = test_hasher(None);
        let password = ClearTextPassword::candidate("TestPassword123!".to_string());
        let hashed = hasher.hash(&password).unwrap();

        assert!(hasher.verify(&password, &hashed));

        let wrong = ClearTextPassword::candidate("WrongPassword123!".to_string());
        assert!(!hasher.verify(&wrong, &hashed));
    }

    #[test]
    fn test_hash_with_pepper() {
        let peppered = test_hasher(Some(b"my_secret_pepper".as_slice()));
        let password = ClearTextPassword::candidate("TestPassword123!".to_string());
        let hashed = peppered.hash(&password).unwrap();

        assert!(peppered.verify(&password, &hashed));
        assert!(!test_hasher(None).verify(&password, &hashed));
        assert!(!test_hasher(Some(b"wrong_pepper".as_slice())).verify(&password, &hashed));
    }

    #[test]
    fn test_phc_string_roundtrip() {
        let hasher = test_hasher(None);
        let password = ClearTextPassword::candidate("TestPassword123!".to_string());
        let hashed = hasher.hash(&password).unwrap();

        let restored = HashedPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(hasher.verify(&password, &restored));
    }

    #[test]
    fn test_invalid_phc_string() {
        assert!(HashedPassword::from_phc_string("not_a_valid_hash").is_err());
    }

    #[test]
    fn test_needs_rehash_on_cost_change() {
        let weak = test_hasher(None);
        let password = ClearTextPassword::candidate("TestPassword123!".to_string());
        let hashed = weak.hash(&password).unwrap();

        assert!(!weak.needs_rehash(&hashed));

        let stronger = Argon2Hasher::new(
            HashingParams {
                memory_kib: 2048,
                iterations: 1,
                parallelism: 1,
            },
            None,
        )
        .unwrap();
        assert!(stronger.needs_rehash(&hashed));
        // Old hashes still verify under new settings
        assert!(stronger.verify(&password, &hashed));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = Argon2Hasher::new(
            HashingParams {
                memory_kib: 1,
                iterations: 0,
                parallelism: 1,
            },
            None,
        );
        assert!(matches!(result, Err(PasswordHashError::InvalidParams(_))));
    }

    #[test]
    fn test_debug_redaction() {
        let password = ClearTextPassword::candidate("secret-value".to_string());
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("secret-value"));

        let hasher = test_hasher(Some(b"pepper-bytes".as_slice()));
        let debug_output = format!("{:?}", hasher);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("pepper-bytes"));
    }
}
