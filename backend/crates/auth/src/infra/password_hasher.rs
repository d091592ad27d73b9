//! Argon2id implementation of the domain hashing contract

use platform::password::{Argon2Hasher, HashingParams};

use crate::domain::repository::PasswordHasher;
use crate::domain::value_object::user_password::{RawPassword, UserPassword};
use crate::error::AuthResult;

#[derive(Debug, Clone)]
pub struct Argon2PasswordHasher {
    inner: Argon2Hasher,
}

impl Argon2PasswordHasher {
    pub fn new(params: HashingParams, pepper: Option<Vec<u8>>) -> AuthResult<Self> {
        Ok(Self {
            inner: Argon2Hasher::new(params, pepper)?,
        })
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, raw: &RawPassword) -> AuthResult<UserPassword> {
        let hashed = self.inner.hash(raw.inner())?;
        Ok(UserPassword::from_hashed(hashed))
    }

    fn verify(&self, raw: &RawPassword, hashed: &UserPassword) -> bool {
        self.inner.verify(raw.inner(), hashed.inner())
    }

    fn needs_rehash(&self, hashed: &UserPassword) -> bool {
        self.inner.needs_rehash(hashed.inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;

    fn cheap() -> HashingParams {
        HashingParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = Argon2PasswordHasher::new(cheap(), None).unwrap();
        let raw = RawPassword::candidate("CorrectHorse9!".to_string()).unwrap();
        let hashed = hasher.hash(&raw).unwrap();

        assert!(hashed.as_phc_string().starts_with("$argon2id$"));
        assert!(hasher.verify(&raw, &hashed));

        let wrong = RawPassword::candidate("WrongHorse9!".to_string()).unwrap();
        assert!(!hasher.verify(&wrong, &hashed));
    }

    #[test]
    fn test_cost_change_flags_rehash() {
        let raw = RawPassword::candidate("CorrectHorse9!".to_string()).unwrap();
        let weak = Argon2PasswordHasher::new(cheap(), None).unwrap();
        let hashed = weak.hash(&raw).unwrap();
        assert!(!weak.needs_rehash(&hashed));

        let stronger = Argon2PasswordHasher::new(
            HashingParams {
                memory_kib: 2048,
                ..cheap()
            },
            None,
        )
        .unwrap();
        assert!(stronger.needs_rehash(&hashed));
        assert!(stronger.verify(&raw, &hashed));
    }

    #[test]
    fn test_pepper_changes_verification() {
        let peppered = Argon2PasswordHasher::new(cheap(), Some(b"pepper".to_vec())).unwrap();
        let plain = Argon2PasswordHasher::new(cheap(), None).unwrap();
        let raw = RawPassword::candidate("CorrectHorse9!".to_string()).unwrap();

        let hashed = peppered.hash(&raw).unwrap();
        assert!(peppered.verify(&raw, &hashed));
        assert!(!plain.verify(&raw, &hashed));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = HashingParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(matches!(
            Argon2PasswordHasher::new(params, None),
            Err(AuthError::PasswordHashing(_))
        ));
    }
}
