// Password hashing and verification service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};

use crate::auth::error::AuthError;

/// Fixed salt used only by [`PasswordService::equalize_timing`]; its output is discarded.
const TIMING_SALT: &str = "c29uYXJhdGltaW5nc2FsdA";

/// Password service for hashing and verification (Argon2id)
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    /// Password service with the default Argon2id cost parameters
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Password service with explicit cost parameters
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        }
    }

    /// Hash a password; a fresh salt is generated and embedded in the PHC output
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswordHash(e.to_string()))
    }

    /// Verify a password against a stored hash.
    /// A digest that cannot be parsed verifies as `false`.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Spend the same work as a verification without a stored hash to compare against
    pub fn equalize_timing(&self, password: &str) {
        if let Ok(salt) = SaltString::from_b64(TIMING_SALT) {
            let _ = self.argon2.hash_password(password.as_bytes(), &salt);
        }
    }

    // Argon2 is deliberately slow; the async variants run it on the blocking pool

    pub async fn hash_password_async(&self, password: &str) -> Result<String, AuthError> {
        let service = self.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || service.hash_password(&password))
            .await
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?
    }

    pub async fn verify_password_async(&self, password: &str, hash: &str) -> bool {
        let service = self.clone();
        let (password, hash) = (password.to_string(), hash.to_string());
        tokio::task::spawn_blocking(move || service.verify_password(&password, &hash))
            .await
            .unwrap_or(false)
    }

    pub async fn equalize_timing_async(&self, password: &str) {
        let service = self.clone();
        let password = password.to_string();
        let _ = tokio::task::spawn_blocking(move || service.equalize_timing(&password)).await;
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn fast_password_service() -> PasswordService {
    // Minimal cost keeps the test suite quick; production uses `new()`
    PasswordService::with_params(Params::new(1024, 1, 1, None).expect("valid argon2 params"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hash_then_verify() {
        let service = fast_password_service();
        let hash = service.hash_password("correct_password").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify_password("correct_password", &hash));
        assert!(!service.verify_password("wrong_password", &hash));
    }

    #[test]
    fn test_salt_differs_per_call() {
        let service = fast_password_service();
        let first = service.hash_password("same").unwrap();
        let second = service.hash_password("same").unwrap();

        assert_ne!(first, second);
        assert!(service.verify_password("same", &first));
        assert!(service.verify_password("same", &second));
    }

    #[test]
    fn test_malformed_digest_is_false() {
        let service = fast_password_service();
        assert!(!service.verify_password("anything", ""));
        assert!(!service.verify_password("anything", "not-a-phc-string"));
        assert!(!service.verify_password("anything", "$argon2id$v=19$broken"));
    }

    #[test]
    fn test_default_service_verifies_its_own_hash() {
        let service = PasswordService::new();
        let hash = service.hash_password("correct_password").unwrap();
        assert!(service.verify_password("correct_password", &hash));
    }

    #[test]
    fn test_equalize_timing_does_not_panic() {
        fast_password_service().equalize_timing("whatever");
    }

    #[tokio::test]
    async fn test_async_variants_agree_with_sync() {
        let service = fast_password_service();
        let hash = service.hash_password_async("correct_password").await.unwrap();

        assert!(service.verify_password("correct_password", &hash));
        assert!(service.verify_password_async("correct_password", &hash).await);
        assert!(!service.verify_password_async("wrong", &hash).await);
        assert!(!service.verify_password_async("wrong", "garbage").await);
        service.equalize_timing_async("whatever").await;
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_verify_only_accepts_original(
            plaintext in "[ -~]{1,32}",
            other in "[ -~]{1,32}"
        ) {
            prop_assume!(plaintext != other);
            let service = fast_password_service();
            let hash = service.hash_password(&plaintext).unwrap();
            prop_assert!(service.verify_password(&plaintext, &hash));
            prop_assert!(!service.verify_password(&other, &hash));
        }
    }
}
