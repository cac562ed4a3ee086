//! Salted digests and random tokens for passwords and one-time passwords.
//!
//! Plaintext never reaches a driven port: services hash with [`SecretHasher`]
//! and adapters persist the resulting [`SecretDigest`] PHC strings.

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version,
    password_hash::{PasswordHash, SaltString, rand_core::OsRng},
};
use rand::{Rng, distributions::Slice, thread_rng};
use zeroize::Zeroizing;

/// Length of generated one-time passwords.
pub const ONE_TIME_PASSWORD_LEN: usize = 10;

/// Argon2 PHC string such as `$argon2id$v=19$...`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretDigest(String);

impl SecretDigest {
    /// Wrap a digest read back from storage.
    ///
    /// Malformed input is accepted; it simply never verifies.
    pub fn from_stored(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for SecretDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretDigest(..)")
    }
}

impl From<SecretDigest> for String {
    fn from(value: SecretDigest) -> Self {
        value.0
    }
}

/// Failure while hashing a secret.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("secret hashing failed: {message}")]
pub struct SecretHashError {
    message: String,
}

/// Argon2id hasher shared by the account service.
#[derive(Clone)]
pub struct SecretHasher {
    argon2: Argon2<'static>,
}

impl Default for SecretHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretHasher {
    /// Hasher with the library's recommended Argon2id parameters.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Hasher with explicit cost parameters.
    ///
    /// Tests use tiny costs to keep debug builds fast.
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, SecretHashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None).map_err(|err| {
            SecretHashError {
                message: err.to_string(),
            }
        })?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash `secret` with a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<SecretDigest, SecretHashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| SecretDigest(hash.to_string()))
            .map_err(|err| SecretHashError {
                message: err.to_string(),
            })
    }

    /// Constant-time check of `candidate` against `digest`.
    pub fn verify(&self, candidate: &str, digest: &SecretDigest) -> bool {
        PasswordHash::new(digest.as_str())
            .map(|parsed| {
                self.argon2
                    .verify_password(candidate.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

/// Alphanumerics without the look-alikes `0 O 1 I l`.
pub const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

/// Random token of `len` characters drawn from [`TOKEN_ALPHABET`].
pub fn random_token(len: usize) -> Zeroizing<String> {
    let Ok(alphabet) = Slice::new(TOKEN_ALPHABET) else {
        return Zeroizing::new(String::new());
    };
    Zeroizing::new(
        thread_rng()
            .sample_iter(alphabet)
            .take(len)
            .map(|byte| char::from(*byte))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn hasher() -> SecretHasher {
        SecretHasher::with_params(8, 1, 1).expect("tiny argon2 params")
    }

    #[rstest]
    fn hash_is_salted_phc(hasher: SecretHasher) {
        let first = hasher.hash("hunter2").expect("hash");
        let second = hasher.hash("hunter2").expect("hash");
        assert!(first.as_str().starts_with("$argon2id$"));
        assert_ne!(first, second);
    }

    #[rstest]
    #[case("hunter2", true)]
    #[case("hunter3", false)]
    #[case("", false)]
    fn verify_matches_only_the_original(
        hasher: SecretHasher,
        #[case] candidate: &str,
        #[case] expected: bool,
    ) {
        let digest = hasher.hash("hunter2").expect("hash");
        assert_eq!(hasher.verify(candidate, &digest), expected);
    }

    #[rstest]
    fn malformed_digest_never_verifies(hasher: SecretHasher) {
        let digest = SecretDigest::from_stored("plaintext");
        assert!(!hasher.verify("plaintext", &digest));
    }

    #[rstest]
    fn random_token_avoids_look_alikes() {
        let token = random_token(256);
        assert_eq!(token.len(), 256);
        assert!(token.bytes().all(|byte| TOKEN_ALPHABET.contains(&byte)));
        assert!(!token.contains(['0', 'O', '1', 'I', 'l']));
    }

    #[rstest]
    fn debug_hides_digest(hasher: SecretHasher) {
        let digest = hasher.hash("hunter2").expect("hash");
        assert_eq!(format!("{digest:?}"), "SecretDigest(..)");
    }
}
