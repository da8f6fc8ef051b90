use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{self, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid argon2 cost parameters: {0}")]
    Cost(argon2::Error),

    #[error("password hashing failed: {0}")]
    Hash(password_hash::Error),

    #[error("no password hash to compare against")]
    MissingHash,
}

/// Argon2id cost factors. Defaults match the argon2 crate's recommended
/// parameters (19 MiB, 2 passes, 1 lane).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashCost {
    /// Read cost overrides from `MARQUEE_ARGON2_*`, keeping defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memory_kib: env_u32("MARQUEE_ARGON2_MEMORY_KIB").unwrap_or(defaults.memory_kib),
            iterations: env_u32("MARQUEE_ARGON2_ITERATIONS").unwrap_or(defaults.iterations),
            parallelism: env_u32("MARQUEE_ARGON2_PARALLELISM").unwrap_or(defaults.parallelism),
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(PasswordError::Cost)?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// An account password: the stored PHC hash string, plus the plaintext it
/// was produced from while the value is still being validated.
///
/// Not serializable; `Debug` never prints either half.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Password {
    plaintext: Option<String>,
    hash: Option<String>,
}

impl Password {
    /// Wrap a hash loaded from storage. No plaintext is attached.
    pub fn from_hash(hash: String) -> Self {
        Self {
            plaintext: None,
            hash: Some(hash),
        }
    }

    /// Hash `plaintext` with the default cost.
    pub fn set(&mut self, plaintext: &str) -> Result<(), PasswordError> {
        self.set_with_cost(plaintext, &HashCost::default())
    }

    pub fn set_with_cost(&mut self, plaintext: &str, cost: &HashCost) -> Result<(), PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = cost
            .hasher()?
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(PasswordError::Hash)?
            .to_string();

        self.plaintext = Some(plaintext.to_string());
        self.hash = Some(hash);
        Ok(())
    }

    /// Constant-time comparison against the stored hash.
    /// A wrong password is `Ok(false)`; only a broken hash is an error.
    pub fn matches(&self, candidate: &str) -> Result<bool, PasswordError> {
        let hash = self.hash.as_deref().ok_or(PasswordError::MissingHash)?;
        let parsed = PasswordHash::new(hash).map_err(PasswordError::Hash)?;

        // Cost parameters are read back from the PHC string.
        match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::Hash(e)),
        }
    }

    pub fn plaintext(&self) -> Option<&str> {
        self.plaintext.as_deref()
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// Drop the plaintext once it is no longer needed for validation.
    pub fn clear_plaintext(&mut self) {
        self.plaintext = None;
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password")
            .field("plaintext", &self.plaintext.as_ref().map(|_| "<redacted>"))
            .field("hash", &self.hash.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
