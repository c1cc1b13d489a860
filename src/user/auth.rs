//! Password hashing and authentication failures

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::validation::FieldErrors;

/// Authentication failures that API clients can act on.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credenciales inválidas")]
    InvalidCredentials,

    #[error("Cuenta desactivada")]
    AccountDisabled,

    #[error("Token inválido o expirado")]
    InvalidToken,

    #[error("Usuario no encontrado")]
    UserNotFound,

    #[error("{0}")]
    Invalid(FieldErrors),
}

mod soundclone_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
        Argon2,
    };
    use rand::Rng;

    const SALT_LEN: usize = 16;

    pub fn generate_b64_salt() -> Result<String> {
        let mut bytes = [0u8; SALT_LEN];
        rand::rng().fill(&mut bytes);
        Ok(SaltString::encode_b64(&bytes)
            .map_err(|err| anyhow!("{}", err))?
            .to_string())
    }

    pub fn hash(plain: &[u8], b64_salt: &str) -> Result<String> {
        let salt = SaltString::from_b64(b64_salt).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::default()
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string())
    }

    pub fn verify(plain: &[u8], target_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(target_hash).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::default().verify_password(plain, &parsed).is_ok())
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum PasswordHasher {
    Argon2,
}

impl FromStr for PasswordHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(PasswordHasher::Argon2),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl fmt::Display for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordHasher::Argon2 => write!(f, "argon2"),
        }
    }
}

impl PasswordHasher {
    pub fn generate_b64_salt(&self) -> Result<String> {
        match self {
            PasswordHasher::Argon2 => soundclone_argon2::generate_b64_salt(),
        }
    }

    pub fn hash(&self, plain: &[u8], b64_salt: &str) -> Result<String> {
        match self {
            PasswordHasher::Argon2 => soundclone_argon2::hash(plain, b64_salt),
        }
    }

    pub fn verify(&self, plain: &str, target_hash: &str) -> Result<bool> {
        match self {
            PasswordHasher::Argon2 => soundclone_argon2::verify(plain.as_bytes(), target_hash),
        }
    }
}

/// A salted password hash ready to be stored.
#[derive(Clone, Debug)]
pub struct HashedPassword {
    pub salt: String,
    pub hash: String,
    pub hasher: PasswordHasher,
}

impl HashedPassword {
    pub fn new(plain: &str) -> Result<Self> {
        let hasher = PasswordHasher::Argon2;
        let salt = hasher.generate_b64_salt()?;
        let hash = hasher.hash(plain.as_bytes(), &salt)?;
        Ok(Self { salt, hash, hasher })
    }

    pub fn matches(&self, plain: &str) -> Result<bool> {
        self.hasher.verify(plain, &self.hash)
    }
}
