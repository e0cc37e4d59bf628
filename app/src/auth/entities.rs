//! Handles user authentication and tokens. Authentication is proven by possession of a token;
//! a valid, enabled token yields a [`Grant`], which every authenticated operation takes as a
//! compile-time proof of who the caller is.

use crate::user;
use argon2::password_hash::{PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, Rng};
use sha2::Digest;
use std::fmt;
use thiserror::Error;
use tokio::task;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("access denied")]
pub struct AccessDenied;

/// Hashing or parsing a stored password failed. Not a wrong password.
#[derive(Debug, Error)]
#[error("credential error: {0}")]
pub struct CredentialError(String);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenId(pub Uuid);

/// Proof that the request was made with a valid token belonging to `user_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub token_id: TokenId,
    pub user_id: user::Id,
}

/// A hash of the token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenHash(String);

impl TokenHash {
    /// Hashes a token with SHA256, without salting. Tokens are generated randomly, so they have
    /// enough entropy for a fast unsalted hash.
    pub(crate) fn generate(token: &str) -> Self {
        let mut hasher = sha2::Sha256::new();
        hasher.update(token);
        Self(hex::encode(hasher.finalize()))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

/// An argon2 password hash in PHC string format.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashing and verification are CPU bound and run on the blocking thread pool.
    pub(crate) async fn generate(password: String) -> Result<Self, CredentialError> {
        task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| Self(hash.to_string()))
                .map_err(|e| CredentialError(e.to_string()))
        })
        .await
        .map_err(|e| CredentialError(e.to_string()))?
    }

    pub(crate) fn from_stored(hash: String) -> Self {
        Self(hash)
    }

    pub(crate) async fn verify(&self, password: &str) -> Result<bool, CredentialError> {
        let hash = self.0.clone();
        let password = password.to_owned();
        task::spawn_blocking(move || -> Result<bool, CredentialError> {
            let parsed =
                argon2::PasswordHash::new(&hash).map_err(|e| CredentialError(e.to_string()))?;
            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|e| CredentialError(e.to_string()))?
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// What the store knows about a user's password.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: user::Id,
    pub password: PasswordHash,
}

/// A token proves the identity of a user. A user gets a new token on every sign-in.
#[derive(Debug, Clone)]
pub struct Token {
    pub(crate) id: TokenId,
    pub(crate) user_id: user::Id,
    pub(crate) created: DateTime<Utc>,
    pub(crate) disabled: Option<DateTime<Utc>>,
}

impl Token {
    pub(crate) fn grant(&self) -> Result<Grant, AccessDenied> {
        if self.is_enabled() {
            Ok(Grant {
                token_id: self.id,
                user_id: self.user_id,
            })
        } else {
            Err(AccessDenied)
        }
    }

    fn is_enabled(&self) -> bool {
        self.disabled.is_none()
    }
}

/// A freshly issued token. The plain text is handed to the user once and never stored.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: Token,
    pub plain: String,
    pub hash: TokenHash,
}

impl IssuedToken {
    pub(crate) fn generate(user_id: user::Id) -> Self {
        let plain = hex::encode(OsRng.gen::<[u8; 32]>());
        Self {
            hash: TokenHash::generate(&plain),
            token: Token {
                id: TokenId(Uuid::new_v4()),
                user_id,
                created: Utc::now(),
                disabled: None,
            },
            plain,
        }
    }
}
