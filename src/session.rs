//! Dashboard sign-in and sessions.
//!
//! Passwords are checked against unsalted SHA-256 digests. This gates access
//! to the reports; it is not meant to protect anything sensitive.
//!
//! A [`Session`] is created by [`CredentialStore::sign_in`], handed by
//! reference to whatever serves reports, and ends on [`Session::sign_out`]
//! or when it expires.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::AuthError;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 480;

/// Hex SHA-256 digest of a password.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Maps usernames to password digests.
///
/// Stored as a plain JSON object on disk:
/// ```json
/// {
///   "admin": "<hex sha-256 of the password>",
///   "viewer": "<hex sha-256 of the password>"
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: HashMap<String, String>,
}

impl CredentialStore {
    /// Loads the store from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read credentials file '{path}'"))?;
        let users: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("credentials file '{path}' is not a JSON object of strings"))?;
        Ok(Self::from_digests(users))
    }

    pub fn from_digests(users: HashMap<String, String>) -> Self {
        let users = users
            .into_iter()
            .map(|(name, digest)| (name, digest.to_ascii_lowercase()))
            .collect();
        Self { users }
    }

    /// Registers `username` with a plaintext password.
    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        self.users
            .insert(username.to_string(), hash_password(password));
        self
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Checks the credentials and opens a session lasting `ttl`.
    ///
    /// Unknown users and wrong passwords fail the same way.
    pub fn sign_in(&self, username: &str, password: &str, ttl: Duration) -> Result<Session, AuthError> {
        self.sign_in_at(username, password, ttl, Utc::now())
    }

    pub fn sign_in_at(
        &self,
        username: &str,
        password: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingField);
        }

        match self.users.get(username) {
            Some(digest) if *digest == hash_password(password) => {
                info!(username, "Signed in");
                Ok(Session {
                    username: username.to_string(),
                    created_at: now,
                    expires_at: now + ttl,
                })
            }
            _ => {
                warn!(username, "Rejected sign-in");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

/// An authenticated user's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    username: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Fails with [`AuthError::Expired`] once the session has run out.
    pub fn ensure_active(&self, now: DateTime<Utc>) -> Result<(), AuthError> {
        if self.is_active(now) {
            Ok(())
        } else {
            Err(AuthError::Expired(self.username.clone()))
        }
    }

    /// Ends the session.
    pub fn sign_out(self) {
        info!(username = %self.username, "Signed out");
    }
}
