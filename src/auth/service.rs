use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use super::session::SessionIdentity;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("all fields are required")]
    MissingField,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid email or password")]
    InvalidCredentials,
}

#[derive(Debug, Clone)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

/// Credential boundary: owns user records and password verification, keyed
/// by lowercased email. The rest of the service only ever sees the session
/// identity handed back by `verify`.
#[derive(Default)]
pub struct AuthService {
    users: RwLock<HashMap<String, UserRecord>>,
}

fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::rng().fill_bytes(&mut salt);
    let digest = Sha256::new()
        .chain_update(salt)
        .chain_update(password.as_bytes())
        .finalize();
    format!("{}${}", hex::encode(salt), hex::encode(digest))
}

fn verify_password(stored: &str, password: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let digest = Sha256::new()
        .chain_update(&salt)
        .chain_update(password.as_bytes())
        .finalize();
    hex::encode(digest) == digest_hex
}

impl AuthService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, email: &str, password: &str) -> Result<(), AuthError> {
        let name = name.trim();
        let email = email.trim().to_lowercase();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingField);
        }

        let mut users = self.users.write().unwrap();
        if users.contains_key(&email) {
            return Err(AuthError::DuplicateEmail);
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.clone(),
            password_hash: hash_password(password),
            created_at: Utc::now(),
        };
        log::info!("registered {} at {}", record.email, record.created_at);
        users.insert(email, record);
        Ok(())
    }

    pub fn verify(&self, email: &str, password: &str) -> Result<SessionIdentity, AuthError> {
        let email = email.trim().to_lowercase();
        let users = self.users.read().unwrap();
        let record = users.get(&email).ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(&record.password_hash, password) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(SessionIdentity {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_verify_round_trips() {
        let auth = AuthService::new();
        auth.register("Ada", "ada@example.com", "hunter2").unwrap();

        let identity = auth.verify("ada@example.com", "hunter2").unwrap();
        assert_eq!(identity.name, "Ada");
        assert_eq!(identity.email, "ada@example.com");
    }

    #[test]
    fn email_lookup_is_case_insensitive() {
        let auth = AuthService::new();
        auth.register("Ada", "Ada@Example.com", "hunter2").unwrap();
        assert!(auth.verify("ada@example.com", "hunter2").is_ok());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let auth = AuthService::new();
        auth.register("Ada", "ada@example.com", "hunter2").unwrap();
        let err = auth.register("Other", "ada@example.com", "pw").unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let auth = AuthService::new();
        auth.register("Ada", "ada@example.com", "hunter2").unwrap();
        let err = auth.verify("ada@example.com", "wrong").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn empty_fields_are_rejected() {
        let auth = AuthService::new();
        let err = auth.register("", "ada@example.com", "pw").unwrap_err();
        assert!(matches!(err, AuthError::MissingField));
        let err = auth.register("Ada", "ada@example.com", "").unwrap_err();
        assert!(matches!(err, AuthError::MissingField));
    }

    #[test]
    fn plaintext_is_never_stored() {
        let auth = AuthService::new();
        auth.register("Ada", "ada@example.com", "hunter2").unwrap();
        let users = auth.users.read().unwrap();
        let record = users.get("ada@example.com").unwrap();
        assert!(!record.password_hash.contains("hunter2"));
    }
}
