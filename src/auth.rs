use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Identity;
use crate::store::{keys, Store};

// Behavioral parity with the original console: one hardcoded master pair and
// a plaintext local credential list. This is NOT a security mechanism; the
// module boundary exists so a real identity provider can replace it.
pub const ADMIN_EMAIL: &str = "abhi.solanki142011@gmail.com";
pub const ADMIN_PASS: &str = "aaruto100108112";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Credential {
    email: String,
    password: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Mismatch. Access denied.")]
    Mismatch,

    #[error("Identity already bound.")]
    EmailTaken,

    #[error("Email and passkey are both required.")]
    MissingInput,
}

fn load_credentials(store: &Store) -> Vec<Credential> {
    store.get(keys::USERS).unwrap_or_default()
}

/// Login: the admin pair wins unconditionally; anything else must match a
/// record in the persisted credential list exactly.
pub fn login(store: &Store, email: &str, password: &str) -> Result<Identity, AuthError> {
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingInput);
    }
    if email == ADMIN_EMAIL && password == ADMIN_PASS {
        return Ok(Identity {
            email: email.to_string(),
            is_admin: true,
        });
    }
    let users = load_credentials(store);
    let found = users
        .iter()
        .any(|c| c.email == email && c.password == password);
    if found {
        Ok(Identity {
            email: email.to_string(),
            is_admin: false,
        })
    } else {
        Err(AuthError::Mismatch)
    }
}

/// Signup: rejects duplicate emails without touching the list, otherwise
/// appends the pair and yields a non-admin identity.
pub fn signup(store: &Store, email: &str, password: &str) -> Result<Identity, AuthError> {
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingInput);
    }
    let mut users = load_credentials(store);
    if users.iter().any(|c| c.email == email) {
        return Err(AuthError::EmailTaken);
    }
    users.push(Credential {
        email: email.to_string(),
        password: password.to_string(),
    });
    store.set(keys::USERS, &users);
    Ok(Identity {
        email: email.to_string(),
        is_admin: false,
    })
}
