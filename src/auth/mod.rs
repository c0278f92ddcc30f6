pub mod prompt;

use sha2::{Digest, Sha256};
use std::fmt;
use tracing::warn;

use crate::config::AdminConfig;

/// Environment variable holding the admin password in plain text
pub const ENV_ADMIN_PASSWORD_VAR: &str = "TRANSFER_RANK_ADMIN_PASSWORD";

/// Environment variable supplying the password for a single command
pub const ENV_PASSWORD_VAR: &str = "TRANSFER_RANK_PASSWORD";

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

pub use prompt::{require_admin, supplied_password};

#[derive(Debug)]
pub enum AuthError {
    Rejected,
    EmptyPassword,
    Prompt(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Rejected => write!(f, "Admin password rejected"),
            AuthError::EmptyPassword => write!(f, "Admin password cannot be empty"),
            AuthError::Prompt(msg) => write!(f, "Failed to read admin password: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Where the expected admin password comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedPassword {
    /// Hex SHA-256 digest from the config file
    Digest(String),
    /// Plain password from the environment
    Plain(String),
    /// Nothing configured; the built-in default applies
    Default,
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Pick the expected password. The config digest wins over the environment.
pub fn resolve_expected(admin: &AdminConfig, env_password: Option<String>) -> ExpectedPassword {
    if let Some(digest) = admin
        .password_sha256
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        return ExpectedPassword::Digest(digest.to_ascii_lowercase());
    }
    match env_password.filter(|p| !p.is_empty()) {
        Some(password) => ExpectedPassword::Plain(password),
        None => ExpectedPassword::Default,
    }
}

pub fn expected_from_env(admin: &AdminConfig) -> ExpectedPassword {
    resolve_expected(admin, std::env::var(ENV_ADMIN_PASSWORD_VAR).ok())
}

/// Compare digests without stopping at the first differing byte.
fn digests_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

pub fn verify_password(expected: &ExpectedPassword, supplied: &str) -> Result<(), AuthError> {
    if supplied.is_empty() {
        return Err(AuthError::EmptyPassword);
    }
    let supplied_digest = sha256_hex(supplied);
    let expected_digest = match expected {
        ExpectedPassword::Digest(digest) => digest.clone(),
        ExpectedPassword::Plain(password) => sha256_hex(password),
        ExpectedPassword::Default => {
            warn!("no admin password configured, accepting the default password");
            sha256_hex(DEFAULT_ADMIN_PASSWORD)
        }
    };
    if digests_match(&supplied_digest, &expected_digest) {
        Ok(())
    } else {
        Err(AuthError::Rejected)
    }
}
