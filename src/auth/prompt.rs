use tracing::debug;

use super::{expected_from_env, verify_password, AuthError, ENV_PASSWORD_VAR};
use crate::config::AdminConfig;

/// Password from TRANSFER_RANK_PASSWORD, or a hidden prompt on the terminal.
pub fn supplied_password() -> Result<String, AuthError> {
    if let Ok(password) = std::env::var(ENV_PASSWORD_VAR) {
        if !password.is_empty() {
            debug!("using admin password from environment");
            return Ok(password);
        }
    }

    let password = rpassword::prompt_password("Admin password: ")
        .map_err(|e| AuthError::Prompt(e.to_string()))?;
    let password = password.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(AuthError::EmptyPassword);
    }
    Ok(password)
}

/// Gate an administrative command on the admin password.
pub fn require_admin(admin: &AdminConfig) -> Result<(), AuthError> {
    let expected = expected_from_env(admin);
    let supplied = supplied_password()?;
    verify_password(&expected, &supplied)
}
