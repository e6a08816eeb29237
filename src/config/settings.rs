//! Process settings gathered once from the environment.
//!
//! Everything the binary reads from the environment ends up in [`Settings`],
//! which is then passed explicitly to the code that needs it.

use super::database::DEFAULT_DATABASE_URL;

/// Credentials for the bootstrap administrator account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    /// Login name
    pub username: String,
    /// Contact email
    pub email: String,
    /// Plain-text password; hashed before it is stored
    pub password: String,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Database connection URL
    pub database_url: String,
    /// Present only when all three `ADMIN_*` variables are set and non-empty
    pub admin: Option<AdminCredentials>,
}

impl Settings {
    /// Builds settings from the process environment (after `.env` loading).
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url =
            non_empty("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let admin = match (
            non_empty("ADMIN_USERNAME"),
            non_empty("ADMIN_EMAIL"),
            non_empty("ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(AdminCredentials {
                username,
                email,
                password,
            }),
            _ => None,
        };

        Self {
            database_url,
            admin,
        }
    }
}
