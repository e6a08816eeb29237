//! Administrator bootstrap and Argon2 password hashing.

use crate::{
    config::settings::AdminCredentials,
    core::validation,
    entities::{AdminUser, admin_user},
    errors::{Error, Result},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{Set, prelude::*};
use tracing::{info, instrument, warn};

/// Hashes a password with Argon2id, returning the PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash(format!("Failed to hash password: {e}")))
}

/// Checks a password against a stored PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| Error::PasswordHash(format!("Invalid password hash format: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Outcome of [`create_admin_user`]
#[derive(Debug, Clone)]
pub enum AdminBootstrap {
    /// A new superuser was stored
    Created(admin_user::Model),
    /// The username was already taken; nothing changed
    AlreadyExists,
}

/// Creates a superuser from `credentials` unless the username exists.
#[instrument(skip(db, credentials), fields(username = %credentials.username))]
pub async fn create_admin_user(
    db: &DatabaseConnection,
    credentials: &AdminCredentials,
) -> Result<AdminBootstrap> {
    let username = credentials.username.trim();
    validation::require_non_empty("username", username)?;
    validation::require_non_empty("password", &credentials.password)?;
    let email = credentials.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(Error::Validation {
            field: "email",
            message: "must contain '@'".to_string(),
        });
    }

    let existing = AdminUser::find()
        .filter(admin_user::Column::Username.eq(username))
        .one(db)
        .await?;
    if existing.is_some() {
        warn!("Admin user {username} already exists; nothing to do");
        return Ok(AdminBootstrap::AlreadyExists);
    }

    let user = admin_user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email),
        password_hash: Set(hash_password(&credentials.password)?),
        is_superuser: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created admin user {}", user.username);
    Ok(AdminBootstrap::Created(user))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn credentials() -> AdminCredentials {
        AdminCredentials {
            username: "siteadmin".to_string(),
            email: "Admin@Example.COM".to_string(),
            password: "correct-horse-battery-staple".to_string(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
        assert!(verify_password("s3cret", "not-a-hash").is_err());
    }

    #[tokio::test]
    async fn test_create_admin_user_once() -> Result<()> {
        let db = setup_test_db().await?;

        let AdminBootstrap::Created(user) = create_admin_user(&db, &credentials()).await? else {
            panic!("expected a new admin user");
        };
        assert_eq!(user.email, "admin@example.com");
        assert!(user.is_superuser);
        assert_ne!(user.password_hash, "correct-horse-battery-staple");
        assert!(verify_password("correct-horse-battery-staple", &user.password_hash)?);

        let second = create_admin_user(&db, &credentials()).await?;
        assert!(matches!(second, AdminBootstrap::AlreadyExists));
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_email_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = credentials();
        input.email = "nobody".to_string();
        let result = create_admin_user(&db, &input).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "email", .. }
        ));
        Ok(())
    }
}
