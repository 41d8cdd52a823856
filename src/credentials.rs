use anyhow::Context as _;
use log::debug;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::auth::{combine, generate_salt, hash_password, verify_password};
use crate::models::User;
use crate::store::{self, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    NotFound,
    BadCredentials,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("user already exists")]
    DuplicateLogin,
    // One message for every rejection cause, so callers cannot surface
    // whether the login exists. The cause stays available for logs.
    #[error("invalid credentials")]
    Rejected(AuthFailure),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub async fn register(pool: &SqlitePool, login: &str, password: &str) -> Result<User, CredentialError> {
    let existing = store::find_user_by_login(pool, login)
        .await
        .context("Failed to query user by login")?;
    if existing.is_some() {
        return Err(CredentialError::DuplicateLogin);
    }

    let salt = generate_salt();
    let password_hash = hash_password(&combine(password, &salt))?;

    // The UNIQUE constraint is the authority for concurrent registrations;
    // the lookup above only short-circuits the common case.
    match store::insert_user(pool, login, &salt, &password_hash).await {
        Ok(user) => Ok(user),
        Err(StoreError::DuplicateLogin) => Err(CredentialError::DuplicateLogin),
        Err(StoreError::Database(err)) => {
            Err(CredentialError::Internal(anyhow::Error::new(err).context("Failed to insert user")))
        }
    }
}

pub async fn authenticate(pool: &SqlitePool, login: &str, password: &str) -> Result<User, CredentialError> {
    let user = store::find_user_by_login(pool, login)
        .await
        .context("Failed to query user by login")?;

    let user = match user {
        Some(user) => user,
        None => {
            // Burn an equivalent hash so an unknown login takes as long as a
            // wrong password.
            let _ = hash_password(&combine(password, &generate_salt()));
            debug!("Authentication failed for {}: unknown login", login);
            return Err(CredentialError::Rejected(AuthFailure::NotFound));
        }
    };

    if verify_password(&user.password_hash, &combine(password, &user.salt)) {
        Ok(user)
    } else {
        debug!("Authentication failed for {}: password mismatch", login);
        Err(CredentialError::Rejected(AuthFailure::BadCredentials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory_pool;

    #[actix_web::test]
    async fn register_then_authenticate() {
        let pool = memory_pool().await;
        let registered = register(&pool, "alice", "hunter2").await.unwrap();
        assert_eq!(registered.login, "alice");

        let authenticated = authenticate(&pool, "alice", "hunter2").await.unwrap();
        assert_eq!(authenticated.id, registered.id);
    }

    #[actix_web::test]
    async fn plaintext_is_never_persisted() {
        let pool = memory_pool().await;
        let user = register(&pool, "alice", "hunter2").await.unwrap();

        assert!(user.password_hash.starts_with("$argon2"));
        assert!(!user.password_hash.contains("hunter2"));
        assert!(!user.salt.is_empty());
    }

    #[actix_web::test]
    async fn second_registration_is_a_duplicate() {
        let pool = memory_pool().await;
        register(&pool, "alice", "hunter2").await.unwrap();

        let second = register(&pool, "alice", "other").await;
        assert!(matches!(second, Err(CredentialError::DuplicateLogin)));

        let count = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users WHERE login = ?")
            .bind("alice")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[actix_web::test]
    async fn wrong_password_and_unknown_login_look_the_same() {
        let pool = memory_pool().await;
        register(&pool, "alice", "hunter2").await.unwrap();

        let wrong_password = authenticate(&pool, "alice", "hunter3").await.unwrap_err();
        let unknown_login = authenticate(&pool, "nobody", "hunter2").await.unwrap_err();

        assert!(matches!(wrong_password, CredentialError::Rejected(AuthFailure::BadCredentials)));
        assert!(matches!(unknown_login, CredentialError::Rejected(AuthFailure::NotFound)));
        // The externally visible outcome is identical.
        assert_eq!(wrong_password.to_string(), unknown_login.to_string());
    }
}
