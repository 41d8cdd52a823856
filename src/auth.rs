use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use chrono::{Duration, Utc};
use anyhow::{Context, Result};
use log::warn;
use thiserror::Error;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use rand::RngCore;

const SALT_BYTES: usize = 16;

/// Fresh per-user salt: 16 random bytes, base64-encoded.
///
/// `OsRng` panics if the OS entropy source fails, which is the behavior we
/// want: abort instead of degrading to a weaker source.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut bytes);
    STANDARD_NO_PAD.encode(bytes)
}

/// Password-before-salt concatenation. The order is a fixed convention that
/// must match between registration and verification; changing it would
/// invalidate every stored hash.
pub fn combine(password: &str, salt: &str) -> String {
    format!("{}{}", password, salt)
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let algo = Argon2::default();
    let password_hash = algo
        .hash_password(password.as_bytes(), &salt)
        .context("Failed to hash password")?;
    Ok(password_hash.to_string())
}

/// Recomputes and compares in constant time. A stored hash that no longer
/// parses (data corruption) counts as a verification failure, not an error.
pub fn verify_password(hash: &str, password: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("Stored password hash is unparseable: {}", err);
            return false;
        }
    };
    let algo = Argon2::default();
    algo.verify_password(password.as_bytes(), &parsed_hash).is_ok()
}

#[derive(Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

/// HS256 token issuer/validator keyed by the process-wide secret. Built once
/// at startup from config and shared read-only across workers.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        TokenSigner {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(&self, subject: &str) -> Result<String> {
        let expiration = Utc::now()
            .checked_add_signed(self.ttl)
            .context("Token expiry overflows the representable time range")?
            .timestamp();

        let claims = Claims {
            sub: subject.to_owned(),
            exp: expiration as usize,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("Failed to sign token")?;
        Ok(token)
    }

    /// Vouches for signature and freshness only. The caller must still
    /// resolve the returned subject against the user store.
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims.sub),
            Err(err) => Err(match err.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }),
        }
    }
}
