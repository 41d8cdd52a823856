use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stored credential record. The salt and hash never leave the process;
/// responses use [`UserResponse`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub salt: String,
    pub password_hash: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct UserResponse {
    pub id: i64,
    pub login: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id,
            login: user.login.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewAuthor {
    pub name: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct AuthorWithBooks {
    pub id: i64,
    pub name: String,
    pub books: Vec<Book>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub name: String,
    pub author_id: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewBook {
    pub name: String,
    pub author_id: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Page {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Page {
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(0, 1000)
    }
}
