use sqlx::SqlitePool;
use thiserror::Error;

use crate::models::{Author, Book, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("login already registered")]
    DuplicateLogin,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Uniqueness lives in the schema, not in application locks: two concurrent
/// inserts for the same login cannot both succeed.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            login TEXT NOT NULL UNIQUE,
            salt TEXT NOT NULL,
            password_hash TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            author_id INTEGER NOT NULL REFERENCES authors(id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            // SQLite extended result codes for UNIQUE / PK violations
            matches!(db_err.code().as_deref(), Some("2067") | Some("1555"))
                || db_err.message().contains("UNIQUE constraint failed")
        }
        _ => false,
    }
}

// ----- users -----

pub async fn find_user_by_login(pool: &SqlitePool, login: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, login, salt, password_hash FROM users WHERE login = ?")
        .bind(login)
        .fetch_optional(pool)
        .await
}

pub async fn insert_user(
    pool: &SqlitePool,
    login: &str,
    salt: &str,
    password_hash: &str,
) -> Result<User, StoreError> {
    let result = sqlx::query("INSERT INTO users (login, salt, password_hash) VALUES (?, ?, ?)")
        .bind(login)
        .bind(salt)
        .bind(password_hash)
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(User {
            id: done.last_insert_rowid(),
            login: login.to_owned(),
            salt: salt.to_owned(),
            password_hash: password_hash.to_owned(),
        }),
        Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateLogin),
        Err(err) => Err(StoreError::Database(err)),
    }
}

// ----- authors -----

pub async fn get_author(pool: &SqlitePool, author_id: i64) -> Result<Option<Author>, sqlx::Error> {
    sqlx::query_as::<_, Author>("SELECT id, name FROM authors WHERE id = ?")
        .bind(author_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_author_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Author>, sqlx::Error> {
    sqlx::query_as::<_, Author>("SELECT id, name FROM authors WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
}

pub async fn list_authors(pool: &SqlitePool, skip: i64, limit: i64) -> Result<Vec<Author>, sqlx::Error> {
    sqlx::query_as::<_, Author>("SELECT id, name FROM authors ORDER BY id LIMIT ? OFFSET ?")
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await
}

pub async fn create_author(pool: &SqlitePool, name: &str) -> Result<Author, sqlx::Error> {
    let done = sqlx::query("INSERT INTO authors (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(Author {
        id: done.last_insert_rowid(),
        name: name.to_owned(),
    })
}

// ----- books -----

pub async fn get_book(pool: &SqlitePool, book_id: i64) -> Result<Option<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>("SELECT id, name, author_id FROM books WHERE id = ?")
        .bind(book_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_books(pool: &SqlitePool, skip: i64, limit: i64) -> Result<Vec<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>("SELECT id, name, author_id FROM books ORDER BY id LIMIT ? OFFSET ?")
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await
}

pub async fn books_by_author(pool: &SqlitePool, author_id: i64) -> Result<Vec<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>("SELECT id, name, author_id FROM books WHERE author_id = ? ORDER BY id")
        .bind(author_id)
        .fetch_all(pool)
        .await
}

pub async fn book_exists_for_author(
    pool: &SqlitePool,
    author_id: i64,
    name: &str,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64,)>(
        "SELECT COUNT(*) FROM books WHERE author_id = ? AND LOWER(name) = LOWER(?)",
    )
    .bind(author_id)
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(row.0 > 0)
}

pub async fn create_book(pool: &SqlitePool, name: &str, author_id: i64) -> Result<Book, sqlx::Error> {
    let done = sqlx::query("INSERT INTO books (name, author_id) VALUES (?, ?)")
        .bind(name)
        .bind(author_id)
        .execute(pool)
        .await?;
    Ok(Book {
        id: done.last_insert_rowid(),
        name: name.to_owned(),
        author_id,
    })
}

#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // One connection only: each in-memory SQLite connection is its own db.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    init_schema(&pool).await.expect("Failed to create tables");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn inserted_user_is_found_by_login() {
        let pool = memory_pool().await;
        let user = insert_user(&pool, "alice", "salt", "hash").await.unwrap();
        assert_eq!(user.login, "alice");

        let found = find_user_by_login(&pool, "alice").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.salt, "salt");
        assert_eq!(found.password_hash, "hash");

        assert!(find_user_by_login(&pool, "bob").await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn duplicate_login_violates_unique_constraint() {
        let pool = memory_pool().await;
        insert_user(&pool, "alice", "s1", "h1").await.unwrap();

        let second = insert_user(&pool, "alice", "s2", "h2").await;
        assert!(matches!(second, Err(StoreError::DuplicateLogin)));

        let count = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users WHERE login = ?")
            .bind("alice")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[actix_web::test]
    async fn author_and_book_queries() {
        let pool = memory_pool().await;
        let author = create_author(&pool, "Lem").await.unwrap();
        assert_eq!(get_author_by_name(&pool, "Lem").await.unwrap().unwrap().id, author.id);

        let book = create_book(&pool, "Solaris", author.id).await.unwrap();
        assert_eq!(get_book(&pool, book.id).await.unwrap().unwrap().name, "Solaris");

        assert!(book_exists_for_author(&pool, author.id, "SOLARIS").await.unwrap());
        assert!(!book_exists_for_author(&pool, author.id, "Fiasco").await.unwrap());

        let books = books_by_author(&pool, author.id).await.unwrap();
        assert_eq!(books.len(), 1);

        let authors = list_authors(&pool, 0, 100).await.unwrap();
        assert_eq!(authors.len(), 1);
    }
}
