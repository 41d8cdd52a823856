use actix_web::{get, http::header, post, web, HttpRequest, HttpResponse, Responder};
use log::error;
use sqlx::SqlitePool;

use crate::auth::TokenSigner;
use crate::credentials::{self, CredentialError};
use crate::models::{AuthorWithBooks, Credentials, NewAuthor, NewBook, Page, TokenResponse, UserResponse};
use crate::store;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(register_user)
        .service(issue_token)
        .service(protected)
        .service(create_author)
        .service(list_authors)
        .service(get_author)
        .service(create_book)
        .service(list_books)
        .service(get_book);
}

// ----- auth -----

#[post("/register")]
async fn register_user(
    payload: web::Json<Credentials>,
    pool: web::Data<SqlitePool>,
) -> impl Responder {
    match credentials::register(pool.get_ref(), &payload.login, &payload.password).await {
        Ok(user) => HttpResponse::Ok().json(UserResponse::from(&user)),
        Err(CredentialError::DuplicateLogin) => {
            HttpResponse::Conflict().body("User already exists")
        }
        Err(err) => {
            error!("Registration failed: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/token")]
async fn issue_token(
    payload: web::Json<Credentials>,
    pool: web::Data<SqlitePool>,
    signer: web::Data<TokenSigner>,
) -> impl Responder {
    let user = match credentials::authenticate(pool.get_ref(), &payload.login, &payload.password).await {
        Ok(user) => user,
        // Every rejection cause maps to the same response.
        Err(CredentialError::Rejected(_)) => {
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(err) => {
            error!("Authentication failed: {}", err);
            return HttpResponse::InternalServerError().finish();
        }
    };

    match signer.issue(&user.login) {
        Ok(access_token) => HttpResponse::Ok().json(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
        }),
        Err(err) => {
            error!("Token signing failed: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[get("/protected")]
async fn protected(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    signer: web::Data<TokenSigner>,
) -> impl Responder {
    let token = match bearer_token(&req) {
        Some(token) => token,
        None => return HttpResponse::Unauthorized().body("Invalid token"),
    };

    let login = match signer.validate(token) {
        Ok(subject) => subject,
        Err(_) => return HttpResponse::Unauthorized().body("Invalid token"),
    };

    // The token only vouches for signature and freshness; the account must
    // still exist.
    match store::find_user_by_login(pool.get_ref(), &login).await {
        Ok(Some(user)) => HttpResponse::Ok().json(serde_json::json!({
            "msg": format!("{}, welcome to the admin panel!", user.login),
        })),
        Ok(None) => HttpResponse::Unauthorized().body("Invalid token"),
        Err(err) => {
            error!("User lookup failed: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

// ----- authors -----

#[post("/authors")]
async fn create_author(payload: web::Json<NewAuthor>, pool: web::Data<SqlitePool>) -> impl Responder {
    match store::get_author_by_name(pool.get_ref(), &payload.name).await {
        Ok(Some(_)) => return HttpResponse::Conflict().body("Author already exists"),
        Ok(None) => {}
        Err(err) => {
            error!("Author lookup failed: {}", err);
            return HttpResponse::InternalServerError().finish();
        }
    }

    match store::create_author(pool.get_ref(), &payload.name).await {
        Ok(author) => HttpResponse::Ok().json(author),
        Err(err) => {
            error!("Author insertion failed: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/authors")]
async fn list_authors(page: web::Query<Page>, pool: web::Data<SqlitePool>) -> impl Responder {
    match store::list_authors(pool.get_ref(), page.skip(), page.limit()).await {
        Ok(authors) => HttpResponse::Ok().json(authors),
        Err(err) => {
            error!("Author listing failed: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/authors/{author_id}")]
async fn get_author(path: web::Path<i64>, pool: web::Data<SqlitePool>) -> impl Responder {
    let author_id = path.into_inner();
    let author = match store::get_author(pool.get_ref(), author_id).await {
        Ok(Some(author)) => author,
        Ok(None) => return HttpResponse::NotFound().body("Author not found"),
        Err(err) => {
            error!("Author lookup failed: {}", err);
            return HttpResponse::InternalServerError().finish();
        }
    };

    match store::books_by_author(pool.get_ref(), author.id).await {
        Ok(books) => HttpResponse::Ok().json(AuthorWithBooks {
            id: author.id,
            name: author.name,
            books,
        }),
        Err(err) => {
            error!("Book listing failed: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

// ----- books -----

#[post("/books")]
async fn create_book(payload: web::Json<NewBook>, pool: web::Data<SqlitePool>) -> impl Responder {
    match store::get_author(pool.get_ref(), payload.author_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return HttpResponse::NotFound().body("Author not found"),
        Err(err) => {
            error!("Author lookup failed: {}", err);
            return HttpResponse::InternalServerError().finish();
        }
    }

    match store::book_exists_for_author(pool.get_ref(), payload.author_id, &payload.name).await {
        Ok(true) => return HttpResponse::Conflict().body("Book already exists for this author"),
        Ok(false) => {}
        Err(err) => {
            error!("Book lookup failed: {}", err);
            return HttpResponse::InternalServerError().finish();
        }
    }

    match store::create_book(pool.get_ref(), &payload.name, payload.author_id).await {
        Ok(book) => HttpResponse::Ok().json(book),
        Err(err) => {
            error!("Book insertion failed: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/books")]
async fn list_books(page: web::Query<Page>, pool: web::Data<SqlitePool>) -> impl Responder {
    match store::list_books(pool.get_ref(), page.skip(), page.limit()).await {
        Ok(books) => HttpResponse::Ok().json(books),
        Err(err) => {
            error!("Book listing failed: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/books/{book_id}")]
async fn get_book(path: web::Path<i64>, pool: web::Data<SqlitePool>) -> impl Responder {
    match store::get_book(pool.get_ref(), path.into_inner()).await {
        Ok(Some(book)) => HttpResponse::Ok().json(book),
        Ok(None) => HttpResponse::NotFound().body("Book not found"),
        Err(err) => {
            error!("Book lookup failed: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}
