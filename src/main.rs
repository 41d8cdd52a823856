use actix_cors::Cors;
use actix_web::main;
use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Duration;
use env_logger::Env;
use log::info;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::str::FromStr;

mod auth;
mod config;
mod credentials;
mod handlers;
mod models;
mod store;

use auth::TokenSigner;
use config::Config;

#[main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().expect("Invalid configuration");

    // Configure SQLite options to create the database file if it doesn't exist
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .expect("Failed to create SQLite options")
        .create_if_missing(true)
        .to_owned();

    let pool = SqlitePool::connect_with(options)
        .await
        .expect("Failed to connect to the database");

    store::init_schema(&pool)
        .await
        .expect("Failed to create tables");

    // Signing secret and TTL are injected once here; nothing else in the
    // process holds key material.
    let signer = web::Data::new(TokenSigner::new(
        config.token_secret.as_bytes(),
        Duration::minutes(config.token_ttl_minutes),
    ));

    info!("Listening on {}", config.bind_addr);

    let bind_addr = config.bind_addr.clone();
    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(signer.clone())
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
