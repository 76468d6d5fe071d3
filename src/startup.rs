use actix_web::{middleware::Logger, web, App, HttpServer};
use actix_web::dev::Server;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::configuration::{AuthSettings, DatabaseSettings};
use crate::error::AppError;
use crate::middleware::{JwtMiddleware, RequestLogger};
use crate::routes::{health_check, login, logout, logout_all, profile, refresh, register};
use crate::store::{PgCredentialStore, PgTokenRecordStore};

/// Build the server around an already wired `AuthService`.
pub fn run(listener: TcpListener, auth: AuthService) -> Result<Server, std::io::Error> {
    let codec = auth.codec();
    let auth = web::Data::new(auth);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(RequestLogger)
            .app_data(auth.clone())
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))
            // Protected routes (require an access token)
            .service(
                web::resource("/auth/logout-all")
                    .wrap(JwtMiddleware::new(codec.clone()))
                    .route(web::post().to(logout_all)),
            )
            .service(
                web::resource("/auth/profile")
                    .wrap(JwtMiddleware::new(codec.clone()))
                    .route(web::get().to(profile)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub async fn connect_pool(config: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.connection_string())
        .await
}

/// `AuthService` over the Postgres stores.
pub fn postgres_auth_service(pool: PgPool, settings: &AuthSettings) -> Result<AuthService, AppError> {
    AuthService::new(
        settings,
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(PgTokenRecordStore::new(pool)),
    )
}
