pub mod auth;
pub mod chat;
pub mod game;
pub mod health;
pub mod leaderboard;
pub mod metrics;
pub mod news;
pub mod swagger;

use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::middleware::AuthMiddleware;
use crate::utils::AppError;

/// Turns malformed JSON bodies into the standard error envelope
fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::warn!("❌ Malformed JSON on {} {}: {}", req.method(), req.path(), err);
    AppError::InvalidInput(format!("Invalid request body: {}", err)).into()
}

/// Registers every API route. Shared by `main` and handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(64 * 1024).error_handler(json_error_handler))
        // Health & metrics
        .route("/health", web::get().to(health::health_check))
        .route("/metrics", web::get().to(metrics::get_metrics))
        // Public auth endpoints
        .route("/login", web::post().to(auth::login))
        .route("/signup", web::post().to(auth::signup))
        .route("/logout", web::post().to(auth::logout))
        // External proxies
        .route("/chat", web::post().to(chat::chat))
        .route("/news", web::get().to(news::get_news))
        // Authenticated endpoints
        .service(
            web::resource("/protected")
                .wrap(AuthMiddleware)
                .route(web::get().to(auth::protected)),
        )
        .service(
            web::resource("/profile")
                .wrap(AuthMiddleware)
                .route(web::get().to(auth::profile)),
        )
        .service(
            web::resource("/leaderboard")
                .wrap(AuthMiddleware)
                .route(web::get().to(leaderboard::get_leaderboard)),
        )
        .service(
            web::resource("/game/complete")
                .wrap(AuthMiddleware)
                .route(web::post().to(game::complete_game)),
        );
}
