use actix_web::{web, HttpResponse, ResponseError};

use crate::config::AppConfig;
use crate::services::news_service;

/// Returns the upstream `articles` array unchanged
#[utoipa::path(
    get,
    path = "/news",
    tag = "External",
    responses(
        (status = 200, description = "Fraud-related news articles"),
        (status = 502, description = "News API unavailable")
    )
)]
pub async fn get_news(config: web::Data<AppConfig>) -> HttpResponse {
    log::info!("📰 GET /news");

    match news_service::fetch_fraud_news(&config.news).await {
        Ok(articles) => HttpResponse::Ok().json(articles),
        Err(e) => {
            log::error!("❌ Failed to fetch news: {}", e);
            e.error_response()
        }
    }
}
