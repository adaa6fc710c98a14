use actix_web::{web, HttpResponse, ResponseError};

use crate::config::AppConfig;
use crate::database::UserStore;
use crate::models::LeaderboardEntry;
use crate::services::leaderboard_service;

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct LeaderboardResponse {
    pub success: bool,
    pub message: String,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[utoipa::path(
    get,
    path = "/leaderboard",
    tag = "Leaderboard",
    responses(
        (status = 200, description = "Top users by shield coins", body = LeaderboardResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_leaderboard(store: web::Data<dyn UserStore>, config: web::Data<AppConfig>) -> HttpResponse {
    log::info!("🏆 GET /leaderboard");

    match leaderboard_service::top_players(store.get_ref(), config.leaderboard_limit).await {
        Ok(leaderboard) => HttpResponse::Ok().json(LeaderboardResponse {
            success: true,
            message: format!("Top {} users retrieved successfully.", config.leaderboard_limit),
            leaderboard,
        }),
        Err(e) => {
            log::error!("❌ Leaderboard error: {}", e);
            e.error_response()
        }
    }
}
