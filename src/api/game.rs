use actix_web::{web, HttpResponse, ResponseError};

use crate::database::UserStore;
use crate::services::auth_service::Claims;
use crate::services::reward_service::{self, GameCompletionRequest};

#[utoipa::path(
    post,
    path = "/game/complete",
    tag = "Games",
    request_body = GameCompletionRequest,
    responses(
        (status = 200, description = "Reward credited"),
        (status = 400, description = "Invalid gameId or score"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn complete_game(
    store: web::Data<dyn UserStore>,
    user: web::ReqData<Claims>,
    request: web::Json<GameCompletionRequest>,
) -> HttpResponse {
    log::info!("🎮 POST /game/complete - user: {}", user.sub);

    let submission = match reward_service::validate_submission(&request) {
        Ok(submission) => submission,
        Err(e) => {
            log::warn!("❌ Rejected game submission from {}: {}", user.sub, e);
            return e.error_response();
        }
    };

    let user_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match reward_service::apply_game_completion(store.get_ref(), &user_id, &submission).await {
        Ok(reward) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": format!(
                "Game completed! You earned {} Shield Coins and {} XP.",
                reward.coin_reward, reward.xp_reward
            ),
            "newShieldCoins": reward.new_shield_coins,
            "reward": reward.coin_reward,
            "xpEarned": reward.xp_reward
        })),
        Err(e) => {
            log::error!("❌ Game completion error for {}: {}", user.sub, e);
            e.error_response()
        }
    }
}
