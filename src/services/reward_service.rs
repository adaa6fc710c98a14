use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::database::UserStore;
use crate::utils::AppError;

/// Body of POST /game/complete. Fields stay loosely typed so a wrong type is
/// reported as `InvalidInput` instead of a deserialisation failure.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameCompletionRequest {
    #[schema(value_type = Option<String>)]
    pub game_id: Option<serde_json::Value>,
    #[schema(value_type = Option<f64>)]
    pub score: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameReward {
    pub game_id: String,
    pub new_shield_coins: i64,
    pub coin_reward: i64,
    #[schema(value_type = f64)]
    pub xp_reward: serde_json::Number,
}

/// Validated submission
#[derive(Debug, Clone, PartialEq)]
pub struct GameSubmission {
    pub game_id: String,
    pub score: f64,
}

/// Largest score whose coin reward still fits a shield coin balance
pub const MAX_SCORE: f64 = 2.0 * i64::MAX as f64;

fn invalid() -> AppError {
    AppError::InvalidInput("Invalid gameId or score provided.".to_string())
}

pub fn validate_submission(request: &GameCompletionRequest) -> Result<GameSubmission, AppError> {
    let game_id = match &request.game_id {
        Some(serde_json::Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return Err(invalid()),
    };

    let score = request
        .score
        .as_ref()
        .and_then(|v| v.as_f64())
        .filter(|s| s.is_finite() && *s >= 0.0 && *s < MAX_SCORE)
        .ok_or_else(invalid)?;

    Ok(GameSubmission { game_id, score })
}

/// One shield coin for every two points scored
pub fn coin_reward_for(score: f64) -> i64 {
    (score / 2.0).floor() as i64
}

/// XP equals the score; whole scores are reported as integers
pub fn xp_for(score: f64) -> serde_json::Number {
    if score.fract() == 0.0 && score <= u64::MAX as f64 {
        serde_json::Number::from(score as u64)
    } else {
        serde_json::Number::from_f64(score).unwrap_or_else(|| serde_json::Number::from(0))
    }
}

/// Credits the coin reward for a finished game to the user's balance.
/// XP is reported back but not stored.
pub async fn apply_game_completion(
    store: &dyn UserStore,
    user_id: &ObjectId,
    submission: &GameSubmission,
) -> Result<GameReward, AppError> {
    let coin_reward = coin_reward_for(submission.score);

    let new_shield_coins = store
        .add_coins(user_id, coin_reward)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    log::info!(
        "🎮 Game '{}' completed by {}: +{} coins (balance {})",
        submission.game_id,
        user_id.to_hex(),
        coin_reward,
        new_shield_coins
    );

    Ok(GameReward {
        game_id: submission.game_id.clone(),
        new_shield_coins,
        coin_reward,
        xp_reward: xp_for(submission.score),
    })
}
