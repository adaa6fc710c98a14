use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Scamurai API",
        version = "1.0.0",
        description = "Backend for the Scamurai fraud-awareness game.\n\n**Authentication:** profile, leaderboard and game endpoints require a JWT Bearer token obtained from `/login` or `/signup`.\n\n**Rewards:** logging in on consecutive calendar days grows a streak and awards shield coins; finished games award one coin per two points."
    ),
    paths(
        // Auth
        crate::api::auth::login,
        crate::api::auth::signup,
        crate::api::auth::logout,
        crate::api::auth::protected,
        crate::api::auth::profile,

        // Game
        crate::api::game::complete_game,
        crate::api::leaderboard::get_leaderboard,

        // External
        crate::api::chat::chat,
        crate::api::news::get_news,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,
    ),
    components(
        schemas(
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::SignupRequest,
            crate::services::auth_service::LoginResponse,
            crate::services::auth_service::SignupResponse,
            crate::services::auth_service::SignupUser,
            crate::services::auth_service::ProfileResponse,
            crate::services::streak_service::LoginReward,
            crate::services::streak_service::LoginOutcome,
            crate::services::reward_service::GameCompletionRequest,
            crate::services::reward_service::GameReward,
            crate::services::chat_service::ChatRequest,
            crate::services::chat_service::ChatResponse,
            crate::models::UserSummary,
            crate::models::UserProfile,
            crate::models::LeaderboardEntry,
            crate::api::leaderboard::LeaderboardResponse,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Signup, login (with streak rewards), logout and token check."),
        (name = "Profile", description = "Authenticated user's profile."),
        (name = "Games", description = "Game completion and shield-coin rewards."),
        (name = "Leaderboard", description = "Top players by shield coins."),
        (name = "External", description = "Chat assistant and fraud news proxies."),
        (name = "Health", description = "Health check and metrics."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by /login or /signup"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/login", "/signup", "/profile", "/leaderboard", "/game/complete"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
