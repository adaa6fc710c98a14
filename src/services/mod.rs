pub mod auth_service;
pub mod chat_service;
pub mod leaderboard_service;
pub mod news_service;
pub mod reward_service;
pub mod streak_service;
