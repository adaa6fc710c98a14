use std::env;
use std::time::Duration;

use crate::services::leaderboard_service::MAX_LEADERBOARD_SIZE;
use crate::services::streak_service::DayBoundary;

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:5173,http://localhost:3000,http://127.0.0.1:5173,http://127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    MongoDb,
    Memory,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl: chrono::Duration,
    pub remember_me_ttl: chrono::Duration,
    pub signup_ttl: chrono::Duration,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub day_boundary: DayBoundary,
    pub leaderboard_limit: i64,
    pub chat: ChatConfig,
    pub news: NewsConfig,
    pub cors_origins: Vec<String>,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Reads configuration from the environment (call `dotenv()` first)
    pub fn from_env() -> Result<Self, String> {
        let storage = match var_or("STORAGE_BACKEND", "mongodb").to_lowercase().as_str() {
            "mongodb" | "mongo" => StorageBackend::MongoDb,
            "memory" => StorageBackend::Memory,
            other => return Err(format!("Unknown STORAGE_BACKEND: {}", other)),
        };

        let database_url = optional_var("DATABASE_URL").or_else(|| optional_var("MONGO_URI"));
        if storage == StorageBackend::MongoDb && database_url.is_none() {
            return Err("DATABASE_URL (or MONGO_URI) must be set".to_string());
        }

        let secret = match optional_var("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                log::warn!("⚠️  JWT_SECRET not set, using an insecure development secret");
                "default-secret-change-me".to_string()
            }
        };

        let jwt = JwtConfig {
            secret,
            issuer: var_or("JWT_ISSUER", "scamurai"),
            audience: var_or("JWT_AUDIENCE", "scamurai-app"),
            ttl: chrono::Duration::hours(parse_var("TOKEN_TTL_HOURS", 7)?),
            remember_me_ttl: chrono::Duration::days(parse_var("REMEMBER_ME_TTL_DAYS", 30)?),
            signup_ttl: chrono::Duration::hours(parse_var("SIGNUP_TOKEN_TTL_HOURS", 1)?),
        };

        let day_boundary: DayBoundary = var_or("DAY_BOUNDARY", "utc").parse()?;

        let leaderboard_limit: i64 = parse_var("LEADERBOARD_LIMIT", 10)?;
        if !(1..=MAX_LEADERBOARD_SIZE).contains(&leaderboard_limit) {
            return Err(format!(
                "LEADERBOARD_LIMIT must be between 1 and {}",
                MAX_LEADERBOARD_SIZE
            ));
        }

        let chat = ChatConfig {
            api_key: optional_var("GROQ_API_KEY"),
            api_url: var_or("LLM_API_URL", "https://api.groq.com/openai/v1/chat/completions"),
            model: var_or("LLM_MODEL", "llama-3.1-8b-instant"),
        };

        let news = NewsConfig {
            api_key: optional_var("NEWS_API_KEY"),
            api_url: var_or("NEWS_API_URL", "https://newsapi.org/v2/everything"),
            cache_ttl: Duration::from_secs(parse_var("NEWS_CACHE_TTL_SECS", 600)?),
        };

        let cors_origins = var_or("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ORIGINS)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", 5000)?,
            storage,
            database_url,
            jwt,
            day_boundary,
            leaderboard_limit,
            chat,
            news,
            cors_origins,
        })
    }

    /// Configuration for tests and local runs: in-memory store, UTC days
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            storage: StorageBackend::Memory,
            database_url: None,
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                issuer: "scamurai".to_string(),
                audience: "scamurai-app".to_string(),
                ttl: chrono::Duration::hours(7),
                remember_me_ttl: chrono::Duration::days(30),
                signup_ttl: chrono::Duration::hours(1),
            },
            day_boundary: DayBoundary::Utc,
            leaderboard_limit: 10,
            chat: ChatConfig {
                api_key: None,
                api_url: "http://127.0.0.1:9/chat".to_string(),
                model: "llama-3.1-8b-instant".to_string(),
            },
            news: NewsConfig {
                api_key: None,
                api_url: "http://127.0.0.1:9/news".to_string(),
                cache_ttl: Duration::from_secs(600),
            },
            cors_origins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so parallel tests never race on process env vars
    #[test]
    fn test_from_env() {
        env::set_var("STORAGE_BACKEND", "memory");
        env::set_var("DAY_BOUNDARY", "+05:30");
        env::set_var("REMEMBER_ME_TTL_DAYS", "14");
        env::set_var("CORS_ALLOWED_ORIGINS", "http://a.test, http://b.test,");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.jwt.remember_me_ttl, chrono::Duration::days(14));
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_ne!(config.day_boundary, DayBoundary::Utc);

        env::set_var("LEADERBOARD_LIMIT", "abc");
        assert!(AppConfig::from_env().is_err());

        env::set_var("LEADERBOARD_LIMIT", "11");
        assert!(AppConfig::from_env().is_err());
        env::set_var("LEADERBOARD_LIMIT", "0");
        assert!(AppConfig::from_env().is_err());
        env::set_var("LEADERBOARD_LIMIT", "5");
        assert_eq!(AppConfig::from_env().unwrap().leaderboard_limit, 5);

        env::set_var("LEADERBOARD_LIMIT", "10");
        env::set_var("STORAGE_BACKEND", "mongodb");
        env::remove_var("DATABASE_URL");
        env::remove_var("MONGO_URI");
        assert!(AppConfig::from_env().is_err());

        for name in [
            "STORAGE_BACKEND",
            "DAY_BOUNDARY",
            "REMEMBER_ME_TTL_DAYS",
            "CORS_ALLOWED_ORIGINS",
            "LEADERBOARD_LIMIT",
        ] {
            env::remove_var(name);
        }
    }
}
