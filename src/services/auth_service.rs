use bcrypt::{hash, verify};
use chrono::{DateTime, SecondsFormat, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::config::{AppConfig, JwtConfig};
use crate::database::UserStore;
use crate::models::{NewUser, User, UserProfile, UserSummary};
use crate::services::streak_service::{self, LoginReward};
use crate::utils::AppError;

/// bcrypt work factor for stored passwords
const PASSWORD_HASH_COST: u32 = 10;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id (ObjectId hex)
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<ObjectId, AppError> {
        ObjectId::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))
    }
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub token_type: String,
    pub expires_at: String,
    pub user: UserSummary,
    pub login_reward: LoginReward,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SignupUser {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub user: SignupUser,
    pub token: String,
    pub token_type: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserProfile,
}

/// Signs an HS256 token for `user` valid for `ttl`. Returns the token and its expiry.
pub fn generate_jwt(
    user: &User,
    jwt: &JwtConfig,
    ttl: chrono::Duration,
) -> Result<(String, DateTime<Utc>), AppError> {
    let now = Utc::now();
    let expires_at = now + ttl;

    let claims = Claims {
        sub: user.id_hex(),
        email: user.email.clone(),
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: jwt.audience.clone(),
        iss: jwt.issuer.clone(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))?;

    Ok((token, expires_at))
}

// Verify JWT token
pub fn verify_token(token: &str, jwt: &JwtConfig) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[jwt.audience.as_str()]);

    let mut issuers = HashSet::new();
    issuers.insert(jwt.issuer.clone());
    validation.iss = Some(issuers);

    decode::<Claims>(token, &DecodingKey::from_secret(jwt.secret.as_ref()), &validation)
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

fn required(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// bcrypt is CPU bound; keep it off the async workers
async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash(password, PASSWORD_HASH_COST))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

async fn verify_password(password: String, stored_hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify(password, &stored_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password verification error: {}", e)))
}

fn format_expiry(expires_at: DateTime<Utc>) -> String {
    expires_at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// User registration
pub async fn signup(
    store: &dyn UserStore,
    config: &AppConfig,
    request: &SignupRequest,
) -> Result<SignupResponse, AppError> {
    // Password is kept verbatim; only blank passwords are rejected
    let (username, email, password) = match (
        required(&request.username),
        required(&request.email),
        request.password.clone().filter(|p| !p.trim().is_empty()),
    ) {
        (Some(u), Some(e), Some(p)) => (u, e.trim().to_lowercase(), p),
        _ => return Err(AppError::InvalidInput("All fields are required.".to_string())),
    };

    if store.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("User already exists with this email.".to_string()));
    }

    let password_hash = hash_password(password).await?;

    let user = store
        .insert(NewUser {
            username,
            email,
            password_hash,
        })
        .await?;

    let (token, expires_at) = generate_jwt(&user, &config.jwt, config.jwt.signup_ttl)?;

    log::info!("✅ User registered successfully: {}", user.email);

    Ok(SignupResponse {
        success: true,
        user: SignupUser {
            id: user.id_hex(),
            username: user.username,
            email: user.email,
        },
        token,
        token_type: "Bearer".to_string(),
        expires_at: format_expiry(expires_at),
    })
}

// User login: verifies the password, then updates streak and coins
pub async fn login(
    store: &dyn UserStore,
    config: &AppConfig,
    request: &LoginRequest,
) -> Result<LoginResponse, AppError> {
    let user = store
        .find_by_email(&request.email.trim().to_lowercase())
        .await?
        .ok_or_else(|| AppError::NotFound("User Not Found".to_string()))?;

    let valid = verify_password(request.password.clone(), user.password.clone()).await?;
    if !valid {
        return Err(AppError::InvalidCredentials("Invalid credentials".to_string()));
    }

    let (user, login_reward) =
        streak_service::record_login_activity(store, user, Utc::now(), config.day_boundary).await?;

    let ttl = if request.remember_me {
        config.jwt.remember_me_ttl
    } else {
        config.jwt.ttl
    };
    let (token, expires_at) = generate_jwt(&user, &config.jwt, ttl)?;

    Ok(LoginResponse {
        success: true,
        token,
        token_type: "Bearer".to_string(),
        expires_at: format_expiry(expires_at),
        user: UserSummary::from(&user),
        login_reward,
    })
}

// Get current user profile
pub async fn get_profile(store: &dyn UserStore, user_id: &ObjectId) -> Result<ProfileResponse, AppError> {
    let user = store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    Ok(ProfileResponse {
        success: true,
        user: UserProfile::from(&user),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryUserStore;
    use crate::services::streak_service::LoginOutcome;

    fn signup_request(email: &str) -> SignupRequest {
        SignupRequest {
            username: Some("  Ninja ".to_string()),
            email: Some(email.to_string()),
            password: Some("hunter22".to_string()),
        }
    }

    fn login_request(email: &str, password: &str, remember_me: bool) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            remember_me,
        }
    }

    #[tokio::test]
    async fn test_signup_normalises_and_hashes() {
        let store = MemoryUserStore::new();
        let config = AppConfig::for_tests();

        let response = signup(&store, &config, &signup_request(" Ninja@Example.com "))
            .await
            .unwrap();
        assert_eq!(response.user.email, "ninja@example.com");
        assert_eq!(response.user.username, "Ninja");

        let stored = store.find_by_email("ninja@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password, "hunter22");
        assert!(stored.password.starts_with("$2"));
        assert_eq!(stored.shield_coins, 0);
        assert_eq!(stored.current_streak, 0);

        let claims = verify_token(&response.token, &config.jwt).unwrap();
        assert_eq!(claims.sub, stored.id_hex());
    }

    #[tokio::test]
    async fn test_signup_validation_and_conflict() {
        let store = MemoryUserStore::new();
        let config = AppConfig::for_tests();

        let missing = SignupRequest {
            username: Some("a".to_string()),
            email: Some("   ".to_string()),
            password: Some("x".to_string()),
        };
        assert!(matches!(
            signup(&store, &config, &missing).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));

        signup(&store, &config, &signup_request("dup@example.com")).await.unwrap();
        assert!(matches!(
            signup(&store, &config, &signup_request("DUP@example.com")).await.unwrap_err(),
            AppError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_login_errors() {
        let store = MemoryUserStore::new();
        let config = AppConfig::for_tests();
        signup(&store, &config, &signup_request("a@example.com")).await.unwrap();

        let err = login(&store, &config, &login_request("nobody@example.com", "x", false))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = login(&store, &config, &login_request("a@example.com", "wrong", false))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials(_)));

        // Failed logins do not touch progression
        let stored = store.find_by_email("a@example.com").await.unwrap().unwrap();
        assert!(stored.last_login.is_none());
        assert_eq!(stored.shield_coins, 0);
    }

    #[tokio::test]
    async fn test_login_awards_first_login_bonus_once_per_day() {
        let store = MemoryUserStore::new();
        let config = AppConfig::for_tests();
        signup(&store, &config, &signup_request("a@example.com")).await.unwrap();

        let first = login(&store, &config, &login_request("a@example.com", "hunter22", false))
            .await
            .unwrap();
        assert_eq!(first.login_reward.outcome, LoginOutcome::FirstLogin);
        assert_eq!(first.user.shield_coins, 20);
        assert_eq!(first.user.current_streak, 1);

        let second = login(&store, &config, &login_request("A@example.com", "hunter22", false))
            .await
            .unwrap();
        assert_eq!(second.login_reward.outcome, LoginOutcome::SameDay);
        assert_eq!(second.user.shield_coins, 20);
    }

    #[tokio::test]
    async fn test_remember_me_extends_expiry() {
        let store = MemoryUserStore::new();
        let config = AppConfig::for_tests();
        signup(&store, &config, &signup_request("a@example.com")).await.unwrap();

        let short = login(&store, &config, &login_request("a@example.com", "hunter22", false))
            .await
            .unwrap();
        let long = login(&store, &config, &login_request("a@example.com", "hunter22", true))
            .await
            .unwrap();

        let short_exp = verify_token(&short.token, &config.jwt).unwrap().exp;
        let long_exp = verify_token(&long.token, &config.jwt).unwrap().exp;
        assert!(long_exp > short_exp + 20 * 24 * 3600);
    }

    #[test]
    fn test_verify_rejects_foreign_tokens() {
        let config = AppConfig::for_tests();
        let mut user = User::from_new(
            NewUser {
                username: "a".to_string(),
                email: "a@example.com".to_string(),
                password_hash: "x".to_string(),
            },
            mongodb::bson::DateTime::now(),
        );
        user.id = Some(ObjectId::new());

        let mut other = config.jwt.clone();
        other.secret = "another-secret".to_string();
        let (token, _) = generate_jwt(&user, &other, chrono::Duration::hours(1)).unwrap();
        assert!(verify_token(&token, &config.jwt).is_err());

        let (expired, _) = generate_jwt(&user, &config.jwt, chrono::Duration::hours(-2)).unwrap();
        assert!(verify_token(&expired, &config.jwt).is_err());

        assert!(verify_token("garbage", &config.jwt).is_err());
    }

    #[tokio::test]
    async fn test_profile() {
        let store = MemoryUserStore::new();
        let config = AppConfig::for_tests();
        let created = signup(&store, &config, &signup_request("a@example.com")).await.unwrap();
        let id = ObjectId::parse_str(&created.user.id).unwrap();

        let profile = get_profile(&store, &id).await.unwrap();
        assert_eq!(profile.user.email, "a@example.com");
        assert_eq!(profile.user.current_level, 1);

        assert!(matches!(
            get_profile(&store, &ObjectId::new()).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
