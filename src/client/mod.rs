//! Client SDK for the Scamurai API.
//!
//! Keeps the token and a snapshot of the logged-in user in a
//! [`SessionStore`]. The session is dropped on logout, when the token has
//! expired, and whenever the server answers 401; the snapshot is refreshed
//! after every call that changes the user's progress.

pub mod session;

pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::models::{LeaderboardEntry, UserProfile, UserSummary};
use crate::services::streak_service::LoginReward;
use crate::utils::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginReply {
    pub token: String,
    pub user: UserSummary,
    pub login_reward: LoginReward,
}

#[derive(Debug, Deserialize)]
struct SignupReply {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ProfileReply {
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct LeaderboardReply {
    leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    reply: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCompletionReply {
    pub message: String,
    pub new_shield_coins: i64,
    pub reward: i64,
    pub xp_earned: f64,
}

impl From<&UserProfile> for UserSummary {
    fn from(profile: &UserProfile) -> Self {
        UserSummary {
            id: profile.id.clone(),
            username: profile.username.clone(),
            email: profile.email.clone(),
            current_level: profile.current_level,
            shield_coins: profile.shield_coins,
            current_streak: profile.current_streak,
            last_login: profile.last_login.clone(),
        }
    }
}

/// Maps an error response to the matching error category
pub fn error_for_status(status: u16, message: String) -> AppError {
    match status {
        400 => AppError::InvalidInput(message),
        401 => AppError::Unauthorized(message),
        404 => AppError::NotFound(message),
        409 => AppError::Conflict(message),
        _ => AppError::UpstreamFailure(message),
    }
}

/// True when `token` carries an `exp` claim still in the future.
/// The signature is not checked; only the server can do that. `exp` is
/// required by the default `required_spec_claims`.
pub fn token_is_live(token: &str) -> bool {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    validation.leeway = 0;

    decode::<serde_json::Value>(token, &DecodingKey::from_secret(&[]), &validation).is_ok()
}

pub struct ScamuraiClient<S: SessionStore> {
    base_url: String,
    http: reqwest::Client,
    sessions: S,
}

impl<S: SessionStore> ScamuraiClient<S> {
    pub fn new(base_url: impl Into<String>, sessions: S) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            sessions,
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.sessions.load()
    }

    /// Route guard: a session exists and its token has not expired.
    /// An expired session is cleared.
    pub fn is_authenticated(&self) -> bool {
        match self.sessions.load() {
            Some(session) if token_is_live(&session.token) => true,
            Some(_) => {
                log::debug!("🔒 Stored session expired, clearing it");
                self.invalidate();
                false
            }
            None => false,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn invalidate(&self) {
        if let Err(e) = self.sessions.clear() {
            log::warn!("⚠️  Failed to clear session: {}", e);
        }
    }

    fn store_session(&self, session: &Session) -> Result<(), AppError> {
        self.sessions
            .save(session)
            .map_err(|e| AppError::UpstreamFailure(format!("Failed to store session: {}", e)))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        authenticated: bool,
    ) -> Result<T, AppError> {
        let request = if authenticated {
            let session = self
                .sessions
                .load()
                .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;
            request.bearer_auth(session.token)
        } else {
            request
        };

        let response = request
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Could not reach the server: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            if authenticated && status.as_u16() == 401 {
                self.invalidate();
            }
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body["error"]
                .as_str()
                .or_else(|| body["message"].as_str())
                .unwrap_or("Request failed")
                .to_string();
            return Err(error_for_status(status.as_u16(), message));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Unexpected response: {}", e)))
    }

    /// Creates an account and starts a session with the returned token
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> Result<Session, AppError> {
        let reply: SignupReply = self
            .send(
                self.http.post(self.url("/signup")).json(&serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": password,
                })),
                false,
            )
            .await?;

        // Seed the session with the token, then fill the snapshot from /profile
        self.store_session(&Session {
            token: reply.token,
            user: UserSummary {
                id: String::new(),
                username: username.to_string(),
                email: email.to_string(),
                current_level: 1,
                shield_coins: 0,
                current_streak: 0,
                last_login: None,
            },
        })?;
        self.profile().await?;

        self.sessions
            .load()
            .ok_or_else(|| AppError::Unauthorized("Session lost after signup".to_string()))
    }

    pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> Result<LoginReply, AppError> {
        let reply: LoginReply = self
            .send(
                self.http.post(self.url("/login")).json(&serde_json::json!({
                    "email": email,
                    "password": password,
                    "rememberMe": remember_me,
                })),
                false,
            )
            .await?;

        self.store_session(&Session {
            token: reply.token.clone(),
            user: reply.user.clone(),
        })?;
        Ok(reply)
    }

    /// Always drops the local session, even if the server is unreachable
    pub async fn logout(&self) -> Result<(), AppError> {
        let result: Result<serde_json::Value, AppError> =
            self.send(self.http.post(self.url("/logout")), false).await;
        self.invalidate();
        result.map(|_| ())
    }

    /// Fetches the profile and refreshes the cached snapshot
    pub async fn profile(&self) -> Result<UserProfile, AppError> {
        let reply: ProfileReply = self.send(self.http.get(self.url("/profile")), true).await?;

        if let Some(mut session) = self.sessions.load() {
            session.user = UserSummary::from(&reply.user);
            self.store_session(&session)?;
        }
        Ok(reply.user)
    }

    pub async fn complete_game(&self, game_id: &str, score: f64) -> Result<GameCompletionReply, AppError> {
        let reply: GameCompletionReply = self
            .send(
                self.http.post(self.url("/game/complete")).json(&serde_json::json!({
                    "gameId": game_id,
                    "score": score,
                })),
                true,
            )
            .await?;

        if let Some(mut session) = self.sessions.load() {
            session.user.shield_coins = reply.new_shield_coins;
            self.store_session(&session)?;
        }
        Ok(reply)
    }

    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, AppError> {
        let reply: LeaderboardReply = self.send(self.http.get(self.url("/leaderboard")), true).await?;
        Ok(reply.leaderboard)
    }

    pub async fn chat(&self, message: &str) -> Result<String, AppError> {
        let reply: ChatReply = self
            .send(
                self.http
                    .post(self.url("/chat"))
                    .json(&serde_json::json!({ "message": message })),
                false,
            )
            .await?;
        Ok(reply.reply)
    }
}
