use chrono::{DateTime, SecondsFormat, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

pub const USERS_COLLECTION: &str = "users";

/// User document (collection: users)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    /// Always stored trimmed and lowercased
    pub email: String,
    /// bcrypt hash
    pub password: String,
    #[serde(default = "default_level")]
    pub current_level: i64,
    #[serde(default)]
    pub shield_coins: i64,
    pub registered: BsonDateTime,
    #[serde(default)]
    pub last_login: Option<BsonDateTime>,
    #[serde(default)]
    pub current_streak: i64,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

fn default_level() -> i64 {
    1
}

/// Validated signup data, ready to be stored
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl User {
    pub fn from_new(new_user: NewUser, now: BsonDateTime) -> Self {
        User {
            id: None,
            username: new_user.username,
            email: new_user.email,
            password: new_user.password_hash,
            current_level: default_level(),
            shield_coins: 0,
            registered: now,
            last_login: None,
            current_streak: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }

    pub fn last_login_utc(&self) -> Option<DateTime<Utc>> {
        self.last_login.and_then(bson_to_chrono)
    }
}

/// Fields written by a single login
#[derive(Debug, Clone, PartialEq)]
pub struct LoginUpdate {
    pub current_streak: i64,
    pub coins_awarded: i64,
    pub last_login: BsonDateTime,
}

/// Public projection used by the leaderboard (no email, no password)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    #[serde(default)]
    pub shield_coins: i64,
    #[serde(default = "default_level")]
    pub current_level: i64,
}

impl From<&User> for LeaderboardEntry {
    fn from(user: &User) -> Self {
        LeaderboardEntry {
            username: user.username.clone(),
            shield_coins: user.shield_coins,
            current_level: user.current_level,
        }
    }
}

/// Profile as returned by GET /profile
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub current_level: i64,
    pub shield_coins: i64,
    pub current_streak: i64,
    pub registered: Option<String>,
    pub last_login: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id_hex(),
            username: user.username.clone(),
            email: user.email.clone(),
            current_level: user.current_level,
            shield_coins: user.shield_coins,
            current_streak: user.current_streak,
            registered: to_rfc3339(user.registered),
            last_login: user.last_login.and_then(to_rfc3339),
            created_at: to_rfc3339(user.created_at),
            updated_at: to_rfc3339(user.updated_at),
        }
    }
}

/// User snapshot returned at login (cached by clients)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
    pub current_level: i64,
    pub shield_coins: i64,
    pub current_streak: i64,
    pub last_login: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id_hex(),
            username: user.username.clone(),
            email: user.email.clone(),
            current_level: user.current_level,
            shield_coins: user.shield_coins,
            current_streak: user.current_streak,
            last_login: user.last_login.and_then(to_rfc3339),
        }
    }
}

pub fn bson_to_chrono(dt: BsonDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis())
}

pub fn chrono_to_bson(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

fn to_rfc3339(dt: BsonDateTime) -> Option<String> {
    bson_to_chrono(dt).map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true))
}
