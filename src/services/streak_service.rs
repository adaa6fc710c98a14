// ==================== LOGIN STREAK & REWARDS ====================
// Decides the new streak and the shield-coin bonus for each login,
// comparing calendar days (not 24h windows) in a configured timezone.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::database::UserStore;
use crate::models::{chrono_to_bson, LoginUpdate, User};
use crate::utils::AppError;

/// Flat bonus for a first login or a login after a broken streak
pub const BASE_LOGIN_BONUS: i64 = 20;
/// Extra coins per streak day on consecutive-day logins
pub const STREAK_BONUS_PER_DAY: i64 = 2;

const MAX_LOGIN_ATTEMPTS: usize = 3;

/// Timezone in which calendar days are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBoundary {
    Utc,
    /// Server process timezone
    Local,
    Fixed(FixedOffset),
}

impl DayBoundary {
    pub fn calendar_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        match self {
            DayBoundary::Utc => ts.date_naive(),
            DayBoundary::Local => ts.with_timezone(&chrono::Local).date_naive(),
            DayBoundary::Fixed(offset) => ts.with_timezone(offset).date_naive(),
        }
    }
}

impl FromStr for DayBoundary {
    type Err = String;

    /// Accepts `utc`, `local`, or a fixed offset such as `+05:30` / `-08:00`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        match raw.to_lowercase().as_str() {
            "utc" | "z" => return Ok(DayBoundary::Utc),
            "local" => return Ok(DayBoundary::Local),
            _ => {}
        }

        let invalid = || format!("Invalid DAY_BOUNDARY '{}': expected utc, local or ±HH:MM", raw);

        let (sign, rest) = match raw.chars().next() {
            Some('+') => (1, &raw[1..]),
            Some('-') => (-1, &raw[1..]),
            _ => return Err(invalid()),
        };
        let (hours, minutes) = match rest.split_once(':') {
            Some((h, m)) => (h, m),
            None => (rest, "0"),
        };
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
            return Err(invalid());
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(DayBoundary::Fixed)
            .ok_or_else(invalid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoginOutcome {
    FirstLogin,
    ConsecutiveDay,
    StreakReset,
    SameDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginReward {
    pub outcome: LoginOutcome,
    pub current_streak: i64,
    pub coins_awarded: i64,
}

/// Streak-related state read from a user before a login
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreakState {
    pub current_streak: i64,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for StreakState {
    fn from(user: &User) -> Self {
        StreakState {
            current_streak: user.current_streak,
            last_login: user.last_login_utc(),
        }
    }
}

/// Computes the streak and bonus for a login at `now`.
///
/// A second login on the same calendar day (or a `last_login` in the
/// future) leaves streak and coins untouched.
pub fn apply_login_activity(state: &StreakState, now: DateTime<Utc>, boundary: DayBoundary) -> LoginReward {
    let last_login = match state.last_login {
        Some(ts) => ts,
        None => {
            return LoginReward {
                outcome: LoginOutcome::FirstLogin,
                current_streak: 1,
                coins_awarded: BASE_LOGIN_BONUS,
            }
        }
    };

    let today = boundary.calendar_date(now);
    let last_day = boundary.calendar_date(last_login);
    let diff_days = (today - last_day).num_days();

    match diff_days {
        1 => {
            let streak = state.current_streak + 1;
            LoginReward {
                outcome: LoginOutcome::ConsecutiveDay,
                current_streak: streak,
                coins_awarded: BASE_LOGIN_BONUS + STREAK_BONUS_PER_DAY * streak,
            }
        }
        d if d > 1 => LoginReward {
            outcome: LoginOutcome::StreakReset,
            current_streak: 1,
            coins_awarded: BASE_LOGIN_BONUS,
        },
        _ => LoginReward {
            outcome: LoginOutcome::SameDay,
            current_streak: state.current_streak,
            coins_awarded: 0,
        },
    }
}

/// Applies the login reward to `user` and persists it in a single write.
///
/// The write is conditional on `lastLogin` being unchanged since the user was
/// read; if a concurrent login won, the user is re-read and the reward
/// recomputed against the fresh state.
pub async fn record_login_activity(
    store: &dyn UserStore,
    user: User,
    now: DateTime<Utc>,
    boundary: DayBoundary,
) -> Result<(User, LoginReward), AppError> {
    let id = user
        .id
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;
    let mut current = user;

    for attempt in 1..=MAX_LOGIN_ATTEMPTS {
        let reward = apply_login_activity(&StreakState::from(&current), now, boundary);
        let update = LoginUpdate {
            current_streak: reward.current_streak,
            coins_awarded: reward.coins_awarded,
            last_login: chrono_to_bson(now),
        };

        if store.record_login(&id, current.last_login, &update).await? {
            current.current_streak = update.current_streak;
            current.shield_coins += update.coins_awarded;
            current.last_login = Some(update.last_login);
            current.updated_at = update.last_login;

            log::debug!(
                "🔥 Login recorded for {}: {:?}, streak {}, +{} coins",
                current.email,
                reward.outcome,
                reward.current_streak,
                reward.coins_awarded
            );
            return Ok((current, reward));
        }

        log::warn!(
            "⚠️  Concurrent login detected for {} (attempt {}/{})",
            current.email,
            attempt,
            MAX_LOGIN_ATTEMPTS
        );
        current = store
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;
    }

    Err(AppError::Conflict(
        "Login could not be recorded because of concurrent updates. Please retry.".to_string(),
    ))
}
