use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use tokio::sync::RwLock;

use super::{balance_overflow, UserStore};
use crate::models::{LeaderboardEntry, LoginUpdate, NewUser, User};
use crate::utils::AppError;

/// In-process `UserStore`. Keeps insertion order and applies every
/// mutation under one write lock, so increments are atomic here too.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == new_user.email) {
            return Err(AppError::Conflict("User already exists with this email.".to_string()));
        }

        let mut user = User::from_new(new_user, BsonDateTime::now());
        user.id = Some(ObjectId::new());
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.trim().to_lowercase();
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id.as_ref() == Some(id)).cloned())
    }

    async fn record_login(
        &self,
        id: &ObjectId,
        expected_last_login: Option<BsonDateTime>,
        update: &LoginUpdate,
    ) -> Result<bool, AppError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id.as_ref() == Some(id) && u.last_login == expected_last_login);

        match user {
            Some(user) => {
                user.shield_coins = user
                    .shield_coins
                    .checked_add(update.coins_awarded)
                    .ok_or_else(balance_overflow)?;
                user.current_streak = update.current_streak;
                user.last_login = Some(update.last_login);
                user.updated_at = update.last_login;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_coins(&self, id: &ObjectId, delta: i64) -> Result<Option<i64>, AppError> {
        let mut users = self.users.write().await;
        let user = match users.iter_mut().find(|u| u.id.as_ref() == Some(id)) {
            Some(user) => user,
            None => return Ok(None),
        };

        user.shield_coins = user.shield_coins.checked_add(delta).ok_or_else(balance_overflow)?;
        user.updated_at = BsonDateTime::now();
        Ok(Some(user.shield_coins))
    }

    async fn top_by_coins(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, AppError> {
        let users = self.users.read().await;
        let mut ranked: Vec<&User> = users.iter().collect();
        ranked.sort_by(|a, b| {
            b.shield_coins
                .cmp(&a.shield_coins)
                .then_with(|| a.username.cmp(&b.username))
                .then_with(|| a.id.cmp(&b.id))
        });

        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(ranked.into_iter().take(limit).map(LeaderboardEntry::from).collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.insert(new_user("a", "a@example.com")).await.unwrap();

        let err = store.insert(new_user("b", "a@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_find_by_email_normalises_input() {
        let store = MemoryUserStore::new();
        store.insert(new_user("a", "a@example.com")).await.unwrap();

        let found = store.find_by_email("  A@Example.COM ").await.unwrap();
        assert_eq!(found.map(|u| u.username), Some("a".to_string()));
    }

    #[tokio::test]
    async fn test_record_login_is_conditional() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("a", "a@example.com")).await.unwrap();
        let id = user.id.unwrap();
        let update = LoginUpdate {
            current_streak: 1,
            coins_awarded: 20,
            last_login: BsonDateTime::from_millis(1_000),
        };

        assert!(store.record_login(&id, None, &update).await.unwrap());
        // Second writer still believes lastLogin is null
        assert!(!store.record_login(&id, None, &update).await.unwrap());

        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.shield_coins, 20);
        assert_eq!(stored.current_streak, 1);
        assert_eq!(stored.last_login, Some(BsonDateTime::from_millis(1_000)));
    }

    #[tokio::test]
    async fn test_add_coins_unknown_user() {
        let store = MemoryUserStore::new();
        assert_eq!(store.add_coins(&ObjectId::new(), 5).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_credits_refuse_to_overflow_balance() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("a", "a@example.com")).await.unwrap();
        let id = user.id.unwrap();

        assert_eq!(store.add_coins(&id, i64::MAX - 10).await.unwrap(), Some(i64::MAX - 10));
        let err = store.add_coins(&id, 11).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let update = LoginUpdate {
            current_streak: 1,
            coins_awarded: 20,
            last_login: BsonDateTime::from_millis(1_000),
        };
        let err = store.record_login(&id, None, &update).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.shield_coins, i64::MAX - 10);
        assert_eq!(stored.current_streak, 0);
        assert!(stored.last_login.is_none());
    }

    #[tokio::test]
    async fn test_top_by_coins_orders_and_limits() {
        let store = MemoryUserStore::new();
        for (i, coins) in [5, 40, 40, 0, 12].iter().enumerate() {
            let name = format!("user{}", 4 - i);
            let user = store
                .insert(new_user(&name, &format!("{}@example.com", name)))
                .await
                .unwrap();
            store.add_coins(&user.id.unwrap(), *coins).await.unwrap();
        }

        let top = store.top_by_coins(3).await.unwrap();
        let names: Vec<&str> = top.iter().map(|e| e.username.as_str()).collect();
        // Ties on 40 coins fall back to username order
        assert_eq!(names, vec!["user2", "user3", "user0"]);
    }
}
