use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;
use mongodb::Collection;

use super::{balance_overflow, MongoDB, UserStore};
use crate::models::{LeaderboardEntry, LoginUpdate, NewUser, User, USERS_COLLECTION};
use crate::utils::AppError;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// `UserStore` backed by the `users` collection
#[derive(Clone)]
pub struct MongoUserStore {
    users: Collection<User>,
}

impl MongoUserStore {
    pub fn new(db: &MongoDB) -> Self {
        Self {
            users: db.collection::<User>(USERS_COLLECTION),
        }
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY_CODE
    )
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, AppError> {
        if self.find_by_email(&new_user.email).await?.is_some() {
            return Err(AppError::Conflict("User already exists with this email.".to_string()));
        }

        let mut user = User::from_new(new_user, BsonDateTime::now());

        // The unique index still catches two signups racing past the check above
        let result = self.users.insert_one(&user).await.map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::Conflict("User already exists with this email.".to_string())
            } else {
                AppError::Database(format!("Failed to create user: {}", e))
            }
        })?;

        user.id = result.inserted_id.as_object_id();
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = self
            .users
            .find_one(doc! { "email": email.trim().to_lowercase() })
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, AppError> {
        let user = self.users.find_one(doc! { "_id": id }).await?;
        Ok(user)
    }

    async fn record_login(
        &self,
        id: &ObjectId,
        expected_last_login: Option<BsonDateTime>,
        update: &LoginUpdate,
    ) -> Result<bool, AppError> {
        let expected = match expected_last_login {
            Some(dt) => Bson::DateTime(dt),
            None => Bson::Null,
        };

        let ceiling = i64::MAX - update.coins_awarded.max(0);
        let result = self
            .users
            .update_one(
                doc! {
                    "_id": id,
                    "lastLogin": expected.clone(),
                    "shieldCoins": { "$lte": ceiling },
                },
                doc! {
                    "$set": {
                        "currentStreak": update.current_streak,
                        "lastLogin": update.last_login,
                        "updatedAt": update.last_login,
                    },
                    "$inc": { "shieldCoins": update.coins_awarded },
                },
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to record login: {}", e)))?;

        if result.matched_count > 0 {
            return Ok(true);
        }

        // Unmatched: either another login won, or the balance guard refused the credit
        let unchanged = self
            .users
            .find_one(doc! { "_id": id, "lastLogin": expected })
            .await?;
        match unchanged {
            Some(_) => Err(balance_overflow()),
            None => Ok(false),
        }
    }

    async fn add_coins(&self, id: &ObjectId, delta: i64) -> Result<Option<i64>, AppError> {
        let ceiling = i64::MAX - delta.max(0);
        let updated = self
            .users
            .find_one_and_update(
                doc! { "_id": id, "shieldCoins": { "$lte": ceiling } },
                doc! {
                    "$inc": { "shieldCoins": delta },
                    "$set": { "updatedAt": BsonDateTime::now() },
                },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update shield coins: {}", e)))?;

        match updated {
            Some(user) => Ok(Some(user.shield_coins)),
            None => match self.find_by_id(id).await? {
                Some(_) => Err(balance_overflow()),
                None => Ok(None),
            },
        }
    }

    async fn top_by_coins(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, AppError> {
        let cursor = self
            .users
            .clone_with_type::<LeaderboardEntry>()
            .find(doc! {})
            .projection(doc! { "_id": 0, "username": 1, "shieldCoins": 1, "currentLevel": 1 })
            .sort(doc! { "shieldCoins": -1, "username": 1, "_id": 1 })
            .limit(limit)
            .await?;

        let entries: Vec<LeaderboardEntry> = cursor.try_collect().await?;
        Ok(entries)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.users.estimated_document_count().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> MongoUserStore {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/scamurai_test".to_string());
        let db = MongoDB::new(&uri).await.expect("MongoDB must be running");
        MongoUserStore::new(&db)
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_duplicate_email_conflicts() {
        let store = test_store().await;
        let email = format!("{}@example.com", uuid::Uuid::new_v4());
        let new_user = NewUser {
            username: "dup".to_string(),
            email: email.clone(),
            password_hash: "x".to_string(),
        };

        assert!(store.insert(new_user.clone()).await.is_ok());
        let err = store.insert(new_user).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_add_coins_is_incremental() {
        let store = test_store().await;
        let user = store
            .insert(NewUser {
                username: "coins".to_string(),
                email: format!("{}@example.com", uuid::Uuid::new_v4()),
                password_hash: "x".to_string(),
            })
            .await
            .unwrap();
        let id = user.id.unwrap();

        assert_eq!(store.add_coins(&id, 3).await.unwrap(), Some(3));
        assert_eq!(store.add_coins(&id, 4).await.unwrap(), Some(7));
    }
}
