pub mod memory_store;
pub mod mongo_store;

pub use memory_store::MemoryUserStore;
pub use mongo_store::MongoUserStore;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime as BsonDateTime;
use mongodb::{Client, Collection, Database};
use std::error::Error;

use crate::models::{LeaderboardEntry, LoginUpdate, NewUser, User, USERS_COLLECTION};
use crate::utils::AppError;

/// Persistence seam for user documents.
///
/// Coin mutations are expressed as increments so implementations can apply
/// them atomically instead of read-modify-write.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new user. Fails with `Conflict` when the email is taken.
    async fn insert(&self, new_user: NewUser) -> Result<User, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, AppError>;

    /// Writes the outcome of a login in one statement, only if `lastLogin`
    /// still equals `expected_last_login`. Returns `false` when another
    /// login got there first.
    async fn record_login(
        &self,
        id: &ObjectId,
        expected_last_login: Option<BsonDateTime>,
        update: &LoginUpdate,
    ) -> Result<bool, AppError>;

    /// Atomically adds `delta` (>= 0) shield coins, returning the new balance
    /// (`None` if the user does not exist). A credit that would overflow the
    /// balance fails with `InvalidInput` and leaves it unchanged.
    async fn add_coins(&self, id: &ObjectId, delta: i64) -> Result<Option<i64>, AppError>;

    /// Users ordered by shield coins (desc), username, id; at most `limit`.
    async fn top_by_coins(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, AppError>;

    /// Cheap round trip used by the health check
    async fn ping(&self) -> Result<(), AppError>;
}

/// Returned when a credit would push a balance past `i64::MAX`
pub(crate) fn balance_overflow() -> AppError {
    AppError::InvalidInput("Shield coin balance limit reached.".to_string())
}

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        let db_name = database_name_from_uri(uri);
        let db = client.database(&db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the unique email index and the leaderboard index
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<mongodb::bson::Document>(USERS_COLLECTION);

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        // A failing unique index means duplicate emails already exist; refuse to start
        users.create_index(email_index).await?;
        log::info!("   ✅ Index ready: users(email) unique");

        let leaderboard_index = IndexModel::builder()
            .keys(doc! { "shieldCoins": -1, "username": 1 })
            .build();

        match users.create_index(leaderboard_index).await {
            Ok(_) => log::info!("   ✅ Index ready: users(shieldCoins, username)"),
            Err(e) => log::debug!("   ℹ️  Leaderboard index not created: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}

/// Extracts the database name from the URI path, defaulting to "scamurai"
fn database_name_from_uri(uri: &str) -> String {
    let without_scheme = uri.split("://").nth(1).unwrap_or(uri);
    without_scheme
        .split_once('/')
        .map(|(_, rest)| rest.split('?').next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or("scamurai")
        .to_string()
}
