use crate::database::UserStore;
use crate::models::LeaderboardEntry;
use crate::utils::AppError;

/// The leaderboard never lists more players than this
pub const MAX_LEADERBOARD_SIZE: i64 = 10;

/// Top `limit` users by shield coins, capped at `MAX_LEADERBOARD_SIZE`.
/// Ties are broken by username, then by id, so the order is reproducible
/// across calls.
pub async fn top_players(store: &dyn UserStore, limit: i64) -> Result<Vec<LeaderboardEntry>, AppError> {
    let entries = store.top_by_coins(limit.clamp(0, MAX_LEADERBOARD_SIZE)).await?;
    log::debug!("🏆 Leaderboard computed: {} entries", entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryUserStore;
    use crate::models::NewUser;

    #[tokio::test]
    async fn test_leaderboard_properties() {
        let store = MemoryUserStore::new();
        for i in 0..15 {
            let user = store
                .insert(NewUser {
                    username: format!("player{:02}", i),
                    email: format!("p{}@example.com", i),
                    password_hash: "secret-hash".to_string(),
                })
                .await
                .unwrap();
            store.add_coins(&user.id.unwrap(), (i % 4) * 10).await.unwrap();
        }

        let top = top_players(&store, 10).await.unwrap();
        assert_eq!(top.len(), 10);
        assert_eq!(top_players(&store, 50).await.unwrap().len(), 10);
        assert!(top.windows(2).all(|w| w[0].shield_coins >= w[1].shield_coins));
        assert_eq!(top[0].shield_coins, 30);

        let json = serde_json::to_string(&top).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("email"));

        // Same input, same order
        assert_eq!(top, top_players(&store, 10).await.unwrap());
    }

    #[tokio::test]
    async fn test_leaderboard_with_few_users() {
        let store = MemoryUserStore::new();
        store
            .insert(NewUser {
                username: "solo".to_string(),
                email: "solo@example.com".to_string(),
                password_hash: "x".to_string(),
            })
            .await
            .unwrap();

        let top = top_players(&store, 10).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].current_level, 1);
    }
}
