//! Session management using Redis
//!
//! One session per user, stored under `session:{user_id}` with the current
//! refresh token as its value. The api service treats a missing key as a
//! signed-out user.

use anyhow::Result;
use common::cache::{RedisPool, session_key};
use tracing::info;
use uuid::Uuid;

/// Session manager for handling user sessions in Redis
#[derive(Clone)]
pub struct SessionManager {
    redis_pool: RedisPool,
    ttl_seconds: u64,
}

impl SessionManager {
    /// Create a new session manager; sessions live as long as a refresh token
    pub fn new(redis_pool: RedisPool, ttl_seconds: u64) -> Self {
        Self {
            redis_pool,
            ttl_seconds,
        }
    }

    /// Create or replace the session for a user
    pub async fn store_session(&self, user_id: Uuid, refresh_token: &str) -> Result<()> {
        info!("Storing session for user: {}", user_id);

        self.redis_pool
            .set(&session_key(user_id), refresh_token, Some(self.ttl_seconds))
            .await
    }

    /// Whether the given refresh token is the user's current one
    pub async fn is_session_valid(&self, user_id: Uuid, refresh_token: &str) -> Result<bool> {
        let stored = self.redis_pool.get(&session_key(user_id)).await?;
        Ok(stored.as_deref() == Some(refresh_token))
    }

    /// Delete the session for a user
    pub async fn delete_session(&self, user_id: Uuid) -> Result<()> {
        info!("Deleting session for user: {}", user_id);

        self.redis_pool.delete(&session_key(user_id)).await
    }

    /// Get Redis health status
    pub async fn health_check(&self) -> Result<bool> {
        self.redis_pool.health_check().await
    }
}
