//! Redis implementation of the distributed tier backend.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, RedisResult};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::DistributedBackend;
use crate::error::Result;

// == Redis Backend ==
/// Redis-backed store over a [`ConnectionManager`].
///
/// No I/O happens at construction. The first command creates the manager,
/// which then reconnects on its own after the connection drops.
pub struct RedisBackend {
    client: Client,
    connection: OnceCell<ConnectionManager>,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("addr", &self.client.get_connection_info().addr)
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

impl RedisBackend {
    /// Parses `url` without connecting.
    pub fn open(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> RedisResult<ConnectionManager> {
        self.connection
            .get_or_try_init(|| async {
                debug!("Opening Redis connection manager");
                let manager = ConnectionManager::new(self.client.clone()).await?;
                info!("Redis connection established");
                Ok::<_, redis::RedisError>(manager)
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl DistributedBackend for RedisBackend {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let payload = redis::cmd("GET")
            .arg(key)
            .query_async::<Option<Vec<u8>>>(&mut conn)
            .await?;
        Ok(payload)
    }

    async fn set_with_expiry(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_seconds)
            .arg(payload)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        redis::cmd("DEL").arg(keys).query_async::<i64>(&mut conn).await?;
        Ok(())
    }

    async fn members_of_set(&self, set_key: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let members = redis::cmd("SMEMBERS")
            .arg(set_key)
            .query_async::<Vec<String>>(&mut conn)
            .await?;
        Ok(members)
    }

    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("SADD")
            .arg(set_key)
            .arg(member)
            .query_async::<i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn expire_set(&self, set_key: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("EXPIRE")
            .arg(set_key)
            .arg(ttl_seconds)
            .query_async::<i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn flush_all(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("FLUSHALL").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}
