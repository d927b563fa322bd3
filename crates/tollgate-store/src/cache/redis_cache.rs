//! Redis cache backend.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::{ttl_millis, Cache};
use crate::error::{CacheError, CacheResult};

/// Atomic GET + DEL. Returns the value if the key existed.
const TAKE_SCRIPT: &str = r"
local val = redis.call('GET', KEYS[1])
if val then
    redis.call('DEL', KEYS[1])
end
return val
";

/// A cache backed by a shared Redis instance.
///
/// Each operation clones the multiplexed connection handle and is bounded by
/// the configured deadline. A missed deadline is reported as
/// [`CacheError::Timeout`].
#[derive(Clone)]
pub struct RedisCache {
    con: MultiplexedConnection,
    take_script: redis::Script,
    op_timeout: Duration,
}

impl RedisCache {
    /// Connect to Redis at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection cannot be
    /// established within `op_timeout`.
    pub async fn connect(url: &str, op_timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let con = tokio::time::timeout(op_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Timeout(op_timeout))??;

        Ok(Self {
            con,
            take_script: redis::Script::new(TAKE_SCRIPT),
            op_timeout,
        })
    }

    /// Run one Redis round-trip under the operation deadline.
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>> + Send,
    {
        if let Ok(result) = tokio::time::timeout(self.op_timeout, fut).await {
            result.map_err(|e| {
                tracing::error!(op, error = %e, "Redis command failed");
                CacheError::from(e)
            })
        } else {
            tracing::error!(
                op,
                timeout_ms = u64::try_from(self.op_timeout.as_millis()).unwrap_or(u64::MAX),
                "Redis command timed out"
            );
            Err(CacheError::Timeout(self.op_timeout))
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut con = self.con.clone();
        let ms = ttl_millis(ttl);
        self.bounded("set", async move { con.pset_ex::<_, _, ()>(key, value, ms).await })
            .await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        let mut con = self.con.clone();
        let ms = ttl_millis(ttl);
        let reply: Option<String> = self
            .bounded("set_nx", async move {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("PX")
                    .arg(ms)
                    .query_async(&mut con)
                    .await
            })
            .await?;
        Ok(reply.is_some())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut con = self.con.clone();
        self.bounded("exists", async move { con.exists::<_, bool>(key).await })
            .await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut con = self.con.clone();
        self.bounded("del", async move { con.del::<_, ()>(key).await })
            .await
    }

    async fn take(&self, key: &str) -> CacheResult<bool> {
        let mut con = self.con.clone();
        let script = &self.take_script;
        let value: Option<String> = self
            .bounded("take", async move {
                script.key(key).invoke_async(&mut con).await
            })
            .await?;
        Ok(value.is_some())
    }
}
