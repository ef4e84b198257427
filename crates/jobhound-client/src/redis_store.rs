use std::time::Duration;

use jobhound_core::error::AppError;
use jobhound_core::traits::KeyValueStore;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// How long `connect` waits for the initial PING.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// [`KeyValueStore`] backed by Redis `GET` / `SET EX`.
///
/// The connection manager reconnects on its own, and clones share it.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect and verify the server answers a PING.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(url).map_err(cache_error)?;

        let connect = async {
            let mut conn = client.get_connection_manager().await?;
            let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(conn)
        };

        let conn = tokio::time::timeout(CONNECT_TIMEOUT, connect)
            .await
            .map_err(|_| {
                AppError::CacheError(format!(
                    "Redis did not answer within {}s",
                    CONNECT_TIMEOUT.as_secs()
                ))
            })?
            .map_err(cache_error)?;

        tracing::debug!("Connected to Redis");
        Ok(Self { conn })
    }
}

impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(cache_error)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        // Redis rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(cache_error)
    }
}

fn cache_error(e: redis::RedisError) -> AppError {
    AppError::CacheError(e.to_string())
}
