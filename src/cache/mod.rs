use crate::redis_client::RedisClient;
use tracing::{info, warn};

pub mod events;

#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
}

impl CacheService {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    pub(crate) fn conn(&self) -> redis::aio::MultiplexedConnection {
        self.redis.conn.clone()
    }

    // Прогрев при старте: проверяем соединение и сбрасываем устаревший список
    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");

        let mut conn = self.conn();
        let ping: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        if let Err(e) = ping {
            warn!("Redis ping failed during warmup: {:?}", e);
            return;
        }

        self.invalidate_events().await;
        info!("Cache warmup done");
    }
}
