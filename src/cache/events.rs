use crate::cache::CacheService;
use redis::AsyncCommands;
use tracing::debug;

// Список опубликованных событий без фильтров - самый горячий запрос
const PUBLIC_EVENTS_KEY: &str = "events:public";
const PUBLIC_EVENTS_TTL: u64 = 300;

impl CacheService {
    /// Готовый JSON списка публичных событий, если он в кеше
    pub async fn get_cached_events(&self) -> Option<String> {
        let mut conn = self.conn();
        match conn.get::<_, Option<String>>(PUBLIC_EVENTS_KEY).await {
            Ok(value) => value,
            Err(e) => {
                debug!("events cache read failed: {:?}", e);
                None
            }
        }
    }

    /// Сохранить сериализованный список событий
    pub async fn cache_events(&self, json: &str) {
        let mut conn = self.conn();
        if let Err(e) = conn
            .set_ex::<_, _, ()>(PUBLIC_EVENTS_KEY, json, PUBLIC_EVENTS_TTL)
            .await
        {
            debug!("events cache write failed: {:?}", e);
        }
    }

    /// Сбросить кеш после любой мутации событий или регистраций
    pub async fn invalidate_events(&self) {
        let mut conn = self.conn();
        if let Err(e) = conn.del::<_, ()>(PUBLIC_EVENTS_KEY).await {
            debug!("events cache invalidation failed: {:?}", e);
        }
    }
}
