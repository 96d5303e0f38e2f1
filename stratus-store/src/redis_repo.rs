use redis::RedisResult;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

/// Creates the counter with its expiry only when absent, then counts the hit.
/// Later hits in the window never touch the TTL.
fn window_counter(key: &str, window_seconds: i64) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .cmd("SET")
        .arg(key)
        .arg(0)
        .arg("EX")
        .arg(window_seconds)
        .arg("NX")
        .ignore()
        .incr(key, 1);
    pipe
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter. Returns `false` once `key` has been hit more than
    /// `limit` times in the current window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = window_counter(key, window_seconds).query_async(&mut conn).await?;

        Ok(count <= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_window_expiry_is_set_once() {
        let packed = window_counter("rl:10.0.0.1", 60).get_packed_pipeline();

        assert!(contains(&packed, b"SET"));
        assert!(contains(&packed, b"NX"));
        assert!(contains(&packed, b"INCR"));
        assert!(!contains(&packed, b"EXPIRE"));
    }

    #[tokio::test]
    #[ignore = "needs a Redis server at REDIS_URL"]
    async fn test_window_does_not_slide() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let client = RedisClient::new(&url).await.unwrap();
        let key = format!("rl:test:{}", uuid::Uuid::new_v4());

        assert!(client.check_rate_limit(&key, 2, 2).await.unwrap());
        assert!(client.check_rate_limit(&key, 2, 2).await.unwrap());
        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
        assert!(!client.check_rate_limit(&key, 2, 2).await.unwrap());

        // Hits inside the window must not push the reset out.
        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
        assert!(client.check_rate_limit(&key, 2, 2).await.unwrap());
    }
}
