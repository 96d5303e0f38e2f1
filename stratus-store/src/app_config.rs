use serde::Deserialize;
use std::env;
use stratus_core::rules::BookingRules;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Rate limiting is skipped without Redis.
    pub redis: Option<RedisConfig>,
    /// Booking notifications are only logged without Kafka.
    pub kafka: Option<KafkaConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_rate_limit")]
    pub requests_per_minute: i64,
}

fn default_rate_limit() -> i64 { 100 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_booking_topic")]
    pub booking_topic: String,
}

fn default_booking_topic() -> String { "booking.created".to_string() }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `STRATUS_DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("STRATUS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_sections_and_rule_defaults() {
        let raw = r#"
            [server]
            port = 3000

            [database]
            url = "postgres://localhost/stratus"

            [auth]
            jwt_secret = "secret"
            jwt_expiration_seconds = 3600

            [business_rules]
            pnr_attempts = 3
        "#;
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.redis.is_none());
        assert!(config.kafka.is_none());
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.business_rules.pnr_attempts, 3);
        assert_eq!(config.business_rules.check_in_opens_hours, 24);
        assert_eq!(config.business_rules.currency, "USD");
    }
}
