use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use stratus_api::{app, AppState, AuthConfig};
use stratus_catalog::ConfiguredPromotions;
use stratus_core::notify::BookingNotifier;
use stratus_store::{app_config::Config, DbClient, EventProducer, KafkaNotifier, RedisClient, TracingNotifier};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stratus_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Stratus API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let notifier: Arc<dyn BookingNotifier> = match &config.kafka {
        Some(kafka) => {
            let producer = EventProducer::new(&kafka.brokers).context("Failed to create Kafka producer")?;
            Arc::new(KafkaNotifier::new(producer, kafka.booking_topic.clone()))
        }
        None => {
            tracing::warn!("No Kafka brokers configured; booking notifications are only logged");
            Arc::new(TracingNotifier)
        }
    };

    let promotions = Arc::new(ConfiguredPromotions::new(config.business_rules.promotions.clone()));

    let mut app_state = AppState::new(
        db.repositories(),
        promotions,
        notifier,
        config.business_rules.clone(),
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    );

    if let Some(redis) = &config.redis {
        let client = RedisClient::new(&redis.url)
            .await
            .context("Failed to create Redis client")?;
        app_state = app_state.with_rate_limit(Arc::new(client), redis.requests_per_minute);
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
