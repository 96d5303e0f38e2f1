use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use stratus_core::notify::BookingNotifier;
use stratus_core::{CoreError, CoreResult};
use stratus_shared::events::BookingCreatedEvent;
use tracing::{error, info};

#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!(
                    "Sent message to {}/{}: partition {} offset {}",
                    topic, key, delivery.partition, delivery.offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }
}

/// Publishes booking confirmations for the e-mail and SMS workers, keyed by PNR.
pub struct KafkaNotifier {
    producer: EventProducer,
    topic: String,
}

impl KafkaNotifier {
    pub fn new(producer: EventProducer, topic: impl Into<String>) -> Self {
        Self {
            producer,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl BookingNotifier for KafkaNotifier {
    async fn booking_created(&self, event: &BookingCreatedEvent) -> CoreResult<()> {
        let payload =
            serde_json::to_string(event).map_err(|e| CoreError::DependencyFailure(e.to_string()))?;
        self.producer
            .publish(&self.topic, &event.pnr, &payload)
            .await
            .map_err(|e| CoreError::DependencyFailure(e.to_string()))
    }
}

/// Stand-in when no broker is configured.
pub struct TracingNotifier;

#[async_trait]
impl BookingNotifier for TracingNotifier {
    async fn booking_created(&self, event: &BookingCreatedEvent) -> CoreResult<()> {
        info!(
            "Booking confirmation for {} ({} legs) via {:?} to {}",
            event.pnr,
            event.flights.len(),
            event.channels,
            event.contact_email
        );
        Ok(())
    }
}
