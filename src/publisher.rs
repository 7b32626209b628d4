//! Sidecar Publisher
//!
//! Delivers canonical swap events to the local Dapr pub/sub sidecar as
//! Avro-binary HTTP POSTs. There is deliberately no retry or dead-letter
//! handling here: a failed publish is reported to the caller, which decides
//! whether to drop, retry, or escalate.

use async_trait::async_trait;
use thiserror::Error;

use crate::avro::{CodecError, SwapEventCodec};
use crate::config::Config;
use crate::events::SwapEvent;

/// Content type of the publish body.
pub const AVRO_CONTENT_TYPE: &str = "application/avro-binary";

/// Errors that can occur during publishing.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] CodecError),

    #[error("publish request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sidecar rejected publish with status {0}")]
    Rejected(reqwest::StatusCode),
}

/// Where events go: the seam between the ingestion loop and the concrete
/// delivery mechanism.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one event. Success means the downstream endpoint accepted it.
    async fn publish(&self, event: &SwapEvent) -> Result<(), PublishError>;
}

/// Dapr sidecar publisher for swap events.
#[derive(Debug)]
pub struct Publisher {
    http: reqwest::Client,
    endpoint: String,
    codec: SwapEventCodec,
}

impl Publisher {
    /// Create a publisher targeting the configured sidecar topic.
    pub fn new(config: &Config, codec: SwapEventCodec) -> Self {
        Self::with_endpoint(
            publish_endpoint(&config.dapr_http_port, &config.pubsub_name, &config.topic_name),
            codec,
        )
    }

    /// Create a publisher with an explicit endpoint URL. Used by tests that
    /// point at a local stand-in for the sidecar.
    pub fn with_endpoint(endpoint: impl Into<String>, codec: SwapEventCodec) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            codec,
        }
    }

    /// The publish endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EventSink for Publisher {
    async fn publish(&self, event: &SwapEvent) -> Result<(), PublishError> {
        let body = self.codec.encode(event)?;

        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, AVRO_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 300 {
            return Err(PublishError::Rejected(status));
        }
        Ok(())
    }
}

/// Build the sidecar publish URL for a pub/sub component and topic.
pub fn publish_endpoint(dapr_http_port: &str, pubsub_name: &str, topic_name: &str) -> String {
    format!("http://localhost:{dapr_http_port}/v1.0/publish/{pubsub_name}/{topic_name}")
}
