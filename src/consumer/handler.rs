//! Records and the handler seam.

use std::fmt;

use async_trait::async_trait;

/// Error returned by a handler for a record it could not process.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A record handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

impl ConsumerRecord {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload: payload.into(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl fmt::Display for ConsumerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}@{}", self.topic, self.partition, self.offset)
    }
}

/// Processes records delivered to a consumer.
///
/// Returning `Err` counts the record as failed; the consumer keeps going.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, record: ConsumerRecord) -> Result<(), HandlerError>;
}

/// Handler that only logs what it receives.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHandler;

#[async_trait]
impl MessageHandler for LogHandler {
    async fn handle(&self, record: ConsumerRecord) -> Result<(), HandlerError> {
        tracing::debug!(
            record = %record,
            key = ?record.key,
            bytes = record.payload.len(),
            "Record received"
        );
        Ok(())
    }
}
