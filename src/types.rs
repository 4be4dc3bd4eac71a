use crate::error::Result;
use crate::schema::JobPosting;

/// Raw feed payload as produced by a reader.
///
/// XML and HTTP sources arrive as an opaque content string; JSON sources
/// arrive already decoded. The variant is chosen by the reader based on the
/// declared source type, never inferred downstream.
#[derive(Debug, Clone)]
pub enum RawPayload {
    /// Decoded JSON mapping.
    Mapping(serde_json::Value),
    /// Raw markup, e.g. an XML feed body.
    Content { content: String },
}

impl RawPayload {
    /// The raw content string, if this payload carries one.
    pub fn content(&self) -> Option<&str> {
        match self {
            RawPayload::Content { content } if !content.is_empty() => Some(content),
            _ => None,
        }
    }
}

/// Source of raw feed data (file, HTTP endpoint, ...).
#[async_trait::async_trait]
pub trait DataReader: Send + Sync {
    /// Read one payload. Transport failures and bad HTTP statuses come back
    /// as `Err`, never as a panic.
    async fn read(&self, source: &str) -> Result<RawPayload>;
}

/// Core trait every feed transform implements.
#[async_trait::async_trait]
pub trait DataTransform: Send + Sync {
    /// Produce zero or more canonical records from one payload. Batch-level
    /// problems other than a terminal upstream rejection are logged and
    /// yield an empty list.
    async fn transform(&self, payload: &RawPayload) -> Result<Vec<JobPosting>>;
}

/// Shapes the transformed records for the writer.
pub trait DataConverter: Send + Sync {
    fn convert(&self, records: &[JobPosting]) -> Result<String>;
}

/// Final persistence step.
#[async_trait::async_trait]
pub trait DataWriter: Send + Sync {
    async fn write(&self, destination: &str, data: &str) -> Result<()>;
}
