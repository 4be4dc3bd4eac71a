use crate::constants;
use crate::error::{Result, TransformError};
use crate::types::{DataReader, RawPayload};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error};

/// Reads feed payloads from local files.
///
/// The payload variant is decided by the source's extension: `.xml` files
/// are wrapped as raw content, everything else is decoded as JSON.
pub struct FileReader;

#[async_trait::async_trait]
impl DataReader for FileReader {
    async fn read(&self, source: &str) -> Result<RawPayload> {
        let text = tokio::fs::read_to_string(source).await?;

        let extension = Path::new(source)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if extension == "xml" {
            debug!("Read {} bytes of XML from {}", text.len(), source);
            Ok(RawPayload::Content { content: text })
        } else {
            let mapping = serde_json::from_str(&text)?;
            debug!("Decoded JSON payload from {}", source);
            Ok(RawPayload::Mapping(mapping))
        }
    }
}

/// Fetches XML payloads over HTTP.
///
/// Used both for the top-level feed and for per-assignment detail fetches.
/// Transport errors and statuses >= 400 are logged and surfaced as `Err`;
/// nothing ever panics past this boundary.
pub struct HttpXmlReader {
    client: reqwest::Client,
}

impl HttpXmlReader {
    pub fn new(timeout_seconds: u64) -> Self {
        Self::with_headers(timeout_seconds, HeaderMap::new())
    }

    /// Extra headers are merged on top of the default `Accept` header.
    pub fn with_headers(timeout_seconds: u64, extra_headers: HeaderMap) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/xml"));
        headers.extend(extra_headers);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(timeout_seconds))
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

impl Default for HttpXmlReader {
    fn default() -> Self {
        Self::new(constants::DEFAULT_TIMEOUT_SECONDS)
    }
}

#[async_trait::async_trait]
impl DataReader for HttpXmlReader {
    async fn read(&self, source: &str) -> Result<RawPayload> {
        let response = match self.client.get(source).send().await {
            Ok(r) => r,
            Err(e) => {
                error!("HTTP request error for {}: {}", source, e);
                return Err(TransformError::Http(e));
            }
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            error!("HTTP error {} for {}", status.as_u16(), source);
            return Err(TransformError::Status {
                status: status.as_u16(),
                url: source.to_string(),
            });
        }

        let content = response.text().await?;
        Ok(RawPayload::Content { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn xml_extension_yields_raw_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.xml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "<Assignments/>").unwrap();

        let payload = FileReader.read(path.to_str().unwrap()).await.unwrap();
        match payload {
            RawPayload::Content { content } => assert_eq!(content, "<Assignments/>"),
            RawPayload::Mapping(_) => panic!("expected raw content for .xml source"),
        }
    }

    #[tokio::test]
    async fn other_extensions_decode_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"jobs": []}}"#).unwrap();

        let payload = FileReader.read(path.to_str().unwrap()).await.unwrap();
        match payload {
            RawPayload::Mapping(value) => assert!(value.get("jobs").is_some()),
            RawPayload::Content { .. } => panic!("expected decoded mapping for .json source"),
        }
    }

    #[tokio::test]
    async fn missing_file_is_an_error_value() {
        let result = FileReader.read("/nonexistent/feed.xml").await;
        assert!(result.is_err());
    }
}
