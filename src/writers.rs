use crate::error::Result;
use crate::types::DataWriter;
use std::path::Path;
use tracing::info;

/// Writes converted output to a local file, creating parent directories as
/// needed.
pub struct FileWriter;

#[async_trait::async_trait]
impl DataWriter for FileWriter {
    async fn write(&self, destination: &str, data: &str) -> Result<()> {
        if let Some(parent) = Path::new(destination).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(destination, data).await?;
        info!("Wrote {} bytes to {}", data.len(), destination);
        Ok(())
    }
}
