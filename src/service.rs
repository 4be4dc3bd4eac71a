use crate::config::Config;
use crate::error::Result;
use crate::readers::HttpXmlReader;
use crate::sanitizer::{SanitizeJobPostingLink, Sanitizer};
use crate::transforms::VismaJobPostingTransform;
use crate::types::{DataConverter, DataReader, DataTransform, DataWriter};
use std::sync::Arc;
use tracing::{info, instrument};

/// Sequences one feed run: Reader -> Transform -> Converter -> Writer.
///
/// No business logic lives here; retry policy, if any, belongs to the
/// reader and writer collaborators.
pub struct Service {
    reader: Arc<dyn DataReader>,
    transform: Arc<dyn DataTransform>,
    converter: Arc<dyn DataConverter>,
    writer: Arc<dyn DataWriter>,
}

impl Service {
    pub fn new(
        reader: Arc<dyn DataReader>,
        transform: Arc<dyn DataTransform>,
        converter: Arc<dyn DataConverter>,
        writer: Arc<dyn DataWriter>,
    ) -> Self {
        Self {
            reader,
            transform,
            converter,
            writer,
        }
    }

    /// Runs the full sequence and returns the emitted record count.
    /// A reader failure stops the run before anything is written.
    #[instrument(skip(self))]
    pub async fn run(&self, source: &str, destination: &str) -> Result<usize> {
        let payload = self.reader.read(source).await?;
        let records = self.transform.transform(&payload).await?;
        let converted = self.converter.convert(&records)?;
        self.writer.write(destination, &converted).await?;

        info!("Service run complete: {} records", records.len());
        Ok(records.len())
    }
}

/// Wires the configured feed services from shared I/O collaborators,
/// mirroring how each feed gets its own transform and sanitizer chain.
pub struct RuntimeServices {
    visma: Service,
}

impl RuntimeServices {
    pub fn new(
        reader: Arc<dyn DataReader>,
        writer: Arc<dyn DataWriter>,
        converter: Arc<dyn DataConverter>,
        config: &Config,
    ) -> Self {
        let fetcher = Arc::new(HttpXmlReader::new(config.visma.timeout_seconds));
        let sanitizers: Vec<Box<dyn Sanitizer>> = vec![Box::new(SanitizeJobPostingLink)];

        let transform = VismaJobPostingTransform::new(
            sanitizers,
            config.visma.guid_group.clone(),
            fetcher,
        )
        .with_item_url(config.visma.item_url.clone())
        .with_concurrency(config.visma.concurrency);

        Self {
            visma: Service::new(reader, Arc::new(transform), converter, writer),
        }
    }

    pub fn visma(&self) -> &Service {
        &self.visma
    }
}
