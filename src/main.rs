use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

use schema_transformer::config::Config;
use schema_transformer::converters::JsonConverter;
use schema_transformer::error::TransformError;
use schema_transformer::logging;
use schema_transformer::readers::{FileReader, HttpXmlReader};
use schema_transformer::service::RuntimeServices;
use schema_transformer::types::DataReader;
use schema_transformer::writers::FileWriter;

#[derive(Parser)]
#[command(name = "schema_transformer")]
#[command(about = "Transforms employer job feeds into schema.org JobPosting records")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform one feed and write the canonical records
    Run {
        /// Feed source: a local .xml/.json file or an http(s) URL
        #[arg(long)]
        source: String,
        /// Destination file for the converted records
        #[arg(long, default_value = "output/job_postings.json")]
        output: String,
    },
}

fn create_reader(source: &str, timeout_seconds: u64) -> Arc<dyn DataReader> {
    if source.starts_with("http://") || source.starts_with("https://") {
        Arc::new(HttpXmlReader::new(timeout_seconds))
    } else {
        Arc::new(FileReader)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Run { source, output } => {
            println!("🔄 Transforming feed {source}...");

            let reader = create_reader(&source, config.visma.timeout_seconds);
            let services =
                RuntimeServices::new(reader, Arc::new(FileWriter), Arc::new(JsonConverter), &config);

            match services.visma().run(&source, &output).await {
                Ok(count) => {
                    info!("Feed run finished");
                    println!("✅ Wrote {count} job postings to {output}");
                }
                Err(TransformError::InvalidGroup(group)) => {
                    // The transform surfaces this as a terminal value; the
                    // decision to halt is made here, not inside the transform.
                    error!("Upstream does not recognize group {}", group);
                    println!("❌ Upstream does not recognize group {group}, nothing written");
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("Feed run failed: {}", e);
                    println!("❌ Feed run failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}
