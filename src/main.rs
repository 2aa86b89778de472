use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use dramatis::aggregate::ProximityWindow;
use dramatis::config::{Config, ExtractorBackend};
use dramatis::document::HttpFetcher;
use dramatis::entities::EntityExtractor;
use dramatis::pipeline::PeoplePipeline;

/// dramatis: who appears in a document, and where.
///
/// Fetches a text document, finds the people and places it mentions, and
/// counts which places are mentioned near each person.
#[derive(Parser)]
#[command(name = "dramatis", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (POST /get-people)
    Serve {
        /// Port to listen on (default: DRAMATIS_PORT or 8080)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (default: DRAMATIS_BIND or 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Analyze a single document and print the people found
    Extract {
        /// URL of a plain-text document
        url: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Characters a person mention may precede a place by
        #[arg(long)]
        before: Option<usize>,

        /// Characters a person mention may follow a place by
        #[arg(long)]
        after: Option<usize>,
    },

    /// Download the ONNX NER model (~430 MB)
    DownloadModel,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("dramatis=info,tower_http=info")
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            config.require_extractor()?;

            let pipeline = build_pipeline(&config, config.window)?;
            let port = port.unwrap_or(config.port);
            let bind = bind.unwrap_or_else(|| config.bind.clone());

            dramatis::web::run_server(pipeline, port, &bind).await?;
        }

        Commands::Extract {
            url,
            json,
            before,
            after,
        } => {
            let config = Config::load()?;
            config.require_extractor()?;

            let window = ProximityWindow::new(
                before.unwrap_or(config.window.before),
                after.unwrap_or(config.window.after),
            );
            let pipeline = build_pipeline(&config, window)?;

            if !json {
                println!("Analyzing {}...", url);
            }
            let people = pipeline.run(&url).await?;

            if json {
                let out = serde_json::json!({ "URL": url, "people": people });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                dramatis::output::terminal::display_people(&url, &people);
            }
        }

        Commands::DownloadModel => {
            let config = Config::load()?;

            println!("Downloading ONNX NER model...");
            println!("  Source: {}", config.model_repo);
            println!("  Destination: {}", config.model_dir.display());

            dramatis::entities::download::download_model(&config.model_repo, &config.model_dir)
                .await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("Set DRAMATIS_EXTRACTOR=onnx to use it.");
        }
    }

    Ok(())
}

/// Wire the fetcher, the configured extractor and the window together.
fn build_pipeline(config: &Config, window: ProximityWindow) -> Result<PeoplePipeline> {
    let fetcher = HttpFetcher::new(config.fetch_timeout, config.max_document_bytes)?;
    let extractor = create_extractor(config)?;
    Ok(PeoplePipeline::new(Arc::new(fetcher), extractor, window))
}

/// Create an entity extractor based on the configured backend.
fn create_extractor(config: &Config) -> Result<Arc<dyn EntityExtractor>> {
    match config.extractor_backend {
        ExtractorBackend::HuggingFace => {
            info!(url = %config.hf_api_url, "Using Hugging Face inference extractor");
            let extractor = dramatis::entities::huggingface::HuggingFaceExtractor::new(
                &config.hf_api_url,
                config.hf_api_token.clone(),
                dramatis::entities::rate_limiter::RateLimiter::per_second(
                    config.hf_requests_per_second,
                ),
                config.min_score,
            )?;
            Ok(Arc::new(extractor))
        }
        ExtractorBackend::Onnx => {
            info!(dir = %config.model_dir.display(), "Using local ONNX extractor");
            let extractor =
                dramatis::entities::onnx::OnnxExtractor::load(&config.model_dir, config.min_score)?;
            Ok(Arc::new(extractor))
        }
    }
}
