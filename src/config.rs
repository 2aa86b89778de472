use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::aggregate::ProximityWindow;

/// Which NER backend to use.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractorBackend {
    /// Hugging Face hosted inference (default): requires HF_API_TOKEN
    HuggingFace,
    /// Local ONNX model: no API token, requires `dramatis download-model`
    Onnx,
}

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
pub struct Config {
    pub extractor_backend: ExtractorBackend,
    /// Hugging Face inference endpoint for the NER model
    pub hf_api_url: String,
    pub hf_api_token: String,
    /// Client-side throttle for inference calls; 0 disables it
    pub hf_requests_per_second: f64,
    /// Directory containing the ONNX model files
    pub model_dir: PathBuf,
    /// Where `download-model` pulls the ONNX model from
    pub model_repo: String,
    /// Co-occurrence window around each location mention
    pub window: ProximityWindow,
    /// Entities scored below this are ignored
    pub min_score: f32,
    pub fetch_timeout: Duration,
    pub max_document_bytes: usize,
    pub bind: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the Hugging Face token, which is only
    /// checked by `require_extractor` when that backend is selected.
    pub fn load() -> Result<Self> {
        let extractor_backend = match env::var("DRAMATIS_EXTRACTOR").as_deref() {
            Ok("onnx") => ExtractorBackend::Onnx,
            Ok("huggingface") | Ok("") | Err(_) => ExtractorBackend::HuggingFace,
            Ok(other) => anyhow::bail!(
                "DRAMATIS_EXTRACTOR must be `huggingface` or `onnx`, got `{other}`"
            ),
        };

        let model_dir = env::var("DRAMATIS_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::entities::download::default_model_dir());

        let window = ProximityWindow::new(
            parse_var("DRAMATIS_WINDOW_BEFORE", ProximityWindow::default().before)?,
            parse_var("DRAMATIS_WINDOW_AFTER", ProximityWindow::default().after)?,
        );

        let min_score: f32 = parse_var("DRAMATIS_MIN_SCORE", 0.0)?;
        if !(0.0..=1.0).contains(&min_score) {
            anyhow::bail!("DRAMATIS_MIN_SCORE must be between 0 and 1, got {min_score}");
        }

        Ok(Self {
            extractor_backend,
            hf_api_url: env::var("HF_API_URL")
                .unwrap_or_else(|_| crate::entities::huggingface::DEFAULT_API_URL.to_string()),
            hf_api_token: env::var("HF_API_TOKEN").unwrap_or_default(),
            hf_requests_per_second: parse_var("HF_REQUESTS_PER_SECOND", 5.0)?,
            model_dir,
            model_repo: env::var("DRAMATIS_MODEL_REPO")
                .unwrap_or_else(|_| crate::entities::download::DEFAULT_MODEL_REPO.to_string()),
            window,
            min_score,
            fetch_timeout: Duration::from_secs(parse_var("DRAMATIS_FETCH_TIMEOUT_SECS", 30)?),
            max_document_bytes: parse_var("DRAMATIS_MAX_DOCUMENT_BYTES", 5 * 1024 * 1024)?,
            bind: env::var("DRAMATIS_BIND").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("DRAMATIS_PORT", 8080)?,
        })
    }

    /// Validate that the chosen extractor backend has what it needs.
    /// For Hugging Face: an API token must be set.
    /// For ONNX: model files must exist (or user should run download-model).
    pub fn require_extractor(&self) -> Result<()> {
        match self.extractor_backend {
            ExtractorBackend::HuggingFace => {
                if self.hf_api_token.is_empty() {
                    anyhow::bail!(
                        "HF_API_TOKEN not set. Add it to your .env file.\n\
                         Or set DRAMATIS_EXTRACTOR=onnx to run the model locally."
                    );
                }
                Ok(())
            }
            ExtractorBackend::Onnx => {
                if !crate::entities::download::model_files_present(&self.model_dir) {
                    anyhow::bail!(
                        "ONNX model files not found in {}\n\
                         Run `dramatis download-model` to download them.",
                        self.model_dir.display()
                    );
                }
                Ok(())
            }
        }
    }
}

/// Read an optional env var and parse it, keeping the default when unset.
/// A set-but-malformed value is an error rather than a silent fallback.
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: `{raw}`")),
        _ => Ok(default),
    }
}
