// Hugging Face inference API implementation.
//
// Sends each document chunk to a hosted token-classification model
// (dslim/bert-base-NER by default) and reads back grouped entity spans.
// The API rejects inputs past the model's token limit, so the document is
// chunked first and span offsets are shifted back into document coordinates.
//
// API docs: https://huggingface.co/docs/inference-providers/tasks/token-classification

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::chunk::split_text;
use super::rate_limiter::RateLimiter;
use super::traits::{spans_to_occurrences, EntityExtractor, EntitySpan, Occurrence};

/// Default hosted NER model.
pub const DEFAULT_API_URL: &str =
    "https://router.huggingface.co/hf-inference/models/dslim/bert-base-NER";

/// Chunk size in characters. BERT's 512-token limit is roughly 2000
/// characters of English prose; this leaves headroom for names and numbers
/// that split into many sub-word tokens.
pub const CHUNK_CHARS: usize = 1500;

/// Hugging Face inference API entity extractor.
pub struct HuggingFaceExtractor {
    client: Client,
    api_url: String,
    api_token: String,
    rate_limiter: RateLimiter,
    min_score: f32,
}

impl HuggingFaceExtractor {
    pub fn new(api_url: &str, api_token: String, rate_limiter: RateLimiter, min_score: f32) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("dramatis/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_token,
            rate_limiter,
            min_score,
        })
    }

    /// Run the model over one chunk, returning spans in chunk coordinates.
    pub async fn extract_spans(&self, text: &str) -> Result<Vec<EntitySpan>> {
        self.rate_limiter.acquire().await;

        let request = InferenceRequest {
            inputs: text,
            parameters: InferenceParameters {
                aggregation_strategy: "simple",
            },
            options: InferenceOptions {
                wait_for_model: true,
            },
        };

        let mut builder = self.client.post(&self.api_url).json(&request);
        if !self.api_token.is_empty() {
            builder = builder.bearer_auth(&self.api_token);
        }

        let response = builder
            .send()
            .await
            .context("Failed to call Hugging Face inference API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Hugging Face inference API returned {}: {}", status, body);
        }

        let parsed: InferenceResponse = response
            .json()
            .await
            .context("Failed to parse Hugging Face inference response")?;

        Ok(parsed.into_spans())
    }
}

#[async_trait]
impl EntityExtractor for HuggingFaceExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<Occurrence>> {
        let chunks = split_text(text, CHUNK_CHARS);
        let mut spans = Vec::new();

        for chunk in &chunks {
            let chunk_spans = self
                .extract_spans(chunk.text)
                .await
                .with_context(|| format!("NER failed for chunk at offset {}", chunk.char_offset))?;
            spans.extend(chunk_spans.into_iter().map(|s| s.shifted(chunk.char_offset)));
        }

        let occurrences = spans_to_occurrences(&spans, self.min_score);

        debug!(
            chunks = chunks.len(),
            spans = spans.len(),
            occurrences = occurrences.len(),
            "Hugging Face extraction complete"
        );

        Ok(occurrences)
    }
}

// --- Inference API request/response types ---

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Serialize)]
struct InferenceParameters {
    aggregation_strategy: &'static str,
}

#[derive(Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

/// The API returns a flat list for a single input, but some deployments wrap
/// it in an outer list (one entry per input).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InferenceResponse {
    Flat(Vec<EntitySpan>),
    Batched(Vec<Vec<EntitySpan>>),
}

impl InferenceResponse {
    pub fn into_spans(self) -> Vec<EntitySpan> {
        match self {
            InferenceResponse::Flat(spans) => spans,
            InferenceResponse::Batched(batches) => batches.into_iter().flatten().collect(),
        }
    }
}
