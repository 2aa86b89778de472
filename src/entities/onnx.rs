// Local ONNX entity extractor using a BERT token-classification model.
//
// Runs entirely on the local CPU: no API token, no rate limits, no network
// dependency once the model is downloaded. The default model is an ONNX
// export of dslim/bert-base-NER (CoNLL-2003 labels: PER, LOC, ORG, MISC).
//
// Each token gets a softmax distribution over the BIO label set; the argmax
// label is kept and adjacent tokens are merged by labels::group_tokens.
//
// A chunk that still tokenizes past the sequence limit is split again until
// every piece fits, so no token is silently truncated away.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::{debug, warn};

use super::chunk::split_text;
use super::download::{MODEL_CONFIG_FILE, MODEL_FILE, TOKENIZER_FILE};
use super::labels::{group_tokens, Tag, TaggedToken, CONLL_LABELS};
use super::traits::{spans_to_occurrences, EntityExtractor, EntitySpan, Occurrence};

/// BERT's positional embedding limit.
const MAX_SEQUENCE_TOKENS: usize = 512;

/// Characters per chunk. Most prose fits the token limit at this size; dense
/// text that doesn't is re-split by `encode_chunk`.
const CHUNK_CHARS: usize = 1000;

/// Chunks per forward pass.
const BATCH_SIZE: usize = 8;

/// BERT [PAD] token id.
const PAD_TOKEN_ID: i64 = 0;

/// Local ONNX-based NER. The session sits behind Arc<Mutex> because
/// `Session::run` takes `&mut self` and inference is moved onto
/// spawn_blocking, which needs `'static` handles.
pub struct OnnxExtractor {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    labels: Arc<Vec<String>>,
    min_score: f32,
}

impl OnnxExtractor {
    /// Load the ONNX model, tokenizer and label map from `model_dir`.
    ///
    /// Expects `model.onnx` and `tokenizer.json`; `config.json` is optional.
    /// Run `dramatis download-model` first if they are missing.
    pub fn load(model_dir: &Path, min_score: f32) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\nRun `dramatis download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Tokenizer file not found: {}\nRun `dramatis download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        configure_tokenizer(&mut tokenizer, MAX_SEQUENCE_TOKENS)?;

        let labels = load_labels(&model_dir.join(MODEL_CONFIG_FILE))?;

        debug!(
            labels = labels.len(),
            "Loaded ONNX NER model from {}",
            model_dir.display()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            labels: Arc::new(labels),
            min_score,
        })
    }
}

#[async_trait]
impl EntityExtractor for OnnxExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<Occurrence>> {
        let chunks: Vec<(String, usize)> = split_text(text, CHUNK_CHARS)
            .into_iter()
            .map(|c| (c.text.to_string(), c.char_offset))
            .collect();
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let labels = Arc::clone(&self.labels);
        let chunk_count = chunks.len();

        let spans = tokio::task::spawn_blocking(move || -> Result<Vec<EntitySpan>> {
            let mut encoded = Vec::with_capacity(chunks.len());
            for (text, char_offset) in &chunks {
                encoded.extend(encode_chunk(&tokenizer, text, *char_offset)?);
            }
            let mut spans = Vec::new();
            for batch in encoded.chunks(BATCH_SIZE) {
                spans.extend(run_batch(&session, &labels, batch)?);
            }
            Ok(spans)
        })
        .await
        .context("spawn_blocking panicked")??;

        let occurrences = spans_to_occurrences(&spans, self.min_score);

        debug!(
            chunks = chunk_count,
            spans = spans.len(),
            occurrences = occurrences.len(),
            "ONNX extraction complete"
        );

        Ok(occurrences)
    }
}

/// Truncate at `max_tokens` (so overflow is reported rather than fed to the
/// model) and leave padding to `run_batch`.
fn configure_tokenizer(tokenizer: &mut Tokenizer, max_tokens: usize) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_tokens,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;
    tokenizer.with_padding(None);
    Ok(())
}

/// A chunk whose encoding fits the model, with its document offset.
struct EncodedChunk {
    encoding: Encoding,
    text: String,
    char_offset: usize,
}

/// Encode one chunk, splitting it further while its encoding overflows the
/// tokenizer's truncation limit. Pieces come back in document order.
fn encode_chunk(tokenizer: &Tokenizer, text: &str, char_offset: usize) -> Result<Vec<EncodedChunk>> {
    let mut pending = vec![(text.to_string(), char_offset)];
    let mut encoded = Vec::new();

    while let Some((text, char_offset)) = pending.pop() {
        let encoding = tokenizer
            .encode(text.as_str(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let overflow = encoding.get_overflowing();
        if !overflow.is_empty() {
            let chars = text.chars().count();
            let pieces = split_text(&text, chars.div_ceil(2));
            if pieces.len() > 1 {
                debug!(char_offset, chars, "Chunk exceeds the token limit, splitting");
                // Reversed so the stack pops them in document order
                for piece in pieces.iter().rev() {
                    pending.push((piece.text.to_string(), char_offset + piece.char_offset));
                }
                continue;
            }
            let dropped: usize = overflow.iter().map(|o| o.get_ids().len()).sum();
            warn!(
                char_offset,
                dropped_tokens = dropped,
                "Chunk can't be split below the token limit; trailing tokens ignored"
            );
        }

        encoded.push(EncodedChunk {
            encoding,
            text,
            char_offset,
        });
    }

    Ok(encoded)
}

/// Run one forward pass over a batch of encoded chunks and decode entity
/// spans in document coordinates.
fn run_batch(
    session: &Mutex<Session>,
    labels: &[String],
    batch: &[EncodedChunk],
) -> Result<Vec<EntitySpan>> {
    let batch_size = batch.len();
    let max_len = batch
        .iter()
        .map(|c| c.encoding.get_ids().len())
        .max()
        .unwrap_or(0);
    if max_len == 0 {
        return Ok(Vec::new());
    }

    // Flat [batch_size, max_len] inputs, right-padded
    let mut input_ids: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut attention_mask: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    for enc in batch.iter().map(|c| &c.encoding) {
        input_ids.extend(enc.get_ids().iter().map(|&id| id as i64));
        attention_mask.extend(enc.get_attention_mask().iter().map(|&m| m as i64));
        for _ in enc.get_ids().len()..max_len {
            input_ids.push(PAD_TOKEN_ID);
            attention_mask.push(0);
        }
    }
    let token_type_ids = vec![0i64; batch_size * max_len];

    let shape = [batch_size as i64, max_len as i64];
    let input_ids_tensor =
        Tensor::from_array((shape, input_ids)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
        .context("Failed to create attention_mask tensor")?;
    let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids))
        .context("Failed to create token_type_ids tensor")?;

    let logits = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            })
            .context("ONNX inference failed")?;

        // Output shape: [batch_size, max_len, num_labels]
        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract logits tensor")?;
        data.to_vec()
    };

    let num_labels = logits.len() / (batch_size * max_len);
    if num_labels == 0 {
        anyhow::bail!("Model returned an empty logits tensor");
    }

    let mut spans = Vec::new();
    for (row, chunk) in batch.iter().enumerate() {
        let tokens = tag_tokens(&chunk.encoding, &logits, row, max_len, num_labels, labels);
        spans.extend(
            group_tokens(&tokens, &chunk.text)
                .into_iter()
                .map(|span| span.shifted(chunk.char_offset)),
        );
    }
    Ok(spans)
}

/// Pick the best label for every real (non-special) token of one row of a
/// `[rows, max_len, num_labels]` logits buffer.
fn tag_tokens(
    enc: &Encoding,
    logits: &[f32],
    row: usize,
    max_len: usize,
    num_labels: usize,
    labels: &[String],
) -> Vec<TaggedToken> {
    let special = enc.get_special_tokens_mask();
    let offsets = enc.get_offsets();
    let mut tokens = Vec::with_capacity(offsets.len());

    for (i, &(start, end)) in offsets.iter().enumerate() {
        if special.get(i).copied().unwrap_or(0) == 1 || start == end {
            continue;
        }
        let base = (row * max_len + i) * num_labels;
        let probs = softmax(&logits[base..base + num_labels]);
        let (best, score) = argmax(&probs);
        let label = labels.get(best).map(String::as_str).unwrap_or("O");
        tokens.push(TaggedToken {
            tag: Tag::parse(label),
            score,
            start,
            end,
        });
    }
    tokens
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn argmax(values: &[f32]) -> (usize, f32) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best })
}

#[derive(Deserialize)]
struct ModelConfig {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// Read the id -> label table from a Hugging Face `config.json`, falling
/// back to the CoNLL-2003 label set when the file is absent.
fn load_labels(config_path: &Path) -> Result<Vec<String>> {
    if !config_path.exists() {
        return Ok(CONLL_LABELS.iter().map(|s| s.to_string()).collect());
    }
    let raw = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    labels_from_config(&raw)
}

fn labels_from_config(raw: &str) -> Result<Vec<String>> {
    let config: ModelConfig =
        serde_json::from_str(raw).context("Failed to parse model config.json")?;

    if config.id2label.is_empty() {
        return Ok(CONLL_LABELS.iter().map(|s| s.to_string()).collect());
    }

    let mut indexed = Vec::with_capacity(config.id2label.len());
    for (id, label) in config.id2label {
        let id: usize = id
            .parse()
            .with_context(|| format!("Non-numeric label id in config.json: {id}"))?;
        indexed.push((id, label));
    }
    let len = indexed.iter().map(|(id, _)| id + 1).max().unwrap_or(0);
    let mut labels = vec!["O".to_string(); len];
    for (id, label) in indexed {
        labels[id] = label;
    }
    Ok(labels)
}
