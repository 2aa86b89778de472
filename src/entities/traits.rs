// Entity extractor trait: the swap-ready abstraction over NLP backends.
//
// Every backend (remote Hugging Face inference, local ONNX model) produces
// EntitySpans in the same shape, then narrows them to the PERSON/LOCATION
// Occurrences the aggregator consumes. The aggregator never sees a backend.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The two entity categories the aggregator cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityCategory {
    Person,
    Location,
}

impl EntityCategory {
    /// Map an NER group label to a category.
    ///
    /// Accepts the CoNLL-style short labels (`PER`, `LOC`) as well as the
    /// OntoNotes-style long ones (`PERSON`, `LOCATION`, `GPE`). Organisations,
    /// miscellaneous entities and anything unknown map to `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "PER" | "PERSON" => Some(Self::Person),
            "LOC" | "LOCATION" | "GPE" => Some(Self::Location),
            _ => None,
        }
    }
}

/// A single detected mention of a person or location.
///
/// `position` is the character offset (not byte offset) of the mention's
/// first character in the fetched document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub category: EntityCategory,
    pub name: String,
    pub position: usize,
}

impl Occurrence {
    pub fn person(name: impl Into<String>, position: usize) -> Self {
        Self {
            category: EntityCategory::Person,
            name: name.into(),
            position,
        }
    }

    pub fn location(name: impl Into<String>, position: usize) -> Self {
        Self {
            category: EntityCategory::Location,
            name: name.into(),
            position,
        }
    }
}

/// A raw entity span as produced by a token-classification model.
///
/// Field names follow the Hugging Face pipeline output so the inference API
/// response deserializes straight into this type. `start`/`end` are character
/// offsets into whatever text the model was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub entity_group: String,
    pub score: f32,
    pub word: String,
    pub start: usize,
    pub end: usize,
}

impl EntitySpan {
    /// Narrow a span to an Occurrence, dropping categories we don't track
    /// and blank words.
    pub fn to_occurrence(&self) -> Option<Occurrence> {
        let category = EntityCategory::from_label(&self.entity_group)?;
        let name = self.word.trim();
        if name.is_empty() {
            return None;
        }
        Some(Occurrence {
            category,
            name: name.to_string(),
            position: self.start,
        })
    }

    /// Shift the span's offsets by `offset` characters (chunk -> document coordinates).
    pub fn shifted(mut self, offset: usize) -> Self {
        self.start += offset;
        self.end += offset;
        self
    }
}

/// Convert backend spans into document-ordered occurrences, applying the
/// confidence floor.
pub fn spans_to_occurrences(spans: &[EntitySpan], min_score: f32) -> Vec<Occurrence> {
    let mut occurrences: Vec<Occurrence> = spans
        .iter()
        .filter(|span| span.score >= min_score)
        .filter_map(EntitySpan::to_occurrence)
        .collect();
    // Stable: spans at the same offset keep backend order
    occurrences.sort_by_key(|o| o.position);
    occurrences
}

/// Trait for extracting entity occurrences from document text. Implementations
/// are async because the default backend is an HTTP API.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    /// Extract PERSON and LOCATION occurrences, in document order.
    async fn extract(&self, text: &str) -> Result<Vec<Occurrence>>;
}
