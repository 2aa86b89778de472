// Shared test helpers: deterministic stand-ins for the NER backend and
// fixture loading.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;

use dramatis::entities::chunk::byte_to_char_offset;
use dramatis::entities::{EntityExtractor, Occurrence};

/// Finds exact matches of known names. Stands in for a model when the test
/// needs to know the right answer.
pub struct DictionaryExtractor {
    people: Vec<String>,
    places: Vec<String>,
}

impl DictionaryExtractor {
    pub fn new(people: &[&str], places: &[&str]) -> Self {
        Self {
            people: people.iter().map(|s| s.to_string()).collect(),
            places: places.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn lovelace() -> Self {
        Self::new(&["Ada Lovelace", "Charles Babbage"], &["London", "Turin"])
    }
}

#[async_trait]
impl EntityExtractor for DictionaryExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<Occurrence>> {
        let mut occurrences = Vec::new();
        for name in &self.people {
            for (byte, _) in text.match_indices(name.as_str()) {
                occurrences.push(Occurrence::person(name.clone(), byte_to_char_offset(text, byte)));
            }
        }
        for name in &self.places {
            for (byte, _) in text.match_indices(name.as_str()) {
                occurrences.push(Occurrence::location(name.clone(), byte_to_char_offset(text, byte)));
            }
        }
        occurrences.sort_by_key(|o| o.position);
        Ok(occurrences)
    }
}

/// Returns a fixed list regardless of input.
pub struct StaticExtractor(pub Vec<Occurrence>);

#[async_trait]
impl EntityExtractor for StaticExtractor {
    async fn extract(&self, _text: &str) -> Result<Vec<Occurrence>> {
        Ok(self.0.clone())
    }
}

/// Always fails, like a backend that is down.
pub struct FailingExtractor;

#[async_trait]
impl EntityExtractor for FailingExtractor {
    async fn extract(&self, _text: &str) -> Result<Vec<Occurrence>> {
        anyhow::bail!("inference API returned 503 Service Unavailable")
    }
}

pub fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("missing fixture {}: {e}", path.display()))
}
