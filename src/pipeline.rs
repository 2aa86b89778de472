// The request pipeline: fetch -> extract -> aggregate.
//
// One call handles one document end to end. The pipeline holds only
// read-only handles, so a single instance is shared across requests.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::aggregate::{aggregate, AggregateError, PersonRecord, ProximityWindow};
use crate::document::{DocumentFetcher, FetchError};
use crate::entities::EntityExtractor;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document could not be retrieved (caller or upstream problem).
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The NER backend failed.
    #[error("entity extraction failed: {0:#}")]
    Extraction(anyhow::Error),

    /// The NER backend produced records the aggregator rejected.
    #[error("entity extraction returned malformed results: {0}")]
    Aggregate(#[from] AggregateError),
}

pub struct PeoplePipeline {
    fetcher: Arc<dyn DocumentFetcher>,
    extractor: Arc<dyn EntityExtractor>,
    window: ProximityWindow,
}

impl PeoplePipeline {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        extractor: Arc<dyn EntityExtractor>,
        window: ProximityWindow,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            window,
        }
    }

    /// Run the whole pipeline for one document URL.
    pub async fn run(&self, url: &str) -> Result<Vec<PersonRecord>, PipelineError> {
        let text = self.fetcher.fetch(url).await?;

        let occurrences = self
            .extractor
            .extract(&text)
            .await
            .map_err(PipelineError::Extraction)?;

        let people = aggregate(&occurrences, self.window)?;

        info!(
            url,
            chars = text.chars().count(),
            occurrences = occurrences.len(),
            people = people.len(),
            "Document processed"
        );

        Ok(people)
    }
}
