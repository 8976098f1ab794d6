//! Query → encoder → ranker → catalog pipeline.
//!
//! [`MoodRecommender`] holds explicit handles to the catalog and encoder, so
//! tests can hand it fakes and servers can share one instance across threads.
//! It is the only layer that turns lower-level failures into the single
//! user-facing [`RecommendError`].

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use moodtune_core::config::{Settings, DEFAULT_TOP_K};
use moodtune_core::error::Error;
use moodtune_core::traits::Encoder;
use moodtune_core::types::{RankedResult, ScoredSong, Song};
use moodtune_embed::default_encoder;
use moodtune_vector::{CatalogStore, SimilarityRanker};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecommendError {
    /// User-correctable; nothing was encoded.
    #[error("Please describe a mood, vibe or situation (e.g. \"happy dance\" or \"sad love\").")]
    EmptyQuery,

    #[error("Could not process the query: {0}")]
    Retrieval(String),

    /// Catalog, encoder and ranker disagree; not expected in normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

pub struct MoodRecommender {
    catalog: Arc<CatalogStore>,
    encoder: Arc<dyn Encoder>,
    ranker: SimilarityRanker,
    top_k: usize,
}

impl MoodRecommender {
    /// Fails with `DataIntegrity` when the encoder and catalog widths differ.
    pub fn new(catalog: Arc<CatalogStore>, encoder: Arc<dyn Encoder>) -> moodtune_core::Result<Self> {
        if encoder.dim() != catalog.dim() {
            return Err(Error::DataIntegrity(format!(
                "encoder produces {} dimensions, catalog holds {}",
                encoder.dim(),
                catalog.dim()
            )));
        }
        Ok(Self { catalog, encoder, ranker: SimilarityRanker::new(), top_k: DEFAULT_TOP_K })
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Build the catalog and a lazily initialized encoder from settings.
    ///
    /// The model itself loads on the first query unless the caller warms it up.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let catalog = CatalogStore::load(
            &settings.catalog.metadata_path,
            &settings.catalog.embeddings_path,
            settings.model.dim,
        )?;
        let encoder = default_encoder(&settings.model);
        Ok(Self::new(Arc::new(catalog), Arc::new(encoder))?.with_top_k(settings.recommend.top_k))
    }

    pub fn catalog(&self) -> &CatalogStore { &self.catalog }
    pub fn encoder(&self) -> &dyn Encoder { self.encoder.as_ref() }
    pub fn top_k(&self) -> usize { self.top_k }

    /// Initialize the encoder now so the first query does not pay for it.
    pub fn warm_up(&self) -> Result<(), RecommendError> {
        self.encoder.warm_up().map_err(translate)
    }

    /// Songs best matching `query`, best first, at most `top_k` of them.
    pub fn recommend(&self, query: &str) -> Result<Vec<Song>, RecommendError> {
        Ok(self.recommend_scored(query)?.into_iter().map(|s| s.song).collect())
    }

    pub fn recommend_scored(&self, query: &str) -> Result<RankedResult, RecommendError> {
        if query.trim().is_empty() {
            tracing::debug!("rejecting empty query");
            return Err(RecommendError::EmptyQuery);
        }
        let started = Instant::now();

        let vector = self.encoder.encode(query).map_err(translate)?;
        let ranked = self.ranker.rank(&vector, self.catalog.vectors(), self.top_k).map_err(translate)?;

        let mut results = Vec::with_capacity(ranked.len());
        for (index, score) in ranked {
            let song = self.catalog.get(index).map_err(translate)?.clone();
            results.push(ScoredSong { index, score, song });
        }
        tracing::debug!(results = results.len(), elapsed = ?started.elapsed(), "recommendation complete");
        Ok(results)
    }
}

fn translate(err: Error) -> RecommendError {
    match err {
        Error::EmptyQuery => RecommendError::EmptyQuery,
        Error::Encoding(msg) => {
            tracing::warn!(error = %msg, "encoding failed");
            RecommendError::Retrieval(msg)
        }
        other @ (Error::InvalidArgument(_) | Error::IndexOutOfRange { .. }) => {
            tracing::error!(error = %other, "invariant violation between ranker and catalog");
            RecommendError::Internal(other.to_string())
        }
        other => {
            tracing::error!(error = %other, "unexpected failure while recommending");
            RecommendError::Internal(other.to_string())
        }
    }
}
