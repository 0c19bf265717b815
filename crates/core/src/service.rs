use crate::error::{SearchError, StartupError};
use crate::models::SectionResult;
use crate::search;
use crate::vectorstore::VectorIndex;
use providers::EmbeddingProvider;
use std::sync::Arc;
use storage::faiss::Metric;
use storage::FragmentStore;

/// Immutable search entry point shared by every caller.
///
/// The index, fragment metadata and embedder are fixed at construction; each
/// `search` call re-runs the whole pipeline without caching.
pub struct SearchService {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Box<dyn VectorIndex>,
    fragments: FragmentStore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceStats {
    pub vectors: usize,
    pub dimension: usize,
    pub metric: Metric,
}

impl SearchService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Box<dyn VectorIndex>,
        fragments: FragmentStore,
    ) -> Result<Self, StartupError> {
        if index.len() != fragments.count() {
            return Err(StartupError::CountMismatch {
                vectors: index.len(),
                fragments: fragments.count(),
            });
        }
        if let Some(dim) = embedder.dimension() {
            if dim != index.dimension() {
                return Err(StartupError::DimensionMismatch {
                    embedder: dim,
                    index: index.dimension(),
                });
            }
        }
        Ok(Self {
            embedder,
            index,
            fragments,
        })
    }

    pub fn search(&self, query: &str, threshold: f64) -> Result<Vec<SectionResult>, SearchError> {
        if threshold.is_nan() {
            return Err(SearchError::InvalidThreshold(threshold));
        }
        search::semantic_search(
            self.embedder.as_ref(),
            self.index.as_ref(),
            &self.fragments,
            query,
            threshold,
        )
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            vectors: self.index.len(),
            dimension: self.index.dimension(),
            metric: self.index.metric(),
        }
    }
}
