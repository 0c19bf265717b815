use crate::{EmbeddingProvider, ProviderError};

/// Returns an all-zero vector for every input.
#[derive(Debug, Default)]
pub struct NoopProvider {
    dimension: usize,
}

impl NoopProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingProvider for NoopProvider {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(vec![0.0; self.dimension])
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}
