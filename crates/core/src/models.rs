use serde::{Deserialize, Serialize};
use storage::models::{ChunkId, Fragment};

/// Grouping key: (header, secondary_header, sub_header), compared exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionKey {
    pub header: String,
    pub secondary_header: String,
    pub sub_header: String,
}

impl SectionKey {
    pub fn of(fragment: &Fragment) -> Self {
        Self {
            header: fragment.header.clone(),
            secondary_header: fragment.secondary_header.clone(),
            sub_header: fragment.sub_header.clone(),
        }
    }
}

/// A fragment that survived the threshold for one query.
#[derive(Debug, Clone)]
pub struct ScoredFragment<'a> {
    pub id: usize,
    pub score: f32,
    pub fragment: &'a Fragment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedChunk {
    pub chunk_id: ChunkId,
    pub score: f32,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionResult {
    pub header: String,
    pub secondary_header: String,
    pub sub_header: String,
    pub page_number: Option<i64>,
    pub content: String,
    pub related_chunks: Vec<RelatedChunk>,
}

impl SectionResult {
    /// Score of the best related chunk; sections are ranked by this.
    pub fn top_score(&self) -> f32 {
        self.related_chunks
            .iter()
            .map(|c| c.score)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn key(&self) -> SectionKey {
        SectionKey {
            header: self.header.clone(),
            secondary_header: self.secondary_header.clone(),
            sub_header: self.sub_header.clone(),
        }
    }
}
