use serde::{Deserialize, Serialize};
use std::fmt;

/// Chunk identifier as written by the indexer: either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChunkId {
    Int(i64),
    Text(String),
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkId::Int(n) => write!(f, "{}", n),
            ChunkId::Text(s) => f.write_str(s),
        }
    }
}

/// One metadata record; row `i` of the metadata file describes vector row `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub chunk_id: ChunkId,
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub secondary_header: String,
    #[serde(default)]
    pub sub_header: String,
    #[serde(default)]
    pub page_number: Option<i64>,
    pub content: String,
}
