//! Core library: vector index, section-merging retrieval, search service.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod service;
pub mod vectorstore;

pub use error::{SearchError, StartupError};
pub use models::{RelatedChunk, SectionResult};
pub use service::SearchService;
