use crate::config::AppConfig;
use crate::service::SearchService;
use crate::vectorstore::FlatIndex;
use anyhow::Context;
use providers::hashing::{HashingProvider, DEFAULT_DIMENSION};
use providers::noop::NoopProvider;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::ProviderRegistry;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use storage::faiss::{self, Metric};
use storage::FragmentStore;
use tracing::{info, warn};

pub fn build_registry(config: &AppConfig) -> anyhow::Result<ProviderRegistry> {
    let dimension = config.embeddings.dimension.unwrap_or(DEFAULT_DIMENSION);
    let mut reg = ProviderRegistry::new()
        .with_embedding("hashing", Arc::new(HashingProvider::new(dimension)))
        .with_embedding("noop", Arc::new(NoopProvider::new(dimension)));

    if let (Some(key), Some(base)) = (
        std::env::var_os("OPENAI_API_KEY"),
        std::env::var_os("OPENAI_BASE_URL"),
    ) {
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: key.to_string_lossy().into_owned(),
            base_url: base.to_string_lossy().into_owned(),
            embedding_model: config.embeddings.model.clone(),
            dimension: config.embeddings.dimension,
            timeout: Duration::from_secs(config.embeddings.timeout_secs.unwrap_or(30)),
        })
        .context("build openai provider")?;
        reg = reg.with_embedding("openai", Arc::new(provider));
    }

    if ignores_model(&config.embeddings.provider) {
        warn!(
            provider = %config.embeddings.provider,
            model = %config.embeddings.model,
            "provider does not load the configured model; scores are only meaningful if the index was built with it"
        );
    }

    Ok(reg.set_preferred_embedding(&config.embeddings.provider))
}

/// Local providers embed on their own and never run `embeddings.model`.
fn ignores_model(provider: &str) -> bool {
    matches!(provider, "hashing" | "noop")
}

/// Loads the index and metadata and builds the search service.
///
/// Any failure here is fatal: no service is returned for a partial corpus.
pub fn load_service(config: &AppConfig) -> anyhow::Result<SearchService> {
    let index_path = Path::new(&config.corpus.index_path);
    let vectors = faiss::load_flat_index(index_path)
        .with_context(|| format!("load index {}", index_path.display()))?;
    if vectors.metric != Metric::InnerProduct {
        warn!(
            metric = %vectors.metric,
            "index was not built for inner product; scoring as cosine anyway"
        );
    }
    let index = FlatIndex::from_flat(&vectors).context("build flat index")?;

    let metadata_path = Path::new(&config.corpus.metadata_path);
    let fragments = FragmentStore::load(metadata_path)
        .with_context(|| format!("load metadata {}", metadata_path.display()))?;

    let mut config = config.clone();
    config.embeddings.dimension.get_or_insert(vectors.dimension);
    let registry = build_registry(&config)?;
    let embedder = registry
        .embedding(None)
        .with_context(|| {
            format!(
                "embedding provider {:?} (available: {})",
                config.embeddings.provider,
                registry.names().join(", ")
            )
        })?;

    let service = SearchService::new(embedder, Box::new(index), fragments)?;
    let stats = service.stats();
    info!(
        vectors = stats.vectors,
        dimension = stats.dimension,
        metric = %stats.metric,
        provider = %config.embeddings.provider,
        "loaded index with {} vectors",
        stats.vectors
    );
    Ok(service)
}
