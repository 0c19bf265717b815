use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::render;
use cli::server::{self, AppState};
use retrieval_core::config;
use retrieval_core::config::AppConfig;
use retrieval_core::pipeline;
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Search {
            query,
            threshold,
            json,
        } => run_search(&cfg, &query, threshold, json),
        Commands::Serve { bind } => run_serve(cfg, bind),
        Commands::Info { json } => run_info(&cfg, json),
    }
}

#[derive(Parser)]
#[command(name = "docsearch")]
#[command(about = "Semantic search over a sectioned document corpus", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one query and print the ranked sections
    Search {
        /// Free-text query
        query: String,
        /// Exclusive similarity cutoff; defaults to the configured value
        #[arg(long)]
        threshold: Option<f64>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Serve the search API over HTTP
    Serve {
        /// Address to bind (host:port); defaults to the configured value
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show index statistics
    Info {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

fn run_search(cfg: &AppConfig, query: &str, threshold: Option<f64>, json: bool) -> Result<()> {
    let service = pipeline::load_service(cfg)?;
    let threshold = threshold.unwrap_or(cfg.search.threshold);
    let sections = service.search(query, threshold)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&sections)?);
    } else {
        print!("{}", render::sections_text(&sections));
    }
    Ok(())
}

fn run_serve(cfg: AppConfig, bind: Option<String>) -> Result<()> {
    // The blocking embedder client must not be created or dropped inside the runtime.
    let service = Arc::new(pipeline::load_service(&cfg)?);
    let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
    let state = AppState {
        service: Arc::clone(&service),
        default_threshold: cfg.search.threshold,
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    let result = runtime.block_on(server::serve(state, &bind));
    drop(runtime);
    drop(service);
    result
}

fn run_info(cfg: &AppConfig, json: bool) -> Result<()> {
    let service = pipeline::load_service(cfg)?;
    let stats = service.stats();
    let fingerprint = storage::fingerprint(Path::new(&cfg.corpus.index_path))?;
    if json {
        let out = serde_json::json!({
            "index_path": cfg.corpus.index_path,
            "metadata_path": cfg.corpus.metadata_path,
            "vectors": stats.vectors,
            "dimension": stats.dimension,
            "metric": stats.metric.to_string(),
            "provider": cfg.embeddings.provider,
            "blake3": fingerprint,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("index:     {}", cfg.corpus.index_path);
        println!("metadata:  {}", cfg.corpus.metadata_path);
        println!("vectors:   {}", stats.vectors);
        println!("dimension: {}", stats.dimension);
        println!("metric:    {}", stats.metric);
        println!("provider:  {}", cfg.embeddings.provider);
        println!("blake3:    {}", fingerprint);
    }
    Ok(())
}
