//! AutoWiki CLI.
//!
//! Command-line interface for ingesting repositories, running semantic
//! searches against them, and serving the HTTP adapter.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use autowiki_core::config::Config;
use autowiki_core::embedder::{EmbeddingProvider, HashingEmbedder};
use autowiki_core::graph::GraphService;
use autowiki_core::server::{self, ServerState};
use autowiki_core::types::ProjectId;
use autowiki_core::vector::VectorStore;
use autowiki_core::{IngestionOrchestrator, SearchService};

/// AutoWiki - semantic code search with a hierarchical tree overlay.
#[derive(Parser, Debug)]
#[command(name = "autowiki", version, about = "Semantic code search with a hierarchical tree overlay")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Directory to resolve project-level `.autowiki/config.toml` from.
    #[arg(long, global = true, default_value = ".")]
    repo_path: PathBuf,

    /// Log level (tracing env-filter directive).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone and index a repository.
    Ingest {
        /// Git URL of the repository to ingest.
        repo_url: String,

        /// Project id to ingest into (generated if omitted).
        #[arg(long)]
        project_id: Option<String>,
    },

    /// Run a semantic search against an ingested project.
    Search {
        /// Project id to search.
        project_id: String,

        /// Search query (natural language or keywords).
        query: String,

        /// Maximum number of distinct files to return.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Remove a project's graph, tree, and vector collection.
    Clear {
        /// Project id to clear.
        project_id: String,
    },

    /// Show entry counts for a project's vector collection.
    Stats {
        /// Project id to inspect.
        project_id: String,
    },

    /// Start the HTTP server.
    Serve {
        /// Bind address, overriding configuration.
        #[arg(long)]
        addr: Option<String>,

        /// Bind port, overriding configuration.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Manage configuration.
    Config {
        /// Show the effective configuration as TOML.
        #[arg(long)]
        show: bool,

        /// Write compiled defaults to `<repo_path>/.autowiki/config.toml`.
        #[arg(long)]
        init: bool,
    },
}

fn load_config(repo_path: &Path) -> Result<Config> {
    Config::load(repo_path).map_err(|e| anyhow::anyhow!(e))
}

fn build_services(config: &Config) -> (Arc<GraphService>, Arc<VectorStore>) {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(config.vector.dimensions));
    let graph = Arc::new(GraphService::new(config));
    let vector = Arc::new(VectorStore::new(config, embedder));
    (graph, vector)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_env_filter(cli.log_level.as_str()).init();

    match cli.command {
        Commands::Ingest { repo_url, project_id } => {
            let config = load_config(&cli.repo_path)?;
            let (graph, vector) = build_services(&config);
            let orchestrator = IngestionOrchestrator::new(config, graph, vector);

            let stats = orchestrator.ingest(&repo_url, project_id).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Search { project_id, query, limit } => {
            let config = load_config(&cli.repo_path)?;
            let default_limit = config.search.default_limit;
            let (graph, vector) = build_services(&config);
            let service = SearchService::new(graph, vector);
            let project_id = ProjectId::new(project_id);
            let limit = limit.unwrap_or(default_limit);

            match service.search(&project_id, &query, limit) {
                Ok((tree, stats)) => {
                    println!("{}", serde_json::to_string_pretty(&tree)?);
                    tracing::info!(hits_found = stats.hits_found, vector_results = stats.vector_results, "search complete");
                }
                Err(autowiki_core::AutoWikiError::TreeMissing(_)) => {
                    let results = service.search_raw(&project_id, &query, limit)?;
                    println!("{}", serde_json::to_string_pretty(&results)?);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Clear { project_id } => {
            let config = load_config(&cli.repo_path)?;
            let (graph, vector) = build_services(&config);
            let project_id = ProjectId::new(project_id);

            let deleted_count = vector.stats(&project_id)?.count;
            vector.delete_collection(&project_id)?;
            graph.delete_graph(&project_id)?;
            println!("cleared {deleted_count} entries");
        }
        Commands::Stats { project_id } => {
            let config = load_config(&cli.repo_path)?;
            let (_graph, vector) = build_services(&config);
            let stats = vector.stats(&ProjectId::new(project_id))?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Serve { addr, port } => {
            let mut config = load_config(&cli.repo_path)?;
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let bind_addr = format!("{}:{}", config.server.addr, config.server.port);
            let state = Arc::new(ServerState::new(config));
            let app = server::router(state);

            tracing::info!(addr = %bind_addr, "starting autowiki server");
            let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
            axum::serve(listener, app).await?;
        }
        Commands::Config { show, init } => {
            let config = load_config(&cli.repo_path)?;

            if init {
                let dir = cli.repo_path.join(".autowiki");
                std::fs::create_dir_all(&dir)?;
                let path = dir.join("config.toml");
                std::fs::write(&path, toml::to_string_pretty(&Config::default())?)?;
                println!("wrote {}", path.display());
            }
            if show {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}
