//! # autowiki-core
//!
//! Core ingestion, graph, and semantic search engine behind AutoWiki: a
//! service that clones a Python/TypeScript/JavaScript repository, splits it
//! into retrievable chunks, builds a dependency graph and an
//! architecture-layered module tree, and answers natural-language queries
//! by overlaying vector-search hits onto that tree.
//!
//! ## Architecture
//!
//! - **`config`** -- Layered configuration loading and validation
//! - **`types`** -- Shared data model (chunks, graph nodes, tree, DTOs)
//! - **`parser`** -- Tree-sitter AST parsing with per-language extractors
//! - **`chunker`** -- Sliding-window text chunking and per-symbol code chunking
//! - **`embedder`** -- Pluggable embedding providers (hashing default, ONNX optional)
//! - **`vector`** -- Per-project semantic index with disk persistence
//! - **`graph`** -- Dependency graph, importance ranking, module tree construction
//! - **`orchestrator`** -- Drives clone -> walk -> chunk -> index -> persist
//! - **`search`** -- Overlays vector hits onto the persisted module tree
//! - **`server`** -- `axum` HTTP adapter over the above
//!
//! Each module exposes a narrow public surface; the orchestrator and
//! search services are the only collaborators that reach across more
//! than one of them.

pub mod config;
pub mod error;
pub mod types;

pub mod chunker;
pub mod embedder;
pub mod graph;
pub mod parser;
pub mod vector;

pub mod orchestrator;
pub mod search;

pub mod server;

pub use config::Config;
pub use error::{AutoWikiError, AutoWikiResult};
pub use orchestrator::IngestionOrchestrator;
pub use search::SearchService;
