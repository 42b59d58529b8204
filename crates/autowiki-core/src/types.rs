//! Core domain types shared across all autowiki-core subsystems.
//!
//! These types form the API contract between modules: the parser produces
//! `FileStructure`, the chunker produces `Chunk`s (and forwards the
//! structure), the graph service consumes both, and the search service
//! decorates a `ModuleTreeNode` tree with hit information.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Opaque project identifier, namespacing every piece of persistent state
/// (graph file, tree file, vector collection) belonging to one ingestion.
///
/// A `ProjectId` is sanitized on construction so it can be used directly as
/// a filename stem and as a vector-collection suffix: any byte outside
/// `[A-Za-z0-9_-]` is replaced with `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(String);

impl ProjectId {
    /// Wrap a raw id, sanitizing it into a filesystem/collection-safe form.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(sanitize(raw.as_ref()))
    }

    /// The sanitized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map every byte outside `[A-Za-z0-9_-]` to `_`.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parser output
// ---------------------------------------------------------------------------

/// Classification of a single import, used by `GraphService`'s import
/// resolution algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// Unresolvable to a file in this repository (stdlib or unclassified).
    Stdlib,
    /// Resolvable via direct file-map lookup (`kind=local_absolute`).
    LocalAbsolute,
    /// Relative import (`from .x import y`); module retains leading dots.
    LocalRelative,
    /// A real third-party package, conflated with `Stdlib` for resolution
    /// purposes but kept as a distinct tag for observability.
    ThirdParty,
}

/// One import statement extracted from a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportInfo {
    /// Dotted module path, e.g. `os.path` or `.services.parser`.
    pub module: String,
    /// The specific name imported via `from module import name`, if any.
    pub name: Option<String>,
    /// The `as` alias, if any.
    pub alias: Option<String>,
    /// Resolution-relevant classification.
    pub kind: ImportKind,
}

/// A class/interface definition extracted from a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Class name.
    pub name: String,
    /// Raw text of each base-class expression (dotted access, calls, etc).
    pub bases: Vec<String>,
    /// 0-based start line.
    pub start_line: u32,
    /// 0-based end line, inclusive.
    pub end_line: u32,
    /// Verbatim source slice of the definition.
    pub source: String,
}

/// A function/method definition extracted from a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionInfo {
    /// Function name.
    pub name: String,
    /// Raw textual form of each parameter, including annotations/defaults.
    pub args: Vec<String>,
    /// 0-based start line.
    pub start_line: u32,
    /// 0-based end line, inclusive.
    pub end_line: u32,
    /// Verbatim source slice of the definition.
    pub source: String,
}

/// Parsed AST-level summary of one file: imports, classes, functions.
///
/// Produced by the parser, consumed by the graph service. `file_path` is
/// always relative to the repository root and always uses `/` separators,
/// regardless of host platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileStructure {
    /// Path relative to the repository root, `/`-separated.
    pub file_path: String,
    /// Imports found in the file, in source order.
    pub imports: Vec<ImportInfo>,
    /// Classes found in the file, in source order.
    pub classes: Vec<ClassInfo>,
    /// Functions and methods found in the file, in traversal order.
    ///
    /// Methods appear in this flat list alongside module-level functions;
    /// the enclosing class is what distinguishes them.
    pub functions: Vec<FunctionInfo>,
}

impl FileStructure {
    /// An empty structure for the given path, e.g. when a language has no
    /// registered analyzer or a parse fails.
    pub fn empty(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    /// `true` when nothing meaningful was extracted.
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.classes.is_empty() && self.functions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Chunks
// ---------------------------------------------------------------------------

/// What kind of unit a chunk represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    /// A class definition.
    Class,
    /// A function or method definition.
    Function,
    /// A window of prose from a documentation file.
    Documentation,
}

impl ChunkType {
    /// The string used inside a chunk id, e.g. `"class"` / `"function"` /
    /// `"text"`. Documentation chunks use `"text"` to match the id scheme
    /// (`MD5(rel_path ":text:" offset)`).
    pub fn id_tag(self) -> &'static str {
        match self {
            ChunkType::Class => "class",
            ChunkType::Function => "function",
            ChunkType::Documentation => "text",
        }
    }
}

/// Metadata carried alongside a chunk's content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Symbol name for code chunks; absent (empty) for text windows.
    pub name: String,
    /// What kind of chunk this is.
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    /// Path relative to the repository root.
    pub file_path: String,
    /// Detected language, e.g. `"python"`, `"markdown"`.
    pub language: String,
    /// Start line of the chunk's content.
    pub start_line: u32,
    /// End line of the chunk's content.
    pub end_line: u32,
}

/// A retrievable unit of source or documentation text, with a stable
/// identity suitable for upsert semantics in the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// 128-bit MD5 digest, hex-encoded.
    pub id: String,
    /// The chunk's text.
    pub content: String,
    /// Structured metadata about the chunk.
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Compute the stable MD5-based id for a code chunk.
    pub fn code_id(file_path: &str, chunk_type: ChunkType, name: &str) -> String {
        let digest = md5::compute(format!("{file_path}:{}:{name}", chunk_type.id_tag()));
        hex::encode(digest.0)
    }

    /// Compute the stable MD5-based id for a text window.
    pub fn text_id(file_path: &str, offset: usize) -> String {
        let digest = md5::compute(format!("{file_path}:text:{offset}"));
        hex::encode(digest.0)
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// What a `GraphNode` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeKind {
    /// A source file.
    File,
    /// A class definition inside a file.
    Class,
    /// A function or method definition inside a file.
    Function,
}

/// Tagged attribute payload for a `GraphNode`, keyed by `NodeKind`.
///
/// Modeled as tagged variants rather than an untyped string map so that
/// (de)serialization round-trips exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeAttrs {
    /// Present on `FILE` nodes: the file's imports, used by `buildEdges`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<ImportInfo>,
    /// Present on `CLASS` nodes: raw base-class expressions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    /// Present on `CLASS`/`FUNCTION` nodes: 0-based start line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    /// Present on `CLASS`/`FUNCTION` nodes: 0-based end line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
}

/// A node in the per-project dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// File path for `FILE` nodes, `"<file_path>::<symbol_name>"` otherwise.
    pub id: String,
    /// What this node represents.
    pub kind: NodeKind,
    /// Tagged attribute payload.
    pub attributes: NodeAttrs,
}

/// What kind of relationship a `GraphEdge` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EdgeKind {
    /// A `FILE` node defines a `CLASS`/`FUNCTION` node.
    Defines,
    /// A `CLASS` node inherits from a base class.
    Inherits,
    /// A `FILE` node imports another `FILE` node.
    Imports,
}

/// A directed edge in the per-project dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node id.
    pub source_id: String,
    /// Target node id.
    pub target_id: String,
    /// What kind of relationship this edge represents.
    pub kind: EdgeKind,
}

// ---------------------------------------------------------------------------
// Module tree
// ---------------------------------------------------------------------------

/// What kind of entry a `ModuleTreeNode` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeNodeKind {
    /// An intermediate directory.
    Folder,
    /// A leaf file.
    File,
}

/// A node in the hierarchical, sorted module tree used as the search
/// result surface. Folder nodes mirror directory structure; file leaves
/// carry the file's architectural `layer` and graph `importance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleTreeNode {
    /// Path prefix for folders, full file path for files.
    pub id: String,
    /// Base name (last path component).
    pub name: String,
    /// Folder or file.
    pub kind: TreeNodeKind,
    /// Child nodes; empty for file leaves.
    #[serde(default)]
    pub children: Vec<ModuleTreeNode>,
    /// Architectural layer, `0..=4`. `None` for folders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<u8>,
    /// In-degree centrality, `[0,1]`. `None` for folders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,

    // -- Search-overlay fields (§4.6), absent until `SearchService::search` decorates the tree --
    /// Set on file nodes present in the search-hit map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hit: Option<bool>,
    /// Best (lowest) cosine distance among this file's matched chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_score: Option<f32>,
    /// Chunks from this file that matched the query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_chunks: Option<Vec<SearchHit>>,
    /// Set on any node (folder or file) with an active descendant or self.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ModuleTreeNode {
    /// A new empty folder node.
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: TreeNodeKind::Folder,
            children: Vec::new(),
            layer: None,
            importance: None,
            is_hit: None,
            search_score: None,
            matched_chunks: None,
            is_active: None,
        }
    }

    /// A new file leaf node.
    pub fn file(id: impl Into<String>, name: impl Into<String>, layer: u8, importance: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: TreeNodeKind::File,
            children: Vec::new(),
            layer: Some(layer),
            importance: Some(importance),
            is_hit: None,
            search_score: None,
            matched_chunks: None,
            is_active: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Vector store results
// ---------------------------------------------------------------------------

/// A single vector-store query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorHit {
    /// The matched chunk's id.
    pub id: String,
    /// The matched chunk's content.
    pub content: String,
    /// The matched chunk's metadata.
    pub metadata: ChunkMetadata,
    /// Cosine distance (ascending = more relevant).
    pub distance: f32,
}

/// A matched chunk attached to a `ModuleTreeNode` by the search overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matched chunk's id.
    pub id: String,
    /// The matched chunk's content.
    pub content: String,
    /// Cosine distance for this specific chunk.
    pub distance: f32,
    /// Start line of the matched chunk.
    pub start_line: u32,
    /// End line of the matched chunk.
    pub end_line: u32,
}

/// `{count}` returned by `VectorStore::stats`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VectorStats {
    /// Number of entries currently in the collection.
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Ingestion / search statistics
// ---------------------------------------------------------------------------

/// Statistics returned by `IngestionOrchestrator::ingest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    /// The project id this ingestion populated.
    pub project_id: String,
    /// The repository URL that was cloned.
    pub repo_url: String,
    /// Total files walked and dispatched to the chunker.
    pub files_processed: usize,
    /// Files that produced at least one code chunk.
    pub code_files: usize,
    /// Files that produced at least one documentation chunk.
    pub doc_files: usize,
    /// Total chunks upserted, split by kind.
    pub chunks_by_type: HashMap<String, usize>,
    /// Total nodes in the built graph.
    pub graph_nodes: usize,
    /// Total edges in the built graph.
    pub graph_edges: usize,
}

/// Statistics returned alongside a `SearchService::search` result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchStats {
    /// Number of distinct files that matched.
    pub hits_found: usize,
    /// Number of raw vector-store candidates considered.
    pub vector_results: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_chars() {
        assert_eq!(sanitize("my-project_1"), "my-project_1");
        assert_eq!(sanitize("github.com/a/b"), "github_com_a_b");
        assert_eq!(sanitize("a b/c"), "a_b_c");
    }

    #[test]
    fn project_id_display_is_sanitized() {
        let id = ProjectId::new("weird id/with:chars");
        assert_eq!(id.as_str(), "weird_id_with_chars");
        assert_eq!(id.to_string(), "weird_id_with_chars");
    }

    #[test]
    fn code_chunk_id_is_stable_for_same_inputs() {
        let a = Chunk::code_id("main.py", ChunkType::Function, "foo");
        let b = Chunk::code_id("main.py", ChunkType::Function, "foo");
        assert_eq!(a, b);
        let c = Chunk::code_id("main.py", ChunkType::Class, "foo");
        assert_ne!(a, c);
    }
}
