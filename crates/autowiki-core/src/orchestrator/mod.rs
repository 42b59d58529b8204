//! Drives the full ingestion pipeline end-to-end:
//! clone, clear prior state, walk, chunk, feed the graph and vector
//! store, then build and persist the module tree.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use crate::chunker;
use crate::config::Config;
use crate::error::{AutoWikiError, AutoWikiResult};
use crate::graph::GraphService;
use crate::types::{ChunkType, IngestStats, ProjectId};
use crate::vector::VectorStore;

/// Orchestrates cloning, walking, chunking, and persisting one project's
/// ingestion. Holds per-project locks so concurrent ingestion of the
/// same project cannot happen.
pub struct IngestionOrchestrator {
    config: Config,
    graph: Arc<GraphService>,
    vector: Arc<VectorStore>,
    locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl IngestionOrchestrator {
    /// Create an orchestrator sharing the given graph and vector services.
    pub fn new(config: Config, graph: Arc<GraphService>, vector: Arc<VectorStore>) -> Self {
        Self {
            config,
            graph,
            vector,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, project_id: &ProjectId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .entry(project_id.as_str().to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Clone `repo_url`, clear any prior state for `project_id` (or a
    /// freshly generated one), walk the clone, and build the graph,
    /// vector collection, and module tree. The temporary clone is always
    /// removed, on every exit path.
    pub async fn ingest(
        &self,
        repo_url: &str,
        project_id: Option<String>,
    ) -> AutoWikiResult<IngestStats> {
        if repo_url.trim().is_empty() {
            return Err(AutoWikiError::InputError("repo_url must not be empty".into()));
        }
        if let Some(raw) = &project_id {
            if raw.trim().is_empty() {
                return Err(AutoWikiError::InputError("project_id must not be empty".into()));
            }
        }

        let project_id = ProjectId::new(project_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()));
        let lock = self.lock_for(&project_id);
        let _guard = lock.lock().await;

        self.vector.delete_collection(&project_id)?;
        self.graph.delete_graph(&project_id)?;

        let clone_dir = tempfile::TempDir::new()?;
        let clone_dest = clone_dir.path().to_path_buf();
        let repo_url_owned = repo_url.to_string();

        tokio::task::spawn_blocking(move || clone_repo(&repo_url_owned, &clone_dest))
            .await
            .map_err(|e| AutoWikiError::ExternalError(format!("clone task panicked: {e}")))??;

        let config = self.config.clone();
        let graph = Arc::clone(&self.graph);
        let vector = Arc::clone(&self.vector);
        let project_id_owned = project_id.clone();
        let repo_root = clone_dir.path().to_path_buf();
        let repo_url_owned = repo_url.to_string();

        let stats = tokio::task::spawn_blocking(move || {
            index_directory(&config, &graph, &vector, &project_id_owned, &repo_root, &repo_url_owned)
        })
        .await
        .map_err(|e| AutoWikiError::ExternalError(format!("ingestion task panicked: {e}")))??;

        // `clone_dir` drops here regardless of outcome above, removing the
        // temporary working directory on every exit path.
        Ok(stats)
    }
}

fn clone_repo(repo_url: &str, dest: &Path) -> AutoWikiResult<()> {
    let mut fetch_options = git2::FetchOptions::new();
    fetch_options.depth(1);
    git2::build::RepoBuilder::new()
        .fetch_options(fetch_options)
        .clone(repo_url, dest)
        .map(|_| ())
        .map_err(AutoWikiError::Git)
}

/// Walk `repo_root`, chunk every non-ignored file, and feed the graph and
/// vector services. Synchronous and side-effect-pure enough to unit test
/// directly against a plain directory (no git involved).
fn index_directory(
    config: &Config,
    graph: &GraphService,
    vector: &VectorStore,
    project_id: &ProjectId,
    repo_root: &Path,
    repo_url: &str,
) -> AutoWikiResult<IngestStats> {
    let mut files = Vec::new();
    walk_files(repo_root, repo_root, &config.indexing.ignore_names, &mut files)?;

    let mut all_chunks = Vec::new();
    let mut files_processed = 0usize;
    let mut code_files = 0usize;
    let mut doc_files = 0usize;
    let mut chunks_by_type: HashMap<String, usize> = HashMap::new();

    for (abs_path, rel_path) in files {
        let (chunks, structure) = chunker::chunk_and_structure(&abs_path, &rel_path, config);
        if chunks.is_empty() && structure.is_none() {
            continue;
        }

        if !chunks.is_empty() {
            files_processed += 1;
            let is_doc_file = chunks.iter().any(|c| c.metadata.chunk_type == ChunkType::Documentation);
            if is_doc_file {
                doc_files += 1;
            } else {
                code_files += 1;
            }

            for chunk in &chunks {
                *chunks_by_type.entry(chunk.metadata.chunk_type.id_tag().to_string()).or_insert(0) += 1;
            }
        }

        if let Some(structure) = structure {
            graph.add_file(project_id, &structure)?;
        }

        all_chunks.extend(chunks);
    }

    vector.upsert(project_id, &all_chunks)?;
    graph.build_edges(project_id)?;
    graph.build_module_tree(project_id)?;
    graph.persist(project_id)?;

    Ok(IngestStats {
        project_id: project_id.as_str().to_string(),
        repo_url: repo_url.to_string(),
        files_processed,
        code_files,
        doc_files,
        chunks_by_type,
        graph_nodes: graph.node_count(project_id),
        graph_edges: graph.edge_count(project_id),
    })
}

/// Recursively collect `(abs_path, rel_path)` pairs for every file not
/// matching the ignore set, pruning directories whose name matches it or
/// begins with `.`.
fn walk_files(
    root: &Path,
    current: &Path,
    ignore_names: &[String],
    out: &mut Vec<(PathBuf, String)>,
) -> AutoWikiResult<()> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || ignore_names.iter().any(|ignored| ignored == &name) {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk_files(root, &path, ignore_names, out)?;
        } else if file_type.is_file() {
            let rel_path = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.push((path, rel_path));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;

    fn services(config: &Config) -> (GraphService, VectorStore) {
        let embedder = Arc::new(HashingEmbedder::new(32));
        (GraphService::new(config), VectorStore::new(config, embedder))
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, content).expect("write file");
    }

    #[test]
    fn indexes_code_and_doc_files_and_builds_graph() {
        let repo = tempfile::tempdir().expect("repo dir");
        write(repo.path(), "main.py", "import utils\n\ndef main():\n    pass\n");
        write(repo.path(), "utils.py", "def helper():\n    pass\n");
        write(repo.path(), "README.md", "# Title\nDocs.");
        write(repo.path(), ".git/HEAD", "ref: refs/heads/main");
        write(repo.path(), "node_modules/pkg/index.js", "module.exports = {};");

        let state = tempfile::tempdir().expect("state dir");
        let mut config = Config::default();
        config.base_dir = state.path().to_path_buf();
        let (graph, vector) = services(&config);
        let project_id = ProjectId::new("p1");

        let stats = index_directory(&config, &graph, &vector, &project_id, repo.path(), "https://example.com/repo.git")
            .expect("index directory");

        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.code_files, 2);
        assert_eq!(stats.doc_files, 1);
        assert_eq!(stats.project_id, "p1");
        assert!(stats.graph_nodes > 0);
        assert_eq!(stats.graph_edges, 1);

        let hits = vector.query(&project_id, "helper", 5).expect("query");
        assert!(!hits.is_empty());
    }

    #[test]
    fn import_only_file_contributes_to_graph_but_not_file_stats() {
        let repo = tempfile::tempdir().expect("repo dir");
        write(repo.path(), "pkg/__init__.py", "from . import app\n");
        write(repo.path(), "pkg/app.py", "def run():\n    pass\n");

        let state = tempfile::tempdir().expect("state dir");
        let mut config = Config::default();
        config.base_dir = state.path().to_path_buf();
        let (graph, vector) = services(&config);
        let project_id = ProjectId::new("p3");

        let stats = index_directory(&config, &graph, &vector, &project_id, repo.path(), "https://example.com/repo.git")
            .expect("index directory");

        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.code_files, 1);
        assert_eq!(stats.doc_files, 0);

        let tree = graph.load_tree(&project_id).expect("tree present");
        let pkg = tree.children.iter().find(|c| c.name == "pkg").expect("pkg folder");
        assert!(pkg.children.iter().any(|c| c.name == "__init__.py"));
    }

    #[test]
    fn ignored_directories_are_pruned() {
        let repo = tempfile::tempdir().expect("repo dir");
        write(repo.path(), "src/app.py", "def run():\n    pass\n");
        write(repo.path(), "__pycache__/app.cpython-311.pyc", "garbage");
        write(repo.path(), ".venv/lib/site.py", "garbage = 1");

        let state = tempfile::tempdir().expect("state dir");
        let mut config = Config::default();
        config.base_dir = state.path().to_path_buf();
        let (graph, vector) = services(&config);
        let project_id = ProjectId::new("p2");

        let stats = index_directory(&config, &graph, &vector, &project_id, repo.path(), "https://example.com/repo.git")
            .expect("index directory");

        assert_eq!(stats.files_processed, 1);
    }

    #[test]
    fn reingesting_with_different_content_yields_only_new_content() {
        let repo_a = tempfile::tempdir().expect("repo a");
        write(repo_a.path(), "main.py", "class A:\n    pass\n");

        let repo_b = tempfile::tempdir().expect("repo b");
        write(repo_b.path(), "main.py", "class B:\n    pass\n");

        let state = tempfile::tempdir().expect("state dir");
        let mut config = Config::default();
        config.base_dir = state.path().to_path_buf();
        let (graph, vector) = services(&config);
        let project_id = ProjectId::new("shared");

        index_directory(&config, &graph, &vector, &project_id, repo_a.path(), "url").expect("first ingest");
        graph.delete_graph(&project_id).expect("clear graph");
        vector.delete_collection(&project_id).expect("clear vector");
        index_directory(&config, &graph, &vector, &project_id, repo_b.path(), "url").expect("second ingest");

        let tree = graph.load_tree(&project_id).expect("tree present");
        let main = tree.children.iter().find(|c| c.name == "main.py").expect("main.py node");
        assert_eq!(main.name, "main.py");
        assert_eq!(graph.node_count(&project_id), 2); // FILE + class B only
    }
}
