//! Decorates a project's persisted module tree with vector-search hits,
//! producing the search-overlay surface the server and CLI expose
//! directly to callers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AutoWikiError, AutoWikiResult};
use crate::graph::GraphService;
use crate::types::{ModuleTreeNode, ProjectId, SearchHit, SearchStats, VectorHit};
use crate::vector::VectorStore;

struct FileHits {
    best_distance: f32,
    chunks: Vec<SearchHit>,
}

/// Runs a semantic query and overlays the result onto the project's
/// persisted module tree.
pub struct SearchService {
    graph: Arc<GraphService>,
    vector: Arc<VectorStore>,
}

impl SearchService {
    /// Create a search service sharing the given graph and vector services.
    pub fn new(graph: Arc<GraphService>, vector: Arc<VectorStore>) -> Self {
        Self { graph, vector }
    }

    /// Query `project_id` for `query`, returning the decorated module tree
    /// and summary stats. Fails with `TreeMissing` if the project has
    /// never been ingested (or its tree was since cleared).
    pub fn search(
        &self,
        project_id: &ProjectId,
        query: &str,
        limit: usize,
    ) -> AutoWikiResult<(ModuleTreeNode, SearchStats)> {
        let candidates = self.vector.query(project_id, query, limit.saturating_mul(3))?;
        let vector_results = candidates.len();
        let by_file = group_by_file(candidates);
        let hits_found = by_file.len();

        let mut tree = self
            .graph
            .load_tree(project_id)
            .ok_or_else(|| AutoWikiError::TreeMissing(project_id.as_str().to_string()))?;

        decorate(&mut tree, &by_file);

        Ok((tree, SearchStats { hits_found, vector_results }))
    }

    /// Raw vector hits, with no tree overlay. Used as a fallback when the
    /// project has no persisted tree yet.
    pub fn search_raw(&self, project_id: &ProjectId, query: &str, limit: usize) -> AutoWikiResult<Vec<VectorHit>> {
        self.vector.query(project_id, query, limit)
    }
}

fn group_by_file(candidates: Vec<VectorHit>) -> HashMap<String, FileHits> {
    let mut by_file: HashMap<String, FileHits> = HashMap::new();
    for hit in candidates {
        let chunk = SearchHit {
            id: hit.id,
            content: hit.content,
            distance: hit.distance,
            start_line: hit.metadata.start_line,
            end_line: hit.metadata.end_line,
        };
        let file_path = hit.metadata.file_path;

        by_file
            .entry(file_path)
            .and_modify(|entry| {
                entry.best_distance = entry.best_distance.min(chunk.distance);
                entry.chunks.push(chunk.clone());
            })
            .or_insert_with(|| FileHits {
                best_distance: chunk.distance,
                chunks: vec![chunk],
            });
    }
    by_file
}

/// Returns whether this node (or a descendant) is active, setting the
/// hit fields on file nodes and `is_active` on both kinds along the way.
fn decorate(node: &mut ModuleTreeNode, by_file: &HashMap<String, FileHits>) -> bool {
    let mut active = false;

    for child in &mut node.children {
        if decorate(child, by_file) {
            active = true;
        }
    }

    if let Some(hits) = by_file.get(&node.id) {
        node.is_hit = Some(true);
        node.search_score = Some(hits.best_distance);
        node.matched_chunks = Some(hits.chunks.clone());
        active = true;
    }

    if active {
        node.is_active = Some(true);
    }
    active
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::embedder::HashingEmbedder;
    use crate::graph::GraphService;
    use crate::types::{ClassInfo, FileStructure};
    use crate::vector::VectorStore;

    fn services() -> (Arc<GraphService>, Arc<VectorStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.base_dir = dir.path().to_path_buf();
        let embedder = Arc::new(HashingEmbedder::new(32));
        (
            Arc::new(GraphService::new(&config)),
            Arc::new(VectorStore::new(&config, embedder)),
            dir,
        )
    }

    fn structure(file_path: &str) -> FileStructure {
        FileStructure {
            file_path: file_path.to_string(),
            imports: Vec::new(),
            classes: vec![ClassInfo {
                name: "Parser".into(),
                bases: Vec::new(),
                start_line: 0,
                end_line: 10,
                source: "class Parser:\n    pass\n".into(),
            }],
            functions: Vec::new(),
        }
    }

    #[test]
    fn search_without_tree_fails_with_tree_missing() {
        let (graph, vector, _dir) = services();
        let service = SearchService::new(graph, vector);
        let project = ProjectId::new("p1");

        let err = service.search(&project, "parser", 5).unwrap_err();
        assert!(matches!(err, AutoWikiError::TreeMissing(_)));
    }

    #[test]
    fn search_decorates_matching_file_and_ancestors() {
        let (graph, vector, _dir) = services();
        let project = ProjectId::new("p1");

        graph.add_file(&project, &structure("backend/services/parser.py")).expect("add file");
        graph.add_file(&project, &structure("backend/services/unrelated.py")).expect("add file");
        graph.build_edges(&project).expect("build edges");
        graph.build_module_tree(&project).expect("build tree");
        graph.persist(&project).expect("persist");

        use crate::types::{Chunk, ChunkMetadata, ChunkType};
        vector
            .upsert(
                &project,
                &[Chunk {
                    id: "c1".into(),
                    content: "class Parser:\n    pass\n".into(),
                    metadata: ChunkMetadata {
                        name: "Parser".into(),
                        chunk_type: ChunkType::Class,
                        file_path: "backend/services/parser.py".into(),
                        language: "python".into(),
                        start_line: 0,
                        end_line: 10,
                    },
                }],
            )
            .expect("upsert");

        let service = SearchService::new(graph, vector);
        let (tree, stats) = service.search(&project, "Parser", 5).expect("search");

        assert_eq!(stats.hits_found, 1);
        assert_eq!(stats.vector_results, 1);
        assert_eq!(tree.is_active, Some(true));

        let backend = tree.children.iter().find(|c| c.name == "backend").expect("backend folder");
        assert_eq!(backend.is_active, Some(true));
        let services_folder = backend.children.iter().find(|c| c.name == "services").expect("services folder");
        let parser_file = services_folder
            .children
            .iter()
            .find(|c| c.name == "parser.py")
            .expect("parser.py file");
        assert_eq!(parser_file.is_hit, Some(true));
        assert!(parser_file.matched_chunks.as_ref().expect("matched chunks").len() == 1);

        let unrelated = services_folder
            .children
            .iter()
            .find(|c| c.name == "unrelated.py")
            .expect("unrelated.py file");
        assert_eq!(unrelated.is_hit, None);
        assert_eq!(unrelated.is_active, None);
    }
}
