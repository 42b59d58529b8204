//! Per-project dependency graph, importance ranking, and module tree
//! construction. The most intricate component:
//! `addFile` must run for every file before `buildEdges`, which must run
//! before `buildModuleTree`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;

use dashmap::DashMap;
use parking_lot::Mutex;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AutoWikiResult;
use crate::types::{
    EdgeKind, FileStructure, GraphEdge, GraphNode, ModuleTreeNode, NodeAttrs, NodeKind, ProjectId,
    TreeNodeKind,
};

struct ProjectGraph {
    graph: DiGraph<GraphNode, EdgeKind>,
    node_index: HashMap<String, NodeIndex>,
    file_map: HashMap<String, String>,
    tree: Option<ModuleTreeNode>,
}

impl ProjectGraph {
    fn empty() -> Self {
        Self {
            graph: DiGraph::new(),
            node_index: HashMap::new(),
            file_map: HashMap::new(),
            tree: None,
        }
    }

    fn upsert_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&node.id) {
            self.graph[idx] = node;
            idx
        } else {
            let id = node.id.clone();
            let idx = self.graph.add_node(node);
            self.node_index.insert(id, idx);
            idx
        }
    }

    fn add_edge_once(&mut self, source: NodeIndex, target: NodeIndex, kind: EdgeKind) {
        let exists = self
            .graph
            .edges_connecting(source, target)
            .any(|e| *e.weight() == kind);
        if !exists {
            self.graph.add_edge(source, target, kind);
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

/// Builds and persists one dependency graph and module tree per project.
pub struct GraphService {
    base_dir: PathBuf,
    projects: DashMap<String, Mutex<ProjectGraph>>,
}

impl GraphService {
    /// Create a service rooted at `config.graphs_dir()`.
    pub fn new(config: &Config) -> Self {
        Self {
            base_dir: config.graphs_dir(),
            projects: DashMap::new(),
        }
    }

    fn graph_path(&self, project_id: &ProjectId) -> PathBuf {
        self.base_dir.join(format!("{}.json", project_id.as_str()))
    }

    fn tree_path(&self, project_id: &ProjectId) -> PathBuf {
        self.base_dir
            .join(format!("{}_tree.json", project_id.as_str()))
    }

    /// Load the persisted graph from disk, or start fresh if absent or
    /// unreadable (a load error is recovered as an empty graph).
    fn load(&self, project_id: &ProjectId) -> ProjectGraph {
        let mut project = ProjectGraph::empty();

        if let Ok(content) = std::fs::read_to_string(self.graph_path(project_id)) {
            if let Ok(persisted) = serde_json::from_str::<PersistedGraph>(&content) {
                for node in persisted.nodes {
                    if node.kind == NodeKind::File {
                        register_file_map(&mut project.file_map, &node.id);
                    }
                    project.upsert_node(node);
                }
                for edge in persisted.edges {
                    if let (Some(&source), Some(&target)) = (
                        project.node_index.get(&edge.source_id),
                        project.node_index.get(&edge.target_id),
                    ) {
                        project.add_edge_once(source, target, edge.kind);
                    }
                }
            } else {
                tracing::warn!(project_id = %project_id, "failed to parse persisted graph, starting fresh");
            }
        }

        if let Ok(content) = std::fs::read_to_string(self.tree_path(project_id)) {
            project.tree = serde_json::from_str(&content).ok();
        }

        project
    }

    fn project_entry<'a>(
        &'a self,
        project_id: &ProjectId,
    ) -> dashmap::mapref::one::Ref<'a, String, Mutex<ProjectGraph>> {
        let key = project_id.as_str().to_string();
        if !self.projects.contains_key(&key) {
            let loaded = self.load(project_id);
            self.projects.entry(key.clone()).or_insert_with(|| Mutex::new(loaded));
        }
        self.projects.get(&key).expect("just inserted")
    }

    /// Add a file's parsed structure to the project's graph: a FILE node,
    /// a file-map registration, and one DEFINES-linked node per class and
    /// function. Must be called once per file before `build_edges`.
    pub fn add_file(&self, project_id: &ProjectId, structure: &FileStructure) -> AutoWikiResult<()> {
        let entry = self.project_entry(project_id);
        let mut project = entry.lock();

        let file_idx = project.upsert_node(GraphNode {
            id: structure.file_path.clone(),
            kind: NodeKind::File,
            attributes: NodeAttrs {
                imports: structure.imports.clone(),
                ..Default::default()
            },
        });
        register_file_map(&mut project.file_map, &structure.file_path);

        for class in &structure.classes {
            let symbol_idx = project.upsert_node(GraphNode {
                id: format!("{}::{}", structure.file_path, class.name),
                kind: NodeKind::Class,
                attributes: NodeAttrs {
                    bases: class.bases.clone(),
                    start_line: Some(class.start_line),
                    end_line: Some(class.end_line),
                    ..Default::default()
                },
            });
            project.add_edge_once(file_idx, symbol_idx, EdgeKind::Defines);
        }

        for func in &structure.functions {
            let symbol_idx = project.upsert_node(GraphNode {
                id: format!("{}::{}", structure.file_path, func.name),
                kind: NodeKind::Function,
                attributes: NodeAttrs {
                    start_line: Some(func.start_line),
                    end_line: Some(func.end_line),
                    ..Default::default()
                },
            });
            project.add_edge_once(file_idx, symbol_idx, EdgeKind::Defines);
        }

        Ok(())
    }

    /// Resolve every FILE node's recorded imports into `IMPORTS` edges.
    /// Rebuilds the `IMPORTS` edge set wholesale, so repeated calls are
    /// idempotent. Must be called once after every `add_file` call.
    pub fn build_edges(&self, project_id: &ProjectId) -> AutoWikiResult<()> {
        let entry = self.project_entry(project_id);
        let mut project = entry.lock();

        project.graph.retain_edges(|g, e| {
            g.edge_weight(e).copied() != Some(EdgeKind::Imports)
        });

        let file_nodes: Vec<(NodeIndex, String, Vec<crate::types::ImportInfo>)> = project
            .graph
            .node_indices()
            .filter_map(|idx| {
                let node = &project.graph[idx];
                if node.kind == NodeKind::File {
                    Some((idx, node.id.clone(), node.attributes.imports.clone()))
                } else {
                    None
                }
            })
            .collect();

        for (source_idx, current_file, imports) in file_nodes {
            for imp in &imports {
                let Some(target_path) = resolve_import(&current_file, imp, &project.file_map) else {
                    continue;
                };
                if target_path == current_file {
                    continue;
                }
                let Some(&target_idx) = project.node_index.get(&target_path) else {
                    continue;
                };
                project.add_edge_once(source_idx, target_idx, EdgeKind::Imports);
            }
        }

        Ok(())
    }

    /// In-degree centrality normalized by `|V| - 1`, for every node in
    /// the graph. `{}` on an empty or single-node graph.
    pub fn node_importance(&self, project_id: &ProjectId) -> HashMap<String, f64> {
        let entry = self.project_entry(project_id);
        let project = entry.lock();

        let node_count = project.graph.node_count();
        if node_count <= 1 {
            return HashMap::new();
        }
        let denom = (node_count - 1) as f64;

        project
            .node_index
            .iter()
            .map(|(id, &idx)| {
                let in_degree = project.graph.neighbors_directed(idx, Direction::Incoming).count();
                (id.clone(), in_degree as f64 / denom)
            })
            .collect()
    }

    /// Build the sorted, directory-mirroring module tree from the
    /// project's current FILE nodes and cache it in memory. Call
    /// `persist` afterward to write it to disk.
    pub fn build_module_tree(&self, project_id: &ProjectId) -> AutoWikiResult<()> {
        let importance = self.node_importance(project_id);
        let entry = self.project_entry(project_id);
        let mut project = entry.lock();

        let mut root = ModuleTreeNode::folder(String::new(), String::new());
        let file_paths: Vec<String> = project
            .graph
            .node_weights()
            .filter(|n| n.kind == NodeKind::File)
            .map(|n| n.id.clone())
            .collect();

        for file_path in &file_paths {
            insert_file(&mut root, file_path, &importance);
        }
        sort_tree(&mut root);

        project.tree = Some(root);
        Ok(())
    }

    /// Write the graph (nodes + edges) and the module tree to disk.
    pub fn persist(&self, project_id: &ProjectId) -> AutoWikiResult<()> {
        let entry = self.project_entry(project_id);
        let project = entry.lock();

        std::fs::create_dir_all(&self.base_dir)?;

        let persisted = PersistedGraph {
            nodes: project.graph.node_weights().cloned().collect(),
            edges: project
                .graph
                .edge_references()
                .map(|e| GraphEdge {
                    source_id: project.graph[e.source()].id.clone(),
                    target_id: project.graph[e.target()].id.clone(),
                    kind: *e.weight(),
                })
                .collect(),
        };
        std::fs::write(self.graph_path(project_id), serde_json::to_string_pretty(&persisted)?)?;

        if let Some(tree) = &project.tree {
            std::fs::write(self.tree_path(project_id), serde_json::to_string_pretty(tree)?)?;
        }

        Ok(())
    }

    /// Load the persisted module tree for `project_id`, if any.
    pub fn load_tree(&self, project_id: &ProjectId) -> Option<ModuleTreeNode> {
        let entry = self.project_entry(project_id);
        entry.lock().tree.clone()
    }

    /// Total node count, for ingestion statistics.
    pub fn node_count(&self, project_id: &ProjectId) -> usize {
        self.project_entry(project_id).lock().graph.node_count()
    }

    /// Total edge count, for ingestion statistics.
    pub fn edge_count(&self, project_id: &ProjectId) -> usize {
        self.project_entry(project_id).lock().graph.edge_count()
    }

    /// Remove the project's graph and tree, in memory and on disk.
    pub fn delete_graph(&self, project_id: &ProjectId) -> AutoWikiResult<()> {
        self.projects.remove(project_id.as_str());
        let graph_path = self.graph_path(project_id);
        if graph_path.exists() {
            std::fs::remove_file(graph_path)?;
        }
        let tree_path = self.tree_path(project_id);
        if tree_path.exists() {
            std::fs::remove_file(tree_path)?;
        }
        Ok(())
    }
}

/// Register `dotted_module -> file_path` in the file-map, normalizing
/// separators and stripping a `.py` suffix. `__init__` modules also
/// register their package form.
fn register_file_map(file_map: &mut HashMap<String, String>, file_path: &str) {
    let stripped = file_path.strip_suffix(".py").unwrap_or(file_path);
    let dotted = stripped.replace('/', ".");
    file_map.insert(dotted.clone(), file_path.to_string());

    if let Some(package) = dotted.strip_suffix(".__init__") {
        file_map.insert(package.to_string(), file_path.to_string());
    }
}

/// Resolve one import to a file path in `file_map`, per the algorithm in
/// `Stdlib`/`ThirdParty` are never resolvable.
fn resolve_import(
    current_file: &str,
    imp: &crate::types::ImportInfo,
    file_map: &HashMap<String, String>,
) -> Option<String> {
    use crate::types::ImportKind;

    match imp.kind {
        ImportKind::Stdlib | ImportKind::ThirdParty => None,
        ImportKind::LocalAbsolute => file_map.get(&imp.module).cloned(),
        ImportKind::LocalRelative => {
            let mut pkg_parts = dirname_parts(current_file);

            let dots = imp.module.chars().take_while(|&c| c == '.').count();
            let rest = &imp.module[dots..];

            for _ in 0..dots.saturating_sub(1) {
                if pkg_parts.is_empty() {
                    break;
                }
                pkg_parts.pop();
            }

            if !rest.is_empty() {
                pkg_parts.extend(rest.split('.').map(str::to_string));
            }

            let candidate = pkg_parts.join(".");
            file_map.get(&candidate).cloned()
        }
    }
}

fn dirname_parts(file_path: &str) -> Vec<String> {
    let mut parts: Vec<&str> = file_path.split('/').collect();
    parts.pop();
    parts.into_iter().filter(|p| !p.is_empty()).map(str::to_string).collect()
}

/// Insert a file leaf into the tree, creating intermediate folder nodes
/// idempotently as needed.
fn insert_file(root: &mut ModuleTreeNode, file_path: &str, importance: &HashMap<String, f64>) {
    let parts: Vec<&str> = file_path.split('/').collect();
    let mut current = root;
    let mut prefix = String::new();

    for (i, part) in parts.iter().enumerate() {
        if i == parts.len() - 1 {
            let layer = classify_layer(file_path);
            let score = importance.get(file_path).copied().unwrap_or(0.0);
            current
                .children
                .push(ModuleTreeNode::file(file_path.to_string(), (*part).to_string(), layer, score));
        } else {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);

            let existing = current
                .children
                .iter()
                .position(|c| c.kind == TreeNodeKind::Folder && c.name == *part);
            let idx = existing.unwrap_or_else(|| {
                current.children.push(ModuleTreeNode::folder(prefix.clone(), (*part).to_string()));
                current.children.len() - 1
            });
            current = &mut current.children[idx];
        }
    }
}

/// Folders first (alphabetical), then files by `(layer ASC, -importance)`.
fn sort_tree(node: &mut ModuleTreeNode) {
    for child in &mut node.children {
        sort_tree(child);
    }
    node.children.sort_by(|a, b| match (a.kind, b.kind) {
        (TreeNodeKind::Folder, TreeNodeKind::File) => Ordering::Less,
        (TreeNodeKind::File, TreeNodeKind::Folder) => Ordering::Greater,
        (TreeNodeKind::Folder, TreeNodeKind::Folder) => a.name.cmp(&b.name),
        (TreeNodeKind::File, TreeNodeKind::File) => match a.layer.cmp(&b.layer) {
            Ordering::Equal => b
                .importance
                .partial_cmp(&a.importance)
                .unwrap_or(Ordering::Equal),
            other => other,
        },
    });
}

/// Rule order is exactly 0 -> 1 -> 3 -> 2 -> 4: layer 3 is checked before
/// layer 2 so low-level modules aren't misclassified as core logic.
fn classify_layer(path: &str) -> u8 {
    let lower = path.to_ascii_lowercase();

    if lower.ends_with(".md") || lower.contains("docs/") {
        0
    } else if lower.contains("api/")
        || lower.contains("routes")
        || lower.contains("main.py")
        || lower.contains("cli/")
        || lower.contains("app.py")
    {
        1
    } else if lower.contains("models/")
        || lower.contains("schemas")
        || lower.contains("utils/")
        || lower.contains("lib/")
        || lower.contains("common/")
        || lower.contains("types")
        || lower.contains("dto")
    {
        3
    } else if lower.contains("services/")
        || lower.contains("core/")
        || lower.contains("managers/")
        || lower.contains("logic/")
    {
        2
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassInfo, FunctionInfo, ImportInfo, ImportKind};

    fn config_in(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.base_dir = dir.path().to_path_buf();
        config
    }

    fn structure(file_path: &str, imports: Vec<ImportInfo>, class_name: Option<&str>) -> FileStructure {
        FileStructure {
            file_path: file_path.to_string(),
            imports,
            classes: class_name
                .map(|name| {
                    vec![ClassInfo {
                        name: name.to_string(),
                        bases: Vec::new(),
                        start_line: 0,
                        end_line: 1,
                        source: String::new(),
                    }]
                })
                .unwrap_or_default(),
            functions: Vec::new(),
        }
    }

    #[test]
    fn two_projects_with_same_file_name_stay_disjoint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = GraphService::new(&config_in(&dir));

        let a = ProjectId::new("project_a");
        let b = ProjectId::new("project_b");
        service.add_file(&a, &structure("main.py", Vec::new(), Some("A"))).expect("add a");
        service.add_file(&b, &structure("main.py", Vec::new(), Some("B"))).expect("add b");

        assert_eq!(service.node_count(&a), 2);
        assert_eq!(service.node_count(&b), 2);
    }

    #[test]
    fn absolute_import_resolves_to_edge() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = GraphService::new(&config_in(&dir));
        let project = ProjectId::new("p1");

        service.add_file(&project, &structure("utils.py", Vec::new(), None)).expect("add utils");
        service
            .add_file(
                &project,
                &structure(
                    "main.py",
                    vec![ImportInfo {
                        module: "utils".to_string(),
                        name: None,
                        alias: None,
                        kind: ImportKind::LocalAbsolute,
                    }],
                    None,
                ),
            )
            .expect("add main");

        service.build_edges(&project).expect("build edges");
        assert_eq!(service.edge_count(&project), 1);
    }

    #[test]
    fn relative_import_resolves_across_package() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = GraphService::new(&config_in(&dir));
        let project = ProjectId::new("p1");

        service
            .add_file(&project, &structure("backend/app/services/parser.py", Vec::new(), None))
            .expect("add parser");
        service
            .add_file(
                &project,
                &structure(
                    "backend/app/main.py",
                    vec![ImportInfo {
                        module: ".services.parser".to_string(),
                        name: Some("X".to_string()),
                        alias: None,
                        kind: ImportKind::LocalRelative,
                    }],
                    None,
                ),
            )
            .expect("add main");

        service.build_edges(&project).expect("build edges");
        assert_eq!(service.edge_count(&project), 1);
    }

    #[test]
    fn build_edges_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = GraphService::new(&config_in(&dir));
        let project = ProjectId::new("p1");

        service.add_file(&project, &structure("utils.py", Vec::new(), None)).expect("add utils");
        service
            .add_file(
                &project,
                &structure(
                    "main.py",
                    vec![ImportInfo {
                        module: "utils".to_string(),
                        name: None,
                        alias: None,
                        kind: ImportKind::LocalAbsolute,
                    }],
                    None,
                ),
            )
            .expect("add main");

        service.build_edges(&project).expect("build edges once");
        service.build_edges(&project).expect("build edges twice");
        assert_eq!(service.edge_count(&project), 1);
    }

    #[test]
    fn tree_orders_docs_before_folders_and_by_layer_within_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = GraphService::new(&config_in(&dir));
        let project = ProjectId::new("p1");

        service.add_file(&project, &structure("README.md", Vec::new(), None)).expect("add readme");
        service.add_file(&project, &structure("main.py", Vec::new(), None)).expect("add main");
        service.add_file(&project, &structure("utils.py", Vec::new(), None)).expect("add utils");

        service.build_edges(&project).expect("build edges");
        service.build_module_tree(&project).expect("build tree");
        service.persist(&project).expect("persist");

        let tree = service.load_tree(&project).expect("tree present");
        let names: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["README.md", "main.py", "utils.py"]);
    }

    #[test]
    fn delete_graph_removes_persisted_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = GraphService::new(&config_in(&dir));
        let project = ProjectId::new("p1");

        service.add_file(&project, &structure("main.py", Vec::new(), None)).expect("add main");
        service.build_module_tree(&project).expect("build tree");
        service.persist(&project).expect("persist");
        assert!(service.graph_path(&project).exists());

        service.delete_graph(&project).expect("delete");
        assert!(!service.graph_path(&project).exists());
        assert!(!service.tree_path(&project).exists());
        assert_eq!(service.node_count(&project), 0);
    }
}
