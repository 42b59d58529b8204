//! Per-project vector store: a brute-force cosine-similarity index,
//! persisted as one JSON file per collection.
//!
//! Rather than depend on an always-on external vector database process,
//! state lives in-process and on disk under `<base>/chromadb/`, loaded
//! lazily into a `DashMap`-backed per-collection cache on first access.

use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::embedder::EmbeddingProvider;
use crate::error::AutoWikiResult;
use crate::types::{Chunk, ChunkMetadata, ProjectId, VectorHit, VectorStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    id: String,
    content: String,
    metadata: ChunkMetadata,
    vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Collection {
    dimension: usize,
    entries: Vec<Entry>,
}

impl Collection {
    fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    fn upsert(&mut self, entry: Entry) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }
}

/// Per-project semantic index over chunk content.
pub struct VectorStore {
    base_dir: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    collections: DashMap<String, Mutex<Collection>>,
}

impl VectorStore {
    /// Create a store rooted at `config.vector_dir()`, using `embedder`
    /// for every upsert/query embedding call.
    pub fn new(config: &Config, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            base_dir: config.vector_dir(),
            embedder,
            collections: DashMap::new(),
        }
    }

    fn collection_name(project_id: &ProjectId) -> String {
        format!("autowiki_{}", project_id.as_str())
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.json"))
    }

    fn load(&self, name: &str) -> Collection {
        let path = self.path_for(name);
        std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_else(|| Collection::empty(self.embedder.dimensions()))
    }

    fn save(&self, name: &str, collection: &Collection) -> AutoWikiResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        let content = serde_json::to_string_pretty(collection)?;
        std::fs::write(self.path_for(name), content)?;
        Ok(())
    }

    /// Insert or replace `chunks` in `project_id`'s collection, keyed by
    /// `Chunk::id`. Writes the collection back to disk.
    pub fn upsert(&self, project_id: &ProjectId, chunks: &[Chunk]) -> AutoWikiResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let name = Self::collection_name(project_id);
        let guard = self
            .collections
            .entry(name.clone())
            .or_insert_with(|| Mutex::new(self.load(&name)));
        let mut collection = guard.lock();

        for chunk in chunks {
            let vector = self.embedder.embed(&chunk.content);
            collection.upsert(Entry {
                id: chunk.id.clone(),
                content: chunk.content.clone(),
                metadata: chunk.metadata.clone(),
                vector,
            });
        }

        self.save(&name, &collection)
    }

    /// Query the top `k` nearest entries to `text` by ascending cosine
    /// distance. Empty results (not an error) when the collection is
    /// absent on disk and not yet cached.
    pub fn query(&self, project_id: &ProjectId, text: &str, k: usize) -> AutoWikiResult<Vec<VectorHit>> {
        let name = Self::collection_name(project_id);
        if !self.collections.contains_key(&name) && !self.path_for(&name).exists() {
            return Ok(Vec::new());
        }

        let guard = self
            .collections
            .entry(name.clone())
            .or_insert_with(|| Mutex::new(self.load(&name)));
        let collection = guard.lock();

        let query_vector = self.embedder.embed(text);
        let mut scored: Vec<(f32, &Entry)> = collection
            .entries
            .iter()
            .map(|entry| (cosine_distance(&query_vector, &entry.vector), entry))
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, entry)| VectorHit {
                id: entry.id.clone(),
                content: entry.content.clone(),
                metadata: entry.metadata.clone(),
                distance,
            })
            .collect())
    }

    /// Remove all entries but keep the collection. Returns the prior count.
    pub fn clear(&self, project_id: &ProjectId) -> AutoWikiResult<usize> {
        let name = Self::collection_name(project_id);
        let guard = self
            .collections
            .entry(name.clone())
            .or_insert_with(|| Mutex::new(self.load(&name)));
        let mut collection = guard.lock();
        let prior_count = collection.entries.len();
        collection.entries.clear();
        self.save(&name, &collection)?;
        Ok(prior_count)
    }

    /// Remove the collection entirely, in memory and on disk. Idempotent.
    pub fn delete_collection(&self, project_id: &ProjectId) -> AutoWikiResult<()> {
        let name = Self::collection_name(project_id);
        self.collections.remove(&name);
        let path = self.path_for(&name);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Current entry count for `project_id`'s collection.
    pub fn stats(&self, project_id: &ProjectId) -> AutoWikiResult<VectorStats> {
        let name = Self::collection_name(project_id);
        if !self.collections.contains_key(&name) && !self.path_for(&name).exists() {
            return Ok(VectorStats { count: 0 });
        }
        let guard = self
            .collections
            .entry(name.clone())
            .or_insert_with(|| Mutex::new(self.load(&name)));
        let collection = guard.lock();
        Ok(VectorStats {
            count: collection.entries.len(),
        })
    }
}

/// `1 - cosine_similarity`, so ascending distance means more relevant.
/// A zero vector on either side yields maximal distance (`1.0`) rather
/// than dividing by zero.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (dot / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;
    use crate::types::{Chunk, ChunkMetadata, ChunkType};

    fn test_store() -> (VectorStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.base_dir = dir.path().to_path_buf();
        let embedder = Arc::new(HashingEmbedder::new(32));
        (VectorStore::new(&config, embedder), dir)
    }

    fn chunk(id: &str, content: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            content: content.to_string(),
            metadata: ChunkMetadata {
                name: "foo".into(),
                chunk_type: ChunkType::Function,
                file_path: "main.py".into(),
                language: "python".into(),
                start_line: 0,
                end_line: 1,
            },
        }
    }

    #[test]
    fn query_on_missing_collection_is_empty_not_error() {
        let (store, _dir) = test_store();
        let project = ProjectId::new("missing");
        let hits = store.query(&project, "anything", 5).expect("query");
        assert!(hits.is_empty());
        assert_eq!(store.stats(&project).expect("stats").count, 0);
    }

    #[test]
    fn upsert_then_query_finds_the_chunk() {
        let (store, _dir) = test_store();
        let project = ProjectId::new("p1");
        store
            .upsert(&project, &[chunk("c1", "def parse_config(): pass")])
            .expect("upsert");

        let hits = store.query(&project, "parse_config", 5).expect("query");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "c1");
        assert_eq!(store.stats(&project).expect("stats").count, 1);
    }

    #[test]
    fn upsert_replaces_existing_id() {
        let (store, _dir) = test_store();
        let project = ProjectId::new("p1");
        store.upsert(&project, &[chunk("c1", "version one")]).expect("upsert");
        store.upsert(&project, &[chunk("c1", "version two")]).expect("upsert");

        assert_eq!(store.stats(&project).expect("stats").count, 1);
        let hits = store.query(&project, "version two", 1).expect("query");
        assert_eq!(hits[0].content, "version two");
    }

    #[test]
    fn clear_empties_collection_and_returns_prior_count() {
        let (store, _dir) = test_store();
        let project = ProjectId::new("p1");
        store
            .upsert(&project, &[chunk("c1", "a"), chunk("c2", "b")])
            .expect("upsert");

        let prior = store.clear(&project).expect("clear");
        assert_eq!(prior, 2);
        assert_eq!(store.stats(&project).expect("stats").count, 0);
    }

    #[test]
    fn delete_collection_is_idempotent() {
        let (store, _dir) = test_store();
        let project = ProjectId::new("p1");
        store.upsert(&project, &[chunk("c1", "a")]).expect("upsert");

        store.delete_collection(&project).expect("delete");
        store.delete_collection(&project).expect("delete again");
        assert_eq!(store.stats(&project).expect("stats").count, 0);
    }

    #[test]
    fn two_projects_have_disjoint_collections() {
        let (store, _dir) = test_store();
        let a = ProjectId::new("project_a");
        let b = ProjectId::new("project_b");
        store.upsert(&a, &[chunk("c1", "alpha")]).expect("upsert a");
        store.upsert(&b, &[chunk("c1", "beta")]).expect("upsert b");

        assert_eq!(store.stats(&a).expect("stats").count, 1);
        assert_eq!(store.stats(&b).expect("stats").count, 1);
        let hits_a = store.query(&a, "alpha", 5).expect("query a");
        assert_eq!(hits_a[0].content, "alpha");
    }
}
