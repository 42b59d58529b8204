//! Pluggable embedding providers.
//!
//! `VectorStore` is constructed with a `dyn EmbeddingProvider` rather than
//! reaching for a concrete model, so the store's only outbound
//! collaboration point is this trait. The default provider is a
//! deterministic, dependency-free hashing embedder that needs no network
//! access or model download; an ONNX-backed provider is available behind
//! the `onnx` feature for real semantic quality.

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::OnnxEmbeddingProvider;

/// Turns chunk text into a fixed-size embedding vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single piece of text.
    fn embed(&self, text: &str) -> Vec<f32>;

    /// The dimensionality of vectors this provider produces.
    fn dimensions(&self) -> usize;
}

/// Deterministic embedder with no external dependencies: hashes
/// overlapping token shingles into buckets of a fixed-size vector, then
/// L2-normalizes. Same input always yields the same vector, and textual
/// similarity roughly tracks shared-token overlap, which is enough to
/// exercise the full pipeline (ranking, search overlay) without a real
/// model.
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create a hashing embedder that produces vectors of `dimensions` length.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        for token in text.split_whitespace() {
            let token = token.to_ascii_lowercase();
            let bucket = fnv1a(token.as_bytes()) as usize % self.dimensions;
            vector[bucket] += 1.0;
        }

        l2_normalize(&mut vector);
        vector
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// FNV-1a hash, used only to bucket tokens; not security-sensitive.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Normalize a vector to unit length in place. A zero vector is left as-is.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector {
            *v /= norm;
        }
    }
}
