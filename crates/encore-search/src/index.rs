//! Semantic index over setlist summaries.
//!
//! [`VectorIndex`] pairs an [`Embedder`] with a [`SqliteVectorStore`].
//! Bulk loads go through [`VectorIndex::add_batch`], which embeds in
//! chunks and falls back to one-by-one inserts when a chunk fails, so a
//! single bad document never sinks the rest of the load.

use std::collections::HashSet;
use std::sync::Arc;

use crate::embedder::Embedder;
use crate::error::{ProviderResult, SearchResult};
use crate::store::{SqliteVectorStore, VectorRecord};

/// Documents embedded per provider call during bulk loads.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// A search match with both raw distance and derived similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarSetlist {
    pub id: String,
    /// Cosine distance in `[0, 2]`.
    pub distance: f64,
    /// `1 - distance / 2`, in `[0, 1]`.
    pub similarity: f64,
    pub document: String,
}

/// Outcome of a bulk load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub added: usize,
    pub failed_ids: Vec<String>,
    /// Chunks that had to be retried record by record.
    pub fallback_chunks: usize,
}

/// Map a cosine distance onto `[0, 1]`, where 1 means identical.
#[must_use]
pub fn similarity_from_distance(distance: f64) -> f64 {
    1.0 - distance / 2.0
}

#[derive(Debug)]
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    store: SqliteVectorStore,
    batch_size: usize,
}

impl VectorIndex {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, store: SqliteVectorStore) -> Self {
        Self {
            embedder,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the bulk-load chunk size. Zero is treated as one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed `text`. Provider failures are logged and returned, never
    /// turned into a placeholder vector.
    pub async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        self.embedder.embed(text).await.inspect_err(|e| {
            log::warn!("Embedding failed: {e}");
        })
    }

    /// Embed and store one document.
    pub async fn add(&self, id: &str, text: &str) -> SearchResult<()> {
        let embedding = self.embed(text).await?;
        self.store.add(&[VectorRecord {
            id: id.to_string(),
            embedding,
            document: text.to_string(),
        }])
    }

    /// Embed and store `(id, text)` pairs in chunks.
    ///
    /// Each chunk is embedded with one provider call and stored
    /// atomically. When either step fails, the chunk is retried one
    /// document at a time; documents that still fail are reported in
    /// [`BatchReport::failed_ids`].
    pub async fn add_batch(&self, documents: &[(String, String)]) -> BatchReport {
        let mut report = BatchReport::default();
        let chunks = documents.len().div_ceil(self.batch_size);

        for (n, chunk) in documents.chunks(self.batch_size).enumerate() {
            log::info!(
                "Indexing chunk {}/{chunks} ({} documents)",
                n + 1,
                chunk.len()
            );
            match self.add_chunk(chunk).await {
                Ok(()) => report.added += chunk.len(),
                Err(e) => {
                    log::warn!("Chunk {} failed, retrying one by one: {e}", n + 1);
                    report.fallback_chunks += 1;
                    for (id, text) in chunk {
                        match self.add(id, text).await {
                            Ok(()) => report.added += 1,
                            Err(e) => {
                                log::warn!("Could not index {id}: {e}");
                                report.failed_ids.push(id.clone());
                            }
                        }
                    }
                }
            }
        }

        report
    }

    async fn add_chunk(&self, chunk: &[(String, String)]) -> SearchResult<()> {
        let texts: Vec<String> = chunk.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunk.len() {
            return Err(crate::error::ProviderError::CountMismatch {
                provider: "embedder".to_string(),
                expected: chunk.len(),
                got: embeddings.len(),
            }
            .into());
        }

        let records: Vec<VectorRecord> = chunk
            .iter()
            .zip(embeddings)
            .map(|((id, text), embedding)| VectorRecord {
                id: id.clone(),
                embedding,
                document: text.clone(),
            })
            .collect();
        self.store.add(&records)
    }

    /// The `k` documents nearest to `query`, most similar first.
    pub async fn search_similar(&self, query: &str, k: usize) -> SearchResult<Vec<SimilarSetlist>> {
        let embedding = self.embed(query).await?;
        let hits = self.store.query(&embedding, k)?;
        Ok(hits
            .into_iter()
            .map(|hit| SimilarSetlist {
                similarity: similarity_from_distance(hit.distance),
                distance: hit.distance,
                id: hit.id,
                document: hit.document,
            })
            .collect())
    }

    pub fn count(&self) -> SearchResult<u64> {
        self.store.count()
    }

    pub fn indexed_ids(&self) -> SearchResult<HashSet<String>> {
        self.store.ids()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::ProviderError;
    use crate::store::DEFAULT_COLLECTION;

    /// Deterministic embedder: counts vowel groups so similar texts land
    /// near each other. Texts containing `poison` fail.
    #[derive(Debug, Default)]
    pub(crate) struct FakeEmbedder {
        pub batch_calls: AtomicUsize,
        pub fail_batches: bool,
    }

    pub(crate) fn vectorize(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        ["a", "e", "i", "o", "u", " "]
            .iter()
            .map(|needle| lower.matches(needle).count() as f32 + 0.01)
            .collect()
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
            if text.contains("poison") {
                return Err(ProviderError::EmptyResponse {
                    provider: "fake".to_string(),
                });
            }
            Ok(vectorize(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_batches || texts.iter().any(|t| t.contains("poison")) {
                return Err(ProviderError::RateLimited {
                    provider: "fake".to_string(),
                });
            }
            Ok(texts.iter().map(|t| vectorize(t)).collect())
        }
    }

    fn docs(n: usize) -> Vec<(String, String)> {
        (0..n)
            .map(|i| (format!("s{i}"), format!("Artist: Band {i}\nTotal songs: {i}")))
            .collect()
    }

    fn index(embedder: Arc<FakeEmbedder>, batch_size: usize) -> VectorIndex {
        let store = SqliteVectorStore::open_in_memory(DEFAULT_COLLECTION).unwrap();
        VectorIndex::new(embedder, store).with_batch_size(batch_size)
    }

    #[test]
    fn test_similarity_from_distance() {
        assert!((similarity_from_distance(0.0) - 1.0).abs() < f64::EPSILON);
        assert!(similarity_from_distance(2.0).abs() < f64::EPSILON);
        assert!((similarity_from_distance(1.0) - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_add_batch_chunks_calls() {
        let embedder = Arc::new(FakeEmbedder::default());
        let index = index(Arc::clone(&embedder), 2);

        let report = index.add_batch(&docs(5)).await;

        assert_eq!(report.added, 5);
        assert!(report.failed_ids.is_empty());
        assert_eq!(report.fallback_chunks, 0);
        assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 3);
        assert_eq!(index.count().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_add_batch_falls_back_per_record() {
        let embedder = Arc::new(FakeEmbedder::default());
        let index = index(Arc::clone(&embedder), 3);

        let mut documents = docs(3);
        documents[1].1 = "poison pill".to_string();

        let report = index.add_batch(&documents).await;

        assert_eq!(report.added, 2);
        assert_eq!(report.failed_ids, vec!["s1".to_string()]);
        assert_eq!(report.fallback_chunks, 1);
        let ids = index.indexed_ids().unwrap();
        assert!(ids.contains("s0") && ids.contains("s2") && !ids.contains("s1"));
    }

    #[tokio::test]
    async fn test_failed_chunk_leaves_no_partial_rows() {
        let embedder = Arc::new(FakeEmbedder {
            fail_batches: true,
            ..FakeEmbedder::default()
        });
        let index = index(embedder, 10);

        let report = index.add_batch(&docs(4)).await;

        // Every record made it through the one-by-one path exactly once.
        assert_eq!(report.added, 4);
        assert_eq!(report.fallback_chunks, 1);
        assert_eq!(index.count().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_search_similar_ranks_identical_first() {
        let embedder = Arc::new(FakeEmbedder::default());
        let index = index(embedder, 10);
        index.add("a", "aaaa").await.unwrap();
        index.add("o", "oooo").await.unwrap();
        index.add("mixed", "aaoo").await.unwrap();

        let hits = index.search_similar("aaaa", 5).await.unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "a");
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
        assert!(hits
            .windows(2)
            .all(|w| w[0].similarity >= w[1].similarity));
    }

    #[tokio::test]
    async fn test_embed_failure_is_reported() {
        let index = index(Arc::new(FakeEmbedder::default()), 10);
        assert!(index.embed("poison").await.is_err());
        assert!(index.search_similar("poison", 3).await.is_err());
    }
}
