//! The embed stage: index stored setlists that are not yet searchable.

use std::path::PathBuf;

use treadle::{Stage, StageContext, StageOutcome};

use encore_core::Database;
use encore_search::{SearchResult, VectorIndex};

/// Stored `(id, embedding text)` pairs missing from the index, in
/// insertion order.
///
/// # Errors
/// Returns an error if either store cannot be read.
pub fn pending_documents(
    db: &Database,
    index: &VectorIndex,
) -> SearchResult<Vec<(String, String)>> {
    let indexed = index.indexed_ids()?;
    let pending: Vec<(String, String)> = db
        .list_embedding_texts()?
        .into_iter()
        .filter(|(id, _)| !indexed.contains(id))
        .collect();
    log::info!(
        "{} setlist(s) to embed, {} already indexed",
        pending.len(),
        indexed.len()
    );
    Ok(pending)
}

/// The Embed stage: embed every stored setlist absent from the index.
///
/// Re-running after an interruption picks up where the last run stopped.
#[derive(Debug)]
pub struct EmbedStage {
    db_path: PathBuf,
    index: VectorIndex,
}

impl EmbedStage {
    #[must_use]
    pub const fn new(db_path: PathBuf, index: VectorIndex) -> Self {
        Self { db_path, index }
    }
}

#[async_trait::async_trait]
impl Stage for EmbedStage {
    fn name(&self) -> &str {
        "embed"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        let pending = {
            let db = Database::open(&self.db_path).map_err(|e| {
                treadle::TreadleError::StageExecution(format!("Failed to open database: {e}"))
            })?;
            pending_documents(&db, &self.index).map_err(|e| {
                treadle::TreadleError::StageExecution(format!("Failed to list setlists: {e}"))
            })?
        };

        let report = self.index.add_batch(&pending).await;
        if !report.failed_ids.is_empty() {
            log::warn!(
                "{} setlist(s) could not be embedded: {}",
                report.failed_ids.len(),
                report.failed_ids.join(", ")
            );
        }
        log::info!(
            "Embed complete: {} added ({} chunk(s) retried one by one)",
            report.added,
            report.fallback_chunks
        );
        Ok(StageOutcome::Complete)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use encore_core::{EventDate, NormalizedSetlist, Song};
    use encore_search::{Embedder, ProviderResult, SqliteVectorStore};
    use tempfile::TempDir;

    use super::*;

    #[derive(Debug)]
    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    fn setlist(id: &str) -> NormalizedSetlist {
        NormalizedSetlist {
            id: id.to_string(),
            artist_name: "Phish".to_string(),
            artist_stable_id: "e01646f2".to_string(),
            venue_name: "Hampton Coliseum".to_string(),
            city: Some("Hampton".to_string()),
            country: None,
            event_date: EventDate::iso("1998-11-21"),
            tour_name: None,
            songs: vec![Song {
                name: "Tweezer".to_string(),
                position: 1,
                is_encore: false,
            }],
            total_songs: 1,
            total_encores: 0,
            embedding_text: format!("Artist: Phish\nSetlist: Tweezer {id}"),
        }
    }

    #[tokio::test]
    async fn test_embed_stage_indexes_only_missing() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("encore.db");
        {
            let db = Database::open(&db_path).unwrap();
            db.insert_setlist(&setlist("a")).unwrap();
            db.insert_setlist(&setlist("b")).unwrap();
        }

        let store = SqliteVectorStore::open(dir.path().join("vectors.db"), "setlists").unwrap();
        let index = VectorIndex::new(Arc::new(LengthEmbedder), store);
        index.add("a", "already here").await.unwrap();

        {
            let db = Database::open(&db_path).unwrap();
            let pending = pending_documents(&db, &index).unwrap();
            assert_eq!(pending.len(), 1);
            assert_eq!(pending[0].0, "b");
        }

        let stage = EmbedStage::new(db_path, index);
        let run = crate::IngestRun::new(vec![]);
        let mut ctx = StageContext::new("embed".to_string());
        let outcome = stage.execute(&run, &mut ctx).await.unwrap();

        assert_eq!(outcome, StageOutcome::Complete);
        assert_eq!(stage.index.count().unwrap(), 2);
    }
}
