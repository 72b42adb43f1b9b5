//! Query-time retrieval: semantic search, then hydration from the
//! relational store.

use std::collections::HashMap;

use encore_core::{Database, NormalizedSetlist};

use crate::error::SearchResult;
use crate::index::{SimilarSetlist, VectorIndex};

/// Default number of setlists retrieved per question.
pub const DEFAULT_TOP_K: usize = 5;

/// A fully hydrated setlist with its search scores.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedSetlist {
    pub setlist: NormalizedSetlist,
    pub similarity: f64,
    pub distance: f64,
}

/// Runs searches against the index and hydrates hits from the database.
#[derive(Debug)]
pub struct Retriever {
    db: Database,
    index: VectorIndex,
}

impl Retriever {
    #[must_use]
    pub const fn new(db: Database, index: VectorIndex) -> Self {
        Self { db, index }
    }

    #[must_use]
    pub const fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Up to `k` setlists relevant to `query`, most similar first.
    ///
    /// Hits whose setlist is missing from the database (an index that has
    /// drifted from the store) are dropped without error.
    pub async fn retrieve(&self, query: &str, k: usize) -> SearchResult<Vec<RetrievedSetlist>> {
        let hits = self.index.search_similar(query, k).await?;
        log::debug!("Search for {query:?} returned {} hit(s)", hits.len());

        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        let hydrated = self.db.get_setlists(&ids)?;

        let results = merge_hits(&hits, hydrated);
        if results.len() < hits.len() {
            log::warn!(
                "{} indexed setlist(s) missing from the database",
                hits.len() - results.len()
            );
        }
        Ok(results)
    }
}

/// Join search hits with hydrated setlists by id, in hit order.
fn merge_hits(hits: &[SimilarSetlist], hydrated: Vec<NormalizedSetlist>) -> Vec<RetrievedSetlist> {
    let mut by_id: HashMap<String, NormalizedSetlist> = hydrated
        .into_iter()
        .map(|setlist| (setlist.id.clone(), setlist))
        .collect();

    hits.iter()
        .filter_map(|hit| {
            by_id.remove(&hit.id).map(|setlist| RetrievedSetlist {
                setlist,
                similarity: hit.similarity,
                distance: hit.distance,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use encore_core::{EventDate, Song};

    use super::*;
    use crate::index::tests::FakeEmbedder;
    use crate::store::{SqliteVectorStore, DEFAULT_COLLECTION};

    fn setlist(id: &str, artist: &str, text: &str) -> NormalizedSetlist {
        NormalizedSetlist {
            id: id.to_string(),
            artist_name: artist.to_string(),
            artist_stable_id: format!("mbid-{artist}"),
            venue_name: "Venue".to_string(),
            city: Some("City".to_string()),
            country: None,
            event_date: EventDate::iso("2020-01-01"),
            tour_name: None,
            songs: vec![Song {
                name: "Song".to_string(),
                position: 1,
                is_encore: false,
            }],
            total_songs: 1,
            total_encores: 0,
            embedding_text: text.to_string(),
        }
    }

    fn hit(id: &str, distance: f64) -> SimilarSetlist {
        SimilarSetlist {
            id: id.to_string(),
            distance,
            similarity: crate::index::similarity_from_distance(distance),
            document: String::new(),
        }
    }

    #[test]
    fn test_merge_keeps_hit_order_and_drops_missing() {
        let hits = vec![hit("b", 0.1), hit("gone", 0.2), hit("a", 0.4)];
        let hydrated = vec![setlist("a", "A", ""), setlist("b", "B", "")];

        let merged = merge_hits(&hits, hydrated);

        let ids: Vec<&str> = merged.iter().map(|r| r.setlist.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!((merged[0].similarity - 0.95).abs() < 1e-9);
        assert!((merged[1].distance - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_retrieve_caps_at_available_records() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteVectorStore::open_in_memory(DEFAULT_COLLECTION).unwrap();
        let index = VectorIndex::new(Arc::new(FakeEmbedder::default()), store);

        for (id, text) in [("s1", "aaaa"), ("s2", "aaee"), ("s3", "uuuu")] {
            db.insert_setlist(&setlist(id, id, text)).unwrap();
            index.add(id, text).await.unwrap();
        }

        let retriever = Retriever::new(db, index);
        let results = retriever.retrieve("aaaa", DEFAULT_TOP_K).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].setlist.id, "s1");
        assert!(results
            .windows(2)
            .all(|w| w[0].similarity >= w[1].similarity));
    }

    #[tokio::test]
    async fn test_retrieve_drops_unhydrated_hits() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteVectorStore::open_in_memory(DEFAULT_COLLECTION).unwrap();
        let index = VectorIndex::new(Arc::new(FakeEmbedder::default()), store);

        db.insert_setlist(&setlist("kept", "A", "aaaa")).unwrap();
        index.add("kept", "aaaa").await.unwrap();
        index.add("orphan", "aaab").await.unwrap();

        let retriever = Retriever::new(db, index);
        let results = retriever.retrieve("aaaa", 5).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].setlist.id, "kept");
    }
}
