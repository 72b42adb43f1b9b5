//! Integration tests for the collect → store → embed pipeline.
//!
//! Upstream and embedding providers are replaced by local fakes, so these
//! tests never touch the network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use encore_core::schema::Database;
use encore_etl::{
    build_pipeline_with, ingest_raw, normalize, open_index, Config, EmbedStage, IngestRun,
    SetlistFmClient, StoreStage,
};
use encore_search::{format_context, Embedder, ProviderResult, Retriever};
use serde_json::{json, Value};
use tempfile::TempDir;
use treadle::{Stage, StageContext, StageOutcome};

/// Embeds text as letter frequencies over a small alphabet.
#[derive(Debug)]
struct LetterEmbedder;

fn letters(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    "aeiostrn"
        .chars()
        .map(|c| lower.chars().filter(|x| *x == c).count() as f32 + 0.01)
        .collect()
}

#[async_trait]
impl Embedder for LetterEmbedder {
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        Ok(letters(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| letters(t)).collect())
    }
}

fn test_artist_record() -> Value {
    json!({
        "id": "test-1",
        "eventDate": "05-07-2015",
        "artist": {"mbid": "abc-123", "name": "Test Artist"},
        "venue": {
            "name": "Test Venue",
            "city": {"name": "Test City", "country": {"name": "Test Country"}}
        },
        "sets": {"set": [
            {"song": [{"name": "Song A"}, {"name": "Song B"}]},
            {"encore": 1, "song": [{"name": "Song C"}]}
        ]}
    })
}

fn config_in(dir: &TempDir) -> Config {
    Config {
        setlistfm_api_key: Some("test-key".to_string()),
        openai_api_key: Some("test-key".to_string()),
        database_path: dir.path().join("encore.db"),
        vector_path: dir.path().join("vectors.db"),
        raw_dir: dir.path().join("raw"),
        ..Config::default()
    }
}

#[test]
fn test_normalize_end_to_end_scenario() {
    let setlist = normalize(&test_artist_record()).expect("record should normalize");

    assert_eq!(setlist.total_songs, 3);
    assert_eq!(setlist.total_encores, 1);
    let positions: Vec<u32> = setlist.songs.iter().map(|s| s.position).collect();
    let encores: Vec<bool> = setlist.songs.iter().map(|s| s.is_encore).collect();
    assert_eq!(positions, vec![1, 2, 3]);
    assert_eq!(encores, vec![false, false, true]);
}

#[test]
fn test_ingest_then_hydrate() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path().join("encore.db")).unwrap();

    let (normalized, report) = ingest_raw(&db, &[test_artist_record()]);
    assert_eq!(normalized.kept, 1);
    assert_eq!(report.inserted, 1);

    let loaded = db.get_setlist("test-1").unwrap().expect("stored setlist");
    assert_eq!(loaded.artist_stable_id, "abc-123");
    assert_eq!(loaded.event_date.as_str(), "2015-07-05");
    assert_eq!(loaded.regular_songs(), vec!["Song A", "Song B"]);
    assert_eq!(loaded.encore_songs(), vec!["Song C"]);
    assert_eq!(loaded.embedding_text, normalize(&test_artist_record()).unwrap().embedding_text);

    // Ingesting the same record again is a counted duplicate, not an error.
    let (_, again) = ingest_raw(&db, &[test_artist_record()]);
    assert_eq!(again.duplicates, 1);
    assert_eq!(db.count_songs().unwrap(), 3);
}

#[tokio::test]
async fn test_pipeline_construction() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir);

    let client = SetlistFmClient::new("test-key".to_string(), 20, Duration::ZERO).unwrap();
    let index = open_index(&config, Arc::new(LetterEmbedder)).unwrap();

    let result = build_pipeline_with(&config, vec!["Test Artist".to_string()], 5, client, index);
    assert!(result.is_ok(), "Pipeline should build successfully");
}

#[tokio::test]
async fn test_pipeline_requires_api_keys() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        setlistfm_api_key: None,
        ..config_in(&temp_dir)
    };
    // Missing keys are reported at build time, before any request.
    assert!(encore_etl::build_ingest_pipeline(&config, vec![], 5).is_err());
}

#[tokio::test]
async fn test_store_and_embed_stages_make_setlists_searchable() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir);
    encore_etl::setlistfm::save_raw(&config.raw_dir, "Test Artist", &[test_artist_record()])
        .unwrap();

    let run = IngestRun::new(vec!["Test Artist".to_string()]);

    let store = StoreStage::new(
        config.database_path.clone(),
        config.raw_dir.clone(),
        run.artists.clone(),
    );
    let mut ctx = StageContext::new("store".to_string());
    assert_eq!(
        store.execute(&run, &mut ctx).await.unwrap(),
        StageOutcome::Complete
    );

    let embed = EmbedStage::new(
        config.database_path.clone(),
        open_index(&config, Arc::new(LetterEmbedder)).unwrap(),
    );
    let mut ctx = StageContext::new("embed".to_string());
    assert_eq!(
        embed.execute(&run, &mut ctx).await.unwrap(),
        StageOutcome::Complete
    );

    let retriever = Retriever::new(
        Database::open(&config.database_path).unwrap(),
        open_index(&config, Arc::new(LetterEmbedder)).unwrap(),
    );
    let results = retriever.retrieve("Song C encore", 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].setlist.id, "test-1");

    let context = format_context(&results);
    assert!(context.contains("1. Test Artist - 2015-07-05"));
    assert!(context.contains("   Venue: Test Venue, Test City, Test Country\n"));
    assert!(context.contains("   Encores: Song C\n"));
}
