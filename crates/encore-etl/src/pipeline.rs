use std::sync::Arc;
use std::time::Duration;

use treadle::Workflow;

use encore_search::{Embedder, OpenAiEmbedder, SqliteVectorStore, VectorIndex};

use crate::config::Config;
use crate::{CollectStage, EmbedStage, SetlistFmClient, StoreStage};

/// Name of the vector collection holding setlist summaries.
pub const SETLIST_COLLECTION: &str = encore_search::store::DEFAULT_COLLECTION;

/// Open the configured vector index with `embedder`.
///
/// # Errors
/// Returns an error if the vector store cannot be opened.
pub fn open_index(
    config: &Config,
    embedder: Arc<dyn Embedder>,
) -> encore_search::SearchResult<VectorIndex> {
    let store = SqliteVectorStore::open(&config.vector_path, SETLIST_COLLECTION)?;
    Ok(VectorIndex::new(embedder, store).with_batch_size(config.embedding_batch_size))
}

/// Build the OpenAI embedder described by `config`.
///
/// # Errors
/// Returns an error if no OpenAI key is configured.
pub fn openai_embedder(config: &Config) -> anyhow::Result<Arc<dyn Embedder>> {
    let embedder = OpenAiEmbedder::new(
        config.openai_base_url.clone(),
        config.embedding_model.clone(),
        config.openai_key()?,
    )?;
    Ok(Arc::new(embedder))
}

/// Build the collect → store → embed pipeline for `artists`.
///
/// # Errors
/// Returns an error if an API key is missing or a stage cannot be built.
pub fn build_ingest_pipeline(
    config: &Config,
    artists: Vec<String>,
    max_setlists: usize,
) -> treadle::Result<Workflow> {
    let invalid = |e: &dyn std::fmt::Display| treadle::TreadleError::InvalidWorkflow(e.to_string());

    let api_key = config.setlistfm_key().map_err(|e| invalid(&e))?.to_string();
    let client = SetlistFmClient::new(
        api_key,
        config.page_size,
        Duration::from_millis(config.request_delay_ms),
    )
    .map_err(|e| invalid(&format!("Failed to create setlist.fm client: {e}")))?;

    let embedder = openai_embedder(config).map_err(|e| invalid(&e))?;
    let index = open_index(config, embedder)
        .map_err(|e| invalid(&format!("Failed to open vector index: {e}")))?;

    build_pipeline_with(config, artists, max_setlists, client, index)
}

/// Build the pipeline from ready-made collaborators.
///
/// # Errors
/// Returns an error if the workflow cannot be built.
pub fn build_pipeline_with(
    config: &Config,
    artists: Vec<String>,
    max_setlists: usize,
    client: SetlistFmClient,
    index: VectorIndex,
) -> treadle::Result<Workflow> {
    let collect = CollectStage::new(client, config.raw_dir.clone(), artists.clone(), max_setlists);
    let store = StoreStage::new(config.database_path.clone(), config.raw_dir.clone(), artists);
    let embed = EmbedStage::new(config.database_path.clone(), index);

    Workflow::builder()
        .stage("collect", collect)
        .stage("store", store)
        .stage("embed", embed)
        .dependency("store", "collect")
        .dependency("embed", "store")
        .build()
}
