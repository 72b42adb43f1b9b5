//! Ingestion pipeline for encore.
//!
//! Collects raw setlists from setlist.fm, normalizes and stores them,
//! and embeds them for search. Each step is a treadle `Stage`; the
//! [`Config`] type carries every tunable and credential.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod collect;
pub mod config;
pub mod embed;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod pipeline;
pub mod resilience;
pub mod setlistfm;
pub mod work_item;

pub use collect::CollectStage;
pub use config::Config;
pub use embed::{pending_documents, EmbedStage};
pub use error::{FetchError, FetchResult};
pub use ingest::{ingest_raw, store_setlists, IngestReport, StoreStage};
pub use normalize::{embedding_text, normalize, normalize_batch, NormalizeReport};
pub use pipeline::{build_ingest_pipeline, build_pipeline_with, open_index, openai_embedder};
pub use resilience::RateLimiter;
pub use setlistfm::{ArtistMatch, SetlistFmClient};
pub use work_item::IngestRun;
