//! Vector search and retrieval-augmented answering for encore.
//!
//! Setlist summaries are embedded with an [`Embedder`], stored in a
//! SQLite-backed [`VectorIndex`], and retrieved by semantic similarity.
//! The [`Retriever`] hydrates hits from the relational store, and the
//! [`Assistant`] turns them into a prompt context for a [`ChatModel`].

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod assistant;
pub mod chat;
pub mod context;
pub mod embedder;
pub mod error;
pub mod index;
pub mod retriever;
pub mod store;

pub use assistant::{Answer, Assistant};
pub use chat::{generate_response, ChatModel, OpenAiChat};
pub use context::format_context;
pub use embedder::{Embedder, OpenAiEmbedder};
pub use error::{ProviderError, ProviderResult, SearchError, SearchResult};
pub use index::{similarity_from_distance, BatchReport, SimilarSetlist, VectorIndex};
pub use retriever::{RetrievedSetlist, Retriever};
pub use store::SqliteVectorStore;
