pub mod ask;
pub mod chat;
pub mod config;
pub mod embed;
pub mod setup;
pub mod status;

pub use ask::run_ask;
pub use chat::run_chat;
pub use embed::run_embed;
pub use setup::run_setup;
pub use status::show_status;

use std::sync::Arc;

use anyhow::{bail, Result};
use encore_core::schema::Database;
use encore_etl::{open_index, openai_embedder, Config};
use encore_search::{Answer, Assistant, OpenAiChat, Retriever};

/// Build the question-answering assistant described by `config`.
///
/// Refuses to run before `encore setup` has created a database.
pub fn build_assistant(config: &Config) -> Result<Assistant> {
    if !config.database_path.exists() {
        bail!(
            "No database found at {}\n\nRun `encore setup` first to collect setlists.",
            config.database_path.display()
        );
    }

    let db = Database::open(&config.database_path)?;
    let index = open_index(config, openai_embedder(config)?)?;
    let chat = OpenAiChat::new(
        config.openai_base_url.clone(),
        config.chat_model.clone(),
        config.openai_key()?,
    )?;

    Ok(Assistant::new(Retriever::new(db, index), Arc::new(chat)).with_top_k(config.top_k))
}

/// Print the setlists an answer was grounded on.
pub fn print_sources(answer: &Answer) {
    println!("✓ Found {} relevant setlists", answer.sources.len());
    for (n, source) in answer.sources.iter().enumerate() {
        println!(
            "  {}. {} - {} (relevance: {:.2})",
            n + 1,
            source.setlist.artist_name,
            source.setlist.event_date,
            source.similarity
        );
    }
    println!();
}
