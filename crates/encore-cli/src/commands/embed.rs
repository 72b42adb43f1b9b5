use anyhow::{bail, Result};
use encore_core::schema::Database;
use encore_etl::{open_index, openai_embedder, pending_documents, Config};

/// Embed every stored setlist missing from the vector index.
pub async fn run_embed(config: &Config) -> Result<()> {
    if !config.database_path.exists() {
        bail!(
            "No database found at {}\n\nRun `encore setup` first.",
            config.database_path.display()
        );
    }

    let index = open_index(config, openai_embedder(config)?)?;
    let pending = {
        let db = Database::open(&config.database_path)?;
        pending_documents(&db, &index)?
    };

    if pending.is_empty() {
        println!("✓ Every stored setlist is already indexed");
        return Ok(());
    }

    println!("🧠 Generating embeddings for {} setlists...", pending.len());
    let report = index.add_batch(&pending).await;

    println!("✓ Added {} embeddings", report.added);
    if report.fallback_chunks > 0 {
        println!("  {} chunk(s) retried one at a time", report.fallback_chunks);
    }
    if !report.failed_ids.is_empty() {
        eprintln!("✗ {} setlist(s) failed:", report.failed_ids.len());
        for id in &report.failed_ids {
            eprintln!("    {id}");
        }
    }
    println!("  Index now holds {} setlists", index.count()?);

    Ok(())
}
