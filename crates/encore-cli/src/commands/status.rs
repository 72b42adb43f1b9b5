use std::collections::HashSet;

use anyhow::Result;
use encore_core::schema::Database;
use encore_etl::pipeline::SETLIST_COLLECTION;
use encore_etl::Config;
use encore_search::SqliteVectorStore;

pub fn show_status(config: &Config) -> Result<()> {
    println!("\n📊 Encore Status\n");
    println!("  Database: {}", config.database_path.display());

    if !config.database_path.exists() {
        println!("  No database yet. Run `encore setup` to collect setlists.");
        return Ok(());
    }

    let db = Database::open(&config.database_path)?;
    println!("  Artists:  {}", db.count_artists()?);
    println!("  Venues:   {}", db.count_venues()?);
    println!("  Setlists: {}", db.count_setlists()?);
    println!("  Songs:    {}", db.count_songs()?);

    let indexed = if config.vector_path.exists() {
        SqliteVectorStore::open(&config.vector_path, SETLIST_COLLECTION)?.ids()?
    } else {
        HashSet::new()
    };
    println!("  Indexed:  {}", indexed.len());

    let artists = db.artist_summaries()?;
    if !artists.is_empty() {
        println!("\n  Setlists by artist:");
        for (artist, shows) in &artists {
            println!("    {:<30} {shows}", artist.name);
        }
        println!();
    }

    let degraded = db.count_degraded_dates()?;
    if degraded > 0 {
        println!("  Setlists with unparsed dates: {degraded}");
    }

    let missing = db
        .all_setlist_ids()?
        .into_iter()
        .filter(|id| !indexed.contains(id))
        .count();
    if missing > 0 {
        println!("\n  Run `encore embed` to index {missing} remaining setlists");
    }

    Ok(())
}
