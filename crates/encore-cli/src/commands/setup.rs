use anyhow::{Context, Result};
use encore_core::schema::Database;
use encore_etl::{build_ingest_pipeline, Config, IngestRun};

/// Run the collect → store → embed workflow, then print statistics.
pub async fn run_setup(
    config: &Config,
    artists: Vec<String>,
    max_setlists: Option<usize>,
) -> Result<()> {
    let artists = if artists.is_empty() {
        config.default_artists.clone()
    } else {
        artists
    };
    let max_setlists = max_setlists.unwrap_or(config.max_setlists_per_artist);
    config
        .validate()
        .context("Setup needs both API keys (see `encore config init`)")?;

    println!("\n🎸 Encore Setup\n");
    println!("  Artists: {}", artists.join(", "));
    println!("  Max setlists per artist: {max_setlists}");
    println!("  Database: {}", config.database_path.display());
    println!();

    let workflow = build_ingest_pipeline(config, artists.clone(), max_setlists)
        .context("Failed to build pipeline")?;

    let parent = config
        .database_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
    std::fs::create_dir_all(parent)?;
    let state_path = parent.join("pipeline.db");
    log::debug!("Pipeline state at {}", state_path.display());
    let mut store = treadle::SqliteStateStore::open(&state_path)
        .await
        .context("Failed to open pipeline state store")?;

    let run = IngestRun::new(artists);

    let mut events = workflow.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                treadle::WorkflowEvent::StageStarted { stage, .. } => {
                    println!("  ⏳ [{stage}] Starting...");
                }
                treadle::WorkflowEvent::StageCompleted { stage, .. } => {
                    println!("  ✓ [{stage}] Complete");
                }
                treadle::WorkflowEvent::StageFailed { stage, error, .. } => {
                    eprintln!("  ✗ [{stage}] FAILED: {error}");
                }
                _ => {}
            }
        }
    });

    workflow
        .advance(&run, &mut store)
        .await
        .context("Pipeline execution failed")?;

    let db = Database::open(&config.database_path)?;
    let rule = "=".repeat(60);
    println!("\n{rule}");
    println!("📊 Database Statistics");
    println!("{rule}");
    println!("  Artists:  {}", db.count_artists()?);
    println!("  Venues:   {}", db.count_venues()?);
    println!("  Setlists: {}", db.count_setlists()?);
    println!("  Songs:    {}", db.count_songs()?);
    println!("{rule}");

    println!("\n✅ Setup complete! Ask a question with `encore ask \"...\"` or run `encore`.");
    Ok(())
}
