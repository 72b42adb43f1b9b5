//! The store stage: raw files in, setlists out.

use std::path::PathBuf;

use serde_json::Value;
use treadle::{Stage, StageContext, StageOutcome};

use encore_core::{Database, NormalizedSetlist};

use crate::normalize::{normalize_batch, NormalizeReport};
use crate::setlistfm::load_raw;

/// Counts from inserting a batch of setlists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    /// Setlists whose id was already stored.
    pub duplicates: usize,
    pub failed: usize,
}

impl IngestReport {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.inserted + self.duplicates + self.failed
    }
}

/// Insert every setlist, one transaction each.
///
/// Duplicates and per-record failures are counted and logged; they never
/// stop the batch.
pub fn store_setlists(db: &Database, setlists: &[NormalizedSetlist]) -> IngestReport {
    let mut report = IngestReport::default();

    for setlist in setlists {
        match db.insert_setlist(setlist) {
            Ok(_) => report.inserted += 1,
            Err(e) if e.is_duplicate() => {
                log::debug!("Setlist {} already stored", setlist.id);
                report.duplicates += 1;
            }
            Err(e) => {
                log::warn!("Failed to store setlist {}: {e}", setlist.id);
                report.failed += 1;
            }
        }
    }

    log::info!(
        "Stored {} setlist(s), {} already present, {} failed",
        report.inserted,
        report.duplicates,
        report.failed
    );
    report
}

/// Normalize raw records and store the survivors.
pub fn ingest_raw(db: &Database, raw: &[Value]) -> (NormalizeReport, IngestReport) {
    let (setlists, normalized) = normalize_batch(raw);
    (normalized, store_setlists(db, &setlists))
}

/// The Store stage: load each artist's raw file, normalize, insert.
#[derive(Debug)]
pub struct StoreStage {
    db_path: PathBuf,
    raw_dir: PathBuf,
    artists: Vec<String>,
}

impl StoreStage {
    #[must_use]
    pub const fn new(db_path: PathBuf, raw_dir: PathBuf, artists: Vec<String>) -> Self {
        Self {
            db_path,
            raw_dir,
            artists,
        }
    }

    fn store_all(&self, db: &Database) -> IngestReport {
        let mut total = IngestReport::default();

        for artist in &self.artists {
            let raw = match load_raw(&self.raw_dir, artist) {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("No raw data for {artist}: {e}");
                    continue;
                }
            };

            let (_, report) = ingest_raw(db, &raw);
            total.inserted += report.inserted;
            total.duplicates += report.duplicates;
            total.failed += report.failed;
        }

        total
    }
}

#[async_trait::async_trait]
impl Stage for StoreStage {
    fn name(&self) -> &str {
        "store"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        let db = Database::open(&self.db_path).map_err(|e| {
            treadle::TreadleError::StageExecution(format!("Failed to open database: {e}"))
        })?;

        let report = self.store_all(&db);
        log::info!(
            "Store complete: {} new, {} duplicate, {} failed",
            report.inserted,
            report.duplicates,
            report.failed
        );
        Ok(StageOutcome::Complete)
    }
}
