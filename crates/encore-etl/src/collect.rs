//! The collect stage: look up artists and save their raw setlists.

use std::path::PathBuf;

use treadle::{Stage, StageContext, StageOutcome};

use crate::error::FetchResult;
use crate::setlistfm::{save_raw, SetlistFmClient};

/// The Collect stage: search each artist, page through their setlists,
/// and save the raw records to `<raw_dir>/<artist>_raw.json`.
///
/// An artist that cannot be found, fetched or saved is skipped. Only
/// failing to create the raw directory fails the stage.
#[derive(Debug)]
pub struct CollectStage {
    client: SetlistFmClient,
    raw_dir: PathBuf,
    artists: Vec<String>,
    max_setlists: usize,
}

impl CollectStage {
    #[must_use]
    pub const fn new(
        client: SetlistFmClient,
        raw_dir: PathBuf,
        artists: Vec<String>,
        max_setlists: usize,
    ) -> Self {
        Self {
            client,
            raw_dir,
            artists,
            max_setlists,
        }
    }

    /// Fetch one artist. `Ok(None)` means nothing to save.
    async fn collect_artist(&self, name: &str) -> FetchResult<Option<usize>> {
        let Some(artist) = self.client.search_artist(name).await? else {
            return Ok(None);
        };

        let records = self
            .client
            .get_artist_setlists(&artist.mbid, self.max_setlists)
            .await?;
        if records.is_empty() {
            log::warn!("No setlists found for {name} ({})", artist.mbid);
            return Ok(None);
        }

        save_raw(&self.raw_dir, name, &records)?;
        Ok(Some(records.len()))
    }
}

#[async_trait::async_trait]
impl Stage for CollectStage {
    fn name(&self) -> &str {
        "collect"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        std::fs::create_dir_all(&self.raw_dir).map_err(|e| {
            treadle::TreadleError::StageExecution(format!(
                "Failed to create raw directory {}: {e}",
                self.raw_dir.display()
            ))
        })?;

        let mut saved = 0;
        for name in &self.artists {
            log::info!("Collecting setlists for {name}");
            match self.collect_artist(name).await {
                Ok(Some(count)) => saved += count,
                Ok(None) => {}
                Err(e) => log::warn!("Skipping {name}: {e}"),
            }
        }

        log::info!(
            "Collect complete: {saved} setlist(s) for {} artist(s)",
            self.artists.len()
        );
        Ok(StageOutcome::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_unreachable_upstream_skips_artists() {
        let dir = TempDir::new().unwrap();
        let client = SetlistFmClient::new("key".to_string(), 20, Duration::ZERO)
            .unwrap()
            .with_base_url("http://127.0.0.1:9/rest/1.0");
        let raw_dir = dir.path().join("raw");
        let stage = CollectStage::new(client, raw_dir.clone(), vec!["Phish".to_string()], 5);

        let run = crate::IngestRun::new(vec!["Phish".to_string()]);
        let mut ctx = StageContext::new("collect".to_string());
        let outcome = stage.execute(&run, &mut ctx).await.unwrap();

        assert_eq!(outcome, StageOutcome::Complete);
        assert_eq!(std::fs::read_dir(&raw_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unusable_raw_dir_fails_stage() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("raw");
        std::fs::write(&blocker, "not a directory").unwrap();

        let client = SetlistFmClient::new("key".to_string(), 20, Duration::ZERO)
            .unwrap()
            .with_base_url("http://127.0.0.1:9/rest/1.0");
        let stage = CollectStage::new(
            client,
            blocker.join("nested"),
            vec!["AC/DC".to_string()],
            5,
        );

        let run = crate::IngestRun::new(vec!["AC/DC".to_string()]);
        let mut ctx = StageContext::new("collect".to_string());
        let err = stage.execute(&run, &mut ctx).await.unwrap_err();

        assert!(err.to_string().contains("raw directory"));
    }
}
