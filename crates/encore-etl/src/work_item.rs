use serde::{Deserialize, Serialize};
use std::fmt;
use treadle::WorkItem;
use uuid::Uuid;

/// One ingestion run flowing through the pipeline.
///
/// This is the treadle `WorkItem` that moves through the collect → store
/// → embed stages. Every run gets a fresh id so the state store never
/// mistakes a new run for a finished one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRun {
    id: String,
    /// Artists requested for this run.
    pub artists: Vec<String>,
}

impl IngestRun {
    #[must_use]
    pub fn new(artists: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            artists,
        }
    }
}

impl WorkItem for IngestRun {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for IngestRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ingest {} ({})", self.id, self.artists.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_get_distinct_ids() {
        let a = IngestRun::new(vec!["Phish".to_string()]);
        let b = IngestRun::new(vec!["Phish".to_string()]);
        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id()).is_ok());
    }

    #[test]
    fn test_display_lists_artists() {
        let run = IngestRun::new(vec!["Phish".to_string(), "Grateful Dead".to_string()]);
        assert!(format!("{run}").ends_with("(Phish, Grateful Dead)"));
    }
}
