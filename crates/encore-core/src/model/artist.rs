use serde::{Deserialize, Serialize};

use crate::model::ids::ArtistId;

/// A performing artist, deduplicated by its upstream stable id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,

    /// `MusicBrainz` artist id as reported by the upstream source.
    pub stable_id: String,
}
