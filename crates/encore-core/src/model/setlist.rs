use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used by the upstream concert API (`DD-MM-YYYY`).
const UPSTREAM_DATE_FORMAT: &str = "%d-%m-%Y";

/// Storage date format (ISO 8601 calendar date).
const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// The date a concert took place.
///
/// Normally an ISO `YYYY-MM-DD` string. When the upstream text does not
/// parse, the original text is kept verbatim and `raw_fallback` is set so
/// degraded records can be found later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventDate {
    pub value: String,
    pub raw_fallback: bool,
}

impl EventDate {
    /// Convert an upstream `DD-MM-YYYY` date to ISO form.
    ///
    /// Never fails: unparseable input is passed through with
    /// `raw_fallback = true`.
    #[must_use]
    pub fn from_upstream(text: &str) -> Self {
        match NaiveDate::parse_from_str(text, UPSTREAM_DATE_FORMAT) {
            Ok(date) => Self::iso(date.format(ISO_DATE_FORMAT).to_string()),
            Err(e) => {
                log::warn!("Keeping unparseable event date '{text}' as-is: {e}");
                Self::raw(text)
            }
        }
    }

    #[must_use]
    pub fn iso(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            raw_fallback: false,
        }
    }

    #[must_use]
    pub fn raw(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            raw_fallback: true,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub const fn is_raw_fallback(&self) -> bool {
        self.raw_fallback
    }
}

impl std::fmt::Display for EventDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// One performed song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub name: String,

    /// 1-based position, contiguous across every set of the show.
    pub position: u32,

    pub is_encore: bool,
}

/// A flattened, validated setlist ready for storage and embedding.
///
/// Never constructed with an empty `songs` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedSetlist {
    /// Upstream setlist id; primary key.
    pub id: String,

    pub artist_name: String,
    pub artist_stable_id: String,

    pub venue_name: String,
    pub city: Option<String>,
    pub country: Option<String>,

    pub event_date: EventDate,
    pub tour_name: Option<String>,

    pub songs: Vec<Song>,
    pub total_songs: u32,
    pub total_encores: u32,

    /// Summary text used as the sole input to embedding.
    pub embedding_text: String,
}

impl NormalizedSetlist {
    /// Names of songs played in the main sets, in order.
    #[must_use]
    pub fn regular_songs(&self) -> Vec<&str> {
        self.songs
            .iter()
            .filter(|s| !s.is_encore)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Names of songs played as encores, in order.
    #[must_use]
    pub fn encore_songs(&self) -> Vec<&str> {
        self.songs
            .iter()
            .filter(|s| s.is_encore)
            .map(|s| s.name.as_str())
            .collect()
    }
}
