//! Raw setlist records to [`NormalizedSetlist`].
//!
//! Upstream records are deeply nested and any level may be missing, so
//! they are walked as [`serde_json::Value`] with JSON pointers rather
//! than deserialized into a rigid struct. A record that lacks a required
//! field or has no named songs is dropped, never half-built.

use serde_json::Value;

use encore_core::model::location_line;
use encore_core::{EventDate, NormalizedSetlist, Song};

/// Why a raw record was not turned into a setlist.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rejection {
    /// A required field is absent or empty.
    MissingField(&'static str),
    /// No set contained a named song.
    NoSongs,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing {field}"),
            Self::NoSongs => f.write_str("no songs"),
        }
    }
}

/// Counts from a batch normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub kept: usize,
    pub dropped: usize,
}

/// Normalize one raw record.
///
/// Returns `None` for malformed records and for records with no songs.
/// The event date never causes rejection: unparseable dates are kept
/// verbatim and flagged.
#[must_use]
pub fn normalize(raw: &Value) -> Option<NormalizedSetlist> {
    match try_normalize(raw) {
        Ok(setlist) => Some(setlist),
        Err(reason) => {
            let id = text_at(raw, "/id").unwrap_or("<no id>");
            log::debug!("Skipping setlist {id}: {reason}");
            None
        }
    }
}

/// Normalize many raw records, keeping input order.
#[must_use]
pub fn normalize_batch(raw: &[Value]) -> (Vec<NormalizedSetlist>, NormalizeReport) {
    let kept: Vec<NormalizedSetlist> = raw.iter().filter_map(normalize).collect();
    let report = NormalizeReport {
        kept: kept.len(),
        dropped: raw.len() - kept.len(),
    };
    log::info!(
        "Normalized {} setlist(s), skipped {} invalid",
        report.kept,
        report.dropped
    );
    (kept, report)
}

fn try_normalize(raw: &Value) -> Result<NormalizedSetlist, Rejection> {
    let id = required(raw, "/id", "id")?;
    let artist_name = required(raw, "/artist/name", "artist name")?;
    let artist_stable_id = required(raw, "/artist/mbid", "artist mbid")?;
    let venue_name = required(raw, "/venue/name", "venue name")?;
    let event_date = required(raw, "/eventDate", "event date")?;

    let songs = extract_songs(raw);
    if songs.is_empty() {
        return Err(Rejection::NoSongs);
    }
    let total_encores = songs.iter().filter(|s| s.is_encore).count();

    let mut setlist = NormalizedSetlist {
        id: id.to_string(),
        artist_name: artist_name.to_string(),
        artist_stable_id: artist_stable_id.to_string(),
        venue_name: venue_name.to_string(),
        city: optional(raw, "/venue/city/name"),
        country: optional(raw, "/venue/city/country/name"),
        event_date: EventDate::from_upstream(event_date),
        tour_name: optional(raw, "/tour/name"),
        total_songs: count_u32(songs.len()),
        total_encores: count_u32(total_encores),
        songs,
        embedding_text: String::new(),
    };
    setlist.embedding_text = embedding_text(&setlist);
    Ok(setlist)
}

/// Flatten every set into one ordered song list.
///
/// Positions run 1..=n across all sets. Unnamed songs are skipped and do
/// not take a position.
fn extract_songs(raw: &Value) -> Vec<Song> {
    let Some(sets) = raw.pointer("/sets/set").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut songs = Vec::new();
    for set in sets {
        let is_encore = is_encore_set(set);
        let Some(entries) = set.get("song").and_then(Value::as_array) else {
            continue;
        };
        for entry in entries {
            if let Some(name) = entry
                .get("name")
                .and_then(Value::as_str)
                .filter(|n| !n.is_empty())
            {
                songs.push(Song {
                    name: name.to_string(),
                    position: count_u32(songs.len() + 1),
                    is_encore,
                });
            }
        }
    }
    songs
}

/// A set is an encore when its `encore` marker is at least 1.
fn is_encore_set(set: &Value) -> bool {
    match set.get("encore") {
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v >= 1.0),
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}

/// The canonical text embedded for a setlist.
///
/// One `Label: value` line per present field in a fixed order; this text
/// is the only input semantic search sees.
#[must_use]
pub fn embedding_text(setlist: &NormalizedSetlist) -> String {
    let mut lines = vec![
        format!("Artist: {}", setlist.artist_name),
        format!("Date: {}", setlist.event_date),
    ];

    let venue = location_line(
        &setlist.venue_name,
        setlist.city.as_deref(),
        setlist.country.as_deref(),
    );
    if !venue.is_empty() {
        lines.push(format!("Venue: {venue}"));
    }

    if let Some(tour) = setlist.tour_name.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("Tour: {tour}"));
    }

    let regular = setlist.regular_songs();
    if !regular.is_empty() {
        lines.push(format!("Setlist: {}", regular.join(", ")));
    }

    let encores = setlist.encore_songs();
    if !encores.is_empty() {
        lines.push(format!("Encores: {}", encores.join(", ")));
    }

    lines.push(format!("Total songs: {}", setlist.total_songs));
    lines.join("\n")
}

fn text_at<'a>(raw: &'a Value, pointer: &str) -> Option<&'a str> {
    raw.pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn required<'a>(raw: &'a Value, pointer: &str, field: &'static str) -> Result<&'a str, Rejection> {
    text_at(raw, pointer).ok_or(Rejection::MissingField(field))
}

fn optional(raw: &Value, pointer: &str) -> Option<String> {
    text_at(raw, pointer).map(str::to_string)
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
