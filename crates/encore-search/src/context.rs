//! Render retrieved setlists as plain text for a language model prompt.

use std::fmt::{self, Write};

use encore_core::model::location_line;

use crate::retriever::RetrievedSetlist;

/// Returned in place of a context block when nothing was retrieved.
pub const NO_RESULTS: &str = "No relevant setlists found.";

/// Regular-set songs listed per setlist before truncating.
pub const MAX_CONTEXT_SONGS: usize = 15;

/// Format retrieved setlists as a numbered, human-readable block.
///
/// Each entry carries the artist and date, venue line, optional tour,
/// up to [`MAX_CONTEXT_SONGS`] regular songs, encores, the total song
/// count and the relevance score to two decimals.
#[must_use]
pub fn format_context(results: &[RetrievedSetlist]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut out = String::from("Retrieved concert setlists:\n");
    if let Err(e) = write_entries(&mut out, results) {
        log::error!("Failed to render setlist context: {e}");
    }
    out
}

fn write_entries(out: &mut impl Write, results: &[RetrievedSetlist]) -> fmt::Result {
    for (n, result) in results.iter().enumerate() {
        let s = &result.setlist;

        writeln!(out, "\n{}. {} - {}", n + 1, s.artist_name, s.event_date)?;
        let venue = location_line(&s.venue_name, s.city.as_deref(), s.country.as_deref());
        writeln!(out, "   Venue: {venue}")?;

        if let Some(tour) = s.tour_name.as_deref().filter(|t| !t.is_empty()) {
            writeln!(out, "   Tour: {tour}")?;
        }

        let regular = s.regular_songs();
        if !regular.is_empty() {
            let shown = &regular[..regular.len().min(MAX_CONTEXT_SONGS)];
            write!(out, "   Setlist: {}", shown.join(", "))?;
            if regular.len() > MAX_CONTEXT_SONGS {
                write!(out, "... ({} total songs)", regular.len())?;
            }
            writeln!(out)?;
        }

        let encores = s.encore_songs();
        if !encores.is_empty() {
            writeln!(out, "   Encores: {}", encores.join(", "))?;
        }

        writeln!(out, "   Total songs: {}", s.total_songs)?;
        writeln!(out, "   Relevance: {:.2}", result.similarity)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use encore_core::{EventDate, NormalizedSetlist, Song};

    use super::*;

    fn songs(regular: usize, encores: usize) -> Vec<Song> {
        (0..regular + encores)
            .map(|i| Song {
                name: format!("Song {}", i + 1),
                position: u32::try_from(i + 1).unwrap(),
                is_encore: i >= regular,
            })
            .collect()
    }

    fn result(songs: Vec<Song>, similarity: f64) -> RetrievedSetlist {
        let total = u32::try_from(songs.len()).unwrap();
        let encores = u32::try_from(songs.iter().filter(|s| s.is_encore).count()).unwrap();
        RetrievedSetlist {
            setlist: NormalizedSetlist {
                id: "s1".to_string(),
                artist_name: "Phish".to_string(),
                artist_stable_id: "e01646f2".to_string(),
                venue_name: "Madison Square Garden".to_string(),
                city: Some("New York".to_string()),
                country: Some("United States".to_string()),
                event_date: EventDate::iso("1995-12-31"),
                tour_name: Some("Winter 1995".to_string()),
                songs,
                total_songs: total,
                total_encores: encores,
                embedding_text: String::new(),
            },
            similarity,
            distance: 2.0 * (1.0 - similarity),
        }
    }

    #[test]
    fn test_empty_results_sentinel() {
        assert_eq!(format_context(&[]), "No relevant setlists found.");
    }

    #[test]
    fn test_full_entry_layout() {
        let text = format_context(&[result(songs(2, 1), 0.876)]);
        let expected = "Retrieved concert setlists:\n\
            \n1. Phish - 1995-12-31\n   \
            Venue: Madison Square Garden, New York, United States\n   \
            Tour: Winter 1995\n   \
            Setlist: Song 1, Song 2\n   \
            Encores: Song 3\n   \
            Total songs: 3\n   \
            Relevance: 0.88\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_long_setlist_truncated() {
        let text = format_context(&[result(songs(20, 0), 0.5)]);
        assert!(text.contains("Song 15... (20 total songs)\n"));
        assert!(!text.contains("Song 16"));
        assert!(text.contains("Total songs: 20"));
    }

    #[test]
    fn test_exactly_fifteen_not_truncated() {
        let text = format_context(&[result(songs(15, 0), 0.5)]);
        assert!(text.contains("Song 15\n"));
        assert!(!text.contains("total songs)"));
    }

    #[test]
    fn test_optional_lines_omitted() {
        let mut r = result(songs(0, 2), 0.5);
        r.setlist.tour_name = None;
        r.setlist.city = None;
        let text = format_context(&[r]);

        assert!(text.contains("   Venue: Madison Square Garden, United States\n"));
        assert!(!text.contains("Tour:"));
        assert!(!text.contains("Setlist:"));
        assert!(text.contains("   Encores: Song 1, Song 2\n"));
    }

    #[test]
    fn test_entries_are_numbered() {
        let text = format_context(&[result(songs(1, 0), 0.9), result(songs(1, 0), 0.7)]);
        assert!(text.contains("\n1. Phish"));
        assert!(text.contains("\n2. Phish"));
        assert!(text.contains("Relevance: 0.70"));
    }
}
