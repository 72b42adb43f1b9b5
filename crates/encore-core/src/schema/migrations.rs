/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r"
-- Artists, deduplicated by MusicBrainz id
CREATE TABLE IF NOT EXISTS artists (
    artist_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    mbid TEXT UNIQUE NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_artists_mbid ON artists(mbid);

-- Venues, matched on (name, city); country is informational
CREATE TABLE IF NOT EXISTS venues (
    venue_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    city TEXT,
    country TEXT
);

-- One row per concert
CREATE TABLE IF NOT EXISTS setlists (
    setlist_id TEXT PRIMARY KEY,
    artist_id INTEGER NOT NULL REFERENCES artists(artist_id),
    venue_id INTEGER NOT NULL REFERENCES venues(venue_id),
    event_date TEXT NOT NULL,
    tour_name TEXT,
    total_songs INTEGER NOT NULL,
    embedding_text TEXT
);

CREATE INDEX IF NOT EXISTS idx_setlists_artist ON setlists(artist_id);
CREATE INDEX IF NOT EXISTS idx_setlists_date ON setlists(event_date);

-- Songs in performance order
CREATE TABLE IF NOT EXISTS songs (
    song_id INTEGER PRIMARY KEY AUTOINCREMENT,
    setlist_id TEXT NOT NULL REFERENCES setlists(setlist_id) ON DELETE CASCADE,
    song_name TEXT NOT NULL,
    position INTEGER NOT NULL,
    is_encore INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_songs_setlist ON songs(setlist_id);
CREATE INDEX IF NOT EXISTS idx_songs_name ON songs(song_name);
";

const MIGRATION_002: &str = r"
-- Marks event dates kept verbatim because they did not parse
ALTER TABLE setlists ADD COLUMN date_is_raw INTEGER NOT NULL DEFAULT 0;
";

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: MIGRATION_001,
    },
    Migration {
        version: 2,
        name: "degraded_event_dates",
        sql: MIGRATION_002,
    },
];
