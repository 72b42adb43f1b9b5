use rusqlite::{Connection, OptionalExtension};
use std::os::raw::c_int;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{Artist, ArtistId, EventDate, NormalizedSetlist, Song, VenueId};

use super::migrations::MIGRATIONS;

/// A database connection with CRUD methods for setlist entities.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or the schema cannot
    /// be applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for tests).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // SQLite leaves foreign keys off unless asked, per connection.
        conn.pragma_update(None, "foreign_keys", true)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                let tx = self.conn.unchecked_transaction()?;
                tx.execute_batch(migration.sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    }
}

fn has_extended_code(err: &rusqlite::Error, code: c_int) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.extended_code == code)
}

fn find_artist(conn: &Connection, stable_id: &str) -> rusqlite::Result<Option<ArtistId>> {
    conn.query_row(
        "SELECT artist_id FROM artists WHERE mbid = ?1",
        [stable_id],
        |row| row.get::<_, ArtistId>(0),
    )
    .optional()
}

fn artist_id_in(conn: &Connection, name: &str, stable_id: &str) -> Result<ArtistId> {
    match find_artist(conn, stable_id)? {
        Some(id) => Ok(id),
        None => insert_or_requery_artist(conn, name, stable_id),
    }
}

/// Insert a new artist. If another writer inserted the same stable id
/// after our lookup, return that row instead.
fn insert_or_requery_artist(conn: &Connection, name: &str, stable_id: &str) -> Result<ArtistId> {
    match conn.execute(
        "INSERT INTO artists (name, mbid) VALUES (?1, ?2)",
        rusqlite::params![name, stable_id],
    ) {
        Ok(_) => Ok(ArtistId::from_raw(conn.last_insert_rowid())),
        Err(e) if has_extended_code(&e, rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) => {
            log::debug!("Artist {stable_id} appeared concurrently, re-reading");
            find_artist(conn, stable_id)?.ok_or(Error::NotFound {
                entity: "artist",
                id: stable_id.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

fn venue_id_in(
    conn: &Connection,
    name: &str,
    city: Option<&str>,
    country: Option<&str>,
) -> Result<VenueId> {
    let existing = conn
        .query_row(
            "SELECT venue_id FROM venues WHERE name = ?1 AND city IS ?2",
            rusqlite::params![name, city],
            |row| row.get::<_, VenueId>(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO venues (name, city, country) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, city, country],
    )?;
    Ok(VenueId::from_raw(conn.last_insert_rowid()))
}

// Artist and venue resolution
impl Database {
    /// Return the id of the artist with this stable id, creating it if needed.
    ///
    /// # Errors
    /// Returns an error if the lookup or insert fails.
    pub fn get_or_create_artist(&self, name: &str, stable_id: &str) -> Result<ArtistId> {
        artist_id_in(&self.conn, name, stable_id)
    }

    /// Return the id of the venue matching `(name, city)`, creating it if
    /// needed. `country` is stored on creation but never matched on.
    ///
    /// # Errors
    /// Returns an error if the lookup or insert fails.
    pub fn get_or_create_venue(
        &self,
        name: &str,
        city: Option<&str>,
        country: Option<&str>,
    ) -> Result<VenueId> {
        venue_id_in(&self.conn, name, city, country)
    }

    /// Every artist with the number of setlists stored for them, most
    /// setlists first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn artist_summaries(&self) -> Result<Vec<(Artist, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.artist_id, a.name, a.mbid, COUNT(s.setlist_id) AS shows
             FROM artists a
             LEFT JOIN setlists s ON s.artist_id = a.artist_id
             GROUP BY a.artist_id
             ORDER BY shows DESC, a.name",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let shows: i64 = row.get(3)?;
                Ok((
                    Artist {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        stable_id: row.get(2)?,
                    },
                    u64::try_from(shows).unwrap_or(0),
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

// Setlist CRUD
impl Database {
    /// Insert a setlist with its artist, venue and songs in one transaction.
    ///
    /// Returns the setlist id. If any statement fails nothing is written.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateSetlist`] when a setlist with the same id
    /// already exists, or a database error for any other failure.
    pub fn insert_setlist(&self, setlist: &NormalizedSetlist) -> Result<String> {
        let tx = self.conn.unchecked_transaction()?;

        let artist_id = artist_id_in(&tx, &setlist.artist_name, &setlist.artist_stable_id)?;
        let venue_id = venue_id_in(
            &tx,
            &setlist.venue_name,
            setlist.city.as_deref(),
            setlist.country.as_deref(),
        )?;

        tx.execute(
            "INSERT INTO setlists (
                setlist_id, artist_id, venue_id, event_date, date_is_raw,
                tour_name, total_songs, embedding_text
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                setlist.id,
                artist_id,
                venue_id,
                setlist.event_date.as_str(),
                setlist.event_date.is_raw_fallback(),
                setlist.tour_name,
                setlist.total_songs,
                setlist.embedding_text,
            ],
        )
        .map_err(|e| {
            if has_extended_code(&e, rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
                || has_extended_code(&e, rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
            {
                Error::DuplicateSetlist {
                    id: setlist.id.clone(),
                }
            } else {
                Error::Database(e)
            }
        })?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO songs (setlist_id, song_name, position, is_encore)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for song in &setlist.songs {
                stmt.execute(rusqlite::params![
                    setlist.id,
                    song.name,
                    song.position,
                    song.is_encore,
                ])?;
            }
        }

        tx.commit()?;
        Ok(setlist.id.clone())
    }

    /// Hydrate a full setlist (artist, venue, songs by position).
    ///
    /// # Errors
    /// Returns an error if a query fails.
    pub fn get_setlist(&self, id: &str) -> Result<Option<NormalizedSetlist>> {
        let header = self
            .conn
            .query_row(
                "SELECT s.setlist_id, s.event_date, s.date_is_raw, s.tour_name,
                        s.total_songs, s.embedding_text,
                        a.name, a.mbid, v.name, v.city, v.country
                 FROM setlists s
                 JOIN artists a ON s.artist_id = a.artist_id
                 JOIN venues v ON s.venue_id = v.venue_id
                 WHERE s.setlist_id = ?1",
                [id],
                row_to_setlist,
            )
            .optional()?;

        let Some(mut setlist) = header else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT song_name, position, is_encore
             FROM songs
             WHERE setlist_id = ?1
             ORDER BY position",
        )?;
        setlist.songs = stmt
            .query_map([id], |row| {
                Ok(Song {
                    name: row.get(0)?,
                    position: row.get(1)?,
                    is_encore: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let encores = setlist.songs.iter().filter(|s| s.is_encore).count();
        setlist.total_encores = u32::try_from(encores).unwrap_or(u32::MAX);

        Ok(Some(setlist))
    }

    /// Hydrate several setlists, in the order given.
    ///
    /// Ids with no stored setlist are skipped, so the result may be shorter
    /// than `ids`.
    ///
    /// # Errors
    /// Returns an error if a query fails.
    pub fn get_setlists<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<NormalizedSetlist>> {
        let mut setlists = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_setlist(id.as_ref())? {
                Some(setlist) => setlists.push(setlist),
                None => log::debug!("Setlist {} not in database, skipping", id.as_ref()),
            }
        }
        Ok(setlists)
    }

    /// All stored setlist ids, in insertion order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn all_setlist_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT setlist_id FROM setlists ORDER BY rowid")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// `(id, embedding_text)` for every setlist that has summary text, in
    /// insertion order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn list_embedding_texts(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT setlist_id, embedding_text
             FROM setlists
             WHERE embedding_text IS NOT NULL AND embedding_text != ''
             ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn row_to_setlist(row: &rusqlite::Row) -> rusqlite::Result<NormalizedSetlist> {
    let date: String = row.get(1)?;
    let date_is_raw: bool = row.get(2)?;

    Ok(NormalizedSetlist {
        id: row.get(0)?,
        event_date: if date_is_raw {
            EventDate::raw(date)
        } else {
            EventDate::iso(date)
        },
        tour_name: row.get(3)?,
        total_songs: row.get(4)?,
        embedding_text: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        artist_name: row.get(6)?,
        artist_stable_id: row.get(7)?,
        venue_name: row.get(8)?,
        city: row.get(9)?,
        country: row.get(10)?,
        songs: Vec::new(),
        total_encores: 0,
    })
}

// Counts
impl Database {
    fn count(&self, sql: &str) -> Result<u64> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Number of stored artists.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn count_artists(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM artists")
    }

    /// Number of stored venues.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn count_venues(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM venues")
    }

    /// Number of stored setlists.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn count_setlists(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM setlists")
    }

    /// Number of stored songs across all setlists.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn count_songs(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM songs")
    }

    /// Number of setlists whose event date was kept verbatim.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn count_degraded_dates(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM setlists WHERE date_is_raw != 0")
    }
}
