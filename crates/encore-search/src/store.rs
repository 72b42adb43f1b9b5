//! Persistent vector store backed by SQLite.
//!
//! Vectors live in named collections and are compared by cosine distance
//! (`1 - cos θ`, range `[0, 2]`). Search is an exact scan, which is
//! plenty for a few thousand setlists and keeps results deterministic.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::error::{SearchError, SearchResult};

/// Default collection holding setlist summaries.
pub const DEFAULT_COLLECTION: &str = "setlists";

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    space TEXT NOT NULL,
    dimension INTEGER
);

CREATE TABLE IF NOT EXISTS vectors (
    collection TEXT NOT NULL REFERENCES collections(name),
    id TEXT NOT NULL,
    embedding BLOB NOT NULL,
    document TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);
";

/// A vector ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
}

/// A stored vector matched by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredHit {
    pub id: String,
    pub distance: f64,
    pub document: String,
}

/// A named collection of vectors in a SQLite file.
#[derive(Debug)]
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    collection: String,
}

impl SqliteVectorStore {
    /// Open (or create) the store at `path`, using `collection`.
    pub fn open(path: impl AsRef<Path>, collection: &str) -> SearchResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        log::debug!("Opening vector store at {}", path.display());
        Self::init(Connection::open(path)?, collection)
    }

    /// Create a throwaway in-memory store.
    pub fn open_in_memory(collection: &str) -> SearchResult<Self> {
        Self::init(Connection::open_in_memory()?, collection)
    }

    fn init(conn: Connection, collection: &str) -> SearchResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        conn.execute(
            "INSERT OR IGNORE INTO collections (name, space) VALUES (?1, 'cosine')",
            params![collection],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `records` in one transaction. Either all are stored or none.
    ///
    /// Fails on an id that is already present and on vectors whose length
    /// differs from the collection's dimension (fixed by the first insert).
    pub fn add(&self, records: &[VectorRecord]) -> SearchResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let stored: Option<i64> = tx
            .query_row(
                "SELECT dimension FROM collections WHERE name = ?1",
                params![self.collection],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .flatten();
        let dimension = match stored {
            Some(d) => usize::try_from(d)
                .map_err(|_| SearchError::InvalidVector(format!("stored dimension {d}")))?,
            None => records[0].embedding.len(),
        };

        {
            let mut stmt = tx.prepare(
                "INSERT INTO vectors (collection, id, embedding, document)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                if record.embedding.is_empty() || record.embedding.len() != dimension {
                    return Err(SearchError::InvalidVector(format!(
                        "{} has {} dimensions, expected {dimension}",
                        record.id,
                        record.embedding.len()
                    )));
                }
                stmt.execute(params![
                    self.collection,
                    record.id,
                    encode(&record.embedding),
                    record.document
                ])
                .map_err(|e| match e.sqlite_error_code() {
                    Some(ErrorCode::ConstraintViolation) => SearchError::DuplicateRecord {
                        id: record.id.clone(),
                    },
                    _ => SearchError::Store(e),
                })?;
            }
        }

        if stored.is_none() {
            tx.execute(
                "UPDATE collections SET dimension = ?1 WHERE name = ?2",
                params![i64::try_from(dimension).unwrap_or(i64::MAX), self.collection],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// The `k` stored vectors closest to `query`, nearest first.
    ///
    /// Ties in distance are broken by id so results are stable.
    pub fn query(&self, query: &[f32], k: usize) -> SearchResult<Vec<StoredHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT id, embedding, document FROM vectors WHERE collection = ?1")?;
        let rows = stmt.query_map(params![self.collection], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (id, blob, document) = row?;
            let embedding = decode(&blob)
                .ok_or_else(|| SearchError::InvalidVector(format!("corrupt blob for {id}")))?;
            hits.push(StoredHit {
                distance: cosine_distance(query, &embedding),
                id,
                document,
            });
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Number of vectors in the collection.
    pub fn count(&self) -> SearchResult<u64> {
        let conn = self.lock();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vectors WHERE collection = ?1",
            params![self.collection],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Ids of every vector in the collection.
    pub fn ids(&self) -> SearchResult<HashSet<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT id FROM vectors WHERE collection = ?1")?;
        let ids = stmt
            .query_map(params![self.collection], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }
}

/// Cosine distance `1 - cos θ`, clamped to `[0, 2]`.
///
/// A zero vector has no direction and is treated as orthogonal to
/// everything (distance 1). Mismatched lengths compare the shared prefix.
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 2.0)
}

fn encode(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
