use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("setlist {id} already exists")]
    DuplicateSetlist { id: String },
}

impl Error {
    /// Returns `true` when an insert was rejected because the setlist was
    /// already ingested.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateSetlist { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
