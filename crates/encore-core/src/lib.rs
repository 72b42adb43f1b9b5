//! Core domain model for encore.
//!
//! This crate defines the normalized setlist model (setlists, songs,
//! artists, venues), the SQLite schema, and the relational store used
//! to persist and hydrate setlists.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod schema;

pub use error::{Error, Result};
pub use model::{ArtistId, EventDate, NormalizedSetlist, Song, VenueId};
pub use schema::Database;
