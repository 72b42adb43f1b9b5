pub mod artist;
pub mod ids;
pub mod setlist;
pub mod venue;

pub use artist::Artist;
pub use ids::{ArtistId, VenueId};
pub use setlist::{EventDate, NormalizedSetlist, Song};
pub use venue::location_line;
