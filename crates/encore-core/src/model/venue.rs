//! Venue display helpers.
//!
//! Venues are matched on `(name, city)` only. Two venues that share a name
//! and city but report different countries collapse into one row, keeping
//! the country of whichever was stored first.

/// Comma-joined `name, city, country`, skipping absent parts.
#[must_use]
pub fn location_line(name: &str, city: Option<&str>, country: Option<&str>) -> String {
    std::iter::once(name)
        .chain(city)
        .chain(country)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
