//! setlist.fm REST client.
//!
//! Looks artists up by name and pages through their setlists. Records are
//! returned as raw JSON values; turning them into domain types is the
//! normalizer's job. Requests are paced by a [`RateLimiter`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FetchError, FetchResult};
use crate::resilience::RateLimiter;

const SETLISTFM_API_BASE: &str = "https://api.setlist.fm/rest/1.0/";
const SOURCE_NAME: &str = "setlist.fm";

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    #[serde(default)]
    artist: Vec<ArtistMatch>,
}

#[derive(Debug, Deserialize)]
struct SetlistPage {
    #[serde(default)]
    setlist: Vec<Value>,
}

/// An artist found by name search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistMatch {
    pub name: String,
    /// MusicBrainz id, used as the stable artist key.
    pub mbid: String,
}

/// setlist.fm API client.
#[derive(Debug, Clone)]
pub struct SetlistFmClient {
    http: Client,
    api_key: String,
    base_url: String,
    page_size: usize,
    rate_limiter: RateLimiter,
}

impl SetlistFmClient {
    /// Create a client that waits `request_delay` between requests and
    /// assumes `page_size` setlists per page.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: String, page_size: usize, request_delay: Duration) -> FetchResult<Self> {
        let http = Client::builder()
            .user_agent(concat!(
                "encore/",
                env!("CARGO_PKG_VERSION"),
                " (https://github.com/oxur/encore)"
            ))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_key,
            base_url: SETLISTFM_API_BASE.to_string(),
            page_size: page_size.max(1),
            rate_limiter: RateLimiter::new(request_delay),
        })
    }

    /// Point the client at a different API root (for testing).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> FetchResult<reqwest::Response> {
        self.rate_limiter.acquire().await;

        let url = format!("{}{path}", self.base_url);
        log::debug!("GET {url} {query:?}");
        let response = self
            .http
            .get(&url)
            .header("x-api-key", &self.api_key)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound {
                entity: path.to_string(),
                source_name: SOURCE_NAME.to_string(),
            }),
            StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited {
                source_name: SOURCE_NAME.to_string(),
            }),
            _ => response.error_for_status().map_err(|e| FetchError::Http {
                source_name: SOURCE_NAME.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Find the most relevant artist for `name`.
    ///
    /// Returns `None` when the search has no results.
    pub async fn search_artist(&self, name: &str) -> FetchResult<Option<ArtistMatch>> {
        let response = match self
            .get(
                "search/artists/",
                &[("artistName", name), ("sort", "relevance")],
            )
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let body: ArtistSearchResponse = response.json().await.map_err(|e| FetchError::Parse {
            source_name: SOURCE_NAME.to_string(),
            message: e.to_string(),
        })?;

        let found = body.artist.into_iter().next();
        match &found {
            Some(artist) => log::info!("Found artist {} (mbid {})", artist.name, artist.mbid),
            None => log::warn!("No artist found for search: {name}"),
        }
        Ok(found)
    }

    /// Fetch up to `max` raw setlist records for the artist `mbid`.
    ///
    /// Stops early on an empty page or a 404 past the last page.
    pub async fn get_artist_setlists(&self, mbid: &str, max: usize) -> FetchResult<Vec<Value>> {
        let pages = page_count(max, self.page_size);
        let path = format!("artist/{mbid}/setlists");
        let mut records = Vec::new();

        for page in 1..=pages {
            let p = page.to_string();
            let response = match self.get(&path, &[("p", p.as_str())]).await {
                Ok(response) => response,
                Err(e) if e.is_not_found() => {
                    log::debug!("No page {page} for {mbid}");
                    break;
                }
                Err(e) => return Err(e),
            };

            let body: SetlistPage = response.json().await.map_err(|e| FetchError::Parse {
                source_name: SOURCE_NAME.to_string(),
                message: e.to_string(),
            })?;

            if body.setlist.is_empty() {
                log::debug!("Page {page} for {mbid} is empty");
                break;
            }

            records.extend(body.setlist);
            if records.len() >= max {
                break;
            }
        }

        records.truncate(max);
        log::info!("Fetched {} setlist(s) for {mbid}", records.len());
        Ok(records)
    }
}

/// Pages needed to cover `max` records.
#[must_use]
pub fn page_count(max: usize, page_size: usize) -> usize {
    max.div_ceil(page_size.max(1))
}

/// File name for an artist's raw records.
///
/// The slug is lowercase ASCII letters, digits and `_`; every other
/// character becomes `_`, so the file always lands directly in the raw
/// directory.
#[must_use]
pub fn raw_file_name(artist: &str) -> String {
    let slug: String = artist
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{slug}_raw.json")
}

/// Write raw records as pretty JSON under `dir`. Returns the file path.
pub fn save_raw(dir: &Path, artist: &str, records: &[Value]) -> FetchResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(raw_file_name(artist));
    std::fs::write(&path, serde_json::to_string_pretty(records)?)?;
    log::info!("Saved {} raw record(s) to {}", records.len(), path.display());
    Ok(path)
}

/// Read raw records previously written by [`save_raw`].
pub fn load_raw(dir: &Path, artist: &str) -> FetchResult<Vec<Value>> {
    let path = dir.join(raw_file_name(artist));
    let text = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(100, 20), 5);
        assert_eq!(page_count(101, 20), 6);
        assert_eq!(page_count(5, 20), 1);
        assert_eq!(page_count(0, 20), 0);
    }

    #[test]
    fn test_raw_file_name() {
        assert_eq!(raw_file_name("Grateful Dead"), "grateful_dead_raw.json");
        assert_eq!(raw_file_name("Dead & Company"), "dead___company_raw.json");
        assert_eq!(raw_file_name("AC/DC"), "ac_dc_raw.json");
        assert_eq!(raw_file_name("../escape"), "___escape_raw.json");
        assert_eq!(raw_file_name("Sigur Rós"), "sigur_r__raw.json");
    }

    #[test]
    fn test_save_raw_keeps_slashed_names_in_dir() {
        let dir = TempDir::new().unwrap();
        let records = vec![json!({"id": "1"})];

        let path = save_raw(dir.path(), "AC/DC", &records).unwrap();
        assert_eq!(path.parent().unwrap(), dir.path());
        assert_eq!(load_raw(dir.path(), "AC/DC").unwrap(), records);

        let path = save_raw(dir.path(), "../escape", &records).unwrap();
        assert_eq!(path.parent().unwrap(), dir.path());
    }

    #[test]
    fn test_raw_round_trip() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("raw");
        let records = vec![json!({"id": "1"}), json!({"id": "2"})];

        let path = save_raw(&raw, "Phish", &records).unwrap();
        assert!(path.ends_with("phish_raw.json"));
        assert_eq!(load_raw(&raw, "Phish").unwrap(), records);
    }

    #[test]
    fn test_load_missing_raw_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = load_raw(dir.path(), "Nobody").unwrap_err();
        assert!(matches!(err, FetchError::Io(_)));
    }

    #[test]
    fn test_parse_artist_search() {
        let json = r#"{"type":"artists","itemsPerPage":30,"page":1,"total":2,
            "artist":[{"mbid":"6faa7ca7-0d99-4a5e-bfa6-1fd5037520c6","name":"Grateful Dead","sortName":"Grateful Dead"},
                      {"mbid":"x","name":"Other"}]}"#;
        let body: ArtistSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.artist[0].name, "Grateful Dead");
        assert_eq!(body.artist[0].mbid, "6faa7ca7-0d99-4a5e-bfa6-1fd5037520c6");
    }

    #[test]
    fn test_parse_empty_page() {
        let body: SetlistPage = serde_json::from_str(r#"{"type":"setlists"}"#).unwrap();
        assert!(body.setlist.is_empty());
    }

    #[test]
    fn test_base_url_normalized() {
        let client = SetlistFmClient::new("key".to_string(), 20, Duration::ZERO)
            .unwrap()
            .with_base_url("http://localhost:1234/rest");
        assert_eq!(client.base_url, "http://localhost:1234/rest/");
    }
}
