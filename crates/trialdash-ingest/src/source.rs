//! Where source payloads come from: HTTP endpoints or local files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use tracing::debug;

use crate::error::{IngestError, Result};

/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Placeholder replaced by the organizational unit name in per-unit locations.
pub const UNIT_PLACEHOLDER: &str = "{unit}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Url(String),
    Path(PathBuf),
}

impl Location {
    /// `http://` and `https://` strings are URLs, anything else a path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Location::Url(trimmed.to_string())
        } else {
            Location::Path(PathBuf::from(trimmed))
        }
    }

    /// Expands `{unit}` with the given unit name.
    pub fn for_unit(&self, unit: &str) -> Location {
        match self {
            Location::Url(url) => Location::Url(url.replace(UNIT_PLACEHOLDER, unit)),
            Location::Path(path) => Location::Path(PathBuf::from(
                path.to_string_lossy().replace(UNIT_PLACEHOLDER, unit),
            )),
        }
    }

    pub fn is_per_unit(&self) -> bool {
        match self {
            Location::Url(url) => url.contains(UNIT_PLACEHOLDER),
            Location::Path(path) => path.to_string_lossy().contains(UNIT_PLACEHOLDER),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Url(url) => f.write_str(url),
            Location::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Source of raw payload bytes.
pub trait Fetcher {
    fn fetch(&self, location: &Location) -> Result<Vec<u8>>;
}

/// Blocking HTTP client with a fixed timeout; local paths are read from disk.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| IngestError::Fetch {
                location: "<client>".to_string(),
                reason: error.to_string(),
            })?;
        Ok(Self { client })
    }

    fn fetch_url(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "fetching");
        let response = self
            .client
            .get(url)
            .header(
                USER_AGENT,
                format!("trialdash/{}", env!("CARGO_PKG_VERSION")),
            )
            .send()
            .map_err(|error| IngestError::Fetch {
                location: url.to_string(),
                reason: error.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Status {
                location: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().map_err(|error| IngestError::Fetch {
            location: url.to_string(),
            reason: error.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, location: &Location) -> Result<Vec<u8>> {
        match location {
            Location::Url(url) => self.fetch_url(url),
            Location::Path(path) => read_path(path),
        }
    }
}

fn read_path(path: &PathBuf) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| IngestError::Io {
        path: path.clone(),
        source,
    })
}

/// In-memory payloads keyed by location string; anything else is a fetch failure.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    payloads: BTreeMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, location: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        self.payloads.insert(location.into(), payload.into());
        self
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, location: &Location) -> Result<Vec<u8>> {
        let key = location.to_string();
        self.payloads
            .get(&key)
            .cloned()
            .ok_or(IngestError::Status {
                location: key,
                status: 404,
            })
    }
}

/// Locations to fetch for a source: one per unit when the location is
/// per-unit and units are configured, otherwise the location itself under
/// the unit name `all`.
pub fn unit_locations(location: &Location, units: &[String]) -> Vec<(String, Location)> {
    if location.is_per_unit() && !units.is_empty() {
        units
            .iter()
            .map(|unit| (unit.clone(), location.for_unit(unit)))
            .collect()
    } else {
        vec![("all".to_string(), location.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_urls_and_paths() {
        assert_eq!(
            Location::parse("https://example.org/api?op=weekly"),
            Location::Url("https://example.org/api?op=weekly".into())
        );
        assert_eq!(
            Location::parse("assets/terms.csv"),
            Location::Path(PathBuf::from("assets/terms.csv"))
        );
    }

    #[test]
    fn expands_units() {
        let location = Location::parse("https://example.org/api?site={unit}");
        let locations = unit_locations(&location, &["a".into(), "b".into()]);
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[1].1.to_string(), "https://example.org/api?site=b");

        let single = Location::parse("https://example.org/api");
        assert_eq!(unit_locations(&single, &["a".into()]).len(), 1);
    }

    #[test]
    fn static_fetcher_misses_are_fetch_failures() {
        let fetcher = StaticFetcher::new().with("mem://x", "payload");
        assert_eq!(fetcher.fetch(&Location::parse("mem://x")).unwrap(), b"payload");
        let error = fetcher.fetch(&Location::parse("mem://y")).unwrap_err();
        assert!(error.is_fetch_failure());
    }
}
