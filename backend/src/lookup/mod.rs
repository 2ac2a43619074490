//! Lookup sources for the monetary values of invoice lines.
//!
//! A source serves one [`LookupDocument`] (`{ "items": [...] }`) per
//! adjustment run. Fetches are single-shot: no timeout, no retry.
//!
//! | Source | Location |
//! |--------|----------|
//! | [`FileLookup`] | JSON file on disk |
//! | [`HttpLookup`] | `http://` / `https://` URL returning JSON |
//! | [`LookupDocument`] | already in memory |

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::LookupResult;
use crate::models::LookupDocument;

/// Something that can produce the lookup document.
pub trait LookupSource {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// Fetch the whole document.
    fn fetch(&self) -> impl Future<Output = LookupResult<LookupDocument>> + Send;
}

/// Lookup document stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileLookup {
    path: PathBuf,
}

impl FileLookup {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl LookupSource for FileLookup {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> impl Future<Output = LookupResult<LookupDocument>> + Send {
        async move {
            let content = tokio::fs::read(&self.path).await?;
            Ok(serde_json::from_slice(&content)?)
        }
    }
}

/// Lookup document served over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLookup {
    url: String,
    client: reqwest::Client,
}

impl HttpLookup {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl LookupSource for HttpLookup {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> impl Future<Output = LookupResult<LookupDocument>> + Send {
        async move {
            let document = self
                .client
                .get(&self.url)
                .header("Accept", "application/json")
                .send()
                .await?
                .error_for_status()?
                .json::<LookupDocument>()
                .await?;
            Ok(document)
        }
    }
}

impl LookupSource for LookupDocument {
    fn describe(&self) -> String {
        format!("in-memory ({} items)", self.items.len())
    }

    fn fetch(&self) -> impl Future<Output = LookupResult<LookupDocument>> + Send {
        let document = self.clone();
        async move { Ok(document) }
    }
}

/// Source chosen from a configured location string.
#[derive(Debug, Clone)]
pub enum ConfiguredLookup {
    File(FileLookup),
    Http(HttpLookup),
}

impl ConfiguredLookup {
    /// URLs starting with `http://` or `https://` are fetched over HTTP,
    /// anything else is a file path.
    pub fn from_location(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            ConfiguredLookup::Http(HttpLookup::new(location))
        } else {
            ConfiguredLookup::File(FileLookup::new(location))
        }
    }
}

impl LookupSource for ConfiguredLookup {
    fn describe(&self) -> String {
        match self {
            ConfiguredLookup::File(f) => f.describe(),
            ConfiguredLookup::Http(h) => h.describe(),
        }
    }

    fn fetch(&self) -> impl Future<Output = LookupResult<LookupDocument>> + Send {
        async move {
            match self {
                ConfiguredLookup::File(f) => f.fetch().await,
                ConfiguredLookup::Http(h) => h.fetch().await,
            }
        }
    }
}
