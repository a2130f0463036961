//! Where tile bytes come from.
//!
//! A source receives a fully substituted location (URL or path) and returns
//! the raw tile body. `Ok(None)` means the tile does not exist.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::fetch::FetchError;

/// Boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait TileSource: Send + Sync {
    fn name(&self) -> &str;

    fn get_tile<'a>(&'a self, location: &'a str)
    -> BoxFuture<'a, Result<Option<Vec<u8>>, FetchError>>;
}

/// Picks a source for a URL template: HTTP(S) templates go over the network,
/// anything else is read from disk.
pub fn source_for_template(template: &str) -> Arc<dyn TileSource> {
    if template.starts_with("http://") || template.starts_with("https://") {
        Arc::new(HttpSource::new())
    } else {
        Arc::new(FilesystemSource::new())
    }
}

/// HTTP tile source.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn get_tile<'a>(
        &'a self,
        location: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, FetchError>> {
        Box::pin(async move {
            let resp = self
                .client
                .get(location)
                .send()
                .await
                .map_err(|e| FetchError::network(location, e))?;

            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !resp.status().is_success() {
                return Err(FetchError::Status {
                    url: location.to_string(),
                    status: resp.status().as_u16(),
                });
            }

            let body = resp
                .bytes()
                .await
                .map_err(|e| FetchError::network(location, e))?;
            Ok(Some(body.to_vec()))
        })
    }
}

/// Reads tiles from local paths; a `file://` prefix is accepted.
#[derive(Debug, Default)]
pub struct FilesystemSource;

impl FilesystemSource {
    pub fn new() -> Self {
        Self
    }
}

impl TileSource for FilesystemSource {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn get_tile<'a>(
        &'a self,
        location: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, FetchError>> {
        let path = PathBuf::from(location.strip_prefix("file://").unwrap_or(location));
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(Some(data)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(FetchError::network(location, e)),
            }
        })
    }
}

/// In-memory tiles keyed by location. Counts every request it serves.
#[derive(Debug, Default)]
pub struct MemorySource {
    tiles: BTreeMap<String, Vec<u8>>,
    broken: BTreeMap<String, String>,
    requests: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, bytes: Vec<u8>) {
        self.tiles.insert(location.into(), bytes);
    }

    /// Makes every request for `location` fail with a network error.
    pub fn break_location(&mut self, location: impl Into<String>, reason: impl Into<String>) {
        self.broken.insert(location.into(), reason.into());
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn requests_for(&self, location: &str) -> usize {
        self.log
            .lock()
            .map(|log| log.iter().filter(|l| l.as_str() == location).count())
            .unwrap_or(0)
    }
}

impl TileSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_tile<'a>(
        &'a self,
        location: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, FetchError>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.log.lock() {
            log.push(location.to_string());
        }
        Box::pin(async move {
            if let Some(reason) = self.broken.get(location) {
                return Err(FetchError::network(
                    location,
                    std::io::Error::other(reason.clone()),
                ));
            }
            Ok(self.tiles.get(location).cloned())
        })
    }
}

/// Panics on every request, standing in for a source with a bug.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct PanickingSource;

#[cfg(test)]
impl TileSource for PanickingSource {
    fn name(&self) -> &str {
        "panicking"
    }

    fn get_tile<'a>(
        &'a self,
        location: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, FetchError>> {
        panic!("tile store corrupted at {location}")
    }
}
