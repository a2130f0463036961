use std::sync::Arc;

use formats::{DecodedTile, MvtError, decode_tile};
use layers::{TileLayer, tessellate_tile};
use tracing::warn;

use crate::protocol::{TileRequest, TileResponse};
use crate::source::TileSource;
use crate::tile::{TileCoord, TileKeyError};

#[derive(Debug)]
pub enum FetchError {
    Network {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    NotFound {
        url: String,
    },
    Status {
        url: String,
        status: u16,
    },
    Decode {
        tile: TileCoord,
        source: MvtError,
    },
    InvalidKey(TileKeyError),
}

impl FetchError {
    pub fn network(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        FetchError::Network {
            url: url.into(),
            source: Box::new(source),
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network { url, source } => write!(f, "request to {url} failed: {source}"),
            FetchError::NotFound { url } => write!(f, "no tile at {url}"),
            FetchError::Status { url, status } => write!(f, "{url} answered HTTP {status}"),
            FetchError::Decode { tile, source } => write!(f, "tile {tile} failed to decode: {source}"),
            FetchError::InvalidKey(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Network { source, .. } => Some(source.as_ref()),
            FetchError::Decode { source, .. } => Some(source),
            FetchError::InvalidKey(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TileKeyError> for FetchError {
    fn from(e: TileKeyError) -> Self {
        FetchError::InvalidKey(e)
    }
}

/// Fetches, decodes and tessellates one tile.
///
/// Only layers named in the request's color table are returned, in table
/// order. A layer the tile lacks is omitted; a present layer without polygons
/// comes back with no vertices.
pub async fn fetch_tile(
    source: &dyn TileSource,
    request: &TileRequest,
) -> Result<Vec<TileLayer>, FetchError> {
    let tile: TileCoord = request.tile.parse()?;
    let decoded = fetch_decoded(source, tile, &request.url).await?;

    Ok(tessellate_tile(
        &decoded,
        request.layers.keys().map(String::as_str),
    ))
}

/// Fetches and decodes one tile, keeping every layer and feature.
pub async fn fetch_decoded(
    source: &dyn TileSource,
    tile: TileCoord,
    template: &str,
) -> Result<DecodedTile, FetchError> {
    let url = tile.url(template);
    let bytes = source
        .get_tile(&url)
        .await?
        .ok_or_else(|| FetchError::NotFound { url: url.clone() })?;

    decode_tile(&bytes, tile.x, tile.y, tile.z).map_err(|source| FetchError::Decode { tile, source })
}

/// Runs a request to completion, folding failures into an empty response.
pub async fn run_request(source: &dyn TileSource, request: TileRequest) -> TileResponse {
    match fetch_tile(source, &request).await {
        Ok(layers) => TileResponse::ready(request.tile, layers),
        Err(e) => {
            warn!(tile = %request.tile, error = %e, "tile fetch failed");
            TileResponse::failed(request.tile)
        }
    }
}

/// Runs a request on its own task, so a panic while fetching or decoding
/// still settles the tile with a failed response.
pub async fn run_isolated(source: Arc<dyn TileSource>, request: TileRequest) -> TileResponse {
    let tile = request.tile.clone();
    let task = tokio::spawn(async move { run_request(source.as_ref(), request).await });
    match task.await {
        Ok(response) => response,
        Err(e) => {
            warn!(tile = %tile, error = %e, "tile fetch task died");
            TileResponse::failed(tile)
        }
    }
}
