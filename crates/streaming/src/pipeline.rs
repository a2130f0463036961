use std::sync::Arc;

use layers::LayerColors;
use runtime::metrics::{CACHE_HITS, Metrics, TILES_FAILED, TILES_LOADED, TILES_REQUESTED, TILES_RESIDENT};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::TileCache;
use crate::fetch::run_isolated;
use crate::protocol::{TileRequest, TileResponse};
use crate::source::TileSource;
use crate::tile::TileCoord;
use crate::worker::TileWorker;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FetchPriority {
    /// On screen now; fetched directly on the async runtime.
    Visible,
    /// Buffer ring and ancestors; handed to the worker when there is one.
    Prefetch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub url_template: String,
    pub layers: LayerColors,
    pub use_worker: bool,
}

/// Tile cache plus the machinery that fills it.
///
/// The pipeline is the only writer of its cache: fetches report back over a
/// channel and responses are applied in [`FetchPipeline::drain_responses`].
pub struct FetchPipeline {
    cache: TileCache,
    source: Arc<dyn TileSource>,
    config: PipelineConfig,
    runtime: Handle,
    worker: Option<TileWorker>,
    responses_tx: mpsc::UnboundedSender<TileResponse>,
    responses_rx: mpsc::UnboundedReceiver<TileResponse>,
    metrics: Metrics,
}

impl FetchPipeline {
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn TileSource>,
        runtime: Handle,
    ) -> std::io::Result<Self> {
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        let worker = if config.use_worker {
            Some(TileWorker::spawn(Arc::clone(&source), responses_tx.clone())?)
        } else {
            None
        };
        Ok(Self {
            cache: TileCache::new(),
            source,
            config,
            runtime,
            worker,
            responses_tx,
            responses_rx,
            metrics: Metrics::new(),
        })
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut Metrics {
        &mut self.metrics
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Starts a fetch for `tile` unless it already has a cache entry.
    /// Returns whether a fetch was started.
    pub fn ensure(&mut self, tile: TileCoord, priority: FetchPriority) -> bool {
        if !self.cache.begin(tile) {
            self.metrics.incr(CACHE_HITS);
            return false;
        }
        self.metrics.incr(TILES_REQUESTED);

        let request = TileRequest {
            tile: tile.key(),
            layers: self.config.layers.clone(),
            url: self.config.url_template.clone(),
        };

        let request = match (priority, &self.worker) {
            (FetchPriority::Prefetch, Some(worker)) => match worker.post(request) {
                Ok(()) => return true,
                Err(gone) => {
                    warn!(tile = %tile, "tile worker unavailable, fetching directly");
                    gone.0
                }
            },
            _ => request,
        };
        self.spawn_direct(request);
        true
    }

    fn spawn_direct(&self, request: TileRequest) {
        let source = Arc::clone(&self.source);
        let responses = self.responses_tx.clone();
        self.runtime.spawn(async move {
            let response = run_isolated(source, request).await;
            let _ = responses.send(response);
        });
    }

    /// Applies every response that has arrived. Returns how many settled a
    /// pending tile.
    pub fn drain_responses(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(response) = self.responses_rx.try_recv() {
            if self.apply(response) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for the next response and applies it. Returns `false` only if it
    /// was ignored.
    pub async fn settle_next(&mut self) -> bool {
        match self.responses_rx.recv().await {
            Some(response) => self.apply(response),
            // The pipeline holds a sender, so the channel never closes.
            None => false,
        }
    }

    fn apply(&mut self, response: TileResponse) -> bool {
        let tile: TileCoord = match response.tile.parse() {
            Ok(tile) => tile,
            Err(e) => {
                warn!(error = %e, "dropping response with unusable tile key");
                return false;
            }
        };
        let loaded = response.tile_data.is_some();
        match self.cache.complete(tile, response.tile_data) {
            Ok(()) => {
                self.metrics
                    .incr(if loaded { TILES_LOADED } else { TILES_FAILED });
                self.metrics
                    .set_gauge(TILES_RESIDENT, self.cache.len() as u64);
                true
            }
            Err(e) => {
                debug!(error = %e, "ignoring tile response");
                false
            }
        }
    }
}

impl std::fmt::Debug for FetchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPipeline")
            .field("source", &self.source.name())
            .field("cache", &self.cache.stats())
            .field("worker", &self.worker.is_some())
            .finish()
    }
}
