use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::fetch::run_isolated;
use crate::protocol::{TileRequest, TileResponse};
use crate::source::TileSource;

/// The worker thread has exited; the request was not delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerGone(pub TileRequest);

impl std::fmt::Display for WorkerGone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tile worker is gone, dropped request for {}", self.0.tile)
    }
}

impl std::error::Error for WorkerGone {}

/// Background fetch context on its own OS thread.
///
/// Requests go in over an unbounded channel; every request produces exactly
/// one [`TileResponse`] on the shared response channel. Dropping the handle
/// closes the request channel and lets the thread wind down.
#[derive(Debug)]
pub struct TileWorker {
    requests: mpsc::UnboundedSender<TileRequest>,
    thread: Option<JoinHandle<()>>,
}

impl TileWorker {
    pub fn spawn(
        source: Arc<dyn TileSource>,
        responses: mpsc::UnboundedSender<TileResponse>,
    ) -> std::io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<TileRequest>();

        let thread = std::thread::Builder::new()
            .name("tile-worker".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!(error = %e, "tile worker could not start its runtime");
                        return;
                    }
                };

                rt.block_on(async move {
                    info!("tile worker started");
                    while let Some(request) = rx.recv().await {
                        debug!(tile = %request.tile, "worker fetching");
                        let source = Arc::clone(&source);
                        let responses = responses.clone();
                        tokio::spawn(async move {
                            let response = run_isolated(source, request).await;
                            // The pipeline may already be gone; nothing to report to.
                            let _ = responses.send(response);
                        });
                    }
                    info!("tile worker stopped");
                });
            })?;

        Ok(Self {
            requests: tx,
            thread: Some(thread),
        })
    }

    pub fn post(&self, request: TileRequest) -> Result<(), WorkerGone> {
        self.requests.send(request).map_err(|e| WorkerGone(e.0))
    }

    /// Closes the request channel and waits for the thread to exit.
    pub fn join(mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        drop(self);
        if thread.join().is_err() {
            error!("tile worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use formats::mvt::writer::{LayerWriter, encode_tile};
    use layers::default_layer_colors;

    #[tokio::test]
    async fn worker_answers_every_request() {
        let mut source = MemorySource::new();
        let mut water = LayerWriter::new("waterarea", 4096);
        water.add_polygon(None, &[vec![(0, 0), (4096, 0), (4096, 4096), (0, 4096)]], &[]);
        source.insert("mem://5/3/4", encode_tile(vec![water]));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = TileWorker::spawn(Arc::new(source), tx).unwrap();

        for tile in ["3/4/5", "0/0/5"] {
            worker
                .post(TileRequest {
                    tile: tile.to_string(),
                    layers: default_layer_colors(),
                    url: "mem://{z}/{x}/{y}".to_string(),
                })
                .unwrap();
        }

        let mut responses = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        responses.sort_by(|a, b| a.tile.cmp(&b.tile));
        assert_eq!(responses[0].tile, "0/0/5");
        assert_eq!(responses[0].tile_data, None);
        assert_eq!(responses[1].tile, "3/4/5");
        assert_eq!(
            responses[1].tile_data.as_ref().map(|d| d[0].vertex_count()),
            Some(6)
        );

        worker.join();
    }
}
