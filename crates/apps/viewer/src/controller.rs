use std::sync::Arc;

use foundation::GeoBounds;
use foundation::math::{LngLat, Vec2, lng_lat_to_plane};
use layers::{OUTLINE_COLOR, style_for, tile_outline};
use runtime::metrics::FRAME_MS;
use runtime::{FrameClock, FrameWatchdog, Metrics, WatchdogVerdict};
use streaming::{
    FetchPipeline, FetchPriority, TileRange, TileSelection, TileSource, resolve,
};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::camera::Camera;
use crate::config::{ConfigError, MapConfig};
use crate::draw::{DrawCall, Primitive, Renderer};
use crate::input::PointerEvent;
use crate::viewport::{CanvasSize, ViewportMatrix, at_limits, viewport_bounds};

/// Wheel delta that changes the zoom by one level.
const WHEEL_DELTA_PER_ZOOM: f64 = 500.0;

/// Pixel offset of a debug label from its tile's north-west corner.
const LABEL_OFFSET_PX: f64 = 8.0;

#[derive(Debug)]
pub enum MapError {
    /// Must be constructed from inside a tokio runtime.
    NoRuntime,
    EmptyCanvas { width: f64, height: f64 },
    InvalidConfig(ConfigError),
    Worker(std::io::Error),
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::NoRuntime => write!(f, "no async runtime available"),
            MapError::EmptyCanvas { width, height } => {
                write!(f, "canvas {width}x{height} has no drawable area")
            }
            MapError::InvalidConfig(e) => write!(f, "{e}"),
            MapError::Worker(e) => write!(f, "tile worker failed to start: {e}"),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::InvalidConfig(e) => Some(e),
            MapError::Worker(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameStatus {
    Continue,
    Stopped,
}

type AbortHandler = Box<dyn FnOnce() + Send>;

/// Interactive 2D map: camera, input, tile streaming and drawing.
///
/// Single-threaded; drive it with [`MapController::handle`] for input and
/// [`MapController::frame`] once per display frame. Fetches complete in the
/// background and are picked up at the start of the next frame.
pub struct MapController {
    config: MapConfig,
    range: TileRange,
    camera: Camera,
    canvas: CanvasSize,
    viewport: ViewportMatrix,
    selection: TileSelection,
    /// Clip-space position of the pointer while a pan is active.
    pan_anchor: Option<Vec2>,
    pipeline: FetchPipeline,
    clock: FrameClock,
    watchdog: FrameWatchdog,
    stopped: bool,
    on_abort: Option<AbortHandler>,
}

impl MapController {
    pub fn new(
        config: MapConfig,
        canvas: CanvasSize,
        source: Arc<dyn TileSource>,
    ) -> Result<Self, MapError> {
        config.validate().map_err(MapError::InvalidConfig)?;
        if canvas.is_empty() {
            return Err(MapError::EmptyCanvas {
                width: canvas.width,
                height: canvas.height,
            });
        }
        let runtime = Handle::try_current().map_err(|_| MapError::NoRuntime)?;

        let zoom = config.zoom.clamp(config.min_zoom, config.max_zoom);
        let camera = Camera::looking_at(LngLat::new(config.center[0], config.center[1]), zoom);
        let viewport =
            ViewportMatrix::new(&camera, canvas, config.tile_size).ok_or(MapError::EmptyCanvas {
                width: canvas.width,
                height: canvas.height,
            })?;
        let pipeline = FetchPipeline::new(config.pipeline_config(), source, runtime)
            .map_err(MapError::Worker)?;

        info!(
            tile_url = %config.tile_url,
            worker = pipeline.has_worker(),
            zoom,
            "map started"
        );

        let mut map = Self {
            range: config.tile_range(),
            watchdog: FrameWatchdog::new(config.watchdog.into()),
            config,
            camera,
            canvas,
            viewport,
            selection: TileSelection::default(),
            pan_anchor: None,
            pipeline,
            clock: FrameClock::new(),
            stopped: false,
            on_abort: None,
        };
        map.refresh_tiles();
        Ok(map)
    }

    /// Called once if the frame-rate watchdog stops the map.
    pub fn set_abort_handler(&mut self, handler: impl FnOnce() + Send + 'static) {
        self.on_abort = Some(Box::new(handler));
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn viewport(&self) -> &ViewportMatrix {
        &self.viewport
    }

    pub fn selection(&self) -> &TileSelection {
        &self.selection
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &FetchPipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut FetchPipeline {
        &mut self.pipeline
    }

    pub fn metrics(&self) -> &Metrics {
        self.pipeline.metrics()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn bounds(&self) -> GeoBounds {
        viewport_bounds(
            &self.camera,
            self.canvas,
            self.config.tile_size,
            &self.config.limits,
        )
    }

    /// Applies one input event. Returns whether the camera or canvas changed.
    pub fn handle(&mut self, event: PointerEvent) -> bool {
        if self.stopped {
            return false;
        }
        match event {
            PointerEvent::PanStart { x, y } => {
                self.pan_anchor = Some(self.viewport.pixel_to_clip(x, y));
                false
            }
            PointerEvent::PanMove { x, y } => self.pan_to(x, y),
            PointerEvent::PanEnd => {
                self.pan_anchor = None;
                false
            }
            PointerEvent::Zoom { x, y, delta_y } => self.zoom_at(x, y, delta_y),
            PointerEvent::Resize { width, height } => self.resize(CanvasSize::new(width, height)),
        }
    }

    fn pan_to(&mut self, x: f64, y: f64) -> bool {
        let Some(anchor) = self.pan_anchor else {
            return false;
        };
        let pointer = self.viewport.pixel_to_clip(x, y);
        let delta = self.viewport.clip_to_plane(anchor) - self.viewport.clip_to_plane(pointer);
        let proposed = self.camera.translated(delta);

        if !self.commit(proposed) {
            debug!(x = proposed.x, y = proposed.y, "pan rejected at map limits");
            return false;
        }
        self.pan_anchor = Some(pointer);
        true
    }

    fn zoom_at(&mut self, x: f64, y: f64, delta_y: f64) -> bool {
        let zoom = (self.camera.zoom - delta_y / WHEEL_DELTA_PER_ZOOM)
            .clamp(self.config.min_zoom, self.config.max_zoom);
        if zoom == self.camera.zoom || !zoom.is_finite() {
            return false;
        }

        // Keep the plane point under the pointer fixed.
        let pointer = self.viewport.pixel_to_clip(x, y);
        let pre = self.viewport.clip_to_plane(pointer);
        let zoomed = self.camera.with_zoom(zoom);
        let Some(zoomed_viewport) = ViewportMatrix::new(&zoomed, self.canvas, self.config.tile_size)
        else {
            return false;
        };
        let post = zoomed_viewport.clip_to_plane(pointer);
        let proposed = zoomed.translated(pre - post);

        if !self.commit(proposed) {
            debug!(zoom, "zoom rejected at map limits");
            return false;
        }
        true
    }

    fn resize(&mut self, canvas: CanvasSize) -> bool {
        let Some(viewport) = ViewportMatrix::new(&self.camera, canvas, self.config.tile_size) else {
            debug!(width = canvas.width, height = canvas.height, "ignoring empty canvas");
            return false;
        };
        self.canvas = canvas;
        self.viewport = viewport;
        self.refresh_tiles();
        true
    }

    /// Moves to `proposed` unless its view reaches the map limits.
    fn commit(&mut self, proposed: Camera) -> bool {
        if !proposed.position().is_finite()
            || at_limits(
                &proposed,
                self.canvas,
                self.config.tile_size,
                &self.config.limits,
            )
        {
            return false;
        }
        let Some(viewport) = ViewportMatrix::new(&proposed, self.canvas, self.config.tile_size)
        else {
            return false;
        };
        self.camera = proposed;
        self.viewport = viewport;
        self.refresh_tiles();
        true
    }

    /// Recomputes the tile selection and starts fetches for anything missing,
    /// visible tiles first.
    pub fn refresh_tiles(&mut self) {
        self.selection = self.range.select(&self.bounds(), self.camera.zoom);

        let mut started = 0;
        for tile in &self.selection.visible {
            if self.pipeline.ensure(*tile, FetchPriority::Visible) {
                started += 1;
            }
        }
        for tile in &self.selection.prefetch {
            if self.selection.is_visible(tile) {
                continue;
            }
            if self.pipeline.ensure(*tile, FetchPriority::Prefetch) {
                started += 1;
            }
        }
        debug!(
            zoom = self.selection.zoom,
            visible = self.selection.visible.len(),
            prefetch = self.selection.prefetch.len(),
            started,
            "tiles refreshed"
        );
    }

    /// Runs one display frame: applies finished fetches, draws, then checks the
    /// frame rate.
    pub fn frame<R: Renderer>(&mut self, now_ms: f64, renderer: &mut R) -> FrameStatus {
        if self.stopped {
            return FrameStatus::Stopped;
        }
        let frame = self.clock.tick(now_ms);
        self.pipeline.drain_responses();
        self.render(renderer);

        if let Some(dt) = frame.dt_ms {
            self.pipeline.metrics_mut().record_ms(FRAME_MS, dt);
        }
        match self.watchdog.observe(&frame) {
            WatchdogVerdict::Healthy => FrameStatus::Continue,
            WatchdogVerdict::Slow { consecutive } => {
                debug!(consecutive, fps = frame.fps(), "slow frame");
                FrameStatus::Continue
            }
            WatchdogVerdict::Tripped => {
                self.stop(frame.fps());
                FrameStatus::Stopped
            }
        }
    }

    fn stop(&mut self, fps: Option<f64>) {
        self.stopped = true;
        self.pan_anchor = None;
        warn!(
            fps,
            min_fps = self.watchdog.config().min_fps,
            "frame rate too low, stopping map"
        );
        if let Some(abort) = self.on_abort.take() {
            abort();
        }
    }

    fn render<R: Renderer>(&self, renderer: &mut R) {
        renderer.begin_frame(self.viewport.matrix());

        for tile in &self.selection.visible {
            let resolved = resolve(self.pipeline.cache(), tile);
            for layers in resolved.layer_sets() {
                for layer in layers.iter() {
                    if layer.is_empty() {
                        continue;
                    }
                    let Some(style) = style_for(&self.config.layers, &layer.layer) else {
                        continue;
                    };
                    renderer.draw(&DrawCall::new(
                        style.color,
                        &layer.vertices,
                        Primitive::Triangles,
                    ));
                }
            }
        }

        if self.config.debug_tiles {
            for tile in &self.selection.visible {
                let bounds = tile.bounds();
                let outline = tile_outline(&bounds);
                renderer.draw(&DrawCall::new(OUTLINE_COLOR, &outline, Primitive::Lines));

                let corner = self
                    .viewport
                    .plane_to_pixel(lng_lat_to_plane(LngLat::new(bounds.west, bounds.north)));
                renderer.label(
                    &tile.key(),
                    [corner.x + LABEL_OFFSET_PX, corner.y + LABEL_OFFSET_PX],
                );
            }
        }

        renderer.end_frame();
    }
}

impl std::fmt::Debug for MapController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapController")
            .field("camera", &self.camera)
            .field("canvas", &self.canvas)
            .field("selection_zoom", &self.selection.zoom)
            .field("visible", &self.selection.visible.len())
            .field("pipeline", &self.pipeline)
            .field("stopped", &self.stopped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::CountingRenderer;
    use formats::mvt::writer::{LayerWriter, encode_tile};
    use foundation::math::plane_to_lng_lat;
    use runtime::metrics::TILES_REQUESTED;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use streaming::{MemorySource, TileCoord, TileState};

    const TEMPLATE: &str = "mem://{z}/{x}/{y}.pbf";

    fn config() -> MapConfig {
        MapConfig {
            tile_url: TEMPLATE.to_string(),
            use_worker: false,
            ..MapConfig::default()
        }
    }

    fn lake() -> Vec<u8> {
        let mut water = LayerWriter::new("waterarea", 4096);
        water.add_polygon(None, &[vec![(0, 0), (4096, 0), (4096, 4096), (0, 4096)]], &[]);
        encode_tile(vec![water])
    }

    fn start(config: MapConfig, canvas: CanvasSize) -> (MapController, Arc<MemorySource>) {
        let source = Arc::new(MemorySource::new());
        let map = MapController::new(config, canvas, source.clone()).unwrap();
        (map, source)
    }

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn startup_needs_a_runtime() {
        let err = MapController::new(
            config(),
            CanvasSize::new(512.0, 512.0),
            Arc::new(MemorySource::new()),
        )
        .unwrap_err();
        assert!(matches!(err, MapError::NoRuntime));
    }

    #[tokio::test]
    async fn startup_rejects_empty_canvas_and_bad_config() {
        let err = MapController::new(
            config(),
            CanvasSize::new(0.0, 512.0),
            Arc::new(MemorySource::new()),
        )
        .unwrap_err();
        assert!(matches!(err, MapError::EmptyCanvas { .. }));

        let bad = MapConfig {
            tile_url: String::new(),
            ..config()
        };
        let err = MapController::new(bad, CanvasSize::new(512.0, 512.0), Arc::new(MemorySource::new()))
            .unwrap_err();
        assert!(matches!(err, MapError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn manhattan_view_selects_four_tiles() {
        let center = plane_to_lng_lat(Vec2::new(-0.411, 0.248));
        let (map, _) = start(
            MapConfig {
                center: [center.lng, center.lat],
                zoom: 13.0,
                ..config()
            },
            CanvasSize::new(512.0, 512.0),
        );

        let sel = map.selection();
        assert_eq!(sel.zoom, 13);
        assert_eq!(
            sel.visible,
            vec![
                TileCoord::new(13, 2412, 3079),
                TileCoord::new(13, 2412, 3080),
                TileCoord::new(13, 2413, 3079),
                TileCoord::new(13, 2413, 3080),
            ]
        );
        for t in &sel.visible {
            assert!(map.pipeline().cache().get(t).is_some());
        }
        // The buffered rectangle already contains every visible tile.
        assert_eq!(
            map.metrics().counter(TILES_REQUESTED),
            sel.prefetch.len() as u64
        );
    }

    #[tokio::test]
    async fn pan_moves_camera_until_limits() {
        let (mut map, _) = start(
            MapConfig {
                limits: GeoBounds::new(139.0, 35.0, 140.5, 36.5),
                ..config()
            },
            CanvasSize::new(800.0, 600.0),
        );
        let start = map.camera();

        map.handle(PointerEvent::PanStart { x: 400.0, y: 300.0 });
        assert!(map.handle(PointerEvent::PanMove { x: 0.0, y: 300.0 }));
        let moved = map.camera();
        assert!(moved.x > start.x, "dragging left moves the view east");
        assert_close(moved.y, start.y, 1e-12);

        assert!(!map.handle(PointerEvent::PanMove { x: -800.0, y: 300.0 }));
        assert_eq!(map.camera(), moved);

        map.handle(PointerEvent::PanEnd);
        assert!(!map.handle(PointerEvent::PanMove { x: 400.0, y: 300.0 }));
        assert_eq!(map.camera(), moved);
    }

    #[tokio::test]
    async fn pan_keeps_point_under_pointer() {
        let (mut map, _) = start(config(), CanvasSize::new(800.0, 600.0));
        let grabbed = map.viewport().pixel_to_plane(200.0, 150.0);

        map.handle(PointerEvent::PanStart { x: 200.0, y: 150.0 });
        map.handle(PointerEvent::PanMove { x: 260.0, y: 100.0 });
        map.handle(PointerEvent::PanMove { x: 300.0, y: 120.0 });

        let px = map.viewport().plane_to_pixel(grabbed);
        assert_close(px.x, 300.0, 1e-6);
        assert_close(px.y, 120.0, 1e-6);
    }

    #[tokio::test]
    async fn zoom_keeps_focus_point_fixed() {
        let (mut map, _) = start(config(), CanvasSize::new(1024.0, 768.0));
        let focus = map.viewport().pixel_to_plane(100.0, 650.0);

        assert!(map.handle(PointerEvent::Zoom {
            x: 100.0,
            y: 650.0,
            delta_y: -250.0
        }));
        assert_close(map.camera().zoom, 10.5, 1e-12);

        let px = map.viewport().plane_to_pixel(focus);
        assert!((px.x - 100.0).abs() < 1.0 && (px.y - 650.0).abs() < 1.0, "{px:?}");
    }

    #[tokio::test]
    async fn zoom_clamps_to_configured_range() {
        let (mut map, _) = start(config(), CanvasSize::new(512.0, 512.0));
        assert!(map.handle(PointerEvent::Zoom {
            x: 256.0,
            y: 256.0,
            delta_y: -1.0e6
        }));
        assert_eq!(map.camera().zoom, 18.0);
        assert_eq!(map.selection().zoom, 16);

        assert!(!map.handle(PointerEvent::Zoom {
            x: 256.0,
            y: 256.0,
            delta_y: -10.0
        }));
    }

    #[tokio::test]
    async fn zoom_out_past_world_edge_is_rejected() {
        let (mut map, _) = start(
            MapConfig {
                center: [0.0, 0.0],
                zoom: 6.0,
                min_zoom: 0.0,
                ..config()
            },
            CanvasSize::new(1024.0, 1024.0),
        );
        let before = map.camera();
        assert!(!map.handle(PointerEvent::Zoom {
            x: 512.0,
            y: 512.0,
            delta_y: 3000.0
        }));
        assert_eq!(map.camera(), before);
    }

    #[tokio::test]
    async fn resize_updates_canvas_and_ignores_empty() {
        let (mut map, _) = start(config(), CanvasSize::new(512.0, 512.0));
        let small = map.selection().visible.len();

        assert!(map.handle(PointerEvent::Resize {
            width: 2048.0,
            height: 1536.0
        }));
        assert_eq!(map.canvas(), CanvasSize::new(2048.0, 1536.0));
        assert!(map.selection().visible.len() > small);

        assert!(!map.handle(PointerEvent::Resize {
            width: 0.0,
            height: 0.0
        }));
        assert_eq!(map.canvas(), CanvasSize::new(2048.0, 1536.0));
    }

    #[tokio::test]
    async fn frame_draws_loaded_tiles_and_debug_outlines() {
        let cfg = MapConfig {
            debug_tiles: true,
            ..config()
        };
        let canvas = CanvasSize::new(512.0, 512.0);

        // Work out the visible set up front so the source can serve it.
        let camera = Camera::looking_at(LngLat::new(cfg.center[0], cfg.center[1]), cfg.zoom);
        let bounds = viewport_bounds(&camera, canvas, cfg.tile_size, &cfg.limits);
        let visible = cfg.tile_range().select(&bounds, cfg.zoom).visible;

        let mut source = MemorySource::new();
        for t in &visible {
            source.insert(t.url(TEMPLATE), lake());
        }
        let mut map = MapController::new(cfg, canvas, Arc::new(source)).unwrap();

        while visible.iter().any(|t| {
            map.pipeline()
                .cache()
                .get(t)
                .is_some_and(TileState::is_pending)
        }) {
            map.pipeline_mut().settle_next().await;
        }

        let mut renderer = CountingRenderer::new();
        assert_eq!(map.frame(0.0, &mut renderer), FrameStatus::Continue);
        assert_eq!(renderer.frames, 1);
        assert_eq!(renderer.triangle_calls, visible.len() as u64);
        assert_eq!(renderer.line_calls, visible.len() as u64);
        assert_eq!(renderer.labels.len(), visible.len());
        assert_eq!(renderer.labels[0].0, visible[0].key());
        assert_eq!(renderer.last_matrix, Some(*map.viewport().matrix()));
    }

    #[tokio::test]
    async fn watchdog_stops_map_once() {
        let (mut map, _) = start(
            MapConfig {
                watchdog: crate::config::WatchdogSettings {
                    min_fps: 10.0,
                    max_slow_frames: 2,
                },
                ..config()
            },
            CanvasSize::new(512.0, 512.0),
        );
        let aborts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&aborts);
        map.set_abort_handler(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut renderer = CountingRenderer::new();
        let statuses: Vec<FrameStatus> = [0.0, 200.0, 400.0, 600.0, 800.0]
            .into_iter()
            .map(|t| map.frame(t, &mut renderer))
            .collect();
        assert_eq!(
            statuses,
            vec![
                FrameStatus::Continue,
                FrameStatus::Continue,
                FrameStatus::Continue,
                FrameStatus::Stopped,
                FrameStatus::Stopped,
            ]
        );
        assert!(map.is_stopped());
        assert_eq!(aborts.load(Ordering::SeqCst), 1);
        assert_eq!(renderer.frames, 4);

        let before = map.camera();
        assert!(!map.handle(PointerEvent::Zoom {
            x: 0.0,
            y: 0.0,
            delta_y: -100.0
        }));
        assert_eq!(map.camera(), before);
    }
}
