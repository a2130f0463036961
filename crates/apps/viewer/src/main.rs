use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use foundation::math::LngLat;
use serde_json::json;
use streaming::{TileCoord, TileRequest, TileState, fetch_decoded, fetch_tile, source_for_template};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use viewer::{
    Camera, CanvasSize, CountingRenderer, FrameStatus, MapConfig, MapController, PointerEvent,
    viewport_bounds,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless vector tile map viewer")]
struct Args {
    /// JSON map config; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tile URL template with {x}, {y} and {z} (default: config, then TILE_BASE_URL)
    #[arg(long)]
    tile_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print viewport bounds and the tiles selected for a camera
    Tiles {
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,

        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long)]
        zoom: Option<f64>,

        #[arg(long, default_value_t = 1280.0)]
        width: f64,

        #[arg(long, default_value_t = 720.0)]
        height: f64,
    },

    /// Fetch and decode one tile, given as x/y/z
    Fetch {
        tile: String,

        /// Print every layer as a GeoJSON FeatureCollection instead
        #[arg(long)]
        geojson: bool,
    },

    /// Drive a headless map through a JSON list of pointer events
    Replay {
        script: PathBuf,

        #[arg(long, default_value_t = 1280.0)]
        width: f64,

        #[arg(long, default_value_t = 720.0)]
        height: f64,

        /// Simulated time between frames
        #[arg(long, default_value_t = 16.0)]
        frame_ms: f64,

        /// Extra frames to run after the script while visible tiles load
        #[arg(long, default_value_t = 300)]
        settle_frames: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => MapConfig::load(path)?,
        None => MapConfig::default(),
    };
    if let Some(url) = args.tile_url {
        config.tile_url = url;
    }
    let config = config.with_env_overrides();

    match args.command {
        Command::Tiles {
            lng,
            lat,
            zoom,
            width,
            height,
        } => {
            print_tiles(&config, lng, lat, zoom, CanvasSize::new(width, height));
            Ok(())
        }
        Command::Fetch { tile, geojson } => fetch(&config, &tile, geojson).await,
        Command::Replay {
            script,
            width,
            height,
            frame_ms,
            settle_frames,
        } => {
            replay(
                config,
                &script,
                CanvasSize::new(width, height),
                frame_ms,
                settle_frames,
            )
            .await
        }
    }
}

fn print_tiles(
    config: &MapConfig,
    lng: Option<f64>,
    lat: Option<f64>,
    zoom: Option<f64>,
    canvas: CanvasSize,
) {
    let center = LngLat::new(lng.unwrap_or(config.center[0]), lat.unwrap_or(config.center[1]));
    let zoom = zoom.unwrap_or(config.zoom);
    let camera = Camera::looking_at(center, zoom);
    let bounds = viewport_bounds(&camera, canvas, config.tile_size, &config.limits);
    let selection = config.tile_range().select(&bounds, zoom);

    println!("camera  x={:.6} y={:.6} zoom={zoom}", camera.x, camera.y);
    println!("bounds  {:?}", bounds.to_array());
    println!("tile zoom {}", selection.zoom);
    let visible: Vec<String> = selection.visible.iter().map(TileCoord::key).collect();
    println!("visible ({}): {}", visible.len(), visible.join(" "));
    let prefetch: Vec<String> = selection.prefetch.iter().map(TileCoord::key).collect();
    println!("prefetch ({}): {}", prefetch.len(), prefetch.join(" "));
}

async fn fetch(config: &MapConfig, key: &str, geojson: bool) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let tile: TileCoord = key.parse()?;
    let source = source_for_template(&config.tile_url);
    info!(tile = %tile, source = source.name(), "fetching tile");

    if geojson {
        let decoded = fetch_decoded(source.as_ref(), tile, &config.tile_url).await?;
        let layers: serde_json::Map<String, serde_json::Value> = decoded
            .layers
            .iter()
            .map(|layer| (layer.name.clone(), layer.to_geojson_value()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&json!({ "tile": key, "layers": layers }))?);
        return Ok(());
    }

    let request = TileRequest {
        tile: tile.key(),
        layers: config.layers.clone(),
        url: config.tile_url.clone(),
    };
    let layers = fetch_tile(source.as_ref(), &request).await?;
    if layers.is_empty() {
        println!("{tile}: no configured layers present");
    }
    for layer in &layers {
        println!("{tile} {}: {} vertices", layer.layer, layer.vertex_count());
    }
    Ok(())
}

async fn replay(
    config: MapConfig,
    script: &Path,
    canvas: CanvasSize,
    frame_ms: f64,
    settle_frames: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = tokio::fs::read_to_string(script).await?;
    let events: Vec<PointerEvent> = serde_json::from_str(&text)?;

    let source = source_for_template(&config.tile_url);
    let mut map = MapController::new(config, canvas, source)?;
    map.set_abort_handler(|| warn!("map aborted by frame watchdog"));

    let mut renderer = CountingRenderer::new();
    let mut now_ms = 0.0;
    let mut accepted = 0usize;

    for event in &events {
        if map.handle(*event) {
            accepted += 1;
        }
        if map.frame(now_ms, &mut renderer) == FrameStatus::Stopped {
            break;
        }
        now_ms += frame_ms;
    }

    for _ in 0..settle_frames {
        if map.is_stopped() || !visible_pending(&map) {
            break;
        }
        tokio::time::sleep(Duration::from_secs_f64(frame_ms.max(0.0) / 1000.0)).await;
        if map.frame(now_ms, &mut renderer) == FrameStatus::Stopped {
            break;
        }
        now_ms += frame_ms;
    }

    let camera = map.camera();
    let center = camera.center();
    println!(
        "events {} (camera moved {accepted}), frames {}, stopped {}",
        events.len(),
        renderer.frames,
        map.is_stopped()
    );
    println!(
        "camera center [{:.6}, {:.6}] zoom {:.3}",
        center.lng, center.lat, camera.zoom
    );
    println!(
        "draw calls: {} fills, {} outlines, {} vertices",
        renderer.triangle_calls, renderer.line_calls, renderer.vertices
    );
    println!("{}", map.metrics().snapshot());
    Ok(())
}

fn visible_pending(map: &MapController) -> bool {
    map.selection()
        .visible
        .iter()
        .any(|t| map.pipeline().cache().get(t).is_some_and(TileState::is_pending))
}
