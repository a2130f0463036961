//! Headless 2D vector tile map.
//!
//! [`MapController`] owns the camera and the tile pipeline; a [`Renderer`]
//! implementation turns its draw calls into pixels.

pub mod camera;
pub mod config;
pub mod controller;
pub mod draw;
pub mod input;
pub mod viewport;

pub use camera::Camera;
pub use config::{ConfigError, MapConfig, WatchdogSettings};
pub use controller::{FrameStatus, MapController, MapError};
pub use draw::{CountingRenderer, DrawCall, Primitive, Renderer};
pub use input::PointerEvent;
pub use viewport::{CanvasSize, ViewportMatrix, at_limits, viewport_bounds};
