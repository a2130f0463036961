//! Backend-neutral draw calls.
//!
//! The controller never talks to a graphics API. Each frame it hands a
//! [`Renderer`] the plane-to-clip matrix, then a flat list of draw calls whose
//! vertices are plane-space `x, y` pairs.

use foundation::math::Mat3;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Primitive {
    /// Every three vertices form a triangle.
    Triangles,
    /// Every two vertices form a segment.
    Lines,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall<'a> {
    pub color: [f32; 4],
    pub vertices: &'a [f32],
    pub primitive: Primitive,
    pub vertex_count: usize,
}

impl<'a> DrawCall<'a> {
    pub fn new(color: [f32; 4], vertices: &'a [f32], primitive: Primitive) -> Self {
        Self {
            color,
            vertices,
            primitive,
            vertex_count: vertices.len() / 2,
        }
    }
}

pub trait Renderer {
    fn begin_frame(&mut self, matrix: &Mat3);

    fn draw(&mut self, call: &DrawCall<'_>);

    /// Text at a pixel position, top-left origin.
    fn label(&mut self, _text: &str, _pos_px: [f64; 2]) {}

    fn end_frame(&mut self);
}

/// Renderer that only tallies what it was asked to draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountingRenderer {
    pub frames: u64,
    pub triangle_calls: u64,
    pub line_calls: u64,
    pub vertices: u64,
    /// Labels of the last completed frame.
    pub labels: Vec<(String, [f64; 2])>,
    pub last_matrix: Option<Mat3>,
    pending_labels: Vec<(String, [f64; 2])>,
}

impl CountingRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for CountingRenderer {
    fn begin_frame(&mut self, matrix: &Mat3) {
        self.last_matrix = Some(*matrix);
        self.pending_labels.clear();
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        match call.primitive {
            Primitive::Triangles => self.triangle_calls += 1,
            Primitive::Lines => self.line_calls += 1,
        }
        self.vertices += call.vertex_count as u64;
    }

    fn label(&mut self, text: &str, pos_px: [f64; 2]) {
        self.pending_labels.push((text.to_string(), pos_px));
    }

    fn end_frame(&mut self) {
        self.frames += 1;
        self.labels = std::mem::take(&mut self.pending_labels);
    }
}
