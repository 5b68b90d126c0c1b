//! The pixel/vector rendering contract. Deliberately narrow: the engine
//! computes *what* to draw, never *how* to draw it (spec §4.9 Non-goals).
//! A concrete rasterizer (canvas2d, WebGL, terminal) lives entirely outside
//! this crate and is handed directives through this trait.

use crate::body::Shape;
use crate::color::Rgb;
use crate::particles::Particle;

/// A read-only view over one particle, decoupled from the pool's internal
/// storage so a rasterizer never depends on `ParticlePool` directly.
#[derive(Debug, Clone, Copy)]
pub struct ParticleView {
    pub x: f32,
    pub y: f32,
    pub color: Rgb,
    pub size: f32,
    pub normalized_age: f32,
}

impl From<&Particle> for ParticleView {
    fn from(p: &Particle) -> Self {
        ParticleView {
            x: p.x,
            y: p.y,
            color: p.color,
            size: p.size,
            normalized_age: p.normalized_age(),
        }
    }
}

/// What to draw for the body silhouette this frame.
#[derive(Debug, Clone, Copy)]
pub struct BodyDrawCall {
    pub shape: Shape,
    pub morph_target: Shape,
    pub morph_progress: f32,
    pub color: Rgb,
    pub glow: f32,
    pub scale: f32,
    pub orientation_bias: f32,
}

/// Implemented by the host's concrete renderer. The engine calls this once
/// per tick with the frame's full draw set; it never touches a canvas,
/// GPU context, or framebuffer itself.
pub trait Rasterizer {
    fn draw_body(&mut self, call: BodyDrawCall);
    fn draw_particles(&mut self, particles: &[ParticleView]);
    /// Called once after `draw_body`/`draw_particles` for the frame, for
    /// rasterizers that batch (e.g. a single canvas `flush`).
    fn present(&mut self) {}
    /// Forwarded from `Command::Resize` (spec §4.8). Default no-op for
    /// rasterizers that don't care about surface dimensions.
    fn resize(&mut self, _width: u32, _height: u32) {}
}
