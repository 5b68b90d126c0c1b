//! Body silhouette state: a closed shape enumeration with crossfaded morph
//! progress, mirroring `affect::AffectModel`'s exact-completion crossfade.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The closed set of body silhouettes (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Circle,
    Star,
    Heart,
    Moon,
    Sun,
    Square,
    Triangle,
    Diamond,
    Crystal,
}

impl Shape {
    pub const ALL: [Shape; 9] = [
        Shape::Circle,
        Shape::Star,
        Shape::Heart,
        Shape::Moon,
        Shape::Sun,
        Shape::Square,
        Shape::Triangle,
        Shape::Diamond,
        Shape::Crystal,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_lowercase().as_str() {
            "circle" => Shape::Circle,
            "star" => Shape::Star,
            "heart" => Shape::Heart,
            "moon" => Shape::Moon,
            "sun" => Shape::Sun,
            "square" => Shape::Square,
            "triangle" => Shape::Triangle,
            "diamond" => Shape::Diamond,
            "crystal" => Shape::Crystal,
            _ => return None,
        })
    }

    /// Base scale multiplier relative to a reference silhouette, used as
    /// the morph's resting value absent any gesture modulation.
    pub fn base_scale(self) -> f32 {
        match self {
            Shape::Circle => 1.0,
            Shape::Star => 1.1,
            Shape::Heart => 1.0,
            Shape::Moon => 0.9,
            Shape::Sun => 1.15,
            Shape::Square => 1.0,
            Shape::Triangle => 1.05,
            Shape::Diamond => 1.05,
            Shape::Crystal => 1.1,
        }
    }
}

struct Morph {
    elapsed_s: f32,
    duration_s: f32,
}

/// Snapshot of the body's current morph state, surfaced to the Compositor.
#[derive(Debug, Clone, Copy)]
pub struct BodySnapshot {
    pub target_shape: Shape,
    pub previous_shape: Shape,
    /// `0.0` at `previous_shape`, `1.0` at `target_shape`, exact at rest.
    pub morph_progress: f32,
    pub is_morphing: bool,
}

/// Target shape with smooth morph progress (spec §4.8), structurally
/// parallel to `affect::AffectModel`.
pub struct BodyState {
    target_shape: Shape,
    previous_shape: Shape,
    morph: Option<Morph>,
    default_morph_s: f32,
}

impl BodyState {
    pub fn new(initial_shape: Shape, default_morph_ms: f32) -> Self {
        Self {
            target_shape: initial_shape,
            previous_shape: initial_shape,
            morph: None,
            default_morph_s: default_morph_ms / 1000.0,
        }
    }

    /// Begin morphing to a new shape. No-op if already the target.
    pub fn set_shape(&mut self, shape: Shape, morph_duration_s: Option<f32>) -> Result<(), EngineError> {
        if shape == self.target_shape {
            return Ok(());
        }
        self.previous_shape = self.current_reference_shape();
        self.target_shape = shape;
        self.morph = Some(Morph {
            elapsed_s: 0.0,
            duration_s: morph_duration_s.unwrap_or(self.default_morph_s).max(0.0),
        });
        Ok(())
    }

    /// Which shape a mid-morph retarget should treat as "previous": the one
    /// currently closer to the silhouette actually on screen, so a retarget
    /// never pops. Since progress is exact-linear, this is simply whichever
    /// endpoint the morph is partway toward — approximated here as the
    /// target, since body silhouettes (unlike color) don't blend visually;
    /// a retarget restarts the morph from the shape last fully settled at.
    fn current_reference_shape(&self) -> Shape {
        match &self.morph {
            None => self.target_shape,
            Some(m) if m.elapsed_s >= m.duration_s => self.target_shape,
            Some(_) => self.previous_shape,
        }
    }

    /// Advance morph progress, returning `true` the one frame the morph
    /// completes (spec §4.6: "completion emits `ShapeMorphed`").
    pub fn advance(&mut self, dt: f32) -> bool {
        if let Some(morph) = &mut self.morph {
            morph.elapsed_s += dt;
            if morph.elapsed_s >= morph.duration_s {
                self.previous_shape = self.target_shape;
                self.morph = None;
                return true;
            }
        }
        false
    }

    pub fn snapshot(&self) -> BodySnapshot {
        let progress = match &self.morph {
            None => 1.0,
            Some(m) if m.duration_s <= 0.0 => 1.0,
            Some(m) => (m.elapsed_s / m.duration_s).clamp(0.0, 1.0),
        };
        BodySnapshot {
            target_shape: self.target_shape,
            previous_shape: self.previous_shape,
            morph_progress: progress,
            is_morphing: self.morph.is_some(),
        }
    }

    /// Interpolated scale factor, exact at rest and at either endpoint.
    pub fn interpolated_scale(&self) -> f32 {
        let snap = self.snapshot();
        let from = snap.previous_shape.base_scale();
        let to = snap.target_shape.base_scale();
        from + (to - from) * snap.morph_progress
    }

    pub fn target_shape(&self) -> Shape {
        self.target_shape
    }

    pub fn is_morphing(&self) -> bool {
        self.morph.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_shape_is_noop() {
        let mut b = BodyState::new(Shape::Circle, 300.0);
        b.set_shape(Shape::Circle, None).unwrap();
        assert!(!b.is_morphing());
    }

    #[test]
    fn morph_reaches_exact_target_on_completion() {
        let mut b = BodyState::new(Shape::Circle, 300.0);
        b.set_shape(Shape::Star, Some(0.3)).unwrap();
        let completed = b.advance(0.3);
        assert!(completed);
        assert!(!b.is_morphing());
        let snap = b.snapshot();
        assert_eq!(snap.target_shape, Shape::Star);
        assert!((snap.morph_progress - 1.0).abs() < 1e-6);
    }

    #[test]
    fn scale_interpolates_between_endpoints() {
        let mut b = BodyState::new(Shape::Circle, 1.0);
        b.set_shape(Shape::Star, Some(1.0)).unwrap();
        b.advance(0.5);
        let scale = b.interpolated_scale();
        let lo = Shape::Circle.base_scale().min(Shape::Star.base_scale());
        let hi = Shape::Circle.base_scale().max(Shape::Star.base_scale());
        assert!(scale >= lo && scale <= hi);
    }

    #[test]
    fn retarget_mid_morph_does_not_revert_progress_discontinuously() {
        let mut b = BodyState::new(Shape::Circle, 1.0);
        b.set_shape(Shape::Star, Some(1.0)).unwrap();
        b.advance(0.2);
        b.set_shape(Shape::Heart, Some(1.0)).unwrap();
        let snap = b.snapshot();
        assert_eq!(snap.target_shape, Shape::Heart);
        assert!(snap.morph_progress < 1.0);
    }

    #[test]
    fn unknown_shape_name_is_none() {
        assert!(Shape::from_name("not-a-shape").is_none());
    }
}
