//! Stateless fold from the frame's domain snapshots into concrete
//! directives for the particle pool and the rasterizer (spec §4.9).
//!
//! Owns no state of its own: every call takes a fresh snapshot of the
//! upstream components and produces directives fresh. This keeps the
//! modulator-composition math in one place instead of scattered across the
//! components it reads from.

use crate::affect::AffectSnapshot;
use crate::body::BodySnapshot;
use crate::color::Rgb;
use crate::gesture::{reduce_modulator, ActiveGesture, ModulatorTarget};
use crate::particles::EmissionSpec;
use crate::rhythm::RhythmSnapshot;

/// Visual directive for the body silhouette this frame.
#[derive(Debug, Clone, Copy)]
pub struct BodyDirective {
    pub color: Rgb,
    pub glow: f32,
    pub scale: f32,
    pub orientation_bias: f32,
}

/// Combined directive bundle the Compositor produces each tick.
#[derive(Debug, Clone)]
pub struct FrameDirectives {
    pub body: BodyDirective,
    pub emission: EmissionSpec,
}

/// The stateless compositor: folds `AffectSnapshot`, `BodySnapshot`,
/// `RhythmSnapshot`, and the active gesture list into directives.
pub struct Compositor {
    origin_x: f32,
    origin_y: f32,
}

impl Compositor {
    pub fn new(origin_x: f32, origin_y: f32) -> Self {
        Self { origin_x, origin_y }
    }

    pub fn compose(
        &self,
        affect: &AffectSnapshot,
        body: &BodySnapshot,
        rhythm: &RhythmSnapshot,
        active_gestures: &[ActiveGesture],
    ) -> FrameDirectives {
        let rhythm_amplitude = affect
            .emotion
            .profile()
            .rhythm_profile
            .map(|rp| {
                if rhythm.enabled {
                    rp.amplitude_at(rhythm.phase01)
                } else {
                    1.0
                }
            })
            .unwrap_or(1.0);

        let glow_mul = reduce_modulator(ModulatorTarget::GlowIntensity, active_gestures);
        let scale_mul = reduce_modulator(ModulatorTarget::BodyScale, active_gestures);
        let orientation_bias = reduce_modulator(ModulatorTarget::OrientationBias, active_gestures);
        let emission_mul = reduce_modulator(ModulatorTarget::EmissionRate, active_gestures);
        let speed_mul = reduce_modulator(ModulatorTarget::ParticleSpeed, active_gestures);

        let body_directive = BodyDirective {
            color: affect.interpolated_color,
            glow: (affect.interpolated_glow * rhythm_amplitude * glow_mul).clamp(0.0, 1.0),
            scale: self.body_scale(body) * scale_mul,
            orientation_bias,
        };

        let emission = EmissionSpec {
            rate_per_second: (affect.emotion.profile().emission_rate_ref
                * affect.emission_rate_mul
                * rhythm_amplitude
                * emission_mul)
                .max(0.0),
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            base_speed: 0.5 * speed_mul.max(0.0),
            base_color: affect.interpolated_color,
            base_size: 1.0,
            lifetime_s: 1.5,
            motion_style: affect.motion_style,
        };

        FrameDirectives {
            body: body_directive,
            emission,
        }
    }

    fn body_scale(&self, body: &BodySnapshot) -> f32 {
        let from = body.previous_shape.base_scale();
        let to = body.target_shape.base_scale();
        from + (to - from) * body.morph_progress
    }
}
