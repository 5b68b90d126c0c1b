//! Emotion × undertone state with smooth crossfade interpolation.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::EngineError;

/// The closed set of 14 emotions (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    Joy,
    Love,
    Excited,
    Euphoria,
    Calm,
    Focused,
    Resting,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Suspicion,
    Disgust,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 14] = [
        Emotion::Joy,
        Emotion::Love,
        Emotion::Excited,
        Emotion::Euphoria,
        Emotion::Calm,
        Emotion::Focused,
        Emotion::Resting,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Surprise,
        Emotion::Suspicion,
        Emotion::Disgust,
        Emotion::Neutral,
    ];

    /// Parse from a case-insensitive name, for host command surfaces that
    /// arrive as strings (e.g. the wasm bindings).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_lowercase().as_str() {
            "joy" => Emotion::Joy,
            "love" => Emotion::Love,
            "excited" => Emotion::Excited,
            "euphoria" => Emotion::Euphoria,
            "calm" => Emotion::Calm,
            "focused" => Emotion::Focused,
            "resting" => Emotion::Resting,
            "sadness" => Emotion::Sadness,
            "anger" => Emotion::Anger,
            "fear" => Emotion::Fear,
            "surprise" => Emotion::Surprise,
            "suspicion" => Emotion::Suspicion,
            "disgust" => Emotion::Disgust,
            "neutral" => Emotion::Neutral,
            _ => return None,
        })
    }

    /// Immutable visual defaults for this emotion.
    pub fn profile(self) -> &'static EmotionProfile {
        &EMOTION_PROFILES[self as usize]
    }
}

/// Tag describing the particle lifetime curve family an emotion prefers.
/// See `particles::lifetime_curve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionStyle {
    Drifting,
    Bursting,
    Pulsing,
    Floating,
    Jittering,
    Settling,
    Sharp,
    Swirling,
}

/// Per-subdivision amplitude multiplier driving the idle "breathing" effect
/// (spec §4.7, glossary "Rhythm profile"). Evaluated continuously over
/// `phase01` via triangular pulses centered on each named grid point.
#[derive(Debug, Clone, Copy)]
pub struct RhythmProfile {
    pub downbeat: f32,
    pub half: f32,
    pub quarter: f32,
    pub baseline: f32,
}

impl RhythmProfile {
    const PULSE_WIDTH: f32 = 0.12;

    /// Amplitude multiplier at a given beat phase, `phase01 ∈ [0, 1)`.
    pub fn amplitude_at(&self, phase01: f32) -> f32 {
        let phase01 = phase01.rem_euclid(1.0);
        let db = Self::pulse(circular_dist(phase01, 0.0)) * (self.downbeat - self.baseline);
        let hf = Self::pulse(circular_dist(phase01, 0.5)) * (self.half - self.baseline);
        let q1 = Self::pulse(circular_dist(phase01, 0.25)) * (self.quarter - self.baseline);
        let q2 = Self::pulse(circular_dist(phase01, 0.75)) * (self.quarter - self.baseline);
        (self.baseline + db + hf + q1 + q2).max(0.0)
    }

    fn pulse(dist: f32) -> f32 {
        (1.0 - dist / Self::PULSE_WIDTH).clamp(0.0, 1.0)
    }
}

fn circular_dist(phase: f32, point: f32) -> f32 {
    let d = (phase - point).abs();
    d.min(1.0 - d)
}

/// Immutable visual defaults carried by each `Emotion` variant.
#[derive(Debug, Clone, Copy)]
pub struct EmotionProfile {
    pub base_color: Rgb,
    pub base_glow: f32,
    /// Particles per second, at a 120 BPM reference tempo.
    pub emission_rate_ref: f32,
    pub motion_style: MotionStyle,
    pub rhythm_profile: Option<RhythmProfile>,
}

const fn p(
    r: f32,
    g: f32,
    b: f32,
    glow: f32,
    emission: f32,
    style: MotionStyle,
    rhythm: Option<RhythmProfile>,
) -> EmotionProfile {
    EmotionProfile {
        base_color: Rgb::new(r, g, b),
        base_glow: glow,
        emission_rate_ref: emission,
        motion_style: style,
        rhythm_profile: rhythm,
    }
}

const fn rp(downbeat: f32, half: f32, quarter: f32, baseline: f32) -> Option<RhythmProfile> {
    Some(RhythmProfile {
        downbeat,
        half,
        quarter,
        baseline,
    })
}

/// Indexed identically to `Emotion`'s discriminant order.
static EMOTION_PROFILES: [EmotionProfile; 14] = [
    p(1.00, 0.85, 0.20, 0.9, 40.0, MotionStyle::Bursting, rp(1.4, 1.1, 1.2, 1.0)), // Joy
    p(1.00, 0.35, 0.55, 0.85, 30.0, MotionStyle::Floating, rp(1.2, 1.3, 1.0, 1.0)), // Love
    p(1.00, 0.55, 0.05, 1.0, 55.0, MotionStyle::Sharp, rp(1.5, 1.0, 1.3, 1.0)), // Excited
    p(0.85, 0.30, 1.00, 1.0, 60.0, MotionStyle::Swirling, rp(1.6, 1.4, 1.2, 1.0)), // Euphoria
    p(0.35, 0.70, 0.85, 0.5, 12.0, MotionStyle::Drifting, rp(1.05, 1.1, 1.0, 1.0)), // Calm
    p(0.20, 0.45, 0.90, 0.6, 15.0, MotionStyle::Settling, rp(1.1, 1.0, 1.15, 1.0)), // Focused
    p(0.55, 0.55, 0.65, 0.35, 6.0, MotionStyle::Drifting, None),                 // Resting
    p(0.25, 0.30, 0.55, 0.3, 8.0, MotionStyle::Drifting, rp(1.0, 0.9, 1.0, 1.0)), // Sadness
    p(0.90, 0.10, 0.10, 0.8, 35.0, MotionStyle::Jittering, rp(1.5, 1.2, 1.3, 1.0)), // Anger
    p(0.40, 0.15, 0.45, 0.45, 20.0, MotionStyle::Jittering, rp(1.3, 1.0, 1.4, 1.0)), // Fear
    p(1.00, 0.90, 0.30, 0.75, 45.0, MotionStyle::Sharp, rp(1.6, 1.0, 1.2, 1.0)),  // Surprise
    p(0.45, 0.35, 0.20, 0.4, 10.0, MotionStyle::Jittering, None),                 // Suspicion
    p(0.35, 0.45, 0.15, 0.35, 9.0, MotionStyle::Settling, None),                  // Disgust
    p(0.70, 0.70, 0.70, 0.5, 18.0, MotionStyle::Drifting, None),                  // Neutral
];

/// The small closed set of additive deltas on top of an emotion's base
/// parameters (spec §3: "never an independent state").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Undertone {
    Intense,
    Subdued,
    Nervous,
    Tired,
    Confident,
}

impl Undertone {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_lowercase().as_str() {
            "intense" => Undertone::Intense,
            "subdued" => Undertone::Subdued,
            "nervous" => Undertone::Nervous,
            "tired" => Undertone::Tired,
            "confident" => Undertone::Confident,
            _ => return None,
        })
    }

    /// Additive delta applied on top of the base emotion's resolved values.
    pub fn delta(self) -> UndertoneDelta {
        match self {
            Undertone::Intense => UndertoneDelta {
                color: Rgb::new(0.08, 0.02, -0.02),
                glow: 0.15,
                emission_mul: 1.25,
            },
            Undertone::Subdued => UndertoneDelta {
                color: Rgb::new(-0.06, -0.06, 0.02),
                glow: -0.15,
                emission_mul: 0.75,
            },
            Undertone::Nervous => UndertoneDelta {
                color: Rgb::new(0.02, -0.04, -0.02),
                glow: -0.05,
                emission_mul: 1.1,
            },
            Undertone::Tired => UndertoneDelta {
                color: Rgb::new(-0.05, -0.05, -0.05),
                glow: -0.2,
                emission_mul: 0.6,
            },
            Undertone::Confident => UndertoneDelta {
                color: Rgb::new(0.04, 0.04, 0.0),
                glow: 0.1,
                emission_mul: 1.1,
            },
        }
    }
}

/// Additive visual delta contributed by an `Undertone`.
#[derive(Debug, Clone, Copy)]
pub struct UndertoneDelta {
    pub color: Rgb,
    pub glow: f32,
    pub emission_mul: f32,
}

const NO_DELTA: UndertoneDelta = UndertoneDelta {
    color: Rgb::new(0.0, 0.0, 0.0),
    glow: 0.0,
    emission_mul: 1.0,
};

/// Resolved visual parameters for an `(Emotion, Option<Undertone>)` pair,
/// before crossfade blending.
#[derive(Debug, Clone, Copy)]
struct ResolvedAffect {
    color: Rgb,
    glow: f32,
    emission_mul: f32,
}

fn resolve(emotion: Emotion, undertone: Option<Undertone>) -> ResolvedAffect {
    let profile = emotion.profile();
    let delta = undertone.map(Undertone::delta).unwrap_or(NO_DELTA);
    ResolvedAffect {
        color: profile.base_color.add(delta.color).clamped(),
        glow: (profile.base_glow + delta.glow).clamp(0.0, 1.0),
        emission_mul: delta.emission_mul,
    }
}

/// Externally visible resolved state of `AffectModel` at any instant (spec
/// §3). `emotion`/`undertone` are the *target* labels; the other fields are
/// the crossfaded interpolation.
#[derive(Debug, Clone, Copy)]
pub struct AffectSnapshot {
    pub emotion: Emotion,
    pub undertone: Option<Undertone>,
    pub interpolated_color: Rgb,
    pub interpolated_glow: f32,
    pub emission_rate_mul: f32,
    pub motion_style: MotionStyle,
}

/// Current/target emotion and undertone with smooth interpolation (spec
/// §4.2).
pub struct AffectModel {
    target_emotion: Emotion,
    target_undertone: Option<Undertone>,
    previous: ResolvedAffect,
    current: ResolvedAffect,
    /// `None` when inert (no crossfade in progress).
    fade: Option<Fade>,
    /// Fallback fade duration in seconds when `set_emotion` is not given an
    /// explicit override (spec §4.2: default 400 ms, configurable).
    default_fade_s: f32,
}

struct Fade {
    elapsed_s: f32,
    duration_s: f32,
}

impl AffectModel {
    pub fn new(default_fade_ms: f32) -> Self {
        let resolved = resolve(Emotion::Neutral, None);
        Self {
            target_emotion: Emotion::Neutral,
            target_undertone: None,
            previous: resolved,
            current: resolved,
            fade: None,
            default_fade_s: default_fade_ms / 1000.0,
        }
    }

    /// Begin retargeting to a new emotion/undertone. No-op if identical to
    /// the current target. Mid-crossfade retargets snap the *interpolated*
    /// value into the new "previous" endpoint — no visual pop.
    pub fn set_emotion(
        &mut self,
        emotion: Emotion,
        undertone: Option<Undertone>,
        fade_duration_s: Option<f32>,
    ) -> Result<(), EngineError> {
        if emotion == self.target_emotion && undertone == self.target_undertone {
            return Ok(());
        }

        self.previous = self.resolved_now();
        self.current = resolve(emotion, undertone);
        self.target_emotion = emotion;
        self.target_undertone = undertone;
        self.fade = Some(Fade {
            elapsed_s: 0.0,
            duration_s: fade_duration_s.unwrap_or(self.default_fade_s).max(0.0),
        });
        Ok(())
    }

    /// The resolved value right now: interpolated if a fade is active,
    /// otherwise exactly `current` (the crossfade is inert).
    fn resolved_now(&self) -> ResolvedAffect {
        match &self.fade {
            None => self.current,
            Some(fade) => {
                let t = if fade.duration_s <= 0.0 {
                    1.0
                } else {
                    (fade.elapsed_s / fade.duration_s).clamp(0.0, 1.0)
                };
                ResolvedAffect {
                    color: self.previous.color.lerp(self.current.color, t),
                    glow: self.previous.glow + (self.current.glow - self.previous.glow) * t,
                    emission_mul: self.previous.emission_mul
                        + (self.current.emission_mul - self.previous.emission_mul) * t,
                }
            }
        }
    }

    /// Advance the crossfade. On completion the fade becomes inert.
    pub fn advance(&mut self, dt: f32) {
        if let Some(fade) = &mut self.fade {
            fade.elapsed_s += dt;
            if fade.elapsed_s >= fade.duration_s {
                self.previous = self.current;
                self.fade = None;
            }
        }
    }

    /// The resolved interpolated state.
    pub fn snapshot(&self) -> AffectSnapshot {
        let resolved = self.resolved_now();
        AffectSnapshot {
            emotion: self.target_emotion,
            undertone: self.target_undertone,
            interpolated_color: resolved.color,
            interpolated_glow: resolved.glow,
            emission_rate_mul: resolved.emission_mul,
            motion_style: self.target_emotion.profile().motion_style,
        }
    }

    pub fn target_emotion(&self) -> Emotion {
        self.target_emotion
    }

    pub fn target_undertone(&self) -> Option<Undertone> {
        self.target_undertone
    }

    pub fn is_crossfading(&self) -> bool {
        self.fade.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> AffectModel {
        AffectModel::new(400.0)
    }

    #[test]
    fn same_emotion_same_undertone_is_noop() {
        let mut m = model();
        m.set_emotion(Emotion::Neutral, None, None).unwrap();
        assert!(!m.is_crossfading());
    }

    #[test]
    fn crossfade_reaches_exact_target_on_completion() {
        let mut m = model();
        m.set_emotion(Emotion::Joy, None, Some(0.4)).unwrap();
        m.advance(0.2);
        let mid = m.snapshot().interpolated_color;
        let neutral = Emotion::Neutral.profile().base_color;
        let joy = Emotion::Joy.profile().base_color;
        let expected_mid = neutral.lerp(joy, 0.5);
        assert!((mid.r - expected_mid.r).abs() < 0.02);

        m.advance(0.2);
        assert!(!m.is_crossfading());
        let finished = m.snapshot().interpolated_color;
        assert!((finished.r - joy.r).abs() < 1e-5);
        assert!((finished.g - joy.g).abs() < 1e-5);
        assert!((finished.b - joy.b).abs() < 1e-5);
    }

    #[test]
    fn retarget_mid_fade_does_not_pop() {
        let mut m = model();
        m.set_emotion(Emotion::Joy, None, Some(1.0)).unwrap();
        m.advance(0.5);
        let interpolated_before = m.snapshot().interpolated_color;

        m.set_emotion(Emotion::Anger, None, Some(1.0)).unwrap();
        let interpolated_after = m.snapshot().interpolated_color;
        assert!((interpolated_before.r - interpolated_after.r).abs() < 1e-5);
        assert!((interpolated_before.g - interpolated_after.g).abs() < 1e-5);
        assert!((interpolated_before.b - interpolated_after.b).abs() < 1e-5);
    }

    #[test]
    fn color_stays_in_convex_hull_during_fade() {
        let mut m = model();
        m.set_emotion(Emotion::Euphoria, None, Some(0.4)).unwrap();
        let neutral = Emotion::Neutral.profile().base_color;
        let euphoria = Emotion::Euphoria.profile().base_color;
        for _ in 0..20 {
            m.advance(0.02);
            let c = m.snapshot().interpolated_color;
            let lo_r = neutral.r.min(euphoria.r);
            let hi_r = neutral.r.max(euphoria.r);
            assert!(c.r >= lo_r - 1e-5 && c.r <= hi_r + 1e-5);
        }
    }

    #[test]
    fn undertone_composes_additively() {
        let mut m = model();
        m.set_emotion(Emotion::Calm, Some(Undertone::Intense), Some(0.0))
            .unwrap();
        m.advance(0.0);
        let snap = m.snapshot();
        assert!(snap.interpolated_glow > Emotion::Calm.profile().base_glow);
    }
}
