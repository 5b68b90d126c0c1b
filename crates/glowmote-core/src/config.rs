//! Construction-time configuration.
//!
//! Unlike a hot-reloadable render config, everything here is fixed for the
//! lifetime of an `Engine` — the spec names no runtime config-reload
//! requirement, so this stays a plain defaulted struct rather than a file
//! watcher. Still `serde`-derived so a host embedding the engine can
//! persist/restore it alongside the serializable engine-state surface
//! (spec §6).

use serde::{Deserialize, Serialize};

/// Parameters fixed at `Engine::new` time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fixed particle pool capacity. Typical desktop range 200-500, mobile
    /// 100-200 (spec §4.5). Construction fails if this is zero.
    pub particle_capacity: usize,

    /// Default affect crossfade duration in milliseconds (spec §4.2).
    pub default_fade_ms: f32,

    /// Minimum allowed BPM (spec §4.3).
    pub bpm_min: f32,
    /// Maximum allowed BPM (spec §4.3).
    pub bpm_max: f32,

    /// Upper clamp on per-frame dt in seconds (spec §4.1).
    pub max_frame_dt: f32,

    /// Per-exclusivity-class pending-queue depth before admission is
    /// rejected with `QueueFull` (spec §4.4).
    pub gesture_queue_depth: usize,

    /// Confidence an externally-provided tempo estimate must exceed before
    /// the clock will consider adopting it (spec §4.3).
    pub tempo_confidence_threshold: f32,
    /// Minimum BPM delta between the current tempo and an estimate before
    /// adoption is considered (dead-zone, spec §4.3).
    pub tempo_dead_zone_bpm: f32,
    /// Number of beats over which an adopted tempo change is smoothed in.
    pub tempo_adoption_beats: f32,

    /// Capacity of the audio tap's tempo-estimate queue.
    pub audio_tap_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            particle_capacity: 300,
            default_fade_ms: 400.0,
            bpm_min: 30.0,
            bpm_max: 300.0,
            max_frame_dt: 0.1,
            gesture_queue_depth: 8,
            tempo_confidence_threshold: 0.6,
            tempo_dead_zone_bpm: 2.0,
            tempo_adoption_beats: 4.0,
            audio_tap_queue_capacity: 8,
        }
    }
}

impl EngineConfig {
    /// A configuration sized for mid-tier mobile (spec §1, §4.5).
    pub fn mobile() -> Self {
        Self {
            particle_capacity: 150,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_desktop_sized() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.particle_capacity, 300);
        assert!((cfg.default_fade_ms - 400.0).abs() < f32::EPSILON);
    }

    #[test]
    fn mobile_has_smaller_pool() {
        assert!(EngineConfig::mobile().particle_capacity < EngineConfig::default().particle_capacity);
    }
}
