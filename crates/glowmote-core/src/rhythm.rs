//! The musical clock: BPM, beat phase, subdivision events, optional tempo
//! inference from an `AudioTap`.

use serde::{Deserialize, Serialize};

use crate::audio_tap::TempoEstimate;
use crate::error::EngineError;

/// The beat subdivisions the clock can emit crossing events for (spec
/// §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subdivision {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    TripletEighth,
}

impl Subdivision {
    pub const ALL: [Subdivision; 6] = [
        Subdivision::Whole,
        Subdivision::Half,
        Subdivision::Quarter,
        Subdivision::Eighth,
        Subdivision::Sixteenth,
        Subdivision::TripletEighth,
    ];

    /// Grid spacing in beats, assuming a beat is a quarter note.
    pub fn beats(self) -> f32 {
        match self {
            Subdivision::Whole => 4.0,
            Subdivision::Half => 2.0,
            Subdivision::Quarter => 1.0,
            Subdivision::Eighth => 0.5,
            Subdivision::Sixteenth => 0.25,
            Subdivision::TripletEighth => 1.0 / 3.0,
        }
    }
}

/// A point on the musical timeline, as returned by `next_boundary`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MusicalInstant {
    pub beat: u64,
    pub phase01: f32,
}

/// A `(beat, subdivision)` pair crossed during one `advance` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubdivEvent {
    pub beat: u64,
    pub subdivision: Subdivision,
}

/// A beat boundary crossed during one `advance` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    pub beat: u64,
}

/// Read-only view of clock state for the Compositor and GestureScheduler.
#[derive(Debug, Clone, Copy)]
pub struct RhythmSnapshot {
    pub bpm: f32,
    pub beat: u64,
    pub phase01: f32,
    pub enabled: bool,
}

struct TempoAdoption {
    from_bpm: f32,
    to_bpm: f32,
    beats_remaining: f32,
    total_beats: f32,
}

/// BPM, beat/phase position, subdivision crossings, tempo adoption.
pub struct RhythmClock {
    bpm: f32,
    beat: u64,
    phase01: f32,
    enabled: bool,
    bpm_min: f32,
    bpm_max: f32,
    confidence_threshold: f32,
    dead_zone_bpm: f32,
    adoption_beats: f32,
    adoption: Option<TempoAdoption>,
}

impl RhythmClock {
    pub fn new(
        initial_bpm: f32,
        bpm_min: f32,
        bpm_max: f32,
        confidence_threshold: f32,
        dead_zone_bpm: f32,
        adoption_beats: f32,
    ) -> Self {
        Self {
            bpm: initial_bpm.clamp(bpm_min, bpm_max),
            beat: 0,
            phase01: 0.0,
            enabled: true,
            bpm_min,
            bpm_max,
            confidence_threshold,
            dead_zone_bpm,
            adoption_beats: adoption_beats.max(0.1),
            adoption: None,
        }
    }

    pub fn snapshot(&self) -> RhythmSnapshot {
        RhythmSnapshot {
            bpm: self.bpm,
            beat: self.beat,
            phase01: self.phase01,
            enabled: self.enabled,
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn beat(&self) -> u64 {
        self.beat
    }

    pub fn phase01(&self) -> f32 {
        self.phase01
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Update BPM directly, preserving `phase01` (spec: "no snap").
    pub fn set_bpm(&mut self, bpm: f32) -> Result<(), EngineError> {
        if !(self.bpm_min..=self.bpm_max).contains(&bpm) {
            return Err(EngineError::InvalidBpm(bpm));
        }
        self.bpm = bpm;
        self.adoption = None;
        Ok(())
    }

    /// Advance `phase01` by `dt * bpm / 60`, wrapping and incrementing
    /// `beat` for every whole beat crossed. Returns the ordered beat
    /// crossings (more than one is possible under a large `dt`). A no-op
    /// while disabled.
    pub fn advance(&mut self, dt: f32) -> Vec<BeatEvent> {
        if !self.enabled {
            return Vec::new();
        }

        self.step_tempo_adoption(dt);

        let mut events = Vec::new();
        let delta_phase = dt * self.bpm / 60.0;
        self.phase01 += delta_phase;
        while self.phase01 >= 1.0 {
            self.phase01 -= 1.0;
            self.beat += 1;
            events.push(BeatEvent { beat: self.beat });
        }
        events
    }

    /// Ordered `(beat, subdivision)` crossings for this step, across all
    /// six subdivision grids. Empty while disabled.
    pub fn subdivision_events(&self, dt: f32) -> Vec<SubdivEvent> {
        if !self.enabled {
            return Vec::new();
        }

        let delta_phase = (dt * self.bpm / 60.0) as f64;
        let start = self.phase01 as f64 - delta_phase; // phase before this step, un-wrapped
        let mut events = Vec::new();

        for &sub in &Subdivision::ALL {
            let grid = sub.beats() as f64;
            // Work in absolute beat-position units (beat + phase) so a
            // crossing that also crosses a beat boundary is still found.
            let beat_start = self.beat as f64 + start;
            let beat_end = self.beat as f64 + self.phase01 as f64;

            let mut k = (beat_start / grid).floor() as i64;
            loop {
                let crossing = k as f64 * grid;
                if crossing <= beat_start {
                    k += 1;
                    continue;
                }
                if crossing > beat_end + 1e-9 {
                    break;
                }
                let crossing_beat = crossing.floor() as u64;
                events.push(SubdivEvent {
                    beat: crossing_beat,
                    subdivision: sub,
                });
                k += 1;
            }
        }

        events.sort_by(|a, b| a.beat.cmp(&b.beat));
        events
    }

    /// The next grid point for a given subdivision, as an absolute musical
    /// instant.
    pub fn next_boundary(&self, subdivision: Subdivision) -> MusicalInstant {
        let grid = subdivision.beats() as f64;
        let current = self.beat as f64 + self.phase01 as f64;
        let k = (current / grid).floor() + 1.0;
        let next = k * grid;
        MusicalInstant {
            beat: next.floor() as u64,
            phase01: (next - next.floor()) as f32,
        }
    }

    /// Seconds until the next such boundary at current BPM. `0.0` (fire
    /// immediately) while disabled.
    pub fn beat_aligned_delay(&self, subdivision: Subdivision) -> f32 {
        if !self.enabled {
            return 0.0;
        }
        let current = self.beat as f64 + self.phase01 as f64;
        let next = self.next_boundary(subdivision);
        let next_abs = next.beat as f64 + next.phase01 as f64;
        let beats_remaining = (next_abs - current).max(0.0);
        (beats_remaining * 60.0 / self.bpm as f64) as f32
    }

    /// Called by the engine after draining the audio tap's queue. Adopts a
    /// new tempo only if confidence clears the threshold and the estimate
    /// differs from current BPM by more than the dead-zone; adoption then
    /// smooths in over several beats rather than snapping `bpm`. Returns
    /// `true` if adoption began (for diagnostics).
    pub fn consider_tempo_estimate(&mut self, estimate: TempoEstimate) -> bool {
        if estimate.confidence < self.confidence_threshold {
            return false;
        }
        if (estimate.bpm - self.bpm).abs() <= self.dead_zone_bpm {
            return false;
        }
        let target = estimate.bpm.clamp(self.bpm_min, self.bpm_max);
        self.adoption = Some(TempoAdoption {
            from_bpm: self.bpm,
            to_bpm: target,
            beats_remaining: self.adoption_beats,
            total_beats: self.adoption_beats,
        });
        true
    }

    fn step_tempo_adoption(&mut self, dt: f32) {
        let Some(adoption) = &mut self.adoption else {
            return;
        };
        let beats_this_step = dt * self.bpm / 60.0;
        adoption.beats_remaining -= beats_this_step;
        let progress = (1.0 - (adoption.beats_remaining / adoption.total_beats)).clamp(0.0, 1.0);
        self.bpm = adoption.from_bpm + (adoption.to_bpm - adoption.from_bpm) * progress;
        if adoption.beats_remaining <= 0.0 {
            self.bpm = adoption.to_bpm;
            self.adoption = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> RhythmClock {
        RhythmClock::new(120.0, 30.0, 300.0, 0.6, 2.0, 4.0)
    }

    #[test]
    fn advance_crosses_beats() {
        let mut c = clock();
        // 120 bpm = 2 beats/sec; 1.0s should cross exactly 2 beats.
        let events = c.advance(1.0);
        assert_eq!(events.len(), 2);
        assert_eq!(c.beat(), 2);
    }

    #[test]
    fn beat_is_non_decreasing() {
        let mut c = clock();
        let mut last = c.beat();
        for _ in 0..50 {
            c.advance(0.037);
            assert!(c.beat() >= last);
            last = c.beat();
        }
    }

    #[test]
    fn set_bpm_preserves_phase() {
        let mut c = clock();
        c.advance(0.1);
        let phase_before = c.phase01();
        c.set_bpm(200.0).unwrap();
        assert!((c.phase01() - phase_before).abs() < 1e-6);
    }

    #[test]
    fn set_bpm_out_of_range_errors() {
        let mut c = clock();
        assert!(c.set_bpm(10.0).is_err());
        assert!(c.set_bpm(400.0).is_err());
    }

    #[test]
    fn disabled_clock_is_inert() {
        let mut c = clock();
        c.disable();
        assert!(c.advance(10.0).is_empty());
        assert!(c.subdivision_events(10.0).is_empty());
        assert_eq!(c.beat_aligned_delay(Subdivision::Quarter), 0.0);
    }

    #[test]
    fn tempo_adoption_smooths_without_phase_jump() {
        let mut c = clock();
        let accepted = c.consider_tempo_estimate(TempoEstimate {
            bpm: 140.0,
            confidence: 0.9,
        });
        assert!(accepted);

        let mut last_phase = c.phase01();
        for _ in 0..200 {
            let before = c.phase01();
            c.advance(0.01);
            // phase changes continuously; never "jumps" backward by a lot
            let jump = (c.phase01() - before).abs();
            assert!(jump < 0.5, "phase jumped: {jump}");
            last_phase = c.phase01();
        }
        let _ = last_phase;
        assert!((c.bpm() - 140.0).abs() < 0.5);
    }

    #[test]
    fn rejects_low_confidence_estimate() {
        let mut c = clock();
        let accepted = c.consider_tempo_estimate(TempoEstimate {
            bpm: 200.0,
            confidence: 0.1,
        });
        assert!(!accepted);
        assert!((c.bpm() - 120.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_within_dead_zone() {
        let mut c = clock();
        let accepted = c.consider_tempo_estimate(TempoEstimate {
            bpm: 121.0,
            confidence: 0.9,
        });
        assert!(!accepted);
    }

    #[test]
    fn next_boundary_is_ahead_of_current_position() {
        let mut c = clock();
        c.advance(0.1);
        let next = c.next_boundary(Subdivision::Quarter);
        let current = c.beat() as f64 + c.phase01() as f64;
        let next_abs = next.beat as f64 + next.phase01 as f64;
        assert!(next_abs > current);
    }
}
