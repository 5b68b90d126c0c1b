//! The engine: owns every component and drives the fixed per-frame
//! pipeline (spec §2):
//!
//! `TimeBase → RhythmClock → GestureScheduler → AffectModel → Compositor
//! → ParticlePool → Rasterizer`
//!
//! Single-threaded and cooperative. Host commands are drained at the
//! start of each tick; events are published synchronously at the end.

use serde::{Deserialize, Serialize};

use crate::affect::{AffectModel, Emotion, Undertone};
use crate::audio_tap::{AudioTap, AudioTapProducer};
use crate::body::{BodyState, Shape};
use crate::compositor::Compositor;
use crate::config::EngineConfig;
use crate::diagnostics::EngineDiagnostics;
use crate::error::{EngineError, EngineResult};
use crate::gesture::GestureScheduler;
use crate::host::{Command, CommandQueue, Event, EventBus, EventEnvelope};
use crate::particles::ParticlePool;
use crate::rasterizer::{BodyDrawCall, ParticleView, Rasterizer};
use crate::rhythm::RhythmClock;
use crate::rng::Xorshift64Star;
use crate::time_base::{ClockSource, TimeBase};

/// Minimal serializable snapshot of durable state, for host-side
/// save/restore across sessions (spec §6). Transient state — live
/// particles, in-flight crossfades, pending gestures — is deliberately not
/// part of this: restoring mid-animation would be visually meaningless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub emotion: Emotion,
    pub undertone: Option<Undertone>,
    pub shape: Shape,
    pub bpm: f32,
    pub rhythm_enabled: bool,
    pub rng_seed: u64,
    pub rng_step: u64,
}

/// Root of the animation engine. One instance per rendered character.
pub struct Engine {
    config: EngineConfig,
    time_base: TimeBase,
    rhythm: RhythmClock,
    affect: AffectModel,
    body: BodyState,
    gestures: GestureScheduler,
    particles: ParticlePool,
    compositor: Compositor,
    rng: Xorshift64Star,
    rng_seed: u64,
    audio_tap: AudioTap,
    commands: CommandQueue,
    events: EventBus,
    diagnostics: EngineDiagnostics,
    /// Latest unforwarded `resize` request, applied to the rasterizer at
    /// the start of the next `tick` (spec §4.9: "forwarded to Rasterizer").
    pending_resize: Option<(u32, u32)>,
}

impl Engine {
    /// Construct a new engine. Fails only if `config` itself is invalid;
    /// a valid config can never subsequently produce a construction error.
    pub fn new(
        config: EngineConfig,
        clock: Box<dyn ClockSource>,
        rng_seed: u64,
    ) -> EngineResult<(Self, AudioTapProducer)> {
        if config.particle_capacity == 0 {
            return Err(EngineError::InvalidParticleCapacity(config.particle_capacity));
        }
        if config.bpm_min <= 0.0 || config.bpm_max <= config.bpm_min {
            return Err(EngineError::InvalidBpm(config.bpm_min));
        }

        let (audio_tap, producer) = AudioTap::new(config.audio_tap_queue_capacity);
        let engine = Self {
            time_base: TimeBase::new(clock, config.max_frame_dt),
            rhythm: RhythmClock::new(
                120.0_f32.clamp(config.bpm_min, config.bpm_max),
                config.bpm_min,
                config.bpm_max,
                config.tempo_confidence_threshold,
                config.tempo_dead_zone_bpm,
                config.tempo_adoption_beats,
            ),
            affect: AffectModel::new(config.default_fade_ms),
            body: BodyState::new(Shape::Circle, config.default_fade_ms),
            gestures: GestureScheduler::new(config.gesture_queue_depth),
            particles: ParticlePool::new(config.particle_capacity),
            compositor: Compositor::new(0.0, 0.0),
            rng: Xorshift64Star::new(rng_seed),
            rng_seed,
            audio_tap,
            commands: CommandQueue::new(config.gesture_queue_depth.max(8)),
            events: EventBus::new(),
            diagnostics: EngineDiagnostics::new(),
            pending_resize: None,
            config,
        };
        Ok((engine, producer))
    }

    pub fn enqueue_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&EventEnvelope) -> Result<(), String> + 'static,
    {
        self.events.subscribe(subscriber);
    }

    pub fn diagnostics(&self) -> &EngineDiagnostics {
        &self.diagnostics
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_paused(&self) -> bool {
        self.time_base.is_paused()
    }

    /// Drive one frame. `rasterizer` receives this frame's draw calls.
    pub fn tick(&mut self, rasterizer: &mut dyn Rasterizer) {
        self.diagnostics.begin_frame();

        let dt = self.time_base.tick_frame();

        self.drain_commands();
        self.drain_audio_tap();

        if let Some((width, height)) = self.pending_resize.take() {
            rasterizer.resize(width, height);
        }

        if dt <= 0.0 {
            return;
        }

        let beat_events = self.rhythm.advance(dt);
        let subdiv_events = self.rhythm.subdivision_events(dt);
        for b in &beat_events {
            self.publish(Event::BeatCrossed { beat: b.beat });
        }
        for s in &subdiv_events {
            self.publish(Event::SubdivisionCrossed {
                beat: s.beat,
                subdivision: s.subdivision,
            });
        }

        let gesture_events = self.gestures.tick(dt, &self.rhythm);
        for event in gesture_events {
            self.publish_gesture_lifecycle(event);
        }
        let rhythm_snapshot = self.rhythm.snapshot();

        self.affect.advance(dt);
        let shape_morphed = self.body.advance(dt);
        if shape_morphed {
            let shape = self.body.target_shape();
            self.publish(Event::ShapeMorphed { shape });
        }

        let affect_snapshot = self.affect.snapshot();
        let body_snapshot = self.body.snapshot();
        let active_gestures = self.gestures.active_gestures();

        let directives =
            self.compositor
                .compose(&affect_snapshot, &body_snapshot, &rhythm_snapshot, &active_gestures);

        self.particles.integrate(dt, affect_snapshot.motion_style);
        let overflow = self
            .particles
            .emit(dt, &directives.emission, &mut self.rng);
        if overflow > 0 {
            self.diagnostics.record_particle_overflow(overflow as u64);
            self.publish(Event::ParticleOverflow { dropped: overflow });
        }

        rasterizer.draw_body(BodyDrawCall {
            shape: body_snapshot.previous_shape,
            morph_target: body_snapshot.target_shape,
            morph_progress: body_snapshot.morph_progress,
            color: directives.body.color,
            glow: directives.body.glow,
            scale: directives.body.scale,
            orientation_bias: directives.body.orientation_bias,
        });
        let views: Vec<ParticleView> = self.particles.iter_live().map(ParticleView::from).collect();
        rasterizer.draw_particles(&views);
        rasterizer.present();
    }

    fn drain_commands(&mut self) {
        for command in self.commands.drain() {
            self.apply_command(command);
        }
    }

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::SetEmotion {
                emotion,
                undertone,
                fade_duration_s,
            } => {
                if self.affect.set_emotion(emotion, undertone, fade_duration_s).is_ok() {
                    self.publish(Event::EmotionChanged { emotion, undertone });
                }
            }
            Command::SetShape {
                shape,
                morph_duration_s,
            } => {
                if self.body.set_shape(shape, morph_duration_s).is_ok() {
                    self.publish(Event::ShapeChanged { shape });
                }
            }
            Command::TriggerGesture(descriptor) => {
                let family = descriptor.family;
                match self.gestures.enqueue(descriptor, &self.rhythm) {
                    Ok(_) => {}
                    Err(EngineError::GestureRejected { reason, .. }) => {
                        self.publish(Event::GestureRejected { family, reason });
                    }
                    Err(_) => {}
                }
            }
            Command::CancelGesture(id) => {
                if let Some(event) = self.gestures.cancel(id, &self.rhythm) {
                    self.publish_gesture_lifecycle(event);
                }
            }
            Command::CancelGestureFamily(family) => {
                for event in self.gestures.cancel_family(family) {
                    self.publish_gesture_lifecycle(event);
                }
            }
            Command::SetBpm(bpm) => {
                let _ = self.rhythm.set_bpm(bpm);
            }
            Command::EnableRhythm => self.rhythm.enable(),
            Command::DisableRhythm => self.rhythm.disable(),
            Command::Pause => {
                let was_paused = self.time_base.is_paused();
                self.time_base.pause();
                if !was_paused {
                    self.publish(Event::Paused);
                }
            }
            Command::Resume => {
                let was_paused = self.time_base.is_paused();
                self.time_base.resume();
                if was_paused {
                    self.publish(Event::Resumed);
                }
            }
            Command::SeedRng(seed) => {
                self.rng_seed = seed;
                self.rng.reseed(seed);
            }
            Command::Resize { width, height } => {
                self.pending_resize = Some((width, height));
            }
        }
    }

    fn drain_audio_tap(&mut self) {
        let estimates = self.audio_tap.drain();
        for estimate in estimates {
            if self.rhythm.consider_tempo_estimate(estimate) {
                self.diagnostics.record_tempo_adopted();
                self.publish(Event::TempoAdopted { bpm: self.rhythm.bpm() });
            } else {
                self.diagnostics.record_tempo_rejected();
            }
        }
    }

    fn publish_gesture_lifecycle(&mut self, event: crate::gesture::GestureLifecycleEvent) {
        use crate::gesture::GestureLifecycleEvent as G;
        let mapped = match event {
            G::Started { id, family } => Event::GestureStarted { id, family },
            G::Ended { id, family } => Event::GestureEnded { id, family },
            G::Cancelled { id, family } => Event::GestureCancelled { id, family },
            G::Rejected { family, reason } => Event::GestureRejected { family, reason },
        };
        self.publish(mapped);
    }

    fn publish(&mut self, event: Event) {
        let faults = self.events.publish(event, self.time_base.now());
        for fault in faults {
            self.diagnostics.record_subscriber_fault(&fault);
        }
    }

    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            emotion: self.affect.target_emotion(),
            undertone: self.affect.target_undertone(),
            shape: self.body.target_shape(),
            bpm: self.rhythm.bpm(),
            rhythm_enabled: self.rhythm.is_enabled(),
            rng_seed: self.rng_seed,
            rng_step: self.rng.step(),
        }
    }

    /// Restore durable state. Transient state (particles, gestures,
    /// in-flight crossfades) is reset, matching `PersistedState`'s scope.
    pub fn restore(&mut self, state: &PersistedState) -> EngineResult<()> {
        self.affect.set_emotion(state.emotion, state.undertone, Some(0.0))?;
        self.affect.advance(0.0);
        self.body.set_shape(state.shape, Some(0.0))?;
        self.body.advance(0.0);
        self.rhythm.set_bpm(state.bpm)?;
        if state.rhythm_enabled {
            self.rhythm.enable();
        } else {
            self.rhythm.disable();
        }
        self.rng_seed = state.rng_seed;
        self.rng.reseed(state.rng_seed);
        self.rng.fast_forward(state.rng_step);
        self.particles.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_base::SystemClock;

    struct NullRasterizer;
    impl Rasterizer for NullRasterizer {
        fn draw_body(&mut self, _call: BodyDrawCall) {}
        fn draw_particles(&mut self, _particles: &[ParticleView]) {}
    }

    fn engine() -> Engine {
        let (engine, _producer) =
            Engine::new(EngineConfig::default(), Box::new(SystemClock::new()), 42).unwrap();
        engine
    }

    #[test]
    fn zero_capacity_config_is_rejected_at_construction() {
        let mut config = EngineConfig::default();
        config.particle_capacity = 0;
        let result = Engine::new(config, Box::new(SystemClock::new()), 1);
        assert!(result.is_err());
    }

    #[test]
    fn set_emotion_command_updates_persisted_state() {
        let mut e = engine();
        let mut raster = NullRasterizer;
        e.enqueue_command(Command::SetEmotion {
            emotion: Emotion::Joy,
            undertone: None,
            fade_duration_s: Some(0.0),
        });
        e.tick(&mut raster);
        e.tick(&mut raster);
        assert_eq!(e.persisted_state().emotion, Emotion::Joy);
    }

    #[test]
    fn pause_command_freezes_time() {
        let mut e = engine();
        let mut raster = NullRasterizer;
        e.enqueue_command(Command::Pause);
        e.tick(&mut raster);
        assert!(e.is_paused());
    }

    #[test]
    fn restore_resets_particles() {
        let mut e = engine();
        let mut raster = NullRasterizer;
        e.enqueue_command(Command::SetEmotion {
            emotion: Emotion::Euphoria,
            undertone: None,
            fade_duration_s: Some(0.0),
        });
        for _ in 0..5 {
            e.tick(&mut raster);
        }
        let state = e.persisted_state();
        e.restore(&state).unwrap();
        assert_eq!(e.persisted_state().emotion, Emotion::Euphoria);
    }

    #[test]
    fn invalid_bpm_command_is_silently_rejected() {
        let mut e = engine();
        let mut raster = NullRasterizer;
        e.enqueue_command(Command::SetBpm(5000.0));
        e.tick(&mut raster); // must not panic
    }
}
