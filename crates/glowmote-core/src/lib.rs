//! Core simulation for an animated on-screen companion: a render clock, a
//! musical clock, an emotional model, gesture playback, and a particle
//! system, advanced one fixed pipeline per frame and handed to a
//! host-supplied rasterizer.
//!
//! This crate draws nothing. It decides *what* the companion looks like
//! this frame; `Rasterizer` is the seam where a host paints it.

#![forbid(unsafe_code)]

pub mod affect;
pub mod audio_tap;
pub mod body;
pub mod color;
pub mod compositor;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod host;
pub mod particles;
pub mod rasterizer;
pub mod rhythm;
pub mod rng;
pub mod time_base;

pub use affect::{AffectModel, AffectSnapshot, Emotion, Undertone};
pub use body::{BodyState, Shape};
pub use config::EngineConfig;
pub use engine::{Engine, PersistedState};
pub use error::{EngineError, EngineResult};
pub use gesture::{
    Curve, Element, Envelope, ExclusivityClass, GestureDescriptor, GestureId, ModulatorTarget,
    MusicalDuration, ParamModulator, PatternFamily,
};
pub use host::{Command, Event, EventEnvelope};
pub use rasterizer::{BodyDrawCall, ParticleView, Rasterizer};
pub use rhythm::Subdivision;
pub use time_base::{ClockSource, SystemClock};
