//! Closed error taxonomy for the engine.
//!
//! The engine never raises anything outside this enum. Construction
//! failures abort construction; command failures return here without
//! mutating engine state; in-tick failures are logged and swallowed by the
//! diagnostics sink rather than propagated (see `diagnostics.rs`).

use thiserror::Error;

use crate::gesture::PatternFamily;

/// All failure modes the engine can produce.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Unknown emotion or undertone identifier.
    #[error("invalid affect: {0}")]
    InvalidAffect(String),

    /// A gesture descriptor named a family the engine does not know.
    #[error("unknown gesture family: {0}")]
    UnknownGestureFamily(String),

    /// Gesture admission or lifecycle failure.
    #[error("gesture rejected ({family:?}): {reason}")]
    GestureRejected {
        /// Family of the rejected gesture.
        family: PatternFamily,
        /// Why it was rejected.
        reason: GestureRejectReason,
    },

    /// BPM outside `[30, 300]`.
    #[error("invalid bpm: {0} (must be in [30, 300])")]
    InvalidBpm(f32),

    /// Construction-time-only: a zero or absurd particle pool capacity.
    #[error("invalid particle capacity: {0}")]
    InvalidParticleCapacity(usize),

    /// Raised asynchronously to the diagnostics sink when a subscriber
    /// callback fails. Never interrupts the tick.
    #[error("event subscriber fault: {0}")]
    SubscriberFault(String),
}

/// Why a gesture admission or lifecycle step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureRejectReason {
    /// The per-exclusivity-class pending queue was at capacity.
    QueueFull,
    /// A higher-priority gesture displaced this one before it activated.
    Superseded,
    /// The gesture was cancelled by the host before activating.
    Cancelled,
}

impl std::fmt::Display for GestureRejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GestureRejectReason::QueueFull => "queue full",
            GestureRejectReason::Superseded => "superseded",
            GestureRejectReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Convenience alias used throughout the crate's fallible command paths.
pub type EngineResult<T> = Result<T, EngineError>;
