//! The render clock. Frame-driven, variable dt, clamped, pausable.
//!
//! Only `TimeBase` touches a wall clock; every other component receives
//! time as a `dt` argument or an already-resolved snapshot.

/// Anything that can report monotonically non-decreasing seconds.
///
/// A native host backs this with `std::time::Instant`; a wasm host backs
/// it with `performance.now()` (see `glowmote-wasm`). Tests back it with a
/// manually-advanced counter so scenarios are exactly reproducible.
pub trait ClockSource {
    /// Current time in seconds. Must be monotonic; need not start at zero.
    fn now_seconds(&self) -> f64;
}

/// `ClockSource` backed by `std::time::Instant`, for native hosts.
#[derive(Debug)]
pub struct SystemClock {
    origin: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for SystemClock {
    fn now_seconds(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// The render clock: monotonic wall time, clamped frame dt, pause/resume.
pub struct TimeBase {
    clock: Box<dyn ClockSource>,
    /// Raw clock reading at the end of the previous `tick_frame` call.
    last_raw: f64,
    /// Accumulated un-paused elapsed time; this is `now()`.
    accumulated: f64,
    paused: bool,
    max_dt: f32,
}

impl TimeBase {
    /// Construct with a given clock source and dt clamp ceiling (seconds).
    pub fn new(clock: Box<dyn ClockSource>, max_dt: f32) -> Self {
        let raw = clock.now_seconds();
        Self {
            clock,
            last_raw: raw,
            accumulated: 0.0,
            paused: false,
            max_dt,
        }
    }

    /// Monotonic engine-local time in seconds since construction, frozen
    /// while paused.
    pub fn now(&self) -> f64 {
        self.accumulated
    }

    /// Advance and return this frame's clamped dt in seconds. Returns `0.0`
    /// while paused without disturbing the paused `now()` value. Clamped to
    /// `[0, max_dt]` to survive tab throttling / GC pauses without a
    /// catch-up burst.
    pub fn tick_frame(&mut self) -> f32 {
        let raw = self.clock.now_seconds();
        let delta = raw - self.last_raw;
        self.last_raw = raw;

        if self.paused {
            return 0.0;
        }

        let dt = delta.clamp(0.0, self.max_dt as f64) as f32;
        self.accumulated += dt as f64;
        dt
    }

    /// Freeze all clocks. Idempotent: `pause(); pause()` equals `pause()`.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume without back-dating: the next `tick_frame` measures only
    /// time elapsed from the resume instant onward, so a long real-world
    /// pause never produces a catch-up burst of simulated time.
    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        self.last_raw = self.clock.now_seconds();
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

/// A `ClockSource` that only moves when told to, for deterministic tests.
#[cfg(test)]
pub(crate) struct ManualClock {
    t: std::cell::Cell<f64>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> std::rc::Rc<Self> {
        std::rc::Rc::new(Self {
            t: std::cell::Cell::new(0.0),
        })
    }

    pub fn advance(self: &std::rc::Rc<Self>, secs: f64) {
        self.t.set(self.t.get() + secs);
    }
}

#[cfg(test)]
impl ClockSource for std::rc::Rc<ManualClock> {
    fn now_seconds(&self) -> f64 {
        self.t.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RcClock(std::rc::Rc<ManualClock>);
    impl ClockSource for RcClock {
        fn now_seconds(&self) -> f64 {
            self.0.now_seconds()
        }
    }

    #[test]
    fn dt_is_zero_on_first_call_relative_to_construction() {
        let clock = ManualClock::new();
        let mut tb = TimeBase::new(Box::new(RcClock(clock.clone())), 0.1);
        clock.advance(0.016);
        let dt = tb.tick_frame();
        assert!((dt - 0.016).abs() < 1e-6);
    }

    #[test]
    fn dt_clamps_to_ceiling() {
        let clock = ManualClock::new();
        let mut tb = TimeBase::new(Box::new(RcClock(clock.clone())), 0.1);
        clock.advance(5.0);
        let dt = tb.tick_frame();
        assert!((dt - 0.1).abs() < 1e-6);
    }

    #[test]
    fn pause_freezes_now_and_returns_zero_dt() {
        let clock = ManualClock::new();
        let mut tb = TimeBase::new(Box::new(RcClock(clock.clone())), 0.1);
        clock.advance(0.5);
        tb.tick_frame();
        let frozen_now = tb.now();

        tb.pause();
        clock.advance(10.0);
        let dt = tb.tick_frame();
        assert_eq!(dt, 0.0);
        assert_eq!(tb.now(), frozen_now);
    }

    #[test]
    fn pause_idempotent() {
        let clock = ManualClock::new();
        let mut tb = TimeBase::new(Box::new(RcClock(clock.clone())), 0.1);
        tb.pause();
        tb.pause();
        assert!(tb.is_paused());
    }

    #[test]
    fn resume_does_not_produce_catch_up_burst() {
        let clock = ManualClock::new();
        let mut tb = TimeBase::new(Box::new(RcClock(clock.clone())), 0.1);

        clock.advance(0.05);
        let first = tb.tick_frame();
        assert!((first - 0.05).abs() < 1e-6);

        tb.pause();
        clock.advance(10.0); // "real" wall-clock sleep while paused
        tb.resume();

        clock.advance(0.05);
        let second = tb.tick_frame();
        assert!((second - 0.05).abs() < 1e-6, "got {second}");
    }

    #[test]
    fn resume_without_pause_is_noop() {
        let clock = ManualClock::new();
        let mut tb = TimeBase::new(Box::new(RcClock(clock.clone())), 0.1);
        tb.resume();
        assert!(!tb.is_paused());
    }
}
