//! Declarative gestures aligned to musical boundaries, with compatibility
//! rules and cancellation (spec §4.4).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, GestureRejectReason};
use crate::rhythm::{RhythmClock, Subdivision};

/// Unique handle for a gesture, assigned by the scheduler on enqueue.
pub type GestureId = u64;

/// The closed set of gesture pattern families. Each carries a fixed
/// priority used to resolve `Solo`/`Family` conflicts (spec §4.4: "priority
/// is a fixed per-family value").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternFamily {
    Bounce,
    Shake,
    Pulse,
    Sparkle,
    Spin,
    Nod,
    Wave,
    Shimmer,
}

impl PatternFamily {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_lowercase().as_str() {
            "bounce" => PatternFamily::Bounce,
            "shake" => PatternFamily::Shake,
            "pulse" => PatternFamily::Pulse,
            "sparkle" => PatternFamily::Sparkle,
            "spin" => PatternFamily::Spin,
            "nod" => PatternFamily::Nod,
            "wave" => PatternFamily::Wave,
            "shimmer" => PatternFamily::Shimmer,
            _ => return None,
        })
    }

    /// Fixed priority for conflict resolution. Higher displaces lower;
    /// ties favor the incumbent (spec §4.4 step 1).
    pub fn priority(self) -> u8 {
        match self {
            PatternFamily::Shake => 20,
            PatternFamily::Spin => 18,
            PatternFamily::Bounce => 10,
            PatternFamily::Nod => 10,
            PatternFamily::Wave => 8,
            PatternFamily::Pulse => 6,
            PatternFamily::Sparkle => 4,
            PatternFamily::Shimmer => 4,
        }
    }
}

/// Which directive layer a gesture targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Element {
    Body,
    Particles,
    Both,
}

/// A duration expressed in musical time, never milliseconds (spec §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MusicalDuration {
    Beats(f32),
    Subdivisions { count: u32, subdivision: Subdivision },
}

impl MusicalDuration {
    pub fn in_beats(self) -> f32 {
        match self {
            MusicalDuration::Beats(b) => b.max(0.0001),
            MusicalDuration::Subdivisions { count, subdivision } => {
                (count as f32 * subdivision.beats()).max(0.0001)
            }
        }
    }
}

/// The closed enumeration governing whether two gestures may coexist (spec
/// §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExclusivityClass {
    Solo,
    Family(PatternFamily),
    Overlay,
    Ambient,
}

/// The parameters a `ParamModulator` may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModulatorTarget {
    EmissionRate,
    BodyScale,
    GlowIntensity,
    OrientationBias,
    ParticleSpeed,
}

impl ModulatorTarget {
    /// Scalar targets combine multiplicatively (`base * (1+overlay) *
    /// ambient`); signed-bias targets combine additively. See spec §4.4.
    pub fn is_signed_bias(self) -> bool {
        matches!(self, ModulatorTarget::OrientationBias)
    }
}

/// A curve over normalized gesture time `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Curve {
    /// Sorted `(t, value)` control points, linearly interpolated between.
    PiecewiseLinear(Vec<(f32, f32)>),
    /// A named predefined envelope.
    Predefined(Envelope),
}

/// Predefined envelope shapes reusable across gestures without restating
/// control points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Envelope {
    /// Ramp 0→1→0, peaking at the midpoint.
    Spike,
    /// Ramp 0→1 and hold.
    AttackHold,
    /// Hold 1 and decay to 0.
    HoldDecay,
    /// Constant 1.0 throughout.
    Flat,
}

impl Envelope {
    fn value_at(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Envelope::Spike => 1.0 - (t - 0.5).abs() * 2.0,
            Envelope::AttackHold => (t / 0.25).min(1.0),
            Envelope::HoldDecay => {
                if t < 0.5 {
                    1.0
                } else {
                    1.0 - (t - 0.5) * 2.0
                }
            }
            Envelope::Flat => 1.0,
        }
    }
}

impl Curve {
    pub fn value_at(&self, t: f32) -> f32 {
        match self {
            Curve::Predefined(env) => env.value_at(t),
            Curve::PiecewiseLinear(points) => {
                if points.is_empty() {
                    return 0.0;
                }
                let t = t.clamp(0.0, 1.0);
                if t <= points[0].0 {
                    return points[0].1;
                }
                for window in points.windows(2) {
                    let (t0, v0) = window[0];
                    let (t1, v1) = window[1];
                    if t >= t0 && t <= t1 {
                        if (t1 - t0).abs() < f32::EPSILON {
                            return v1;
                        }
                        let f = (t - t0) / (t1 - t0);
                        return v0 + (v1 - v0) * f;
                    }
                }
                points.last().unwrap().1
            }
        }
    }
}

/// Names a target parameter and the curve biasing it over gesture time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamModulator {
    pub target: ModulatorTarget,
    pub curve: Curve,
}

/// Host-facing gesture descriptor, as passed to `triggerGesture` (no id —
/// the scheduler assigns one on admission).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureDescriptor {
    pub family: PatternFamily,
    pub element: Option<Element>,
    pub duration: MusicalDuration,
    pub exclusivity: ExclusivityClass,
    pub modulators: Vec<ParamModulator>,
    pub beat_aligned: bool,
    pub align_subdivision: Subdivision,
}

/// Lifecycle stage of an admitted gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureStage {
    /// Waiting for its family's active slot to free (spec §4.4 `Family(f)`:
    /// "additional admits to the same family queue").
    Queued,
    Pending,
    Active,
    Retiring,
    Done,
    Cancelled,
}

struct Gesture {
    id: GestureId,
    family: PatternFamily,
    element: Option<Element>,
    exclusivity: ExclusivityClass,
    modulators: Vec<ParamModulator>,
    duration_beats: f32,
    stage: GestureStage,
    normalized_time: f32,
    beat_aligned: bool,
    align_subdivision: Subdivision,
    /// Only meaningful while `stage == Pending`.
    activation_instant_abs_beats: f64,
}

/// Live snapshot of an active gesture, surfaced to the Compositor.
#[derive(Debug, Clone)]
pub struct ActiveGesture {
    pub id: GestureId,
    pub family: PatternFamily,
    pub element: Option<Element>,
    pub exclusivity: ExclusivityClass,
    pub modulators: Vec<ParamModulator>,
    pub normalized_time: f32,
}

/// An event the scheduler surfaces to the host's event bus this tick.
#[derive(Debug, Clone)]
pub enum GestureLifecycleEvent {
    Started { id: GestureId, family: PatternFamily },
    Ended { id: GestureId, family: PatternFamily },
    Cancelled { id: GestureId, family: PatternFamily },
    Rejected { family: PatternFamily, reason: GestureRejectReason },
}

/// Admits gestures, aligns starts to musical boundaries, enforces
/// compatibility, and surfaces active gestures to the Compositor.
pub struct GestureScheduler {
    gestures: Vec<Gesture>,
    next_id: GestureId,
    queue_depth: usize,
}

impl GestureScheduler {
    pub fn new(queue_depth: usize) -> Self {
        Self {
            gestures: Vec::new(),
            next_id: 1,
            queue_depth,
        }
    }

    fn pending_count_for(&self, exclusivity: ExclusivityClass) -> usize {
        self.gestures
            .iter()
            .filter(|g| g.stage == GestureStage::Pending && g.exclusivity == exclusivity)
            .count()
    }

    fn queued_count_for(&self, exclusivity: ExclusivityClass) -> usize {
        self.gestures
            .iter()
            .filter(|g| g.stage == GestureStage::Queued && g.exclusivity == exclusivity)
            .count()
    }

    fn find_conflicting_active(&self, exclusivity: ExclusivityClass) -> Option<usize> {
        match exclusivity {
            ExclusivityClass::Solo => self.gestures.iter().position(|g| {
                g.stage == GestureStage::Active && g.exclusivity == ExclusivityClass::Solo
            }),
            ExclusivityClass::Family(f) => self.gestures.iter().position(|g| {
                g.stage == GestureStage::Active && g.exclusivity == ExclusivityClass::Family(f)
            }),
            ExclusivityClass::Overlay => None,
            ExclusivityClass::Ambient => None,
        }
    }

    /// Admit a new gesture descriptor. Returns the assigned id on success.
    ///
    /// Ambient duplicates and lower-priority Family challengers are not
    /// failures: the former is a silent no-op, the latter joins the
    /// family's queue (spec §4.4) — both still return `Ok`.
    pub fn enqueue(
        &mut self,
        descriptor: GestureDescriptor,
        rhythm: &RhythmClock,
    ) -> Result<GestureId, EngineError> {
        let id = self.next_id;

        // Ambient: admitted only if no same-family Ambient is already
        // active; otherwise ignored outright (spec §4.4: "ignored
        // otherwise" — not a rejection event).
        if descriptor.exclusivity == ExclusivityClass::Ambient {
            let already_active = self.gestures.iter().any(|g| {
                g.stage == GestureStage::Active
                    && g.exclusivity == ExclusivityClass::Ambient
                    && g.family == descriptor.family
            });
            if already_active {
                return Ok(id);
            }
        }

        if let Some(conflict_idx) = self.find_conflicting_active(descriptor.exclusivity) {
            let conflicting_priority = self.gestures[conflict_idx].family.priority();
            let incoming_priority = descriptor.family.priority();
            if incoming_priority > conflicting_priority {
                let conflict = &mut self.gestures[conflict_idx];
                conflict.stage = GestureStage::Cancelled;
                self.activate_or_pend(id, descriptor, rhythm);
                self.next_id += 1;
                return Ok(id);
            }

            // Incumbent wins ties and strictly-higher priority. `Family`
            // challengers join that family's queue rather than being
            // rejected (spec §4.4: "additional admits to the same family
            // queue"); other classes with no queue concept are rejected.
            if let ExclusivityClass::Family(_) = descriptor.exclusivity {
                if self.queued_count_for(descriptor.exclusivity) >= self.queue_depth {
                    return Err(EngineError::GestureRejected {
                        family: descriptor.family,
                        reason: GestureRejectReason::QueueFull,
                    });
                }
                self.gestures.push(Gesture {
                    id,
                    family: descriptor.family,
                    element: descriptor.element,
                    exclusivity: descriptor.exclusivity,
                    modulators: descriptor.modulators,
                    duration_beats: descriptor.duration.in_beats(),
                    stage: GestureStage::Queued,
                    normalized_time: 0.0,
                    beat_aligned: descriptor.beat_aligned,
                    align_subdivision: descriptor.align_subdivision,
                    activation_instant_abs_beats: 0.0,
                });
                self.next_id += 1;
                return Ok(id);
            }

            return Err(EngineError::GestureRejected {
                family: descriptor.family,
                reason: GestureRejectReason::Superseded,
            });
        }

        self.activate_or_pend(id, descriptor, rhythm);
        self.next_id += 1;
        Ok(id)
    }

    /// Admit `descriptor` as `id`, either immediately active or `Pending`
    /// on the next musical boundary, mirroring admission step 2/3.
    fn activate_or_pend(&mut self, id: GestureId, descriptor: GestureDescriptor, rhythm: &RhythmClock) {
        if descriptor.beat_aligned && rhythm.is_enabled() {
            let boundary = rhythm.next_boundary(descriptor.align_subdivision);
            let activation_abs = boundary.beat as f64 + boundary.phase01 as f64;
            self.gestures.push(Gesture {
                id,
                family: descriptor.family,
                element: descriptor.element,
                exclusivity: descriptor.exclusivity,
                modulators: descriptor.modulators,
                duration_beats: descriptor.duration.in_beats(),
                stage: GestureStage::Pending,
                normalized_time: 0.0,
                beat_aligned: descriptor.beat_aligned,
                align_subdivision: descriptor.align_subdivision,
                activation_instant_abs_beats: activation_abs,
            });
            return;
        }
        self.gestures.push(Gesture {
            id,
            family: descriptor.family,
            element: descriptor.element,
            exclusivity: descriptor.exclusivity,
            modulators: descriptor.modulators,
            duration_beats: descriptor.duration.in_beats(),
            stage: GestureStage::Active,
            normalized_time: 0.0,
            beat_aligned: descriptor.beat_aligned,
            align_subdivision: descriptor.align_subdivision,
            activation_instant_abs_beats: 0.0,
        });
    }

    /// Promote the oldest queued gesture for `family`, if any, into
    /// `Pending`/`Active` now that the family's active slot has freed.
    fn promote_queued_family(&mut self, family: PatternFamily, rhythm: &RhythmClock) {
        let target_exclusivity = ExclusivityClass::Family(family);
        let Some(idx) = self
            .gestures
            .iter()
            .position(|g| g.stage == GestureStage::Queued && g.exclusivity == target_exclusivity)
        else {
            return;
        };
        let g = self.gestures.remove(idx);
        let descriptor = GestureDescriptor {
            family: g.family,
            element: g.element,
            duration: MusicalDuration::Beats(g.duration_beats),
            exclusivity: g.exclusivity,
            modulators: g.modulators,
            beat_aligned: g.beat_aligned,
            align_subdivision: g.align_subdivision,
        };
        self.activate_or_pend(g.id, descriptor, rhythm);
    }

    /// Cancel by id. No-op (not an error) if the id is not found or already
    /// terminal (spec §4.4 failure semantics). Cancelling an active
    /// `Family(f)` incumbent promotes the next queued gesture in that
    /// family, if any.
    pub fn cancel(&mut self, id: GestureId, rhythm: &RhythmClock) -> Option<GestureLifecycleEvent> {
        let mut freed_family = None;
        let result = if let Some(g) = self.gestures.iter_mut().find(|g| g.id == id) {
            if matches!(g.stage, GestureStage::Pending | GestureStage::Active | GestureStage::Queued) {
                let was_active_family = g.stage == GestureStage::Active;
                g.stage = GestureStage::Cancelled;
                if was_active_family {
                    if let ExclusivityClass::Family(f) = g.exclusivity {
                        freed_family = Some(f);
                    }
                }
                Some(GestureLifecycleEvent::Cancelled {
                    id: g.id,
                    family: g.family,
                })
            } else {
                None
            }
        } else {
            None
        };
        if let Some(f) = freed_family {
            self.promote_queued_family(f, rhythm);
        }
        result
    }

    /// Cancel every pending/active/queued gesture in a family.
    pub fn cancel_family(&mut self, family: PatternFamily) -> Vec<GestureLifecycleEvent> {
        let mut events = Vec::new();
        for g in &mut self.gestures {
            if g.family == family
                && matches!(g.stage, GestureStage::Pending | GestureStage::Active | GestureStage::Queued)
            {
                g.stage = GestureStage::Cancelled;
                events.push(GestureLifecycleEvent::Cancelled {
                    id: g.id,
                    family: g.family,
                });
            }
        }
        events
    }

    /// Live snapshot for the Compositor.
    pub fn active_gestures(&self) -> Vec<ActiveGesture> {
        self.gestures
            .iter()
            .filter(|g| matches!(g.stage, GestureStage::Active | GestureStage::Retiring))
            .map(|g| ActiveGesture {
                id: g.id,
                family: g.family,
                element: g.element,
                exclusivity: g.exclusivity,
                modulators: g.modulators.clone(),
                normalized_time: g.normalized_time,
            })
            .collect()
    }

    /// Advance musical time for active gestures, retire those past 1.0,
    /// promote queued/pending gestures whose slot or alignment point has
    /// arrived, and sweep out Done/Cancelled entries. Returns this frame's
    /// lifecycle events.
    pub fn tick(&mut self, dt: f32, rhythm: &RhythmClock) -> Vec<GestureLifecycleEvent> {
        let mut events = Vec::new();
        let current_abs = rhythm.beat() as f64 + rhythm.phase01() as f64;
        let delta_beats = (dt * rhythm.bpm() / 60.0) as f64;
        let mut freed_families = Vec::new();

        for g in &mut self.gestures {
            match g.stage {
                GestureStage::Queued => {}
                GestureStage::Pending => {
                    if current_abs + 1e-9 >= g.activation_instant_abs_beats {
                        g.stage = GestureStage::Active;
                        g.normalized_time = 0.0;
                        events.push(GestureLifecycleEvent::Started {
                            id: g.id,
                            family: g.family,
                        });
                    }
                }
                GestureStage::Active => {
                    let advance = if g.duration_beats > 0.0 {
                        (delta_beats as f32) / g.duration_beats
                    } else {
                        1.0
                    };
                    g.normalized_time += advance;
                    if g.normalized_time >= 1.0 {
                        g.normalized_time = 1.0;
                        g.stage = GestureStage::Retiring;
                    }
                }
                GestureStage::Retiring => {
                    g.stage = GestureStage::Done;
                    events.push(GestureLifecycleEvent::Ended {
                        id: g.id,
                        family: g.family,
                    });
                    if let ExclusivityClass::Family(f) = g.exclusivity {
                        freed_families.push(f);
                    }
                }
                GestureStage::Done | GestureStage::Cancelled => {}
            }
        }

        self.gestures
            .retain(|g| !matches!(g.stage, GestureStage::Done | GestureStage::Cancelled));

        for family in freed_families {
            self.promote_queued_family(family, rhythm);
        }

        events
    }

    pub fn active_count(&self) -> usize {
        self.gestures
            .iter()
            .filter(|g| g.stage == GestureStage::Active)
            .count()
    }

    pub fn active_solo_count(&self) -> usize {
        self.gestures
            .iter()
            .filter(|g| g.stage == GestureStage::Active && g.exclusivity == ExclusivityClass::Solo)
            .count()
    }

    pub fn active_family_count(&self, family: PatternFamily) -> usize {
        self.gestures
            .iter()
            .filter(|g| {
                g.stage == GestureStage::Active && g.exclusivity == ExclusivityClass::Family(family)
            })
            .count()
    }
}

/// Reduce all active gestures' contributions to a single target parameter
/// (spec §4.4 modulator composition).
pub fn reduce_modulator(target: ModulatorTarget, active: &[ActiveGesture]) -> f32 {
    let mut solo_or_family: Option<f32> = None;
    let mut overlay_sum = 0.0_f32;
    let mut ambient_product = 1.0_f32;

    for g in active {
        for m in &g.modulators {
            if m.target != target {
                continue;
            }
            let v = m.curve.value_at(g.normalized_time);
            match g.exclusivity {
                ExclusivityClass::Solo | ExclusivityClass::Family(_) => {
                    solo_or_family = Some(v);
                }
                ExclusivityClass::Overlay => overlay_sum += v,
                ExclusivityClass::Ambient => ambient_product *= v,
            }
        }
    }

    if target.is_signed_bias() {
        solo_or_family.unwrap_or(0.0) + overlay_sum
    } else {
        let base = solo_or_family.unwrap_or(1.0);
        base * (1.0 + overlay_sum) * ambient_product
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rhythm() -> RhythmClock {
        RhythmClock::new(120.0, 30.0, 300.0, 0.6, 2.0, 4.0)
    }

    fn simple_descriptor(family: PatternFamily, exclusivity: ExclusivityClass) -> GestureDescriptor {
        GestureDescriptor {
            family,
            element: Some(Element::Body),
            duration: MusicalDuration::Beats(1.0),
            exclusivity,
            modulators: vec![],
            beat_aligned: false,
            align_subdivision: Subdivision::Quarter,
        }
    }

    #[test]
    fn immediate_gesture_becomes_active() {
        let mut s = GestureScheduler::new(4);
        let r = rhythm();
        let id = s
            .enqueue(simple_descriptor(PatternFamily::Bounce, ExclusivityClass::Solo), &r)
            .unwrap();
        assert_eq!(s.active_count(), 1);
        assert_eq!(s.active_gestures()[0].id, id);
    }

    #[test]
    fn solo_displacement_cancels_incumbent() {
        let mut s = GestureScheduler::new(4);
        let r = rhythm();
        s.enqueue(simple_descriptor(PatternFamily::Bounce, ExclusivityClass::Solo), &r)
            .unwrap(); // priority 10
        let shake_id = s
            .enqueue(simple_descriptor(PatternFamily::Shake, ExclusivityClass::Solo), &r)
            .unwrap(); // priority 20, displaces
        assert_eq!(s.active_solo_count(), 1);
        assert_eq!(s.active_gestures()[0].id, shake_id);
    }

    #[test]
    fn lower_priority_is_rejected_not_queued() {
        let mut s = GestureScheduler::new(4);
        let r = rhythm();
        s.enqueue(simple_descriptor(PatternFamily::Shake, ExclusivityClass::Solo), &r)
            .unwrap();
        let result = s.enqueue(simple_descriptor(PatternFamily::Bounce, ExclusivityClass::Solo), &r);
        assert!(result.is_err());
        assert_eq!(s.active_solo_count(), 1);
    }

    #[test]
    fn family_exclusivity_holds_at_most_one() {
        let mut s = GestureScheduler::new(4);
        let r = rhythm();
        s.enqueue(
            simple_descriptor(PatternFamily::Wave, ExclusivityClass::Family(PatternFamily::Wave)),
            &r,
        )
        .unwrap();
        let second = s.enqueue(
            simple_descriptor(PatternFamily::Wave, ExclusivityClass::Family(PatternFamily::Wave)),
            &r,
        );
        // Same priority -> tie goes to incumbent -> the challenger queues
        // rather than being rejected.
        assert!(second.is_ok());
        assert_eq!(s.active_family_count(PatternFamily::Wave), 1);
        assert_eq!(s.active_count(), 1);
    }

    #[test]
    fn queued_family_gesture_activates_once_incumbent_retires() {
        let mut s = GestureScheduler::new(4);
        let mut r = rhythm();
        let first = s
            .enqueue(
                simple_descriptor(PatternFamily::Wave, ExclusivityClass::Family(PatternFamily::Wave)),
                &r,
            )
            .unwrap();
        let second = s
            .enqueue(
                simple_descriptor(PatternFamily::Wave, ExclusivityClass::Family(PatternFamily::Wave)),
                &r,
            )
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(s.active_gestures()[0].id, first);

        // 1 beat at 120bpm = 0.5s; the incumbent retires and the queued
        // gesture should take the freed family slot.
        for _ in 0..60 {
            r.advance(1.0 / 120.0);
            s.tick(1.0 / 120.0, &r);
        }
        assert_eq!(s.active_family_count(PatternFamily::Wave), 1);
        assert_eq!(s.active_gestures()[0].id, second);
    }

    #[test]
    fn overlay_gestures_all_admit() {
        let mut s = GestureScheduler::new(4);
        let r = rhythm();
        s.enqueue(simple_descriptor(PatternFamily::Sparkle, ExclusivityClass::Overlay), &r)
            .unwrap();
        s.enqueue(simple_descriptor(PatternFamily::Sparkle, ExclusivityClass::Overlay), &r)
            .unwrap();
        assert_eq!(s.active_count(), 2);
    }

    #[test]
    fn duplicate_ambient_is_silently_ignored() {
        let mut s = GestureScheduler::new(4);
        let r = rhythm();
        s.enqueue(simple_descriptor(PatternFamily::Shimmer, ExclusivityClass::Ambient), &r)
            .unwrap();
        let second = s.enqueue(simple_descriptor(PatternFamily::Shimmer, ExclusivityClass::Ambient), &r);
        assert!(second.is_ok());
        assert_eq!(s.active_count(), 1);
    }

    #[test]
    fn unknown_family_parse_fails_gracefully() {
        assert!(PatternFamily::from_name("not-a-family").is_none());
    }

    #[test]
    fn cancel_unknown_id_is_noop() {
        let mut s = GestureScheduler::new(4);
        let r = rhythm();
        assert!(s.cancel(99999, &r).is_none());
    }

    #[test]
    fn gesture_retires_after_its_duration() {
        let mut s = GestureScheduler::new(4);
        let mut r = rhythm();
        s.enqueue(simple_descriptor(PatternFamily::Pulse, ExclusivityClass::Overlay), &r)
            .unwrap();

        // 1 beat at 120bpm = 0.5s. Advance rhythm + scheduler together.
        let mut ended = false;
        for _ in 0..60 {
            r.advance(1.0 / 120.0);
            let events = s.tick(1.0 / 120.0, &r);
            if events
                .iter()
                .any(|e| matches!(e, GestureLifecycleEvent::Ended { .. }))
            {
                ended = true;
                break;
            }
        }
        assert!(ended);
        assert_eq!(s.active_count(), 0);
    }

    #[test]
    fn beat_aligned_gesture_activates_on_boundary() {
        let mut s = GestureScheduler::new(4);
        let mut r = rhythm();
        r.advance(0.25 * 60.0 / 120.0); // move to phase 0.25

        let mut descriptor = simple_descriptor(PatternFamily::Bounce, ExclusivityClass::Solo);
        descriptor.beat_aligned = true;
        descriptor.align_subdivision = Subdivision::Quarter;
        s.enqueue(descriptor, &r).unwrap();
        assert_eq!(s.active_count(), 0); // pending, not yet active

        let mut started = false;
        for _ in 0..200 {
            r.advance(0.002);
            let events = s.tick(0.002, &r);
            if events
                .iter()
                .any(|e| matches!(e, GestureLifecycleEvent::Started { .. }))
            {
                started = true;
                break;
            }
        }
        assert!(started);
    }

    #[test]
    fn reduce_modulator_scalar_combination() {
        let active = vec![
            ActiveGesture {
                id: 1,
                family: PatternFamily::Sparkle,
                element: None,
                exclusivity: ExclusivityClass::Overlay,
                modulators: vec![ParamModulator {
                    target: ModulatorTarget::EmissionRate,
                    curve: Curve::Predefined(Envelope::Flat),
                }],
                normalized_time: 0.5,
            },
            ActiveGesture {
                id: 2,
                family: PatternFamily::Sparkle,
                element: None,
                exclusivity: ExclusivityClass::Overlay,
                modulators: vec![ParamModulator {
                    target: ModulatorTarget::EmissionRate,
                    curve: Curve::Predefined(Envelope::Flat),
                }],
                normalized_time: 0.5,
            },
        ];
        let v = reduce_modulator(ModulatorTarget::EmissionRate, &active);
        // base(1.0) * (1 + 1.0 + 1.0) = 3.0
        assert!((v - 3.0).abs() < 1e-5);
    }

    #[test]
    fn reduce_modulator_signed_bias_combination() {
        let active = vec![ActiveGesture {
            id: 1,
            family: PatternFamily::Nod,
            element: None,
            exclusivity: ExclusivityClass::Family(PatternFamily::Nod),
            modulators: vec![ParamModulator {
                target: ModulatorTarget::OrientationBias,
                curve: Curve::Predefined(Envelope::Flat),
            }],
            normalized_time: 0.5,
        }];
        let v = reduce_modulator(ModulatorTarget::OrientationBias, &active);
        assert!((v - 1.0).abs() < 1e-5);
    }
}
