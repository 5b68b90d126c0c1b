//! Fixed-capacity particle pool: free-list allocation, fractional-emission
//! accumulation, and lifetime integration keyed on `MotionStyle`.
//!
//! Overflow (more emission requested than the pool has room for) is a
//! diagnostics counter, never an error (spec §4.5).

use crate::affect::MotionStyle;
use crate::color::{Rgb, BLACK};
use crate::rng::Xorshift64Star;

/// One live particle. Fields are packed for cache-friendly iteration during
/// integration and rasterization.
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub age: f32,
    pub lifetime: f32,
    pub color: Rgb,
    pub size: f32,
}

impl Particle {
    pub fn normalized_age(&self) -> f32 {
        if self.lifetime <= 0.0 {
            1.0
        } else {
            (self.age / self.lifetime).clamp(0.0, 1.0)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.age < self.lifetime
    }
}

/// Per-emission parameters the Compositor derives each frame (spec §4.6).
#[derive(Debug, Clone, Copy)]
pub struct EmissionSpec {
    pub rate_per_second: f32,
    pub origin_x: f32,
    pub origin_y: f32,
    pub base_speed: f32,
    pub base_color: Rgb,
    pub base_size: f32,
    pub lifetime_s: f32,
    pub motion_style: MotionStyle,
}

/// A fixed-capacity slot-based pool with a free-list for O(1) allocation
/// and release.
pub struct ParticlePool {
    slots: Vec<Option<Particle>>,
    free_list: Vec<usize>,
    capacity: usize,
    emission_accumulator: f32,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        let free_list = (0..capacity).rev().collect();
        Self {
            slots: vec![None; capacity],
            free_list,
            capacity,
            emission_accumulator: 0.0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn live_count(&self) -> usize {
        self.capacity - self.free_list.len()
    }

    /// Integrate existing particles by `dt` and retire any whose age has
    /// reached their lifetime, returning their slots to the free list.
    pub fn integrate(&mut self, dt: f32, motion_style: MotionStyle) {
        for i in 0..self.slots.len() {
            let Some(p) = &mut self.slots[i] else {
                continue;
            };
            p.age += dt;
            if !p.is_alive() {
                self.slots[i] = None;
                self.free_list.push(i);
                continue;
            }
            let t = p.normalized_age();
            apply_motion(p, dt, t, motion_style);
        }
    }

    /// Emit new particles for this frame given a fractional emission rate,
    /// drawing jitter from the engine's single owned RNG. Returns the
    /// number of particles that could not be spawned because the pool was
    /// full (a diagnostics concern, not an error).
    pub fn emit(&mut self, dt: f32, spec: &EmissionSpec, rng: &mut Xorshift64Star) -> u32 {
        self.emission_accumulator += spec.rate_per_second.max(0.0) * dt;
        let mut to_spawn = self.emission_accumulator.floor() as i64;
        self.emission_accumulator -= to_spawn as f32;
        let mut overflow = 0u32;

        while to_spawn > 0 {
            to_spawn -= 1;
            let Some(slot) = self.free_list.pop() else {
                overflow += 1;
                continue;
            };
            let angle = rng.range_f32(0.0, std::f32::consts::TAU);
            let speed_jitter = rng.range_f32(0.85, 1.15);
            let speed = spec.base_speed * speed_jitter;
            self.slots[slot] = Some(Particle {
                x: spec.origin_x,
                y: spec.origin_y,
                vx: angle.cos() * speed,
                vy: angle.sin() * speed,
                age: 0.0,
                lifetime: spec.lifetime_s.max(0.01),
                color: spec.base_color,
                size: spec.base_size * rng.range_f32(0.9, 1.1),
            });
        }

        overflow
    }

    pub fn iter_live(&self) -> impl Iterator<Item = &Particle> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.free_list = (0..self.capacity).rev().collect();
        self.emission_accumulator = 0.0;
    }
}

/// Per-style velocity shaping, applied on top of ballistic integration.
/// Each style nudges velocity differently across the particle's normalized
/// age `t` rather than sharing one curve (spec §4.6 edge cases).
fn apply_motion(p: &mut Particle, dt: f32, t: f32, style: MotionStyle) {
    match style {
        MotionStyle::Drifting => {
            p.vy += 4.0 * dt;
        }
        MotionStyle::Bursting => {
            let drag = 1.0 - (1.5 * dt).min(0.9);
            p.vx *= drag;
            p.vy *= drag;
        }
        MotionStyle::Pulsing => {
            let wobble = (t * std::f32::consts::TAU * 2.0).sin();
            p.vx += wobble * 2.0 * dt;
        }
        MotionStyle::Floating => {
            p.vy -= 2.0 * dt;
            p.vx *= 1.0 - (0.4 * dt).min(0.5);
        }
        MotionStyle::Jittering => {
            p.vx *= 1.0 - (0.2 * dt).min(0.3);
            p.vy *= 1.0 - (0.2 * dt).min(0.3);
        }
        MotionStyle::Settling => {
            p.vy += 6.0 * dt;
            p.vx *= 1.0 - (1.0 * dt).min(0.9);
        }
        MotionStyle::Sharp => {
            let drag = 1.0 - (2.5 * dt).min(0.95);
            p.vx *= drag;
            p.vy *= drag;
        }
        MotionStyle::Swirling => {
            let angle = 3.0 * dt;
            let (s, c) = angle.sin_cos();
            let (vx, vy) = (p.vx, p.vy);
            p.vx = vx * c - vy * s;
            p.vy = vx * s + vy * c;
        }
    }
    p.x += p.vx * dt;
    p.y += p.vy * dt;
}
