//! Thin wasm-bindgen façade over `glowmote-core`.
//!
//! Translates the JS-facing surface (plain strings and JSON-ish objects)
//! into the core crate's closed enums and back, and owns a `performance.now`
//! backed `ClockSource` so `TimeBase` never has to know it's running in a
//! browser.

use wasm_bindgen::prelude::*;

use glowmote_core::{
    BodyDrawCall, ClockSource, Command, Emotion, Engine, EngineConfig, GestureDescriptor,
    ParticleView, Rasterizer, Shape, Undertone,
};

/// `ClockSource` backed by the browser's `performance.now()`, so `TimeBase`
/// stays portable between native hosts and wasm without any `#[cfg]`.
struct PerformanceClock {
    performance: web_sys::Performance,
}

impl PerformanceClock {
    fn new() -> Result<Self, JsValue> {
        let performance = web_sys::window()
            .ok_or_else(|| JsValue::from_str("no global `window`"))?
            .performance()
            .ok_or_else(|| JsValue::from_str("no `performance` object"))?;
        Ok(Self { performance })
    }
}

impl ClockSource for PerformanceClock {
    fn now_seconds(&self) -> f64 {
        self.performance.now() / 1000.0
    }
}

/// Draw calls collected during one `tick`, handed back to JS as plain data
/// rather than re-entering JS per particle.
#[derive(serde::Serialize)]
struct FrameSnapshot {
    body: JsBodyDrawCall,
    particles: Vec<JsParticle>,
}

#[derive(serde::Serialize)]
struct JsBodyDrawCall {
    shape: String,
    morph_target: String,
    morph_progress: f32,
    color: [f32; 3],
    glow: f32,
    scale: f32,
    orientation_bias: f32,
}

#[derive(serde::Serialize)]
struct JsParticle {
    x: f32,
    y: f32,
    color: [f32; 3],
    size: f32,
    normalized_age: f32,
}

/// Collects one frame's draw calls in-memory; `GlowmoteEngine::tick`
/// serializes the result back to JS instead of calling into it per shape.
#[derive(Default)]
struct CollectingRasterizer {
    body: Option<BodyDrawCall>,
    particles: Vec<ParticleView>,
}

impl Rasterizer for CollectingRasterizer {
    fn draw_body(&mut self, call: BodyDrawCall) {
        self.body = Some(call);
    }

    fn draw_particles(&mut self, particles: &[ParticleView]) {
        self.particles = particles.to_vec();
    }

    fn resize(&mut self, _width: u32, _height: u32) {}
}

fn shape_name(shape: Shape) -> &'static str {
    match shape {
        Shape::Circle => "circle",
        Shape::Star => "star",
        Shape::Heart => "heart",
        Shape::Moon => "moon",
        Shape::Sun => "sun",
        Shape::Square => "square",
        Shape::Triangle => "triangle",
        Shape::Diamond => "diamond",
        Shape::Crystal => "crystal",
    }
}

/// The JS-facing engine handle. One instance per rendered companion.
#[wasm_bindgen]
pub struct GlowmoteEngine {
    engine: Engine,
}

#[wasm_bindgen]
impl GlowmoteEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(rng_seed: u32) -> Result<GlowmoteEngine, JsValue> {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        let clock = PerformanceClock::new()?;
        let (engine, _producer) = Engine::new(EngineConfig::default(), Box::new(clock), rng_seed as u64)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(GlowmoteEngine { engine })
    }

    /// Set the companion's emotion by name, with an optional undertone and
    /// fade duration in milliseconds.
    #[wasm_bindgen(js_name = setEmotion)]
    pub fn set_emotion(
        &mut self,
        emotion: &str,
        undertone: Option<String>,
        fade_ms: Option<f32>,
    ) -> Result<(), JsValue> {
        let emotion = Emotion::from_name(emotion)
            .ok_or_else(|| JsValue::from_str(&format!("unknown emotion: {emotion}")))?;
        let undertone = undertone
            .map(|u| {
                Undertone::from_name(&u).ok_or_else(|| JsValue::from_str(&format!("unknown undertone: {u}")))
            })
            .transpose()?;
        self.engine.enqueue_command(Command::SetEmotion {
            emotion,
            undertone,
            fade_duration_s: fade_ms.map(|ms| ms / 1000.0),
        });
        Ok(())
    }

    #[wasm_bindgen(js_name = setShape)]
    pub fn set_shape(&mut self, shape: &str, morph_ms: Option<f32>) -> Result<(), JsValue> {
        let shape = Shape::from_name(shape)
            .ok_or_else(|| JsValue::from_str(&format!("unknown shape: {shape}")))?;
        self.engine.enqueue_command(Command::SetShape {
            shape,
            morph_duration_s: morph_ms.map(|ms| ms / 1000.0),
        });
        Ok(())
    }

    #[wasm_bindgen(js_name = setBpm)]
    pub fn set_bpm(&mut self, bpm: f32) {
        self.engine.enqueue_command(Command::SetBpm(bpm));
    }

    pub fn pause(&mut self) {
        self.engine.enqueue_command(Command::Pause);
    }

    pub fn resume(&mut self) {
        self.engine.enqueue_command(Command::Resume);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.engine.enqueue_command(Command::Resize { width, height });
    }

    /// Trigger a gesture described as a plain JS object matching
    /// `GestureDescriptor`'s shape.
    #[wasm_bindgen(js_name = triggerGesture)]
    pub fn trigger_gesture(&mut self, descriptor: JsValue) -> Result<(), JsValue> {
        let descriptor: GestureDescriptor = serde_wasm_bindgen::from_value(descriptor)?;
        self.engine.enqueue_command(Command::TriggerGesture(descriptor));
        Ok(())
    }

    /// Advance one frame and return the frame's draw calls as a JS value.
    pub fn tick(&mut self) -> Result<JsValue, JsValue> {
        let mut rasterizer = CollectingRasterizer::default();
        self.engine.tick(&mut rasterizer);

        let body = rasterizer.body.map(|b| JsBodyDrawCall {
            shape: shape_name(b.shape).to_string(),
            morph_target: shape_name(b.morph_target).to_string(),
            morph_progress: b.morph_progress,
            color: [b.color.r, b.color.g, b.color.b],
            glow: b.glow,
            scale: b.scale,
            orientation_bias: b.orientation_bias,
        });

        let Some(body) = body else {
            return Err(JsValue::from_str("engine produced no body draw call"));
        };

        let particles = rasterizer
            .particles
            .into_iter()
            .map(|p| JsParticle {
                x: p.x,
                y: p.y,
                color: [p.color.r, p.color.g, p.color.b],
                size: p.size,
                normalized_age: p.normalized_age,
            })
            .collect();

        let snapshot = FrameSnapshot { body, particles };
        serde_wasm_bindgen::to_value(&snapshot).map_err(JsValue::from)
    }

    /// Serialize durable state (emotion, shape, bpm, rng seed) for a host
    /// to persist across sessions.
    #[wasm_bindgen(js_name = persistedState)]
    pub fn persisted_state(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.engine.persisted_state()).map_err(JsValue::from)
    }

    pub fn restore(&mut self, state: JsValue) -> Result<(), JsValue> {
        let state = serde_wasm_bindgen::from_value(state)?;
        self.engine
            .restore(&state)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn engine_constructs_and_ticks() {
        let mut engine = GlowmoteEngine::new(7).expect("engine should construct in a browser");
        let result = engine.tick();
        assert!(result.is_ok());
    }

    #[wasm_bindgen_test]
    fn unknown_emotion_name_is_rejected() {
        let mut engine = GlowmoteEngine::new(7).expect("engine should construct in a browser");
        let result = engine.set_emotion("not-an-emotion", None, None);
        assert!(result.is_err());
    }
}
