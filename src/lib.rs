//! hero-glow
//!
//! A decorative, full-viewport 3D hero visual. A glTF model flies in with a
//! scripted intro, wrapped in an additive glow shell, then floats in place
//! while following the mouse. Page overlays shift along with the pointer.
//! Runs in the browser (WebGL through wgpu) and in a native window.
//!
//! High-level modules
//! - `animation`: easing curves, one-shot timelines and the floating idle loop
//! - `camera`: camera, projection and their uniform
//! - `config`: the visual defaults of the stage
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: scene graph, materials, GPU models and render targets
//! - `flow`: the event loop and the flow abstraction driving it
//! - `pipelines`: the opaque lit and the additive glow pipelines, plus lights
//! - `pointer`: pointer state, follow smoothing and page overlays
//! - `resources`: asset fetching and glTF loading
//! - `render`: render composition and pipeline batching
//! - `stage`: the hero stage itself
//!

pub mod animation;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod pointer;
pub mod render;
pub mod resources;
pub mod stage;

pub use config::StageConfig;
pub use stage::{HeroStage, StageEvent, StageState};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Runs the hero stage until the window closes.
pub fn run_stage(config: StageConfig) -> anyhow::Result<()> {
    let flows: Vec<Box<dyn flow::GraphicsFlow<StageState, StageEvent>>> =
        vec![Box::new(HeroStage::new(config))];
    flow::run(flows)
}

/// Entry point of the web build.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run_stage(StageConfig::default()).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
