//! The hero stage: intro, floating idle and pointer follow for one model.
//!
//! [`Stage`] holds all CPU-side behaviour and is driven once per frame.
//! [`HeroStage`] is the [`GraphicsFlow`] wrapping it: it schedules the asset
//! load, mirrors scene objects to the GPU and moves page overlays.

use cgmath::Vector3;
use instant::Duration;
use winit::event::WindowEvent;

use crate::{
    animation::{Floating, Progress, Timeline, Track},
    config::StageConfig,
    context::Context,
    data_structures::{
        model::Model,
        scene_graph::{Scene, SceneNode, SceneObject},
    },
    flow::{GraphicsFlow, Out},
    pointer::{self, OverlayTarget, PointerFollow, PointerState},
    render::{Instanced, Render},
    resources,
};

/// State shared by every flow.
#[derive(Clone, Copy, Debug, Default)]
pub struct StageState {
    pub pointer: PointerState,
}

pub enum StageEvent {
    ModelLoaded(anyhow::Result<SceneNode>),
}

/// Where the model is in its life.
#[derive(Clone, Debug)]
pub enum Phase {
    Loading,
    /// The asset could not be loaded. Nothing is ever shown.
    Failed,
    Intro(Timeline),
    Floating(Floating),
}

#[derive(Debug)]
pub struct Stage {
    config: StageConfig,
    scene: Scene,
    model: Option<usize>,
    glow: Option<usize>,
    phase: Phase,
    follow: PointerFollow,
    /// Position from the timeline or floating, before the pointer offset.
    base: Vector3<f32>,
}

impl Stage {
    pub fn new(config: StageConfig) -> Self {
        let follow = PointerFollow::new(config.pointer_sensitivity, config.pointer_convergence);
        let base = config.intro_start.position;
        Self {
            config,
            scene: Scene::default(),
            model: None,
            glow: None,
            phase: Phase::Loading,
            follow,
            base,
        }
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn model(&self) -> Option<&SceneObject> {
        self.model.and_then(|handle| self.scene.get(handle))
    }

    pub fn glow(&self) -> Option<&SceneObject> {
        self.glow.and_then(|handle| self.scene.get(handle))
    }

    pub fn base_position(&self) -> Vector3<f32> {
        self.base
    }

    pub fn follow_offset(&self) -> cgmath::Vector2<f32> {
        self.follow.offset()
    }

    /// Takes the result of the asset load. Returns `true` when new objects
    /// were added to the scene.
    pub fn on_model_loaded(&mut self, result: anyhow::Result<SceneNode>) -> bool {
        if self.model.is_some() {
            log::warn!("A model is already on stage, ignoring another load result");
            return false;
        }
        match result {
            Ok(root) => {
                self.start_intro(root);
                true
            }
            Err(e) => {
                log::error!("An error happened while loading {}: {:#}", self.config.asset, e);
                self.phase = Phase::Failed;
                false
            }
        }
    }

    fn start_intro(&mut self, mut root: SceneNode) {
        root.apply_material(self.config.model_material);
        root.traverse_mut(&mut |part| {
            part.cast_shadow = true;
            part.receive_shadow = true;
        });
        let model = SceneObject::new(root, self.config.intro_start);
        let glow = model.clone_as_halo(self.config.glow_material, self.config.glow_scale);
        self.model = Some(self.scene.add(model));
        self.glow = Some(self.scene.add(glow));
        self.base = self.config.intro_start.position;

        let target = self.config.intro_target;
        let duration = self.config.intro_duration;
        let ease = self.config.intro_ease;
        let timeline = Timeline::new()
            .to(Track::Position, target.position, duration, ease, 0.0)
            .to(Track::Rotation, target.rotation, duration, ease, 0.0)
            .to(Track::Scale, target.scale, duration, ease, 0.0);
        log::info!("Model loaded, playing intro over {}s", timeline.duration());
        self.phase = Phase::Intro(timeline);
    }

    /// Advances one frame: base position first, then the pointer offset on top.
    ///
    /// Returns the intro's progress. [`Progress::Completed`] is returned on
    /// the single frame the intro ends.
    pub fn update(&mut self, dt: Duration, pointer: &PointerState) -> Progress {
        let Some(model) = self.model.and_then(|handle| self.scene.get_mut(handle)) else {
            return Progress::Idle;
        };

        let progress = match &mut self.phase {
            Phase::Intro(timeline) => {
                model.transform.position = self.base;
                let progress = timeline.advance(dt, &mut model.transform);
                self.base = model.transform.position;
                progress
            }
            Phase::Floating(floating) => {
                self.base = floating.advance(dt);
                Progress::Idle
            }
            Phase::Loading | Phase::Failed => Progress::Idle,
        };

        let offset = self.follow.step(pointer);
        model.transform.position = self.base + Vector3::new(offset.x, offset.y, 0.0);

        if progress == Progress::Completed {
            log::debug!("Intro finished at {:?}, floating from here", self.base);
            self.phase = Phase::Floating(Floating::new(
                self.base,
                self.config.floating_amplitude,
                self.config.floating_frequencies,
            ));
        }
        progress
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(StageConfig::default())
    }
}

/// The flow that puts a [`Stage`] on screen.
pub struct HeroStage {
    stage: Stage,
    /// GPU mirrors of the scene objects, indexed by scene handle.
    models: Vec<Model>,
    overlays: Box<dyn OverlayTarget>,
}

impl HeroStage {
    pub fn new(config: StageConfig) -> Self {
        #[cfg(target_arch = "wasm32")]
        let overlays: Box<dyn OverlayTarget> = Box::new(pointer::DomOverlays::new());
        #[cfg(not(target_arch = "wasm32"))]
        let overlays: Box<dyn OverlayTarget> = Box::new(pointer::NoOverlays);
        Self::with_overlays(config, overlays)
    }

    pub fn with_overlays(config: StageConfig, overlays: Box<dyn OverlayTarget>) -> Self {
        Self {
            stage: Stage::new(config),
            models: Vec::new(),
            overlays,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    fn upload_new_objects(&mut self, ctx: &Context) {
        let uploaded = self.models.len();
        for object in self.stage.scene().iter().skip(uploaded) {
            self.models
                .push(Model::from_object(&ctx.device, &ctx.material_layout, object));
        }
    }
}

impl Default for HeroStage {
    fn default() -> Self {
        Self::new(StageConfig::default())
    }
}

impl GraphicsFlow<StageState, StageEvent> for HeroStage {
    fn on_init(&mut self, ctx: &mut Context, _: &mut StageState) -> Out<StageEvent> {
        ctx.clear_colour = self.stage.config().clear_colour;
        let asset = self.stage.config().asset.clone();
        log::info!("Loading {}", asset);
        Out::FutEvent(vec![Box::new(async move {
            let result = resources::load_model_gltf(&asset, &mut resources::log_progress).await;
            StageEvent::ModelLoaded(result)
        })])
    }

    fn on_update(&mut self, ctx: &Context, state: &mut StageState, dt: Duration) -> Out<StageEvent> {
        self.stage.update(dt, &state.pointer);
        pointer::apply_overlays(
            &self.stage.config().overlays,
            &state.pointer,
            self.overlays.as_mut(),
        );
        let scene = self.stage.scene_mut();
        for (handle, model) in self.models.iter_mut().enumerate() {
            if let Some(object) = scene.get_mut(handle) {
                model.write_to_buffers(&ctx.queue, object);
            }
        }
        Out::Empty
    }

    fn on_window_events(
        &mut self,
        ctx: &Context,
        state: &mut StageState,
        event: &WindowEvent,
    ) -> Out<StageEvent> {
        if let WindowEvent::CursorMoved { position, .. } = event {
            let logical = position.to_logical::<f64>(ctx.scale_factor());
            state
                .pointer
                .on_move((logical.x, logical.y), ctx.logical_size());
        }
        Out::Empty
    }

    fn on_custom_events(
        &mut self,
        ctx: &Context,
        _: &mut StageState,
        event: StageEvent,
    ) -> Option<StageEvent> {
        match event {
            StageEvent::ModelLoaded(result) => {
                if self.stage.on_model_loaded(result) {
                    self.upload_new_objects(ctx);
                }
                None
            }
        }
    }

    fn on_render(&self) -> Render<'_> {
        if self.models.is_empty() {
            return Render::None;
        }
        Render::Defaults(self.models.iter().map(|model| Instanced { model }).collect())
    }
}
