#![allow(dead_code)]

#[cfg(feature = "integration-tests")]
use hero_glow::{
    context::Context,
    flow::{GraphicsFlow, ImageTestResult, Out},
    render::Render,
};

/// Packs a JSON document and a binary chunk into a GLB container.
pub(crate) fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let total = 12 + 8 + json.len() + if bin.is_empty() { 0 } else { 8 + bin.len() };

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    if !bin.is_empty() {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
    }
    out
}

/// A unit quad made of two indexed triangles under a parent node.
pub(crate) fn quad_glb() -> Vec<u8> {
    let positions: Vec<u8> = [
        [-0.5f32, -0.5, 0.0],
        [0.5, -0.5, 0.0],
        [0.5, 0.5, 0.0],
        [-0.5, 0.5, 0.0],
    ]
    .iter()
    .flatten()
    .flat_map(|f| f.to_le_bytes())
    .collect();
    let indices: Vec<u8> = [0u16, 1, 2, 0, 2, 3]
        .iter()
        .flat_map(|i| i.to_le_bytes())
        .collect();
    let mut bin = positions;
    bin.extend_from_slice(&indices);

    let json = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "name": "Hero", "nodes": [0] }],
        "nodes": [
            { "name": "pivot", "children": [1], "scale": [2.0, 2.0, 2.0] },
            { "name": "quad", "mesh": 0 }
        ],
        "meshes": [{
            "name": "Quad",
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }]
        }],
        "buffers": [{ "byteLength": 60 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 48 },
            { "buffer": 0, "byteOffset": 48, "byteLength": 12 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3",
                "min": [-0.5, -0.5, 0.0], "max": [0.5, 0.5, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 6, "type": "SCALAR" }
        ]
    }"#;
    glb(json, &bin)
}

#[derive(Default)]
pub(crate) struct FrameCounter(pub(crate) u32);

impl FrameCounter {
    pub(crate) fn frame(&self) -> u32 {
        self.0
    }

    pub(crate) fn progress(&mut self) {
        self.0 += 1;
    }
}

#[cfg(feature = "integration-tests")]
pub(crate) type Validate = fn(
    &Context,
    &mut FrameCounter,
    &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
) -> Result<ImageTestResult, anyhow::Error>;

/// A flow that only configures the context and checks the rendered frame.
#[cfg(feature = "integration-tests")]
pub(crate) struct TestRender {
    pub(crate) setup: fn(&mut Context),
    pub(crate) validate: Validate,
}

#[cfg(feature = "integration-tests")]
impl GraphicsFlow<FrameCounter, ()> for TestRender {
    fn on_init(&mut self, _: &mut Context, _: &mut FrameCounter) -> Out<()> {
        let setup = self.setup;
        Out::Configure(Box::new(move |ctx| setup(ctx)))
    }

    fn on_update(
        &mut self,
        _: &Context,
        state: &mut FrameCounter,
        _: std::time::Duration,
    ) -> Out<()> {
        state.progress();
        Out::Empty
    }

    fn on_window_events(
        &mut self,
        _: &Context,
        _: &mut FrameCounter,
        _: &winit::event::WindowEvent,
    ) -> Out<()> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut FrameCounter, event: ()) -> Option<()> {
        Some(event)
    }

    fn on_render(&self) -> Render<'_> {
        Render::None
    }

    fn render_to_texture(
        &self,
        ctx: &Context,
        state: &mut FrameCounter,
        texture: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error> {
        (self.validate)(ctx, state, texture)
    }
}

#[macro_export]
macro_rules! golden_image_test {
    ($state:ty, $event:ty, $graphics_elem:expr) => {{
        use hero_glow::flow::GraphicsFlow;
        let g_flow: Box<dyn GraphicsFlow<$state, $event>> = Box::new($graphics_elem);
        hero_glow::flow::run(vec![g_flow]).expect("Failed to run flow for integration test.");
    }};
}
