//! Render composition and pipeline batching.
//!
//! Flows describe what they want drawn with a [`Render`]. The engine flattens
//! all renders of a frame and draws its meshes grouped by material pass:
//! opaque meshes with the basic pipelines, then additive meshes with the glow
//! pipelines.

use crate::{
    context::Context,
    data_structures::{
        material::Pass,
        model::{DrawModel, Model},
    },
};

/// An uploaded scene object ready to be drawn.
#[derive(Clone, Copy)]
pub struct Instanced<'a> {
    pub model: &'a Model,
}

impl<'a> Instanced<'a> {
    pub fn amount(&self) -> usize {
        self.model.meshes.len()
    }
}

/// Specifies how a flow should be rendered.
///
/// - `None` renders nothing
/// - `Defaults(Vec<Instanced>)` renders a batch of objects
pub enum Render<'a> {
    None,
    Defaults(Vec<Instanced<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn collect(self, out: &mut Vec<Instanced<'a>>) {
        match self {
            Render::None => (),
            Render::Defaults(mut vec) => out.append(&mut vec),
        }
    }
}

/// Draws every pass in [`Pass::DRAW_ORDER`], so additive meshes land on top.
pub(crate) fn draw_batches(ctx: &Context, render_pass: &mut wgpu::RenderPass<'_>, batch: &[Instanced<'_>]) {
    if batch.iter().any(|instanced| instanced.amount() == 0) {
        log::warn!("you attempted to render an object without mesh parts");
    }
    for pass in Pass::DRAW_ORDER {
        let mut bound = false;
        for instanced in batch {
            for (i, mesh) in instanced.model.meshes.iter().enumerate() {
                if mesh.pass != pass || mesh.num_elements == 0 {
                    continue;
                }
                if !bound {
                    render_pass.set_pipeline(ctx.pipelines.get(pass));
                    bound = true;
                }
                render_pass.set_vertex_buffer(1, instanced.model.instance_buffer.slice(..));
                let i = i as u32;
                render_pass.draw_mesh_instanced(
                    mesh,
                    i..i + 1,
                    &ctx.camera.bind_group,
                    &ctx.light.bind_group,
                );
            }
        }
    }
}
