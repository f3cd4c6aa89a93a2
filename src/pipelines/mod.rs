//! Render pipelines.
//!
//! - `basic` is the opaque, lit pipeline for standard materials
//! - `glow` is the additive halo pipeline
//! - `light` holds the light rig uniform and its bind group
//!
//! Both material pipelines exist once per [`Side`], which picks the culled faces.

use crate::data_structures::material::{Blending, Pass, Side};

pub mod basic;
pub mod glow;
pub mod light;

#[derive(Debug)]
pub struct Pipelines {
    basic: [wgpu::RenderPipeline; 2],
    glow: [wgpu::RenderPipeline; 2],
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        sample_count: u32,
        material_bind_group_layout: &wgpu::BindGroupLayout,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let layouts = [
            material_bind_group_layout,
            camera_bind_group_layout,
            light_bind_group_layout,
        ];
        let basic = |side| basic::mk_basic_pipeline(device, config, sample_count, &layouts, side);
        let glow = |side| glow::mk_glow_pipeline(device, config, sample_count, &layouts, side);
        Self {
            basic: [basic(Side::Front), basic(Side::Back)],
            glow: [glow(Side::Front), glow(Side::Back)],
        }
    }

    pub fn get(&self, pass: Pass) -> &wgpu::RenderPipeline {
        let side = match pass.side {
            Side::Front => 0,
            Side::Back => 1,
        };
        match pass.blending {
            Blending::Opaque => &self.basic[side],
            Blending::Additive => &self.glow[side],
        }
    }
}
