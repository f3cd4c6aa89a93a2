use crate::{
    data_structures::{
        instance::InstanceRaw,
        material::Side,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::basic::mk_render_pipeline,
};

/// Fragments are weighted by their alpha and summed onto the frame.
pub const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/**
 * Pipeline for additive halo materials.
 *
 * With `Side::Back` only back faces are drawn so the halo shows around the
 * silhouette of the object it wraps. Depth is tested but never written which
 * keeps overlapping halo faces from hiding each other.
 */
pub fn mk_glow_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    side: Side,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Glow Pipeline Layout"),
        bind_group_layouts,
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Glow Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("glow.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        config.format,
        Some(ADDITIVE_BLENDING),
        Some(side.cull_mode()),
        false,
        sample_count,
        Some(Texture::DEPTH_FORMAT),
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}
