use wgpu::util::DeviceExt;

use crate::data_structures::material::hex_to_linear;

/// The scene's fixed light rig: one ambient, one directional and one point light.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    /// Recorded only; no shadow pass is rendered.
    pub directional_casts_shadow: bool,
}

/// Uniforms require 16 byte spacing, hence every light is packed into vec4s.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    // rgb, intensity
    ambient: [f32; 4],
    // rgb, intensity
    directional_color: [f32; 4],
    // xyz, unused. The light shines from here towards the origin.
    directional_position: [f32; 4],
    // rgb, intensity
    point_color: [f32; 4],
    // xyz, cutoff distance (0 disables the cutoff)
    point_position: [f32; 4],
}

impl LightUniform {
    pub fn new(
        ambient: (u32, f32),
        directional: (u32, f32, [f32; 3]),
        point: (u32, f32, f32, [f32; 3]),
    ) -> Self {
        let rgb_i = |hex: u32, intensity: f32| {
            let [r, g, b] = hex_to_linear(hex);
            [r, g, b, intensity]
        };
        let (d_hex, d_intensity, d_pos) = directional;
        let (p_hex, p_intensity, p_distance, p_pos) = point;
        Self {
            ambient: rgb_i(ambient.0, ambient.1),
            directional_color: rgb_i(d_hex, d_intensity),
            directional_position: [d_pos[0], d_pos[1], d_pos[2], 0.0],
            point_color: rgb_i(p_hex, p_intensity),
            point_position: [p_pos[0], p_pos[1], p_pos[2], p_distance],
        }
    }

    /// White ambient at 0.5, a white key light and a white point light at
    /// (−5, −5, 7), both at intensity 2; the point light reaches 10 units.
    pub fn rig() -> Self {
        Self::new(
            (0xffffff, 0.5),
            (0xffffff, 2.0, [-5.0, -5.0, 7.0]),
            (0xffffff, 2.0, 10.0, [-5.0, -5.0, 7.0]),
        )
    }

    pub fn point_distance(&self) -> f32 {
        self.point_position[3]
    }
}

impl LightResources {
    pub fn new(uniform: LightUniform, device: &wgpu::Device) -> Self {
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
            directional_casts_shadow: true,
        }
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}
