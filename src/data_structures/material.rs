//! Material descriptors and their GPU uniform representation.
//!
//! A [`Material`] is plain data attached to every mesh part. It selects the
//! pipeline a part is drawn with (opaque lit or additive glow) and fills the
//! per-part uniform buffer.

use wgpu::util::DeviceExt;

/// How a material is composited onto the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blending {
    Opaque,
    Additive,
}

/// Which faces of a mesh are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
}

impl Side {
    /// The faces the rasteriser discards to show this side.
    pub fn cull_mode(self) -> wgpu::Face {
        match self {
            Side::Front => wgpu::Face::Back,
            Side::Back => wgpu::Face::Front,
        }
    }
}

/// The pipeline variant a material is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pass {
    pub blending: Blending,
    pub side: Side,
}

impl Pass {
    /// Opaque passes come first, additive ones blend over them.
    pub const DRAW_ORDER: [Pass; 4] = [
        Pass { blending: Blending::Opaque, side: Side::Front },
        Pass { blending: Blending::Opaque, side: Side::Back },
        Pass { blending: Blending::Additive, side: Side::Front },
        Pass { blending: Blending::Additive, side: Side::Back },
    ];
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Linear RGB.
    pub color: [f32; 3],
    pub metalness: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub opacity: f32,
    pub blending: Blending,
    pub side: Side,
}

impl Material {
    /// White, non-metallic, slightly rough surface that glows white.
    pub fn standard() -> Self {
        Self {
            color: hex_to_linear(0xffffff),
            metalness: 0.0,
            roughness: 0.3,
            emissive: hex_to_linear(0xffffff),
            emissive_intensity: 1.5,
            opacity: 1.0,
            blending: Blending::Opaque,
            side: Side::Front,
        }
    }

    /// Translucent cyan shell that only shows its inner faces.
    pub fn glow() -> Self {
        Self {
            color: hex_to_linear(0x00aaff),
            metalness: 0.0,
            roughness: 1.0,
            emissive: [0.0; 3],
            emissive_intensity: 0.0,
            opacity: 0.5,
            blending: Blending::Additive,
            side: Side::Back,
        }
    }

    pub fn pass(&self) -> Pass {
        Pass {
            blending: self.blending,
            side: self.side,
        }
    }

    pub fn to_uniform(&self) -> MaterialUniform {
        MaterialUniform {
            color: [self.color[0], self.color[1], self.color[2], self.opacity],
            emissive: [
                self.emissive[0],
                self.emissive[1],
                self.emissive[2],
                self.emissive_intensity,
            ],
            params: [self.metalness, self.roughness, 0.0, 0.0],
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::standard()
    }
}

/// Converts a `0xRRGGBB` sRGB colour into linear RGB.
pub fn hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    // rgb + opacity
    color: [f32; 4],
    // rgb + intensity
    emissive: [f32; 4],
    // metalness, roughness, unused, unused
    params: [f32; 4],
}

pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("material_bind_group_layout"),
    })
}

/// The GPU side of a [`Material`]: a uniform buffer and its bind group.
#[derive(Debug)]
pub struct MaterialResources {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl MaterialResources {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, material: &Material) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material Buffer"),
            contents: bytemuck::cast_slice(&[material.to_uniform()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("material_bind_group"),
        });
        Self { buffer, bind_group }
    }

    pub fn write(&self, queue: &wgpu::Queue, material: &Material) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[material.to_uniform()]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_stays_white_in_linear_space() {
        hex_to_linear(0xffffff)
            .iter()
            .for_each(|c| assert!((c - 1.0).abs() < 1e-5, "{}", c));
        assert_eq!(hex_to_linear(0x000000), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn glow_is_translucent_additive_back_side() {
        let glow = Material::glow();
        assert_eq!(glow.opacity, 0.5);
        assert_eq!(glow.blending, Blending::Additive);
        assert_eq!(glow.color[0], 0.0);
        assert!(glow.color[2] > glow.color[1]);
    }

    #[test]
    fn side_decides_which_faces_are_culled() {
        let glow = Material::glow().pass();
        assert_eq!(glow.side.cull_mode(), wgpu::Face::Front);
        assert_eq!(Material::standard().pass().side.cull_mode(), wgpu::Face::Back);

        let inner_shell = Material {
            side: Side::Back,
            ..Material::standard()
        };
        assert_eq!(
            inner_shell.pass(),
            Pass { blending: Blending::Opaque, side: Side::Back }
        );
    }

    #[test]
    fn additive_passes_are_drawn_last() {
        let first_additive = Pass::DRAW_ORDER
            .iter()
            .position(|pass| pass.blending == Blending::Additive)
            .expect("an additive pass");
        assert!(Pass::DRAW_ORDER[..first_additive]
            .iter()
            .all(|pass| pass.blending == Blending::Opaque));
        assert!(Pass::DRAW_ORDER.contains(&Material::glow().pass()));
        assert!(Pass::DRAW_ORDER.contains(&Material::standard().pass()));
    }

    #[test]
    fn uniform_packs_opacity_and_roughness() {
        let uniform = Material::standard().to_uniform();
        assert_eq!(uniform.color[3], 1.0);
        assert_eq!(uniform.params[0], 0.0);
        assert_eq!(uniform.params[1], 0.3);
        assert_eq!(uniform.emissive[3], 1.5);
    }
}
