//! Transform data for scene nodes and GPU instances.
//!
//! Scene nodes carry a quaternion-based [`Instance`] (as decomposed from glTF)
//! while animated objects are driven through a [`Transform`] whose rotation is
//! kept as Euler angles so that each axis can be tweened on its own.

use std::ops::Mul;

use cgmath::{One, Rad, Rotation3};

use crate::data_structures::model;

/// Per-node transformation: position, rotation (as quaternion), and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.to_matrix().into(),
            normal: cgmath::Matrix3::from(self.rotation).into(),
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    /// Composes `rhs` (a child's local transform) into `self` (the parent's world transform).
    fn mul(self, rhs: &'b Instance) -> Self::Output {
        let new_rotation = self.rotation * rhs.rotation;

        let new_scale = cgmath::Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = cgmath::Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let new_position = self.position + (self.rotation * scaled_rhs_pos);

        Instance {
            position: new_position,
            rotation: new_rotation,
            scale: new_scale,
        }
    }
}

impl Mul<Instance> for Instance {
    type Output = Self;

    fn mul(self, rhs: Instance) -> Self::Output {
        &self * &rhs
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

/// The root transform of an animated object.
///
/// `rotation` holds Euler angles in radians, applied in XYZ order
/// (`R = Rx * Ry * Rz`). Angles are neither wrapped nor normalised.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Vector3<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Transform {
    pub fn new(
        position: cgmath::Vector3<f32>,
        rotation: cgmath::Vector3<f32>,
        scale: cgmath::Vector3<f32>,
    ) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn quaternion(&self) -> cgmath::Quaternion<f32> {
        cgmath::Quaternion::from_angle_x(Rad(self.rotation.x))
            * cgmath::Quaternion::from_angle_y(Rad(self.rotation.y))
            * cgmath::Quaternion::from_angle_z(Rad(self.rotation.z))
    }

    pub fn to_instance(&self) -> Instance {
        Instance {
            position: self.position,
            rotation: self.quaternion(),
            scale: self.scale,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Vector3::new(0.0, 0.0, 0.0),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// Converts degrees to radians for each component.
pub fn degrees(x: f32, y: f32, z: f32) -> cgmath::Vector3<f32> {
    cgmath::Vector3::new(x.to_radians(), y.to_radians(), z.to_radians())
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

/**
 * As we store vertex data directly in the GPU memory we need to tell what the bytes refer to:
 *
 * offset: zero as we want to use the full space.
 * stride: length of an instance
 *
 * Stride layout here: the model matrix as four 4d vectors followed by the
 * normal matrix as three 3d vectors.
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Shaders only advance to the next instance when a new instance starts
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // A mat4 takes up 4 vertex slots as it is technically 4 vec4s.
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Rotation, Vector3};

    use super::*;

    #[test]
    fn child_inherits_parent_scale_and_offset() {
        let parent = Instance {
            position: Vector3::new(1.0, 0.0, 0.0),
            scale: Vector3::new(2.0, 2.0, 2.0),
            ..Default::default()
        };
        let child = Instance::from(Vector3::new(0.0, 1.0, 0.0));

        let world = &parent * &child;

        assert_eq!(world.position, Vector3::new(1.0, 2.0, 0.0));
        assert_eq!(world.scale, Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn euler_rotation_applies_z_first() {
        let transform = Transform {
            rotation: degrees(90.0, 0.0, 90.0),
            ..Default::default()
        };
        // Rz turns +X into +Y, then Rx turns +Y into +Z.
        let rotated = transform.quaternion().rotate_vector(Vector3::unit_x());
        assert!((rotated - Vector3::unit_z()).magnitude() < 1e-5, "{:?}", rotated);
    }

    #[test]
    fn degrees_converts_each_axis() {
        let rad = degrees(180.0, -90.0, 0.0);
        assert!((rad.x - std::f32::consts::PI).abs() < 1e-6);
        assert!((rad.y + std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(rad.z, 0.0);
    }
}
