//! Geometry and GPU model resources.
//!
//! [`Geometry`] is the CPU copy of a mesh primitive produced by the loader and
//! shared (via `Arc`) between a model and its clones. [`Model`] is the GPU
//! mirror of one [`SceneObject`]: a vertex/index buffer and material uniform per
//! mesh part, plus one instance buffer holding each part's world transform.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::data_structures::{
    instance::InstanceRaw,
    material::{MaterialResources, Pass},
    scene_graph::SceneObject,
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Triangle-list geometry kept on the CPU.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: MaterialResources,
    pub pass: Pass,
}

#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    /// One instance per mesh, in the same order as `meshes`.
    pub instance_buffer: wgpu::Buffer,
}

impl Model {
    /// Uploads every mesh part of `object` in traversal order.
    pub fn from_object(
        device: &wgpu::Device,
        material_layout: &wgpu::BindGroupLayout,
        object: &SceneObject,
    ) -> Self {
        let parts = object.world_parts();
        let meshes = parts
            .iter()
            .map(|(part, _)| {
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Vertex Buffer", part.name)),
                    contents: bytemuck::cast_slice(&part.geometry.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Index Buffer", part.name)),
                    contents: bytemuck::cast_slice(&part.geometry.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                Mesh {
                    name: part.name.clone(),
                    vertex_buffer,
                    index_buffer,
                    num_elements: part.geometry.indices.len() as u32,
                    material: MaterialResources::new(device, material_layout, &part.material),
                    pass: part.material.pass(),
                }
            })
            .collect();

        let instance_data = parts
            .iter()
            .map(|(_, world)| world.to_raw())
            .collect::<Vec<_>>();
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(&instance_data),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            meshes,
            instance_buffer,
        }
    }

    /// Pushes the object's current world transforms and any flagged material
    /// changes to the GPU.
    pub fn write_to_buffers(&mut self, queue: &wgpu::Queue, object: &mut SceneObject) {
        let raw_instances: Vec<InstanceRaw> = object
            .world_parts()
            .iter()
            .map(|(_, world)| world.to_raw())
            .collect();
        if raw_instances.len() != self.meshes.len() {
            log::warn!(
                "Scene object has {} mesh parts but {} were uploaded; skipping buffer write.",
                raw_instances.len(),
                self.meshes.len()
            );
            return;
        }
        queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&raw_instances),
        );

        let mut idx = 0;
        let meshes = &mut self.meshes;
        object.root.traverse_mut(&mut |part| {
            if part.needs_update {
                if let Some(mesh) = meshes.get_mut(idx) {
                    mesh.material.write(queue, &part.material);
                    mesh.pass = part.material.pass();
                }
                part.needs_update = false;
            }
            idx += 1;
        });
    }
}

pub trait DrawModel {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &Mesh,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    );
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &Mesh,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &mesh.material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}
