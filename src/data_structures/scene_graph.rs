//! Scene graph and hierarchical scene organization.
//!
//! A [`SceneNode`] tree is what the loader produces: every node has a local
//! transform, zero or more mesh parts and children. A [`SceneObject`] wraps
//! such a tree with an animatable root [`Transform`] and is the unit that gets
//! added to the scene and uploaded to the GPU.

use std::sync::Arc;

use crate::data_structures::{
    instance::{Instance, Transform},
    material::Material,
    model::Geometry,
};

/// One drawable primitive of a node.
#[derive(Clone, Debug)]
pub struct MeshPart {
    pub name: String,
    pub geometry: Arc<Geometry>,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    /// Set whenever `material` changed and the GPU copy is stale.
    pub needs_update: bool,
}

impl MeshPart {
    pub fn new(name: impl Into<String>, geometry: Arc<Geometry>) -> Self {
        Self {
            name: name.into(),
            geometry,
            material: Material::default(),
            cast_shadow: false,
            receive_shadow: false,
            needs_update: true,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SceneNode {
    pub name: String,
    pub local: Instance,
    pub meshes: Vec<MeshPart>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    /// Visits every mesh part depth-first, parents before children.
    pub fn traverse_mut(&mut self, f: &mut dyn FnMut(&mut MeshPart)) {
        self.meshes.iter_mut().for_each(|part| f(part));
        for child in self.children.iter_mut() {
            child.traverse_mut(f);
        }
    }

    pub fn traverse(&self, f: &mut dyn FnMut(&MeshPart)) {
        self.meshes.iter().for_each(|part| f(part));
        for child in self.children.iter() {
            child.traverse(f);
        }
    }

    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        self.traverse(&mut |_| count += 1);
        count
    }

    /// Replaces the material of every mesh part and flags it for re-upload.
    pub fn apply_material(&mut self, material: Material) {
        self.traverse_mut(&mut |part| {
            part.material = material;
            part.needs_update = true;
        });
    }

    fn collect_world_parts<'a>(&'a self, parent: &Instance, out: &mut Vec<(&'a MeshPart, Instance)>) {
        let world = parent * &self.local;
        out.extend(self.meshes.iter().map(|part| (part, world)));
        for child in self.children.iter() {
            child.collect_world_parts(&world, out);
        }
    }
}

/// A root node with an animatable transform, as added to the scene.
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub root: SceneNode,
    pub transform: Transform,
}

impl SceneObject {
    pub fn new(root: SceneNode, transform: Transform) -> Self {
        Self { root, transform }
    }

    /// Every mesh part with its world transform, in traversal order.
    pub fn world_parts(&self) -> Vec<(&MeshPart, Instance)> {
        let mut out = Vec::with_capacity(self.root.mesh_count());
        self.root
            .collect_world_parts(&self.transform.to_instance(), &mut out);
        out
    }

    /// Clones the hierarchy into a halo around `self`.
    ///
    /// Geometry is shared with the original. The clone gets `material` on
    /// every part and a copy of the current transform with the scale
    /// multiplied by `scale_factor`. Later changes to `self` are not
    /// reflected in the clone.
    pub fn clone_as_halo(&self, material: Material, scale_factor: f32) -> SceneObject {
        let mut halo = self.clone();
        halo.root.apply_material(material);
        halo.root.traverse_mut(&mut |part| {
            part.cast_shadow = false;
            part.receive_shadow = false;
        });
        halo.transform.scale *= scale_factor;
        halo
    }
}

/// The append-only set of objects that get rendered.
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
}

impl Scene {
    /// Adds an object and returns its handle.
    pub fn add(&mut self, object: SceneObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn get(&self, handle: usize) -> Option<&SceneObject> {
        self.objects.get(handle)
    }

    pub fn get_mut(&mut self, handle: usize) -> Option<&mut SceneObject> {
        self.objects.get_mut(handle)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }
}
