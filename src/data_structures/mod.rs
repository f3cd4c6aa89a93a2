//! Engine data structures: transforms, materials, geometry and the scene graph.
//!
//! - `instance` holds node transforms and their GPU instance layout
//! - `material` contains material descriptors and their uniform buffers
//! - `model` contains geometry and GPU resources for uploaded scene objects
//! - `scene_graph` enables hierarchical scene organization
//! - `texture` contains the depth and multisample render targets

pub mod instance;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
