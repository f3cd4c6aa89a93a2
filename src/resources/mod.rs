use std::{collections::HashMap, sync::Arc};

use anyhow::Context;

use crate::data_structures::{
    instance::Instance,
    model::Geometry,
    scene_graph::{MeshPart, SceneNode},
};

/**
 * This module contains all logic for loading model assets from external files.
 */
pub mod mesh;

/// Bytes received so far for an asset. `total` is unknown when the server
/// does not send a length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl LoadProgress {
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(100.0),
            Some(total) => Some(self.loaded as f64 / total as f64 * 100.0),
            None => None,
        }
    }
}

/// Logs progress the way the stage reports it.
pub fn log_progress(progress: LoadProgress) {
    match progress.percent() {
        Some(percent) => log::info!("{:.0}% loaded", percent),
        None => log::info!("{} bytes loaded", progress.loaded),
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("No browser window available")?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("Could not read page origin: {:?}", e))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

pub async fn load_binary(
    file_name: &str,
    on_progress: &mut dyn FnMut(LoadProgress),
) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        let response = reqwest::get(url).await?.error_for_status()?;
        let total = response.content_length();
        on_progress(LoadProgress { loaded: 0, total });
        response.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        let total = tokio::fs::metadata(&path).await.ok().map(|m| m.len());
        on_progress(LoadProgress { loaded: 0, total });
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Could not read {}", path.display()))?
    };

    let loaded = data.len() as u64;
    on_progress(LoadProgress {
        loaded,
        total: Some(loaded),
    });
    Ok(data)
}

/// Fetches and parses a `.glb`/`.gltf` asset into a node hierarchy.
///
/// External buffers are resolved next to the asset. The returned root is an
/// identity container holding the root nodes of the default scene.
pub async fn load_model_gltf(
    file_name: &str,
    on_progress: &mut dyn FnMut(LoadProgress),
) -> anyhow::Result<SceneNode> {
    let bytes = load_binary(file_name, on_progress)
        .await
        .with_context(|| format!("Failed to load model {}", file_name))?;
    let gltf = gltf::Gltf::from_slice(&bytes)
        .with_context(|| format!("{} is not a valid glTF asset", file_name))?;

    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => buffer_data.push(binary_chunk(&gltf)?),
            gltf::buffer::Source::Uri(uri) => {
                reject_data_uri(uri)?;
                let path = sibling_path(file_name, uri);
                let bin = load_binary(&path, &mut |_| ())
                    .await
                    .with_context(|| format!("Failed to load buffer {} of {}", uri, file_name))?;
                buffer_data.push(bin);
            }
        }
    }

    to_scene(&gltf, &buffer_data).with_context(|| format!("Failed to build scene from {}", file_name))
}

/// Parses a self-contained binary glTF held in memory.
pub fn load_model_from_slice(bytes: &[u8]) -> anyhow::Result<SceneNode> {
    let gltf = gltf::Gltf::from_slice(bytes)?;
    let buffer_data = gltf
        .buffers()
        .map(|buffer| match buffer.source() {
            gltf::buffer::Source::Bin => binary_chunk(&gltf),
            gltf::buffer::Source::Uri(uri) => {
                anyhow::bail!("Buffer {} points to external data {}", buffer.index(), uri)
            }
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    to_scene(&gltf, &buffer_data)
}

fn binary_chunk(gltf: &gltf::Gltf) -> anyhow::Result<Vec<u8>> {
    gltf.blob
        .clone()
        .context("Buffer refers to the binary chunk but the file has none")
}

fn reject_data_uri(uri: &str) -> anyhow::Result<()> {
    if uri.starts_with("data:") {
        anyhow::bail!("Embedded data URIs are not supported, export as .glb instead");
    }
    Ok(())
}

fn sibling_path(file_name: &str, uri: &str) -> String {
    match file_name.rsplit_once('/') {
        Some((dir, _)) => format!("{}/{}", dir, uri),
        None => uri.to_string(),
    }
}

fn to_scene(gltf: &gltf::Gltf, buffer_data: &[Vec<u8>]) -> anyhow::Result<SceneNode> {
    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .context("The asset contains no scene")?;

    let mut geometries = HashMap::new();
    let mut root = SceneNode::new(scene.name().unwrap_or("Scene"));
    for node in scene.nodes() {
        root.add_child(to_scene_node(node, buffer_data, &mut geometries)?);
    }
    log::debug!(
        "Loaded scene {:?} with {} mesh parts",
        root.name,
        root.mesh_count()
    );
    Ok(root)
}

/// Geometry is cached per (mesh, primitive) so meshes instanced by several
/// nodes share one allocation.
fn to_scene_node(
    node: gltf::Node<'_>,
    buffer_data: &[Vec<u8>],
    geometries: &mut HashMap<(usize, usize), Arc<Geometry>>,
) -> anyhow::Result<SceneNode> {
    let (translation, rotation, scale) = node.transform().decomposed();
    let mut scene_node = SceneNode::new(node.name().unwrap_or_default());
    scene_node.local = Instance {
        position: translation.into(),
        // glTF stores quaternions as [x, y, z, w]
        rotation: cgmath::Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    };

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping primitive {} of mesh {:?}: only triangle lists are rendered",
                    primitive.index(),
                    mesh.name()
                );
                continue;
            }
            let key = (mesh.index(), primitive.index());
            let geometry = match geometries.get(&key) {
                Some(geometry) => geometry.clone(),
                None => {
                    let geometry = Arc::new(mesh::read_primitive(&primitive, buffer_data)?);
                    geometries.insert(key, geometry.clone());
                    geometry
                }
            };
            let name = format!("{}_{}", mesh.name().unwrap_or("mesh"), primitive.index());
            scene_node.meshes.push(MeshPart::new(name, geometry));
        }
    }

    for child in node.children() {
        scene_node.add_child(to_scene_node(child, buffer_data, geometries)?);
    }
    Ok(scene_node)
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;

    /// Packs a JSON document and a binary chunk into a GLB container.
    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
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

    fn triangle_bytes() -> Vec<u8> {
        [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
            .iter()
            .flatten()
            .flat_map(|f| f.to_le_bytes())
            .collect()
    }

    const TRIANGLE_ACCESSORS: &str = r#"
        "buffers": [{ "byteLength": 36 }],
        "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
        }]
    "#;

    #[test]
    fn glb_without_normals_or_indices_is_completed() {
        let json = format!(
            r#"{{
                "asset": {{ "version": "2.0" }},
                "scene": 0,
                "scenes": [{{ "name": "Hero", "nodes": [0] }}],
                "nodes": [{{ "name": "tri", "mesh": 0, "translation": [1.0, 2.0, 3.0] }}],
                "meshes": [{{ "name": "Tri", "primitives": [{{ "attributes": {{ "POSITION": 0 }} }}] }}],
                {}
            }}"#,
            TRIANGLE_ACCESSORS
        );
        let root = load_model_from_slice(&glb(&json, &triangle_bytes())).expect("valid glb");

        assert_eq!(root.name, "Hero");
        assert_eq!(root.local, Instance::new());
        assert_eq!(root.children.len(), 1);

        let node = &root.children[0];
        assert_eq!(node.name, "tri");
        assert_eq!(node.local.position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(node.meshes.len(), 1);

        let geometry = &node.meshes[0].geometry;
        assert_eq!(geometry.indices, vec![0, 1, 2]);
        assert!(geometry.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert_eq!(node.meshes[0].name, "Tri_0");
    }

    #[test]
    fn mesh_used_by_two_nodes_shares_geometry() {
        let json = format!(
            r#"{{
                "asset": {{ "version": "2.0" }},
                "scenes": [{{ "nodes": [0] }}],
                "nodes": [
                    {{ "name": "parent", "mesh": 0, "children": [1] }},
                    {{ "name": "child", "mesh": 0, "rotation": [0.0, 0.0, 0.0, 1.0] }}
                ],
                "meshes": [{{ "primitives": [{{ "attributes": {{ "POSITION": 0 }} }}] }}],
                {}
            }}"#,
            TRIANGLE_ACCESSORS
        );
        let root = load_model_from_slice(&glb(&json, &triangle_bytes())).expect("valid glb");

        assert_eq!(root.mesh_count(), 2);
        let parent = &root.children[0];
        let child = &parent.children[0];
        assert!(Arc::ptr_eq(&parent.meshes[0].geometry, &child.meshes[0].geometry));
        assert_eq!(child.local.rotation, cgmath::Quaternion::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn asset_without_scene_is_rejected() {
        let json = r#"{ "asset": { "version": "2.0" } }"#;
        let err = load_model_from_slice(&glb(json, &[])).unwrap_err();
        assert!(err.to_string().contains("no scene"));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(load_model_from_slice(b"definitely not a model").is_err());
    }

    #[test]
    fn data_uris_are_refused() {
        assert!(reject_data_uri("data:application/octet-stream;base64,AAAA").is_err());
        assert!(reject_data_uri("model.bin").is_ok());
    }

    #[test]
    fn external_buffers_resolve_next_to_the_asset() {
        assert_eq!(sibling_path("models/hero.gltf", "hero.bin"), "models/hero.bin");
        assert_eq!(sibling_path("hero.gltf", "hero.bin"), "hero.bin");
    }

    #[test]
    fn progress_reports_percentages() {
        let half = LoadProgress {
            loaded: 50,
            total: Some(200),
        };
        assert_eq!(half.percent(), Some(25.0));
        let unknown = LoadProgress {
            loaded: 50,
            total: None,
        };
        assert_eq!(unknown.percent(), None);
        let empty = LoadProgress {
            loaded: 0,
            total: Some(0),
        };
        assert_eq!(empty.percent(), Some(100.0));
    }
}
