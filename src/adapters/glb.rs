//! Binary glTF 2.0 (GLB) writer.

use crate::domain::model::{Mesh, Scene};
use crate::domain::ports::Storage;
use crate::utils::error::{HostError, HostResult};
use glam::{Quat, Vec3};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const TRIANGLES: u32 = 4;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub generator: String,
    pub copyright: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    asset: Asset,
    scene: usize,
    scenes: Vec<SceneDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<NodeDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    meshes: Vec<MeshDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    materials: Vec<MaterialDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    accessors: Vec<Accessor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    buffer_views: Vec<BufferView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    buffers: Vec<Buffer>,
}

#[derive(Serialize)]
struct Asset {
    version: &'static str,
    generator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    copyright: Option<String>,
}

#[derive(Serialize)]
struct SceneDef {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<usize>,
}

#[derive(Serialize)]
struct NodeDef {
    #[serde(skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mesh: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    translation: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rotation: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<[f32; 3]>,
}

#[derive(Serialize)]
struct MeshDef {
    #[serde(skip_serializing_if = "String::is_empty")]
    name: String,
    primitives: Vec<Primitive>,
}

#[derive(Serialize)]
struct Primitive {
    attributes: BTreeMap<&'static str, usize>,
    indices: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    material: Option<usize>,
    mode: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MaterialDef {
    #[serde(skip_serializing_if = "String::is_empty")]
    name: String,
    pbr_metallic_roughness: PbrMetallicRoughness,
    #[serde(skip_serializing_if = "Option::is_none")]
    alpha_mode: Option<&'static str>,
    double_sided: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PbrMetallicRoughness {
    base_color_factor: [f32; 4],
    metallic_factor: f32,
    roughness_factor: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Accessor {
    buffer_view: usize,
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<Vec<f32>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BufferView {
    buffer: usize,
    byte_offset: usize,
    byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Buffer {
    byte_length: usize,
}

/// 二進位區塊與其 bufferView / accessor
#[derive(Default)]
struct BinaryBuilder {
    data: Vec<u8>,
    views: Vec<BufferView>,
    accessors: Vec<Accessor>,
}

impl BinaryBuilder {
    fn push_view(&mut self, bytes: Vec<u8>, target: u32) -> usize {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
        self.views.push(BufferView {
            buffer: 0,
            byte_offset: self.data.len(),
            byte_length: bytes.len(),
            target: Some(target),
        });
        self.data.extend_from_slice(&bytes);
        self.views.len() - 1
    }

    fn push_accessor(&mut self, accessor: Accessor) -> usize {
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    fn push_floats<const N: usize>(&mut self, values: &[[f32; N]], kind: &'static str) -> usize {
        let bytes = values.iter().flatten().flat_map(|v| v.to_le_bytes()).collect();
        let view = self.push_view(bytes, ARRAY_BUFFER);
        self.push_accessor(Accessor {
            buffer_view: view,
            component_type: FLOAT,
            count: values.len(),
            kind,
            min: None,
            max: None,
        })
    }

    fn push_mesh(&mut self, mesh: &Mesh, material: Option<usize>) -> MeshDef {
        let mut attributes = BTreeMap::new();

        let position = self.push_floats(&mesh.positions, "VEC3");
        if let Some((min, max)) = mesh.bounds() {
            self.accessors[position].min = Some(min.to_vec());
            self.accessors[position].max = Some(max.to_vec());
        }
        attributes.insert("POSITION", position);

        if mesh.normals.len() == mesh.positions.len() {
            attributes.insert("NORMAL", self.push_floats(&mesh.normals, "VEC3"));
        }
        if mesh.texcoords.len() == mesh.positions.len() {
            attributes.insert("TEXCOORD_0", self.push_floats(&mesh.texcoords, "VEC2"));
        }

        let index_bytes = mesh.indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        let index_view = self.push_view(index_bytes, ELEMENT_ARRAY_BUFFER);
        let indices = self.push_accessor(Accessor {
            buffer_view: index_view,
            component_type: UNSIGNED_INT,
            count: mesh.indices.len(),
            kind: "SCALAR",
            min: None,
            max: None,
        });

        MeshDef {
            name: mesh.name.clone(),
            primitives: vec![Primitive {
                attributes,
                indices,
                material,
                mode: TRIANGLES,
            }],
        }
    }
}

fn build_document(scene: &Scene, options: &ExportOptions) -> (Document, Vec<u8>) {
    let mut binary = BinaryBuilder::default();

    // 沒有三角形的網格不輸出，對應的節點也不掛網格
    let mut mesh_slots = Vec::with_capacity(scene.meshes.len());
    let mut meshes = Vec::new();
    for mesh in &scene.meshes {
        if mesh.is_empty() {
            mesh_slots.push(None);
            continue;
        }
        let material = mesh.material.filter(|m| *m < scene.materials.len());
        meshes.push(binary.push_mesh(mesh, material));
        mesh_slots.push(Some(meshes.len() - 1));
    }

    let materials = scene
        .materials
        .iter()
        .map(|material| MaterialDef {
            name: material.name.clone(),
            pbr_metallic_roughness: PbrMetallicRoughness {
                base_color_factor: material.base_color,
                metallic_factor: 0.0,
                roughness_factor: 0.5,
            },
            alpha_mode: (material.base_color[3] < 1.0).then_some("BLEND"),
            double_sided: true,
        })
        .collect();

    let nodes = scene
        .nodes
        .iter()
        .map(|node| NodeDef {
            name: node.name.clone(),
            mesh: node.mesh.and_then(|m| mesh_slots.get(m).copied().flatten()),
            children: node.children.clone(),
            translation: (node.translation != Vec3::ZERO).then(|| node.translation.to_array()),
            rotation: (node.rotation != Quat::IDENTITY).then(|| node.rotation.to_array()),
            scale: (node.scale != Vec3::ONE).then(|| node.scale.to_array()),
        })
        .collect();

    let BinaryBuilder {
        mut data,
        views,
        accessors,
    } = binary;
    while data.len() % 4 != 0 {
        data.push(0);
    }
    let buffers = if data.is_empty() {
        Vec::new()
    } else {
        vec![Buffer {
            byte_length: data.len(),
        }]
    };

    let document = Document {
        asset: Asset {
            version: "2.0",
            generator: options.generator.clone(),
            copyright: options.copyright.clone(),
        },
        scene: 0,
        scenes: vec![SceneDef {
            nodes: scene.roots.clone(),
        }],
        nodes,
        meshes,
        materials,
        accessors,
        buffer_views: views,
        buffers,
    };

    (document, data)
}

/// GLB 的長度欄位只有 32 位元
fn length_field(what: &str, len: usize) -> HostResult<[u8; 4]> {
    u32::try_from(len)
        .map(u32::to_le_bytes)
        .map_err(|_| {
            HostError::glb(format!("{} of {} bytes exceeds the 4 GiB GLB limit", what, len))
        })
}

/// 將場景編碼成 GLB 位元組
pub fn encode(scene: &Scene, options: &ExportOptions) -> HostResult<Vec<u8>> {
    let (document, bin) = build_document(scene, options);

    let mut json = serde_json::to_vec(&document)?;
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let mut total = 12 + 8 + json.len();
    if !bin.is_empty() {
        total += 8 + bin.len();
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(GLB_MAGIC);
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&length_field("file", total)?);

    out.extend_from_slice(&length_field("JSON chunk", json.len())?);
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json);

    if !bin.is_empty() {
        out.extend_from_slice(&length_field("BIN chunk", bin.len())?);
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&bin);
    }

    Ok(out)
}

pub fn write<S: Storage>(
    storage: &S,
    scene: &Scene,
    path: &Path,
    options: &ExportOptions,
) -> HostResult<u64> {
    let bytes = encode(scene, options)?;
    storage.write_file(path, &bytes)?;
    Ok(bytes.len() as u64)
}
