//! FBX importer: geometry, model hierarchy, materials and global axis settings.

pub mod reader;

use crate::domain::model::{Material, Mesh, Node, Scene};
use crate::domain::ports::Storage;
use crate::utils::error::{HostError, HostResult};
use fbxcel_dom::fbxcel::tree::v7400::NodeHandle;
use fbxcel_dom::v7400::Document;
use glam::{Mat4, Quat, Vec3};
use reader::{
    as_f64, as_i64, as_str, attribute, child, children_named, property70, to_f64_vec, to_i64_vec,
};
use std::collections::HashMap;
use std::path::Path;

pub fn import<S: Storage>(
    storage: &S,
    scene: &mut Scene,
    path: &Path,
    global_scale: f32,
) -> HostResult<()> {
    let data = storage.read_file(path)?;
    import_bytes(&data, scene, global_scale)
}

pub(crate) fn import_bytes(data: &[u8], scene: &mut Scene, global_scale: f32) -> HostResult<()> {
    let document = reader::load(data)?;
    import_document(&document, scene, global_scale)
}

pub(crate) fn import_document(
    document: &Document,
    scene: &mut Scene,
    global_scale: f32,
) -> HostResult<()> {
    let root = document.tree().root();
    let objects =
        child(root, "Objects").ok_or_else(|| HostError::fbx("missing Objects section"))?;
    let settings = GlobalSettings::from_root(root);

    let mut materials = HashMap::new();
    for node in children_named(objects, "Material") {
        let id = object_id(node)?;
        materials.insert(id, scene.add_material(read_material(node)));
    }

    let mut pending_geometry = HashMap::new();
    for node in children_named(objects, "Geometry") {
        if attribute(node, 2).and_then(as_str) != Some("Mesh") {
            continue;
        }
        let id = object_id(node)?;
        pending_geometry.insert(id, read_geometry(node, &object_name(node))?);
    }

    // 保持檔案中的順序，輸出才會穩定
    let mut models = Vec::new();
    let mut model_nodes = HashMap::new();
    for node in children_named(objects, "Model") {
        let id = object_id(node)?;
        let index = scene.add_node(read_model(node));
        models.push((id, index));
        model_nodes.insert(id, index);
    }

    let mut geometry_meshes: HashMap<i64, usize> = HashMap::new();
    let mut model_materials: HashMap<usize, usize> = HashMap::new();
    // 子節點索引 -> 父節點索引
    let mut parents: HashMap<usize, usize> = HashMap::new();

    for (child_id, parent_id) in object_links(root) {
        let Some(&parent_node) = model_nodes.get(&parent_id) else {
            continue;
        };

        if let Some(&child_node) = model_nodes.get(&child_id) {
            link_models(scene, &mut parents, child_node, parent_node)?;
        } else if let Some(&material) = materials.get(&child_id) {
            model_materials.entry(parent_node).or_insert(material);
        } else {
            // 同一個 Geometry 可被多個 Model 共用
            let mesh_index = if let Some(&index) = geometry_meshes.get(&child_id) {
                Some(index)
            } else if let Some(mesh) = pending_geometry.remove(&child_id) {
                let index = scene.add_mesh(mesh);
                geometry_meshes.insert(child_id, index);
                Some(index)
            } else {
                None
            };
            let node = &mut scene.nodes[parent_node];
            if node.mesh.is_none() {
                node.mesh = mesh_index;
            }
        }
    }

    if !pending_geometry.is_empty() {
        tracing::debug!("Ignoring {} FBX geometries without a model", pending_geometry.len());
    }

    for (node, material) in model_materials {
        if let Some(mesh) = scene.nodes[node].mesh {
            let mesh = &mut scene.meshes[mesh];
            if mesh.material.is_none() {
                mesh.material = Some(material);
            }
        }
    }

    let conversion = settings.root_conversion(global_scale);
    for (_, index) in models {
        if parents.contains_key(&index) {
            continue;
        }
        let node = &mut scene.nodes[index];
        let matrix = conversion * node.matrix();
        node.set_matrix(matrix);
        scene.roots.push(index);
    }

    Ok(())
}

/// 建立 model 之間的父子關係；glTF 節點只能有一個父節點且不能成環
fn link_models(
    scene: &mut Scene,
    parents: &mut HashMap<usize, usize>,
    child: usize,
    parent: usize,
) -> HostResult<()> {
    if child == parent {
        tracing::warn!("⚠️ Ignoring FBX model '{}' linked to itself", scene.nodes[child].name);
        return Ok(());
    }
    if parents.contains_key(&child) {
        tracing::warn!(
            "⚠️ FBX model '{}' has more than one parent, keeping the first",
            scene.nodes[child].name
        );
        return Ok(());
    }

    let mut ancestor = Some(parent);
    while let Some(current) = ancestor {
        if current == child {
            return Err(HostError::fbx(format!(
                "model hierarchy contains a cycle through '{}'",
                scene.nodes[child].name
            )));
        }
        ancestor = parents.get(&current).copied();
    }

    parents.insert(child, parent);
    scene.nodes[parent].children.push(child);
    Ok(())
}

/// `Connections` 中的 OO 連結 (child, parent)；parent 為 0 代表場景根
fn object_links(root: NodeHandle<'_>) -> Vec<(i64, i64)> {
    let Some(connections) = child(root, "Connections") else {
        return Vec::new();
    };

    children_named(connections, "C")
        .filter(|c| attribute(*c, 0).and_then(as_str) == Some("OO"))
        .filter_map(|c| {
            let child = as_i64(attribute(c, 1)?)?;
            let parent = as_i64(attribute(c, 2)?)?;
            Some((child, parent))
        })
        .collect()
}

fn object_id(node: NodeHandle<'_>) -> HostResult<i64> {
    attribute(node, 0)
        .and_then(as_i64)
        .ok_or_else(|| HostError::fbx(format!("{} object without an id", node.name())))
}

/// 二進位 FBX 的名稱格式為 "Name\0\x01Class"
fn object_name(node: NodeHandle<'_>) -> String {
    attribute(node, 1)
        .and_then(as_str)
        .and_then(|s| s.split('\0').next())
        .unwrap_or_default()
        .to_string()
}

fn p_vec3(node: NodeHandle<'_>, name: &str) -> Option<Vec3> {
    let p = property70(node, name)?;
    let x = as_f64(attribute(p, 4)?)?;
    let y = as_f64(attribute(p, 5)?)?;
    let z = as_f64(attribute(p, 6)?)?;
    Some(Vec3::new(x as f32, y as f32, z as f32))
}

fn p_number(node: NodeHandle<'_>, name: &str) -> Option<f64> {
    as_f64(attribute(property70(node, name)?, 4)?)
}

fn read_model(node: NodeHandle<'_>) -> Node {
    let mut model = Node::new(object_name(node));

    if let Some(translation) = p_vec3(node, "Lcl Translation") {
        model.translation = translation;
    }
    if let Some(degrees) = p_vec3(node, "Lcl Rotation") {
        let order = p_number(node, "RotationOrder").unwrap_or(0.0) as i64;
        model.rotation = euler_to_quat(degrees, order);
    }
    if let Some(scale) = p_vec3(node, "Lcl Scaling") {
        model.scale = scale;
    }

    model
}

/// FBX 的 Euler 順序：eXYZ 表示先繞 X 再繞 Y 最後繞 Z
fn euler_to_quat(degrees: Vec3, order: i64) -> Quat {
    let x = Quat::from_rotation_x(degrees.x.to_radians());
    let y = Quat::from_rotation_y(degrees.y.to_radians());
    let z = Quat::from_rotation_z(degrees.z.to_radians());
    let q = match order {
        1 => y * z * x,
        2 => x * z * y,
        3 => z * x * y,
        4 => y * x * z,
        5 => x * y * z,
        _ => z * y * x,
    };
    q.normalize()
}

fn read_material(node: NodeHandle<'_>) -> Material {
    let diffuse = p_vec3(node, "DiffuseColor")
        .or_else(|| p_vec3(node, "Diffuse"))
        .unwrap_or(Vec3::splat(0.8));
    let alpha = p_number(node, "Opacity").unwrap_or(1.0).clamp(0.0, 1.0) as f32;
    Material::new(object_name(node), [diffuse.x, diffuse.y, diffuse.z, alpha])
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mapping {
    ByPolygonVertex,
    ByControlPoint,
    ByPolygon,
    AllSame,
}

/// `LayerElementNormal` / `LayerElementUV` 的資料與對應方式
struct LayerElement {
    mapping: Mapping,
    direct: Vec<f64>,
    index: Option<Vec<i64>>,
    width: usize,
}

impl LayerElement {
    fn read(
        geometry: NodeHandle<'_>,
        layer: &str,
        data: &str,
        index: &str,
        width: usize,
    ) -> Option<Self> {
        let element = child(geometry, layer)?;
        let text = |name: &str| {
            child(element, name)
                .and_then(|n| attribute(n, 0))
                .and_then(as_str)
                .unwrap_or_default()
                .to_string()
        };

        let mapping = match text("MappingInformationType").as_str() {
            "ByPolygonVertex" => Mapping::ByPolygonVertex,
            "ByVertice" | "ByVertex" | "ByControlPoint" => Mapping::ByControlPoint,
            "ByPolygon" => Mapping::ByPolygon,
            "AllSame" => Mapping::AllSame,
            other => {
                tracing::warn!("⚠️ Unsupported {} mapping '{}', layer ignored", layer, other);
                return None;
            }
        };

        let direct = to_f64_vec(attribute(child(element, data)?, 0)?)?;
        let index = match text("ReferenceInformationType").as_str() {
            "IndexToDirect" | "Index" => child(element, index)
                .and_then(|n| attribute(n, 0))
                .and_then(to_i64_vec),
            _ => None,
        };

        Some(Self {
            mapping,
            direct,
            index,
            width,
        })
    }

    fn value(&self, polygon_vertex: usize, control_point: usize, polygon: usize) -> Option<&[f64]> {
        let key = match self.mapping {
            Mapping::ByPolygonVertex => polygon_vertex,
            Mapping::ByControlPoint => control_point,
            Mapping::ByPolygon => polygon,
            Mapping::AllSame => 0,
        };
        let slot = match &self.index {
            Some(index) => usize::try_from(*index.get(key)?).ok()?,
            None => key,
        };
        self.direct.get(slot * self.width..(slot + 1) * self.width)
    }
}

fn read_geometry(node: NodeHandle<'_>, name: &str) -> HostResult<Mesh> {
    let vertices = child(node, "Vertices")
        .and_then(|n| attribute(n, 0))
        .and_then(to_f64_vec)
        .ok_or_else(|| HostError::fbx(format!("geometry '{}' has no Vertices", name)))?;
    let polygon_vertex_index = child(node, "PolygonVertexIndex")
        .and_then(|n| attribute(n, 0))
        .and_then(to_i64_vec)
        .ok_or_else(|| HostError::fbx(format!("geometry '{}' has no PolygonVertexIndex", name)))?;

    if vertices.len() % 3 != 0 {
        return Err(HostError::fbx(format!(
            "geometry '{}' has {} vertex components, not a multiple of 3",
            name,
            vertices.len()
        )));
    }
    let control_points = vertices.len() / 3;

    let normals = LayerElement::read(node, "LayerElementNormal", "Normals", "NormalsIndex", 3);
    let uvs = LayerElement::read(node, "LayerElementUV", "UV", "UVIndex", 2);

    let mut builder = PolygonBuilder {
        mesh: Mesh::new(name),
        vertices: &vertices,
        normals: normals.as_ref(),
        uvs: uvs.as_ref(),
        missing_attributes: 0,
    };

    let mut polygon = Vec::new();
    let mut polygon_count = 0;
    for (polygon_vertex, &raw) in polygon_vertex_index.iter().enumerate() {
        // 負值標記多邊形的最後一個頂點，實際索引為 -raw - 1
        let (control_point, last) = if raw < 0 { (!raw, true) } else { (raw, false) };
        let control_point = control_point as usize;
        if control_point >= control_points {
            return Err(HostError::fbx(format!(
                "geometry '{}' references control point {} of {}",
                name, control_point, control_points
            )));
        }

        polygon.push((polygon_vertex, control_point));
        if last {
            builder.push_polygon(&polygon, polygon_count);
            polygon.clear();
            polygon_count += 1;
        }
    }
    if !polygon.is_empty() {
        builder.push_polygon(&polygon, polygon_count);
    }

    if builder.missing_attributes > 0 {
        tracing::warn!(
            "⚠️ Geometry '{}': {} vertices without normal/UV data",
            name,
            builder.missing_attributes
        );
    }

    let mut mesh = builder.mesh;
    mesh.ensure_normals();
    Ok(mesh)
}

struct PolygonBuilder<'a> {
    mesh: Mesh,
    vertices: &'a [f64],
    normals: Option<&'a LayerElement>,
    uvs: Option<&'a LayerElement>,
    missing_attributes: usize,
}

impl PolygonBuilder<'_> {
    /// 以扇形三角化一個多邊形，頂點不共用
    fn push_polygon(&mut self, polygon: &[(usize, usize)], polygon_index: usize) {
        if polygon.len() < 3 {
            return;
        }

        let base = self.mesh.positions.len() as u32;
        for &(polygon_vertex, control_point) in polygon {
            let p = &self.vertices[control_point * 3..control_point * 3 + 3];
            self.mesh.positions.push([p[0] as f32, p[1] as f32, p[2] as f32]);

            if let Some(normals) = self.normals {
                let n = normals
                    .value(polygon_vertex, control_point, polygon_index)
                    .and_then(|n| Vec3::new(n[0] as f32, n[1] as f32, n[2] as f32).try_normalize());
                let n = n.unwrap_or_else(|| {
                    self.missing_attributes += 1;
                    Vec3::Y
                });
                self.mesh.normals.push(n.to_array());
            }

            if let Some(uvs) = self.uvs {
                let uv = match uvs.value(polygon_vertex, control_point, polygon_index) {
                    Some(uv) => [uv[0] as f32, 1.0 - uv[1] as f32],
                    None => {
                        self.missing_attributes += 1;
                        [0.0, 0.0]
                    }
                };
                self.mesh.texcoords.push(uv);
            }
        }

        for i in 1..polygon.len() as u32 - 1 {
            self.mesh.indices.extend_from_slice(&[base, base + i, base + i + 1]);
        }
    }
}

struct GlobalSettings {
    up_axis: i64,
    up_axis_sign: i64,
    unit_scale_factor: f64,
}

impl GlobalSettings {
    fn from_root(root: NodeHandle<'_>) -> Self {
        let settings = child(root, "GlobalSettings");
        let number = |name: &str| settings.and_then(|s| p_number(s, name));

        Self {
            up_axis: number("UpAxis").map_or(1, |v| v as i64),
            up_axis_sign: number("UpAxisSign").map_or(1, |v| v as i64),
            unit_scale_factor: number("UnitScaleFactor").unwrap_or(1.0),
        }
    }

    /// 轉成 Y 軸朝上、以公尺為單位（FBX 預設為公分）
    fn root_conversion(&self, global_scale: f32) -> Mat4 {
        use std::f32::consts::{FRAC_PI_2, PI};

        let positive = self.up_axis_sign >= 0;
        let rotation = match (self.up_axis, positive) {
            (0, true) => Quat::from_rotation_z(FRAC_PI_2),
            (0, false) => Quat::from_rotation_z(-FRAC_PI_2),
            (2, true) => Quat::from_rotation_x(-FRAC_PI_2),
            (2, false) => Quat::from_rotation_x(FRAC_PI_2),
            (_, true) => Quat::IDENTITY,
            (_, false) => Quat::from_rotation_x(PI),
        };
        let scale = (self.unit_scale_factor / 100.0) as f32 * global_scale;

        Mat4::from_quat(rotation) * Mat4::from_scale(Vec3::splat(scale))
    }
}
