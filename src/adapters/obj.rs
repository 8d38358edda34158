//! Wavefront OBJ importer built on `tobj`.

use crate::domain::model::{Material, Mesh, Node, Scene};
use crate::domain::ports::Storage;
use crate::utils::error::HostResult;
use std::io::{BufReader, Cursor};
use std::path::Path;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// 匯入 OBJ 到場景；每個 OBJ 物件成為一個頂層節點
pub fn import<S: Storage>(
    storage: &S,
    scene: &mut Scene,
    path: &Path,
    global_scale: f32,
) -> HostResult<()> {
    let data = storage.read_file(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();

    let mut reader = BufReader::new(Cursor::new(data));
    let (models, materials) = tobj::load_obj_buf(&mut reader, &load_options(), |mtl_path| {
        let bytes = storage
            .read_file(&base_dir.join(mtl_path))
            .map_err(|_| tobj::LoadError::OpenFileFailed)?;
        tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(bytes)))
    })?;

    // 材質檔讀不到時仍然匯入幾何
    let materials = materials.unwrap_or_else(|e| {
        tracing::warn!("⚠️ Could not load materials for {}: {}", path.display(), e);
        Vec::new()
    });

    let material_offset = scene.materials.len();
    for material in &materials {
        scene.add_material(convert_material(material));
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string());

    for model in models {
        let name = if model.name.trim().is_empty() || model.name == "unnamed_object" {
            stem.clone()
        } else {
            model.name.clone()
        };

        let mut mesh = convert_mesh(&name, &model.mesh, global_scale);
        if mesh.is_empty() {
            tracing::debug!("Skipping OBJ object '{}' without faces", name);
            continue;
        }
        mesh.material = model
            .mesh
            .material_id
            .filter(|id| *id < materials.len())
            .map(|id| material_offset + id);
        mesh.ensure_normals();

        let mesh_index = scene.add_mesh(mesh);
        scene.add_root(Node::with_mesh(name, mesh_index));
    }

    Ok(())
}

fn convert_mesh(name: &str, source: &tobj::Mesh, global_scale: f32) -> Mesh {
    let mut mesh = Mesh::new(name);

    mesh.positions = source
        .positions
        .chunks_exact(3)
        .map(|p| [p[0] * global_scale, p[1] * global_scale, p[2] * global_scale])
        .collect();

    let vertex_count = mesh.positions.len();
    if source.normals.len() == vertex_count * 3 {
        mesh.normals = source
            .normals
            .chunks_exact(3)
            .map(|n| [n[0], n[1], n[2]])
            .collect();
    }
    // glTF 的 UV 原點在左上角
    if source.texcoords.len() == vertex_count * 2 {
        mesh.texcoords = source
            .texcoords
            .chunks_exact(2)
            .map(|t| [t[0], 1.0 - t[1]])
            .collect();
    }

    mesh.indices = source.indices.clone();
    mesh
}

fn convert_material(source: &tobj::Material) -> Material {
    let [r, g, b] = source.diffuse.unwrap_or([0.8, 0.8, 0.8]);
    let alpha = source.dissolve.unwrap_or(1.0).clamp(0.0, 1.0);
    Material::new(source.name.clone(), [r, g, b, alpha])
}
