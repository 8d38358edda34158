//! STL (binary and ASCII) importer built on `stl_io`.

use crate::domain::model::{z_up_to_y_up, Mesh};
use crate::utils::error::{HostError, HostResult};
use glam::{Mat4, Vec3};
use std::io::Cursor;
use stl_io::IndexedMesh;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// 解析 STL，回傳已轉成 Y 軸朝上、每個面三個獨立頂點的網格
pub fn parse(name: &str, data: &[u8], global_scale: f32) -> HostResult<Mesh> {
    let indexed = read_indexed(data)?;
    if indexed.faces.is_empty() {
        return Err(HostError::stl("file contains no facets"));
    }

    tracing::debug!(
        "STL '{}': {} facets, {} unique vertices",
        name,
        indexed.faces.len(),
        indexed.vertices.len()
    );

    let mut mesh = Mesh::new(name);
    mesh.positions.reserve(indexed.faces.len() * 3);
    mesh.normals.reserve(indexed.faces.len() * 3);
    mesh.indices.reserve(indexed.faces.len() * 3);

    for face in &indexed.faces {
        let mut corners = [[0.0f32; 3]; 3];
        for (corner, &vertex) in corners.iter_mut().zip(face.vertices.iter()) {
            let v = indexed.vertices.get(vertex).ok_or_else(|| {
                HostError::stl(format!("facet references missing vertex {}", vertex))
            })?;
            *corner = [v[0], v[1], v[2]];
        }

        let normal = facet_normal([face.normal[0], face.normal[1], face.normal[2]], &corners);
        for corner in corners {
            mesh.indices.push(mesh.positions.len() as u32);
            mesh.positions.push(corner);
            mesh.normals.push(normal);
        }
    }

    mesh.transform(z_up_to_y_up() * Mat4::from_scale(Vec3::splat(global_scale)));
    Ok(mesh)
}

fn read_indexed(data: &[u8]) -> HostResult<IndexedMesh> {
    // 標頭以 "solid " 開頭的二進位檔會被當成 ASCII 讀取，長度吻合時先清掉標頭
    if has_binary_length(data) && data.starts_with(b"solid") {
        let mut binary = data.to_vec();
        binary[..HEADER_LEN].fill(0);
        return read_stl(&binary);
    }
    read_stl(data)
}

fn read_stl(data: &[u8]) -> HostResult<IndexedMesh> {
    stl_io::read_stl(&mut Cursor::new(data)).map_err(|e| HostError::stl(e.to_string()))
}

/// 檔案長度是否剛好等於 80 位元組標頭 + 面數 + 每面 50 位元組
fn has_binary_length(data: &[u8]) -> bool {
    if data.len() < HEADER_LEN + 4 {
        return false;
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    count
        .checked_mul(FACET_LEN)
        .and_then(|body| body.checked_add(HEADER_LEN + 4))
        == Some(data.len())
}

fn facet_normal(stored: [f32; 3], corners: &[[f32; 3]; 3]) -> [f32; 3] {
    let stored = Vec3::from(stored);
    if stored.length_squared() > 1e-12 {
        return stored.normalize().to_array();
    }
    let [a, b, c] = corners.map(Vec3::from);
    (b - a).cross(c - a).try_normalize().unwrap_or(Vec3::Z).to_array()
}
