//! Quad-to-mesh conversion (spec.md §4.4): lays out greedy quads as
//! triangles, derives normals/UVs/tangents, welds shared-edge vertices, and
//! validates the result before it leaves the pipeline.

use std::collections::HashMap;

use super::{GreedyQuad, MeshData};
use crate::error::MeshValidationError;
use crate::voxel::Material;

/// Spec's quantization: 0.01 world-unit granularity (multiply by 100, round).
const WELD_QUANTUM: f32 = 100.0;

/// Lays out `quads` as a welded, validated [`MeshData`], scaling local-grid
/// quad coordinates by `edge` (the voxel edge length) to produce host world
/// units. `bound` is the `R` of spec.md §4.4's validation rule
/// (`R = 2 * max_chunk_extent * edge`); positions outside `[-bound, bound]`
/// fail validation.
pub fn quads_to_mesh(quads: &[GreedyQuad], edge: f32, bound: f32) -> Result<MeshData, MeshValidationError> {
    let mut mesh = MeshData::default();
    let mut weld: HashMap<(i64, i64, i64, i8), u32> = HashMap::new();

    // Group by material, preserving first-seen order, so each quad's two
    // triangles land inside a contiguous index range per material without
    // reordering which material's section comes first (spec.md §4.4 draw
    // ranges: "sections in first-seen material order").
    let mut material_order: Vec<Material> = Vec::new();
    let mut grouped: HashMap<Material, Vec<&GreedyQuad>> = HashMap::new();
    for quad in quads {
        grouped
            .entry(quad.material)
            .or_insert_with(|| {
                material_order.push(quad.material);
                Vec::new()
            })
            .push(quad);
    }
    let ordered_quads: Vec<&GreedyQuad> = material_order
        .iter()
        .flat_map(|mat| grouped[mat].iter().copied())
        .collect();

    let mut current_material: Option<Material> = None;
    let mut section_start = 0u32;

    for quad in ordered_quads {
        if current_material != Some(quad.material) {
            if let Some(mat) = current_material {
                if mesh.indices.len() as u32 > section_start {
                    mesh.material_sections
                        .push((mat, section_start..mesh.indices.len() as u32));
                }
            }
            current_material = Some(quad.material);
            section_start = mesh.indices.len() as u32;
        }

        let corners = quad_corners(quad, edge);
        let normal = quad.face.normal();
        // UV is the (u, v) plane coordinate in voxel-grid units, unscaled by
        // `edge` and un-fracted: corners of adjacent merged quads share the
        // same absolute value, so a tiled texture lines up across quad
        // boundaries (spec.md §4.4's "continuous across merged quads").
        let uv_grid = quad_uvs(quad);
        let (u_axis, _) = quad.face.plane_axes();
        let mut tangent = [0.0f32; 3];
        tangent[u_axis] = 1.0;
        let tangent = [tangent[0], tangent[1], tangent[2], 1.0];

        let mut local_indices = [0u32; 4];
        for i in 0..4 {
            let pos = corners[i];
            let key = weld_key(pos, normal);
            let idx = *weld.entry(key).or_insert_with(|| {
                mesh.positions.push(pos);
                mesh.normals.push(normal);
                mesh.uvs.push(uv_grid[i]);
                mesh.tangents.push(tangent);
                mesh.colors.push([1.0, 1.0, 1.0, 1.0]);
                (mesh.positions.len() - 1) as u32
            });
            local_indices[i] = idx;
        }

        mesh.indices.extend_from_slice(&[
            local_indices[0],
            local_indices[1],
            local_indices[2],
            local_indices[0],
            local_indices[2],
            local_indices[3],
        ]);
    }

    if let Some(mat) = current_material {
        if mesh.indices.len() as u32 > section_start {
            mesh.material_sections
                .push((mat, section_start..mesh.indices.len() as u32));
        }
    }

    validate(&mesh, bound)?;
    Ok(mesh)
}

/// The four corners of `quad`'s rectangle in host world units, ordered so
/// the (0,1,2)/(0,2,3) triangle fan winds front-facing along the quad's
/// outward normal.
fn quad_corners(quad: &GreedyQuad, edge: f32) -> [[f32; 3]; 4] {
    let face = quad.face;
    let main = face.main_axis();
    let (u_axis, v_axis) = face.plane_axes();
    let positive = matches!(
        face,
        super::Face::PosX | super::Face::PosY | super::Face::PosZ
    );

    let plane = (quad.origin[main] as f32 + if positive { 1.0 } else { 0.0 }) * edge;
    let u0 = quad.origin[u_axis] as f32 * edge;
    let v0 = quad.origin[v_axis] as f32 * edge;
    let u1 = u0 + quad.width as f32 * edge;
    let v1 = v0 + quad.height as f32 * edge;

    let corner = |u: f32, v: f32| -> [f32; 3] {
        let mut c = [0.0f32; 3];
        c[main] = plane;
        c[u_axis] = u;
        c[v_axis] = v;
        c
    };

    let mut ordered = [corner(u0, v0), corner(u1, v0), corner(u1, v1), corner(u0, v1)];
    if face.inverted_winding() {
        ordered.reverse();
        ordered.rotate_left(3);
    }
    ordered
}

fn quad_uvs(quad: &GreedyQuad) -> [[f32; 2]; 4] {
    let (u_axis, v_axis) = quad.face.plane_axes();
    let u0 = quad.origin[u_axis] as f32;
    let v0 = quad.origin[v_axis] as f32;
    let u1 = u0 + quad.width as f32;
    let v1 = v0 + quad.height as f32;
    let mut uvs = [[u0, v0], [u1, v0], [u1, v1], [u0, v1]];
    if quad.face.inverted_winding() {
        uvs.reverse();
        uvs.rotate_left(3);
    }
    uvs
}

fn weld_key(pos: [f32; 3], normal: [f32; 3]) -> (i64, i64, i64, i8) {
    let q = |v: f32| (v * WELD_QUANTUM).round() as i64;
    let normal_code = match normal {
        [1.0, 0.0, 0.0] => 0,
        [-1.0, 0.0, 0.0] => 1,
        [0.0, 1.0, 0.0] => 2,
        [0.0, -1.0, 0.0] => 3,
        [0.0, 0.0, 1.0] => 4,
        [0.0, 0.0, -1.0] => 5,
        _ => 6,
    };
    (q(pos[0]), q(pos[1]), q(pos[2]), normal_code)
}

fn validate(mesh: &MeshData, bound: f32) -> Result<(), MeshValidationError> {
    let n = mesh.positions.len();
    if mesh.normals.len() != n || mesh.uvs.len() != n || mesh.tangents.len() != n || mesh.colors.len() != n {
        return Err(MeshValidationError::AttributeLengthMismatch {
            positions: n,
            normals: mesh.normals.len(),
            uvs: mesh.uvs.len(),
            tangents: mesh.tangents.len(),
            colors: mesh.colors.len(),
        });
    }
    for &index in &mesh.indices {
        if index as usize >= n {
            return Err(MeshValidationError::IndexOutOfRange {
                index,
                vertex_count: n,
            });
        }
    }
    for (i, normal) in mesh.normals.iter().enumerate() {
        let len_sq = normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2];
        if len_sq < 0.5 {
            return Err(MeshValidationError::ZeroNormal(i));
        }
    }
    for pos in &mesh.positions {
        for &c in pos {
            if !c.is_finite() || c.abs() > bound {
                return Err(MeshValidationError::PositionOutOfBounds(*pos, bound));
            }
        }
    }
    Ok(())
}
