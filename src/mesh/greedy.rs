//! Greedy mesher (spec.md §4.3, component C3): merges coplanar, same-material,
//! same-facing voxel faces into maximal rectangles.
//!
//! Mirrors the widen-then-heighten sweep of the teacher's
//! `render/meshing/greedy/algorithm.rs` (`widen_quad` / `heighten_quad`), but
//! walks a dense [`VoxelStore`] instead of an octree-backed container and
//! merges purely on material equality rather than a render-attribute key.

use super::{Face, GreedyQuad};
use crate::store::VoxelStore;
use crate::voxel::Material;

/// Builds one slice-mask per layer along each face's normal axis and
/// greedily merges same-material runs within it. Width (`u`) is grown
/// before height (`v`), so ties between equally-valid merges always resolve
/// the same way for the same input.
pub fn generate_greedy_quads(store: &VoxelStore) -> Vec<GreedyQuad> {
    let size = store.size();
    let extents = [size.x as i32, size.y as i32, size.z as i32];
    let mut quads = Vec::new();

    for face in Face::ALL {
        let main = face.main_axis();
        let (u_axis, v_axis) = face.plane_axes();
        let size_main = extents[main];
        let size_u = extents[u_axis] as usize;
        let size_v = extents[v_axis] as usize;
        let step = face.step();

        for layer in 0..size_main {
            let mask = build_mask(store, face, step, main, u_axis, v_axis, layer, size_u, size_v);
            merge_mask(&mask, size_u, size_v, face, main, u_axis, v_axis, layer, &mut quads);
        }
    }

    quads
}

#[allow(clippy::too_many_arguments)]
fn build_mask(
    store: &VoxelStore,
    face: Face,
    step: [i32; 3],
    main: usize,
    u_axis: usize,
    v_axis: usize,
    layer: i32,
    size_u: usize,
    size_v: usize,
) -> Vec<Option<Material>> {
    let mut mask = vec![None; size_u * size_v];
    for iv in 0..size_v {
        for iu in 0..size_u {
            let mut coord = [0i32; 3];
            coord[main] = layer;
            coord[u_axis] = iu as i32;
            coord[v_axis] = iv as i32;
            let voxel = store.get(coord[0], coord[1], coord[2]);
            if voxel.is_air() {
                continue;
            }
            let neighbour = store.get(coord[0] + step[0], coord[1] + step[1], coord[2] + step[2]);
            let visible = neighbour.is_air()
                || (neighbour.is_transparent() && neighbour.material() != voxel.material());
            if visible {
                mask[iu + iv * size_u] = Some(voxel.material());
                let _ = face;
            }
        }
    }
    mask
}

#[allow(clippy::too_many_arguments)]
fn merge_mask(
    mask: &[Option<Material>],
    size_u: usize,
    size_v: usize,
    face: Face,
    main: usize,
    u_axis: usize,
    v_axis: usize,
    layer: i32,
    out: &mut Vec<GreedyQuad>,
) {
    let mut visited = vec![false; size_u * size_v];

    for iv in 0..size_v {
        for iu in 0..size_u {
            let idx = iu + iv * size_u;
            if visited[idx] {
                continue;
            }
            let Some(material) = mask[idx] else {
                continue;
            };

            // widen_quad: grow along u as far as the run of equal material continues.
            let mut width = 1usize;
            while iu + width < size_u {
                let next = iu + width + iv * size_u;
                if visited[next] || mask[next] != Some(material) {
                    break;
                }
                width += 1;
            }

            // heighten_quad: grow along v as long as the whole width-wide row matches.
            let mut height = 1usize;
            'grow: while iv + height < size_v {
                for du in 0..width {
                    let next = (iu + du) + (iv + height) * size_u;
                    if visited[next] || mask[next] != Some(material) {
                        break 'grow;
                    }
                }
                height += 1;
            }

            for dv in 0..height {
                for du in 0..width {
                    visited[(iu + du) + (iv + dv) * size_u] = true;
                }
            }

            let mut origin = [0i32; 3];
            origin[main] = layer;
            origin[u_axis] = iu as i32;
            origin[v_axis] = iv as i32;

            out.push(GreedyQuad {
                face,
                material,
                origin,
                width: width as u32,
                height: height as u32,
            });
        }
    }
}
