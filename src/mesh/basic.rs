//! Basic mesher (spec.md §4.2, component C2): one quad per visible voxel
//! face, O(N) in voxel count, never emits more than `6*N` quads.

use super::{quads_to_mesh, Face, GreedyQuad, MeshData};
use crate::error::MeshValidationError;
use crate::store::VoxelStore;

/// Emits one unit quad per voxel face whose neighbour across that face is
/// transparent (air or a transparent material distinct from the voxel's own
/// material). No merging: every quad is exactly one voxel wide and tall.
/// `edge` is the voxel edge length in host world units and `bound` the
/// validation radius (spec.md §4.4), both forwarded to [`quads_to_mesh`].
pub fn generate_basic_mesh(
    store: &VoxelStore,
    edge: f32,
    bound: f32,
) -> Result<MeshData, MeshValidationError> {
    let size = store.size();
    let mut quads = Vec::new();

    for z in 0..size.z as i32 {
        for y in 0..size.y as i32 {
            for x in 0..size.x as i32 {
                let voxel = store.get(x, y, z);
                if voxel.is_air() {
                    continue;
                }
                for face in Face::ALL {
                    let [dx, dy, dz] = face.step();
                    let neighbour = store.get(x + dx, y + dy, z + dz);
                    let visible = neighbour.is_air()
                        || (neighbour.is_transparent() && neighbour.material() != voxel.material());
                    if visible {
                        quads.push(GreedyQuad {
                            face,
                            material: voxel.material(),
                            origin: [x, y, z],
                            width: 1,
                            height: 1,
                        });
                    }
                }
            }
        }
    }

    quads_to_mesh(&quads, edge, bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::ChunkSize;
    use crate::voxel::{Material, Voxel};

    #[test]
    fn empty_chunk_produces_no_quads() {
        let store = VoxelStore::new(ChunkSize::cubic(4));
        let mesh = generate_basic_mesh(&store, 1.0, 1.0e5).unwrap();
        assert!(mesh.is_empty());
    }

    #[test]
    fn single_voxel_produces_six_faces() {
        let mut store = VoxelStore::new(ChunkSize::cubic(4));
        store.set(1, 1, 1, Voxel::new(Material::STONE)).unwrap();
        let mesh = generate_basic_mesh(&store, 1.0, 1.0e5).unwrap();
        assert_eq!(mesh.triangle_count(), 6 * 2);
        assert_eq!(mesh.vertex_count(), 6 * 4);
    }

    #[test]
    fn adjacent_voxels_hide_shared_face() {
        let mut store = VoxelStore::new(ChunkSize::cubic(4));
        store.set(1, 1, 1, Voxel::new(Material::STONE)).unwrap();
        store.set(2, 1, 1, Voxel::new(Material::STONE)).unwrap();
        let mesh = generate_basic_mesh(&store, 1.0, 1.0e5).unwrap();
        // 2 cubes * 6 faces - 2 hidden faces (the shared boundary, both sides) = 10
        assert_eq!(mesh.triangle_count(), 10 * 2);
    }

    #[test]
    fn water_next_to_air_is_still_visible_from_outside() {
        let mut store = VoxelStore::new(ChunkSize::cubic(4));
        store.set(1, 1, 1, Voxel::new(Material::WATER)).unwrap();
        let mesh = generate_basic_mesh(&store, 1.0, 1.0e5).unwrap();
        assert_eq!(mesh.triangle_count(), 6 * 2);
    }

    #[test]
    fn basic_mesh_never_exceeds_six_quads_per_voxel() {
        let mut store = VoxelStore::new(ChunkSize::cubic(4));
        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    store.set(x, y, z, Voxel::new(Material::STONE)).unwrap();
                }
            }
        }
        let mesh = generate_basic_mesh(&store, 1.0, 1.0e5).unwrap();
        assert!(mesh.triangle_count() <= 6 * 2 * 64);
    }
}
