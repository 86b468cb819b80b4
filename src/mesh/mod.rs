//! Meshing pipeline: voxel grid in, render-ready vertex/index buffers out
//! (spec.md §4.2–§4.4, components C2–C4).

pub mod basic;
pub mod convert;
pub mod greedy;

pub use basic::generate_basic_mesh;
pub use convert::quads_to_mesh;
pub use greedy::generate_greedy_quads;

use crate::voxel::Material;

/// The six axis-aligned face directions a quad can face.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Face {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::PosX,
        Face::NegX,
        Face::PosY,
        Face::NegY,
        Face::PosZ,
        Face::NegZ,
    ];

    /// Unit outward normal for this face.
    #[inline]
    pub const fn normal(self) -> [f32; 3] {
        match self {
            Face::PosX => [1.0, 0.0, 0.0],
            Face::NegX => [-1.0, 0.0, 0.0],
            Face::PosY => [0.0, 1.0, 0.0],
            Face::NegY => [0.0, -1.0, 0.0],
            Face::PosZ => [0.0, 0.0, 1.0],
            Face::NegZ => [0.0, 0.0, -1.0],
        }
    }

    /// The integer step from a cell towards its neighbour across this face.
    #[inline]
    pub const fn step(self) -> [i32; 3] {
        match self {
            Face::PosX => [1, 0, 0],
            Face::NegX => [-1, 0, 0],
            Face::PosY => [0, 1, 0],
            Face::NegY => [0, -1, 0],
            Face::PosZ => [0, 0, 1],
            Face::NegZ => [0, 0, -1],
        }
    }

    /// `true` for the faces whose quad winding needs reversal relative to
    /// the `(u, v)` sweep order to stay front-facing: `cross(u_hat, v_hat)`
    /// only lines up with the outward normal for `PosX`, `NegY` and `PosZ`,
    /// the other three need the corner order flipped (spec.md §4.4 note on
    /// winding).
    #[inline]
    pub const fn inverted_winding(self) -> bool {
        matches!(self, Face::NegX | Face::PosY | Face::NegZ)
    }

    /// The two in-plane axes `(u, v)` used to sweep this face during greedy
    /// meshing, as axis indices into `[x, y, z]`.
    #[inline]
    pub const fn plane_axes(self) -> (usize, usize) {
        match self {
            Face::PosX | Face::NegX => (1, 2),
            Face::PosY | Face::NegY => (0, 2),
            Face::PosZ | Face::NegZ => (0, 1),
        }
    }

    /// The axis this face's normal points along.
    #[inline]
    pub const fn main_axis(self) -> usize {
        match self {
            Face::PosX | Face::NegX => 0,
            Face::PosY | Face::NegY => 1,
            Face::PosZ | Face::NegZ => 2,
        }
    }
}

/// A merged rectangle of same-material, same-facing voxel faces, in local
/// chunk-grid coordinates (spec.md §4.3).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct GreedyQuad {
    pub face: Face,
    pub material: Material,
    /// Local-space origin corner of the quad, on the voxel grid.
    pub origin: [i32; 3],
    /// Extent along the face's first in-plane axis.
    pub width: u32,
    /// Extent along the face's second in-plane axis.
    pub height: u32,
}

/// Render-ready mesh data: parallel per-vertex attribute buffers, a
/// triangle index list, and per-material draw ranges (spec.md §4.4).
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub tangents: Vec<[f32; 4]>,
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
    /// `(material, index_range)` draw ranges, sorted and non-overlapping.
    pub material_sections: Vec<(Material, std::ops::Range<u32>)>,
}

impl MeshData {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
