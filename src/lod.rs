//! LOD selector (spec.md §4.9, component C9): distance bands to LOD level.

/// Level of detail for a chunk. `Lod0` is full detail (greedy mesh); `Lod1`
/// and `Lod2` fall back to the basic mesher at doubled voxel scale; `Lod3`
/// is a sentinel for a host-side billboard; `Unloaded` means the mesh is
/// cleared but the chunk itself is retained.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Lod {
    Unloaded,
    #[default]
    Lod0,
    Lod1,
    Lod2,
    Lod3,
}

impl Lod {
    /// `true` for the two levels that use the basic mesher at doubled voxel
    /// scale rather than the greedy mesher.
    #[inline]
    pub const fn uses_basic_mesher(self) -> bool {
        matches!(self, Lod::Lod1 | Lod::Lod2)
    }

    #[inline]
    pub const fn is_meshable(self) -> bool {
        !matches!(self, Lod::Unloaded)
    }
}

/// Distance bands in world units (spec.md §4.9's table; metres × 100).
const LOD0_MAX: f32 = 5_000.0;
const LOD1_MAX: f32 = 10_000.0;
const LOD2_MAX: f32 = 20_000.0;
const LOD3_MAX: f32 = 30_000.0;

/// Selects the LOD for a chunk at distance `d` (world units) from the viewer.
pub fn select_lod(distance: f32) -> Lod {
    if distance < LOD0_MAX {
        Lod::Lod0
    } else if distance < LOD1_MAX {
        Lod::Lod1
    } else if distance < LOD2_MAX {
        Lod::Lod2
    } else if distance < LOD3_MAX {
        Lod::Lod3
    } else {
        Lod::Unloaded
    }
}
