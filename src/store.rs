//! Dense per-chunk voxel storage (spec.md §4.1, component C1).

use crate::coords::ChunkSize;
use crate::voxel::{Material, Voxel};

/// A flat, row-major array of `size.volume()` voxels. Out-of-range reads
/// return [`Voxel::AIR`] rather than panicking; out-of-range writes are
/// rejected with [`crate::error::StoreError::OutOfRange`].
#[derive(Clone, Debug)]
pub struct VoxelStore {
    size: ChunkSize,
    cells: Vec<Material>,
    dirty: bool,
}

impl VoxelStore {
    /// A new store of the given size, filled with [`Material::AIR`].
    pub fn new(size: ChunkSize) -> Self {
        Self {
            size,
            cells: vec![Material::AIR; size.volume()],
            dirty: false,
        }
    }

    /// Builds a store directly from a row-major material array, e.g. a
    /// worker job's snapshot. Panics if `cells.len() != size.volume()`.
    pub fn from_materials(size: ChunkSize, cells: Vec<Material>) -> Self {
        assert_eq!(cells.len(), size.volume(), "material buffer does not match chunk volume");
        Self {
            size,
            cells,
            dirty: false,
        }
    }

    #[inline]
    pub fn size(&self) -> ChunkSize {
        self.size
    }

    #[inline]
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Halves each axis (rounded up), picking the first non-air voxel found
    /// in each 2x2x2 source block (or `Air` if the whole block is empty).
    /// Paired with a doubled voxel edge, this is what actually makes an LOD1
    /// /LOD2 mesh occupy the chunk's native world-space footprint at half
    /// the vertex density, rather than silently doubling it (spec.md §4.9
    /// "Lod1 and Lod2 fall back to the basic mesher at doubled voxel scale").
    pub fn downsample_2x(&self) -> VoxelStore {
        let half = ChunkSize::new(
            (self.size.x + 1) / 2,
            (self.size.y + 1) / 2,
            (self.size.z + 1) / 2,
        );
        let mut cells = vec![Material::AIR; half.volume()];
        for hz in 0..half.z {
            for hy in 0..half.y {
                for hx in 0..half.x {
                    let mut picked = Material::AIR;
                    'block: for dz in 0..2 {
                        for dy in 0..2 {
                            for dx in 0..2 {
                                let m = self
                                    .get((hx * 2 + dx) as i32, (hy * 2 + dy) as i32, (hz * 2 + dz) as i32)
                                    .material();
                                if m != Material::AIR {
                                    picked = m;
                                    break 'block;
                                }
                            }
                        }
                    }
                    cells[half.index(hx, hy, hz)] = picked;
                }
            }
        }
        VoxelStore {
            size: half,
            cells,
            dirty: false,
        }
    }

    /// Reads the voxel at `(x, y, z)`. Returns [`Voxel::AIR`] if out of range.
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> Voxel {
        if !self.size.contains(x, y, z) {
            return Voxel::AIR;
        }
        let i = self.size.index(x as u32, y as u32, z as u32);
        Voxel::new(self.cells[i])
    }

    /// Writes `voxel` at `(x, y, z)`. Returns an error and leaves the store
    /// unchanged if the position is out of range.
    pub fn set(&mut self, x: i32, y: i32, z: i32, voxel: Voxel) -> Result<(), crate::error::StoreError> {
        if !self.size.contains(x, y, z) {
            return Err(crate::error::StoreError::OutOfRange(x, y, z));
        }
        let i = self.size.index(x as u32, y as u32, z as u32);
        self.cells[i] = voxel.material();
        self.dirty = true;
        Ok(())
    }

    /// Writes `materials[i]` to `points[i]` for every `i`. All-or-nothing:
    /// if any point is out of range, no writes are applied and an error is
    /// returned naming the first offending point.
    pub fn set_batch(
        &mut self,
        points: &[(i32, i32, i32)],
        materials: &[Material],
    ) -> Result<(), crate::error::StoreError> {
        if points.len() != materials.len() {
            return Err(crate::error::StoreError::LengthMismatch {
                points: points.len(),
                materials: materials.len(),
            });
        }
        for &(x, y, z) in points {
            if !self.size.contains(x, y, z) {
                return Err(crate::error::StoreError::OutOfRange(x, y, z));
            }
        }
        for (&(x, y, z), &m) in points.iter().zip(materials) {
            let i = self.size.index(x as u32, y as u32, z as u32);
            self.cells[i] = m;
        }
        if !points.is_empty() {
            self.dirty = true;
        }
        Ok(())
    }

    /// Fills the axis-aligned box `[min, max)` (local coordinates, exclusive
    /// upper bound) with `material`. Coordinates are clamped to the store's
    /// extents rather than rejected.
    pub fn fill_region(&mut self, min: (i32, i32, i32), max: (i32, i32, i32), material: Material) {
        let x0 = min.0.max(0) as u32;
        let y0 = min.1.max(0) as u32;
        let z0 = min.2.max(0) as u32;
        let x1 = (max.0.max(0) as u32).min(self.size.x);
        let y1 = (max.1.max(0) as u32).min(self.size.y);
        let z1 = (max.2.max(0) as u32).min(self.size.z);
        if x0 >= x1 || y0 >= y1 || z0 >= z1 {
            return;
        }
        for z in z0..z1 {
            for y in y0..y1 {
                for x in x0..x1 {
                    let i = self.size.index(x, y, z);
                    self.cells[i] = material;
                }
            }
        }
        self.dirty = true;
    }

    /// Overwrites every voxel with `material`.
    pub fn fill_with(&mut self, material: Material) {
        self.cells.fill(material);
        self.dirty = true;
    }

    /// Resets every voxel to [`Material::AIR`] and clears the dirty flag.
    pub fn clear(&mut self) {
        self.cells.fill(Material::AIR);
        self.dirty = false;
    }

    /// Row-major iteration over every `(x, y, z, material)` in the store.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, u32, Material)> + '_ {
        let (sx, sy, _sz) = (self.size.x, self.size.y, self.size.z);
        self.cells.iter().enumerate().map(move |(i, &m)| {
            let x = (i as u32) % sx;
            let y = ((i as u32) / sx) % sy;
            let z = (i as u32) / (sx * sy);
            (x, y, z, m)
        })
    }

    /// Borrows the backing slice directly, for callers (the mesher) that
    /// want to index it themselves without per-cell bounds checks.
    #[inline]
    pub fn raw(&self) -> &[Material] {
        &self.cells
    }

    /// `true` if every voxel is [`Material::AIR`].
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|m| m.is_air())
    }
}
