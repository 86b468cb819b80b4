//! Chunk addressing and coordinate conversions (spec.md §3, §6.4).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Three positive integers describing a chunk's voxel extents. Immutable
/// after the owning chunk is initialized.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ChunkSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl ChunkSize {
    /// The mobile-tier default.
    pub const MOBILE: Self = Self::cubic(16);
    /// The desktop-tier default.
    pub const DESKTOP: Self = Self::cubic(32);

    #[inline]
    pub const fn cubic(edge: u32) -> Self {
        Self {
            x: edge,
            y: edge,
            z: edge,
        }
    }

    #[inline]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Total voxel count `N = X*Y*Z`.
    #[inline]
    pub const fn volume(self) -> usize {
        (self.x as usize) * (self.y as usize) * (self.z as usize)
    }

    #[inline]
    pub const fn contains(self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as u32) < self.x
            && (y as u32) < self.y
            && (z as u32) < self.z
    }

    /// Row-major index `i = x + y*X + z*X*Y` for an in-range local position.
    #[inline]
    pub const fn index(self, x: u32, y: u32, z: u32) -> usize {
        (x as usize) + (y as usize) * (self.x as usize) + (z as usize) * (self.x as usize) * (self.y as usize)
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self::DESKTOP
    }
}

/// Integer grid coordinates of a chunk (not world units).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const ZERO: Self = Self::new(0, 0, 0);

    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn as_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }

    /// World-space center of this chunk, assuming cubic `size` and edge length `edge`.
    pub fn world_center(self, size: ChunkSize, edge: f32) -> glam::Vec3A {
        let min = glam::Vec3A::new(
            (self.x * size.x as i32) as f32,
            (self.y * size.y as i32) as f32,
            (self.z * size.z as i32) as f32,
        ) * edge;
        let half = glam::Vec3A::new(size.x as f32, size.y as f32, size.z as f32) * edge * 0.5;
        min + half
    }
}

impl fmt::Debug for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkPos({}, {}, {})", self.x, self.y, self.z)
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(i32, i32, i32)> for ChunkPos {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}

/// `world_to_chunk(p) = floor(p / (size * E))` componentwise (spec.md §6.4).
pub fn world_to_chunk(world_pos: glam::Vec3A, size: ChunkSize, edge: f32) -> ChunkPos {
    let extent = glam::Vec3A::new(size.x as f32, size.y as f32, size.z as f32) * edge;
    let scaled = world_pos / extent;
    ChunkPos::new(
        scaled.x.floor() as i32,
        scaled.y.floor() as i32,
        scaled.z.floor() as i32,
    )
}

/// `world_to_local(p, cp) = floor((p - cp*size*E) / E)` componentwise (spec.md §6.4).
pub fn world_to_local(
    world_pos: glam::Vec3A,
    chunk_pos: ChunkPos,
    size: ChunkSize,
    edge: f32,
) -> (i32, i32, i32) {
    let origin = glam::Vec3A::new(
        (chunk_pos.x * size.x as i32) as f32,
        (chunk_pos.y * size.y as i32) as f32,
        (chunk_pos.z * size.z as i32) as f32,
    ) * edge;
    let rel = (world_pos - origin) / edge;
    (rel.x.floor() as i32, rel.y.floor() as i32, rel.z.floor() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_is_product_of_extents() {
        assert_eq!(ChunkSize::cubic(16).volume(), 16 * 16 * 16);
        assert_eq!(ChunkSize::new(16, 32, 8).volume(), 16 * 32 * 8);
    }

    #[test]
    fn index_is_row_major_x_fastest() {
        let size = ChunkSize::cubic(4);
        assert_eq!(size.index(0, 0, 0), 0);
        assert_eq!(size.index(1, 0, 0), 1);
        assert_eq!(size.index(0, 1, 0), 4);
        assert_eq!(size.index(0, 0, 1), 16);
    }

    #[test]
    fn world_to_chunk_round_trips_origin() {
        let size = ChunkSize::cubic(16);
        let edge = 25.0;
        assert_eq!(
            world_to_chunk(glam::Vec3A::new(0.0, 0.0, 0.0), size, edge),
            ChunkPos::ZERO
        );
        assert_eq!(
            world_to_chunk(glam::Vec3A::new(16.0 * 25.0, 0.0, 0.0), size, edge),
            ChunkPos::new(1, 0, 0)
        );
        assert_eq!(
            world_to_chunk(glam::Vec3A::new(-1.0, 0.0, 0.0), size, edge),
            ChunkPos::new(-1, 0, 0)
        );
    }
}
