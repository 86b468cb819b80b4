//! The single-byte material identifier stored per grid cell.

use std::fmt;

/// A material identifier. Id `0` is reserved for [`Material::AIR`].
///
/// Materials are totally ordered by their numeric id; two voxels are
/// "face-equal" (can be merged by the greedy mesher) exactly when their ids
/// are equal.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Material(pub u8);

impl Material {
    pub const AIR: Self = Self(0);
    pub const STONE: Self = Self(1);
    pub const DIRT: Self = Self(2);
    pub const GRASS: Self = Self(3);
    pub const WATER: Self = Self(4);
    pub const ICE: Self = Self(5);
    pub const WOOD: Self = Self(6);
    pub const LEAVES: Self = Self(7);

    #[inline]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn is_air(self) -> bool {
        self.0 == Material::AIR.0
    }

    #[inline]
    pub const fn is_solid(self) -> bool {
        !self.is_air()
    }

    /// Membership in the small set of materials that let neighbouring faces
    /// show through (water, ice, ...). Non-exhaustive on purpose: the host's
    /// material registry is the real authority, this is a reasonable default
    /// used by tests and the standalone mesher.
    #[inline]
    pub const fn is_transparent(self) -> bool {
        matches!(self, Material::WATER | Material::ICE)
    }
}

impl fmt::Debug for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Material::AIR => "Air",
            Material::STONE => "Stone",
            Material::DIRT => "Dirt",
            Material::GRASS => "Grass",
            Material::WATER => "Water",
            Material::ICE => "Ice",
            Material::WOOD => "Wood",
            Material::LEAVES => "Leaves",
            _ => return write!(f, "Material({})", self.0),
        };
        f.write_str(name)
    }
}

/// One unit cube on the integer grid. Currently a thin newtype over
/// [`Material`]; kept distinct from it so call sites that mean "the cell"
/// read differently from call sites that mean "the id stored in the cell".
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct Voxel(pub Material);

impl Voxel {
    pub const AIR: Self = Self(Material::AIR);

    #[inline]
    pub const fn new(material: Material) -> Self {
        Self(material)
    }

    #[inline]
    pub const fn material(self) -> Material {
        self.0
    }

    #[inline]
    pub const fn is_air(self) -> bool {
        self.0.is_air()
    }

    #[inline]
    pub const fn is_solid(self) -> bool {
        self.0.is_solid()
    }

    #[inline]
    pub const fn is_transparent(self) -> bool {
        self.0.is_transparent()
    }
}

impl From<Material> for Voxel {
    fn from(material: Material) -> Self {
        Self(material)
    }
}
