//! Template loader and procedural fallback (spec.md §4.8, component C8).

pub mod format;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::coords::{ChunkPos, ChunkSize};
use crate::error::TemplateError;
use crate::voxel::Material;
use format::Template;

/// Loads one chunk's materials out of `template`, decompressing and
/// size-checking against `size.volume()` (spec.md §4.8).
pub fn load_chunk(
    template: &Template,
    chunk_pos: ChunkPos,
    size: ChunkSize,
) -> Result<Vec<Material>, TemplateError> {
    let record = template
        .find_chunk(chunk_pos)
        .ok_or(TemplateError::ChunkMissing(chunk_pos))?;

    let expected = size.volume();
    let bytes = format::decompress_chunk_bytes(&record.compressed_bytes)?;
    if bytes.len() != expected || record.uncompressed_size as usize != expected {
        return Err(TemplateError::SizeMismatch {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes.into_iter().map(Material).collect())
}

/// Combines the world seed with a chunk position into a single stream seed,
/// so every chunk gets its own deterministic RNG without a shared counter
/// (spec.md §4.8 "seed variation is deterministic per (seed, chunk_pos)").
fn chunk_rng(seed: u64, chunk_pos: ChunkPos) -> ChaCha8Rng {
    let mut acc = seed;
    for coord in [chunk_pos.x, chunk_pos.y, chunk_pos.z] {
        // A cheap, deterministic integer mix; good enough for cosmetic
        // variation, not for anything security-sensitive.
        acc = acc
            .wrapping_mul(6364136223846793005)
            .wrapping_add(coord as u64 ^ 0x9E3779B97F4A7C15);
    }
    ChaCha8Rng::seed_from_u64(acc)
}

fn world_xy(chunk_pos: ChunkPos, size: ChunkSize, edge: f32, x: u32, y: u32) -> (f32, f32) {
    (
        (chunk_pos.x * size.x as i32 + x as i32) as f32 * edge,
        (chunk_pos.y * size.y as i32 + y as i32) as f32 * edge,
    )
}

fn within_any_landmark(
    template: &Template,
    world_x: f32,
    world_y: f32,
) -> bool {
    template.landmarks.iter().any(|landmark| {
        let dx = world_x - landmark.world_pos.0;
        let dy = world_y - landmark.world_pos.1;
        (dx * dx + dy * dy).sqrt() <= landmark.protection_radius
    })
}

/// Applies the template's cosmetic seed variation in place (spec.md §4.8):
/// a flower overlay on exposed grass, and a handful of tree plantings that
/// skip any column inside a landmark's protection radius. Terrain-noise
/// perturbation (`terrain_noise_scale`/`terrain_noise_height`) is a no-op —
/// the template's own voxels already encode the terrain shape, so there is
/// nothing left for a height perturbation to act on post-load.
pub fn apply_seed_variation(
    materials: &mut [Material],
    size: ChunkSize,
    template: &Template,
    seed: u64,
    chunk_pos: ChunkPos,
    edge: f32,
) {
    if !template.allow_seed_variations {
        return;
    }
    let params = template.variation_params;
    let mut rng = chunk_rng(seed, chunk_pos);

    let idx = |x: u32, y: u32, z: u32| size.index(x, y, z);

    if params.flower_density > 0.0 {
        for y in 0..size.y {
            for x in 0..size.x {
                for z in 0..size.z.saturating_sub(1) {
                    if materials[idx(x, y, z)] != Material::GRASS {
                        continue;
                    }
                    if materials[idx(x, y, z + 1)] != Material::AIR {
                        continue;
                    }
                    if rng.gen::<f32>() < params.flower_density {
                        materials[idx(x, y, z + 1)] = Material::LEAVES;
                    }
                }
            }
        }
    }

    if params.tree_variation > 0.0 && size.x >= 8 && size.y >= 8 {
        let attempts = ((params.tree_variation * 5.0).floor() as u32).max(0);
        for _ in 0..attempts {
            let x = rng.gen_range(3..(size.x - 4));
            let y = rng.gen_range(3..(size.y - 4));

            let top_z = match (0..size.z).rev().find(|&z| {
                matches!(materials[idx(x, y, z)], m if m == Material::GRASS || m == Material::DIRT)
            }) {
                Some(z) => z,
                None => continue,
            };

            let (wx, wy) = world_xy(chunk_pos, size, edge, x, y);
            if within_any_landmark(template, wx, wy) {
                continue;
            }

            let headroom = size.z - 1 - top_z;
            if headroom < 8 {
                continue;
            }

            let trunk_height = rng.gen_range(4..=6);
            for dz in 1..=trunk_height {
                materials[idx(x, y, top_z + dz)] = Material::WOOD;
            }
            let crown_z = top_z + trunk_height;
            let radius = 2i32;
            for dz in -radius..=radius {
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        if dx * dx + dy * dy + dz * dz > radius * radius {
                            continue;
                        }
                        let (lx, ly, lz) = (x as i32 + dx, y as i32 + dy, crown_z as i32 + dz);
                        if !size.contains(lx, ly, lz) {
                            continue;
                        }
                        let i = idx(lx as u32, ly as u32, lz as u32);
                        if materials[i] == Material::AIR {
                            materials[i] = Material::LEAVES;
                        }
                    }
                }
            }
        }
    }
}

/// Rolling-hills procedural fallback used when no template covers
/// `chunk_pos` and `disable_dynamic_generation` is off (spec.md §4.8).
pub fn generate_procedural_chunk(
    size: ChunkSize,
    chunk_pos: ChunkPos,
    seed: u64,
    noise_scale: f32,
    height_base: f32,
    height_scale: f32,
) -> Vec<Material> {
    use noise::{NoiseFn, Perlin, Seedable};

    let perlin = Perlin::new().set_seed((seed & 0xFFFF_FFFF) as u32);
    let mut cells = vec![Material::AIR; size.volume()];

    for y in 0..size.y {
        for x in 0..size.x {
            let wx = (chunk_pos.x * size.x as i32 + x as i32) as f64 * noise_scale as f64;
            let wy = (chunk_pos.y * size.y as i32 + y as i32) as f64 * noise_scale as f64;
            let n = (perlin.get([wx, wy]) + 1.0) * 0.5;
            let height = (height_base as f64 + n * height_scale as f64).floor() as i32;
            let height = height.clamp(5, 15) as u32;
            let height = height.min(size.z);

            for z in 0..height {
                let material = if z < height.saturating_sub(4) {
                    Material::STONE
                } else if z == height - 1 {
                    Material::GRASS
                } else {
                    Material::DIRT
                };
                cells[size.index(x, y, z)] = material;
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::format::{ChunkRecord, Landmark, TemplateHeader, VariationParams};
    use super::*;

    fn flat_template(size: ChunkSize, materials: Vec<Material>, variation: VariationParams, allow: bool) -> Template {
        let bytes: Vec<u8> = materials.iter().map(|m| m.0).collect();
        Template {
            header: TemplateHeader {
                template_name: "t".into(),
                description: "".into(),
                created_at: 0,
                creator: "".into(),
                chunk_size: size.x,
                min_chunk: (0, 0, 0),
                max_chunk: (0, 0, 0),
            },
            chunks: vec![ChunkRecord {
                chunk_pos: ChunkPos::ZERO,
                uncompressed_size: bytes.len() as u32,
                compressed_bytes: format::compress_chunk_bytes(&bytes),
            }],
            landmarks: vec![],
            variation_params: variation,
            allow_seed_variations: allow,
        }
    }

    #[test]
    fn load_chunk_round_trips_materials() {
        let size = ChunkSize::cubic(4);
        let materials = vec![Material::STONE; size.volume()];
        let template = flat_template(size, materials.clone(), VariationParams::default(), false);
        let loaded = load_chunk(&template, ChunkPos::ZERO, size).unwrap();
        assert_eq!(loaded, materials);
    }

    #[test]
    fn load_chunk_missing_errors() {
        let size = ChunkSize::cubic(4);
        let template = flat_template(size, vec![Material::AIR; size.volume()], VariationParams::default(), false);
        let err = load_chunk(&template, ChunkPos::new(9, 9, 9), size).unwrap_err();
        assert_eq!(err, TemplateError::ChunkMissing(ChunkPos::new(9, 9, 9)));
    }

    #[test]
    fn load_chunk_size_mismatch_errors() {
        let size = ChunkSize::cubic(4);
        let mut template = flat_template(size, vec![Material::AIR; size.volume()], VariationParams::default(), false);
        template.chunks[0].uncompressed_size = 3;
        let err = load_chunk(&template, ChunkPos::ZERO, size).unwrap_err();
        assert!(matches!(err, TemplateError::SizeMismatch { .. }));
    }

    #[test]
    fn seed_variation_is_deterministic() {
        let size = ChunkSize::cubic(16);
        let mut materials = vec![Material::AIR; size.volume()];
        for y in 0..size.y {
            for x in 0..size.x {
                materials[size.index(x, y, 0)] = Material::GRASS;
            }
        }
        let params = VariationParams {
            flower_density: 0.5,
            ..VariationParams::default()
        };
        let template = flat_template(size, materials.clone(), params, true);

        let mut a = materials.clone();
        let mut b = materials.clone();
        apply_seed_variation(&mut a, size, &template, 42, ChunkPos::new(3, -2, 0), 25.0);
        apply_seed_variation(&mut b, size, &template, 42, ChunkPos::new(3, -2, 0), 25.0);
        assert_eq!(a, b);
        assert_ne!(a, materials, "flower overlay should have changed something");
    }

    #[test]
    fn seed_variation_disabled_is_noop_when_not_allowed() {
        let size = ChunkSize::cubic(8);
        let materials = vec![Material::GRASS; size.volume()];
        let params = VariationParams {
            flower_density: 1.0,
            ..VariationParams::default()
        };
        let template = flat_template(size, materials.clone(), params, false);
        let mut out = materials.clone();
        apply_seed_variation(&mut out, size, &template, 1, ChunkPos::ZERO, 25.0);
        assert_eq!(out, materials);
    }

    #[test]
    fn tree_overlay_skips_columns_inside_landmark_protection() {
        let size = ChunkSize::cubic(16);
        let mut materials = vec![Material::AIR; size.volume()];
        for y in 0..size.y {
            for x in 0..size.x {
                materials[size.index(x, y, 0)] = Material::GRASS;
            }
        }
        let params = VariationParams {
            tree_variation: 1.0,
            ..VariationParams::default()
        };
        let mut template = flat_template(size, materials.clone(), params, true);
        template.landmarks.push(Landmark {
            name: "shrine".into(),
            world_pos: (0.0, 0.0, 0.0),
            protection_radius: 1000.0,
            description: "".into(),
            spawnable: None,
        });
        let mut out = materials.clone();
        apply_seed_variation(&mut out, size, &template, 7, ChunkPos::ZERO, 25.0);
        assert!(
            !out.contains(&Material::WOOD),
            "entire chunk is within the landmark radius, so no tree should be planted"
        );
    }

    #[test]
    fn flower_overlay_ignores_landmark_protection() {
        let size = ChunkSize::cubic(16);
        let mut materials = vec![Material::AIR; size.volume()];
        for y in 0..size.y {
            for x in 0..size.x {
                materials[size.index(x, y, 0)] = Material::GRASS;
            }
        }
        let params = VariationParams {
            flower_density: 1.0,
            ..VariationParams::default()
        };
        let mut template = flat_template(size, materials.clone(), params, true);
        template.landmarks.push(Landmark {
            name: "shrine".into(),
            world_pos: (0.0, 0.0, 0.0),
            protection_radius: 1000.0,
            description: "".into(),
            spawnable: None,
        });
        let mut out = materials.clone();
        apply_seed_variation(&mut out, size, &template, 7, ChunkPos::ZERO, 25.0);
        assert_ne!(
            out, materials,
            "flower placement isn't gated by landmarks, only tree placement is"
        );
    }

    #[test]
    fn procedural_chunk_height_is_clamped_to_band() {
        let size = ChunkSize::new(8, 8, 32);
        let cells = generate_procedural_chunk(size, ChunkPos::new(5, -3, 0), 123, 0.03, 10.0, 10.0);
        for y in 0..size.y {
            for x in 0..size.x {
                let top = (0..size.z)
                    .rev()
                    .find(|&z| cells[size.index(x, y, z)] != Material::AIR);
                if let Some(z) = top {
                    assert!(z + 1 >= 5 && z + 1 <= 15);
                    assert_eq!(cells[size.index(x, y, z)], Material::GRASS);
                }
            }
        }
    }

    #[test]
    fn procedural_chunk_is_deterministic_for_same_seed() {
        let size = ChunkSize::new(8, 8, 32);
        let a = generate_procedural_chunk(size, ChunkPos::new(1, 1, 0), 99, 0.03, 10.0, 10.0);
        let b = generate_procedural_chunk(size, ChunkPos::new(1, 1, 0), 99, 0.03, 10.0, 10.0);
        assert_eq!(a, b);
    }
}
