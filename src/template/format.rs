//! Template file format (spec.md §6.2): header + chunk records + landmarks +
//! variation params, serialized with `serde`/`postcard` the way
//! `nebula-net`/`nebula-multiplayer` encode structured binary payloads, with
//! per-chunk bytes compressed via `lz4_flex`.

use serde::{Deserialize, Serialize};

use crate::coords::ChunkPos;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateHeader {
    pub template_name: String,
    pub description: String,
    pub created_at: i64,
    pub creator: String,
    pub chunk_size: u32,
    pub min_chunk: (i32, i32, i32),
    pub max_chunk: (i32, i32, i32),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_pos: ChunkPos,
    pub uncompressed_size: u32,
    pub compressed_bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub name: String,
    pub world_pos: (f32, f32, f32),
    pub protection_radius: f32,
    pub description: String,
    pub spawnable: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariationParams {
    pub grass_variation: f32,
    pub flower_density: f32,
    pub tree_variation: f32,
    pub terrain_noise_scale: f32,
    pub terrain_noise_height: f32,
    pub allow_path_variation: bool,
    pub allow_water_variation: bool,
}

impl Default for VariationParams {
    fn default() -> Self {
        Self {
            grass_variation: 0.0,
            flower_density: 0.0,
            tree_variation: 0.0,
            terrain_noise_scale: 0.03,
            terrain_noise_height: 10.0,
            allow_path_variation: false,
            allow_water_variation: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub header: TemplateHeader,
    pub chunks: Vec<ChunkRecord>,
    pub landmarks: Vec<Landmark>,
    pub variation_params: VariationParams,
    pub allow_seed_variations: bool,
}

impl Template {
    pub fn find_chunk(&self, chunk_pos: ChunkPos) -> Option<&ChunkRecord> {
        self.chunks.iter().find(|r| r.chunk_pos == chunk_pos)
    }
}

/// Compresses `bytes` with LZ4, prefixing the uncompressed length so
/// decompression is self-describing (spec.md §6.2 "any general-purpose
/// lossless byte codec").
pub fn compress_chunk_bytes(bytes: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(bytes)
}

pub fn decompress_chunk_bytes(bytes: &[u8]) -> Result<Vec<u8>, crate::error::TemplateError> {
    lz4_flex::decompress_size_prepended(bytes)
        .map_err(|e| crate::error::TemplateError::Decompress(e.to_string()))
}

/// Encodes a whole template to a compact binary blob (postcard).
pub fn encode_template(template: &Template) -> Result<Vec<u8>, crate::error::TemplateError> {
    postcard::to_allocvec(template).map_err(|e| crate::error::TemplateError::Decode(e.to_string()))
}

pub fn decode_template(bytes: &[u8]) -> Result<Template, crate::error::TemplateError> {
    postcard::from_bytes(bytes).map_err(|e| crate::error::TemplateError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_byte_compression_round_trips() {
        let original = vec![1u8, 2, 3, 4, 5, 0, 0, 0, 9];
        let compressed = compress_chunk_bytes(&original);
        let decompressed = decompress_chunk_bytes(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn template_encode_decode_round_trips() {
        let template = Template {
            header: TemplateHeader {
                template_name: "test".into(),
                description: "".into(),
                created_at: 0,
                creator: "".into(),
                chunk_size: 32,
                min_chunk: (0, 0, 0),
                max_chunk: (0, 0, 0),
            },
            chunks: vec![ChunkRecord {
                chunk_pos: ChunkPos::ZERO,
                uncompressed_size: 4,
                compressed_bytes: compress_chunk_bytes(&[1, 2, 3, 4]),
            }],
            landmarks: vec![],
            variation_params: VariationParams::default(),
            allow_seed_variations: true,
        };
        let bytes = encode_template(&template).unwrap();
        let decoded = decode_template(&bytes).unwrap();
        assert_eq!(decoded, template);
    }
}
