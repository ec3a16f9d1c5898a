use std::collections::HashMap;

use crate::block::{BlockFace, BlockType};
use crate::noise_source::{coord_hash, string_hash};

pub const TILE_SIZE: usize = 16;

const EDGE_DARKENING: f32 = 0.82;
const FINE_NOISE_WEIGHT: f32 = 0.45;
const HIGHLIGHT_ROWS: usize = 3;

/// A square RGB8 tile, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pub size: usize,
    pub rgb: Vec<u8>,
}

impl Tile {
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = (y * self.size + x) * 3;
        [self.rgb[idx], self.rgb[idx + 1], self.rgb[idx + 2]]
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).floor() as u8
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn fill_tile<F>(size: usize, mut f: F) -> Tile
where
    F: FnMut(usize, usize) -> [f32; 3],
{
    let mut rgb = vec![0u8; size * size * 3];
    for y in 0..size {
        for x in 0..size {
            let color = f(x, y);
            let idx = (y * size + x) * 3;
            rgb[idx] = to_u8(color[0]);
            rgb[idx + 1] = to_u8(color[1]);
            rgb[idx + 2] = to_u8(color[2]);
        }
    }
    Tile { size, rgb }
}

/// Synthesises the tile for one face of a block. Identical inputs always give
/// identical bytes.
pub fn generate_tile(block: BlockType, face: BlockFace, seed: u32) -> Tile {
    let params = block.texture(face);
    let base = params.rgb();
    let salt = (string_hash(&format!("{}:{}", block.id(), face.salt())) ^ seed) as i32;
    let last = (TILE_SIZE - 1) as f32;

    fill_tile(TILE_SIZE, |x, y| {
        let (xi, yi) = (x as i32, y as i32);
        let coarse =
            coord_hash(xi.wrapping_add(salt), yi.wrapping_add(salt), salt, seed) as f32 - 0.5;
        let fine = coord_hash(
            xi.wrapping_mul(7).wrapping_add(salt),
            yi.wrapping_mul(13).wrapping_add(salt),
            salt.wrapping_mul(3),
            seed,
        ) as f32
            - 0.5;

        let mut shade = params.brightness;
        shade *= 1.0 + coarse * params.noise;
        shade *= 1.0 + fine * params.noise * FINE_NOISE_WEIGHT;
        shade *= 1.0 - (y as f32 / last) * params.shadow;

        let edge = x.min(TILE_SIZE - 1 - x).min(y).min(TILE_SIZE - 1 - y) as f32;
        shade *= lerp(EDGE_DARKENING, 1.0, edge / (TILE_SIZE / 2) as f32);

        if y < HIGHLIGHT_ROWS {
            shade *= 1.0 + params.highlight;
        }
        [base[0] * shade, base[1] * shade, base[2] * shade]
    })
}

/// Memoises tiles per (block, face) for one world seed.
#[derive(Default)]
pub struct TileCache {
    seed: u32,
    tiles: HashMap<(BlockType, BlockFace), Tile>,
}

impl TileCache {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            tiles: HashMap::new(),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Drops every cached tile when the seed differs.
    pub fn reseed(&mut self, seed: u32) {
        if seed != self.seed {
            self.seed = seed;
            self.tiles.clear();
        }
    }

    pub fn tile(&mut self, block: BlockType, face: BlockFace) -> &Tile {
        let seed = self.seed;
        self.tiles
            .entry((block, face))
            .or_insert_with(|| generate_tile(block, face, seed))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
