use std::sync::Arc;

use crate::block::{BlockType, Cell};
use crate::config::{GenerationConfig, CHUNK_HEIGHT};
use crate::noise_source::{coord_hash, ImprovedNoise, NoiseSource, SeedOffsets};

const ORE_SALT: u32 = 0x9e37_79b9;
const TREE_GATE_SALT: u32 = 0xabc9_8388;
const TRUNK_SALT: u32 = 0x0def_aced;

const LARGE_SCALE: f64 = 0.03;
const DETAIL_SCALE: f64 = 0.08;
const RIDGE_SCALE: f64 = 0.012;
const BIOME_SCALE: f64 = 0.008;

const DIRT_DEPTH: i32 = 3;

/// Per-column terrain parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColumnInfo {
    pub height: i32,
    pub biome: f64,
    pub surface: BlockType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeSite {
    pub x: i32,
    pub z: i32,
    /// Y of the grass cell the trunk stands on.
    pub ground: i32,
    pub trunk_height: i32,
}

impl TreeSite {
    pub fn canopy_base(&self) -> i32 {
        self.ground + self.trunk_height - 1
    }
}

/// A rectangular run of generated columns laid out like chunk storage:
/// `y * width * depth + lz * width + lx`.
#[derive(Clone, Debug)]
pub struct ColumnBatch {
    pub x0: i32,
    pub z0: i32,
    pub width: usize,
    pub depth: usize,
    cells: Vec<Cell>,
}

impl ColumnBatch {
    fn new(x0: i32, z0: i32, width: usize, depth: usize) -> Self {
        Self {
            x0,
            z0,
            width,
            depth,
            cells: vec![None; width * depth * CHUNK_HEIGHT],
        }
    }

    fn index(&self, lx: usize, y: usize, lz: usize) -> usize {
        y * self.width * self.depth + lz * self.width + lx
    }

    fn local(&self, x: i32, y: i32, z: i32) -> Option<(usize, usize, usize)> {
        let lx = i64::from(x) - i64::from(self.x0);
        let lz = i64::from(z) - i64::from(self.z0);
        if lx < 0
            || lz < 0
            || lx >= self.width as i64
            || lz >= self.depth as i64
            || y < 0
            || y >= CHUNK_HEIGHT as i32
        {
            return None;
        }
        Some((lx as usize, y as usize, lz as usize))
    }

    pub fn get(&self, lx: usize, y: usize, lz: usize) -> Cell {
        self.cells[self.index(lx, y, lz)]
    }

    fn set_world(&mut self, x: i32, y: i32, z: i32, cell: Cell) {
        if let Some((lx, ly, lz)) = self.local(x, y, z) {
            let index = self.index(lx, ly, lz);
            self.cells[index] = cell;
        }
    }

    fn fill_if_empty(&mut self, x: i32, y: i32, z: i32, block: BlockType) {
        if let Some((lx, ly, lz)) = self.local(x, y, z) {
            let index = self.index(lx, ly, lz);
            if self.cells[index].is_none() {
                self.cells[index] = Some(block);
            }
        }
    }

    pub fn column(&self, lx: usize, lz: usize) -> Vec<Cell> {
        (0..CHUNK_HEIGHT).map(|y| self.get(lx, y, lz)).collect()
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }
}

/// Deterministic terrain: every cell is a pure function of the seed and its
/// coordinates.
#[derive(Clone)]
pub struct WorldGenerator {
    seed: u32,
    offsets: SeedOffsets,
    config: GenerationConfig,
    noise: Arc<dyn NoiseSource + Send + Sync>,
}

impl WorldGenerator {
    pub fn new(seed: u32, config: GenerationConfig) -> Self {
        Self::with_noise(seed, config, Arc::new(ImprovedNoise::new()))
    }

    pub fn with_noise(
        seed: u32,
        config: GenerationConfig,
        noise: Arc<dyn NoiseSource + Send + Sync>,
    ) -> Self {
        Self {
            seed,
            offsets: SeedOffsets::derive(seed),
            config,
            noise,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn offsets(&self) -> SeedOffsets {
        self.offsets
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn set_seed(&mut self, seed: u32) {
        self.seed = seed;
        self.offsets = SeedOffsets::derive(seed);
    }

    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let p = self.offsets.primary;
        let s = self.offsets.secondary;
        let (fx, fz) = (x as f64, z as f64);

        let large = self.noise.sample(
            (fx + p.x) * LARGE_SCALE,
            p.y * LARGE_SCALE,
            (fz + p.z) * LARGE_SCALE,
        );
        let detail = self.noise.sample(
            (fx + s.x) * DETAIL_SCALE,
            s.y * DETAIL_SCALE,
            (fz + s.z) * DETAIL_SCALE,
        );
        let ridge = self
            .noise
            .sample(
                (fx + p.x * 0.5) * RIDGE_SCALE,
                p.y * 0.5,
                (fz - p.z * 0.5) * RIDGE_SCALE,
            )
            .abs();

        let height = self.config.sea_level as f64 + large * 10.0 + detail * 6.0 + ridge * 8.0;
        height.clamp(3.0, (CHUNK_HEIGHT - 4) as f64).floor() as i32
    }

    pub fn biome_at(&self, x: i32, z: i32) -> f64 {
        let s = self.offsets.secondary;
        self.noise.sample(
            (x as f64 + s.x) * BIOME_SCALE,
            s.y,
            (z as f64 + s.z) * BIOME_SCALE,
        )
    }

    /// Surface selection. Checks run snow, sand, gravel, and the first match wins.
    pub fn surface_block(&self, height: i32, biome: f64) -> BlockType {
        let config = &self.config;
        let snow_line = config.snow_line as f64 + (biome * 8.0).max(0.0);
        if height as f64 >= snow_line {
            BlockType::Snow
        } else if height <= config.sea_level + 1 && biome > -0.2 {
            BlockType::Sand
        } else if biome < -0.45 {
            BlockType::Gravel
        } else {
            BlockType::Grass
        }
    }

    pub fn column_info(&self, x: i32, z: i32) -> ColumnInfo {
        let height = self.height_at(x, z);
        let biome = self.biome_at(x, z);
        ColumnInfo {
            height,
            biome,
            surface: self.surface_block(height, biome),
        }
    }

    fn has_ore(&self, x: i32, y: i32, z: i32) -> bool {
        y <= self.config.sea_level - self.config.ore_max_y_below_sea
            && coord_hash(x, y, z, self.seed ^ ORE_SALT) > self.config.ore_threshold
    }

    /// Terrain and water for one cell, before tree decoration.
    fn terrain_cell(&self, x: i32, y: i32, z: i32, info: &ColumnInfo) -> Cell {
        let height = info.height;
        if y == 0 {
            return Some(BlockType::Stone);
        }
        if y == height {
            return Some(info.surface);
        }
        if y < height {
            if height - y <= DIRT_DEPTH {
                return Some(BlockType::Dirt);
            }
            if self.has_ore(x, y, z) {
                return Some(BlockType::CoalOre);
            }
            return Some(BlockType::Stone);
        }
        if height < self.config.sea_level - 1 && y <= self.config.sea_level {
            return Some(BlockType::Water);
        }
        None
    }

    pub fn tree_site(&self, x: i32, z: i32, info: &ColumnInfo) -> Option<TreeSite> {
        let config = &self.config;
        if info.surface != BlockType::Grass || info.height < config.sea_level {
            return None;
        }
        let ground = info.height;
        if coord_hash(x, ground, z, self.seed ^ TREE_GATE_SALT) < config.tree_threshold {
            return None;
        }
        let extra = (coord_hash(x, ground, z, self.seed ^ TRUNK_SALT) * 3.0).floor() as i32;
        let trunk_height = (config.min_trunk_height + extra).min(config.max_trunk_height);
        Some(TreeSite {
            x,
            z,
            ground,
            trunk_height,
        })
    }

    /// Generates `width * depth` columns starting at (x0, z0). Trees rooted up to
    /// `canopy_radius` columns outside the rectangle still contribute leaves.
    /// Columns past the edge of the `i32` range are left empty.
    pub fn generate_columns(&self, x0: i32, z0: i32, width: usize, depth: usize) -> ColumnBatch {
        let mut batch = ColumnBatch::new(x0, z0, width, depth);
        let radius = self.config.canopy_radius.max(0);
        let pad = i64::from(radius);
        let mut trees = Vec::new();

        let (x0, z0) = (i64::from(x0), i64::from(z0));
        let (x1, z1) = (x0 + width as i64, z0 + depth as i64);
        for z in (z0 - pad)..(z1 + pad) {
            let Ok(z) = i32::try_from(z) else {
                continue;
            };
            for x in (x0 - pad)..(x1 + pad) {
                let Ok(x) = i32::try_from(x) else {
                    continue;
                };
                let info = self.column_info(x, z);
                let (wx, wz) = (i64::from(x), i64::from(z));
                if wx >= x0 && wz >= z0 && wx < x1 && wz < z1 {
                    let top = info.height.max(self.config.sea_level).min(CHUNK_HEIGHT as i32 - 1);
                    for y in 0..=top {
                        let cell = self.terrain_cell(x, y, z, &info);
                        batch.set_world(x, y, z, cell);
                    }
                }
                if let Some(site) = self.tree_site(x, z, &info) {
                    trees.push(site);
                }
            }
        }

        for site in &trees {
            for dy in 1..=site.trunk_height {
                batch.set_world(site.x, site.ground + dy, site.z, Some(BlockType::OakLog));
            }
        }
        for site in &trees {
            self.stamp_canopy(&mut batch, site, radius);
        }

        batch
    }

    fn stamp_canopy(&self, batch: &mut ColumnBatch, site: &TreeSite, radius: i32) {
        let base = site.canopy_base();
        for dy in -2i32..=2 {
            for dx in -radius..=radius {
                for dz in -radius..=radius {
                    let dist = (dx.abs() + dz.abs()) as f32 + dy.abs() as f32 * 0.5;
                    if dist > radius as f32 + 0.5 {
                        continue;
                    }
                    if dy == -2 && dist > 2.0 {
                        continue;
                    }
                    let (Some(x), Some(z)) = (site.x.checked_add(dx), site.z.checked_add(dz)) else {
                        continue;
                    };
                    batch.fill_if_empty(x, base + dy, z, BlockType::OakLeaves);
                }
            }
        }
    }

    pub fn column_at(&self, x: i32, z: i32) -> Vec<Cell> {
        self.generate_columns(x, z, 1, 1).column(0, 0)
    }

    /// Native value of a single cell; empty outside the vertical range.
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> Cell {
        if y < 0 || y >= CHUNK_HEIGHT as i32 {
            return None;
        }
        self.generate_columns(x, z, 1, 1).get(0, y as usize, 0)
    }

    pub fn spawn_height(&self) -> i32 {
        self.height_at(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_gen() -> WorldGenerator {
        WorldGenerator::new(42, GenerationConfig::default())
    }

    #[test]
    fn columns_are_deterministic() {
        let a = test_gen();
        let b = test_gen();
        for (x, z) in [(0, 0), (-17, 33), (250, -4)] {
            assert_eq!(a.height_at(x, z), b.height_at(x, z));
            assert_eq!(a.column_at(x, z), a.column_at(x, z));
            assert_eq!(a.column_at(x, z), b.column_at(x, z));
        }
    }

    #[test]
    fn height_stays_clamped() {
        let gen = test_gen();
        for x in (-200..200).step_by(7) {
            for z in (-200..200).step_by(11) {
                let h = gen.height_at(x, z);
                assert!((3..=(CHUNK_HEIGHT as i32 - 4)).contains(&h), "height {h} at {x},{z}");
            }
        }
    }

    #[test]
    fn column_layers_follow_height() {
        let gen = test_gen();
        for x in -20..20 {
            let z = x * 3;
            let info = gen.column_info(x, z);
            let column = gen.column_at(x, z);
            let h = info.height as usize;
            assert_eq!(column[0], Some(BlockType::Stone), "bedrock layer at {x},{z}");
            assert_eq!(column[h], Some(info.surface), "surface at {x},{z}");
            for y in (h - 3).max(1)..h {
                assert_eq!(column[y], Some(BlockType::Dirt), "dirt at {x},{y},{z}");
            }
            for y in 1..(h - 3) {
                assert!(
                    matches!(column[y], Some(BlockType::Stone) | Some(BlockType::CoalOre)),
                    "stone layer at {x},{y},{z}: {:?}",
                    column[y]
                );
            }
        }
    }

    #[test]
    fn low_columns_are_flooded_to_sea_level() {
        let gen = test_gen();
        let sea = gen.config().sea_level;
        for x in -300..300 {
            let info = gen.column_info(x, 0);
            if info.height >= sea - 1 {
                continue;
            }
            let column = gen.column_at(x, 0);
            for y in (info.height + 1)..=sea {
                assert_eq!(column[y as usize], Some(BlockType::Water), "water at {x},{y}");
            }
        }
    }

    #[test]
    fn surface_order_prefers_snow() {
        let gen = test_gen();
        assert_eq!(gen.surface_block(40, 0.0), BlockType::Snow);
        assert_eq!(gen.surface_block(40, 1.0), BlockType::Grass);
        assert_eq!(gen.surface_block(21, 0.0), BlockType::Sand);
        assert_eq!(gen.surface_block(21, -0.5), BlockType::Gravel);
        assert_eq!(gen.surface_block(25, -0.3), BlockType::Grass);
    }

    #[test]
    fn ore_only_below_threshold_depth() {
        let gen = test_gen();
        let limit = gen.config().sea_level - gen.config().ore_max_y_below_sea;
        for x in -30..30 {
            let column = gen.column_at(x, 11);
            for (y, cell) in column.iter().enumerate() {
                if *cell == Some(BlockType::CoalOre) {
                    assert!(y as i32 <= limit, "ore at y={y}");
                }
            }
        }
    }

    #[test]
    fn batch_matches_single_columns() {
        let gen = test_gen();
        let batch = gen.generate_columns(-8, 40, 16, 16);
        for lz in [0usize, 5, 15] {
            for lx in [0usize, 7, 15] {
                let x = -8 + lx as i32;
                let z = 40 + lz as i32;
                assert_eq!(batch.column(lx, lz), gen.column_at(x, z), "column {x},{z}");
            }
        }
    }

    #[test]
    fn trees_have_trunks_and_leaves() {
        let gen = test_gen();
        let site = (-200..200)
            .flat_map(|x| (-200..200).map(move |z| (x, z)))
            .find_map(|(x, z)| gen.tree_site(x, z, &gen.column_info(x, z)))
            .expect("a tree somewhere in a 400x400 area");
        assert!((4..=6).contains(&site.trunk_height));
        let column = gen.column_at(site.x, site.z);
        for dy in 1..=site.trunk_height {
            assert_eq!(column[(site.ground + dy) as usize], Some(BlockType::OakLog));
        }
        let top = (site.canopy_base() + 2) as usize;
        assert_eq!(column[top], Some(BlockType::OakLeaves));
        let beside = gen.block_at(site.x + 1, site.canopy_base(), site.z);
        assert!(beside.is_some(), "canopy should reach the neighbouring column");
    }

    #[test]
    fn block_at_out_of_range_is_empty() {
        let gen = test_gen();
        assert_eq!(gen.block_at(0, -1, 0), None);
        assert_eq!(gen.block_at(0, CHUNK_HEIGHT as i32, 0), None);
    }

    #[test]
    fn columns_at_the_integer_edges_generate() {
        let gen = test_gen();
        for (x, z) in [(i32::MAX, 0), (i32::MIN, 0), (0, i32::MAX), (i32::MIN, i32::MAX)] {
            let column = gen.column_at(x, z);
            assert_eq!(column[0], Some(BlockType::Stone), "floor at {x},{z}");
            assert_eq!(gen.block_at(x, 0, z), Some(BlockType::Stone));
        }
        let batch = gen.generate_columns(i32::MAX - 1, 0, 4, 1);
        assert_eq!(batch.get(1, 0, 0), Some(BlockType::Stone));
        assert_eq!(batch.get(2, 0, 0), None);
    }

    #[test]
    fn reseeding_changes_offsets() {
        let mut gen = test_gen();
        let before = gen.offsets();
        gen.set_seed(7);
        assert_eq!(gen.seed(), 7);
        assert_ne!(gen.offsets(), before);
        assert_eq!(gen.offsets(), WorldGenerator::new(7, GenerationConfig::default()).offsets());
    }
}
