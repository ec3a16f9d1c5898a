use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

use cgmath::Point3;
use log::{debug, info};

use crate::block::{BlockType, Cell};
use crate::chunk::Chunk;
use crate::config::{WorldConfig, BLOCK_SIZE, CHUNK_HEIGHT, CHUNK_SIZE, SAVE_FORMAT_VERSION};
use crate::coords::{BlockPos, ChunkPos};
use crate::generator::WorldGenerator;
use crate::mesh::ChunkRenderable;
use crate::persistence::{ModifiedBlock, SaveData};

/// Chunks created and evicted by one focal-point update, both sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkLoadReport {
    pub created: Vec<ChunkPos>,
    pub evicted: Vec<ChunkPos>,
}

impl ChunkLoadReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.evicted.is_empty()
    }
}

pub struct World {
    config: WorldConfig,
    generator: WorldGenerator,
    chunks: HashMap<ChunkPos, Chunk>,
    /// Cells whose value differs from the generator's. `None` is an emptied cell.
    modifications: BTreeMap<BlockPos, Cell>,
    last_center: Option<ChunkPos>,
    last_focus: Option<Point3<f32>>,
    detached: Vec<ChunkPos>,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random::<u32>);
        Self::with_seed(seed, config)
    }

    pub fn with_seed(seed: u32, config: WorldConfig) -> Self {
        let generator = WorldGenerator::new(seed, config.generation.clone());
        Self::with_generator(generator, config)
    }

    /// Builds a world over an existing generator, e.g. one with its own
    /// [`NoiseSource`](crate::noise_source::NoiseSource).
    pub fn with_generator(generator: WorldGenerator, config: WorldConfig) -> Self {
        info!("creating world with seed {}", generator.seed());
        Self {
            config,
            generator,
            chunks: HashMap::new(),
            modifications: BTreeMap::new(),
            last_center: None,
            last_focus: None,
            detached: Vec::new(),
        }
    }

    pub fn seed(&self) -> u32 {
        self.generator.seed()
    }

    /// Re-derives the noise offsets. Loaded chunks keep their cells until the
    /// caller reloads.
    pub fn set_seed(&mut self, seed: u32) {
        info!("world seed changed to {seed}");
        self.generator.set_seed(seed);
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn generator(&self) -> &WorldGenerator {
        &self.generator
    }

    pub fn chunks(&self) -> &HashMap<ChunkPos, Chunk> {
        &self.chunks
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    pub(crate) fn chunk_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
        self.chunks.get_mut(&pos)
    }

    pub fn is_loaded(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn loaded_chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn modification_count(&self) -> usize {
        self.modifications.len()
    }

    fn ensure_chunk(&mut self, pos: ChunkPos) -> &mut Chunk {
        match self.chunks.entry(pos) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                slot.insert(generate_chunk(&self.generator, &self.modifications, pos))
            }
        }
    }

    fn detach(&mut self, pos: ChunkPos) {
        if let Some(chunk) = self.chunks.remove(&pos) {
            let renderable = chunk.into_renderable();
            debug!(
                "detached chunk {:?} ({} batches)",
                pos,
                renderable.batches().len()
            );
            self.detached.push(pos);
        }
    }

    pub fn get_block(&mut self, x: i32, y: i32, z: i32) -> Cell {
        let pos = BlockPos::new(x, y, z);
        if !pos.in_vertical_range() {
            return None;
        }
        let (lx, ly, lz) = pos.local();
        self.ensure_chunk(pos.chunk()).get(lx, ly, lz)
    }

    /// Reads a cell without creating its chunk.
    pub fn peek_block(&self, x: i32, y: i32, z: i32) -> Cell {
        let pos = BlockPos::new(x, y, z);
        if !pos.in_vertical_range() {
            return None;
        }
        if let Some(chunk) = self.chunks.get(&pos.chunk()) {
            let (lx, ly, lz) = pos.local();
            return chunk.get(lx, ly, lz);
        }
        match self.modifications.get(&pos) {
            Some(cell) => *cell,
            None => self.generator.block_at(x, y, z),
        }
    }

    /// A whole column without creating its chunk.
    pub fn peek_column(&self, x: i32, z: i32) -> Vec<Cell> {
        let probe = BlockPos::new(x, 0, z);
        if let Some(chunk) = self.chunks.get(&probe.chunk()) {
            let (lx, _, lz) = probe.local();
            return (0..CHUNK_HEIGHT).map(|y| chunk.get(lx, y, lz)).collect();
        }
        let mut column = self.generator.column_at(x, z);
        let plane =
            BlockPos::new(x, 0, i32::MIN)..=BlockPos::new(x, CHUNK_HEIGHT as i32 - 1, i32::MAX);
        if self.modifications.range(plane).next().is_none() {
            return column;
        }
        for (y, slot) in column.iter_mut().enumerate() {
            if let Some(cell) = self.modifications.get(&BlockPos::new(x, y as i32, z)) {
                *slot = *cell;
            }
        }
        column
    }

    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: BlockType) -> bool {
        self.set_cell(BlockPos::new(x, y, z), Some(block))
    }

    pub fn remove_block(&mut self, x: i32, y: i32, z: i32) -> bool {
        self.set_cell(BlockPos::new(x, y, z), None)
    }

    /// Writes a cell, keeping the ledger minimal and invalidating every chunk
    /// whose meshing can see the cell. Returns `false` when nothing changed.
    pub fn set_cell(&mut self, pos: BlockPos, cell: Cell) -> bool {
        if !pos.in_vertical_range() {
            return false;
        }
        let chunk_pos = pos.chunk();
        let (lx, ly, lz) = pos.local();
        if !self.ensure_chunk(chunk_pos).set(lx, ly, lz, cell) {
            return false;
        }

        if self.generator.block_at(pos.x, pos.y, pos.z) == cell {
            self.modifications.remove(&pos);
        } else {
            self.modifications.insert(pos, cell);
        }

        self.mark_dirty(chunk_pos);
        for neighbor in pos.bordering_chunks() {
            self.mark_dirty(neighbor);
        }
        true
    }

    pub fn mark_dirty(&mut self, pos: ChunkPos) {
        if let Some(chunk) = self.chunks.get_mut(&pos) {
            chunk.mark_dirty();
        }
    }

    pub fn is_dirty(&self, pos: ChunkPos) -> bool {
        self.chunks.get(&pos).map_or(false, Chunk::is_dirty)
    }

    pub fn dirty_chunks(&self) -> Vec<ChunkPos> {
        let mut dirty: Vec<_> = self
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.is_dirty())
            .map(|(pos, _)| *pos)
            .collect();
        dirty.sort();
        dirty
    }

    /// Loads the square of chunks around the focal point and evicts the rest.
    /// Repeated calls from the same chunk do nothing.
    pub fn update_around_player(&mut self, focus: Point3<f32>) -> ChunkLoadReport {
        self.last_focus = Some(focus);
        let center = ChunkPos::from_world(focus.x, focus.z);
        if self.last_center == Some(center) {
            return ChunkLoadReport::default();
        }
        self.last_center = Some(center);

        let radius = self.config.render_distance.max(0);
        let mut report = ChunkLoadReport::default();
        let mut required = HashSet::new();
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                let Some(pos) = center.offset(dx, dz) else {
                    continue;
                };
                required.insert(pos);
                if let Entry::Vacant(slot) = self.chunks.entry(pos) {
                    slot.insert(generate_chunk(&self.generator, &self.modifications, pos));
                    report.created.push(pos);
                }
            }
        }

        let mut stale: Vec<ChunkPos> = self
            .chunks
            .keys()
            .filter(|pos| !required.contains(pos))
            .copied()
            .collect();
        stale.sort();
        for pos in &stale {
            self.detach(*pos);
        }
        report.evicted = stale;
        report.created.sort();

        info!(
            "focal chunk now ({}, {}): {} created, {} evicted, {} loaded",
            center.x,
            center.z,
            report.created.len(),
            report.evicted.len(),
            self.chunks.len()
        );
        report
    }

    /// Positions whose render containers were detached since the last call.
    pub fn take_detached(&mut self) -> Vec<ChunkPos> {
        std::mem::take(&mut self.detached)
    }

    pub fn highest_solid_block_y(&mut self, x: i32, z: i32) -> Option<i32> {
        let pos = BlockPos::new(x, 0, z);
        let (lx, _, lz) = pos.local();
        self.ensure_chunk(pos.chunk())
            .highest_solid(lx, lz)
            .map(|y| y as i32)
    }

    pub fn spawn_position(&self) -> Point3<f32> {
        let height = self.generator.spawn_height();
        Point3::new(BLOCK_SIZE / 2.0, height as f32 + 4.0, BLOCK_SIZE / 2.0)
    }

    pub fn renderable_chunks(&self) -> impl Iterator<Item = &ChunkRenderable> + '_ {
        self.chunks.values().map(Chunk::renderable)
    }

    pub fn serialize(&self) -> SaveData {
        SaveData {
            version: SAVE_FORMAT_VERSION,
            chunk_size: CHUNK_SIZE,
            chunk_height: CHUNK_HEIGHT,
            seed: Some(self.seed()),
            modified_blocks: self
                .modifications
                .iter()
                .map(|(pos, cell)| ModifiedBlock {
                    x: pos.x,
                    y: pos.y,
                    z: pos.z,
                    type_id: cell.map(|block| block.id().to_string()),
                })
                .collect(),
        }
    }

    /// Replaces all chunks and the ledger with `data`, then reloads around the
    /// last focal point.
    pub fn load(&mut self, data: &SaveData) -> ChunkLoadReport {
        let mut discarded: Vec<ChunkPos> = self.chunks.keys().copied().collect();
        discarded.sort();
        for pos in discarded {
            self.detach(pos);
        }
        self.modifications.clear();

        if let Some(seed) = data.seed {
            self.set_seed(seed);
        }

        let mut redundant = 0;
        for entry in &data.modified_blocks {
            let pos = BlockPos::new(entry.x, entry.y, entry.z);
            if !pos.in_vertical_range() {
                continue;
            }
            let cell = entry.type_id.as_deref().map(BlockType::resolve);
            if self.generator.block_at(pos.x, pos.y, pos.z) == cell {
                redundant += 1;
                continue;
            }
            self.modifications.insert(pos, cell);
        }
        info!(
            "loaded {} modified cells ({redundant} matched generated terrain)",
            self.modifications.len()
        );

        self.last_center = None;
        let focus = self.last_focus.unwrap_or_else(|| Point3::new(0.0, 0.0, 0.0));
        self.update_around_player(focus)
    }
}

/// Generated terrain for one chunk with its ledger entries laid over it.
fn generate_chunk(
    generator: &WorldGenerator,
    modifications: &BTreeMap<BlockPos, Cell>,
    pos: ChunkPos,
) -> Chunk {
    let batch = generator.generate_columns(pos.origin_x(), pos.origin_z(), CHUNK_SIZE, CHUNK_SIZE);
    let mut chunk = Chunk::from_cells(pos, batch.into_cells());

    let x0 = pos.origin_x();
    let x1 = x0 + CHUNK_SIZE as i32 - 1;
    let range = BlockPos::new(x0, i32::MIN, i32::MIN)..=BlockPos::new(x1, i32::MAX, i32::MAX);
    let mut overlaid = 0;
    for (block_pos, cell) in modifications.range(range) {
        if block_pos.chunk() != pos {
            continue;
        }
        let (lx, y, lz) = block_pos.local();
        chunk.set(lx, y, lz, *cell);
        overlaid += 1;
    }
    debug!("generated chunk {:?} ({overlaid} modified cells)", pos);
    chunk
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_world(render_distance: i32) -> World {
        World::with_seed(42, WorldConfig::default().with_render_distance(render_distance))
    }

    fn foreign_block(native: Cell) -> BlockType {
        if native == Some(BlockType::Glass) {
            BlockType::Cobblestone
        } else {
            BlockType::Glass
        }
    }

    #[test]
    fn vertical_out_of_range_is_empty() {
        let mut world = test_world(1);
        assert_eq!(world.get_block(4, -1, 4), None);
        assert_eq!(world.get_block(4, CHUNK_HEIGHT as i32, 4), None);
        assert!(!world.set_block(4, -1, 4, BlockType::Stone));
        assert!(!world.remove_block(4, CHUNK_HEIGHT as i32, 4));
        assert_eq!(world.modification_count(), 0);
    }

    #[test]
    fn get_block_creates_chunk_but_peek_does_not() {
        let mut world = test_world(1);
        let native = world.peek_block(100, 5, 100);
        assert_eq!(world.loaded_chunk_count(), 0);
        assert_eq!(world.get_block(100, 5, 100), native);
        assert!(world.is_loaded(ChunkPos::new(6, 6)));
    }

    #[test]
    fn extreme_coordinates_are_total() {
        let mut world = test_world(1);
        let native = world.peek_block(i32::MAX, 10, 0);
        assert_eq!(world.get_block(i32::MAX, 10, 0), native);
        let edited = foreign_block(world.peek_block(i32::MIN, 10, 0));
        assert!(world.set_block(i32::MIN, 10, 0, edited));
        assert_eq!(world.get_block(i32::MIN, 10, 0), Some(edited));

        assert!(world.remove_block(i32::MAX, 0, i32::MIN));
        assert_eq!(world.peek_block(i32::MAX, 0, i32::MIN), None);
        assert!(world.highest_solid_block_y(i32::MAX, i32::MIN).is_some());

        let corner = ChunkPos::new(ChunkPos::MAX_COORD, ChunkPos::MIN_COORD);
        let report = world.update_around_player(Point3::new(1e12, 0.0, -1e12));
        assert_eq!(world.loaded_chunk_count(), 4);
        assert!(world.is_loaded(corner));
        assert!(!report.created.contains(&corner));
        assert_eq!(report.created.len(), 3);
        assert_eq!(report.evicted.len(), 2);
    }

    #[test]
    fn unloaded_columns_read_only_their_own_edits() {
        let mut world = test_world(0);
        let mut data = world.serialize();
        for (z, id) in [(99, "glass"), (100, "oak_planks"), (101, "sand")] {
            data.modified_blocks.push(ModifiedBlock {
                x: 100,
                y: 62,
                z,
                type_id: Some(id.into()),
            });
        }
        world.load(&data);
        assert!(!world.is_loaded(BlockPos::new(100, 0, 100).chunk()));

        let column = world.peek_column(100, 100);
        assert_eq!(column[62], Some(BlockType::OakPlanks));
        assert_eq!(column[63], None);
        assert_eq!(world.peek_column(100, 101)[62], Some(BlockType::Sand));
        assert_eq!(world.peek_column(101, 100), world.generator().column_at(101, 100));
    }

    #[test]
    fn ledger_tracks_only_differences() {
        let mut world = test_world(1);
        let native = world.generator().block_at(3, 12, 3);
        let other = foreign_block(native);

        assert!(world.set_block(3, 12, 3, other));
        assert!(!world.set_block(3, 12, 3, other));
        assert_eq!(world.modification_count(), 1);

        assert!(world.set_cell(BlockPos::new(3, 12, 3), native));
        assert_eq!(world.modification_count(), 0);
    }

    #[test]
    fn emptied_cells_are_recorded() {
        let mut world = test_world(1);
        assert!(world.remove_block(0, 0, 0));
        let data = world.serialize();
        assert_eq!(data.modified_blocks.len(), 1);
        assert_eq!(data.modified_blocks[0].type_id, None);
    }

    #[test]
    fn edits_on_chunk_edges_dirty_neighbours() {
        let mut world = test_world(1);
        world.update_around_player(Point3::new(8.0, 30.0, 8.0));
        let loaded: Vec<_> = world.chunks().keys().copied().collect();
        for pos in loaded {
            if let Some(chunk) = world.chunk_mut(pos) {
                chunk.clear_dirty();
            }
        }

        let native = world.peek_block(0, 30, 15);
        world.set_block(0, 30, 15, foreign_block(native));
        assert_eq!(
            world.dirty_chunks(),
            vec![ChunkPos::new(-1, 0), ChunkPos::new(0, 0), ChunkPos::new(0, 1)]
        );
    }

    #[test]
    fn focal_updates_are_cached_per_chunk() {
        let mut world = test_world(1);
        let first = world.update_around_player(Point3::new(1.0, 0.0, 1.0));
        assert_eq!(first.created.len(), 9);
        assert!(world.update_around_player(Point3::new(15.0, 0.0, 3.0)).is_empty());
    }

    #[test]
    fn evicted_chunks_are_reported_as_detached() {
        let mut world = test_world(0);
        world.update_around_player(Point3::new(0.0, 0.0, 0.0));
        let report = world.update_around_player(Point3::new(-20.0, 0.0, 0.0));
        assert_eq!(report.created, vec![ChunkPos::new(-2, 0)]);
        assert_eq!(report.evicted, vec![ChunkPos::new(0, 0)]);
        assert_eq!(world.take_detached(), vec![ChunkPos::new(0, 0)]);
        assert!(world.take_detached().is_empty());
    }

    #[test]
    fn highest_solid_matches_generated_height() {
        let mut world = test_world(0);
        let gen_height = world.generator().height_at(20, -7);
        let top = world.highest_solid_block_y(20, -7).expect("terrain column");
        assert!(top >= gen_height, "top {top} below terrain {gen_height}");
    }

    #[test]
    fn spawn_position_sits_above_origin_terrain() {
        let world = test_world(0);
        let spawn = world.spawn_position();
        assert_eq!(spawn.x, 0.5);
        assert_eq!(spawn.z, 0.5);
        assert_eq!(spawn.y, (world.generator().spawn_height() + 4) as f32);
    }

    #[test]
    fn load_replaces_ledger_and_chunks() {
        let mut world = test_world(1);
        world.update_around_player(Point3::new(0.0, 0.0, 0.0));
        let native = world.peek_block(2, 40, 2);
        world.set_block(2, 40, 2, foreign_block(native));
        let saved = world.serialize();

        let mut other = World::with_seed(7, WorldConfig::default().with_render_distance(1));
        other.remove_block(9, 9, 9);
        other.update_around_player(Point3::new(0.0, 0.0, 0.0));
        other.take_detached();

        other.load(&saved);
        assert_eq!(other.seed(), 42);
        assert_eq!(other.serialize(), saved);
        assert_eq!(other.take_detached().len(), 9);
        assert_eq!(other.loaded_chunk_count(), 9);
        assert_eq!(other.get_block(2, 40, 2), Some(foreign_block(native)));
    }

    #[test]
    fn load_drops_entries_matching_terrain() {
        let mut world = test_world(0);
        let native = world.generator().block_at(1, 1, 1);
        let mut data = world.serialize();
        data.modified_blocks.push(ModifiedBlock {
            x: 1,
            y: 1,
            z: 1,
            type_id: native.map(|block| block.id().to_string()),
        });
        data.modified_blocks.push(ModifiedBlock {
            x: 1,
            y: 99,
            z: 1,
            type_id: Some("stone".into()),
        });
        world.load(&data);
        assert_eq!(world.modification_count(), 0);
    }
}
