use std::collections::{BTreeMap, HashMap};

use cgmath::{Matrix4, Vector3};
use log::debug;

use crate::block::{cell_is_opaque, BlockFace, BlockType, Cell};
use crate::chunk::Chunk;
use crate::config::BLOCK_SIZE;
use crate::coords::{BlockPos, ChunkPos, FACE_OFFSETS};
use crate::texture::{Tile, TileCache};
use crate::world::World;

const HALF_BLOCK: f32 = BLOCK_SIZE / 2.0;
const WATER_OPACITY: f32 = 0.65;
const TRANSLUCENT_OPACITY: f32 = 0.82;

pub const RENDER_ORDER_OPAQUE: u32 = 0;
pub const RENDER_ORDER_TRANSPARENT: u32 = 1;

/// Column-major model matrix for one instanced cube.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceTransform {
    pub model: [[f32; 4]; 4],
}

impl InstanceTransform {
    pub fn at_cell(pos: BlockPos) -> Self {
        let centre = Vector3::new(
            pos.x as f32 * BLOCK_SIZE + HALF_BLOCK,
            pos.y as f32 * BLOCK_SIZE + HALF_BLOCK,
            pos.z as f32 * BLOCK_SIZE + HALF_BLOCK,
        );
        Self {
            model: Matrix4::from_translation(centre).into(),
        }
    }

    pub fn translation(&self) -> [f32; 3] {
        let column = self.model[3];
        [column[0], column[1], column[2]]
    }
}

/// Reverse lookup entry from an instance back to its cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceRef {
    pub pos: BlockPos,
    pub block: BlockType,
}

#[derive(Clone, Debug)]
pub struct InstanceBatch {
    pub block: BlockType,
    pub transforms: Vec<InstanceTransform>,
    /// `instances[i]` describes `transforms[i]`.
    pub instances: Vec<InstanceRef>,
    pub transparent: bool,
    pub render_order: u32,
}

impl InstanceBatch {
    fn new(block: BlockType) -> Self {
        let transparent = !block.is_opaque();
        Self {
            block,
            transforms: Vec::new(),
            instances: Vec::new(),
            transparent,
            render_order: if transparent {
                RENDER_ORDER_TRANSPARENT
            } else {
                RENDER_ORDER_OPAQUE
            },
        }
    }

    fn push(&mut self, pos: BlockPos) {
        self.transforms.push(InstanceTransform::at_cell(pos));
        self.instances.push(InstanceRef {
            pos,
            block: self.block,
        });
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

/// The drawable container owned by a chunk.
#[derive(Clone, Debug)]
pub struct ChunkRenderable {
    pos: ChunkPos,
    batches: Vec<InstanceBatch>,
    attached: bool,
}

impl ChunkRenderable {
    pub fn new(pos: ChunkPos) -> Self {
        Self {
            pos,
            batches: Vec::new(),
            attached: true,
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn batches(&self) -> &[InstanceBatch] {
        &self.batches
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn instance_count(&self) -> usize {
        self.batches.iter().map(InstanceBatch::len).sum()
    }

    pub fn instance_at(&self, batch: usize, index: usize) -> Option<&InstanceRef> {
        self.batches.get(batch)?.instances.get(index)
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.batches
            .iter()
            .any(|batch| batch.instances.iter().any(|instance| instance.pos == pos))
    }
}

#[derive(Clone, Debug)]
pub struct FaceMaterial {
    pub face: BlockFace,
    pub tile: Tile,
    pub transparent: bool,
    pub opacity: f32,
    pub double_sided: bool,
}

/// Six face materials per block, ordered +x, -x, +y, -y, +z, -z.
pub struct MaterialCache {
    tiles: TileCache,
    materials: HashMap<BlockType, Vec<FaceMaterial>>,
}

impl MaterialCache {
    pub fn new(seed: u32) -> Self {
        Self {
            tiles: TileCache::new(seed),
            materials: HashMap::new(),
        }
    }

    pub fn reseed(&mut self, seed: u32) {
        if seed != self.tiles.seed() {
            self.tiles.reseed(seed);
            self.materials.clear();
        }
    }

    pub fn material(&mut self, block: BlockType) -> &[FaceMaterial] {
        let tiles = &mut self.tiles;
        self.materials.entry(block).or_insert_with(|| {
            let transparent = !block.is_opaque();
            let opacity = match (transparent, block) {
                (false, _) => 1.0,
                (true, BlockType::Water) => WATER_OPACITY,
                (true, _) => TRANSLUCENT_OPACITY,
            };
            BlockFace::ALL
                .iter()
                .map(|&face| FaceMaterial {
                    face,
                    tile: tiles.tile(block, face).clone(),
                    transparent,
                    opacity,
                    double_sided: transparent,
                })
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// Resolves neighbour cells for one rebuild pass without creating chunks.
struct NeighborLookup<'a> {
    world: &'a World,
    columns: HashMap<(i32, i32), Vec<Cell>>,
}

impl<'a> NeighborLookup<'a> {
    fn new(world: &'a World) -> Self {
        Self {
            world,
            columns: HashMap::new(),
        }
    }

    fn cell(&mut self, pos: BlockPos) -> Cell {
        if !pos.in_vertical_range() {
            return None;
        }
        if let Some(chunk) = self.world.chunk(pos.chunk()) {
            let (lx, y, lz) = pos.local();
            return chunk.get(lx, y, lz);
        }
        let world = self.world;
        self.columns
            .entry((pos.x, pos.z))
            .or_insert_with(|| world.peek_column(pos.x, pos.z))
            .get(pos.y as usize)
            .copied()
            .flatten()
    }
}

/// An opaque cell is hidden when all six neighbours exist and are opaque.
/// Non-opaque cells are always drawn.
fn is_hidden(block: BlockType, pos: BlockPos, lookup: &mut NeighborLookup<'_>) -> bool {
    if !block.is_opaque() {
        return false;
    }
    FACE_OFFSETS.iter().all(|&(dx, dy, dz)| {
        pos.offset(dx, dy, dz)
            .map_or(false, |neighbor| cell_is_opaque(lookup.cell(neighbor)))
    })
}

fn build_batches(chunk: &Chunk, lookup: &mut NeighborLookup<'_>) -> Vec<InstanceBatch> {
    let pos = chunk.pos();
    let mut grouped: BTreeMap<BlockType, InstanceBatch> = BTreeMap::new();

    for (lx, y, lz, block) in chunk.iter_occupied() {
        let cell = BlockPos::from_local(pos, lx, y, lz);
        if is_hidden(block, cell, lookup) {
            continue;
        }
        grouped
            .entry(block)
            .or_insert_with(|| InstanceBatch::new(block))
            .push(cell);
    }

    let mut batches: Vec<InstanceBatch> = grouped.into_values().collect();
    batches.sort_by_key(|batch| (batch.render_order, batch.block));
    batches
}

pub struct MeshBuilder {
    materials: MaterialCache,
}

impl MeshBuilder {
    pub fn new(seed: u32) -> Self {
        Self {
            materials: MaterialCache::new(seed),
        }
    }

    pub fn materials(&self) -> &MaterialCache {
        &self.materials
    }

    pub fn material(&mut self, block: BlockType) -> &[FaceMaterial] {
        self.materials.material(block)
    }

    /// Rebuilds every dirty chunk and clears its flag. Clean chunks are left
    /// untouched. Returns the number of chunks rebuilt.
    pub fn rebuild_dirty(&mut self, world: &mut World) -> usize {
        self.materials.reseed(world.seed());
        let dirty = world.dirty_chunks();
        if dirty.is_empty() {
            return 0;
        }

        let mut rebuilt = Vec::with_capacity(dirty.len());
        {
            let mut lookup = NeighborLookup::new(world);
            for &pos in &dirty {
                if let Some(chunk) = world.chunk(pos) {
                    rebuilt.push((pos, build_batches(chunk, &mut lookup)));
                }
            }
        }

        let mut instances = 0;
        for (pos, batches) in rebuilt {
            for batch in &batches {
                self.materials.material(batch.block);
                instances += batch.len();
            }
            if let Some(chunk) = world.chunk_mut(pos) {
                chunk.set_renderable(ChunkRenderable {
                    pos,
                    batches,
                    attached: true,
                });
                chunk.clear_dirty();
            }
        }
        debug!(
            "rebuilt {} chunks ({instances} instances, {} cached materials)",
            dirty.len(),
            self.materials.len()
        );
        dirty.len()
    }
}
