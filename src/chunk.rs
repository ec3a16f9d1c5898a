use crate::block::{cell_is_solid, BlockType, Cell};
use crate::config::{CHUNK_HEIGHT, CHUNK_SIZE};
use crate::coords::{local_index, ChunkPos};
use crate::mesh::ChunkRenderable;

pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;
pub const CHUNK_VOLUME: usize = CHUNK_AREA * CHUNK_HEIGHT;

pub struct Chunk {
    pos: ChunkPos,
    cells: Box<[Cell]>,
    dirty: bool,
    renderable: ChunkRenderable,
}

impl Chunk {
    pub fn new(pos: ChunkPos) -> Self {
        Self::from_cells(pos, vec![None; CHUNK_VOLUME])
    }

    /// Wraps generated cells. Short input is padded with empty cells.
    pub fn from_cells(pos: ChunkPos, mut cells: Vec<Cell>) -> Self {
        cells.resize(CHUNK_VOLUME, None);
        Self {
            pos,
            cells: cells.into_boxed_slice(),
            dirty: true,
            renderable: ChunkRenderable::new(pos),
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn get(&self, lx: usize, y: usize, lz: usize) -> Cell {
        if lx < CHUNK_SIZE && y < CHUNK_HEIGHT && lz < CHUNK_SIZE {
            self.cells[local_index(lx, y, lz)]
        } else {
            None
        }
    }

    /// Returns whether the stored value changed.
    pub fn set(&mut self, lx: usize, y: usize, lz: usize, cell: Cell) -> bool {
        if lx >= CHUNK_SIZE || y >= CHUNK_HEIGHT || lz >= CHUNK_SIZE {
            return false;
        }
        let slot = &mut self.cells[local_index(lx, y, lz)];
        if *slot == cell {
            return false;
        }
        *slot = cell;
        true
    }

    pub fn iter_occupied(&self) -> impl Iterator<Item = (usize, usize, usize, BlockType)> + '_ {
        self.cells.iter().enumerate().filter_map(|(i, cell)| {
            let block = (*cell)?;
            let y = i / CHUNK_AREA;
            let rem = i % CHUNK_AREA;
            Some((rem % CHUNK_SIZE, y, rem / CHUNK_SIZE, block))
        })
    }

    pub fn highest_solid(&self, lx: usize, lz: usize) -> Option<usize> {
        (0..CHUNK_HEIGHT)
            .rev()
            .find(|&y| cell_is_solid(self.get(lx, y, lz)))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn renderable(&self) -> &ChunkRenderable {
        &self.renderable
    }

    pub fn set_renderable(&mut self, renderable: ChunkRenderable) {
        self.renderable = renderable;
    }

    /// Tears the chunk down, handing back its detached render container.
    pub fn into_renderable(mut self) -> ChunkRenderable {
        self.renderable.detach();
        self.renderable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reports_changes_only() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        assert!(chunk.set(3, 10, 4, Some(BlockType::Stone)));
        assert!(!chunk.set(3, 10, 4, Some(BlockType::Stone)));
        assert_eq!(chunk.get(3, 10, 4), Some(BlockType::Stone));
        assert!(!chunk.set(CHUNK_SIZE, 0, 0, Some(BlockType::Stone)));
        assert_eq!(chunk.get(0, CHUNK_HEIGHT, 0), None);
    }

    #[test]
    fn occupied_cells_report_local_coordinates() {
        let mut chunk = Chunk::new(ChunkPos::new(-2, 5));
        chunk.set(15, 63, 1, Some(BlockType::Glass));
        chunk.set(0, 0, 0, Some(BlockType::Stone));
        let cells: Vec<_> = chunk.iter_occupied().collect();
        assert_eq!(
            cells,
            vec![(0, 0, 0, BlockType::Stone), (15, 63, 1, BlockType::Glass)]
        );
    }

    #[test]
    fn highest_solid_skips_water() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.set(2, 5, 2, Some(BlockType::Dirt));
        chunk.set(2, 6, 2, Some(BlockType::Water));
        assert_eq!(chunk.highest_solid(2, 2), Some(5));
        assert_eq!(chunk.highest_solid(1, 1), None);
    }

    #[test]
    fn new_chunks_start_dirty() {
        let mut chunk = Chunk::new(ChunkPos::new(1, 1));
        assert!(chunk.is_dirty());
        chunk.clear_dirty();
        assert!(!chunk.is_dirty());
        let renderable = chunk.into_renderable();
        assert!(!renderable.is_attached());
    }
}
