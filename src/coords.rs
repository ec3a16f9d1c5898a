use serde::{Deserialize, Serialize};

use crate::config::{CHUNK_HEIGHT, CHUNK_SIZE};

const SIZE: i32 = CHUNK_SIZE as i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    /// Chunk coordinates whose cells all fit in `i32`.
    pub const MIN_COORD: i32 = i32::MIN.div_euclid(SIZE);
    pub const MAX_COORD: i32 = i32::MAX.div_euclid(SIZE);

    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing a continuous focal-point position, clamped to the
    /// addressable range.
    pub fn from_world(x: f32, z: f32) -> Self {
        let axis = |v: f32| {
            ((v / CHUNK_SIZE as f32).floor() as i32).clamp(Self::MIN_COORD, Self::MAX_COORD)
        };
        Self { x: axis(x), z: axis(z) }
    }

    pub fn is_addressable(self) -> bool {
        (Self::MIN_COORD..=Self::MAX_COORD).contains(&self.x)
            && (Self::MIN_COORD..=Self::MAX_COORD).contains(&self.z)
    }

    pub fn origin_x(self) -> i32 {
        self.x.saturating_mul(SIZE)
    }

    pub fn origin_z(self) -> i32 {
        self.z.saturating_mul(SIZE)
    }

    /// `None` when the neighbour would fall outside the addressable range.
    pub fn offset(self, dx: i32, dz: i32) -> Option<Self> {
        let pos = Self::new(self.x.checked_add(dx)?, self.z.checked_add(dz)?);
        pos.is_addressable().then_some(pos)
    }
}

/// A world-space cell. Ordering is lexicographic on (x, y, z) and is the order
/// in which modified cells are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn in_vertical_range(self) -> bool {
        self.y >= 0 && self.y < CHUNK_HEIGHT as i32
    }

    pub fn chunk(self) -> ChunkPos {
        ChunkPos::new(self.x.div_euclid(SIZE), self.z.div_euclid(SIZE))
    }

    /// Offset inside the owning chunk as (lx, y, lz).
    pub fn local(self) -> (usize, usize, usize) {
        let chunk = self.chunk();
        (
            (self.x - chunk.origin_x()) as usize,
            self.y as usize,
            (self.z - chunk.origin_z()) as usize,
        )
    }

    /// `None` when any axis overflows.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Option<Self> {
        Some(Self::new(
            self.x.checked_add(dx)?,
            self.y.checked_add(dy)?,
            self.z.checked_add(dz)?,
        ))
    }

    pub fn from_local(chunk: ChunkPos, lx: usize, y: usize, lz: usize) -> Self {
        Self::new(
            chunk.origin_x() + lx as i32,
            y as i32,
            chunk.origin_z() + lz as i32,
        )
    }

    /// Horizontally adjacent chunks that share a face with this cell.
    pub fn bordering_chunks(self) -> Vec<ChunkPos> {
        let chunk = self.chunk();
        let (lx, _, lz) = self.local();
        let mut neighbors = Vec::with_capacity(2);
        if lx == 0 {
            neighbors.extend(chunk.offset(-1, 0));
        }
        if lx == CHUNK_SIZE - 1 {
            neighbors.extend(chunk.offset(1, 0));
        }
        if lz == 0 {
            neighbors.extend(chunk.offset(0, -1));
        }
        if lz == CHUNK_SIZE - 1 {
            neighbors.extend(chunk.offset(0, 1));
        }
        neighbors
    }
}

pub const fn local_index(lx: usize, y: usize, lz: usize) -> usize {
    y * CHUNK_SIZE * CHUNK_SIZE + lz * CHUNK_SIZE + lx
}

pub const FACE_OFFSETS: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_coordinates_map_into_chunk() {
        let pos = BlockPos::new(-1, 5, -17);
        assert_eq!(pos.chunk(), ChunkPos::new(-1, -2));
        assert_eq!(pos.local(), (15, 5, 15));
    }

    #[test]
    fn world_to_local_is_a_bijection() {
        for x in -40..40 {
            for z in [-33, -16, -1, 0, 15, 16, 31] {
                let pos = BlockPos::new(x, 7, z);
                let (lx, y, lz) = pos.local();
                assert!(lx < CHUNK_SIZE && lz < CHUNK_SIZE);
                assert_eq!(BlockPos::from_local(pos.chunk(), lx, y, lz), pos);
            }
        }
    }

    #[test]
    fn local_index_layout() {
        assert_eq!(local_index(0, 0, 0), 0);
        assert_eq!(local_index(1, 0, 0), 1);
        assert_eq!(local_index(0, 0, 1), CHUNK_SIZE);
        assert_eq!(local_index(0, 1, 0), CHUNK_SIZE * CHUNK_SIZE);
        assert_eq!(
            local_index(CHUNK_SIZE - 1, CHUNK_HEIGHT - 1, CHUNK_SIZE - 1),
            CHUNK_SIZE * CHUNK_SIZE * CHUNK_HEIGHT - 1
        );
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut positions = vec![
            BlockPos::new(1, 0, 0),
            BlockPos::new(0, 5, 0),
            BlockPos::new(0, 0, 9),
            BlockPos::new(-3, 60, 2),
        ];
        positions.sort();
        assert_eq!(
            positions,
            vec![
                BlockPos::new(-3, 60, 2),
                BlockPos::new(0, 0, 9),
                BlockPos::new(0, 5, 0),
                BlockPos::new(1, 0, 0),
            ]
        );
    }

    #[test]
    fn bordering_chunks_only_at_edges() {
        assert!(BlockPos::new(5, 3, 5).bordering_chunks().is_empty());
        assert_eq!(
            BlockPos::new(0, 3, 15).bordering_chunks(),
            vec![ChunkPos::new(-1, 0), ChunkPos::new(0, 1)]
        );
    }

    #[test]
    fn focal_chunk_uses_floor() {
        assert_eq!(ChunkPos::from_world(-0.5, 15.9), ChunkPos::new(-1, 0));
        assert_eq!(ChunkPos::from_world(16.0, -16.0), ChunkPos::new(1, -1));
    }

    #[test]
    fn far_focal_points_clamp_to_addressable_chunks() {
        let far = ChunkPos::from_world(1e12, -1e12);
        assert_eq!(far, ChunkPos::new(ChunkPos::MAX_COORD, ChunkPos::MIN_COORD));
        assert_eq!(far.origin_x() + CHUNK_SIZE as i32 - 1, i32::MAX);
        assert_eq!(far.origin_z(), i32::MIN);
        assert_eq!(far.offset(1, 0), None);
        assert_eq!(
            far.offset(-1, 1),
            Some(ChunkPos::new(ChunkPos::MAX_COORD - 1, ChunkPos::MIN_COORD + 1))
        );
        assert_eq!(ChunkPos::from_world(f32::NAN, 0.0), ChunkPos::new(0, 0));
    }

    #[test]
    fn edge_cells_have_no_overflowing_neighbours() {
        let edge = BlockPos::new(i32::MAX, 3, i32::MIN);
        assert_eq!(edge.offset(1, 0, 0), None);
        assert_eq!(edge.offset(0, 0, -1), None);
        assert_eq!(
            edge.offset(-1, 0, 1),
            Some(BlockPos::new(i32::MAX - 1, 3, i32::MIN + 1))
        );
        assert!(edge.bordering_chunks().is_empty());
        let (lx, _, lz) = edge.local();
        assert_eq!((lx, lz), (CHUNK_SIZE - 1, 0));
    }
}
