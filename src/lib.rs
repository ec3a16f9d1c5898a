//! A chunked voxel sandbox: procedural terrain, an edit ledger layered over it,
//! instanced chunk meshes, wandering mobs and JSON persistence.

pub mod block;
pub mod chunk;
pub mod config;
pub mod coords;
pub mod generator;
pub mod mesh;
pub mod mining;
pub mod mob;
pub mod network;
pub mod noise_source;
pub mod persistence;
pub mod raycast;
pub mod texture;
pub mod world;

pub use block::{BlockFace, BlockType, Cell};
pub use chunk::Chunk;
pub use config::{WorldConfig, CHUNK_HEIGHT, CHUNK_SIZE};
pub use coords::{BlockPos, ChunkPos};
pub use generator::WorldGenerator;
pub use mesh::{ChunkRenderable, MeshBuilder};
pub use mob::MobManager;
pub use persistence::{BlobStore, FileBlobStore, MemoryBlobStore, PersistenceError, SaveData};
pub use world::{ChunkLoadReport, World};
