use serde::{Deserialize, Serialize};

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockType {
    Grass,
    Dirt,
    Stone,
    Cobblestone,
    Sand,
    Gravel,
    Snow,
    Water,
    CoalOre,
    OakLog,
    OakLeaves,
    OakPlanks,
    Glass,
    Bedrock,
}

pub const DEFAULT_BLOCK: BlockType = BlockType::Grass;

/// A voxel cell. `None` is empty space.
pub type Cell = Option<BlockType>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockFace {
    East,
    West,
    Top,
    Bottom,
    South,
    North,
}

impl BlockFace {
    pub const ALL: [BlockFace; 6] = [
        BlockFace::East,
        BlockFace::West,
        BlockFace::Top,
        BlockFace::Bottom,
        BlockFace::South,
        BlockFace::North,
    ];

    pub fn normal(self) -> (i32, i32, i32) {
        match self {
            BlockFace::East => (1, 0, 0),
            BlockFace::West => (-1, 0, 0),
            BlockFace::Top => (0, 1, 0),
            BlockFace::Bottom => (0, -1, 0),
            BlockFace::South => (0, 0, 1),
            BlockFace::North => (0, 0, -1),
        }
    }

    /// Short axis name used to salt per-face textures.
    pub fn salt(self) -> &'static str {
        match self {
            BlockFace::East => "px",
            BlockFace::West => "nx",
            BlockFace::Top => "py",
            BlockFace::Bottom => "ny",
            BlockFace::South => "pz",
            BlockFace::North => "nz",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Pickaxe,
    Shovel,
    Axe,
    Shears,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Hardness {
    Finite(f32),
    Unbreakable,
}

impl Hardness {
    /// Seconds of base mining effort, or `None` when the block cannot be broken.
    pub fn seconds(self) -> Option<f32> {
        match self {
            Hardness::Finite(value) if value > 0.0 => Some(value),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureParams {
    pub color: u32,
    pub noise: f32,
    pub brightness: f32,
    pub highlight: f32,
    pub shadow: f32,
}

impl TextureParams {
    pub const fn new(color: u32, noise: f32, brightness: f32) -> Self {
        Self {
            color,
            noise,
            brightness,
            highlight: 0.08,
            shadow: 0.12,
        }
    }

    pub const fn with_shading(mut self, highlight: f32, shadow: f32) -> Self {
        self.highlight = highlight;
        self.shadow = shadow;
        self
    }

    pub fn rgb(&self) -> [f32; 3] {
        [
            ((self.color >> 16) & 0xFF) as f32 / 255.0,
            ((self.color >> 8) & 0xFF) as f32 / 255.0,
            (self.color & 0xFF) as f32 / 255.0,
        ]
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FaceTextures {
    pub top: TextureParams,
    pub side: TextureParams,
    pub bottom: TextureParams,
}

impl FaceTextures {
    pub const fn uniform(params: TextureParams) -> Self {
        Self {
            top: params,
            side: params,
            bottom: params,
        }
    }

    pub const fn with_top_bottom(
        side: TextureParams,
        top: TextureParams,
        bottom: TextureParams,
    ) -> Self {
        Self { top, side, bottom }
    }

    pub fn face(&self, face: BlockFace) -> TextureParams {
        match face {
            BlockFace::Top => self.top,
            BlockFace::Bottom => self.bottom,
            _ => self.side,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BlockInfo {
    pub id: &'static str,
    pub label_key: &'static str,
    pub is_solid: bool,
    pub is_opaque: bool,
    pub hardness: Hardness,
    pub preferred_tool: Option<ToolKind>,
    pub textures: FaceTextures,
}

pub const VARIANT_COUNT: usize = 14;

const ALL_BLOCKS: [BlockType; VARIANT_COUNT] = [
    BlockType::Grass,
    BlockType::Dirt,
    BlockType::Stone,
    BlockType::Cobblestone,
    BlockType::Sand,
    BlockType::Gravel,
    BlockType::Snow,
    BlockType::Water,
    BlockType::CoalOre,
    BlockType::OakLog,
    BlockType::OakLeaves,
    BlockType::OakPlanks,
    BlockType::Glass,
    BlockType::Bedrock,
];

const DIRT_TEXTURE: TextureParams = TextureParams::new(0x8d6e63, 0.16, 1.0);

const BLOCK_INFOS: [BlockInfo; VARIANT_COUNT] = [
    BlockInfo {
        id: "grass",
        label_key: "block.grass",
        is_solid: true,
        is_opaque: true,
        hardness: Hardness::Finite(0.6),
        preferred_tool: Some(ToolKind::Shovel),
        textures: FaceTextures::with_top_bottom(
            TextureParams::new(0x6f8f3e, 0.14, 1.0),
            TextureParams::new(0x4caf50, 0.18, 1.05).with_shading(0.1, 0.05),
            DIRT_TEXTURE,
        ),
    },
    BlockInfo {
        id: "dirt",
        label_key: "block.dirt",
        is_solid: true,
        is_opaque: true,
        hardness: Hardness::Finite(0.5),
        preferred_tool: Some(ToolKind::Shovel),
        textures: FaceTextures::uniform(DIRT_TEXTURE),
    },
    BlockInfo {
        id: "stone",
        label_key: "block.stone",
        is_solid: true,
        is_opaque: true,
        hardness: Hardness::Finite(1.5),
        preferred_tool: Some(ToolKind::Pickaxe),
        textures: FaceTextures::uniform(TextureParams::new(0x9e9e9e, 0.12, 1.0)),
    },
    BlockInfo {
        id: "cobblestone",
        label_key: "block.cobblestone",
        is_solid: true,
        is_opaque: true,
        hardness: Hardness::Finite(2.0),
        preferred_tool: Some(ToolKind::Pickaxe),
        textures: FaceTextures::uniform(
            TextureParams::new(0x7f7f7f, 0.28, 1.0).with_shading(0.05, 0.18),
        ),
    },
    BlockInfo {
        id: "sand",
        label_key: "block.sand",
        is_solid: true,
        is_opaque: true,
        hardness: Hardness::Finite(0.5),
        preferred_tool: Some(ToolKind::Shovel),
        textures: FaceTextures::uniform(TextureParams::new(0xe8d8a0, 0.08, 1.02)),
    },
    BlockInfo {
        id: "gravel",
        label_key: "block.gravel",
        is_solid: true,
        is_opaque: true,
        hardness: Hardness::Finite(0.6),
        preferred_tool: Some(ToolKind::Shovel),
        textures: FaceTextures::uniform(TextureParams::new(0x8a8580, 0.3, 0.98)),
    },
    BlockInfo {
        id: "snow",
        label_key: "block.snow",
        is_solid: true,
        is_opaque: true,
        hardness: Hardness::Finite(0.2),
        preferred_tool: Some(ToolKind::Shovel),
        textures: FaceTextures::with_top_bottom(
            TextureParams::new(0xe6eef2, 0.06, 1.0),
            TextureParams::new(0xfafafa, 0.04, 1.05).with_shading(0.04, 0.04),
            DIRT_TEXTURE,
        ),
    },
    BlockInfo {
        id: "water",
        label_key: "block.water",
        is_solid: false,
        is_opaque: false,
        hardness: Hardness::Unbreakable,
        preferred_tool: None,
        textures: FaceTextures::uniform(
            TextureParams::new(0x3f76e4, 0.1, 1.0).with_shading(0.12, 0.08),
        ),
    },
    BlockInfo {
        id: "coal_ore",
        label_key: "block.coal_ore",
        is_solid: true,
        is_opaque: true,
        hardness: Hardness::Finite(1.8),
        preferred_tool: Some(ToolKind::Pickaxe),
        textures: FaceTextures::uniform(TextureParams::new(0x6b6b6b, 0.45, 0.95)),
    },
    BlockInfo {
        id: "oak_log",
        label_key: "block.oak_log",
        is_solid: true,
        is_opaque: true,
        hardness: Hardness::Finite(1.0),
        preferred_tool: Some(ToolKind::Axe),
        textures: FaceTextures::with_top_bottom(
            TextureParams::new(0x6d4c30, 0.22, 1.0),
            TextureParams::new(0xb08a57, 0.1, 1.0),
            TextureParams::new(0xb08a57, 0.1, 1.0),
        ),
    },
    BlockInfo {
        id: "oak_leaves",
        label_key: "block.oak_leaves",
        is_solid: true,
        is_opaque: false,
        hardness: Hardness::Finite(0.2),
        preferred_tool: Some(ToolKind::Shears),
        textures: FaceTextures::uniform(TextureParams::new(0x3b7d2a, 0.35, 0.95)),
    },
    BlockInfo {
        id: "oak_planks",
        label_key: "block.oak_planks",
        is_solid: true,
        is_opaque: true,
        hardness: Hardness::Finite(1.0),
        preferred_tool: Some(ToolKind::Axe),
        textures: FaceTextures::uniform(TextureParams::new(0xb8945f, 0.1, 1.0)),
    },
    BlockInfo {
        id: "glass",
        label_key: "block.glass",
        is_solid: true,
        is_opaque: false,
        hardness: Hardness::Finite(0.3),
        preferred_tool: None,
        textures: FaceTextures::uniform(
            TextureParams::new(0xcfe8f0, 0.04, 1.1).with_shading(0.15, 0.02),
        ),
    },
    BlockInfo {
        id: "bedrock",
        label_key: "block.bedrock",
        is_solid: true,
        is_opaque: true,
        hardness: Hardness::Unbreakable,
        preferred_tool: None,
        textures: FaceTextures::uniform(TextureParams::new(0x3a3a3a, 0.5, 0.9)),
    },
];

impl BlockType {
    pub fn all() -> &'static [BlockType] {
        &ALL_BLOCKS
    }

    /// Blocks a player may place.
    pub fn placeable() -> impl Iterator<Item = BlockType> {
        ALL_BLOCKS
            .iter()
            .copied()
            .filter(|block| !matches!(block, BlockType::Water | BlockType::Bedrock))
    }

    pub fn info(self) -> &'static BlockInfo {
        &BLOCK_INFOS[self as usize]
    }

    pub fn id(self) -> &'static str {
        self.info().id
    }

    pub fn from_id(id: &str) -> Option<BlockType> {
        ALL_BLOCKS.iter().copied().find(|block| block.id() == id)
    }

    /// Looks up an id, degrading unknown ids to [`DEFAULT_BLOCK`].
    pub fn resolve(id: &str) -> BlockType {
        Self::from_id(id).unwrap_or(DEFAULT_BLOCK)
    }

    pub fn label_key(self) -> &'static str {
        self.info().label_key
    }

    pub fn is_solid(self) -> bool {
        self.info().is_solid
    }

    pub fn is_opaque(self) -> bool {
        self.info().is_opaque
    }

    pub fn hardness(self) -> Hardness {
        self.info().hardness
    }

    pub fn preferred_tool(self) -> Option<ToolKind> {
        self.info().preferred_tool
    }

    pub fn texture(self, face: BlockFace) -> TextureParams {
        self.info().textures.face(face)
    }
}

pub fn cell_is_solid(cell: Cell) -> bool {
    cell.map_or(false, BlockType::is_solid)
}

pub fn cell_is_opaque(cell: Cell) -> bool {
    cell.map_or(false, BlockType::is_opaque)
}
