use crate::block::{BlockType, ToolKind};
use crate::coords::BlockPos;

/// A held tool. `kind == None` is the bare hand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tool {
    pub id: &'static str,
    pub kind: Option<ToolKind>,
    pub speed: f32,
    pub efficiency: f32,
}

pub const HAND: Tool = Tool {
    id: "hand",
    kind: None,
    speed: 0.8,
    efficiency: 1.1,
};

pub const TOOLS: [Tool; 5] = [
    HAND,
    Tool {
        id: "wooden_pickaxe",
        kind: Some(ToolKind::Pickaxe),
        speed: 1.4,
        efficiency: 2.6,
    },
    Tool {
        id: "wooden_shovel",
        kind: Some(ToolKind::Shovel),
        speed: 1.5,
        efficiency: 2.4,
    },
    Tool {
        id: "wooden_axe",
        kind: Some(ToolKind::Axe),
        speed: 1.45,
        efficiency: 2.2,
    },
    Tool {
        id: "shears",
        kind: Some(ToolKind::Shears),
        speed: 1.2,
        efficiency: 3.1,
    },
];

const MISMATCH_PENALTY: f32 = 0.65;
const UNPREFERRED_PENALTY: f32 = 0.9;

impl Tool {
    pub fn from_id(id: &str) -> Option<Tool> {
        TOOLS.iter().copied().find(|tool| tool.id == id)
    }

    /// Mining effort per second this tool applies to `block`.
    pub fn speed_against(&self, block: BlockType) -> f32 {
        match (self.kind, block.preferred_tool()) {
            (Some(kind), Some(preferred)) if kind == preferred => self.speed * self.efficiency,
            (Some(_), Some(_)) => self.speed * MISMATCH_PENALTY,
            (Some(_), None) => self.speed * UNPREFERRED_PENALTY,
            (None, Some(_)) => self.speed * MISMATCH_PENALTY,
            (None, None) => self.speed,
        }
    }

    /// Seconds needed to break `block`, `None` for unbreakable blocks.
    pub fn break_time(&self, block: BlockType) -> Option<f32> {
        let hardness = block.hardness().seconds()?;
        Some(hardness / self.speed_against(block))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BreakStep {
    Cancelled,
    InProgress(f32),
    Finished,
}

/// Accumulated effort against one targeted cell.
#[derive(Clone, Debug)]
pub struct BreakProgress {
    pub pos: BlockPos,
    pub block: BlockType,
    progress: f32,
    hardness: f32,
}

impl BreakProgress {
    pub fn start(pos: BlockPos, block: BlockType) -> Option<Self> {
        let hardness = block.hardness().seconds()?;
        Some(Self {
            pos,
            block,
            progress: 0.0,
            hardness,
        })
    }

    pub fn ratio(&self) -> f32 {
        (self.progress / self.hardness).min(1.0)
    }

    pub fn advance(&mut self, dt: f32, tool: &Tool, current: Option<BlockType>) -> BreakStep {
        if current != Some(self.block) {
            return BreakStep::Cancelled;
        }
        self.progress += dt.max(0.0) * tool.speed_against(self.block);
        if self.progress >= self.hardness {
            BreakStep::Finished
        } else {
            BreakStep::InProgress(self.ratio())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(id: &str) -> Tool {
        Tool::from_id(id).expect("known tool")
    }

    #[test]
    fn matching_tool_applies_efficiency() {
        let pickaxe = tool("wooden_pickaxe");
        assert!((pickaxe.speed_against(BlockType::Stone) - 1.4 * 2.6).abs() < 1e-5);
    }

    #[test]
    fn mismatched_tool_is_penalised() {
        let axe = tool("wooden_axe");
        assert!((axe.speed_against(BlockType::Stone) - 1.45 * 0.65).abs() < 1e-5);
        assert!((axe.speed_against(BlockType::Glass) - 1.45 * 0.9).abs() < 1e-5);
    }

    #[test]
    fn bare_hand_rates() {
        assert!((HAND.speed_against(BlockType::Dirt) - 0.8 * 0.65).abs() < 1e-5);
        assert!((HAND.speed_against(BlockType::Glass) - 0.8).abs() < 1e-5);
    }

    #[test]
    fn unbreakable_blocks_never_start() {
        assert!(BreakProgress::start(BlockPos::new(0, 0, 0), BlockType::Bedrock).is_none());
        assert_eq!(HAND.break_time(BlockType::Bedrock), None);
    }

    #[test]
    fn progress_finishes_and_cancels() {
        let shovel = tool("wooden_shovel");
        let pos = BlockPos::new(3, 20, 3);
        let mut progress = BreakProgress::start(pos, BlockType::Dirt).expect("dirt is breakable");

        match progress.advance(0.05, &shovel, Some(BlockType::Dirt)) {
            BreakStep::InProgress(ratio) => assert!(ratio > 0.0 && ratio < 1.0, "ratio {ratio}"),
            other => panic!("expected progress, got {other:?}"),
        }
        assert_eq!(progress.advance(1.0, &shovel, Some(BlockType::Dirt)), BreakStep::Finished);

        let mut replaced = BreakProgress::start(pos, BlockType::Dirt).expect("dirt is breakable");
        assert_eq!(replaced.advance(0.1, &shovel, None), BreakStep::Cancelled);
    }
}
