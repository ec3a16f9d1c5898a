use cgmath::{InnerSpace, Point3, Vector3};

use crate::block::BlockType;
use crate::coords::BlockPos;
use crate::world::World;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastHit {
    pub block_pos: BlockPos,
    pub block: BlockType,
    /// Face the ray entered through; zero when the origin is inside the block.
    pub normal: Vector3<i32>,
}

impl RaycastHit {
    /// The empty cell a new block would be placed into, `None` past the edge of
    /// the world.
    pub fn placement_target(&self) -> Option<BlockPos> {
        self.block_pos
            .offset(self.normal.x, self.normal.y, self.normal.z)
    }
}

fn axis_start(origin: f32, voxel: i32, direction: f32) -> (i32, f32, f32) {
    if direction > 0.0 {
        (1, ((voxel + 1) as f32 - origin) / direction, 1.0 / direction)
    } else if direction < 0.0 {
        (-1, (voxel as f32 - origin) / direction, -1.0 / direction)
    } else {
        (0, f32::MAX, f32::MAX)
    }
}

/// DDA voxel traversal. Reads through [`World::peek_block`], so it never loads
/// chunks, and passes through water.
pub fn raycast(
    world: &World,
    origin: Point3<f32>,
    direction: Vector3<f32>,
    max_distance: f32,
) -> Option<RaycastHit> {
    if direction.magnitude2() == 0.0 {
        return None;
    }
    let direction = direction.normalize();

    let mut voxel = [
        origin.x.floor() as i32,
        origin.y.floor() as i32,
        origin.z.floor() as i32,
    ];
    let axes = [
        axis_start(origin.x, voxel[0], direction.x),
        axis_start(origin.y, voxel[1], direction.y),
        axis_start(origin.z, voxel[2], direction.z),
    ];
    let mut t_max = [axes[0].1, axes[1].1, axes[2].1];
    let mut normal = Vector3::new(0, 0, 0);

    let max_steps = (max_distance * 3.0).ceil() as i32 + 3;
    for _ in 0..max_steps {
        if let Some(block) = world.peek_block(voxel[0], voxel[1], voxel[2]) {
            if block != BlockType::Water {
                return Some(RaycastHit {
                    block_pos: BlockPos::new(voxel[0], voxel[1], voxel[2]),
                    block,
                    normal,
                });
            }
        }

        let axis = if t_max[0] < t_max[1] {
            if t_max[0] < t_max[2] {
                0
            } else {
                2
            }
        } else if t_max[1] < t_max[2] {
            1
        } else {
            2
        };
        if t_max[axis] > max_distance {
            break;
        }
        let (step, _, delta) = axes[axis];
        let Some(next) = voxel[axis].checked_add(step) else {
            break;
        };
        voxel[axis] = next;
        t_max[axis] += delta;
        normal = Vector3::new(0, 0, 0);
        normal[axis] = -step;
    }

    None
}
