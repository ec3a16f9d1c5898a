use std::env;
use std::fs;

use anyhow::Context;
use cgmath::{Point3, Vector3};
use log::{info, warn};

use voxel_sandbox::block::BlockType;
use voxel_sandbox::config::WorldConfig;
use voxel_sandbox::mesh::MeshBuilder;
use voxel_sandbox::mining::{BreakProgress, BreakStep, Tool, HAND};
use voxel_sandbox::mob::MobManager;
use voxel_sandbox::persistence::{load_saved, save_world, FileBlobStore};
use voxel_sandbox::raycast::raycast;
use voxel_sandbox::world::World;

const SAVE_DIR: &str = "saves";
const FRAMES: u32 = 300;
const FRAME_DT: f32 = 1.0 / 60.0;
const WALK_SPEED: f32 = 4.3;
const PICK_RANGE: f32 = 24.0;

fn load_config() -> anyhow::Result<WorldConfig> {
    match env::args().nth(1) {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {path}"))?;
            WorldConfig::from_json_str(&text).with_context(|| format!("invalid config {path}"))
        }
        None => Ok(WorldConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    let config = load_config()?;
    let mob_config = config.mobs.clone();
    let mut store = FileBlobStore::open(SAVE_DIR).context("failed to open save directory")?;

    let mut world = World::new(config);
    match load_saved(&store) {
        Some(data) => {
            let report = world.load(&data);
            info!(
                "restored {} edits, {} chunks loaded",
                world.modification_count(),
                report.created.len()
            );
        }
        None => info!("no saved world, starting fresh with seed {}", world.seed()),
    }

    let mut meshes = MeshBuilder::new(world.seed());
    let mut mobs = MobManager::new(mob_config, u64::from(world.seed()));

    let spawn = world.spawn_position();
    let mut focus = spawn;
    let mut rebuilt = 0;
    let mut spawned = 0;
    for _ in 0..FRAMES {
        focus.x += WALK_SPEED * FRAME_DT;
        world.update_around_player(focus);
        rebuilt += meshes.rebuild_dirty(&mut world);
        spawned += mobs.update(FRAME_DT, focus, &mut world).spawned.len();
    }
    let detached = world.take_detached().len();

    let eye = Point3::new(spawn.x, spawn.y + 1.6, spawn.z);
    match raycast(&world, eye, Vector3::new(0.0, -1.0, 0.0), PICK_RANGE) {
        Some(hit) => {
            let pos = hit.block_pos;
            let tool = Tool::from_id("wooden_shovel").unwrap_or(HAND);
            if let Some(mut progress) = BreakProgress::start(pos, hit.block) {
                let mut elapsed = 0.0;
                loop {
                    let current = world.get_block(pos.x, pos.y, pos.z);
                    match progress.advance(FRAME_DT, &tool, current) {
                        BreakStep::InProgress(_) => elapsed += FRAME_DT,
                        BreakStep::Finished => {
                            world.remove_block(pos.x, pos.y, pos.z);
                            info!("dug {:?} at {:?} in {elapsed:.2}s", hit.block, pos);
                            break;
                        }
                        BreakStep::Cancelled => break,
                    }
                }
            }
            if world.set_block(pos.x, pos.y, pos.z, BlockType::OakPlanks) {
                info!("placed oak planks at {:?}", pos);
            }
        }
        None => warn!("nothing below the spawn point to build on"),
    }
    rebuilt += meshes.rebuild_dirty(&mut world);

    save_world(&mut store, &world).context("failed to save world")?;

    let instances: usize = world
        .renderable_chunks()
        .map(|renderable| renderable.instance_count())
        .sum();
    info!(
        "seed {}: {} chunks loaded, {detached} detached, {rebuilt} meshes built, \
         {instances} instances, {} mobs ({spawned} spawned), {} edits saved to {}",
        world.seed(),
        world.loaded_chunk_count(),
        mobs.mobs().len(),
        world.modification_count(),
        store.dir().display()
    );
    Ok(())
}
