use cgmath::{InnerSpace, MetricSpace, Point3, Vector3};
use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::block::cell_is_solid;
use crate::config::MobConfig;
use crate::world::World;

const STEER_RATE: f32 = 4.0;
const GROUND_FOLLOW_RATE: f32 = 6.0;
const GRAVITY: f32 = 9.8;
const GRAVITY_SCALE: f32 = 0.5;
const GROUND_TOLERANCE: f32 = 0.05;
const MIN_WANDER_TIME: f32 = 2.0;
const WANDER_TIME_SPREAD: f32 = 4.0;

/// Frame-rate independent exponential approach of `current` toward `target`.
pub fn damp(current: f32, target: f32, lambda: f32, dt: f32) -> f32 {
    current + (target - current) * (1.0 - (-lambda * dt).exp())
}

/// A passive wandering animal.
#[derive(Clone, Debug)]
pub struct Mob {
    pub id: u64,
    pub position: Point3<f32>,
    pub velocity: Vector3<f32>,
    pub target_direction: Vector3<f32>,
    pub wander_timer: f32,
    /// Yaw in radians, facing the wander direction.
    pub heading: f32,
}

impl Mob {
    pub fn new(id: u64, position: Point3<f32>) -> Self {
        Self {
            id,
            position,
            velocity: Vector3::new(0.0, 0.0, 0.0),
            target_direction: Vector3::new(0.0, 0.0, 0.0),
            wander_timer: 0.0,
            heading: 0.0,
        }
    }

    pub fn update(&mut self, dt: f32, world: &mut World, rng: &mut SmallRng, config: &MobConfig) {
        self.wander_timer -= dt;
        if self.wander_timer <= 0.0 {
            let angle = rng.gen::<f32>() * std::f32::consts::TAU;
            self.target_direction = Vector3::new(angle.cos(), 0.0, angle.sin()).normalize();
            self.wander_timer = MIN_WANDER_TIME + rng.gen::<f32>() * WANDER_TIME_SPREAD;
        }

        self.velocity.x = damp(
            self.velocity.x,
            self.target_direction.x * config.walk_speed,
            STEER_RATE,
            dt,
        );
        self.velocity.z = damp(
            self.velocity.z,
            self.target_direction.z * config.walk_speed,
            STEER_RATE,
            dt,
        );
        self.velocity.y -= GRAVITY * dt * GRAVITY_SCALE;

        let mut next = self.position + self.velocity * dt;
        let ground = world.highest_solid_block_y(next.x.floor() as i32, next.z.floor() as i32);
        if let Some(ground) = ground {
            let target_y = ground as f32 + config.float_height;
            next.y = damp(next.y, target_y, GROUND_FOLLOW_RATE, dt);
            if next.y < target_y - GROUND_TOLERANCE {
                self.velocity.y = self.velocity.y.max(0.0);
            }
        }

        self.position = next;
        self.heading = self.target_direction.z.atan2(self.target_direction.x);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MobUpdateReport {
    pub spawned: Vec<u64>,
    pub despawned: Vec<u64>,
}

pub struct MobManager {
    config: MobConfig,
    mobs: Vec<Mob>,
    spawn_cooldown: f32,
    rng: SmallRng,
    next_id: u64,
    despawned: Vec<u64>,
}

impl MobManager {
    pub fn new(config: MobConfig, rng_seed: u64) -> Self {
        Self {
            config,
            mobs: Vec::new(),
            spawn_cooldown: 0.0,
            rng: SmallRng::seed_from_u64(rng_seed),
            next_id: 1,
            despawned: Vec::new(),
        }
    }

    pub fn mobs(&self) -> &[Mob] {
        &self.mobs
    }

    pub fn spawn_cooldown(&self) -> f32 {
        self.spawn_cooldown
    }

    /// Ids removed since the last call, for the renderer to drop.
    pub fn take_despawned(&mut self) -> Vec<u64> {
        std::mem::take(&mut self.despawned)
    }

    pub fn update(&mut self, dt: f32, focus: Point3<f32>, world: &mut World) -> MobUpdateReport {
        let mut report = MobUpdateReport::default();

        self.spawn_cooldown -= dt;
        if self.mobs.len() < self.config.max_count && self.spawn_cooldown <= 0.0 {
            match self.try_spawn(focus, world) {
                Some(id) => {
                    report.spawned.push(id);
                    let spread = self.config.max_spawn_interval - self.config.min_spawn_interval;
                    self.spawn_cooldown =
                        self.config.min_spawn_interval + self.rng.gen::<f32>() * spread.max(0.0);
                }
                None => self.spawn_cooldown = self.config.retry_cooldown,
            }
        }

        let despawn_radius = self.config.despawn_radius;
        let mut kept = Vec::with_capacity(self.mobs.len());
        for mut mob in self.mobs.drain(..) {
            if mob.position.distance(focus) > despawn_radius {
                debug!("despawned mob {} at {:?}", mob.id, mob.position);
                report.despawned.push(mob.id);
                continue;
            }
            mob.update(dt, world, &mut self.rng, &self.config);
            kept.push(mob);
        }
        self.mobs = kept;
        self.despawned.extend_from_slice(&report.despawned);
        report
    }

    fn try_spawn(&mut self, focus: Point3<f32>, world: &mut World) -> Option<u64> {
        let config = &self.config;
        let band = (config.spawn_radius - config.min_spawn_distance).max(0.0);
        for _ in 0..config.spawn_attempts {
            let angle = self.rng.gen::<f32>() * std::f32::consts::TAU;
            let distance = config.min_spawn_distance + self.rng.gen::<f32>() * band;
            let x = (focus.x + angle.cos() * distance).floor() as i32;
            let z = (focus.z + angle.sin() * distance).floor() as i32;

            let Some(ground) = world.highest_solid_block_y(x, z) else {
                continue;
            };
            if cell_is_solid(world.get_block(x, ground + 1, z)) {
                continue;
            }

            let id = self.next_id;
            self.next_id += 1;
            let position = Point3::new(
                x as f32 + 0.5,
                ground as f32 + config.float_height,
                z as f32 + 0.5,
            );
            debug!("spawned mob {id} at {:?}", position);
            self.mobs.push(Mob::new(id, position));
            return Some(id);
        }
        None
    }
}
