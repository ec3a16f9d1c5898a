use cgmath::Vector3;
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Coherent 3D noise in roughly [-1, 1].
pub trait NoiseSource {
    fn sample(&self, x: f64, y: f64, z: f64) -> f64;
}

/// Gradient noise over a fixed permutation. World seeds decorrelate samples
/// through [`SeedOffsets`], never by reshuffling the permutation.
#[derive(Clone)]
pub struct ImprovedNoise {
    perlin: Perlin,
}

const PERMUTATION_SEED: u32 = 0;

impl ImprovedNoise {
    pub fn new() -> Self {
        Self {
            perlin: Perlin::new(PERMUTATION_SEED),
        }
    }
}

impl Default for ImprovedNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseSource for ImprovedNoise {
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        self.perlin.get([x, y, z])
    }
}

/// Integer avalanche hash of a cell and seed, mapped into [0, 1].
pub fn coord_hash(x: i32, y: i32, z: i32, seed: u32) -> f64 {
    let mut h = (x as u32)
        .wrapping_mul(374_761_393)
        .wrapping_add((z as u32).wrapping_mul(668_265_263))
        .wrapping_add((y as u32).wrapping_mul(2_147_483_647));
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^= seed;
    h = (h ^ (h >> 16)).wrapping_mul(2_246_822_519);
    h = (h ^ (h >> 15)).wrapping_mul(3_266_489_917);
    (h ^ (h >> 16)) as f64 / u32::MAX as f64
}

/// 31-multiplier rolling hash over UTF-16 code units.
pub fn string_hash(text: &str) -> u32 {
    text.encode_utf16()
        .fold(0u32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as u32))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeedOffsets {
    pub primary: Vector3<f64>,
    pub secondary: Vector3<f64>,
}

impl SeedOffsets {
    pub fn derive(seed: u32) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
        let mut component = || rng.gen::<f64>() * 1000.0;
        let primary = Vector3::new(component(), component(), component());
        let secondary = Vector3::new(component(), component(), component());
        Self { primary, secondary }
    }
}
