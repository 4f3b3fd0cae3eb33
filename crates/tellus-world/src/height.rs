use crate::noise::NoiseField;

/// Surface heights are clamped to `-MAX_HEIGHT..=MAX_HEIGHT`, leaving room
/// above and below for fill and trees.
pub const MAX_HEIGHT: i32 = 1 << 24;

/// Maps world columns to integer terrain heights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightSampler {
    noise: NoiseField,
    height_scale: f64,
}

impl HeightSampler {
    pub const fn new(noise: NoiseField, height_scale: f64) -> Self {
        Self {
            noise,
            height_scale,
        }
    }

    #[inline]
    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    #[inline]
    pub fn height_scale(&self) -> f64 {
        self.height_scale
    }

    /// Terrain height of the world column `(wx, wz)`. Sampled in world space
    /// so neighbouring chunks meet without seams; truncates toward zero.
    #[inline]
    pub fn height_at(&self, wx: i32, wz: i32) -> i32 {
        let n = self.noise.sample(f64::from(wx), f64::from(wz));
        ((n * self.height_scale) as i32).clamp(-MAX_HEIGHT, MAX_HEIGHT)
    }
}
