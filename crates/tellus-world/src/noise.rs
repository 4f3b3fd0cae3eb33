//! Deterministic 2D value noise with cosine interpolation and octave summing.
//!
//! Every function here is pure: the same coordinates (and seed) always give
//! the same bits, on every platform, across restarts.

use std::f64::consts::PI;

/// Octave parameters for [`NoiseField::perlin_noise`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseParams {
    pub octaves: u32,
    pub persistence: f64,
    pub lacunarity: f64,
    pub frequency: f64,
    pub seed: i32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            frequency: 0.1,
            seed: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NoiseField {
    params: NoiseParams,
}

impl NoiseField {
    pub const fn new(params: NoiseParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &NoiseParams {
        &self.params
    }

    /// Public sampling entry point. The result is not normalised: octave
    /// summation can exceed `[-1, 1]`.
    #[inline]
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        self.perlin_noise(x, z)
    }

    /// Raw 31-bit lattice value. `x` and `z` are deliberately not
    /// interchangeable.
    #[inline]
    pub fn lattice_bits(&self, x: i32, z: i32) -> u32 {
        let mut n = x
            .wrapping_add(z.wrapping_mul(57))
            .wrapping_add(self.params.seed.wrapping_mul(1013));
        n = n.wrapping_shl(13) ^ n;
        let poly = n
            .wrapping_mul(n)
            .wrapping_mul(15731)
            .wrapping_add(789_221);
        let m = n.wrapping_mul(poly).wrapping_add(1_376_312_589) & 0x7fff_ffff;
        m as u32
    }

    /// Lattice hash mapped to `(-1, 1]`.
    #[inline]
    pub fn hash(&self, x: i32, z: i32) -> f64 {
        1.0 - f64::from(self.lattice_bits(x, z)) / 1_073_741_824.0
    }

    /// Lattice hash mapped to `[0, 1)`, used for decoration rolls.
    #[inline]
    pub fn hash01(&self, x: i32, z: i32) -> f64 {
        f64::from(self.lattice_bits(x, z)) / 2_147_483_648.0
    }

    /// 3x3 low-pass filter over the lattice hash.
    pub fn smoothed_noise(&self, x: i32, z: i32) -> f64 {
        let corners = (self.hash(x.wrapping_sub(1), z.wrapping_sub(1))
            + self.hash(x.wrapping_add(1), z.wrapping_sub(1))
            + self.hash(x.wrapping_sub(1), z.wrapping_add(1))
            + self.hash(x.wrapping_add(1), z.wrapping_add(1)))
            / 16.0;
        let sides = (self.hash(x.wrapping_sub(1), z)
            + self.hash(x.wrapping_add(1), z)
            + self.hash(x, z.wrapping_sub(1))
            + self.hash(x, z.wrapping_add(1)))
            / 8.0;
        let center = self.hash(x, z) / 4.0;
        corners + sides + center
    }

    /// Bilinear blend of [`smoothed_noise`](Self::smoothed_noise) at the four
    /// lattice points around `(x, z)`.
    pub fn interpolated_noise(&self, x: f64, z: f64) -> f64 {
        let fx = x.floor();
        let fz = z.floor();
        let tx = x - fx;
        let tz = z - fz;
        let ix = fx as i32;
        let iz = fz as i32;

        let v1 = self.smoothed_noise(ix, iz);
        let v2 = self.smoothed_noise(ix.wrapping_add(1), iz);
        let v3 = self.smoothed_noise(ix, iz.wrapping_add(1));
        let v4 = self.smoothed_noise(ix.wrapping_add(1), iz.wrapping_add(1));

        let i1 = cosine_interpolate(v1, v2, tx);
        let i2 = cosine_interpolate(v3, v4, tx);
        cosine_interpolate(i1, i2, tz)
    }

    /// Sum of octaves, halving amplitude and doubling frequency by default.
    pub fn perlin_noise(&self, x: f64, z: f64) -> f64 {
        let p = &self.params;
        let mut total = 0.0;
        let mut frequency = p.frequency;
        let mut amplitude = 1.0;
        for _ in 0..p.octaves {
            total += self.interpolated_noise(x * frequency, z * frequency) * amplitude;
            amplitude *= p.persistence;
            frequency *= p.lacunarity;
        }
        total
    }
}

/// Cosine ease between `a` and `b`: `f(t) = (1 - cos(t*pi)) / 2`.
#[inline]
pub fn cosine_interpolate(a: f64, b: f64, t: f64) -> f64 {
    let f = (1.0 - (t * PI).cos()) * 0.5;
    a * (1.0 - f) + b * f
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_asymmetric() {
        let n = NoiseField::default();
        let differs = (1..20).any(|i| n.hash(i, 3 * i + 1) != n.hash(3 * i + 1, i));
        assert!(differs);
    }

    #[test]
    fn hash_matches_reference_values() {
        // n = 0 -> 1376312589 & 0x7fffffff = 1376312589
        let n = NoiseField::default();
        assert_eq!(n.lattice_bits(0, 0), 1_376_312_589);
        let expected = 1.0 - 1_376_312_589.0 / 1_073_741_824.0;
        assert_eq!(n.hash(0, 0), expected);
    }

    #[test]
    fn hash_stays_in_range() {
        let n = NoiseField::default();
        for x in -50..50 {
            for z in -50..50 {
                let h = n.hash(x, z);
                assert!(h > -1.0 && h <= 1.0, "hash({x},{z}) = {h}");
                let u = n.hash01(x, z);
                assert!((0.0..1.0).contains(&u));
            }
        }
    }

    #[test]
    fn interpolation_hits_lattice_values() {
        let n = NoiseField::default();
        for (x, z) in [(0, 0), (3, -7), (-12, 5)] {
            let v = n.interpolated_noise(f64::from(x), f64::from(z));
            assert_eq!(v, n.smoothed_noise(x, z));
        }
    }

    #[test]
    fn cosine_interpolate_endpoints() {
        assert_eq!(cosine_interpolate(2.0, 5.0, 0.0), 2.0);
        assert!((cosine_interpolate(2.0, 5.0, 1.0) - 5.0).abs() < 1e-12);
        assert!((cosine_interpolate(2.0, 5.0, 0.5) - 3.5).abs() < 1e-12);
    }

    #[test]
    fn seed_changes_field() {
        let a = NoiseField::default();
        let b = NoiseField::new(NoiseParams {
            seed: 7,
            ..NoiseParams::default()
        });
        let differs = (0..32).any(|i| a.sample(f64::from(i), 1.5) != b.sample(f64::from(i), 1.5));
        assert!(differs);
    }

    #[test]
    fn octave_sum_is_continuous_across_cells() {
        let n = NoiseField::default();
        let a = n.sample(9.999_999, 4.0);
        let b = n.sample(10.0, 4.0);
        assert!((a - b).abs() < 1e-4);
    }
}
