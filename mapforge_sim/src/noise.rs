// Gradient noise for terrain synthesis.
//
// Classic 2D Perlin noise: a 256-entry permutation table (shuffled once per
// grid generation, doubled to avoid wrap-around indexing), quintic fade, and
// hashed corner gradients. `fractal` sums several octaves and normalizes the
// result into [0, 1] so altitudes can be compared against fixed thresholds.
//
// **Critical constraint: determinism.** The permutation table is built from
// the session PRNG; sampling itself is a pure function of (table, x, y), so
// cells can be synthesized in parallel without affecting the output.

use crate::config::GridConfig;
use mapforge_prng::MapRng;

/// A prepared Perlin noise field.
///
/// Immutable after construction; safe to share across worker threads.
#[derive(Clone)]
pub struct PerlinNoise {
    // 256-entry permutation repeated twice, so `perm[a + 1]` never wraps.
    perm: [u8; 512],
}

impl PerlinNoise {
    /// Build a noise field by shuffling a fresh permutation table with `rng`.
    pub fn new(rng: &mut MapRng) -> Self {
        let mut base = [0u8; 256];
        for (i, slot) in base.iter_mut().enumerate() {
            *slot = i as u8;
        }
        rng.shuffle(&mut base);

        let mut perm = [0u8; 512];
        perm[..256].copy_from_slice(&base);
        perm[256..].copy_from_slice(&base);
        Self { perm }
    }

    /// Raw single-octave sample, roughly in [-1, 1].
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let xf = x.floor();
        let yf = y.floor();
        let xi = (xf as i64 & 255) as usize;
        let yi = (yf as i64 & 255) as usize;
        let x = x - xf;
        let y = y - yf;

        let u = fade(x);
        let v = fade(y);

        let a = self.perm[xi] as usize + yi;
        let b = self.perm[xi + 1] as usize + yi;
        let aa = self.perm[a] as usize;
        let ab = self.perm[a + 1] as usize;
        let ba = self.perm[b] as usize;
        let bb = self.perm[b + 1] as usize;

        lerp(
            v,
            lerp(
                u,
                grad(self.perm[aa], x, y),
                grad(self.perm[ba], x - 1.0, y),
            ),
            lerp(
                u,
                grad(self.perm[ab], x, y - 1.0),
                grad(self.perm[bb], x - 1.0, y - 1.0),
            ),
        )
    }

    /// Multi-octave fractal sample, normalized into [0, 1].
    ///
    /// Octaves start at frequency `cfg.scale` and amplitude 1; each octave
    /// multiplies frequency by `lacunarity` and amplitude by `persistence`.
    /// The octave sum is divided by the total amplitude before remapping, so
    /// the output range does not depend on the octave count.
    pub fn fractal(&self, x: f64, y: f64, cfg: &GridConfig) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = cfg.scale;
        let mut max_amplitude = 0.0;

        for _ in 0..cfg.octaves {
            total += self.sample(x * frequency, y * frequency) * amplitude;
            max_amplitude += amplitude;
            amplitude *= cfg.persistence;
            frequency *= cfg.lacunarity;
        }

        if max_amplitude == 0.0 {
            max_amplitude = 1.0;
        }
        (((total / max_amplitude) + 1.0) / 2.0).clamp(0.0, 1.0)
    }
}

// Quintic fade curve: t^3 (t (6t - 15) + 10). C2-continuous at cell borders.
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

// Hash the corner index into one of the 16 reference gradient directions.
fn grad(hash: u8, x: f64, y: f64) -> f64 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        0.0
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_field() {
        let mut rng_a = MapRng::new(42);
        let mut rng_b = MapRng::new(42);
        let a = PerlinNoise::new(&mut rng_a);
        let b = PerlinNoise::new(&mut rng_b);
        for y in 0..16 {
            for x in 0..16 {
                let (fx, fy) = (x as f64 * 0.37, y as f64 * 0.37);
                assert_eq!(a.sample(fx, fy), b.sample(fx, fy));
            }
        }
    }

    #[test]
    fn different_seeds_differ() {
        let mut rng_a = MapRng::new(1);
        let mut rng_b = MapRng::new(2);
        let a = PerlinNoise::new(&mut rng_a);
        let b = PerlinNoise::new(&mut rng_b);
        let differing = (0..64).filter(|i| {
            let (fx, fy) = (*i as f64 * 0.53, *i as f64 * 0.29);
            a.sample(fx, fy) != b.sample(fx, fy)
        });
        assert!(differing.count() > 0);
    }

    #[test]
    fn sample_is_continuous_at_lattice_points() {
        // The fade curve zeroes the gradient contribution of far corners at
        // integer coordinates, so values approaching a lattice point from
        // either side must agree.
        let mut rng = MapRng::new(7);
        let noise = PerlinNoise::new(&mut rng);
        for i in 0..8 {
            let x = i as f64;
            let below = noise.sample(x - 1e-9, 0.5);
            let above = noise.sample(x + 1e-9, 0.5);
            assert!((below - above).abs() < 1e-6);
        }
    }

    #[test]
    fn fractal_in_unit_range() {
        let mut rng = MapRng::new(1234);
        let noise = PerlinNoise::new(&mut rng);
        let cfg = GridConfig {
            octaves: 6,
            ..GridConfig::default()
        };
        for y in 0..64 {
            for x in 0..64 {
                let v = noise.fractal(x as f64, y as f64, &cfg);
                assert!((0.0..=1.0).contains(&v), "fractal out of range: {v}");
            }
        }
    }

    #[test]
    fn fractal_zero_octaves_is_mid_level() {
        let mut rng = MapRng::new(5);
        let noise = PerlinNoise::new(&mut rng);
        let cfg = GridConfig {
            octaves: 0,
            ..GridConfig::default()
        };
        // No octaves: the sum is 0, which normalizes to 0.5.
        assert_eq!(noise.fractal(3.0, 4.0, &cfg), 0.5);
    }

    #[test]
    fn fractal_varies_across_the_field() {
        let mut rng = MapRng::new(42);
        let noise = PerlinNoise::new(&mut rng);
        let cfg = GridConfig::default();
        let values: Vec<f64> = (0..256)
            .map(|i| noise.fractal((i % 16) as f64, (i / 16) as f64, &cfg))
            .collect();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(max - min > 0.1, "field is suspiciously flat: {min}..{max}");
    }
}
