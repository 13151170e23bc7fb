// one hill-climbing chain: random start, then greedy mutation
//
// chains share nothing mutable; each reads the same target/current snapshot
// and returns an owned Candidate

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::Candidate;
use crate::bitmap::Bitmap;
use crate::fitness::{energy, FittedColor};
use crate::settings::PixelBounds;
use crate::shape::{Shape, ShapeType};

/// splitmix64 finalizer
#[inline]
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// RNG seed for one chain, a pure function of the run seed, the step index
/// (shapes committed so far) and the chain index.
pub fn chain_seed(seed: u64, step_index: u64, chain: u32) -> u64 {
    mix(mix(mix(seed) ^ step_index) ^ chain as u64)
}

/// read-only inputs every chain of a step shares
pub(super) struct Search<'a> {
    pub target: &'a Bitmap,
    pub current: &'a Bitmap,
    pub score: f64,
    pub alpha: u8,
    pub kinds: Vec<ShapeType>,
    pub bounds: PixelBounds,
    pub mutations: u32,
    pub seed: u64,
    pub step_index: u64,
}

impl Search<'_> {
    fn evaluate(&self, shape: &Shape) -> (FittedColor, f64) {
        let lines = shape.rasterize(self.target.width(), self.target.height());
        match energy(self.target, self.current, &lines, self.alpha, self.score) {
            (Some(color), score) => (color, score),
            // nothing to draw: colour is irrelevant, score unchanged
            (None, score) => (FittedColor { rgb: [0.0; 3], alpha: self.alpha }, score),
        }
    }

    pub fn run_chain(&self, chain: u32) -> Candidate {
        profiling::scope!("run_chain");
        let mut rng = Pcg32::seed_from_u64(chain_seed(self.seed, self.step_index, chain));

        let kind = self.kinds[rng.random_range(0..self.kinds.len())];
        let mut shape = Shape::random(kind, &mut rng, &self.bounds);
        let (mut color, mut score) = self.evaluate(&shape);

        for _ in 0..self.mutations {
            let next = shape.mutate(&mut rng, &self.bounds);
            let (next_color, next_score) = self.evaluate(&next);
            if next_score < score {
                shape = next;
                color = next_color;
                score = next_score;
            }
        }

        Candidate { shape, color, score, chain }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_depend_on_every_input() {
        let base = chain_seed(1, 0, 0);
        assert_eq!(base, chain_seed(1, 0, 0));
        assert_ne!(base, chain_seed(2, 0, 0));
        assert_ne!(base, chain_seed(1, 1, 0));
        assert_ne!(base, chain_seed(1, 0, 1));
        // swapping step and chain must not collide
        assert_ne!(chain_seed(1, 2, 3), chain_seed(1, 3, 2));
    }
}
