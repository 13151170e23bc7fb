// one optimizer step
//
// `candidate_shapes_per_step` chains hill-climb independently on a rayon pool
// that lives only for this call; the winner is picked on the calling thread.
// nothing here writes to `current`

mod chain;

pub use chain::chain_seed;

use rayon::prelude::*;

use crate::bitmap::Bitmap;
use crate::error::{JobError, Result};
use crate::fitness::FittedColor;
use crate::settings::RunOptions;
use crate::shape::Shape;

use chain::Search;

/// Best shape one chain found, with the unrounded colour and the score the
/// image would have if it were committed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub shape: Shape,
    pub color: FittedColor,
    pub score: f64,
    pub chain: u32,
}

/// Search for the next shape to add.
///
/// `step_index` is the number of shapes committed so far; together with
/// `options.seed` it fixes every random draw of the step, so the result does
/// not depend on `max_threads` or scheduling.
pub fn step(
    target: &Bitmap,
    current: &Bitmap,
    current_score: f64,
    options: &RunOptions,
    step_index: u64,
) -> Result<Candidate> {
    profiling::scope!("engine::step");

    if !target.same_dimensions(current) {
        return Err(JobError::InvalidDimensions(format!(
            "target is {}x{} but current is {}x{}",
            target.width(),
            target.height(),
            current.width(),
            current.height()
        )));
    }
    if options.shape_types.is_empty() {
        return Err(JobError::NoEnabledShapeTypes);
    }
    options.validate()?;

    let search = Search {
        target,
        current,
        score: current_score,
        alpha: options.alpha,
        kinds: options.shape_types.kinds().collect(),
        bounds: options.shape_bounds.to_pixels(target.width(), target.height()),
        mutations: options.mutations_per_candidate,
        seed: options.seed,
        step_index,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(search_threads(options))
        .thread_name(|i| format!("shape-search-{i}"))
        .build()?;

    let candidates: Vec<Candidate> = pool.install(|| {
        (0..options.candidate_shapes_per_step)
            .into_par_iter()
            .map(|chain| search.run_chain(chain))
            .collect()
    });

    best_candidate(candidates).ok_or_else(|| {
        JobError::InvalidOptions("candidate_shapes_per_step must be at least 1".to_owned())
    })
}

/// Threads for one step's pool: `max_threads` (0 = one per core), never more
/// than there are chains to run.
fn search_threads(options: &RunOptions) -> usize {
    let wanted = match options.max_threads {
        0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
        n => n as usize,
    };
    wanted.min(options.candidate_shapes_per_step as usize).max(1)
}

/// lowest score wins; on ties the lowest chain index
fn best_candidate(candidates: Vec<Candidate>) -> Option<Candidate> {
    profiling::scope!("best_candidate");
    candidates.into_iter().reduce(|best, c| {
        let better = c.score < best.score || (c.score == best.score && c.chain < best.chain);
        if better { c } else { best }
    })
}
