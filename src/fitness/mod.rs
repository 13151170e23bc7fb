// scoring: closed-form colour fit and RMS difference against the target
//
// nothing in here mutates a bitmap; commits go through `render`

pub mod color;
pub mod difference;
pub mod metrics;

pub use color::{optimal_color, FittedColor};
pub use difference::{candidate_score, difference_full, difference_partial, energy};
pub use metrics::MetricsSnapshot;
