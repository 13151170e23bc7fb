use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bitmap::{Bitmap, Rgba};
use crate::engine::Candidate;
use crate::error::Result;
use crate::settings::RunOptions;
use crate::shape::Shape;

/// A committed step: the shape, the byte colour it was drawn with, and the
/// job score right after drawing it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeResult {
    pub shape: Shape,
    pub color: Rgba,
    pub score: f64,
}

/// notifications a job sends to its subscribers
#[derive(Clone, Debug, PartialEq)]
pub enum JobEvent {
    /// a step was accepted and is about to run
    WillStep,
    /// shapes appended since the previous notification, in commit order
    DidStep(Vec<ShapeResult>),
}

/// job -> worker: everything one step reads, snapshotted at request time
pub(crate) struct StepRequest {
    pub options: RunOptions,
    pub current: Arc<Bitmap>,
    pub current_score: f64,
    pub step_index: u64,
}

/// worker -> job
pub(crate) struct StepReply {
    pub step_index: u64,
    pub result: Result<Candidate>,
}
