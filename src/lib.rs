//! Approximate a raster image with geometric primitives.
//!
//! An [`ImageJob`] owns a target image and a working image, and adds one
//! shape per step. Each step runs many hill-climbing chains in parallel on a
//! background worker and commits the shape that most reduces the RMS
//! difference to the target.

pub mod bitmap;
pub mod engine;
pub mod engine_thread;
pub mod error;
pub mod fitness;
pub mod geom;
pub mod job;
pub mod messages;
pub mod registry;
pub mod render;
pub mod settings;
pub mod shape;

pub use bitmap::{Bitmap, Rgba};
pub use error::{JobError, Result};
pub use job::{ImageJob, JobState};
pub use messages::{JobEvent, ShapeResult};
pub use registry::JobRegistry;
pub use settings::{JobPreferences, RunOptions, ShapeBounds};
pub use shape::{Shape, ShapeType, ShapeTypes};
