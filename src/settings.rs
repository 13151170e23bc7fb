//! run configuration for image jobs
//! options are validated here before they ever reach the optimizer
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{JobError, Result};
use crate::geom::Point;
use crate::shape::ShapeTypes;

/// region where new shapes may be placed (normalized coordinates 0.0-1.0)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeBounds {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for ShapeBounds {
    fn default() -> Self {
        Self { left: 0.0, right: 1.0, top: 0.0, bottom: 1.0 }
    }
}

impl ShapeBounds {
    /// create a region with bounds checking (always at least 1% wide and tall)
    pub fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        let left = left.clamp(0.0, 0.99);
        let right = right.clamp(left + 0.01, 1.0);
        let top = top.clamp(0.0, 0.99);
        let bottom = bottom.clamp(top + 0.01, 1.0);

        Self { left, right, top, bottom }
    }

    pub fn is_valid(&self) -> bool {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        in_unit(self.left)
            && in_unit(self.right)
            && in_unit(self.top)
            && in_unit(self.bottom)
            && self.left < self.right
            && self.top < self.bottom
    }

    /// inclusive pixel rectangle on a `width x height` canvas; never empty
    pub fn to_pixels(&self, width: u32, height: u32) -> PixelBounds {
        let max_x = width.max(1) as i32 - 1;
        let max_y = height.max(1) as i32 - 1;
        let x_min = ((width as f32 * self.left) as i32).clamp(0, max_x);
        let y_min = ((height as f32 * self.top) as i32).clamp(0, max_y);
        let x_max = ((width as f32 * self.right).ceil() as i32 - 1).clamp(x_min, max_x);
        let y_max = ((height as f32 * self.bottom).ceil() as i32 - 1).clamp(y_min, max_y);
        PixelBounds { x_min, y_min, x_max, y_max }
    }
}

/// inclusive pixel rectangle shapes are generated and mutated inside
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBounds {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl PixelBounds {
    #[inline]
    pub fn width(&self) -> i32 {
        self.x_max - self.x_min + 1
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.y_max - self.y_min + 1
    }

    #[inline]
    pub fn clamp_point(&self, p: Point) -> Point {
        (p.0.clamp(self.x_min, self.x_max), p.1.clamp(self.y_min, self.y_max))
    }
}

/// Search breadth/depth for one step. A step takes a snapshot of these, so
/// changing a job's options never affects a step already in flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub shape_types: ShapeTypes,
    /// opacity every committed shape is drawn with (0-255)
    pub alpha: u8,
    /// independent hill-climbing chains per step
    pub candidate_shapes_per_step: u32,
    /// mutations tried per chain (0 = keep the random starting shape)
    pub mutations_per_candidate: u32,
    /// worker threads used inside a step (0 = one per available core)
    pub max_threads: u32,
    pub seed: u64,
    pub shape_bounds: ShapeBounds,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            shape_types: ShapeTypes::FILLED,
            alpha: 128,
            candidate_shapes_per_step: 50,
            mutations_per_candidate: 100,
            max_threads: 0,
            seed: 9001,
            shape_bounds: ShapeBounds::default(),
        }
    }
}

/// upper bound on `RunOptions::max_threads`
pub const MAX_THREADS: u32 = 256;

impl RunOptions {
    /// An empty shape mask passes: that is refused per step instead, so the
    /// caller can toggle kinds one at a time.
    pub fn validate(&self) -> Result<()> {
        if self.candidate_shapes_per_step == 0 {
            return Err(JobError::InvalidOptions(
                "candidate_shapes_per_step must be at least 1".to_owned(),
            ));
        }
        if self.max_threads > MAX_THREADS {
            return Err(JobError::InvalidOptions(format!(
                "max_threads is {}, at most {MAX_THREADS} allowed",
                self.max_threads
            )));
        }
        if !self.shape_bounds.is_valid() {
            return Err(JobError::InvalidOptions(format!(
                "shape bounds {:?} are not an ordered region inside [0, 1]",
                self.shape_bounds
            )));
        }
        Ok(())
    }
}

/// persisted per-job preferences with the setters the UI layer drives
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPreferences {
    pub run_options: RunOptions,
}

impl JobPreferences {
    pub fn run_options(&self) -> RunOptions {
        self.run_options.clone()
    }

    pub fn enable_shape_types(&mut self, kinds: ShapeTypes) {
        self.run_options.shape_types.insert(kinds);
    }

    pub fn disable_shape_types(&mut self, kinds: ShapeTypes) {
        self.run_options.shape_types.remove(kinds);
    }

    pub fn set_shape_alpha(&mut self, alpha: u8) {
        self.run_options.alpha = alpha;
    }

    pub fn set_candidate_shape_count(&mut self, count: u32) {
        self.run_options.candidate_shapes_per_step = count;
    }

    pub fn set_max_shape_mutations(&mut self, mutations: u32) {
        self.run_options.mutations_per_candidate = mutations;
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.run_options.seed = seed;
    }

    pub fn set_max_threads(&mut self, threads: u32) {
        self.run_options.max_threads = threads;
    }

    /// save preferences to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// load preferences from a JSON file; the options inside are validated
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let prefs: JobPreferences = serde_json::from_str(&json)?;
        prefs.run_options.validate()?;
        Ok(prefs)
    }

    /// load preferences, or return defaults if the file is missing or bad
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(prefs) => prefs,
            Err(JobError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                let path = path.display();
                log::warn!("failed to load preferences from {path}: {e}. using defaults.");
                Self::default()
            }
        }
    }
}
