// image job: owns target/current/shapes and drives a JobWorker
//
// every method runs on the controlling context. the worker only ever sees an
// Arc snapshot of `current`; commits happen here, in `commit`, and nowhere else

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};

use crate::bitmap::{Bitmap, Rgba};
use crate::engine_thread::JobWorker;
use crate::error::{JobError, Result};
use crate::fitness::{difference_full, difference_partial, MetricsSnapshot};
use crate::messages::{JobEvent, ShapeResult, StepReply, StepRequest};
use crate::render::{copy_lines, draw_lines};
use crate::settings::{JobPreferences, RunOptions};
use crate::shape::Shape;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Idle,
    /// a single step is in flight and nothing will follow it
    Stepping,
    /// steps are re-armed as each one completes
    Running,
}

pub struct ImageJob {
    id: u64,
    name: String,
    target: Arc<Bitmap>,
    initial: Arc<Bitmap>,
    current: Arc<Bitmap>,
    score: f64,
    shapes: Vec<ShapeResult>,
    options: RunOptions,
    running: bool,
    worker: JobWorker,
    subscribers: Vec<mpsc::Sender<JobEvent>>,
}

impl ImageJob {
    /// Create a job approximating `target`, starting from `initial` or, when
    /// none is given, from a flat fill of the target's average colour.
    pub fn new(target: Bitmap, initial: Option<Bitmap>) -> Result<Self> {
        profiling::scope!("ImageJob::new");
        let initial = match initial {
            Some(bmp) if !bmp.same_dimensions(&target) => {
                return Err(JobError::InvalidDimensions(format!(
                    "target is {}x{} but initial image is {}x{}",
                    target.width(),
                    target.height(),
                    bmp.width(),
                    bmp.height()
                )));
            }
            Some(bmp) => bmp,
            None => Bitmap::new(target.width(), target.height(), target.average_color())?,
        };

        let score = difference_full(&target, &initial);
        let target = Arc::new(target);
        let initial = Arc::new(initial);
        let worker = JobWorker::spawn(target.clone())?;

        let id = NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed);
        let name = format!("job-{id}");
        log::info!("created {name} ({}x{}, score {score:.6})", target.width(), target.height());

        Ok(Self {
            id,
            name,
            current: initial.clone(),
            target,
            initial,
            score,
            shapes: Vec::new(),
            options: RunOptions::default(),
            running: false,
            worker,
            subscribers: Vec::new(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn display_name(&self) -> &str {
        &self.name
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn target(&self) -> &Bitmap {
        &self.target
    }

    pub fn current(&self) -> &Bitmap {
        &self.current
    }

    pub fn initial(&self) -> &Bitmap {
        &self.initial
    }

    pub fn shapes(&self) -> &[ShapeResult] {
        &self.shapes
    }

    /// current RMS difference to the target, 0 = identical
    #[inline]
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot::from_score(self.score)
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Replace the options used by steps requested from now on. A step
    /// already in flight keeps the snapshot it was started with.
    pub fn set_options(&mut self, options: RunOptions) -> Result<()> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    pub fn apply_preferences(&mut self, prefs: &JobPreferences) -> Result<()> {
        self.set_options(prefs.run_options())
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn is_stepping(&self) -> bool {
        self.worker.is_busy()
    }

    pub fn state(&self) -> JobState {
        match (self.running, self.worker.is_busy()) {
            (true, _) => JobState::Running,
            (false, true) => JobState::Stepping,
            (false, false) => JobState::Idle,
        }
    }

    /// Receive events for this job. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> mpsc::Receiver<JobEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: JobEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Queue one step on the worker and return immediately. The result is
    /// committed by a later `poll` or `wait`.
    pub fn step_once(&mut self) -> Result<()> {
        profiling::scope!("ImageJob::step_once");
        if self.worker.is_busy() {
            log::error!("{}: step requested while another step is in flight", self.name);
            return Err(JobError::StepAlreadyInFlight);
        }
        if self.options.shape_types.is_empty() {
            log::warn!("{}: step refused, enable at least one shape type", self.name);
            return Err(JobError::NoEnabledShapeTypes);
        }

        let request = StepRequest {
            options: self.options.clone(),
            current: self.current.clone(),
            current_score: self.score,
            step_index: self.shapes.len() as u64,
        };
        self.worker.request_step(request)?;
        self.emit(JobEvent::WillStep);
        Ok(())
    }

    /// Run continuously. Starts a step right away unless one is in flight.
    pub fn start(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        self.running = true;
        log::info!("{}: started", self.name);
        if !self.worker.is_busy() {
            if let Err(e) = self.step_once() {
                self.running = false;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Stop re-arming. A step in flight still completes and commits.
    pub fn stop(&mut self) {
        if self.running {
            log::info!("{}: stopped after {} shapes", self.name, self.shapes.len());
        }
        self.running = false;
    }

    pub fn toggle_running(&mut self) -> Result<()> {
        if self.running {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }

    /// Drop every shape and restore the initial image. Only valid while no
    /// step is in flight; target and options are kept.
    pub fn clear(&mut self) -> Result<()> {
        if self.worker.is_busy() {
            log::error!("{}: clear requested while a step is in flight", self.name);
            return Err(JobError::StepAlreadyInFlight);
        }
        self.running = false;
        self.shapes.clear();
        self.current = self.initial.clone();
        self.score = difference_full(&self.target, &self.current);
        log::info!("{}: cleared", self.name);
        Ok(())
    }

    /// Commit a finished step if the worker has one, re-arming when running.
    /// Returns the number of shapes committed (0 or 1). Never blocks.
    pub fn poll(&mut self) -> Result<usize> {
        profiling::scope!("ImageJob::poll");
        match self.worker.try_recv() {
            Ok(Some(reply)) => self.finish_step(reply),
            Ok(None) => Ok(0),
            Err(e) => {
                self.running = false;
                Err(e)
            }
        }
    }

    /// Block until the step in flight finishes and commit it. Returns 0 when
    /// nothing was in flight. A running job re-arms as with `poll`.
    pub fn wait(&mut self) -> Result<usize> {
        profiling::scope!("ImageJob::wait");
        match self.worker.recv() {
            Ok(Some(reply)) => self.finish_step(reply),
            Ok(None) => Ok(0),
            Err(e) => {
                self.running = false;
                Err(e)
            }
        }
    }

    /// `step_once` followed by `wait`
    pub fn step_blocking(&mut self) -> Result<usize> {
        self.step_once()?;
        self.wait()
    }

    /// Commit a caller-chosen shape and colour as if a step had produced it.
    /// Only valid while no step is in flight.
    pub fn draw_shape(&mut self, shape: Shape, color: Rgba) -> Result<ShapeResult> {
        if self.worker.is_busy() {
            log::error!("{}: draw_shape called while a step is in flight", self.name);
            return Err(JobError::StepAlreadyInFlight);
        }
        self.emit(JobEvent::WillStep);
        let result = self.commit(shape, color);
        self.emit(JobEvent::DidStep(vec![result]));
        Ok(result)
    }

    fn finish_step(&mut self, reply: StepReply) -> Result<usize> {
        let candidate = match reply.result {
            Ok(candidate) => candidate,
            Err(e) => {
                self.running = false;
                log::warn!("{}: step {} failed: {e}", self.name, reply.step_index);
                return Err(e);
            }
        };
        debug_assert_eq!(reply.step_index, self.shapes.len() as u64);

        let result = self.commit(candidate.shape, candidate.color.to_rgba());
        self.emit(JobEvent::DidStep(vec![result]));

        if self.running {
            if let Err(e) = self.step_once() {
                self.running = false;
                log::warn!("{}: stopped, could not schedule next step: {e}", self.name);
                return Err(e);
            }
        }
        Ok(1)
    }

    /// the only place `current` is written
    fn commit(&mut self, shape: Shape, color: Rgba) -> ShapeResult {
        profiling::scope!("ImageJob::commit");
        let lines = shape.rasterize(self.target.width(), self.target.height());

        // the worker has released its snapshot, so this is normally in place
        let current = Arc::make_mut(&mut self.current);
        let before = copy_lines(current, &lines);
        draw_lines(current, &lines, color);
        self.score = difference_partial(&self.target, &before, current, &lines, self.score);

        let result = ShapeResult { shape, color, score: self.score };
        self.shapes.push(result);
        log::debug!(
            "{}: shape {} is a {} ({} spans), score {:.6}",
            self.name,
            self.shapes.len(),
            shape.kind(),
            lines.len(),
            self.score
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{ShapeType, ShapeTypes};

    fn gradient(w: u32, h: u32) -> Bitmap {
        let mut bmp = Bitmap::new(w, h, Rgba::BLACK).unwrap();
        for y in 0..h {
            for x in 0..w {
                bmp.set_pixel(x, y, Rgba::new((x * 255 / w) as u8, 40, (y * 255 / h) as u8, 255));
            }
        }
        bmp
    }

    fn quick_options(seed: u64) -> RunOptions {
        RunOptions {
            candidate_shapes_per_step: 6,
            mutations_per_candidate: 15,
            max_threads: 2,
            seed,
            ..RunOptions::default()
        }
    }

    fn no_kinds(seed: u64) -> RunOptions {
        RunOptions { shape_types: ShapeTypes::empty(), ..quick_options(seed) }
    }

    fn quick_job(seed: u64) -> ImageJob {
        let mut job = ImageJob::new(gradient(24, 18), None).unwrap();
        job.set_options(quick_options(seed)).unwrap();
        job
    }

    #[test]
    fn default_background_is_average_color() {
        let target = gradient(10, 10);
        let avg = target.average_color();
        let job = ImageJob::new(target, None).unwrap();
        assert_eq!(job.current().get_pixel(3, 7), avg);
        assert_eq!(job.current(), job.initial());
        assert!(job.shapes().is_empty());
        assert_eq!(job.state(), JobState::Idle);
    }

    #[test]
    fn mismatched_initial_rejected() {
        let r = ImageJob::new(gradient(4, 4), Some(Bitmap::new(4, 3, Rgba::BLACK).unwrap()));
        assert!(matches!(r, Err(JobError::InvalidDimensions(_))));
    }

    #[test]
    fn jobs_get_unique_names() {
        let a = ImageJob::new(gradient(2, 2), None).unwrap();
        let b = ImageJob::new(gradient(2, 2), None).unwrap().with_name("custom");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.display_name(), format!("job-{}", a.id()));
        assert_eq!(b.display_name(), "custom");
    }

    #[test]
    fn step_commits_exactly_one_shape_inside_its_scanlines() {
        let mut job = quick_job(11);
        let before = job.current().clone();

        assert_eq!(job.step_blocking().unwrap(), 1);
        assert_eq!(job.shapes().len(), 1);

        let shape = job.shapes()[0].shape;
        let lines = shape.rasterize(24, 18);
        let covered = |x: u32, y: u32| {
            let (x, y) = (x as i32, y as i32);
            lines.iter().any(|l| l.y == y && l.x1 <= x && x <= l.x2)
        };
        for y in 0..18 {
            for x in 0..24 {
                if !covered(x, y) {
                    assert_eq!(job.current().get_pixel(x, y), before.get_pixel(x, y));
                }
            }
        }
        // the recorded score matches the real pixels
        let full = difference_full(job.target(), job.current());
        assert!((job.score() - full).abs() < 1e-9);
        assert_eq!(job.shapes()[0].score, job.score());
    }

    #[test]
    fn same_seed_same_shapes() {
        let run = || {
            let mut job = quick_job(42);
            for _ in 0..5 {
                job.step_blocking().unwrap();
            }
            job.shapes().to_vec()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn clear_restores_initial_image() {
        let mut job = quick_job(3);
        let initial_score = job.score();
        for _ in 0..3 {
            job.step_blocking().unwrap();
        }
        job.clear().unwrap();
        assert!(job.shapes().is_empty());
        assert_eq!(job.current(), job.initial());
        assert_eq!(job.score(), initial_score);

        // idempotent, and steps replay exactly as on a fresh job
        job.clear().unwrap();
        job.step_blocking().unwrap();
        let mut fresh = quick_job(3);
        fresh.step_blocking().unwrap();
        assert_eq!(job.shapes(), fresh.shapes());
    }

    #[test]
    fn white_rectangle_on_black_improves() {
        let target = Bitmap::new(2, 2, Rgba::WHITE).unwrap();
        let initial = Bitmap::new(2, 2, Rgba::BLACK).unwrap();
        let mut job = ImageJob::new(target, Some(initial)).unwrap();
        job.set_options(RunOptions {
            shape_types: ShapeType::Rectangle.into(),
            alpha: 255,
            candidate_shapes_per_step: 1,
            mutations_per_candidate: 0,
            seed: 1,
            ..RunOptions::default()
        })
        .unwrap();

        let before = job.score();
        job.step_blocking().unwrap();
        let committed = job.shapes()[0];
        assert_eq!(committed.shape.kind(), ShapeType::Rectangle);
        assert!(!committed.shape.rasterize(2, 2).is_empty());
        assert_eq!(committed.color, Rgba::WHITE);
        assert!(committed.score < before);
    }

    #[test]
    fn empty_mask_refuses_step() {
        let mut job = quick_job(1);
        job.set_options(no_kinds(1)).unwrap();
        let before = job.current().clone();

        assert!(matches!(job.step_once(), Err(JobError::NoEnabledShapeTypes)));
        assert!(matches!(job.start(), Err(JobError::NoEnabledShapeTypes)));
        assert_eq!(job.state(), JobState::Idle);
        assert!(job.shapes().is_empty());
        assert_eq!(job.current(), &before);
    }

    #[test]
    fn second_step_while_in_flight_refused() {
        let mut job = quick_job(5);
        job.step_once().unwrap();
        assert_eq!(job.state(), JobState::Stepping);
        assert!(matches!(job.step_once(), Err(JobError::StepAlreadyInFlight)));
        assert!(matches!(job.clear(), Err(JobError::StepAlreadyInFlight)));
        assert!(matches!(
            job.draw_shape(Shape::Circle { x: 1, y: 1, r: 2 }, Rgba::WHITE),
            Err(JobError::StepAlreadyInFlight)
        ));
        assert!(job.shapes().is_empty());

        assert_eq!(job.wait().unwrap(), 1);
        assert_eq!(job.shapes().len(), 1);
        assert_eq!(job.state(), JobState::Idle);
    }

    #[test]
    fn running_rearms_until_stopped() {
        let mut job = quick_job(8);
        job.start().unwrap();
        assert_eq!(job.state(), JobState::Running);

        for _ in 0..3 {
            assert_eq!(job.wait().unwrap(), 1);
            // next step already scheduled
            assert!(job.is_stepping());
        }
        job.stop();
        assert_eq!(job.state(), JobState::Stepping);
        // the step in flight still lands, nothing follows it
        assert_eq!(job.wait().unwrap(), 1);
        assert_eq!(job.shapes().len(), 4);
        assert_eq!(job.state(), JobState::Idle);
        assert_eq!(job.wait().unwrap(), 0);
    }

    #[test]
    fn events_bracket_each_step() {
        let mut job = quick_job(2);
        let rx = job.subscribe();
        job.step_blocking().unwrap();

        assert_eq!(rx.try_recv().unwrap(), JobEvent::WillStep);
        match rx.try_recv().unwrap() {
            JobEvent::DidStep(results) => assert_eq!(results, job.shapes().to_vec()),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(rx.try_recv().is_err());

        // a dropped subscriber does not break emission
        drop(rx);
        job.step_blocking().unwrap();
    }

    fn white_on_black(w: u32, h: u32) -> ImageJob {
        let target = Bitmap::new(w, h, Rgba::WHITE).unwrap();
        let initial = Bitmap::new(w, h, Rgba::BLACK).unwrap();
        ImageJob::new(target, Some(initial)).unwrap()
    }

    #[test]
    fn manual_draw_commits_given_color() {
        let mut job = white_on_black(4, 4);
        let before = job.score();
        let square = Shape::Rectangle { x1: 0, y1: 0, x2: 1, y2: 1 };
        let result = job.draw_shape(square, Rgba::WHITE).unwrap();
        assert_eq!(job.current().get_pixel(1, 1), Rgba::WHITE);
        assert_eq!(job.current().get_pixel(2, 2), Rgba::BLACK);
        assert_eq!(result.score, job.score());
        assert!(job.score() < before);
    }

    #[test]
    fn options_change_applies_to_next_step() {
        let mut job = quick_job(4);
        job.step_once().unwrap();
        let lines_only = RunOptions { shape_types: ShapeType::Line.into(), ..quick_options(4) };
        job.set_options(lines_only).unwrap();
        job.wait().unwrap();
        job.step_blocking().unwrap();
        assert_eq!(job.shapes()[1].shape.kind(), ShapeType::Line);

        let no_chains = RunOptions { candidate_shapes_per_step: 0, ..quick_options(4) };
        assert!(job.set_options(no_chains).is_err());
    }

    #[test]
    fn emptied_mask_ends_run_after_commit() {
        let mut job = quick_job(6);
        job.start().unwrap();
        job.set_options(no_kinds(6)).unwrap();

        // the step in flight used the old options and still lands
        assert!(matches!(job.wait(), Err(JobError::NoEnabledShapeTypes)));
        assert_eq!(job.shapes().len(), 1);
        assert_eq!(job.state(), JobState::Idle);
        assert!(!job.is_running());
    }

    #[test]
    fn emptied_mask_reported_through_poll() {
        let mut job = quick_job(9);
        job.start().unwrap();
        job.set_options(no_kinds(9)).unwrap();

        let err = loop {
            match job.poll() {
                Ok(0) => std::thread::yield_now(),
                Ok(n) => panic!("poll committed {n} shapes without an error"),
                Err(e) => break e,
            }
        };
        assert!(matches!(err, JobError::NoEnabledShapeTypes));
        assert_eq!(job.shapes().len(), 1);
        assert_eq!(job.state(), JobState::Idle);
    }

    #[test]
    fn failed_step_stops_run_without_commit() {
        let mut job = quick_job(10);
        // bypass set_options so the worker sees options its own validation rejects
        job.options.candidate_shapes_per_step = 0;
        job.start().unwrap();

        assert!(matches!(job.wait(), Err(JobError::InvalidOptions(_))));
        assert!(job.shapes().is_empty());
        assert_eq!(job.current(), job.initial());
        assert_eq!(job.state(), JobState::Idle);
    }

    #[test]
    fn manual_draw_of_huge_shape_is_clipped() {
        let mut job = white_on_black(4, 4);
        let huge = Shape::Triangle { points: [(-2_000_000_000, 0), (2_000_000_000, 0), (0, 3)] };
        job.draw_shape(huge, Rgba::WHITE).unwrap();
        assert_eq!(job.current().get_pixel(3, 0), Rgba::WHITE);
        assert_eq!(job.current().get_pixel(0, 3), Rgba::WHITE);
        assert_eq!(job.current().get_pixel(3, 3), Rgba::BLACK);

        let far = Shape::Line { x1: -60_000_000, y1: -5, x2: -1, y2: -5 };
        let before = job.current().clone();
        job.draw_shape(far, Rgba::WHITE).unwrap();
        assert_eq!(job.current(), &before);
        assert_eq!(job.shapes().len(), 2);
    }
}
