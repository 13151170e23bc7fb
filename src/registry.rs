use std::collections::BTreeMap;

use crate::error::{JobError, Result};
use crate::job::ImageJob;

/// Live jobs keyed by display name.
#[derive(Default)]
pub struct JobRegistry {
    jobs: BTreeMap<String, ImageJob>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job under its display name, returning any job it replaced.
    pub fn insert(&mut self, job: ImageJob) -> Option<ImageJob> {
        let name = job.display_name().to_owned();
        log::debug!("registered {name}");
        self.jobs.insert(name, job)
    }

    pub fn get(&self, name: &str) -> Result<&ImageJob> {
        self.jobs.get(name).ok_or_else(|| JobError::UnknownJob(name.to_owned()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut ImageJob> {
        self.jobs.get_mut(name).ok_or_else(|| JobError::UnknownJob(name.to_owned()))
    }

    pub fn remove(&mut self, name: &str) -> Result<ImageJob> {
        self.jobs.remove(name).ok_or_else(|| JobError::UnknownJob(name.to_owned()))
    }

    /// names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Poll every job once. Returns the total number of shapes committed;
    /// a failing job is logged and stopped, the others still get polled.
    pub fn poll_all(&mut self) -> usize {
        profiling::scope!("JobRegistry::poll_all");
        let mut committed = 0;
        for (name, job) in self.jobs.iter_mut() {
            match job.poll() {
                Ok(n) => committed += n,
                Err(e) => log::warn!("{name}: {e}"),
            }
        }
        committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{Bitmap, Rgba};
    use crate::settings::RunOptions;

    fn job(name: &str) -> ImageJob {
        let target = Bitmap::new(6, 6, Rgba::WHITE).unwrap();
        let initial = Bitmap::new(6, 6, Rgba::BLACK).unwrap();
        let mut job = ImageJob::new(target, Some(initial)).unwrap().with_name(name);
        job.set_options(RunOptions {
            candidate_shapes_per_step: 2,
            mutations_per_candidate: 3,
            ..RunOptions::default()
        })
        .unwrap();
        job
    }

    #[test]
    fn lookup_by_name() {
        let mut reg = JobRegistry::new();
        assert!(reg.insert(job("b")).is_none());
        assert!(reg.insert(job("a")).is_none());
        assert_eq!(reg.names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(reg.get("a").unwrap().display_name(), "a");
        assert!(matches!(reg.get("zzz"), Err(JobError::UnknownJob(_))));

        assert!(reg.insert(job("a")).is_some());
        assert_eq!(reg.len(), 2);
        reg.remove("a").unwrap();
        assert!(matches!(reg.remove("a"), Err(JobError::UnknownJob(_))));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn poll_all_commits_finished_steps() {
        let mut reg = JobRegistry::new();
        reg.insert(job("one"));
        reg.insert(job("two"));
        reg.get_mut("one").unwrap().step_once().unwrap();
        reg.get_mut("two").unwrap().step_once().unwrap();

        let mut committed = 0;
        while committed < 2 {
            committed += reg.poll_all();
            std::thread::yield_now();
        }
        assert_eq!(reg.get("one").unwrap().shapes().len(), 1);
        assert_eq!(reg.get("two").unwrap().shapes().len(), 1);
    }
}
