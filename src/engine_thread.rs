use std::sync::{mpsc, Arc};
use std::thread;

use crate::bitmap::Bitmap;
use crate::engine;
use crate::error::{JobError, Result};
use crate::messages::{StepReply, StepRequest};

/// Background thread that runs one optimizer step at a time for a job.
///
/// Requests go through a single-slot queue and the worker tracks whether a
/// reply is still owed, so a second request before the first reply has been
/// collected is refused instead of queued.
pub struct JobWorker {
    request_tx: Option<mpsc::SyncSender<StepRequest>>,
    reply_rx: mpsc::Receiver<StepReply>,
    handle: Option<thread::JoinHandle<()>>,
    in_flight: bool,
}

impl JobWorker {
    /// spawn the worker thread; `target` is shared read-only for its lifetime
    pub fn spawn(target: Arc<Bitmap>) -> Result<Self> {
        profiling::scope!("JobWorker::spawn");
        let (request_tx, request_rx) = mpsc::sync_channel::<StepRequest>(1);
        let (reply_tx, reply_rx) = mpsc::channel::<StepReply>();

        let handle = thread::Builder::new().name("job-worker".to_owned()).spawn(move || {
            // ends when the job drops its sender
            for request in request_rx {
                profiling::scope!("job_worker_step");
                let StepRequest { options, current, current_score, step_index } = request;
                let result = engine::step(&target, &current, current_score, &options, step_index);
                // release the snapshot first so the job can mutate `current` in place
                drop(current);

                if reply_tx.send(StepReply { step_index, result }).is_err() {
                    break;
                }
            }
        })?;

        Ok(Self { request_tx: Some(request_tx), reply_rx, handle: Some(handle), in_flight: false })
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    pub(crate) fn request_step(&mut self, request: StepRequest) -> Result<()> {
        if self.in_flight {
            log::error!("step {} requested while another step is in flight", request.step_index);
            return Err(JobError::StepAlreadyInFlight);
        }
        let tx = self.request_tx.as_ref().ok_or(JobError::WorkerDisconnected)?;
        tx.send(request).map_err(|_| JobError::WorkerDisconnected)?;
        self.in_flight = true;
        Ok(())
    }

    /// non-blocking check for a finished step
    pub(crate) fn try_recv(&mut self) -> Result<Option<StepReply>> {
        if !self.in_flight {
            return Ok(None);
        }
        match self.reply_rx.try_recv() {
            Ok(reply) => {
                self.in_flight = false;
                Ok(Some(reply))
            }
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => {
                self.in_flight = false;
                Err(JobError::WorkerDisconnected)
            }
        }
    }

    /// block until the in-flight step finishes; None if nothing is in flight
    pub(crate) fn recv(&mut self) -> Result<Option<StepReply>> {
        if !self.in_flight {
            return Ok(None);
        }
        let reply = self.reply_rx.recv().map_err(|_| JobError::WorkerDisconnected);
        self.in_flight = false;
        reply.map(Some)
    }
}

impl Drop for JobWorker {
    fn drop(&mut self) {
        // closing the queue ends the thread loop after any running step
        self.request_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("job worker thread panicked");
            }
        }
    }
}
