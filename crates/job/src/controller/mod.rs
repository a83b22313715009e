//! Background job controller.
//!
//! A [`JobController`] owns at most one background thread at a time. The
//! thread repeatedly asks its [`WorkUnit`] whether it is complete and, if
//! not, runs one step. It stops on its own when the work completes or a step
//! fails, or when [`JobController::stop`] is called from any thread.
//!
//! Shutdown is cooperative: a step in flight is never interrupted. If the
//! thread does not exit within the grace period it is detached and the stop
//! is reported as timed out. Detached runs keep their own cancellation token
//! and generation, so they cannot disturb a later run of the same controller.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::error::JobError;
use crate::exit::{JobExit, StopReport, panic_message};
use crate::spec::JobSpec;
use crate::status::StatusCell;
use crate::token::{GenerationClock, RunToken};
use crate::work::WorkUnit;

mod run;

use run::Run;

/// Handle of the thread currently associated with a controller.
struct Worker {
	handle: JoinHandle<()>,
	token: RunToken,
}

/// How joining a worker thread went.
enum JoinOutcome {
	Exited,
	TimedOut,
	/// `stop` was called from the worker thread itself.
	Detached,
}

/// Runs a [`WorkUnit`] on a dedicated, restartable background thread.
pub struct JobController<W>
where
	W: WorkUnit,
{
	spec: JobSpec,
	work: Arc<Mutex<W>>,
	last_error: Arc<ArcSwapOption<W::Error>>,
	status: Arc<StatusCell>,
	/// Serializes `start`/`stop`. Lock order: `control` before `status`.
	control: Mutex<Option<Worker>>,
	clock: GenerationClock,
}

impl<W> JobController<W>
where
	W: WorkUnit,
{
	/// Creates an idle controller with the default [`JobSpec`].
	pub fn new(work: W) -> Self {
		Self::with_spec(JobSpec::default(), work)
	}

	/// Creates an idle controller.
	pub fn with_spec(spec: JobSpec, work: W) -> Self {
		Self {
			spec,
			work: Arc::new(Mutex::new(work)),
			last_error: Arc::new(ArcSwapOption::empty()),
			status: Arc::new(StatusCell::default()),
			control: Mutex::new(None),
			clock: GenerationClock::new(),
		}
	}

	pub fn name(&self) -> &str {
		&self.spec.name
	}

	pub fn spec(&self) -> &JobSpec {
		&self.spec
	}

	/// Starts the background thread unless it is already running.
	///
	/// Returns immediately. A thread left over from a run that ended on its
	/// own is reaped first, then a fresh thread with a new generation is
	/// spawned.
	pub fn start(&self) -> Result<(), JobError> {
		let mut control = self.control.lock();

		if let Some(worker) = control.as_ref()
			&& self.status.lock().running
		{
			tracing::trace!(job = %self.spec.name, generation = worker.token.generation(), "job.start.noop");
			return Ok(());
		}

		if let Some(worker) = control.take() {
			tracing::debug!(job = %self.spec.name, generation = worker.token.generation(), "job.reap");
			self.join_worker(worker);
		}

		let generation = self.clock.next();
		let token = RunToken::new(generation);
		{
			let mut status = self.status.lock();
			status.running = true;
			status.attached = true;
			status.generation = generation;
			status.live = Some(generation);
		}

		let run = Run {
			name: self.spec.name.clone(),
			work: Arc::clone(&self.work),
			last_error: Arc::clone(&self.last_error),
			status: Arc::clone(&self.status),
			token: token.clone(),
		};

		match thread::Builder::new().name(self.spec.name.clone()).spawn(move || run.execute()) {
			Ok(handle) => {
				tracing::debug!(job = %self.spec.name, generation, "job.start");
				*control = Some(Worker { handle, token });
				Ok(())
			}
			Err(source) => {
				{
					let mut status = self.status.lock();
					status.running = false;
					status.attached = false;
					status.live = None;
				}
				self.status.notify();
				tracing::error!(job = %self.spec.name, generation, error = %source, "job.spawn_failed");
				Err(JobError::Spawn {
					name: self.spec.name.clone(),
					source,
				})
			}
		}
	}

	/// Requests the background thread to stop and waits up to the grace
	/// period for it to exit.
	///
	/// The step in flight, if any, runs to completion. The thread handle is
	/// released whether or not the thread exited in time. Calling `stop` on
	/// an idle controller returns immediately.
	pub fn stop(&self) -> StopReport {
		let mut control = self.control.lock();
		let worker = control.take();

		if let Some(worker) = worker.as_ref() {
			worker.token.cancel();
		}
		self.status.lock().running = false;
		self.status.notify();

		let Some(worker) = worker else {
			return StopReport::idle(self.last_exit());
		};

		let generation = worker.token.generation();
		let outcome = self.join_worker(worker);
		self.status.lock().attached = false;
		self.status.notify();

		let last_exit = self.last_exit();
		tracing::debug!(
			job = %self.spec.name,
			generation,
			reason = last_exit.as_ref().map(|e| e.kind().as_str()),
			"job.stop"
		);

		match outcome {
			JoinOutcome::Exited => StopReport::new(true, last_exit),
			JoinOutcome::TimedOut => StopReport::new(false, last_exit),
			JoinOutcome::Detached => StopReport::detached(last_exit),
		}
	}

	/// Waits up to `timeout` for the job to stop on its own or through a
	/// `stop` call from elsewhere. Does not request a stop.
	///
	/// Returns `true` if the job is no longer running.
	pub fn wait_to_stop(&self, timeout: Duration) -> bool {
		self.status.wait_until(timeout, |s| !s.is_running())
	}

	/// Returns `true` while the job intends to iterate and owns a thread.
	pub fn is_running(&self) -> bool {
		self.status.lock().is_running()
	}

	/// Last recoverable error raised by a step.
	///
	/// Survives restarts; only [`Self::take_error`] clears it.
	pub fn error(&self) -> Option<Arc<W::Error>> {
		self.last_error.load_full()
	}

	/// Removes and returns the last recoverable error.
	pub fn take_error(&self) -> Option<Arc<W::Error>> {
		self.last_error.swap(None)
	}

	/// Exit summary of the most recent run that has ended.
	pub fn last_exit(&self) -> Option<JobExit> {
		self.status.lock().last_exit.clone()
	}

	/// Generation of the most recently started run, `0` if never started.
	pub fn generation(&self) -> u64 {
		self.status.lock().generation
	}

	/// Runs `f` against the work unit between steps.
	///
	/// Blocks while a step is executing.
	pub fn with_work<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
		f(&mut self.work.lock())
	}

	fn join_worker(&self, worker: Worker) -> JoinOutcome {
		let Worker { handle, token } = worker;
		let generation = token.generation();

		if handle.thread().id() == thread::current().id() {
			tracing::debug!(job = %self.spec.name, generation, "job.stop.from_worker");
			return JoinOutcome::Detached;
		}

		let grace = self.spec.grace_period;
		if !self.status.wait_until(grace, |s| s.has_exited(generation)) {
			tracing::warn!(
				job = %self.spec.name,
				generation,
				grace = ?grace,
				"job.stop.timeout"
			);
			return JoinOutcome::TimedOut;
		}

		if let Err(payload) = handle.join() {
			let message = panic_message(payload.as_ref());
			tracing::error!(
				job = %self.spec.name,
				generation,
				panic = message.as_deref().unwrap_or("<non-string payload>"),
				"job.panicked"
			);
			if let Some(message) = message {
				let mut status = self.status.lock();
				if let Some(exit) = status.last_exit.as_mut().filter(|e| e.generation() == generation) {
					exit.set_message(message);
				}
			}
		}
		JoinOutcome::Exited
	}
}

impl<W> Drop for JobController<W>
where
	W: WorkUnit,
{
	fn drop(&mut self) {
		if self.control.get_mut().is_some() {
			let _ = self.stop();
		}
	}
}

impl<W> std::fmt::Debug for JobController<W>
where
	W: WorkUnit,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let status = self.status.lock();
		f.debug_struct("JobController")
			.field("name", &self.spec.name)
			.field("running", &status.is_running())
			.field("generation", &status.generation)
			.field("last_exit", &status.last_exit)
			.finish_non_exhaustive()
	}
}
