use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::exit::{JobExit, JobExitKind};
use crate::status::StatusCell;
use crate::token::RunToken;
use crate::work::{JobContext, Severity, WorkUnit};

/// Everything one background thread needs to drive the work unit.
pub(super) struct Run<W>
where
	W: WorkUnit,
{
	pub name: String,
	pub work: Arc<Mutex<W>>,
	pub last_error: Arc<ArcSwapOption<W::Error>>,
	pub status: Arc<StatusCell>,
	pub token: RunToken,
}

impl<W> Run<W>
where
	W: WorkUnit,
{
	/// Main loop. Runs on the background thread until the work completes,
	/// a step fails, or the run token is cancelled.
	pub fn execute(self) {
		let generation = self.token.generation();
		let mut exit = ExitGuard {
			status: &self.status,
			name: &self.name,
			generation,
			steps: 0,
			outcome: None,
		};
		let ctx = JobContext::new(self.token.clone(), Arc::clone(&self.status));

		let outcome = loop {
			if self.token.is_cancelled() {
				break (JobExitKind::Stopped, None);
			}

			let mut work = self.work.lock();
			if work.is_complete() {
				break (JobExitKind::Completed, None);
			}

			let Err(err) = work.execute_one(&ctx) else {
				exit.steps = exit.steps.wrapping_add(1);
				continue;
			};

			let message = err.to_string();
			match work.classify(&err) {
				Severity::Recoverable => {
					// Published under the status lock and before the status flips,
					// so anyone who sees the job stopped also sees the error and a
					// newer generation can never inherit it.
					let status = self.status.lock();
					if status.generation == generation {
						self.last_error.store(Some(Arc::new(err)));
					} else {
						tracing::debug!(
							job = %self.name,
							generation,
							current = status.generation,
							error = %message,
							"job.exit.stale_error"
						);
					}
					drop(status);
					break (JobExitKind::Failed, Some(message));
				}
				Severity::Fatal => {
					tracing::error!(job = %self.name, generation, error = %message, "job.fatal");
					break (JobExitKind::Fatal, Some(message));
				}
			}
		};

		exit.outcome = Some(outcome);
	}
}

/// Reconciles the shared status when the background thread leaves the main
/// loop, including by unwinding out of a panicking step.
struct ExitGuard<'a> {
	status: &'a StatusCell,
	name: &'a str,
	generation: u64,
	steps: u64,
	outcome: Option<(JobExitKind, Option<String>)>,
}

impl Drop for ExitGuard<'_> {
	fn drop(&mut self) {
		let (kind, message) = self.outcome.take().unwrap_or((JobExitKind::Panicked, None));
		tracing::debug!(
			job = %self.name,
			generation = self.generation,
			steps = self.steps,
			reason = kind.as_str(),
			"job.exit"
		);

		{
			let mut status = self.status.lock();
			// A run detached after a stop timeout must not clobber a newer one.
			if status.generation == self.generation {
				status.running = false;
				status.live = None;
				status.last_exit = Some(JobExit::new(kind, self.generation, self.steps, message));
			}
		}
		self.status.notify();
	}
}
