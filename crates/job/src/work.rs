use std::sync::Arc;
use std::time::Duration;

use crate::status::StatusCell;
use crate::token::RunToken;

/// How the main loop treats an error returned from a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
	/// Record the error, stop iterating, leave the process intact.
	#[default]
	Recoverable,
	/// End the run without recording the error in the error slot.
	Fatal,
}

/// Unit of work driven by a [`JobController`](crate::JobController).
///
/// Both methods are only ever called from the controller's background
/// thread, one call at a time, so implementations only need their own
/// synchronization for state shared with other threads.
pub trait WorkUnit: Send + 'static {
	type Error: std::error::Error + Send + Sync + 'static;

	/// Queried before every step. Once this returns `true` the run ends
	/// without calling [`Self::execute_one`] again.
	fn is_complete(&mut self) -> bool;

	/// Performs one step.
	fn execute_one(&mut self, ctx: &JobContext) -> Result<(), Self::Error>;

	/// Classifies a step error. Everything is recoverable unless overridden.
	fn classify(&self, _err: &Self::Error) -> Severity {
		Severity::Recoverable
	}
}

/// Per-run context handed to each step.
pub struct JobContext {
	token: RunToken,
	status: Arc<StatusCell>,
}

impl JobContext {
	pub(crate) fn new(token: RunToken, status: Arc<StatusCell>) -> Self {
		Self { token, status }
	}

	/// Generation of the run executing this step.
	pub fn generation(&self) -> u64 {
		self.token.generation()
	}

	/// Returns whether a stop has been requested for this run.
	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}

	/// Sleeps for up to `timeout`, waking early when a stop is requested.
	///
	/// Returns `true` if the run was cancelled.
	pub fn wait_cancelled(&self, timeout: Duration) -> bool {
		self.status.wait_cancelled(&self.token, timeout)
	}
}

impl std::fmt::Debug for JobContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("JobContext")
			.field("generation", &self.token.generation())
			.field("cancelled", &self.token.is_cancelled())
			.finish()
	}
}
