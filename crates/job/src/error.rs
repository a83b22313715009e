//! Error types for controller operations.

use thiserror::Error;

/// Errors returned by [`JobController`](crate::JobController) operations.
///
/// Failures of the work itself never surface here; they are held by the
/// controller and read through [`JobController::error`](crate::JobController::error).
#[derive(Debug, Error)]
pub enum JobError {
	/// The OS refused to spawn the background thread.
	#[error("failed to spawn background thread for job '{name}': {source}")]
	Spawn {
		/// Name of the job whose thread could not be created.
		name: String,
		/// The underlying I/O error.
		#[source]
		source: std::io::Error,
	},
}
