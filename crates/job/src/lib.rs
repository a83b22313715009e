//! Restartable background jobs on a dedicated thread.
//!
//! A [`JobController`] drives a [`WorkUnit`] one step at a time on its own OS
//! thread until the work reports completion, a step fails, or a caller asks
//! it to stop. Any thread may start, stop, or wait on the controller.
//!
//! ```no_run
//! use std::convert::Infallible;
//! use std::time::Duration;
//!
//! use bgjob::{JobContext, JobController, WorkUnit};
//!
//! struct Countdown(u32);
//!
//! impl WorkUnit for Countdown {
//! 	type Error = Infallible;
//!
//! 	fn is_complete(&mut self) -> bool {
//! 		self.0 == 0
//! 	}
//!
//! 	fn execute_one(&mut self, _ctx: &JobContext) -> Result<(), Self::Error> {
//! 		self.0 -= 1;
//! 		Ok(())
//! 	}
//! }
//!
//! let job = JobController::new(Countdown(3));
//! job.start()?;
//! assert!(job.wait_to_stop(Duration::from_secs(1)));
//! # Ok::<(), bgjob::JobError>(())
//! ```

mod controller;
mod error;
mod exit;
mod spec;
mod status;
mod token;
mod work;

pub use controller::JobController;
pub use error::JobError;
pub use exit::{JobExit, JobExitKind, StopReport};
pub use spec::{DEFAULT_GRACE_PERIOD, JobSpec};
pub use work::{JobContext, Severity, WorkUnit};
