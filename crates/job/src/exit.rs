use std::any::Any;

/// How a background run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum JobExitKind {
	/// The work unit reported completion.
	Completed,
	/// A stop was requested and the run ended between steps.
	Stopped,
	/// A step returned a recoverable error, now held by the controller.
	Failed,
	/// A step returned an error classified as fatal.
	Fatal,
	/// A step panicked.
	Panicked,
}

impl JobExitKind {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Completed => "completed",
			Self::Stopped => "stopped",
			Self::Failed => "failed",
			Self::Fatal => "fatal",
			Self::Panicked => "panicked",
		}
	}
}

/// Exit summary for one background run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobExit {
	kind: JobExitKind,
	generation: u64,
	steps: u64,
	message: Option<String>,
}

impl JobExit {
	pub(crate) fn new(kind: JobExitKind, generation: u64, steps: u64, message: Option<String>) -> Self {
		Self {
			kind,
			generation,
			steps,
			message,
		}
	}

	pub fn kind(&self) -> JobExitKind {
		self.kind
	}

	/// Generation of the run this summary belongs to.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Number of steps that returned `Ok` during the run.
	pub fn steps(&self) -> u64 {
		self.steps
	}

	pub fn message(&self) -> Option<&str> {
		self.message.as_deref()
	}

	pub fn is_failure(&self) -> bool {
		matches!(self.kind, JobExitKind::Failed | JobExitKind::Fatal | JobExitKind::Panicked)
	}

	pub(crate) fn set_message(&mut self, message: String) {
		self.message = Some(message);
	}
}

/// Result of [`JobController::stop`](crate::JobController::stop).
#[derive(Debug, Clone)]
pub struct StopReport {
	completed: bool,
	timed_out: bool,
	last_exit: Option<JobExit>,
}

impl StopReport {
	pub(crate) fn idle(last_exit: Option<JobExit>) -> Self {
		Self {
			completed: true,
			timed_out: false,
			last_exit,
		}
	}

	pub(crate) fn new(completed: bool, last_exit: Option<JobExit>) -> Self {
		Self {
			completed,
			timed_out: !completed,
			last_exit,
		}
	}

	pub(crate) fn detached(last_exit: Option<JobExit>) -> Self {
		Self {
			completed: false,
			timed_out: false,
			last_exit,
		}
	}

	/// The background thread (if any) exited and was joined.
	pub fn completed(&self) -> bool {
		self.completed
	}

	/// The thread did not exit within the grace period and was detached.
	///
	/// A stop requested from the background thread itself is neither
	/// completed nor timed out: the thread is detached and winds down after
	/// the current step.
	pub fn timed_out(&self) -> bool {
		self.timed_out
	}

	pub fn last_exit(&self) -> Option<&JobExit> {
		self.last_exit.as_ref()
	}
}

/// Extracts the message from a panic payload, if it is a string.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
	if let Some(s) = payload.downcast_ref::<&'static str>() {
		return Some((*s).to_string());
	}
	payload.downcast_ref::<String>().cloned()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_static_str_payload() {
		let err = std::thread::spawn(|| panic!("boom-str")).join().unwrap_err();
		let msg = panic_message(err.as_ref()).expect("should be a string panic");
		assert!(msg.contains("boom-str"), "expected 'boom-str', got: {msg}");
	}

	#[test]
	fn extracts_string_payload() {
		let err = std::thread::spawn(|| panic!("{}", String::from("boom-string"))).join().unwrap_err();
		let msg = panic_message(err.as_ref()).expect("should be a string panic");
		assert!(msg.contains("boom-string"), "expected 'boom-string', got: {msg}");
	}

	#[test]
	fn returns_none_for_opaque_payload() {
		let err = std::thread::spawn(|| std::panic::panic_any(42u32)).join().unwrap_err();
		assert!(panic_message(err.as_ref()).is_none());
	}

	#[test]
	fn failure_kinds() {
		assert!(!JobExit::new(JobExitKind::Completed, 1, 5, None).is_failure());
		assert!(!JobExit::new(JobExitKind::Stopped, 1, 0, None).is_failure());
		assert!(JobExit::new(JobExitKind::Failed, 1, 0, Some("x".into())).is_failure());
		assert!(JobExit::new(JobExitKind::Panicked, 1, 0, None).is_failure());
	}
}
