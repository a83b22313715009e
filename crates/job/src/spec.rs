use std::time::Duration;

/// Default time [`JobController::stop`](crate::JobController::stop) waits
/// for the background thread before detaching it.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

const DEFAULT_NAME: &str = "bgjob";

/// Configuration for one job controller.
///
/// The name is used as the OS thread name and as the `job` field on every
/// log event emitted by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
	pub(crate) name: String,
	pub(crate) grace_period: Duration,
}

impl JobSpec {
	/// Creates a spec with the given name and default settings.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	/// Sets how long `stop` waits for the current step to finish.
	///
	/// A zero grace period means `stop` never waits.
	#[must_use]
	pub fn grace_period(mut self, grace_period: Duration) -> Self {
		self.grace_period = grace_period;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn grace(&self) -> Duration {
		self.grace_period
	}
}

impl Default for JobSpec {
	fn default() -> Self {
		Self {
			name: DEFAULT_NAME.to_string(),
			grace_period: DEFAULT_GRACE_PERIOD,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builder_overrides_defaults() {
		let spec = JobSpec::new("indexer").grace_period(Duration::from_millis(250));
		assert_eq!(spec.name(), "indexer");
		assert_eq!(spec.grace(), Duration::from_millis(250));
	}

	#[test]
	fn default_waits_one_second() {
		let spec = JobSpec::default();
		assert_eq!(spec.name(), "bgjob");
		assert_eq!(spec.grace(), DEFAULT_GRACE_PERIOD);
	}
}
