//! Callback traits for progress reporting and cooperative cancellation

/// Receives a message and the percentage of the last diff processed so far
///
/// Invoked synchronously on the applying thread, before each mutation.
pub trait ProgressCallback: Send + Sync {
	fn on_progress(&self, message: &str, percent: f64);
}

impl<F: Fn(&str, f64) + Send + Sync> ProgressCallback for F {
	fn on_progress(&self, message: &str, percent: f64) {
		self(message, percent);
	}
}

/// Default progress callback that does nothing
pub struct NoProgressCallback;

impl ProgressCallback for NoProgressCallback {
	fn on_progress(&self, _message: &str, _percent: f64) {}
}

/// Polled before each parent-directory group; returning false stops the run
pub trait CancelCheck: Send + Sync {
	fn should_continue(&self) -> bool;
}

impl<F: Fn() -> bool + Send + Sync> CancelCheck for F {
	fn should_continue(&self) -> bool {
		self()
	}
}

/// Never cancels
pub struct NeverCancel;

impl CancelCheck for NeverCancel {
	fn should_continue(&self) -> bool {
		true
	}
}


// vim: ts=4
