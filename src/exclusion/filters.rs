//! File property filters

use std::fs::Metadata;

/// Reject files below a minimum size
///
/// Sizes are compared in whole kilobytes, so a 10 KB limit accepts a file of
/// 10240 bytes but rejects one of 10239.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeFilter {
	min_kb: u64,
}

impl SizeFilter {
	/// Returns None when `min_kb` is 0 (filter disabled)
	pub fn new(min_kb: u64) -> Option<Self> {
		if min_kb == 0 {
			None
		} else {
			Some(Self { min_kb })
		}
	}

	pub fn min_kb(&self) -> u64 {
		self.min_kb
	}

	/// Check if an entry passes the size filter
	///
	/// Directories always pass.
	pub fn matches(&self, metadata: &Metadata) -> bool {
		if metadata.is_dir() {
			return true;
		}
		metadata.len() / 1024 >= self.min_kb
	}
}


// vim: ts=4
