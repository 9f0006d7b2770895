//! Path filtering
//!
//! Decides whether a relative path takes part in a diff, based on inclusion
//! patterns, exclusion patterns and an optional minimum file size.

mod filters;
mod patterns;

pub use filters::SizeFilter;
pub use patterns::PatternSet;

use crate::config::DiffConfig;
use crate::error::FilterError;
use crate::logging::*;
use crate::path_utils;
use std::fs;
use std::path::Path;

/// Combined filter built once per diff run
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
	includes: PatternSet,
	excludes: PatternSet,
	size: Option<SizeFilter>,
}

impl PathFilter {
	/// Compile the filter from a diff configuration
	pub fn new(config: &DiffConfig) -> Result<Self, FilterError> {
		Ok(Self {
			includes: PatternSet::new(&config.filters, config.pattern_mode)?,
			excludes: PatternSet::new(&config.excludes, config.pattern_mode)?,
			size: SizeFilter::new(config.size_limit_kb),
		})
	}

	/// Check whether `rel` should take part in the diff
	///
	/// `abs` is the concrete on-disk path used for the size check. Callers in the
	/// purge direction pass None, so purges are never size filtered.
	pub fn accept(&self, rel: &Path, abs: Option<&Path>) -> bool {
		let name = path_utils::to_slash(rel);

		let mut result = self.includes.is_empty() || self.includes.is_match(&name);

		if self.excludes.is_match(&name) {
			result = false;
		}

		if let (Some(size), Some(abs)) = (self.size.as_ref(), abs) {
			match fs::metadata(abs) {
				Ok(meta) => {
					if !size.matches(&meta) {
						result = false;
					}
				}
				// Can't stat it, leave the decision to the patterns
				Err(e) => debug!("size check skipped for {}: {}", abs.display(), e),
			}
		}

		result
	}
}


// vim: ts=4
