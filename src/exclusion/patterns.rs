//! Compiled inclusion/exclusion pattern lists

use crate::config::PatternMode;
use crate::error::FilterError;
use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;

/// A single compiled pattern
#[derive(Debug, Clone)]
enum Matcher {
	/// Searched anywhere in the path (regex and literal modes)
	Search(Regex),
	/// Matched against the whole path
	Glob(GlobMatcher),
}

impl Matcher {
	fn is_match(&self, text: &str) -> bool {
		match self {
			Matcher::Search(re) => re.is_match(text),
			Matcher::Glob(glob) => glob.is_match(text),
		}
	}
}

/// An ordered list of patterns compiled once per diff run
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
	matchers: Vec<Matcher>,
}

impl PatternSet {
	/// Compile `patterns` according to `mode`
	///
	/// Literal patterns are escaped before compiling so that e.g. `.DS_Store`
	/// only matches a literal dot.
	pub fn new(patterns: &[String], mode: PatternMode) -> Result<Self, FilterError> {
		let mut matchers = Vec::with_capacity(patterns.len());

		for pattern in patterns {
			let matcher = match mode {
				PatternMode::Regex => Matcher::Search(Self::compile_regex(pattern, pattern)?),
				PatternMode::Literal => {
					Matcher::Search(Self::compile_regex(pattern, &regex::escape(pattern))?)
				}
				PatternMode::Glob => {
					let glob = GlobBuilder::new(pattern).literal_separator(true).build().map_err(
						|e| FilterError::InvalidGlob { pattern: pattern.clone(), message: e.to_string() },
					)?;
					Matcher::Glob(glob.compile_matcher())
				}
			};
			matchers.push(matcher);
		}

		Ok(Self { matchers })
	}

	fn compile_regex(original: &str, source: &str) -> Result<Regex, FilterError> {
		Regex::new(source).map_err(|e| FilterError::InvalidRegex {
			pattern: original.to_string(),
			message: e.to_string(),
		})
	}

	pub fn is_empty(&self) -> bool {
		self.matchers.is_empty()
	}

	pub fn len(&self) -> usize {
		self.matchers.len()
	}

	/// True if any pattern matches `text`
	pub fn is_match(&self, text: &str) -> bool {
		self.matchers.iter().any(|m| m.is_match(text))
	}
}


// vim: ts=4
