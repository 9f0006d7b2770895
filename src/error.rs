//! Error types for filesync operations

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Main error type for diff and sync operations
#[derive(Debug)]
pub enum FileSyncError {
	/// I/O error
	Io(io::Error),

	/// Invalid configuration
	InvalidConfig { message: String },

	/// A filter or exclude pattern did not compile
	Filter(FilterError),

	/// Source or destination root is not usable
	MissingRoot { path: PathBuf },

	/// A value of the wrong kind was supplied where another was expected
	WrongKind { expected: &'static str, found: String },

	/// Generic error message
	Other { message: String },
}

impl fmt::Display for FileSyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FileSyncError::Io(e) => write!(f, "I/O error: {}", e),
			FileSyncError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			FileSyncError::Filter(e) => write!(f, "Filter error: {}", e),
			FileSyncError::MissingRoot { path } => {
				write!(f, "Root directory does not exist: {}", path.display())
			}
			FileSyncError::WrongKind { expected, found } => {
				write!(f, "expected {}, got {}", expected, found)
			}
			FileSyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for FileSyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			FileSyncError::Io(e) => Some(e),
			FileSyncError::Filter(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for FileSyncError {
	fn from(e: io::Error) -> Self {
		FileSyncError::Io(e)
	}
}

impl From<FilterError> for FileSyncError {
	fn from(e: FilterError) -> Self {
		FileSyncError::Filter(e)
	}
}

impl From<String> for FileSyncError {
	fn from(e: String) -> Self {
		FileSyncError::Other { message: e }
	}
}

/// Errors raised while compiling path filters
#[derive(Debug)]
pub enum FilterError {
	/// Regular expression failed to compile
	InvalidRegex { pattern: String, message: String },

	/// Glob pattern failed to parse
	InvalidGlob { pattern: String, message: String },
}

impl fmt::Display for FilterError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FilterError::InvalidRegex { pattern, message } => {
				write!(f, "Invalid regex pattern '{}': {}", pattern, message)
			}
			FilterError::InvalidGlob { pattern, message } => {
				write!(f, "Invalid glob pattern '{}': {}", pattern, message)
			}
		}
	}
}

impl Error for FilterError {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display_messages() {
		let e = FileSyncError::MissingRoot { path: PathBuf::from("/nowhere") };
		assert_eq!(e.to_string(), "Root directory does not exist: /nowhere");

		let e = FileSyncError::WrongKind { expected: "ChangeSet", found: "array".to_string() };
		assert_eq!(e.to_string(), "expected ChangeSet, got array");

		let e: FileSyncError =
			FilterError::InvalidRegex { pattern: "(".to_string(), message: "unclosed".to_string() }
				.into();
		assert!(e.to_string().contains("Invalid regex pattern '('"));
	}

	#[test]
	fn test_io_source_is_kept() {
		let e: FileSyncError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
		assert!(e.source().is_some());
	}
}

// vim: ts=4
