//! Configuration for diffing, applying and watching
//!
//! Every recognised option is a named field on an immutable value object.
//! The configuration follows a priority chain:
//! 1. Built-in defaults (`Config::default()`)
//! 2. Config file (`--config path.toml|path.json|path.json5`)
//! 3. CLI flags (highest priority)

use crate::error::FileSyncError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// MAIN CONFIGURATION STRUCT
// ============================================================================

/// Full configuration: sync pairs plus diff, run and watch settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Source/destination pairs to operate on
	pub pairs: Vec<SyncPair>,

	/// Comparison settings
	pub diff: DiffConfig,

	/// Application settings
	pub run: RunConfig,

	/// Polling settings for watch mode
	pub watch: WatchConfig,
}

impl Config {
	/// Load a configuration file, picking the format from its extension
	pub fn load(path: &Path) -> Result<Self, FileSyncError> {
		let contents = std::fs::read_to_string(path)?;
		let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();

		let parsed = match ext.as_str() {
			"toml" => toml::from_str(&contents).map_err(|e| e.to_string()),
			"json5" => json5::from_str(&contents).map_err(|e| e.to_string()),
			"json" => serde_json::from_str(&contents).map_err(|e| e.to_string()),
			_ => {
				return Err(FileSyncError::InvalidConfig {
					message: format!(
						"Unsupported config format '{}' (expected toml, json or json5)",
						path.display()
					),
				})
			}
		};

		parsed.map_err(|message| FileSyncError::InvalidConfig {
			message: format!("{}: {}", path.display(), message),
		})
	}
}

/// One source -> destination relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPair {
	pub source: PathBuf,
	pub destination: PathBuf,
}

impl SyncPair {
	pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
		Self { source: source.into(), destination: destination.into() }
	}
}

// ============================================================================
// DIFF CONFIGURATION
// ============================================================================

/// Options controlling how a source tree is compared against a destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiffConfig {
	/// Inclusion patterns; empty means everything is included
	pub filters: Vec<String>,

	/// Exclusion patterns, always override inclusions
	pub excludes: Vec<String>,

	/// How `filters` and `excludes` are interpreted
	pub pattern_mode: PatternMode,

	/// Record directories themselves as create entries
	pub include_dirs: bool,

	/// Decimal digits of mtime compared (0 = whole seconds)
	pub time_precision: u32,

	/// Descend into subdirectories
	pub recursive: bool,

	/// Only update when the source is strictly newer (otherwise any difference)
	pub newer: bool,

	/// Update every common file regardless of timestamps
	pub force_update: bool,

	/// Restrict the comparison to these paths (relative or root-prefixed)
	pub filelist: Vec<PathBuf>,

	/// Minimum file size in kilobytes (0 = disabled)
	pub size_limit_kb: u64,
}

impl Default for DiffConfig {
	fn default() -> Self {
		DiffConfig {
			filters: vec![],
			excludes: vec![".DS_Store".to_string(), "Thumbs.db".to_string(), ".place-holder".to_string()],
			pattern_mode: PatternMode::Literal,
			include_dirs: true,
			time_precision: 3,
			recursive: true,
			newer: true,
			force_update: false,
			filelist: vec![],
			size_limit_kb: 0,
		}
	}
}

impl DiffConfig {
	pub fn with_filters<S: Into<String>>(mut self, filters: impl IntoIterator<Item = S>) -> Self {
		self.filters = filters.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_excludes<S: Into<String>>(mut self, excludes: impl IntoIterator<Item = S>) -> Self {
		self.excludes = excludes.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_pattern_mode(mut self, mode: PatternMode) -> Self {
		self.pattern_mode = mode;
		self
	}

	pub fn with_include_dirs(mut self, include_dirs: bool) -> Self {
		self.include_dirs = include_dirs;
		self
	}

	pub fn with_time_precision(mut self, digits: u32) -> Self {
		self.time_precision = digits;
		self
	}

	pub fn with_recursive(mut self, recursive: bool) -> Self {
		self.recursive = recursive;
		self
	}

	pub fn with_newer(mut self, newer: bool) -> Self {
		self.newer = newer;
		self
	}

	pub fn with_force_update(mut self, force: bool) -> Self {
		self.force_update = force;
		self
	}

	pub fn with_filelist<P: Into<PathBuf>>(mut self, list: impl IntoIterator<Item = P>) -> Self {
		self.filelist = list.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_size_limit_kb(mut self, kb: u64) -> Self {
		self.size_limit_kb = kb;
		self
	}
}

/// Interpretation of filter/exclude patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PatternMode {
	/// Regular expressions, searched anywhere in the relative path
	Regex,
	/// Plain substrings
	#[default]
	Literal,
	/// Shell globs matched against the whole relative path
	Glob,
}

impl FromStr for PatternMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"regex" | "re" => Ok(Self::Regex),
			"literal" | "plain" => Ok(Self::Literal),
			"glob" => Ok(Self::Glob),
			_ => Err(format!("Unknown pattern mode: {}. Valid options: regex, literal, glob", s)),
		}
	}
}

impl std::fmt::Display for PatternMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Regex => write!(f, "regex"),
			Self::Literal => write!(f, "literal"),
			Self::Glob => write!(f, "glob"),
		}
	}
}

// ============================================================================
// RUN CONFIGURATION
// ============================================================================

/// Options controlling how a change set is applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunConfig {
	/// Create missing destination directories (including the root)
	pub make_target: bool,

	/// Apply the trimmed change set instead of the original one
	pub trimmed: bool,

	/// Run the create phase
	pub create: bool,

	/// Run the update phase
	pub update: bool,

	/// Run the purge phase
	pub purge: bool,

	/// Clear read-only flags on destination files before overwriting
	pub force_ownership: bool,

	/// Log per-item I/O failures at debug instead of error level
	pub errors_to_debug: bool,
}

impl Default for RunConfig {
	fn default() -> Self {
		RunConfig {
			make_target: true,
			trimmed: true,
			create: false,
			update: false,
			purge: false,
			force_ownership: false,
			errors_to_debug: false,
		}
	}
}

impl RunConfig {
	/// Enable create, update and purge
	pub fn mirror() -> Self {
		RunConfig { create: true, update: true, purge: true, ..Default::default() }
	}

	pub fn with_create(mut self, create: bool) -> Self {
		self.create = create;
		self
	}

	pub fn with_update(mut self, update: bool) -> Self {
		self.update = update;
		self
	}

	pub fn with_purge(mut self, purge: bool) -> Self {
		self.purge = purge;
		self
	}

	pub fn with_trimmed(mut self, trimmed: bool) -> Self {
		self.trimmed = trimmed;
		self
	}

	pub fn with_make_target(mut self, make_target: bool) -> Self {
		self.make_target = make_target;
		self
	}

	pub fn with_force_ownership(mut self, force: bool) -> Self {
		self.force_ownership = force;
		self
	}

	pub fn with_errors_to_debug(mut self, to_debug: bool) -> Self {
		self.errors_to_debug = to_debug;
		self
	}
}

// ============================================================================
// WATCH CONFIGURATION
// ============================================================================

/// Polling loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchConfig {
	/// Seconds to sleep between cycles
	pub interval_secs: u64,

	/// Banner title
	pub title: String,

	/// Banner message
	pub message: String,
}

impl Default for WatchConfig {
	fn default() -> Self {
		WatchConfig {
			interval_secs: 5,
			title: "File Sync Watch Folder".to_string(),
			message: "Mirroring changes from source folder to destination folder.".to_string(),
		}
	}
}


// vim: ts=4
