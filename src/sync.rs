//! Sync sessions: diff, trim, apply
//!
//! A [`SyncSession`] binds a source and destination root with a diff and a run
//! configuration. `diff()` produces the original change set and a trimmed copy,
//! `difftrim()` removes entries from the copy only, and `run()` applies the
//! selected one.
//!
//! ```rust,ignore
//! use filesync::sync::SyncBuilder;
//!
//! let mut session = SyncBuilder::new("./src", "./backup")
//!     .excludes(vec!["\\.tmp$"])
//!     .purge(true)
//!     .build();
//! session.diff()?;
//! session.sync(false, false)?;
//! println!("{}", session.run_report());
//! ```

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::callbacks::{CancelCheck, ProgressCallback};
use crate::config::{DiffConfig, PatternMode, RunConfig};
use crate::diff::ChangeSet;
use crate::error::FileSyncError;
use crate::executor::{Executor, RunOutcome, RunStats};
use crate::logging::*;
use crate::path_utils;

/// One source -> destination relationship with its last diff and run results
pub struct SyncSession {
	source: PathBuf,
	destination: PathBuf,
	diff_config: DiffConfig,
	run_config: RunConfig,
	original: Option<ChangeSet>,
	trimmed: Option<ChangeSet>,
	stats: RunStats,
	progress: Option<Box<dyn ProgressCallback>>,
	cancel: Option<Box<dyn CancelCheck>>,
	has_run: bool,
	diff_current: bool,
}

impl SyncSession {
	pub fn new(
		source: impl AsRef<Path>,
		destination: impl AsRef<Path>,
		diff_config: DiffConfig,
		run_config: RunConfig,
	) -> Self {
		SyncSession {
			source: path_utils::normalize(source.as_ref()),
			destination: path_utils::normalize(destination.as_ref()),
			diff_config,
			run_config,
			original: None,
			trimmed: None,
			stats: RunStats::default(),
			progress: None,
			cancel: None,
			has_run: false,
			diff_current: false,
		}
	}

	pub fn source(&self) -> &Path {
		&self.source
	}

	pub fn destination(&self) -> &Path {
		&self.destination
	}

	pub fn diff_config(&self) -> &DiffConfig {
		&self.diff_config
	}

	pub fn run_config(&self) -> &RunConfig {
		&self.run_config
	}

	/// Replace the run configuration for subsequent runs
	pub fn set_run_config(&mut self, config: RunConfig) {
		self.run_config = config;
	}

	pub fn set_progress(&mut self, callback: Option<Box<dyn ProgressCallback>>) {
		self.progress = callback;
	}

	pub fn set_cancel(&mut self, check: Option<Box<dyn CancelCheck>>) {
		self.cancel = check;
	}

	/// The last untrimmed diff
	pub fn original(&self) -> Option<&ChangeSet> {
		self.original.as_ref()
	}

	/// The trimmed copy of the last diff
	pub fn trimmed(&self) -> Option<&ChangeSet> {
		self.trimmed.as_ref()
	}

	/// Results of the last run
	pub fn stats(&self) -> &RunStats {
		&self.stats
	}

	pub fn has_run(&self) -> bool {
		self.has_run
	}

	/// False once a run has happened since the last diff
	pub fn is_diff_current(&self) -> bool {
		self.diff_current
	}

	/// All diff and run options as name/value pairs
	pub fn options(&self) -> Vec<(&'static str, String)> {
		let d = &self.diff_config;
		let r = &self.run_config;
		let list = |v: &[String]| v.join(",");
		vec![
			("filters", list(&d.filters)),
			("excludes", list(&d.excludes)),
			(
				"filelist",
				d.filelist.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(","),
			),
			("regexfilters", (d.pattern_mode == PatternMode::Regex).to_string()),
			("patternMode", d.pattern_mode.to_string()),
			("includedirs", d.include_dirs.to_string()),
			("timeprecision", d.time_precision.to_string()),
			("recursive", d.recursive.to_string()),
			("newer", d.newer.to_string()),
			("forceUpdate", d.force_update.to_string()),
			("sizeLimit", d.size_limit_kb.to_string()),
			("maketarget", r.make_target.to_string()),
			("trimmed", r.trimmed.to_string()),
			("create", r.create.to_string()),
			("update", r.update.to_string()),
			("purge", r.purge.to_string()),
			("forceOwnership", r.force_ownership.to_string()),
			("errorsToDebug", r.errors_to_debug.to_string()),
		]
	}

	/// Compile a fresh diff; the trimmed copy starts out identical
	pub fn diff(&mut self) -> Result<(), FileSyncError> {
		if !self.source.is_dir() {
			warn!("Source directory does not exist: {}", self.source.display());
			return Ok(());
		}

		let diff = ChangeSet::compute(&self.source, &self.destination, self.diff_config.clone())?;
		self.trimmed = Some(diff.clone());
		self.original = Some(diff);
		self.diff_current = true;
		Ok(())
	}

	/// Replace the diff configuration, then diff
	pub fn diff_with(&mut self, config: DiffConfig) -> Result<(), FileSyncError> {
		self.diff_config = config;
		self.diff()
	}

	/// Remove entries from the trimmed change set; the original is untouched
	///
	/// Paths may be absolute (under the source root for create/update, the
	/// destination root for purge) or root-relative.
	pub fn difftrim(&mut self, create: &[PathBuf], update: &[PathBuf], purge: &[PathBuf]) {
		let trimmed = match self.trimmed.as_mut() {
			Some(t) => t,
			None => {
				debug!("difftrim without a diff");
				return;
			}
		};
		for path in create {
			trimmed.remove_create(path);
		}
		for path in update {
			trimmed.remove_update(path);
		}
		for path in purge {
			trimmed.remove_purge(path);
		}
	}

	/// Create new files and update existing ones
	pub fn sync(&mut self, refresh_diff: bool, dry_run: bool) -> Result<RunOutcome, FileSyncError> {
		self.run_config.create = true;
		self.run_config.update = true;
		self.run(refresh_diff, dry_run)
	}

	/// Only update files that exist on both sides
	pub fn update(&mut self, refresh_diff: bool, dry_run: bool) -> Result<RunOutcome, FileSyncError> {
		self.run_config.create = false;
		self.run_config.update = true;
		self.run(refresh_diff, dry_run)
	}

	/// Apply the selected change set with the current run configuration
	///
	/// `refresh_diff` re-runs `diff()` afterwards.
	pub fn run(&mut self, refresh_diff: bool, dry_run: bool) -> Result<RunOutcome, FileSyncError> {
		if !self.diff_current {
			warn!("diff is not current; it's recommended to run diff again before updating/synching");
		}

		self.stats.reset();
		self.stats.started = Some(SystemTime::now());
		let outcome = self.apply_selected(dry_run);
		self.stats.finished = Some(SystemTime::now());

		self.has_run = true;
		self.diff_current = false;
		if refresh_diff {
			self.diff()?;
		}
		Ok(outcome)
	}

	fn apply_selected(&mut self, dry_run: bool) -> RunOutcome {
		let diff = if self.run_config.trimmed { self.trimmed.as_ref() } else { self.original.as_ref() };
		let diff = match diff {
			Some(d) => d,
			None => return RunOutcome::NothingToRun,
		};
		let total = self.original.as_ref().map(ChangeSet::total).unwrap_or_else(|| diff.total());

		Executor::new(&self.run_config)
			.dry_run(dry_run)
			.progress(self.progress.as_deref())
			.cancel(self.cancel.as_deref())
			.progress_total(total)
			.apply(diff, &mut self.stats)
	}

	/// Apply an arbitrary change set with this session's run configuration
	pub fn run_with_diff(&mut self, diff: &ChangeSet, dry_run: bool) -> RunOutcome {
		self.stats.reset();
		self.stats.started = Some(SystemTime::now());
		let outcome = Executor::new(&self.run_config)
			.dry_run(dry_run)
			.progress(self.progress.as_deref())
			.cancel(self.cancel.as_deref())
			.apply(diff, &mut self.stats);
		self.stats.finished = Some(SystemTime::now());
		self.has_run = true;
		outcome
	}

	/// The diff report before the first run (or when forced), else the run report
	pub fn report(&self, force_diff: bool) -> Option<String> {
		if !self.has_run || force_diff {
			if !self.diff_current {
				warn!("diff is not current");
			}
			self.diff_report()
		} else {
			Some(self.run_report())
		}
	}

	/// Report of the trimmed or original diff, following `RunConfig::trimmed`
	pub fn diff_report(&self) -> Option<String> {
		let diff = if self.run_config.trimmed { self.trimmed.as_ref() } else { self.original.as_ref() };
		diff.map(|d| d.report(true, true, true))
	}

	/// Pass/fail counts of the last run and the failed paths
	pub fn run_report(&self) -> String {
		self.stats.report(&self.source, &self.destination)
	}
}

/// Fluent construction of a [`SyncSession`]
pub struct SyncBuilder {
	source: PathBuf,
	destination: PathBuf,
	diff: DiffConfig,
	run: RunConfig,
	progress: Option<Box<dyn ProgressCallback>>,
	cancel: Option<Box<dyn CancelCheck>>,
}

impl SyncBuilder {
	pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
		SyncBuilder {
			source: source.into(),
			destination: destination.into(),
			diff: DiffConfig::default(),
			run: RunConfig::default(),
			progress: None,
			cancel: None,
		}
	}

	pub fn diff_config(mut self, config: DiffConfig) -> Self {
		self.diff = config;
		self
	}

	pub fn run_config(mut self, config: RunConfig) -> Self {
		self.run = config;
		self
	}

	pub fn filters<S: Into<String>>(mut self, filters: impl IntoIterator<Item = S>) -> Self {
		self.diff = self.diff.with_filters(filters);
		self
	}

	pub fn excludes<S: Into<String>>(mut self, excludes: impl IntoIterator<Item = S>) -> Self {
		self.diff = self.diff.with_excludes(excludes);
		self
	}

	pub fn pattern_mode(mut self, mode: PatternMode) -> Self {
		self.diff = self.diff.with_pattern_mode(mode);
		self
	}

	pub fn create(mut self, on: bool) -> Self {
		self.run.create = on;
		self
	}

	pub fn update(mut self, on: bool) -> Self {
		self.run.update = on;
		self
	}

	pub fn purge(mut self, on: bool) -> Self {
		self.run.purge = on;
		self
	}

	pub fn on_progress<F>(mut self, callback: F) -> Self
	where
		F: Fn(&str, f64) + Send + Sync + 'static,
	{
		self.progress = Some(Box::new(callback));
		self
	}

	pub fn cancel_when<F>(mut self, check: F) -> Self
	where
		F: Fn() -> bool + Send + Sync + 'static,
	{
		self.cancel = Some(Box::new(check));
		self
	}

	pub fn build(self) -> SyncSession {
		let mut session = SyncSession::new(self.source, self.destination, self.diff, self.run);
		session.progress = self.progress;
		session.cancel = self.cancel;
		session
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[test]
	fn test_run_without_diff_does_nothing() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		fs::write(src.path().join("a"), b"a").unwrap();

		let mut session = SyncBuilder::new(src.path(), dst.path()).build();
		let outcome = session.sync(false, false).unwrap();

		assert_eq!(outcome, RunOutcome::NothingToRun);
		assert!(!dst.path().join("a").exists());
		assert!(session.stats().started.is_some());
	}

	#[test]
	fn test_diff_current_flag() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		fs::write(src.path().join("a"), b"a").unwrap();

		let mut session = SyncBuilder::new(src.path(), dst.path()).build();
		assert!(!session.is_diff_current());
		session.diff().unwrap();
		assert!(session.is_diff_current());
		session.sync(false, false).unwrap();
		assert!(!session.is_diff_current());
		session.sync(true, false).unwrap();
		assert!(session.is_diff_current());
	}

	#[test]
	fn test_update_disables_create() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		fs::write(src.path().join("a"), b"a").unwrap();

		let mut session = SyncBuilder::new(src.path(), dst.path()).create(true).build();
		session.diff().unwrap();
		session.update(false, false).unwrap();

		assert!(!session.run_config().create);
		assert!(!dst.path().join("a").exists());
	}

	#[test]
	fn test_missing_source_keeps_no_diff() {
		let dst = TempDir::new().unwrap();
		let mut session = SyncBuilder::new("/no/such/source", dst.path()).build();
		session.diff().unwrap();
		assert!(session.original().is_none());
		assert!(session.report(false).is_none());
	}

	#[test]
	fn test_options_listing() {
		let session = SyncBuilder::new("/a", "/b").purge(true).build();
		let opts = session.options();
		let get = |k: &str| opts.iter().find(|(name, _)| *name == k).map(|(_, v)| v.clone());
		assert_eq!(get("purge"), Some("true".to_string()));
		assert_eq!(get("excludes"), Some(".DS_Store,Thumbs.db,.place-holder".to_string()));
		assert_eq!(get("regexfilters"), Some("false".to_string()));
	}
}

// vim: ts=4
