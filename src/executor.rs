//! Applying a change set to the filesystem
//!
//! Every item is applied independently: a failure is logged, recorded in
//! [`RunStats`] and the run moves on. The only early exit is cancellation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::callbacks::{CancelCheck, ProgressCallback};
use crate::config::RunConfig;
use crate::diff::ChangeSet;
use crate::logging::*;
use crate::metadata_utils;
use crate::path_utils;
use crate::types::Operation;

/// Succeeded and failed paths of the last run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
	pub started: Option<SystemTime>,
	pub finished: Option<SystemTime>,
	pub creates: Vec<PathBuf>,
	pub create_fails: Vec<PathBuf>,
	pub updates: Vec<PathBuf>,
	pub update_fails: Vec<PathBuf>,
	pub purges: Vec<PathBuf>,
	pub purge_fails: Vec<PathBuf>,
}

impl RunStats {
	/// Clear all lists and timestamps
	pub fn reset(&mut self) {
		*self = RunStats::default();
	}

	pub fn passes(&self, op: Operation) -> &[PathBuf] {
		match op {
			Operation::Create => &self.creates,
			Operation::Update => &self.updates,
			Operation::Purge => &self.purges,
		}
	}

	pub fn fails(&self, op: Operation) -> &[PathBuf] {
		match op {
			Operation::Create => &self.create_fails,
			Operation::Update => &self.update_fails,
			Operation::Purge => &self.purge_fails,
		}
	}

	fn record(&mut self, op: Operation, path: PathBuf, ok: bool) {
		let list = match (op, ok) {
			(Operation::Create, true) => &mut self.creates,
			(Operation::Create, false) => &mut self.create_fails,
			(Operation::Update, true) => &mut self.updates,
			(Operation::Update, false) => &mut self.update_fails,
			(Operation::Purge, true) => &mut self.purges,
			(Operation::Purge, false) => &mut self.purge_fails,
		};
		list.push(path);
	}

	pub fn failure_count(&self) -> usize {
		self.create_fails.len() + self.update_fails.len() + self.purge_fails.len()
	}

	/// Wall time of the run, if it has finished
	pub fn elapsed(&self) -> Option<std::time::Duration> {
		match (self.started, self.finished) {
			(Some(start), Some(end)) => end.duration_since(start).ok(),
			_ => None,
		}
	}

	/// Per-category pass/fail counts followed by the failed paths
	pub fn report(&self, source: &Path, destination: &Path) -> String {
		let title = format!("Sync report ({} -> {}):", source.display(), destination.display());
		let mut result = format!("\n{}\n{}\n", title, "-".repeat(title.chars().count()));

		for op in Operation::ALL.iter() {
			let fails = self.fails(*op);
			result.push_str(&format!("\n{} Passes: ({})\n", op.title(), self.passes(*op).len()));
			result.push_str(&format!("{} Fails: ({})\n", op.title(), fails.len()));
			for item in fails {
				result.push_str(&format!("  {}\n", item.display()));
			}
		}

		info!("{}", result);
		result
	}
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
	/// Every selected phase went through all of its groups
	Completed,
	/// The cancel check returned false
	Cancelled,
	/// There was no change set to apply
	NothingToRun,
}

/// Applies change sets according to a [`RunConfig`]
pub struct Executor<'a> {
	config: &'a RunConfig,
	dry_run: bool,
	progress: Option<&'a dyn ProgressCallback>,
	cancel: Option<&'a dyn CancelCheck>,
	progress_total: Option<usize>,
	processed: usize,
	/// Directories a dry run pretended to create
	planned_dirs: HashSet<PathBuf>,
}

impl<'a> Executor<'a> {
	pub fn new(config: &'a RunConfig) -> Self {
		Executor {
			config,
			dry_run: false,
			progress: None,
			cancel: None,
			progress_total: None,
			processed: 0,
			planned_dirs: HashSet::new(),
		}
	}

	/// Skip the filesystem mutations, keep all bookkeeping
	pub fn dry_run(mut self, dry_run: bool) -> Self {
		self.dry_run = dry_run;
		self
	}

	pub fn progress(mut self, callback: Option<&'a dyn ProgressCallback>) -> Self {
		self.progress = callback;
		self
	}

	pub fn cancel(mut self, check: Option<&'a dyn CancelCheck>) -> Self {
		self.cancel = check;
		self
	}

	/// Item count progress percentages are computed against
	///
	/// Defaults to the total of the applied change set. Sessions pass the total
	/// of the untrimmed diff so progress reflects the full scope.
	pub fn progress_total(mut self, total: usize) -> Self {
		self.progress_total = Some(total);
		self
	}

	/// Apply the enabled phases of `diff`, recording results in `stats`
	pub fn apply(&mut self, diff: &ChangeSet, stats: &mut RunStats) -> RunOutcome {
		self.processed = 0;
		self.planned_dirs.clear();
		if self.progress_total.is_none() {
			self.progress_total = Some(diff.total());
		}

		if self.config.create {
			debug!("creating...");
			if !self.apply_create(diff, stats) {
				return RunOutcome::Cancelled;
			}
		}
		if self.config.update {
			debug!("updating...");
			if !self.apply_update(diff, stats) {
				return RunOutcome::Cancelled;
			}
		}
		if self.config.purge {
			debug!("purging...");
			if !self.apply_purge(diff, stats) {
				return RunOutcome::Cancelled;
			}
		}
		RunOutcome::Completed
	}

	fn keep_going(&self) -> bool {
		match self.cancel {
			Some(check) => {
				let go = check.should_continue();
				if !go {
					info!("run cancelled");
				}
				go
			}
			None => true,
		}
	}

	fn report_progress(&mut self, verb: &str, path: &Path) {
		self.processed += 1;
		if let Some(cb) = self.progress {
			let total = self.progress_total.unwrap_or(0);
			let percent =
				if total == 0 { 100.0 } else { self.processed as f64 / total as f64 * 100.0 };
			cb.on_progress(&format!("{} {}", verb, path.display()), percent);
		}
	}

	fn fail(&self, stats: &mut RunStats, op: Operation, path: &Path, what: &str, e: &io::Error) {
		log_failure(self.config.errors_to_debug, &format!("{} {}: {}", what, path.display(), e));
		stats.record(op, path.to_path_buf(), false);
	}

	/// Returns false when cancelled
	pub fn apply_create(&mut self, diff: &ChangeSet, stats: &mut RunStats) -> bool {
		for (parent, children) in diff.create() {
			if !self.keep_going() {
				return false;
			}
			let srcdir = path_utils::resolve(diff.source(), parent);
			let dstdir = path_utils::resolve(diff.destination(), parent);

			if !dstdir.is_dir() && !self.planned_dirs.contains(&dstdir) {
				if self.config.make_target {
					self.make_dirs(&dstdir, stats);
				} else {
					debug!("destination directory missing, not creating it: {}", dstdir.display());
				}
			}

			for child in children {
				let name = path_utils::strip_dir_marker(child);
				let srcp = srcdir.join(name);
				let dstp = dstdir.join(name);
				if metadata_utils::is_dir(&srcp) {
					self.copy_dir(&srcp, &dstp, stats);
				} else if srcp.is_file() {
					self.copy_file(Operation::Create, &srcp, &dstp, stats);
				} else {
					self.report_progress("Copying", &dstp);
					let e = io::Error::new(io::ErrorKind::NotFound, "source vanished");
					self.fail(stats, Operation::Create, &dstp, "cannot copy", &e);
				}
			}
		}
		true
	}

	/// Returns false when cancelled
	pub fn apply_update(&mut self, diff: &ChangeSet, stats: &mut RunStats) -> bool {
		for (parent, children) in diff.update() {
			if !self.keep_going() {
				return false;
			}
			let srcdir = path_utils::resolve(diff.source(), parent);
			let dstdir = path_utils::resolve(diff.destination(), parent);

			// Updates never include directories
			for child in children {
				let name = path_utils::strip_dir_marker(child);
				self.copy_file(Operation::Update, &srcdir.join(name), &dstdir.join(name), stats);
			}
		}
		true
	}

	/// Returns false when cancelled
	pub fn apply_purge(&mut self, diff: &ChangeSet, stats: &mut RunStats) -> bool {
		for (parent, children) in diff.purge() {
			if !self.keep_going() {
				return false;
			}
			let dstdir = path_utils::resolve(diff.destination(), parent);

			for child in children {
				let dstp = dstdir.join(path_utils::strip_dir_marker(child));
				if path_utils::is_dir_name(child) || metadata_utils::is_dir(&dstp) {
					self.remove_dir(&dstp, stats);
				} else {
					self.remove_file(&dstp, stats);
				}
			}
		}
		true
	}

	fn make_dirs(&mut self, dir: &Path, stats: &mut RunStats) {
		let result = if self.dry_run {
			self.planned_dirs.insert(dir.to_path_buf());
			Ok(())
		} else {
			fs::create_dir_all(dir)
		};
		match result {
			Ok(()) => {
				debug!("made dirs: {}", dir.display());
				stats.record(Operation::Create, dir.to_path_buf(), true);
			}
			Err(e) => self.fail(stats, Operation::Create, dir, "cannot make dirs", &e),
		}
	}

	fn copy_dir(&mut self, src: &Path, dst: &Path, stats: &mut RunStats) {
		self.report_progress("Copying", dst);
		if self.dry_run {
			self.planned_dirs.insert(dst.to_path_buf());
			stats.record(Operation::Create, dst.to_path_buf(), true);
			return;
		}

		let result = match fs::create_dir(dst) {
			Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dst.is_dir() => Ok(()),
			other => other,
		}
		.and_then(|()| self.take_ownership(dst))
		.and_then(|()| metadata_utils::copy_stat(src, dst));

		match result {
			Ok(()) => {
				debug!("made dir: {}", dst.display());
				stats.record(Operation::Create, dst.to_path_buf(), true);
			}
			Err(e) => self.fail(stats, Operation::Create, dst, "cannot make dir", &e),
		}
	}

	fn copy_file(&mut self, op: Operation, src: &Path, dst: &Path, stats: &mut RunStats) {
		self.report_progress("Copying", dst);

		let result = if self.dry_run {
			// Reachability probe only
			fs::File::open(src).map(|_| ())
		} else {
			self.take_ownership(dst).and_then(|()| metadata_utils::copy_file(src, dst))
		};

		match result {
			Ok(()) => {
				debug!("copied: {}", dst.display());
				stats.record(op, dst.to_path_buf(), true);
			}
			Err(e) => self.fail(stats, op, dst, "cannot copy to", &e),
		}
	}

	/// Clear a read-only destination when force ownership is on
	fn take_ownership(&self, dst: &Path) -> io::Result<()> {
		if !self.config.force_ownership || !dst.exists() {
			return Ok(());
		}
		if metadata_utils::is_readonly(dst)? {
			debug!("making writable: {}", dst.display());
			metadata_utils::make_writable(dst)?;
		}
		Ok(())
	}

	fn remove_dir(&mut self, dir: &Path, stats: &mut RunStats) {
		self.report_progress("Deleting", dir);
		if !metadata_utils::is_dir(dir) {
			warn!("dir does not exist: {}", dir.display());
			return;
		}

		let result = if self.dry_run { Ok(()) } else { fs::remove_dir_all(dir) };
		match result {
			Ok(()) => {
				debug!("removed dir: {}", dir.display());
				stats.record(Operation::Purge, dir.to_path_buf(), true);
			}
			Err(e) => self.fail(stats, Operation::Purge, dir, "cannot remove dir", &e),
		}
	}

	fn remove_file(&mut self, file: &Path, stats: &mut RunStats) {
		self.report_progress("Deleting", file);
		if !metadata_utils::is_file(file) {
			warn!("file does not exist: {}", file.display());
			return;
		}

		let result = if self.dry_run { Ok(()) } else { fs::remove_file(file) };
		match result {
			Ok(()) => {
				debug!("deleted: {}", file.display());
				stats.record(Operation::Purge, file.to_path_buf(), true);
			}
			Err(e) => self.fail(stats, Operation::Purge, file, "cannot delete", &e),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::DiffConfig;
	use std::sync::Mutex;
	use tempfile::TempDir;

	#[test]
	fn test_report_lists_failures() {
		let mut stats = RunStats::default();
		stats.record(Operation::Create, PathBuf::from("/d/ok.txt"), true);
		stats.record(Operation::Update, PathBuf::from("/d/bad.txt"), false);

		let report = stats.report(Path::new("/s"), Path::new("/d"));
		assert!(report.contains("Sync report (/s -> /d):"));
		assert!(report.contains("Create Passes: (1)\nCreate Fails: (0)\n"));
		assert!(report.contains("Update Passes: (0)\nUpdate Fails: (1)\n  /d/bad.txt\n"));
		assert_eq!(stats.failure_count(), 1);

		stats.reset();
		assert_eq!(stats, RunStats::default());
	}

	#[test]
	fn test_disabled_phases_do_nothing() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		fs::write(src.path().join("a.txt"), b"a").unwrap();
		let diff = ChangeSet::compute(src.path(), dst.path(), DiffConfig::default()).unwrap();

		let config = RunConfig::default();
		let mut stats = RunStats::default();
		let outcome = Executor::new(&config).apply(&diff, &mut stats);

		assert_eq!(outcome, RunOutcome::Completed);
		assert!(!dst.path().join("a.txt").exists());
		assert_eq!(stats, RunStats::default());
	}

	#[test]
	fn test_progress_percentages() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		for name in &["a", "b", "c", "d"] {
			fs::write(src.path().join(name), name.as_bytes()).unwrap();
		}
		let diff = ChangeSet::compute(src.path(), dst.path(), DiffConfig::default()).unwrap();

		let seen = Mutex::new(Vec::new());
		let cb = |msg: &str, pct: f64| seen.lock().unwrap().push((msg.to_string(), pct));
		let config = RunConfig::default().with_create(true);
		let mut stats = RunStats::default();
		Executor::new(&config).progress(Some(&cb)).apply(&diff, &mut stats);

		let seen = seen.into_inner().unwrap();
		let pcts: Vec<f64> = seen.iter().map(|(_, p)| *p).collect();
		assert_eq!(pcts, vec![25.0, 50.0, 75.0, 100.0]);
		assert!(seen[0].0.starts_with("Copying "));
		assert_eq!(stats.creates.len(), 4);
	}

	#[test]
	fn test_cancel_before_first_group() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		fs::write(src.path().join("a"), b"a").unwrap();
		let diff = ChangeSet::compute(src.path(), dst.path(), DiffConfig::default()).unwrap();

		let stop = || false;
		let config = RunConfig::default().with_create(true);
		let mut stats = RunStats::default();
		let outcome = Executor::new(&config).cancel(Some(&stop)).apply(&diff, &mut stats);

		assert_eq!(outcome, RunOutcome::Cancelled);
		assert!(!dst.path().join("a").exists());
	}

	#[test]
	fn test_dry_run_leaves_disk_alone() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		fs::create_dir(src.path().join("sub")).unwrap();
		fs::write(src.path().join("sub/x"), b"x").unwrap();
		fs::write(dst.path().join("old"), b"o").unwrap();
		let diff = ChangeSet::compute(src.path(), dst.path(), DiffConfig::default()).unwrap();

		let config = RunConfig::mirror();
		let mut stats = RunStats::default();
		Executor::new(&config).dry_run(true).apply(&diff, &mut stats);

		assert!(!dst.path().join("sub").exists());
		assert!(dst.path().join("old").exists());
		assert_eq!(stats.creates.len(), 2);
		assert_eq!(stats.purges, vec![dst.path().join("old")]);
		assert_eq!(stats.failure_count(), 0);
	}
}

// vim: ts=4
