//! Change sets and the recursive diff engine
//!
//! A [`ChangeSet`] compares a source tree against a destination tree in one
//! direction and records what would have to be created, updated or purged in
//! the destination to mirror the source.
//!
//! Entries are keyed by parent directory (relative to the root, `.` for the
//! root itself) and hold the child names found there. Directory children carry
//! a trailing path separator.
//!
//! ```rust,ignore
//! use filesync::config::DiffConfig;
//! use filesync::diff::ChangeSet;
//!
//! let diff = ChangeSet::compute("./src", "./backup", DiffConfig::default())?;
//! println!("{}", diff.report(true, true, true));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::compare::{self, Comparison};
use crate::config::DiffConfig;
use crate::error::FileSyncError;
use crate::exclusion::PathFilter;
use crate::logging::*;
use crate::metadata_utils;
use crate::path_utils;
use crate::types::{EntryKind, Operation};

/// Parent directory -> child names, sorted by parent, children in insertion order
pub type ChangeMap = BTreeMap<PathBuf, Vec<String>>;

/// Insert `name` under `parent` unless it is already there
fn insert_child(map: &mut ChangeMap, parent: PathBuf, name: String) {
	let children = map.entry(parent).or_default();
	if !children.contains(&name) {
		children.push(name);
	}
}

fn count(map: &ChangeMap) -> usize {
	map.values().map(Vec::len).sum()
}

/// Three-way result of a directory comparison
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
	source: PathBuf,
	destination: PathBuf,
	options: DiffConfig,
	create: ChangeMap,
	update: ChangeMap,
	purge: ChangeMap,
}

impl ChangeSet {
	/// Create an empty change set; call [`ChangeSet::run`] to fill it
	pub fn new(source: impl AsRef<Path>, destination: impl AsRef<Path>, options: DiffConfig) -> Self {
		ChangeSet {
			source: path_utils::normalize(source.as_ref()),
			destination: path_utils::normalize(destination.as_ref()),
			options,
			create: ChangeMap::new(),
			update: ChangeMap::new(),
			purge: ChangeMap::new(),
		}
	}

	/// Create a change set and run the comparison immediately
	pub fn compute(
		source: impl AsRef<Path>,
		destination: impl AsRef<Path>,
		options: DiffConfig,
	) -> Result<Self, FileSyncError> {
		let mut diff = Self::new(source, destination, options);
		diff.run()?;
		Ok(diff)
	}

	pub fn source(&self) -> &Path {
		&self.source
	}

	pub fn destination(&self) -> &Path {
		&self.destination
	}

	/// The options this change set was produced with
	pub fn options(&self) -> &DiffConfig {
		&self.options
	}

	pub fn entries(&self, op: Operation) -> &ChangeMap {
		match op {
			Operation::Create => &self.create,
			Operation::Update => &self.update,
			Operation::Purge => &self.purge,
		}
	}

	fn entries_mut(&mut self, op: Operation) -> &mut ChangeMap {
		match op {
			Operation::Create => &mut self.create,
			Operation::Update => &mut self.update,
			Operation::Purge => &mut self.purge,
		}
	}

	pub fn create(&self) -> &ChangeMap {
		&self.create
	}

	pub fn update(&self) -> &ChangeMap {
		&self.update
	}

	pub fn purge(&self) -> &ChangeMap {
		&self.purge
	}

	pub fn count(&self, op: Operation) -> usize {
		count(self.entries(op))
	}

	pub fn create_count(&self) -> usize {
		count(&self.create)
	}

	pub fn update_count(&self) -> usize {
		count(&self.update)
	}

	pub fn purge_count(&self) -> usize {
		count(&self.purge)
	}

	pub fn total(&self) -> usize {
		self.create_count() + self.update_count() + self.purge_count()
	}

	pub fn is_empty(&self) -> bool {
		self.total() == 0
	}

	/// Drop every entry, keeping roots and options
	pub fn clear(&mut self) {
		self.create.clear();
		self.update.clear();
		self.purge.clear();
	}

	/// Root that paths of `op` live under
	fn root_for(&self, op: Operation) -> &Path {
		match op {
			Operation::Create | Operation::Update => &self.source,
			Operation::Purge => &self.destination,
		}
	}

	/// Full source path for a relative path
	pub fn source_path(&self, rel: impl AsRef<Path>) -> PathBuf {
		path_utils::resolve(&self.source, &path_utils::normalize(rel.as_ref()))
	}

	/// Full destination path for a relative path
	pub fn destination_path(&self, rel: impl AsRef<Path>) -> PathBuf {
		path_utils::resolve(&self.destination, &path_utils::normalize(rel.as_ref()))
	}

	/// Parent key and child name for `path` (absolute under the root of `op`, or relative)
	fn locate(&self, op: Operation, path: &Path) -> Option<(PathBuf, String, PathBuf)> {
		let root = self.root_for(op);
		let rel = match path_utils::relative_to(path, root) {
			Some(rel) => rel,
			None => {
				warn!("{} is outside of {}", path.display(), root.display());
				return None;
			}
		};
		let (parent, name) = path_utils::split_parent(&rel)?;
		let full = path_utils::resolve(root, &rel);
		Some((parent, name, full))
	}

	fn add(&mut self, op: Operation, path: &Path) {
		if let Some((parent, name, full)) = self.locate(op, path) {
			let name = if metadata_utils::is_dir(&full) { path_utils::as_dir_name(&name) } else { name };
			insert_child(self.entries_mut(op), parent, name);
		}
	}

	fn remove(&mut self, op: Operation, path: &Path) -> bool {
		let (parent, name, full) = match self.locate(op, path) {
			Some(found) => found,
			None => return false,
		};
		if !full.exists() {
			return false;
		}
		let name = if metadata_utils::is_dir(&full) { path_utils::as_dir_name(&name) } else { name };

		let map = self.entries_mut(op);
		let removed = match map.get_mut(&parent) {
			Some(children) => match children.iter().position(|c| *c == name) {
				Some(idx) => {
					children.remove(idx);
					true
				}
				None => false,
			},
			None => false,
		};
		if map.get(&parent).map(Vec::is_empty).unwrap_or(false) {
			map.remove(&parent);
		}
		removed
	}

	pub fn add_create(&mut self, path: impl AsRef<Path>) {
		self.add(Operation::Create, path.as_ref())
	}

	pub fn add_update(&mut self, path: impl AsRef<Path>) {
		self.add(Operation::Update, path.as_ref())
	}

	pub fn add_purge(&mut self, path: impl AsRef<Path>) {
		self.add(Operation::Purge, path.as_ref())
	}

	/// Remove `path` from the create entries; only paths that exist on disk can be removed
	pub fn remove_create(&mut self, path: impl AsRef<Path>) -> bool {
		self.remove(Operation::Create, path.as_ref())
	}

	pub fn remove_update(&mut self, path: impl AsRef<Path>) -> bool {
		self.remove(Operation::Update, path.as_ref())
	}

	pub fn remove_purge(&mut self, path: impl AsRef<Path>) -> bool {
		self.remove(Operation::Purge, path.as_ref())
	}

	/// Compare source against destination and replace the current entries
	///
	/// A missing source root is a configuration problem: it is logged and the
	/// change set is left empty. A missing destination behaves like an empty one.
	pub fn run(&mut self) -> Result<(), FileSyncError> {
		let filter = PathFilter::new(&self.options)?;
		self.clear();

		if !metadata_utils::is_dir(&self.source) {
			warn!("Source directory does not exist: {}", self.source.display());
			return Ok(());
		}
		let destination =
			if metadata_utils::is_dir(&self.destination) { Some(self.destination.as_path()) } else { None };

		let engine = DiffEngine { options: &self.options, filter: &filter };

		let changes = if self.options.filelist.is_empty() {
			engine.diff_dirs(Path::new(""), Some(&self.source), destination)
		} else {
			let list =
				path_utils::relativize_list(&self.options.filelist, &self.source, &self.destination);
			let cmp = compare::compare_list(&list, Some(&self.source), destination);
			for rel in &cmp.missing {
				debug!("not found on either side: {}", rel.display());
			}
			engine.process(&cmp, Path::new(""), Some(&self.source), destination)
		};

		self.create = changes.create;
		self.update = changes.update;
		self.purge = changes.purge;
		debug!(
			"diff {} -> {}: {} create, {} update, {} purge",
			self.source.display(),
			self.destination.display(),
			self.create_count(),
			self.update_count(),
			self.purge_count()
		);
		Ok(())
	}

	/// Render a deterministic, human-readable summary
	pub fn report(&self, create: bool, update: bool, purge: bool) -> String {
		if self.options.filelist.is_empty() {
			debug!("No relative file list is defined");
		}

		let title = format!(
			"Diff report ({} -> {}):",
			self.source.display(),
			self.destination.display()
		);
		let mut result = format!("\n{}\n{}\n", title, "-".repeat(title.chars().count()));

		let selected = [(Operation::Create, create), (Operation::Update, update), (Operation::Purge, purge)];
		for (op, _) in selected.iter().filter(|(_, on)| *on) {
			result.push_str(&format!("\n{}: ({})\n", op.title(), self.count(*op)));
			for (parent, children) in self.entries(*op) {
				result.push_str(&format!("  {}{}\n", parent.display(), std::path::MAIN_SEPARATOR));
				for child in children {
					result.push_str(&format!("    {}\n", child));
				}
			}
		}

		info!("{}", result);
		result
	}

	pub fn to_json(&self) -> Result<String, FileSyncError> {
		serde_json::to_string_pretty(self).map_err(|e| FileSyncError::Other { message: e.to_string() })
	}

	/// Load a change set saved with [`ChangeSet::to_json`]
	pub fn from_json(json: &str) -> Result<Self, FileSyncError> {
		let value: serde_json::Value = serde_json::from_str(json)
			.map_err(|e| FileSyncError::InvalidConfig { message: e.to_string() })?;

		let looks_right = value
			.as_object()
			.map(|o| ["create", "update", "purge"].iter().all(|k| o.get(*k).map_or(false, |v| v.is_object())))
			.unwrap_or(false);
		if !looks_right {
			return Err(FileSyncError::WrongKind { expected: "ChangeSet", found: json_kind(&value) });
		}

		serde_json::from_value(value).map_err(|e| FileSyncError::InvalidConfig { message: e.to_string() })
	}
}

fn json_kind(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::Null => "null",
		serde_json::Value::Bool(_) => "bool",
		serde_json::Value::Number(_) => "number",
		serde_json::Value::String(_) => "string",
		serde_json::Value::Array(_) => "array",
		serde_json::Value::Object(_) => "object",
	}
	.to_string()
}

//////////
// Engine //
//////////

/// Accumulated entries of one comparison level and everything below it
#[derive(Debug, Default)]
struct Changes {
	create: ChangeMap,
	update: ChangeMap,
	purge: ChangeMap,
}

impl Changes {
	fn record(&mut self, op: Operation, rel: &Path, is_dir: bool) {
		let (parent, name) = match path_utils::split_parent(rel) {
			Some(split) => split,
			None => {
				warn!("Skipping path without a UTF-8 name: {}", rel.display());
				return;
			}
		};
		let name = if is_dir { path_utils::as_dir_name(&name) } else { name };
		let map = match op {
			Operation::Create => &mut self.create,
			Operation::Update => &mut self.update,
			Operation::Purge => &mut self.purge,
		};
		insert_child(map, parent, name);
	}

	fn merge(&mut self, other: Changes, ops: &[Operation]) {
		let Changes { create, update, purge } = other;
		for (op, map) in [(Operation::Create, create), (Operation::Update, update), (Operation::Purge, purge)] {
			if !ops.contains(&op) {
				continue;
			}
			for (parent, children) in map {
				for child in children {
					let target = match op {
						Operation::Create => &mut self.create,
						Operation::Update => &mut self.update,
						Operation::Purge => &mut self.purge,
					};
					insert_child(target, parent.clone(), child);
				}
			}
		}
	}
}

struct DiffEngine<'a> {
	options: &'a DiffConfig,
	filter: &'a PathFilter,
}

impl<'a> DiffEngine<'a> {
	/// Compare one directory level and recurse as configured
	fn diff_dirs(&self, rel: &Path, source: Option<&Path>, destination: Option<&Path>) -> Changes {
		let cmp = compare::compare_dirs(source, destination);
		self.process(&cmp, rel, source, destination)
	}

	fn process(
		&self,
		cmp: &Comparison,
		base: &Path,
		source: Option<&Path>,
		destination: Option<&Path>,
	) -> Changes {
		let mut changes = Changes::default();

		if let Some(src) = source {
			for name in &cmp.source_only {
				self.source_only(&mut changes, &base.join(name), &src.join(name));
			}
		}

		if let (Some(src), Some(dst)) = (source, destination) {
			for name in &cmp.common {
				self.common(&mut changes, &base.join(name), &src.join(name), &dst.join(name));
			}
		}

		if let Some(dst) = destination {
			for name in &cmp.destination_only {
				self.destination_only(&mut changes, &base.join(name), &dst.join(name));
			}
		}

		changes
	}

	fn source_only(&self, changes: &mut Changes, rel: &Path, srcp: &Path) {
		match EntryKind::of(srcp) {
			EntryKind::File => {
				if self.filter.accept(rel, Some(srcp)) {
					changes.record(Operation::Create, rel, false);
				}
			}
			EntryKind::Dir => {
				if self.options.include_dirs && self.filter.accept(rel, Some(srcp)) {
					changes.record(Operation::Create, rel, true);
				}
				if self.options.recursive {
					let sub = self.diff_dirs(rel, Some(srcp), None);
					changes.merge(sub, &[Operation::Create]);
				}
			}
			EntryKind::Other => debug!("skipping non-regular source entry: {}", srcp.display()),
		}
	}

	fn common(&self, changes: &mut Changes, rel: &Path, srcp: &Path, dstp: &Path) {
		match EntryKind::of(srcp) {
			EntryKind::File => {
				let stale = match metadata_utils::is_stale(
					srcp,
					dstp,
					self.options.time_precision,
					self.options.newer,
				) {
					Ok(stale) => stale,
					Err(e) => {
						warn!("Cannot compare {} with {}: {}", srcp.display(), dstp.display(), e);
						false
					}
				};
				if (stale || self.options.force_update) && self.filter.accept(rel, Some(srcp)) {
					changes.record(Operation::Update, rel, false);
				}
			}
			EntryKind::Dir => {
				if self.options.recursive {
					let dst_side = if metadata_utils::is_dir(dstp) { Some(dstp) } else { None };
					let sub = self.diff_dirs(rel, Some(srcp), dst_side);
					changes.merge(sub, &Operation::ALL);
				}
			}
			EntryKind::Other => debug!("skipping non-regular source entry: {}", srcp.display()),
		}
	}

	fn destination_only(&self, changes: &mut Changes, rel: &Path, dstp: &Path) {
		match EntryKind::of(dstp) {
			EntryKind::File => {
				if self.filter.accept(rel, None) {
					changes.record(Operation::Purge, rel, false);
				}
			}
			EntryKind::Dir => {
				// Stray destination directories are always purged
				changes.record(Operation::Purge, rel, true);
				if self.options.recursive {
					let sub = self.diff_dirs(rel, None, Some(dstp));
					changes.merge(sub, &[Operation::Purge]);
				}
			}
			EntryKind::Other => debug!("skipping non-regular destination entry: {}", dstp.display()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	fn children(map: &ChangeMap, parent: &str) -> Vec<String> {
		map.get(Path::new(parent)).cloned().unwrap_or_default()
	}

	#[test]
	fn test_add_marks_directories() {
		let src = TempDir::new().unwrap();
		fs::create_dir(src.path().join("sub")).unwrap();
		fs::write(src.path().join("sub/x.txt"), b"x").unwrap();

		let mut diff = ChangeSet::new(src.path(), "/nonexistent", DiffConfig::default());
		diff.add_create(src.path().join("sub"));
		diff.add_create("sub/x.txt");
		diff.add_create("sub/x.txt");

		assert_eq!(children(diff.create(), "."), vec![path_utils::as_dir_name("sub")]);
		assert_eq!(children(diff.create(), "sub"), vec!["x.txt".to_string()]);
		assert_eq!(diff.create_count(), 2);
		assert_eq!(diff.total(), 2);
	}

	#[test]
	fn test_remove_drops_empty_parent() {
		let src = TempDir::new().unwrap();
		fs::write(src.path().join("a.txt"), b"a").unwrap();
		fs::write(src.path().join("b.txt"), b"b").unwrap();

		let mut diff = ChangeSet::compute(src.path(), "/nonexistent-dst", DiffConfig::default()).unwrap();
		assert_eq!(diff.create_count(), 2);

		assert!(diff.remove_create(src.path().join("a.txt")));
		assert_eq!(children(diff.create(), "."), vec!["b.txt".to_string()]);
		assert!(diff.remove_create("b.txt"));
		assert!(diff.create().is_empty());
		assert_eq!(diff.create_count(), 0);

		// Already gone, or not on disk: no-op
		assert!(!diff.remove_create("b.txt"));
		assert!(!diff.remove_create("ghost.txt"));
	}

	#[test]
	fn test_missing_source_is_empty() {
		let dst = TempDir::new().unwrap();
		fs::write(dst.path().join("keep.txt"), b"k").unwrap();

		let diff = ChangeSet::compute("/definitely/not/here", dst.path(), DiffConfig::default()).unwrap();
		assert!(diff.is_empty());
	}

	#[test]
	fn test_invalid_pattern_fails_run() {
		let src = TempDir::new().unwrap();
		let config = DiffConfig::default()
			.with_pattern_mode(crate::config::PatternMode::Regex)
			.with_filters(vec!["("]);
		assert!(ChangeSet::compute(src.path(), src.path(), config).is_err());
	}

	#[test]
	fn test_non_recursive_stops_at_top_level() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		fs::create_dir(src.path().join("sub")).unwrap();
		fs::write(src.path().join("sub/x.txt"), b"x").unwrap();

		let diff =
			ChangeSet::compute(src.path(), dst.path(), DiffConfig::default().with_recursive(false)).unwrap();
		assert_eq!(children(diff.create(), "."), vec![path_utils::as_dir_name("sub")]);
		assert!(diff.create().get(Path::new("sub")).is_none());
	}

	#[test]
	fn test_report_layout() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		fs::write(src.path().join("b.txt"), b"b").unwrap();
		fs::write(src.path().join("a.txt"), b"a").unwrap();
		fs::write(dst.path().join("old.txt"), b"o").unwrap();

		let diff = ChangeSet::compute(src.path(), dst.path(), DiffConfig::default()).unwrap();
		let report = diff.report(true, true, true);
		let lines: Vec<&str> = report.lines().collect();

		assert!(lines[1].starts_with("Diff report ("));
		assert_eq!(lines[2].len(), lines[1].len());
		assert!(report.contains("Create: (2)\n  ./\n    a.txt\n    b.txt\n"));
		assert!(report.contains("Update: (0)\n"));
		assert!(report.contains("Purge: (1)\n  ./\n    old.txt\n"));

		let only_purge = diff.report(false, false, true);
		assert!(!only_purge.contains("Create:"));
		assert!(only_purge.contains("Purge: (1)"));
	}

	#[test]
	fn test_json_round_trip_and_wrong_kind() {
		let src = TempDir::new().unwrap();
		fs::write(src.path().join("a.txt"), b"a").unwrap();
		let diff = ChangeSet::compute(src.path(), "/nonexistent-dst", DiffConfig::default()).unwrap();

		let json = diff.to_json().unwrap();
		assert_eq!(ChangeSet::from_json(&json).unwrap(), diff);

		match ChangeSet::from_json("[1, 2, 3]") {
			Err(FileSyncError::WrongKind { expected, found }) => {
				assert_eq!(expected, "ChangeSet");
				assert_eq!(found, "array");
			}
			other => panic!("expected WrongKind, got {:?}", other),
		}
	}
}

// vim: ts=4
