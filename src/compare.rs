//! Tree comparison
//!
//! Classifies names as source-only, common or destination-only. Either side
//! may be absent, which behaves like an empty directory.

use crate::logging::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of comparing two directory levels or a path list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
	pub source_only: BTreeSet<PathBuf>,
	pub common: BTreeSet<PathBuf>,
	pub destination_only: BTreeSet<PathBuf>,
	/// Path-list entries found on neither side
	pub missing: BTreeSet<PathBuf>,
}

impl Comparison {
	pub fn is_empty(&self) -> bool {
		self.source_only.is_empty()
			&& self.common.is_empty()
			&& self.destination_only.is_empty()
			&& self.missing.is_empty()
	}
}

/// Names directly inside `dir`; an absent or unreadable directory is empty
fn list_dir(dir: Option<&Path>) -> BTreeSet<PathBuf> {
	let dir = match dir {
		Some(d) => d,
		None => return BTreeSet::new(),
	};

	let entries = match fs::read_dir(dir) {
		Ok(e) => e,
		Err(e) => {
			warn!("Cannot read directory {}: {}", dir.display(), e);
			return BTreeSet::new();
		}
	};

	let mut names = BTreeSet::new();
	for entry_result in entries {
		match entry_result {
			Ok(entry) => {
				names.insert(PathBuf::from(entry.file_name()));
			}
			Err(e) => debug!("Error reading entry in {}: {}", dir.display(), e),
		}
	}
	names
}

/// Compare the immediate children of two directories
pub fn compare_dirs(source: Option<&Path>, destination: Option<&Path>) -> Comparison {
	debug!("compare {:?} -> {:?}", source, destination);
	let left = list_dir(source);
	let right = list_dir(destination);

	Comparison {
		source_only: left.difference(&right).cloned().collect(),
		common: left.intersection(&right).cloned().collect(),
		destination_only: right.difference(&left).cloned().collect(),
		missing: BTreeSet::new(),
	}
}

/// Classify an explicit list of root-relative paths
pub fn compare_list(list: &[PathBuf], source: Option<&Path>, destination: Option<&Path>) -> Comparison {
	let mut result = Comparison::default();

	for rel in list {
		let in_source = source.map(|root| root.join(rel).exists()).unwrap_or(false);
		let in_destination = destination.map(|root| root.join(rel).exists()).unwrap_or(false);

		let bucket = match (in_source, in_destination) {
			(true, true) => &mut result.common,
			(true, false) => &mut result.source_only,
			(false, true) => &mut result.destination_only,
			(false, false) => &mut result.missing,
		};
		bucket.insert(rel.clone());
	}

	result
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn names(items: &[&str]) -> BTreeSet<PathBuf> {
		items.iter().map(PathBuf::from).collect()
	}

	#[test]
	fn test_compare_dirs() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		fs::write(src.path().join("a"), b"").unwrap();
		fs::write(src.path().join("both"), b"").unwrap();
		fs::create_dir(src.path().join("sub")).unwrap();
		fs::write(dst.path().join("both"), b"").unwrap();
		fs::write(dst.path().join("z"), b"").unwrap();

		let cmp = compare_dirs(Some(src.path()), Some(dst.path()));
		assert_eq!(cmp.source_only, names(&["a", "sub"]));
		assert_eq!(cmp.common, names(&["both"]));
		assert_eq!(cmp.destination_only, names(&["z"]));
		assert!(cmp.missing.is_empty());
	}

	#[test]
	fn test_absent_side_is_empty() {
		let src = TempDir::new().unwrap();
		fs::write(src.path().join("a"), b"").unwrap();

		let cmp = compare_dirs(Some(src.path()), None);
		assert_eq!(cmp.source_only, names(&["a"]));
		assert!(cmp.common.is_empty() && cmp.destination_only.is_empty());

		let cmp = compare_dirs(None, Some(src.path()));
		assert_eq!(cmp.destination_only, names(&["a"]));
	}

	#[test]
	fn test_compare_list() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		fs::create_dir(src.path().join("d")).unwrap();
		fs::write(src.path().join("d/new.txt"), b"").unwrap();
		fs::write(src.path().join("same.txt"), b"").unwrap();
		fs::write(dst.path().join("same.txt"), b"").unwrap();
		fs::write(dst.path().join("old.txt"), b"").unwrap();

		let list: Vec<PathBuf> =
			["d/new.txt", "same.txt", "old.txt", "ghost.txt"].iter().map(PathBuf::from).collect();
		let cmp = compare_list(&list, Some(src.path()), Some(dst.path()));

		assert_eq!(cmp.source_only, names(&["d/new.txt"]));
		assert_eq!(cmp.common, names(&["same.txt"]));
		assert_eq!(cmp.destination_only, names(&["old.txt"]));
		assert_eq!(cmp.missing, names(&["ghost.txt"]));
	}
}

// vim: ts=4
