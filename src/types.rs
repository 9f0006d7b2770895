use serde::{Deserialize, Serialize};
use std::fmt;

/// The three change categories of a diff
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
	/// Exists only in the source
	Create,
	/// Exists on both sides, source is stale-checked newer
	Update,
	/// Exists only in the destination
	Purge,
}

impl Operation {
	pub const ALL: [Operation; 3] = [Operation::Create, Operation::Update, Operation::Purge];

	/// Capitalized label used in reports
	pub fn title(self) -> &'static str {
		match self {
			Operation::Create => "Create",
			Operation::Update => "Update",
			Operation::Purge => "Purge",
		}
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Operation::Create => write!(f, "create"),
			Operation::Update => write!(f, "update"),
			Operation::Purge => write!(f, "purge"),
		}
	}
}

/// What a compared path turned out to be on disk
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EntryKind {
	File,
	Dir,
	/// Symlinks to files, sockets, vanished entries
	Other,
}

impl EntryKind {
	pub fn of(path: &std::path::Path) -> Self {
		if crate::metadata_utils::is_file(path) {
			EntryKind::File
		} else if crate::metadata_utils::is_dir(path) {
			EntryKind::Dir
		} else {
			EntryKind::Other
		}
	}
}

// vim: ts=4
