//! Relative path bookkeeping shared by the diff engine and the executor

use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// Key used for entries whose parent is the root itself
pub const ROOT_KEY: &str = ".";

/// Lexically normalize a path: drop `.` components, fold `..` and trailing
/// separators. An empty result becomes `.`.
pub fn normalize(path: &Path) -> PathBuf {
	let mut out = PathBuf::new();
	for comp in path.components() {
		match comp {
			Component::CurDir => {}
			Component::ParentDir => {
				let popped = match out.components().next_back() {
					Some(Component::Normal(_)) => out.pop(),
					_ => false,
				};
				if !popped && !out.has_root() {
					out.push("..");
				}
			}
			other => out.push(other.as_os_str()),
		}
	}
	if out.as_os_str().is_empty() {
		PathBuf::from(ROOT_KEY)
	} else {
		out
	}
}

/// Render a relative path with `/` separators for pattern matching
pub fn to_slash(path: &Path) -> String {
	path.components()
		.map(|c| c.as_os_str().to_string_lossy().into_owned())
		.collect::<Vec<_>>()
		.join("/")
}

/// Case-fold a path string the way the host filesystem compares names
///
/// ASCII-only folding keeps byte offsets identical, so the folded string can be
/// used to locate a prefix in the original.
pub fn normcase(s: &str) -> String {
	if cfg!(windows) {
		s.replace('/', "\\").to_ascii_lowercase()
	} else {
		s.to_string()
	}
}

/// Mark a child name as a directory entry
pub fn as_dir_name(name: &str) -> String {
	format!("{}{}", name.trim_end_matches(|c| c == '/' || c == '\\'), MAIN_SEPARATOR)
}

/// Does this child name carry the directory marker?
pub fn is_dir_name(name: &str) -> bool {
	name.ends_with('/') || name.ends_with('\\')
}

/// Child name without the directory marker
pub fn strip_dir_marker(name: &str) -> &str {
	name.trim_end_matches(|c| c == '/' || c == '\\')
}

/// Split a relative path into its parent key and final name
pub fn split_parent(rel: &Path) -> Option<(PathBuf, String)> {
	let rel = normalize(rel);
	let name = rel.file_name()?.to_str()?.to_string();
	let parent = match rel.parent() {
		Some(p) if !p.as_os_str().is_empty() => normalize(p),
		_ => PathBuf::from(ROOT_KEY),
	};
	Some((parent, name))
}

/// Join a parent key onto a root
pub fn resolve(root: &Path, parent: &Path) -> PathBuf {
	if parent == Path::new(ROOT_KEY) {
		root.to_path_buf()
	} else {
		root.join(parent)
	}
}

/// Express `path` relative to `root`
///
/// A path starting with `root` (absolute or relative) has the prefix
/// stripped. Other relative inputs are taken as root-relative already.
/// Absolute inputs outside `root` yield None.
pub fn relative_to(path: &Path, root: &Path) -> Option<PathBuf> {
	let path = normalize(path);
	let root = normalize(root);
	if root != Path::new(ROOT_KEY) {
		if let Ok(rel) = path.strip_prefix(&root) {
			return Some(normalize(rel));
		}
	}
	if path.is_absolute() {
		None
	} else {
		Some(path)
	}
}

/// Strip source/destination root prefixes from a caller-supplied path list
///
/// Prefixes are compared case-folded, but the returned tail keeps the casing
/// the caller used.
pub fn relativize_list(list: &[PathBuf], source: &Path, destination: &Path) -> Vec<PathBuf> {
	let prefixes: Vec<String> = [source, destination]
		.iter()
		.map(|root| {
			let mut s = normcase(&normalize(root).to_string_lossy());
			if !s.ends_with(MAIN_SEPARATOR) {
				s.push(MAIN_SEPARATOR);
			}
			s
		})
		.collect();

	list.iter()
		.map(|path| {
			let original = normalize(path).to_string_lossy().into_owned();
			let folded = normcase(&original);
			let tail = prefixes
				.iter()
				.find(|prefix| folded.starts_with(prefix.as_str()))
				.map(|prefix| &original[prefix.len()..])
				.unwrap_or(&original);
			normalize(Path::new(tail.trim_start_matches(|c| c == '/' || c == '\\')))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_normalize() {
		assert_eq!(normalize(Path::new("a/./b/")), PathBuf::from("a/b"));
		assert_eq!(normalize(Path::new("a/b/../c")), PathBuf::from("a/c"));
		assert_eq!(normalize(Path::new("")), PathBuf::from("."));
		assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
		assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
	}

	#[test]
	fn test_split_parent() {
		assert_eq!(split_parent(Path::new("foo.txt")), Some((PathBuf::from("."), "foo.txt".into())));
		assert_eq!(split_parent(Path::new("sub/x.txt")), Some((PathBuf::from("sub"), "x.txt".into())));
		assert_eq!(split_parent(Path::new("sub/")), Some((PathBuf::from("."), "sub".into())));
		assert_eq!(split_parent(Path::new(".")), None);
	}

	#[test]
	fn test_dir_marker() {
		let marked = as_dir_name("sub/");
		assert!(is_dir_name(&marked));
		assert_eq!(strip_dir_marker(&marked), "sub");
		assert!(!is_dir_name("file.txt"));
	}

	#[test]
	fn test_resolve() {
		let root = Path::new("/data/src");
		assert_eq!(resolve(root, Path::new(".")), PathBuf::from("/data/src"));
		assert_eq!(resolve(root, Path::new("a/b")), PathBuf::from("/data/src/a/b"));
	}

	#[test]
	fn test_relative_to() {
		let root = Path::new("/data/src");
		assert_eq!(relative_to(Path::new("/data/src/a/b.txt"), root), Some(PathBuf::from("a/b.txt")));
		assert_eq!(relative_to(Path::new("a/b.txt"), root), Some(PathBuf::from("a/b.txt")));
		assert_eq!(relative_to(Path::new("/elsewhere/b.txt"), root), None);

		let relative_root = Path::new("./work/src");
		assert_eq!(relative_to(Path::new("work/src/a/b.txt"), relative_root), Some(PathBuf::from("a/b.txt")));
		assert_eq!(relative_to(Path::new("./work/src/c.txt"), relative_root), Some(PathBuf::from("c.txt")));
		assert_eq!(relative_to(Path::new("c.txt"), relative_root), Some(PathBuf::from("c.txt")));
		assert_eq!(relative_to(Path::new("c.txt"), Path::new(".")), Some(PathBuf::from("c.txt")));
	}

	#[cfg(unix)]
	#[test]
	fn test_relativize_list() {
		let list = vec![
			PathBuf::from("/data/src/Docs/Readme.TXT"),
			PathBuf::from("/data/dst/img/a.png"),
			PathBuf::from("plain/rel.txt"),
		];
		let rel = relativize_list(&list, Path::new("/data/src"), Path::new("/data/dst/"));
		assert_eq!(
			rel,
			vec![
				PathBuf::from("Docs/Readme.TXT"),
				PathBuf::from("img/a.png"),
				PathBuf::from("plain/rel.txt"),
			]
		);
	}

	#[test]
	fn test_to_slash() {
		let p: PathBuf = ["a", "b", "c.txt"].iter().collect();
		assert_eq!(to_slash(&p), "a/b/c.txt");
	}
}

// vim: ts=4
