//! Filesystem metadata helpers: type checks, mtime comparison, stat copying

use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Regular file that is not a symlink
pub fn is_file(path: &Path) -> bool {
	match fs::symlink_metadata(path) {
		Ok(meta) => meta.file_type().is_file(),
		Err(_) => false,
	}
}

/// Directory (symlinks are followed)
pub fn is_dir(path: &Path) -> bool {
	fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// Seconds since the epoch as a float, negative for pre-epoch times
pub fn system_time_secs(t: SystemTime) -> f64 {
	match t.duration_since(UNIX_EPOCH) {
		Ok(d) => d.as_secs_f64(),
		Err(e) => -e.duration().as_secs_f64(),
	}
}

/// Scale a timestamp to `precision` decimal digits and round it
fn rounded(secs: f64, precision: u32) -> f64 {
	(secs * 10f64.powi(precision as i32)).round()
}

/// Compare two modification times at the given precision
///
/// With `newer` set, returns true only when `a` is strictly newer than `b`.
/// Otherwise any difference counts, including `b` being newer.
pub fn mtime_differs(a: SystemTime, b: SystemTime, precision: u32, newer: bool) -> bool {
	let a = rounded(system_time_secs(a), precision);
	let b = rounded(system_time_secs(b), precision);
	if newer {
		a > b
	} else {
		a != b
	}
}

/// Does `src` need to be copied over `dst`?
pub fn is_stale(src: &Path, dst: &Path, precision: u32, newer: bool) -> io::Result<bool> {
	let a = fs::metadata(src)?.modified()?;
	let b = fs::metadata(dst)?.modified()?;
	Ok(mtime_differs(a, b, precision, newer))
}

/// Copy permissions and access/modification times from `src` to `dst`
pub fn copy_stat(src: &Path, dst: &Path) -> io::Result<()> {
	let meta = fs::metadata(src)?;
	fs::set_permissions(dst, meta.permissions())?;
	let atime = FileTime::from_last_access_time(&meta);
	let mtime = FileTime::from_last_modification_time(&meta);
	filetime::set_file_times(dst, atime, mtime)
}

/// Copy file content, permissions and timestamps
pub fn copy_file(src: &Path, dst: &Path) -> io::Result<()> {
	fs::copy(src, dst)?;
	copy_stat(src, dst)
}

/// Is the entry at `path` read-only for its owner?
pub fn is_readonly(path: &Path) -> io::Result<bool> {
	Ok(fs::metadata(path)?.permissions().readonly())
}

/// Give the owner write permission on `path`
#[cfg(unix)]
pub fn make_writable(path: &Path) -> io::Result<()> {
	use std::os::unix::fs::PermissionsExt;

	let mut perms = fs::metadata(path)?.permissions();
	perms.set_mode(perms.mode() | 0o200);
	fs::set_permissions(path, perms)
}

/// Give the owner write permission on `path`
#[cfg(not(unix))]
pub fn make_writable(path: &Path) -> io::Result<()> {
	let mut perms = fs::metadata(path)?.permissions();
	#[allow(clippy::permissions_set_readonly_false)]
	perms.set_readonly(false);
	fs::set_permissions(path, perms)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;
	use tempfile::TempDir;

	fn at(secs: f64) -> SystemTime {
		UNIX_EPOCH + Duration::from_secs_f64(secs)
	}

	#[test]
	fn test_newer_only() {
		assert!(mtime_differs(at(100.0), at(50.0), 3, true));
		assert!(!mtime_differs(at(50.0), at(100.0), 3, true));
		assert!(!mtime_differs(at(100.0), at(100.0), 3, true));
	}

	#[test]
	fn test_any_difference_includes_older_source() {
		// Literal behaviour: an older source still counts as a difference
		assert!(mtime_differs(at(50.0), at(100.0), 3, false));
		assert!(!mtime_differs(at(100.0), at(100.0), 3, false));
	}

	#[test]
	fn test_precision() {
		assert!(mtime_differs(at(100.25), at(100.0), 3, true));
		assert!(!mtime_differs(at(100.25), at(100.0), 0, true));
		assert!(mtime_differs(at(100.6), at(100.0), 0, true));
	}

	#[test]
	fn test_type_checks() {
		let dir = TempDir::new().unwrap();
		let file = dir.path().join("f");
		fs::write(&file, b"x").unwrap();

		assert!(is_file(&file));
		assert!(!is_dir(&file));
		assert!(is_dir(dir.path()));
		assert!(!is_file(dir.path()));
		assert!(!is_file(&dir.path().join("missing")));
	}

	#[test]
	fn test_copy_file_preserves_mtime() {
		let dir = TempDir::new().unwrap();
		let src = dir.path().join("src");
		let dst = dir.path().join("dst");
		fs::write(&src, b"hello").unwrap();
		filetime::set_file_mtime(&src, FileTime::from_unix_time(1_000_000, 0)).unwrap();

		copy_file(&src, &dst).unwrap();

		assert_eq!(fs::read(&dst).unwrap(), b"hello");
		let mtime = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
		assert_eq!(mtime.unix_seconds(), 1_000_000);
		assert!(!is_stale(&src, &dst, 3, true).unwrap());
	}

	#[test]
	fn test_make_writable() {
		let dir = TempDir::new().unwrap();
		let file = dir.path().join("ro");
		fs::write(&file, b"x").unwrap();
		let mut perms = fs::metadata(&file).unwrap().permissions();
		perms.set_readonly(true);
		fs::set_permissions(&file, perms).unwrap();

		assert!(is_readonly(&file).unwrap());
		make_writable(&file).unwrap();
		assert!(!is_readonly(&file).unwrap());
	}
}

// vim: ts=4
