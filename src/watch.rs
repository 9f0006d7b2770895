//! Watch folders
//!
//! Each watched pair runs its own loop: diff, drop the creates that were
//! already present (and untouched) when the watch started, apply, sleep.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::config::{DiffConfig, RunConfig, SyncPair, WatchConfig};
use crate::diff::ChangeSet;
use crate::error::FileSyncError;
use crate::executor::RunOutcome;
use crate::logging::*;
use crate::path_utils;
use crate::sync::SyncSession;

/// Source paths of the first diff's creates with their modification times
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialSnapshot {
	mtimes: BTreeMap<PathBuf, SystemTime>,
}

impl InitialSnapshot {
	pub fn capture(diff: &ChangeSet) -> Self {
		let mut mtimes = BTreeMap::new();
		for (parent, children) in diff.create() {
			for child in children {
				let path = diff.source_path(parent.join(path_utils::strip_dir_marker(child)));
				match fs::metadata(&path).and_then(|m| m.modified()) {
					Ok(mtime) => {
						mtimes.insert(path, mtime);
					}
					Err(e) => debug!("snapshot: cannot stat {}: {}", path.display(), e),
				}
			}
		}
		InitialSnapshot { mtimes }
	}

	pub fn len(&self) -> usize {
		self.mtimes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.mtimes.is_empty()
	}

	/// Initially seen paths that still exist and have not been modified since
	pub fn unchanged(&self) -> Vec<PathBuf> {
		self.mtimes
			.iter()
			.filter(|(path, seen)| match fs::metadata(path).and_then(|m| m.modified()) {
				Ok(now) => now <= **seen,
				Err(_) => false,
			})
			.map(|(path, _)| path.clone())
			.collect()
	}
}

/// Progress callback that prints each message without the destination prefix
pub fn progress_printer(destination: &Path) -> impl Fn(&str, f64) + Send + Sync + 'static {
	let prefix = destination.display().to_string();
	move |message: &str, _percent: f64| {
		let stdout = std::io::stdout();
		let mut out = stdout.lock();
		let _ = write!(out, "\n{}", message.replace(&prefix, ""));
		let _ = out.flush();
	}
}

/// One watched source/destination pair
pub struct WatchFolder {
	session: SyncSession,
	interval: Duration,
	snapshot: Option<InitialSnapshot>,
}

impl WatchFolder {
	pub fn new(pair: &SyncPair, diff: DiffConfig, run: RunConfig, interval: Duration) -> Self {
		let mut session = SyncSession::new(&pair.source, &pair.destination, diff, run);
		session.set_progress(Some(Box::new(progress_printer(session.destination()))));
		WatchFolder { session, interval, snapshot: None }
	}

	pub fn session(&self) -> &SyncSession {
		&self.session
	}

	pub fn snapshot(&self) -> Option<&InitialSnapshot> {
		self.snapshot.as_ref()
	}

	/// First diff of the watch; records the initial contents
	pub fn prime(&mut self) -> Result<(), FileSyncError> {
		self.session.diff()?;
		let snapshot = self.session.original().map(InitialSnapshot::capture).unwrap_or_default();
		debug!(
			"watch {} -> {}: {} initial entries",
			self.session.source().display(),
			self.session.destination().display(),
			snapshot.len()
		);
		self.snapshot = Some(snapshot);
		Ok(())
	}

	/// Diff, trim unchanged initial contents, apply
	pub fn cycle(&mut self) -> Result<RunOutcome, FileSyncError> {
		if self.snapshot.is_none() {
			self.prime()?;
		}
		self.session.diff()?;
		if let Some(snapshot) = &self.snapshot {
			self.session.difftrim(&snapshot.unchanged(), &[], &[]);
		}
		self.session.run(false, false)
	}

	/// Loop forever, running each cycle on the blocking pool
	pub async fn run(mut self) -> Result<(), FileSyncError> {
		info!(
			"watching {} -> {} every {:?}",
			self.session.source().display(),
			self.session.destination().display(),
			self.interval
		);
		loop {
			let interval = self.interval;
			let (folder, result) = tokio::task::spawn_blocking(move || {
				let result = self.cycle();
				(self, result)
			})
			.await
			.map_err(|e| FileSyncError::Other { message: format!("watch task failed: {}", e) })?;
			self = folder;

			if let Err(e) = result {
				error!("watch cycle failed: {}", e);
			}
			tokio::time::sleep(interval).await;
		}
	}
}

/// Header printed before the watch loops start
pub fn banner(config: &WatchConfig, pairs: &[SyncPair]) -> String {
	let title = format!("---------------------- {} ----------------------", config.title);
	let line = "-".repeat(title.chars().count());
	let paths: Vec<String> = pairs
		.iter()
		.map(|p| format!("Source: {}\nDestination: {}", p.source.display(), p.destination.display()))
		.collect();
	format!("{0}\n{1}\n{0}\n{2}\n{0}\n{3}\n{0}", line, title, config.message, paths.join("\n"))
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
	#[cfg(unix)]
	{
		use tokio::signal::unix::{signal, SignalKind};

		let mut sigterm = match signal(SignalKind::terminate()) {
			Ok(stream) => stream,
			Err(e) => {
				warn!("Failed to setup SIGTERM handler: {}", e);
				let _ = tokio::signal::ctrl_c().await;
				return;
			}
		};
		tokio::select! {
			_ = sigterm.recv() => debug!("Received SIGTERM"),
			_ = tokio::signal::ctrl_c() => debug!("Received SIGINT"),
		}
	}
	#[cfg(not(unix))]
	{
		let _ = tokio::signal::ctrl_c().await;
		debug!("Received Ctrl-C");
	}
}

/// Watch every pair until the process is interrupted
pub async fn watch_all(
	pairs: &[SyncPair],
	diff: &DiffConfig,
	run: &RunConfig,
	config: &WatchConfig,
) -> Result<(), FileSyncError> {
	if let Some(pair) = pairs.iter().find(|p| !p.source.is_dir()) {
		return Err(FileSyncError::MissingRoot { path: pair.source.clone() });
	}

	let interval = Duration::from_secs(config.interval_secs.max(1));
	let tasks: Vec<_> = pairs
		.iter()
		.map(|pair| {
			let folder = WatchFolder::new(pair, diff.clone(), run.clone(), interval);
			tokio::spawn(folder.run())
		})
		.collect();

	tokio::select! {
		results = futures::future::join_all(tasks) => {
			for result in results {
				match result {
					Ok(Err(e)) => error!("watch stopped: {}", e),
					Err(e) => error!("watch task panicked: {}", e),
					Ok(Ok(())) => {}
				}
			}
		}
		_ = shutdown_signal() => {
			info!("Stopping watch folders");
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use filetime::FileTime;
	use tempfile::TempDir;

	#[test]
	fn test_snapshot_tracks_modification() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		fs::write(src.path().join("old.txt"), b"o").unwrap();
		fs::write(src.path().join("edit.txt"), b"e").unwrap();
		filetime::set_file_mtime(src.path().join("edit.txt"), FileTime::from_unix_time(1000, 0)).unwrap();

		let diff = ChangeSet::compute(src.path(), dst.path(), DiffConfig::default()).unwrap();
		let snapshot = InitialSnapshot::capture(&diff);
		assert_eq!(snapshot.len(), 2);

		filetime::set_file_mtime(src.path().join("edit.txt"), FileTime::from_unix_time(2000, 0)).unwrap();
		let unchanged = snapshot.unchanged();
		assert_eq!(unchanged, vec![diff.source_path("old.txt")]);
	}

	#[test]
	fn test_cycle_skips_initial_contents() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		fs::write(src.path().join("before.txt"), b"b").unwrap();
		let pair = SyncPair::new(src.path(), dst.path());
		let run = RunConfig::default().with_create(true).with_update(true);

		let mut folder = WatchFolder::new(&pair, DiffConfig::default(), run, Duration::from_secs(1));
		folder.prime().unwrap();
		fs::write(src.path().join("after.txt"), b"a").unwrap();
		folder.cycle().unwrap();

		assert!(!dst.path().join("before.txt").exists());
		assert!(dst.path().join("after.txt").exists());
	}

	#[test]
	fn test_banner() {
		let config = WatchConfig { title: "T".to_string(), ..WatchConfig::default() };
		let text = banner(&config, &[SyncPair::new("/a", "/b")]);
		let title = "---------------------- T ----------------------";
		let line = "-".repeat(title.len());
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines[0], line);
		assert_eq!(lines[1], title);
		assert_eq!(lines[3], config.message);
		assert_eq!(lines[5], "Source: /a");
		assert_eq!(lines[6], "Destination: /b");
		assert_eq!(lines[7], line);
	}

	#[tokio::test]
	async fn test_run_loop_copies_new_files() {
		let src = TempDir::new().unwrap();
		let dst = TempDir::new().unwrap();
		let pair = SyncPair::new(src.path(), dst.path());
		let run = RunConfig::default().with_create(true);
		let folder = WatchFolder::new(&pair, DiffConfig::default(), run, Duration::from_millis(50));

		let handle = tokio::spawn(folder.run());
		tokio::time::sleep(Duration::from_millis(100)).await;
		fs::write(src.path().join("late.txt"), b"l").unwrap();
		tokio::time::sleep(Duration::from_millis(400)).await;
		handle.abort();

		assert!(dst.path().join("late.txt").exists());
	}
}

// vim: ts=4
