//! # FileSync - One-way Directory Mirroring
//!
//! FileSync compares a source tree against a destination tree, computes the
//! create/update/purge operations that make the destination reflect the
//! source, and applies them. Watch folders repeat this on a timer.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use filesync::sync::SyncBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = SyncBuilder::new("./dir1", "./dir2").purge(true).build();
//!     session.diff()?;
//!     println!("{}", session.diff_report().unwrap_or_default());
//!     session.sync(false, false)?;
//!     println!("{}", session.run_report());
//!     Ok(())
//! }
//! ```
//!
//! ## Working with Change Sets
//!
//! ```rust,ignore
//! use filesync::{ChangeSet, DiffConfig, Executor, RunConfig, RunStats};
//!
//! let diff = ChangeSet::compute("./dir1", "./dir2", DiffConfig::default())?;
//! let config = RunConfig::mirror();
//! let mut stats = RunStats::default();
//! Executor::new(&config).dry_run(true).apply(&diff, &mut stats);
//! ```

pub mod callbacks;
pub mod compare;
pub mod config;
pub mod diff;
pub mod error;
pub mod exclusion;
pub mod executor;
pub mod logging;
pub mod metadata_utils;
pub mod path_utils;
pub mod sync;
pub mod types;
pub mod watch;

// Re-export commonly used types and functions
pub use config::{Config, DiffConfig, PatternMode, RunConfig, SyncPair, WatchConfig};
pub use diff::ChangeSet;
pub use error::{FileSyncError, FilterError};
pub use executor::{Executor, RunOutcome, RunStats};
pub use sync::{SyncBuilder, SyncSession};
pub use types::Operation;

// vim: ts=4
