//! # crypt-snapshot
//!
//! Rotating, hardlink-chained incremental backups onto a LUKS encrypted disk.
//!
//! ## Features
//!
//! - **Encrypted Volume**: Opens, mounts and closes the LUKS device, remounting read/write when needed
//! - **Incremental Snapshots**: One `YYYY-MM-DD` directory per day, unchanged files hardlinked to the previous one
//! - **Space Management**: Estimates the next snapshot from the last one and evicts the oldest snapshots to make room
//! - **Offsite Copy**: Mirrors selected directories into an encfs and uploads the ciphertext over ssh
//! - **Dry Run**: Prints every mutating command without running it
//!
//! ## Quick Start
//!
//! ```no_run
//! use crypt_snapshot::backup::backup_config::BackupConfig;
//! use crypt_snapshot::backup::command::{ProcessRunner, Tools};
//! use crypt_snapshot::backup::profile::{Operation, Profile};
//! use crypt_snapshot::backup::report::Reporter;
//! use std::sync::Arc;
//!
//! let config = BackupConfig::from_file("/etc/crypt-snapshot.yml")?;
//! let reporter = Reporter::new(false);
//! let runner = ProcessRunner::builder()
//!     .sudo(&config.tools().sudo)
//!     .reporter(reporter)
//!     .build();
//! let tools = Tools {
//!     paths: Arc::new(config.tools().clone()),
//!     runner: Arc::new(runner),
//!     reporter,
//! };
//! Profile::Local.build(&config, tools)?.execute(Operation::Backup)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
