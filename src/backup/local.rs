//! Hardlink-chained snapshots of the whole system on the encrypted volume.
//!
//! A run is `mount`, `backup`, `umount`. `backup` works out which earlier
//! snapshot the new one links to and whether the volume has room for it,
//! evicting old snapshots when it does not, then writes today's snapshot.

use crate::backup::backup_config::LocalConfig;
use crate::backup::command::{SystemCommand, Tools};
use crate::backup::estimate::SpaceEstimator;
use crate::backup::function_path;
use crate::backup::profile::BackupProfile;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddFunctionName;
use crate::backup::retention::RetentionManager;
use crate::backup::snapshot::{Catalog, Snapshot, SnapshotCatalog};
use crate::backup::sync::{SyncExecutor, SyncMode};
use crate::backup::volume::EncryptedVolume;
use chrono::{Local, NaiveDate};
use function_name::named;
use std::path::PathBuf;

/// What a backup run decided before it started copying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupPlan {
    pub snapshot: Snapshot,
    pub destination: PathBuf,
    pub link_target: Option<Snapshot>,
    /// Estimated size of the new snapshot, if one was made.
    pub required: Option<u64>,
}

pub struct LocalBackup {
    config: LocalConfig,
    tools: Tools,
    volume: EncryptedVolume,
    snapshots: SnapshotCatalog,
    estimator: SpaceEstimator,
    retention: RetentionManager,
    sync: SyncExecutor,
}

/// The snapshot new files get hardlinked to: the newest one that is not
/// `today`'s own directory.
fn link_target(catalog: &Catalog, today: &Snapshot) -> Option<Snapshot> {
    catalog.newest_except(today).cloned()
}

impl LocalBackup {
    pub fn new(config: LocalConfig, tools: Tools) -> Self {
        Self {
            volume: EncryptedVolume::new(config.volume().clone(), tools.clone()),
            snapshots: SnapshotCatalog::new(config.backup_root(), tools.clone()),
            estimator: SpaceEstimator::new(tools.clone()),
            retention: RetentionManager::new(*config.keep(), tools.clone()),
            sync: SyncExecutor::new(SyncMode::Snapshot, tools.clone()),
            config,
            tools,
        }
    }

    pub fn volume(&self) -> &EncryptedVolume {
        &self.volume
    }

    /// Writes the snapshot for `today`. An existing snapshot of the same day
    /// is refreshed in place.
    #[named]
    pub fn backup_on(&mut self, today: NaiveDate) -> Result<BackupPlan> {
        let reporter = self.tools.reporter;
        let snapshot = Snapshot::for_date(today);
        let root = self.snapshots.root().to_path_buf();

        let mut catalog = self.snapshots.list().add_fn_name(function_path!())?;
        tracing::info!("Found {} snapshot(s) in {:?}", catalog.len(), root);
        let mut link = link_target(&catalog, &snapshot);
        let mut required = None;

        if catalog.len() < 2 {
            match &link {
                None => reporter.status("Doing first full backup..."),
                Some(_) => reporter.status("Full backup found, doing first incremental backup..."),
            }
        } else {
            if let Some(target) = &link {
                reporter.status(format!("Incremental backup from {target}"));
            }
            reporter.status("Using heuristic to determine incremental size...");
            required = self
                .estimator
                .estimate(&catalog, &root)
                .add_fn_name(function_path!())?;
            if let Some(required) = required {
                catalog = self
                    .retention
                    .ensure_space(required, catalog, &self.volume, &self.snapshots)
                    .add_fn_name(function_path!())?;
                link = link_target(&catalog, &snapshot);
            }
        }

        let plan = BackupPlan {
            destination: self.snapshots.path(&snapshot),
            snapshot,
            link_target: link,
            required,
        };
        tracing::info!("Backup plan: {:?}", plan);

        self.sync
            .run(
                self.config.sources(),
                self.config.excludes(),
                &plan.destination,
                plan.link_target.as_ref(),
            )
            .add_fn_name(function_path!())?;
        Ok(plan)
    }
}

impl BackupProfile for LocalBackup {
    fn mount(&mut self) -> Result<()> {
        self.volume.mount()?;
        if let Some(secondary) = self.config.secondary_mount() {
            self.tools
                .runner
                .run(&SystemCommand::privileged(&self.tools.paths.mount).arg(secondary))?;
        }
        Ok(())
    }

    fn backup(&mut self) -> Result<()> {
        self.backup_on(Local::now().date_naive()).map(|_| ())
    }

    fn umount(&mut self) -> Result<()> {
        let secondary = match self.config.secondary_mount() {
            Some(secondary) => self
                .tools
                .runner
                .run(&SystemCommand::privileged(&self.tools.paths.umount).arg(secondary)),
            None => Ok(()),
        };
        match (secondary, self.volume.unmount()) {
            (Ok(_), Ok(_)) => Ok(()),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(e1), Err(e2)) => Err(e1.chain(e2)),
        }
    }
}
