use crate::backup::command::Tools;
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddFunctionName;
use crate::backup::snapshot::{Catalog, SnapshotCatalog};
use crate::backup::volume::EncryptedVolume;
use function_name::named;

/// Evicts the oldest snapshots until enough space is free, never going below
/// `floor` snapshots.
pub struct RetentionManager {
    floor: usize,
    tools: Tools,
}

impl RetentionManager {
    pub fn new(floor: usize, tools: Tools) -> Self {
        Self { floor, tools }
    }

    /// Returns the catalog left after eviction, or `NoSpaceLeft` once only
    /// `floor` snapshots remain and `required` bytes are still not free.
    ///
    /// Every round either returns or removes one snapshot, so the loop ends.
    #[named]
    pub fn ensure_space(
        &self,
        required: u64,
        catalog: Catalog,
        volume: &EncryptedVolume,
        snapshots: &SnapshotCatalog,
    ) -> Result<Catalog> {
        let mut catalog = catalog;
        let mut free = volume.free_space()?;
        tracing::debug!("{required} bytes required, {free} bytes free");
        let mut evicted = Vec::new();

        while free < required {
            if catalog.len() <= self.floor {
                self.tools.reporter.status(format!(
                    "Won't clean last {} backup(s)...",
                    self.floor
                ));
                self.tools.reporter.status(
                    "Not enough space left after cleaning up, please take care of it yourself...",
                );
                return Err(Error::no_space_left(
                    volume.config().mapper_device().to_string_lossy(),
                    required,
                    free,
                )
                .add_fn_name(function_path!()));
            }
            if evicted.is_empty() {
                self.tools
                    .reporter
                    .status("Not enough space, cleaning old backups...");
            }

            let Some(oldest) = catalog.oldest().cloned() else {
                break;
            };
            self.tools.reporter.status(format!("Wiping backup {oldest}"));
            snapshots.remove(&oldest)?;
            evicted.push(oldest.clone());

            // A dry run leaves the directories in place.
            catalog = snapshots
                .list()?
                .iter()
                .filter(|s| !evicted.contains(*s))
                .cloned()
                .collect();
            free = volume.free_space()?;
            tracing::info!(
                "Evicted {oldest}: {} snapshots left, {free} bytes free",
                catalog.len()
            );
        }

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::backup_config::tests::volume;
    use crate::backup::command::fake::FakeRunner;
    use crate::backup::result_error::error::EXIT_NO_SPACE_LEFT;
    use crate::backup::snapshot::tests::catalog;
    use std::cell::Cell;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn df(free: u64) -> String {
        format!(
            "Filesystem 1-blocks Used Available Capacity Mounted on\n\
             /dev/mapper/crypt-backup 1000000 0 {free} 0% /mnt/backup\n"
        )
    }

    struct Disk {
        root: TempDir,
        runner: Arc<FakeRunner>,
    }

    /// Snapshot root on disk where every eviction frees `per_snapshot` bytes.
    fn disk(names: &[&str], free: u64, per_snapshot: u64) -> Disk {
        let root = TempDir::new().unwrap();
        for name in names {
            std::fs::create_dir(root.path().join(name)).unwrap();
        }
        let free = Rc::new(Cell::new(free));
        let runner = Arc::new(FakeRunner::new(move |c| match c.program_name().as_str() {
            "df" => Ok(df(free.get())),
            "rm" => {
                let path = PathBuf::from(&c.args_lossy()[1]);
                std::fs::remove_dir_all(path).unwrap();
                free.set(free.get() + per_snapshot);
                Ok(String::new())
            }
            other => panic!("unexpected {other}"),
        }));
        Disk { root, runner }
    }

    fn ensure(disk: &Disk, required: u64, floor: usize) -> Result<Catalog> {
        let tools = disk.runner.tools();
        let volume = EncryptedVolume::new(volume(), tools.clone());
        let snapshots = SnapshotCatalog::new(disk.root.path(), tools.clone());
        let current = snapshots.list().unwrap();
        RetentionManager::new(floor, tools).ensure_space(required, current, &volume, &snapshots)
    }

    fn removed(disk: &Disk) -> Vec<String> {
        disk.runner
            .calls_to("rm")
            .iter()
            .map(|c| {
                PathBuf::from(&c.args_lossy()[1])
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    #[test]
    fn test_enough_space_evicts_nothing() {
        let disk = disk(&["2024-01-01", "2024-01-02"], 200, 100);
        let left = ensure(&disk, 150, 1).unwrap();
        assert_eq!(left, catalog(&["2024-01-01", "2024-01-02"]));
        assert!(removed(&disk).is_empty());
    }

    #[test]
    fn test_evicts_oldest_until_space_is_free() {
        let disk = disk(&["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"], 100, 30);
        let left = ensure(&disk, 150, 1).unwrap();
        assert_eq!(removed(&disk), vec!["2024-01-01", "2024-01-02"]);
        assert_eq!(left, catalog(&["2024-01-03", "2024-01-04"]));
    }

    #[test]
    fn test_single_eviction_frees_enough() {
        let disk = disk(&["2024-01-01", "2024-01-02"], 100, 60);
        let left = ensure(&disk, 150, 1).unwrap();
        assert_eq!(removed(&disk), vec!["2024-01-01"]);
        assert_eq!(left, catalog(&["2024-01-02"]));
    }

    #[test]
    fn test_stops_at_floor_with_no_space_left() {
        let disk = disk(&["2024-01-01", "2024-01-02"], 100, 10);
        let error = ensure(&disk, 150, 1).unwrap_err();
        assert_eq!(error.exit_code(), EXIT_NO_SPACE_LEFT);
        assert_eq!(removed(&disk), vec!["2024-01-01"]);
        assert!(disk.root.path().join("2024-01-02").is_dir());
    }

    #[test]
    fn test_never_evicts_below_floor() {
        let names = ["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"];
        let disk = disk(&names, 0, 1);
        assert!(ensure(&disk, 1_000, 3).is_err());
        assert_eq!(removed(&disk), vec!["2024-01-01", "2024-01-02"]);
        let left = SnapshotCatalog::new(disk.root.path(), disk.runner.tools())
            .list()
            .unwrap();
        assert_eq!(left.len(), 3);
    }

    #[test]
    fn test_catalog_already_at_floor_fails_without_evicting() {
        let disk = disk(&["2024-01-01", "2024-01-02"], 0, 100);
        assert!(ensure(&disk, 1, 2).is_err());
        assert!(removed(&disk).is_empty());
    }

    #[test]
    fn test_removal_that_leaves_directory_still_progresses() {
        let root = TempDir::new().unwrap();
        for name in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            std::fs::create_dir(root.path().join(name)).unwrap();
        }
        let runner = Arc::new(FakeRunner::new(|c| match c.program_name().as_str() {
            "df" => Ok(df(0)),
            _ => Ok(String::new()),
        }));
        let tools = runner.tools();
        let volume = EncryptedVolume::new(volume(), tools.clone());
        let snapshots = SnapshotCatalog::new(root.path(), tools.clone());
        let current = snapshots.list().unwrap();
        let result = RetentionManager::new(1, tools).ensure_space(10, current, &volume, &snapshots);

        assert!(result.is_err());
        assert_eq!(runner.calls_to("rm").len(), 2);
    }
}
