//! Dated snapshot directories under the backup root.
//!
//! A snapshot's directory name is its only persisted state. Names have the
//! fixed-width form `YYYY-MM-DD`, so sorting them as strings sorts them by
//! date.

use crate::backup::command::{SystemCommand, Tools};
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};
use chrono::NaiveDate;
use derive_more::{Deref, Display};
use function_name::named;
use itertools::{process_results, Itertools};
use std::ffi::OsString;
use std::fs::read_dir;
use std::path::{Path, PathBuf};
use std::str::FromStr;

static SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Snapshot(String);

impl Snapshot {
    pub fn for_date(date: NaiveDate) -> Self {
        Self(date.format(SNAPSHOT_DATE_FORMAT).to_string())
    }

    /// `YYYY-MM-DD`, digits only, no calendar check.
    pub fn is_snapshot_name(name: &str) -> bool {
        let bytes = name.as_bytes();
        bytes.len() == 10
            && bytes.iter().enumerate().all(|(i, b)| match i {
                4 | 7 => *b == b'-',
                _ => b.is_ascii_digit(),
            })
    }
}

impl FromStr for Snapshot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if Self::is_snapshot_name(s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(Error::invalid_snapshot_name(s))
        }
    }
}

impl AsRef<Path> for Snapshot {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// Snapshots present at the backup root, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deref)]
pub struct Catalog(Vec<Snapshot>);

impl Catalog {
    pub fn new<I: IntoIterator<Item = Snapshot>>(snapshots: I) -> Self {
        Self(snapshots.into_iter().sorted().dedup().collect())
    }

    pub fn oldest(&self) -> Option<&Snapshot> {
        self.0.first()
    }

    /// Newest snapshot other than `snapshot` itself.
    pub fn newest_except(&self, snapshot: &Snapshot) -> Option<&Snapshot> {
        self.0.iter().rev().find(|s| *s != snapshot)
    }

    /// The two newest snapshots, older one first.
    pub fn newest_pair(&self) -> Option<(&Snapshot, &Snapshot)> {
        match self.0.as_slice() {
            [.., older, newer] => Some((older, newer)),
            _ => None,
        }
    }
}

impl FromIterator<Snapshot> for Catalog {
    fn from_iter<T: IntoIterator<Item = Snapshot>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Keeps the names shaped like a snapshot. The first read error is returned
/// instead of a partial catalog.
fn catalog_from_names<I>(names: I) -> std::io::Result<Catalog>
where
    I: IntoIterator<Item = std::io::Result<OsString>>,
{
    process_results(names, |names| {
        names
            .filter_map(|n| n.to_str().and_then(|n| n.parse::<Snapshot>().ok()))
            .collect()
    })
}

pub struct SnapshotCatalog {
    root: PathBuf,
    tools: Tools,
}

impl SnapshotCatalog {
    pub fn new<P: Into<PathBuf>>(root: P, tools: Tools) -> Self {
        Self {
            root: root.into(),
            tools,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, snapshot: &Snapshot) -> PathBuf {
        self.root.join(snapshot)
    }

    /// Reads the backup root afresh. Entries not named like a snapshot are
    /// skipped, an entry that cannot be read fails the whole listing.
    #[named]
    pub fn list(&self) -> Result<Catalog> {
        let catalog = read_dir(&self.root)
            .and_then(|entries| catalog_from_names(entries.map(|r| r.map(|de| de.file_name()))))
            .map_err(Error::from)
            .add_msg(format!("Listing snapshots in {:?} failed", self.root))
            .add_fn_name(function_path!())?;
        tracing::debug!("Snapshots in {:?}: {:?}", self.root, catalog);
        Ok(catalog)
    }

    #[named]
    pub fn remove(&self, snapshot: &Snapshot) -> Result<()> {
        let path = self.path(snapshot);
        tracing::info!("Removing snapshot {:?}", path);
        let command = SystemCommand::privileged(&self.tools.paths.rm)
            .arg("-Rf")
            .arg(&path);
        self.tools
            .runner
            .run(&command)
            .add_fn_name(function_path!())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backup::command::fake::FakeRunner;
    use proptest::prelude::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    pub(crate) fn snapshot(name: &str) -> Snapshot {
        name.parse().unwrap()
    }

    pub(crate) fn catalog(names: &[&str]) -> Catalog {
        names.iter().map(|n| snapshot(n)).collect()
    }

    #[test]
    fn test_snapshot_name_pattern() {
        assert!(Snapshot::is_snapshot_name("2024-01-02"));
        assert!(!Snapshot::is_snapshot_name("2024-1-02"));
        assert!(!Snapshot::is_snapshot_name("2024-01-02.tmp"));
        assert!(!Snapshot::is_snapshot_name("2024_01_02"));
        assert!(!Snapshot::is_snapshot_name("lost+found"));
        assert!(matches!(
            "latest".parse::<Snapshot>(),
            Err(Error::InvalidSnapshotName(_))
        ));
    }

    #[test]
    fn test_snapshot_for_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let today = Snapshot::for_date(date);
        assert_eq!(today.to_string(), "2024-01-02");
        assert_eq!(today, snapshot("2024-01-02"));
    }

    #[test]
    fn test_catalog_helpers() {
        let catalog = catalog(&["2024-01-03", "2024-01-01", "2024-01-02"]);
        assert_eq!(catalog.oldest(), Some(&snapshot("2024-01-01")));
        assert_eq!(
            catalog.newest_pair(),
            Some((&snapshot("2024-01-02"), &snapshot("2024-01-03")))
        );
        assert_eq!(
            catalog.newest_except(&snapshot("2024-01-03")),
            Some(&snapshot("2024-01-02"))
        );
        assert_eq!(
            catalog.newest_except(&snapshot("2024-01-01")),
            Some(&snapshot("2024-01-03"))
        );
        assert_eq!(
            Catalog::new([snapshot("2024-01-01")]).newest_except(&snapshot("2024-01-01")),
            None
        );
        assert_eq!(Catalog::default().newest_pair(), None);
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let root = TempDir::new().unwrap();
        for name in ["2024-02-01", "2023-12-31", "lost+found", "2024-01-15", "notes.txt"] {
            std::fs::create_dir(root.path().join(name)).unwrap();
        }
        let listed = SnapshotCatalog::new(root.path(), Arc::new(FakeRunner::silent()).tools())
            .list()
            .unwrap();
        assert_eq!(listed, catalog(&["2023-12-31", "2024-01-15", "2024-02-01"]));
    }

    #[test]
    fn test_unreadable_entry_fails_the_listing() {
        let names = vec![
            Ok(OsString::from("2024-01-01")),
            Err(std::io::Error::other("stale file handle")),
            Ok(OsString::from("2024-01-02")),
        ];
        assert!(catalog_from_names(names).is_err());

        let names = vec![Ok(OsString::from("2024-01-02")), Ok(OsString::from("tmp"))];
        assert_eq!(catalog_from_names(names).unwrap(), catalog(&["2024-01-02"]));
    }

    #[test]
    fn test_list_missing_root_fails() {
        let root = TempDir::new().unwrap();
        let catalog = SnapshotCatalog::new(
            root.path().join("missing"),
            Arc::new(FakeRunner::silent()).tools(),
        );
        assert!(matches!(catalog.list(), Err(Error::WithFnName { .. })));
    }

    #[test]
    fn test_remove_is_privileged_recursive_delete() {
        let runner = Arc::new(FakeRunner::silent());
        let catalog = SnapshotCatalog::new("/mnt/backup/snapshots", runner.tools());
        catalog.remove(&snapshot("2024-01-01")).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program_name(), "rm");
        assert!(calls[0].needs_root());
        assert_eq!(
            calls[0].args_lossy(),
            vec!["-Rf", "/mnt/backup/snapshots/2024-01-01"]
        );
    }

    #[test]
    fn test_remove_failure_propagates() {
        let runner = Arc::new(FakeRunner::new(|c| {
            Err(Error::command_failed(c.to_string(), "exit status: 1"))
        }));
        let catalog = SnapshotCatalog::new("/mnt/backup/snapshots", runner.tools());
        assert!(catalog.remove(&snapshot("2024-01-01")).is_err());
    }

    proptest! {
        #[test]
        fn test_name_order_is_date_order(
            days in proptest::collection::vec(0i64..60_000, 1..20)
        ) {
            let epoch = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap();
            let dates: Vec<NaiveDate> = days
                .iter()
                .map(|d| epoch + chrono::Duration::days(*d))
                .collect();
            let by_name: Vec<NaiveDate> = dates
                .iter()
                .map(|d| Snapshot::for_date(*d))
                .sorted()
                .map(|s| NaiveDate::parse_from_str(&s.to_string(), SNAPSHOT_DATE_FORMAT).unwrap())
                .collect();
            let by_date: Vec<NaiveDate> = dates.iter().copied().sorted().collect();
            prop_assert_eq!(by_name, by_date);
        }
    }
}
