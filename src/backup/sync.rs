use crate::backup::command::{SystemCommand, Tools};
use crate::backup::function_path;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};
use crate::backup::snapshot::Snapshot;
use function_name::named;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// How sources land in the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    /// Whole-system snapshot, run as root: full source paths are kept under
    /// the destination (`-R`), mount boundaries are not crossed (`-x`), and
    /// the destination is created owner-only beforehand.
    Snapshot,
    /// Plain mirror into an existing directory as the invoking user.
    Mirror,
}

pub struct SyncExecutor {
    mode: SyncMode,
    tools: Tools,
}

/// `dest/`, so rsync fills the directory instead of nesting it.
pub fn with_trailing_slash(path: &Path) -> OsString {
    let mut path = path.as_os_str().to_owned();
    if !path.to_string_lossy().ends_with('/') {
        path.push("/");
    }
    path
}

impl SyncExecutor {
    pub fn new(mode: SyncMode, tools: Tools) -> Self {
        Self { mode, tools }
    }

    #[named]
    fn prepare_destination(&self, destination: &Path) -> Result<()> {
        let paths = &self.tools.paths;
        let destination = with_trailing_slash(destination);
        self.tools
            .runner
            .run(
                &SystemCommand::privileged(&paths.mkdir)
                    .arg("-p")
                    .arg(&destination),
            )
            .and_then(|_| {
                self.tools.runner.run(
                    &SystemCommand::privileged(&paths.chmod)
                        .arg("700")
                        .arg(&destination),
                )
            })
            .add_fn_name(function_path!())
    }

    pub fn command(
        &self,
        sources: &[PathBuf],
        excludes: &[String],
        destination: &Path,
        link_target: Option<&Snapshot>,
    ) -> SystemCommand {
        let rsync = &self.tools.paths.rsync;
        let command = match self.mode {
            SyncMode::Snapshot => SystemCommand::privileged(rsync).arg("-aRx"),
            SyncMode::Mirror => SystemCommand::new(rsync).arg("-a"),
        };

        command
            .args(["--delete-before", "--delete-excluded", "--progress"])
            .args(excludes.iter().map(|e| format!("--exclude={e}")))
            .args(link_target.map(|t| format!("--link-dest=../{t}")))
            .args(sources)
            .arg(with_trailing_slash(destination))
    }

    /// Copies `sources` into `destination`. With a link target, files
    /// unchanged since that sibling snapshot become hardlinks to it.
    #[named]
    pub fn run(
        &self,
        sources: &[PathBuf],
        excludes: &[String],
        destination: &Path,
        link_target: Option<&Snapshot>,
    ) -> Result<()> {
        if self.mode == SyncMode::Snapshot {
            self.prepare_destination(destination)?;
        }

        match link_target {
            Some(target) => tracing::info!("Syncing into {:?}, linking to {target}", destination),
            None => tracing::info!("Syncing into {:?}", destination),
        }
        self.tools
            .runner
            .run(&self.command(sources, excludes, destination, link_target))
            .add_msg(format!("Synchronizing into {:?} failed", destination))
            .add_fn_name(function_path!())
    }
}
