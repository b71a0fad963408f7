//! Lifecycle of the encrypted block device.
//!
//! ```text
//! Closed --open--> MappedUnmounted --mount--> Mounted
//!                                   \--(found ro)--> MountedReadOnly --remount rw--> Mounted
//! Mounted --unmount--> MappedUnmounted --close--> Closed
//! ```

use crate::backup::backup_config::VolumeConfig;
use crate::backup::command::{SystemCommand, Tools};
use crate::backup::function_path;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddFunctionName;
use crate::backup::tool_output::df::{parse_free_bytes, DF_ARGS};
use crate::backup::tool_output::mount::{parse_mount_status, MountStatus};
use function_name::named;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeState {
    Closed,
    MappedUnmounted,
    Mounted,
    MountedReadOnly,
}

pub struct EncryptedVolume {
    config: VolumeConfig,
    tools: Tools,
    state: VolumeState,
}

impl EncryptedVolume {
    pub fn new(config: VolumeConfig, tools: Tools) -> Self {
        Self {
            config,
            tools,
            state: VolumeState::Closed,
        }
    }

    pub fn state(&self) -> VolumeState {
        self.state
    }

    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    /// Maps the raw device. A mapping left behind by an earlier run is reused.
    #[named]
    pub fn open(&mut self) -> Result<()> {
        if self.state != VolumeState::Closed {
            return Ok(());
        }

        let mapper_device = self.config.mapper_device();
        if mapper_device.exists() {
            tracing::info!("{:?} is already mapped", mapper_device);
        } else {
            let command = SystemCommand::privileged(&self.tools.paths.cryptsetup)
                .arg("luksOpen")
                .arg(self.config.raw_device())
                .arg(self.config.mapper_name());
            self.tools
                .runner
                .run(&command)
                .add_fn_name(function_path!())?;
        }
        self.state = VolumeState::MappedUnmounted;
        Ok(())
    }

    /// Opens the mapping if needed and mounts it read-write on the mount point.
    ///
    /// Calling it again while mounted does nothing.
    #[named]
    pub fn mount(&mut self) -> Result<()> {
        if self.state == VolumeState::Mounted {
            return Ok(());
        }
        self.open()?;

        let mapper_device = self.config.mapper_device();
        match self.mount_status()? {
            MountStatus::NotMounted => {
                let command = SystemCommand::privileged(&self.tools.paths.mount)
                    .arg(&mapper_device)
                    .arg(self.config.mount_point());
                self.tools
                    .runner
                    .run(&command)
                    .add_fn_name(function_path!())?;
                self.state = VolumeState::Mounted;
            }
            MountStatus::MountedReadWrite => {
                self.tools.reporter.status(format!(
                    "{} is already mounted on {}",
                    mapper_device.display(),
                    self.config.mount_point().display()
                ));
                self.state = VolumeState::Mounted;
            }
            MountStatus::MountedReadOnly => {
                self.state = VolumeState::MountedReadOnly;
                tracing::warn!("Device {:?} is mounted read/only", mapper_device);
                self.remount_read_write()?;
            }
        }
        Ok(())
    }

    #[named]
    pub fn remount_read_write(&mut self) -> Result<()> {
        self.tools.reporter.status("Remounting read/write...");
        let command = SystemCommand::privileged(&self.tools.paths.mount)
            .args(["-o", "remount,rw"])
            .arg(self.config.mapper_device());
        self.tools
            .runner
            .run(&command)
            .add_fn_name(function_path!())?;
        self.state = VolumeState::Mounted;
        Ok(())
    }

    #[named]
    pub fn mount_status(&self) -> Result<MountStatus> {
        let output = self
            .tools
            .runner
            .output(&SystemCommand::new(&self.tools.paths.mount))
            .add_fn_name(function_path!())?;
        Ok(parse_mount_status(
            &self.config.mapper_device().to_string_lossy(),
            &self.config.mount_point().to_string_lossy(),
            &output,
        ))
    }

    /// Free bytes on the mapped device.
    pub fn free_space(&self) -> Result<u64> {
        self.check_free_space(&self.config.mapper_device())
    }

    #[named]
    pub fn check_free_space(&self, device: &Path) -> Result<u64> {
        let df = &self.tools.paths.df;
        let output = self
            .tools
            .runner
            .output(&SystemCommand::new(df).args(DF_ARGS).arg(device))
            .add_fn_name(function_path!())?;
        parse_free_bytes(&df.to_string_lossy(), &device.to_string_lossy(), &output)
            .add_fn_name(function_path!())
    }

    pub fn unmount_filesystem(&mut self) -> Result<()> {
        let command =
            SystemCommand::privileged(&self.tools.paths.umount).arg(self.config.mount_point());
        self.tools.runner.run(&command)?;
        self.state = VolumeState::MappedUnmounted;
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        let command = SystemCommand::privileged(&self.tools.paths.cryptsetup)
            .arg("luksClose")
            .arg(self.config.mapper_name());
        self.tools.runner.run(&command)?;
        self.state = VolumeState::Closed;
        Ok(())
    }

    /// Unmounts the filesystem and closes the mapping. The close is attempted
    /// even when the unmount fails; every failure is reported.
    #[named]
    pub fn unmount(&mut self) -> Result<()> {
        let unmounted = self.unmount_filesystem();
        if let Err(e) = &unmounted {
            tracing::warn!("Unmounting {:?} failed: {e}", self.config.mount_point());
        }
        let closed = self.close();

        let result = match (unmounted, closed) {
            (Ok(_), Ok(_)) => Ok(()),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(e1), Err(e2)) => Err(e1.chain(e2)),
        };
        result.add_fn_name(function_path!())
    }
}
