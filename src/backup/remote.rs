//! Offsite copy of selected directories.
//!
//! The sources are mirrored into the plaintext side of an encfs living on the
//! encrypted volume, then the ciphertext side is pushed to a remote host over
//! ssh. Only encrypted bytes leave the machine.

use crate::backup::backup_config::RemoteConfig;
use crate::backup::command::{SystemCommand, Tools};
use crate::backup::function_path;
use crate::backup::profile::BackupProfile;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};
use crate::backup::sync::{SyncExecutor, SyncMode};
use crate::backup::volume::EncryptedVolume;
use function_name::named;

pub struct RemoteBackup {
    config: RemoteConfig,
    tools: Tools,
    volume: EncryptedVolume,
    sync: SyncExecutor,
}

impl RemoteBackup {
    pub fn new(config: RemoteConfig, tools: Tools) -> Self {
        Self {
            volume: EncryptedVolume::new(config.volume().clone(), tools.clone()),
            sync: SyncExecutor::new(SyncMode::Mirror, tools.clone()),
            config,
            tools,
        }
    }

    pub fn volume(&self) -> &EncryptedVolume {
        &self.volume
    }

    pub fn upload_command(&self) -> SystemCommand {
        let upload = self.config.upload();
        SystemCommand::new(&self.tools.paths.rsync)
            .args(["--delete-before", "-a", "--progress", "-e"])
            .arg(format!(
                "{} -p {}",
                self.tools.paths.ssh.display(),
                upload.port()
            ))
            .arg(self.config.encfs_source_path())
            .arg(format!(
                "{}@{}:{}",
                upload.user(),
                upload.host(),
                upload.destination()
            ))
    }

    #[named]
    fn upload(&self) -> Result<()> {
        let upload = self.config.upload();
        self.tools
            .reporter
            .status(format!("Uploading to {}...", upload.host()));
        self.tools
            .runner
            .run(&self.upload_command())
            .add_msg(format!("Upload to {} failed", upload.host()))
            .add_fn_name(function_path!())
    }
}

impl BackupProfile for RemoteBackup {
    #[named]
    fn mount(&mut self) -> Result<()> {
        self.volume.mount()?;
        let command = SystemCommand::new(&self.tools.paths.encfs)
            .arg(self.config.encfs_source_path())
            .arg(self.config.encfs_target_path());
        self.tools
            .runner
            .run(&command)
            .add_fn_name(function_path!())
    }

    #[named]
    fn backup(&mut self) -> Result<()> {
        self.sync
            .run(
                self.config.sources(),
                self.config.excludes(),
                &self.config.encfs_target_path(),
                None,
            )
            .add_fn_name(function_path!())?;
        self.upload()
    }

    fn umount(&mut self) -> Result<()> {
        let command = SystemCommand::new(&self.tools.paths.fusermount)
            .arg("-u")
            .arg(self.config.encfs_target_path());
        let encfs = self.tools.runner.run(&command);
        match (encfs, self.volume.unmount()) {
            (Ok(_), Ok(_)) => Ok(()),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(e1), Err(e2)) => Err(e1.chain(e2)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::backup_config::tests::volume;
    use crate::backup::backup_config::UploadConfig;
    use crate::backup::command::fake::FakeRunner;
    use crate::backup::result_error::error::Error;
    use crate::backup::volume::VolumeState;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn remote(runner: &Arc<FakeRunner>) -> RemoteBackup {
        let config = RemoteConfig::builder()
            .volume(volume())
            .encfs_source(".encfs-remote")
            .encfs_target("remote")
            .sources(vec![PathBuf::from("/home/user/Documents")])
            .excludes(vec!["*.iso".to_owned()])
            .upload(
                UploadConfig::builder()
                    .user("someone")
                    .host("sftp.example.com")
                    .port(2222)
                    .destination("/users/someone/backup/")
                    .build(),
            )
            .build();
        RemoteBackup::new(config, runner.tools())
    }

    #[test]
    fn test_mount_attaches_encfs_after_volume() {
        let runner = Arc::new(FakeRunner::silent());
        let mut remote = remote(&runner);
        remote.mount().unwrap();

        assert_eq!(remote.volume().state(), VolumeState::Mounted);
        let calls = runner.calls();
        let encfs = calls.last().unwrap();
        assert_eq!(encfs.program_name(), "encfs");
        assert!(!encfs.needs_root());
        assert_eq!(
            encfs.args_lossy(),
            vec!["/mnt/backup/.encfs-remote", "/mnt/backup/remote"]
        );
    }

    #[test]
    fn test_backup_mirrors_then_uploads() {
        let runner = Arc::new(FakeRunner::silent());
        let mut remote = remote(&runner);
        remote.backup().unwrap();

        let calls = runner.calls_to("rsync");
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].args_lossy(),
            vec![
                "-a",
                "--delete-before",
                "--delete-excluded",
                "--progress",
                "--exclude=*.iso",
                "/home/user/Documents",
                "/mnt/backup/remote/"
            ]
        );
        assert_eq!(
            calls[1].args_lossy(),
            vec![
                "--delete-before",
                "-a",
                "--progress",
                "-e",
                "/usr/bin/ssh -p 2222",
                "/mnt/backup/.encfs-remote",
                "someone@sftp.example.com:/users/someone/backup/"
            ]
        );
        assert!(calls.iter().all(|c| !c.needs_root()));
    }

    #[test]
    fn test_failed_mirror_skips_upload() {
        let runner = Arc::new(FakeRunner::new(|c| {
            Err(Error::command_failed(c.to_string(), "exit status: 23"))
        }));
        let mut remote = remote(&runner);
        assert!(remote.backup().is_err());
        assert_eq!(runner.calls_to("rsync").len(), 1);
    }

    #[test]
    fn test_umount_detaches_encfs_then_volume() {
        let runner = Arc::new(FakeRunner::silent());
        let mut remote = remote(&runner);
        remote.umount().unwrap();

        assert_eq!(runner.programs(), vec!["fusermount", "umount", "cryptsetup"]);
        assert_eq!(
            runner.calls()[0].args_lossy(),
            vec!["-u", "/mnt/backup/remote"]
        );
    }

    #[test]
    fn test_umount_continues_when_encfs_detach_fails() {
        let runner = Arc::new(FakeRunner::new(|c| match c.program_name().as_str() {
            "fusermount" => Err(Error::command_failed(c.to_string(), "exit status: 1")),
            _ => Ok(String::new()),
        }));
        let mut remote = remote(&runner);
        assert!(remote.umount().is_err());
        assert_eq!(remote.volume().state(), VolumeState::Closed);
    }
}
