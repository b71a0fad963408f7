use crate::backup::backup_config::BackupConfig;
use crate::backup::command::Tools;
use crate::backup::local::LocalBackup;
use crate::backup::remote::RemoteBackup;
use crate::backup::report::Reporter;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use clap::ValueEnum;
use derive_more::Display;
use std::fmt::Write;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    #[display("local")]
    Local,
    #[display("remote")]
    Remote,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, ValueEnum)]
pub enum Operation {
    #[display("mount")]
    Mount,
    #[display("backup")]
    Backup,
    #[display("umount")]
    Umount,
}

/// The three operations every profile offers. Each one is a separate
/// invocation, so implementations must not rely on state from an earlier one.
pub trait BackupProfile {
    fn mount(&mut self) -> Result<()>;
    fn backup(&mut self) -> Result<()>;
    fn umount(&mut self) -> Result<()>;

    fn execute(&mut self, operation: Operation) -> Result<()> {
        match operation {
            Operation::Mount => self.mount(),
            Operation::Backup => self.backup(),
            Operation::Umount => self.umount(),
        }
    }
}

type Constructor = fn(&BackupConfig, Tools) -> Result<Box<dyn BackupProfile>>;

fn local(config: &BackupConfig, tools: Tools) -> Result<Box<dyn BackupProfile>> {
    let local = config
        .local()
        .clone()
        .ok_or_else(|| Error::profile_not_configured(Profile::Local.to_string()))?;
    Ok(Box::new(LocalBackup::new(local, tools)))
}

fn remote(config: &BackupConfig, tools: Tools) -> Result<Box<dyn BackupProfile>> {
    let remote = config
        .remote()
        .clone()
        .ok_or_else(|| Error::profile_not_configured(Profile::Remote.to_string()))?;
    Ok(Box::new(RemoteBackup::new(remote, tools)))
}

impl Profile {
    fn constructor(self) -> Constructor {
        match self {
            Profile::Local => local,
            Profile::Remote => remote,
        }
    }

    /// Fails with `ProfileNotConfigured` when the config file has no section
    /// for this profile.
    pub fn build(self, config: &BackupConfig, tools: Tools) -> Result<Box<dyn BackupProfile>> {
        tracing::debug!("Building profile {self}");
        (self.constructor())(config, tools)
    }
}

impl Operation {
    pub fn description(self, profile: Profile) -> &'static str {
        match (profile, self) {
            (Profile::Local, Operation::Mount) => "Open and mount the encrypted backup volume",
            (Profile::Local, Operation::Backup) => {
                "Write today's snapshot, evicting old ones when space runs out"
            }
            (Profile::Local, Operation::Umount) => "Unmount and close the encrypted backup volume",
            (Profile::Remote, Operation::Mount) => {
                "Mount the encrypted volume and attach the encfs directory"
            }
            (Profile::Remote, Operation::Backup) => {
                "Mirror into the encfs directory and upload the ciphertext"
            }
            (Profile::Remote, Operation::Umount) => {
                "Detach the encfs directory and close the encrypted volume"
            }
        }
    }
}

/// Lists every valid invocation with what it does.
pub fn usage(program: &str, reporter: &Reporter) -> String {
    let mut text = reporter.banner_line(format!(
        "{} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));
    text.push_str("\n\nUsage:\n");
    for profile in Profile::value_variants() {
        for operation in Operation::value_variants() {
            let _ = writeln!(
                text,
                "\t{program} {profile} {operation}\t{}",
                operation.description(*profile)
            );
        }
    }
    text
}
