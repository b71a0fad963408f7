use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};
use crate::backup::validate::{
    validate_absolute_path, validate_absolute_paths, validate_mapper_name, validate_relative_path,
};
use bon::Builder;
use function_name::named;
use getset::Getters;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fs::File;
use std::path::{Path, PathBuf};
use validator::Validate;

pub static DEFAULT_CONFIG_PATH: &str = "/etc/crypt-snapshot.yml";
static MAPPER_PREFIX: &str = "/dev/mapper";

/// Whole configuration file. Each profile has its own optional section.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct BackupConfig {
    /// Prefix privileged commands with `tools.sudo`.
    #[serde(default = "default_use_sudo")]
    #[builder(default = default_use_sudo())]
    use_sudo: bool,
    #[serde(default)]
    #[builder(default)]
    tools: ToolPaths,
    #[validate(nested)]
    local: Option<LocalConfig>,
    #[validate(nested)]
    remote: Option<RemoteConfig>,
}

fn default_use_sudo() -> bool {
    true
}

impl BackupConfig {
    #[named]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        File::open(path)
            .map_err(Error::from)
            .add_msg(format!("Open config failed: {:?}", path))
            .and_then(|f| {
                serde_yml::from_reader::<_, BackupConfig>(f)
                    .map_err(Error::from)
                    .add_msg(format!("Parse YAML config failed: {:?}", path))
            })
            .and_then(|bc| {
                bc.validate()
                    .map_err(Error::from)
                    .map(|_| bc)
                    .add_msg(format!("Config validation failed: {:?}", path))
            })
            .add_fn_name(function_path!())
    }
}

/// The encrypted block device and where its plaintext filesystem goes.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct VolumeConfig {
    #[builder(into)]
    raw_device: PathBuf,
    #[validate(custom(function = validate_mapper_name))]
    #[builder(into)]
    mapper_name: String,
    #[validate(custom(function = validate_absolute_path))]
    #[builder(into)]
    mount_point: PathBuf,
}

impl VolumeConfig {
    pub fn mapper_device(&self) -> PathBuf {
        Path::new(MAPPER_PREFIX).join(&self.mapper_name)
    }
}

#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct LocalConfig {
    #[validate(nested)]
    volume: VolumeConfig,
    /// Directory holding the snapshots, relative to the mount point.
    #[validate(custom(function = validate_relative_path))]
    #[builder(into)]
    backup_dir: PathBuf,
    /// Retention floor: eviction never leaves fewer snapshots than this.
    #[serde(default = "default_keep")]
    #[builder(default = default_keep())]
    #[validate(range(min = 1))]
    keep: usize,
    /// Extra fstab-managed mount point needed by the sources, e.g. `/boot`.
    #[validate(custom(function = validate_absolute_path))]
    #[builder(into)]
    secondary_mount: Option<PathBuf>,
    #[validate(length(min = 1), custom(function = validate_absolute_paths))]
    #[builder(into)]
    sources: Vec<PathBuf>,
    #[serde(default)]
    #[builder(default, into)]
    excludes: Vec<String>,
}

fn default_keep() -> usize {
    2
}

impl LocalConfig {
    pub fn backup_root(&self) -> PathBuf {
        self.volume.mount_point.join(&self.backup_dir)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct RemoteConfig {
    #[validate(nested)]
    volume: VolumeConfig,
    /// Ciphertext side of the encfs, relative to the mount point.
    #[validate(custom(function = validate_relative_path))]
    #[builder(into)]
    encfs_source: PathBuf,
    /// Plaintext side of the encfs, relative to the mount point.
    #[validate(custom(function = validate_relative_path))]
    #[builder(into)]
    encfs_target: PathBuf,
    #[validate(length(min = 1), custom(function = validate_absolute_paths))]
    #[builder(into)]
    sources: Vec<PathBuf>,
    #[serde(default)]
    #[builder(default, into)]
    excludes: Vec<String>,
    #[validate(nested)]
    upload: UploadConfig,
}

impl RemoteConfig {
    pub fn encfs_source_path(&self) -> PathBuf {
        self.volume.mount_point.join(&self.encfs_source)
    }

    pub fn encfs_target_path(&self) -> PathBuf {
        self.volume.mount_point.join(&self.encfs_target)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct UploadConfig {
    #[validate(length(min = 1))]
    #[builder(into)]
    user: String,
    #[validate(length(min = 1))]
    #[builder(into)]
    host: String,
    #[serde(default = "default_ssh_port")]
    #[builder(default = default_ssh_port())]
    port: u16,
    #[validate(length(min = 1))]
    #[builder(into)]
    destination: String,
}

fn default_ssh_port() -> u16 {
    22
}

/// Locations of the external tools.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolPaths {
    pub sudo: PathBuf,
    pub cryptsetup: PathBuf,
    pub mount: PathBuf,
    pub umount: PathBuf,
    pub df: PathBuf,
    pub du: PathBuf,
    pub rm: PathBuf,
    pub mkdir: PathBuf,
    pub chmod: PathBuf,
    pub rsync: PathBuf,
    pub encfs: PathBuf,
    pub fusermount: PathBuf,
    pub ssh: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            sudo: "/usr/bin/sudo".into(),
            cryptsetup: "/sbin/cryptsetup".into(),
            mount: "/bin/mount".into(),
            umount: "/bin/umount".into(),
            df: "/bin/df".into(),
            du: "/usr/bin/du".into(),
            rm: "/bin/rm".into(),
            mkdir: "/bin/mkdir".into(),
            chmod: "/bin/chmod".into(),
            rsync: "/usr/bin/rsync".into(),
            encfs: "/usr/bin/encfs".into(),
            fusermount: "/usr/bin/fusermount".into(),
            ssh: "/usr/bin/ssh".into(),
        }
    }
}
