use crate::backup::result_error::{AddFunctionName, AddMsg};
use itertools::Itertools;
use std::fmt::Debug;
use thiserror::Error;
use thiserror_ext::Construct;

pub const EXIT_USAGE: i32 = 2;
pub const EXIT_PARSE: i32 = 3;
pub const EXIT_NO_SPACE_LEFT: i32 = 4;
pub const EXIT_COMMAND_FAILED: i32 = 5;
pub const EXIT_CONFIG: i32 = 6;
pub const EXIT_IO: i32 = 7;
pub const EXIT_INVALID_SNAPSHOT: i32 = 8;

#[derive(Error, Debug, Construct)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[error(transparent)]
    SerdeYml(#[from] serde_yml::Error),
    #[error("Parse error: failed to parse output of {tool}: {detail}")]
    ParseError { tool: String, detail: String },
    #[error("No space left on {device}: {required} bytes required, {free} bytes free")]
    NoSpaceLeft {
        device: String,
        required: u64,
        free: u64,
    },
    #[error("Command `{command}` failed with {status}")]
    CommandFailed { command: String, status: String },
    #[error("Invalid snapshot name {0:?}, expected YYYY-MM-DD")]
    InvalidSnapshotName(String),
    #[error("Profile {0:?} has no section in the configuration file")]
    ProfileNotConfigured(String),
    #[error("{}:\n{}", msg, indent::indent_all_with("  ", error.to_string()))]
    WithMsg { msg: String, error: Box<Error> },
    #[error("{} failed:\n{}", fn_name, indent::indent_all_with("  ", error.to_string()))]
    WithFnName { fn_name: String, error: Box<Error> },
    #[error("{}", itertools::join(.0, "\n\n"))]
    LotsOfError(Vec<Error>),
}

impl<S: Into<String>> AddMsg<S> for Error {
    fn add_msg(self, msg: S) -> Self {
        Self::WithMsg {
            msg: msg.into(),
            error: Box::new(self),
        }
    }
}

impl<S: Into<String>> AddFunctionName<S> for Error {
    fn add_fn_name(self, fn_name: S) -> Self {
        Self::WithFnName {
            fn_name: fn_name.into(),
            error: Box::new(self),
        }
    }
}

impl Error {
    pub fn into_iter(self) -> Box<dyn Iterator<Item = Error>> {
        match self {
            Error::LotsOfError(v) => Box::new(v.into_iter().flat_map(|e| e.into_iter())),
            e => Box::new(std::iter::once(e)),
        }
    }

    pub fn chain(self, other: Error) -> Error {
        Error::LotsOfError(self.into_iter().chain(other.into_iter()).collect_vec())
    }

    /// Process exit code for this failure; context wrappers report the code
    /// of the error they wrap, aggregates the code of their first member.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Io(_) => EXIT_IO,
            Error::ValidationError(_) | Error::SerdeYml(_) | Error::ProfileNotConfigured(_) => {
                EXIT_CONFIG
            }
            Error::ParseError { .. } => EXIT_PARSE,
            Error::NoSpaceLeft { .. } => EXIT_NO_SPACE_LEFT,
            Error::CommandFailed { .. } => EXIT_COMMAND_FAILED,
            Error::InvalidSnapshotName(_) => EXIT_INVALID_SNAPSHOT,
            Error::WithMsg { error, .. } | Error::WithFnName { error, .. } => error.exit_code(),
            Error::LotsOfError(errors) => errors.first().map_or(EXIT_IO, Error::exit_code),
        }
    }
}
