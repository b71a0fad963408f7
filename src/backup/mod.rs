pub mod backup_config;
pub mod command;
pub mod estimate;
pub mod local;
pub mod profile;
pub mod remote;
pub mod report;
pub mod result_error;
pub mod retention;
pub mod snapshot;
pub mod sync;
pub mod tool_output;
pub mod validate;
pub mod volume;

macro_rules! function_path {
    () => {
        concat!(module_path!(), "::", function_name!(), " ", file!(), ":", line!())
    };
}

pub(crate) use function_path;
