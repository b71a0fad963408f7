//! Validation functions for configuration values.

use sanitize_filename::{is_sanitized, sanitize};
use validator::ValidationError;

use std::path::{Component, Path, PathBuf};

pub fn validate_mapper_name<S: AsRef<str>>(name: S) -> Result<(), ValidationError> {
    let name = name.as_ref();
    if name.is_empty() || !is_sanitized(name) {
        return Err(ValidationError::new("InvalidMapperName").with_message(
            format!(
                "Invalid device mapper name {:?}, try sanitizing like {:?}",
                name,
                sanitize(name)
            )
            .into(),
        ));
    }

    Ok(())
}

pub fn validate_absolute_path<P: AsRef<Path>>(path: P) -> Result<(), ValidationError> {
    let path = path.as_ref();
    if !path.is_absolute() {
        return Err(ValidationError::new("RelativePath")
            .with_message(format!("{:?} must be an absolute path", path).into()));
    }

    Ok(())
}

pub fn validate_absolute_paths(paths: &[PathBuf]) -> Result<(), ValidationError> {
    paths.iter().try_for_each(|p| validate_absolute_path(p))
}

pub fn validate_relative_path<P: AsRef<Path>>(path: P) -> Result<(), ValidationError> {
    let path = path.as_ref();
    if path.is_absolute() {
        return Err(ValidationError::new("AbsolutePath").with_message(
            format!("{:?} must be relative to the volume mount point", path).into(),
        ));
    }
    if path.components().any(|c| c == Component::ParentDir) {
        return Err(ValidationError::new("ParentDir").with_message(
            format!("{:?} must stay inside the volume mount point", path).into(),
        ));
    }

    Ok(())
}
