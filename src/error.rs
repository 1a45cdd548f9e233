use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Subkinds of [`BatchError::InvalidArgument`].
///
/// `Null` and `Empty` are kept apart so that a caller can tell a value that was
/// never supplied from one that was supplied but blank.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("`{0}` must be provided")]
    Null(&'static str),

    #[error("`{0}` must not be empty")]
    Empty(&'static str),

    #[error("`{name}` has unsupported value `{value}`")]
    Unsupported { name: &'static str, value: String },
}

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ArgumentError),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Access denied: {}", .0.display())]
    AccessDenied(PathBuf),

    #[error("File is locked by another handle: {}", .0.display())]
    IoBusy(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("ItemWriter from: {0}")]
    ItemWriter(String),
}

impl BatchError {
    /// Classifies an OS error raised while working on `path`.
    pub(crate) fn from_io(error: io::Error, path: &Path) -> Self {
        if is_lock_violation(&error) {
            return BatchError::IoBusy(path.to_path_buf());
        }

        match error.kind() {
            ErrorKind::NotFound | ErrorKind::NotADirectory => {
                BatchError::NotFound(path.to_path_buf())
            }
            ErrorKind::PermissionDenied
            | ErrorKind::IsADirectory
            | ErrorKind::ReadOnlyFilesystem => BatchError::AccessDenied(path.to_path_buf()),
            ErrorKind::ResourceBusy => BatchError::IoBusy(path.to_path_buf()),
            _ => BatchError::Io(error),
        }
    }
}

#[cfg(windows)]
fn is_lock_violation(error: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
    matches!(error.raw_os_error(), Some(32) | Some(33))
}

#[cfg(not(windows))]
fn is_lock_violation(_error: &io::Error) -> bool {
    false
}

/// Rejects an empty path. Absent paths are caught by the builders.
pub(crate) fn check_path(path: &Path) -> Result<(), BatchError> {
    if path.as_os_str().is_empty() {
        return Err(ArgumentError::Empty("path").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_classified_by_kind() {
        let path = Path::new("data/lines.txt");

        let error = BatchError::from_io(io::Error::from(ErrorKind::NotFound), path);
        assert!(matches!(error, BatchError::NotFound(p) if p == path));

        let error = BatchError::from_io(io::Error::from(ErrorKind::PermissionDenied), path);
        assert!(matches!(error, BatchError::AccessDenied(_)));

        let error = BatchError::from_io(io::Error::from(ErrorKind::ResourceBusy), path);
        assert!(matches!(error, BatchError::IoBusy(_)));

        let error = BatchError::from_io(io::Error::from(ErrorKind::UnexpectedEof), path);
        assert!(matches!(error, BatchError::Io(_)));
    }

    #[test]
    fn empty_path_is_rejected() {
        let error = check_path(Path::new("")).unwrap_err();
        assert!(matches!(
            error,
            BatchError::InvalidArgument(ArgumentError::Empty("path"))
        ));
        assert!(check_path(Path::new("a.txt")).is_ok());
    }

    #[test]
    fn messages_name_the_argument() {
        let error: BatchError = ArgumentError::Null("path").into();
        assert_eq!(error.to_string(), "Invalid argument: `path` must be provided");

        let error = BatchError::NotFound(PathBuf::from("missing.txt"));
        assert_eq!(error.to_string(), "File not found: missing.txt");
    }
}
