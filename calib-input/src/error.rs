use npzs::NpzError;
use std::{
    error::Error,
    fmt, io,
    path::{Path, PathBuf},
};

/// The calibration array could not be loaded. There is no fallback source.
#[derive(Debug)]
pub enum StorageAccessError {
    Io { path: PathBuf, source: io::Error },
    Archive { path: PathBuf, source: NpzError },
    MissingKey { path: PathBuf, key: String },
    Scalar { path: PathBuf, key: String },
}

impl fmt::Display for StorageAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Archive { path, source } => {
                write!(f, "cannot decode {}: {source}", path.display())
            }
            Self::MissingKey { path, key } => {
                write!(f, "array \"{key}\" not found in {}", path.display())
            }
            Self::Scalar { path, key } => {
                write!(f, "array \"{key}\" in {} is 0-d", path.display())
            }
        }
    }
}

impl Error for StorageAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Archive { source, .. } => Some(source),
            Self::MissingKey { .. } | Self::Scalar { .. } => None,
        }
    }
}

impl StorageAccessError {
    /// The archive this error is about.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::Archive { path, .. }
            | Self::MissingKey { path, .. }
            | Self::Scalar { path, .. } => path,
        }
    }
}
