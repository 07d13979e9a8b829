use std::{num::NonZero, path::PathBuf};

pub const DEFAULT_PATH: &str = "calib_data.npz";
pub const DEFAULT_KEY: &str = "data";
pub const DEFAULT_INPUT_NAME: &str = "input_1";
pub const BATCH_SIZE: NonZero<usize> = match NonZero::new(128) {
    Some(n) => n,
    None => unreachable!(),
};

/// Where the calibration array lives and how it is served.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CalibConfig {
    /// Archive to load.
    pub path: PathBuf,
    /// Array inside the archive, `.npy` suffix optional.
    pub key: String,
    /// Key of the single entry in every batch mapping.
    pub input_name: String,
    /// Rows per batch.
    pub batch_size: NonZero<usize>,
}

impl Default for CalibConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_PATH.into(),
            key: DEFAULT_KEY.into(),
            input_name: DEFAULT_INPUT_NAME.into(),
            batch_size: BATCH_SIZE,
        }
    }
}

impl CalibConfig {
    #[inline]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

#[test]
fn test_default() {
    let config = CalibConfig::default();
    assert_eq!(config.path, PathBuf::from("calib_data.npz"));
    assert_eq!(config.key, "data");
    assert_eq!(config.input_name, "input_1");
    assert_eq!(config.batch_size.get(), 128);

    let config = CalibConfig::with_path("/tmp/other.npz");
    assert_eq!(config.path, PathBuf::from("/tmp/other.npz"));
    assert_eq!(config.batch_size, BATCH_SIZE);
}
