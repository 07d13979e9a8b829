use crate::{CalibConfig, StorageAccessError};
use indexmap::IndexMap;
use log::{debug, info};
use memmap2::Mmap;
use npzs::{NpyDType, NpyView, NpzArchive};
use std::{
    borrow::Cow,
    fmt,
    fs::File,
    num::NonZero,
    ops::Range,
    path::{Path, PathBuf},
    time::Instant,
};

/// Single-entry mapping from the input name to one batch.
pub type NamedBatch<'a> = IndexMap<&'a str, NpyView<'a>>;

/// A calibration array loaded once and served in fixed-size batches.
///
/// The caller owns this value and decides which batches to ask for and when to stop.
/// Batches borrow from it, so they cannot outlive the loaded data.
pub struct CalibData {
    path: PathBuf,
    input_name: String,
    batch_size: NonZero<usize>,
    dtype: NpyDType,
    shape: Vec<usize>,
    storage: Storage,
}

enum Storage {
    /// C-ordered stored member, read in place.
    Mapped { map: Mmap, range: Range<usize> },
    /// Inflated or reordered copy.
    Owned(Box<[u8]>),
}

impl Storage {
    #[inline]
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Mapped { map, range } => &map[range.clone()],
            Self::Owned(data) => data,
        }
    }
}

impl CalibData {
    /// Loads `data` from `calib_data.npz` in the working directory, 128 rows per batch.
    #[inline]
    pub fn open() -> Result<Self, StorageAccessError> {
        Self::load(&CalibConfig::default())
    }

    pub fn load(config: &CalibConfig) -> Result<Self, StorageAccessError> {
        enum Payload {
            Mapped(Range<usize>),
            Owned(Box<[u8]>),
        }

        let time = Instant::now();
        let CalibConfig {
            path,
            key,
            input_name,
            batch_size,
        } = config;

        let io = |source| StorageAccessError::Io {
            path: path.clone(),
            source,
        };
        let archive = |source| StorageAccessError::Archive {
            path: path.clone(),
            source,
        };

        let file = File::open(path).map_err(io)?;
        let map = unsafe { Mmap::map(&file) }.map_err(io)?;

        let (dtype, shape, payload) = {
            let npz = NpzArchive::new(&map).map_err(archive)?;
            let array = npz
                .array(key)
                .map_err(archive)?
                .ok_or_else(|| StorageAccessError::MissingKey {
                    path: path.clone(),
                    key: key.clone(),
                })?;
            if array.fortran_order && array.shape.len() > 1 {
                debug!("{key} is in fortran order, rewriting into c order");
            }
            let (dtype, shape, data) = array.into_c_order().into_parts();
            let payload = match data {
                Cow::Borrowed(data) => {
                    let start = data.as_ptr() as usize - map.as_ptr() as usize;
                    Payload::Mapped(start..start + data.len())
                }
                Cow::Owned(data) => Payload::Owned(data.into()),
            };
            (dtype, shape, payload)
        };
        if shape.is_empty() {
            return Err(StorageAccessError::Scalar {
                path: path.clone(),
                key: key.clone(),
            });
        }

        let storage = match payload {
            Payload::Mapped(range) => Storage::Mapped { map, range },
            Payload::Owned(data) => Storage::Owned(data),
        };
        info!(
            "load {key} [{dtype}; {shape:?}] from {} in {:?}",
            path.display(),
            time.elapsed()
        );

        Ok(Self {
            path: path.clone(),
            input_name: input_name.clone(),
            batch_size: *batch_size,
            dtype,
            shape,
            storage,
        })
    }

    /// Rows `[i * batch_size, (i + 1) * batch_size)` under the input name.
    ///
    /// Past the end the batch is shortened, down to empty; this is never an error.
    pub fn get_batch(&self, iteration_index: usize) -> NamedBatch<'_> {
        let batch_size = self.batch_size.get();
        let start = iteration_index.saturating_mul(batch_size);
        let end = start.saturating_add(batch_size);

        let mut ans = IndexMap::with_capacity(1);
        ans.insert(&*self.input_name, self.array().slice_rows(start..end));
        ans
    }

    /// The whole calibration array.
    #[inline]
    pub fn array(&self) -> NpyView<'_> {
        NpyView::new(self.dtype, self.shape.clone(), self.storage.bytes())
    }

    /// Count of samples, the first dimension.
    #[inline]
    pub fn len(&self) -> usize {
        self.shape[0]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub const fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    #[inline]
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether batches are read straight from the memory map.
    #[inline]
    pub const fn is_mapped(&self) -> bool {
        matches!(self.storage, Storage::Mapped { .. })
    }
}

impl fmt::Debug for CalibData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalibData")
            .field("path", &self.path)
            .field("input_name", &self.input_name)
            .field("batch_size", &self.batch_size)
            .field("dtype", &self.dtype.name())
            .field("shape", &self.shape)
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use npzs::NpzWriter;
    use std::fs;

    fn fixture(name: &str, writer: NpzWriter<Vec<u8>>, shape: &[usize]) -> (PathBuf, Vec<u16>) {
        let data = (0..shape.iter().product::<usize>())
            .map(|i| i as u16)
            .collect::<Vec<_>>();
        let mut writer = writer;
        writer.write_array("data", shape, &data).unwrap();
        let path = std::env::temp_dir().join(format!(
            "calib-input-{}-{name}.npz",
            std::process::id()
        ));
        fs::write(&path, writer.finish().unwrap()).unwrap();
        (path, data)
    }

    #[test]
    fn mapped_in_place() {
        let (path, data) = fixture("mapped", NpzWriter::new(Vec::new()), &[5, 2]);
        let calib = CalibData::load(&CalibConfig {
            batch_size: NonZero::new(2).unwrap(),
            ..CalibConfig::with_path(&path)
        })
        .unwrap();
        assert!(calib.is_mapped());
        assert_eq!(calib.len(), 5);
        assert_eq!(calib.batch_size(), 2);
        assert_eq!(calib.path(), path);

        let batch = calib.get_batch(1);
        assert_eq!(batch["input_1"].shape(), [2, 2]);
        assert_eq!(
            batch["input_1"].typed::<u16>().unwrap().to_vec(),
            data[4..8]
        );
        assert_eq!(calib.get_batch(2)["input_1"].shape(), [1, 2]);

        drop(calib);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn deflated_is_owned() {
        let (path, data) = fixture("deflated", NpzWriter::compressed(Vec::new()), &[300, 3]);
        let calib = CalibData::load(&CalibConfig::with_path(&path)).unwrap();
        assert!(!calib.is_mapped());
        assert_eq!(calib.array().typed::<u16>().unwrap().to_vec(), data);
        assert_eq!(calib.get_batch(2)["input_1"].len(), 44);

        drop(calib);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn scalar_rejected() {
        let (path, _) = fixture("scalar", NpzWriter::new(Vec::new()), &[]);
        let err = CalibData::load(&CalibConfig::with_path(&path)).unwrap_err();
        assert!(matches!(err, StorageAccessError::Scalar { .. }));
        assert_eq!(err.path(), path);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn shared_between_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CalibData>();
    }
}
