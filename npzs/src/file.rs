use crate::{zip::scan_entries, NpyArray, NpyError, NpzEntry, NpzReadError};
use indexmap::IndexMap;
use std::{error::Error, fmt, io};

pub const NPY_SUFFIX: &str = ".npy";

/// A parsed `.npz` file. Array data stays in the source buffer until asked for.
pub struct NpzArchive<'a> {
    pub entries: IndexMap<&'a str, NpzEntry<'a>>,
}

#[derive(Debug)]
pub enum NpzError {
    Reading(NpzReadError),
    EndOfCentralDirNotFound,
    SignatureMismatch(u32),
    DuplicateEntry(String),
    Encrypted(String),
    CompressionNotSupport(String, u16),
    Inflate { name: String, source: io::Error },
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    Npy(String, NpyError),
}

impl fmt::Display for NpzError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reading(e) => write!(f, "reading error: {e}"),
            Self::EndOfCentralDirNotFound => f.write_str("end of central directory not found"),
            Self::SignatureMismatch(sig) => write!(f, "signature mismatch: {sig:#010x}"),
            Self::DuplicateEntry(name) => write!(f, "duplicate entry: {name}"),
            Self::Encrypted(name) => write!(f, "encrypted entry not support: {name}"),
            Self::CompressionNotSupport(name, method) => {
                write!(f, "compression method {method} not support: {name}")
            }
            Self::Inflate { name, source } => write!(f, "inflating {name}: {source}"),
            Self::SizeMismatch {
                name,
                expected,
                actual,
            } => write!(f, "size mismatch in {name}: expected {expected}, got {actual}"),
            Self::Npy(name, e) => write!(f, "array {name}: {e}"),
        }
    }
}

impl Error for NpzError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Reading(e) => Some(e),
            Self::Inflate { source, .. } => Some(source),
            Self::Npy(_, e) => Some(e),
            _ => None,
        }
    }
}

impl<'a> NpzArchive<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, NpzError> {
        Ok(Self {
            entries: scan_entries(data)?,
        })
    }

    /// Array names, `.npy` stripped, in archive order.
    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.keys().map(|&name| array_name(name))
    }

    /// Looks up `name`, then `name.npy`.
    pub fn entry(&self, name: &str) -> Option<&NpzEntry<'a>> {
        self.entries
            .get(name)
            .or_else(|| self.entries.get(&*format!("{name}{NPY_SUFFIX}")))
    }

    /// Decodes the array under `name`, `Ok(None)` if there is no such member.
    pub fn array(&self, name: &str) -> Result<Option<NpyArray<'a>>, NpzError> {
        self.entry(name).map(NpzEntry::array).transpose()
    }

    pub fn arrays(&self) -> impl Iterator<Item = (&'a str, Result<NpyArray<'a>, NpzError>)> + '_ {
        self.entries
            .values()
            .map(|entry| (array_name(entry.name()), entry.array()))
    }
}

#[inline]
fn array_name(name: &str) -> &str {
    name.strip_suffix(NPY_SUFFIX).unwrap_or(name)
}
