#![doc = include_str!("../README.md")]

mod array;
mod dtype;
mod file;
mod header;
mod read;
mod write;
mod zip;

#[cfg(test)]
mod zipfile_fixtures;

pub use array::{NpyArray, NpyElements, NpyError, NpyView};
pub use dtype::{ByteOrder, Element, NpyDType, NpyKind};
pub use file::{NpzArchive, NpzError, NPY_SUFFIX};
pub use header::NpyHeader;
pub use read::{NpzReadError, NpzReader};
pub use write::NpzWriter;
pub use zip::{Compression, NpzEntry};
