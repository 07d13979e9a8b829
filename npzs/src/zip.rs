//! Central directory walking for the subset of ZIP that NumPy writes.
//!
//! See <https://pkware.cachefly.net/webdocs/casestudies/APPNOTE.TXT>.

use crate::{NpyArray, NpzError, NpzReadError, NpzReader};
use flate2::read::DeflateDecoder;
use indexmap::IndexMap;
use std::{borrow::Cow, io::Read};

pub(crate) const LOCAL_HEADER: u32 = 0x0403_4b50;
pub(crate) const CENTRAL_HEADER: u32 = 0x0201_4b50;
pub(crate) const END_OF_CENTRAL_DIR: u32 = 0x0605_4b50;
pub(crate) const ZIP64_END_OF_CENTRAL_DIR: u32 = 0x0606_4b50;
pub(crate) const ZIP64_LOCATOR: u32 = 0x0706_4b50;
pub(crate) const ZIP64_EXTRA: u16 = 0x0001;

pub(crate) const LOCAL_HEADER_LEN: usize = 30;
pub(crate) const CENTRAL_HEADER_LEN: usize = 46;
pub(crate) const END_OF_CENTRAL_DIR_LEN: usize = 22;
pub(crate) const ZIP64_LOCATOR_LEN: usize = 20;

const FLAG_ENCRYPTED: u16 = 1 << 0;
/// Upper bound of deflate output per input byte.
const MAX_DEFLATE_RATIO: usize = 1032;

#[derive(num_enum::TryFromPrimitive, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u16)]
pub enum Compression {
    Stored = 0,
    Deflated = 8,
}

impl Compression {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Deflated => "deflated",
        }
    }
}

/// One member of the archive.
#[derive(Clone, Debug)]
pub struct NpzEntry<'a> {
    name: &'a str,
    compression: Compression,
    crc32: u32,
    size: usize,
    raw: &'a [u8],
}

impl<'a> NpzEntry<'a> {
    #[inline]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    #[inline]
    pub const fn compression(&self) -> Compression {
        self.compression
    }

    #[inline]
    pub const fn crc32(&self) -> u32 {
        self.crc32
    }

    /// Uncompressed size.
    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub const fn compressed_size(&self) -> usize {
        self.raw.len()
    }

    /// Member content, borrowed when stored and inflated otherwise.
    pub fn content(&self) -> Result<Cow<'a, [u8]>, NpzError> {
        match self.compression {
            Compression::Stored => {
                if self.raw.len() != self.size {
                    return Err(self.size_mismatch(self.raw.len()));
                }
                Ok(Cow::Borrowed(self.raw))
            }
            Compression::Deflated => {
                // the declared size is untrusted until the stream agrees with it
                let capacity = self.size.min(self.raw.len().saturating_mul(MAX_DEFLATE_RATIO));
                let limit = (self.size as u64).saturating_add(1);
                let mut ans = Vec::with_capacity(capacity);
                DeflateDecoder::new(self.raw)
                    .take(limit)
                    .read_to_end(&mut ans)
                    .map_err(|source| NpzError::Inflate {
                        name: self.name.into(),
                        source,
                    })?;
                if ans.len() != self.size {
                    return Err(self.size_mismatch(ans.len()));
                }
                Ok(Cow::Owned(ans))
            }
        }
    }

    /// Decodes the member as an `.npy` array.
    pub fn array(&self) -> Result<NpyArray<'a>, NpzError> {
        let wrap = |e| NpzError::Npy(self.name.into(), e);
        match self.content()? {
            Cow::Borrowed(npy) => NpyArray::new(npy).map_err(wrap),
            Cow::Owned(npy) => NpyArray::from_vec(npy).map_err(wrap),
        }
    }

    fn size_mismatch(&self, actual: usize) -> NpzError {
        NpzError::SizeMismatch {
            name: self.name.into(),
            expected: self.size,
            actual,
        }
    }
}

struct Directory {
    entries: u64,
    size: u64,
    offset: u64,
}

pub(crate) fn scan_entries(data: &[u8]) -> Result<IndexMap<&str, NpzEntry>, NpzError> {
    use NpzError::*;

    let eocd = find_end_of_central_dir(data)?;
    let dir = read_directory(data, eocd)?;

    let cd = usize::try_from(dir.offset)
        .ok()
        .and_then(|offset| data.get(offset..))
        .ok_or(Reading(NpzReadError::Eos))?;
    let cd_len = usize::try_from(dir.size).map_err(|_| Reading(NpzReadError::Eos))?;
    let cd = cd.get(..cd_len).ok_or(Reading(NpzReadError::Eos))?;

    let mut reader = NpzReader::new(cd);
    let mut entries = IndexMap::new();
    for _ in 0..dir.entries {
        let entry = read_central_header(&mut reader, data)?;
        let name = entry.name;
        if entries.insert(name, entry).is_some() {
            return Err(DuplicateEntry(name.into()));
        }
    }
    Ok(entries)
}

/// Scans backwards for the end record, allowing for a trailing comment.
fn find_end_of_central_dir(data: &[u8]) -> Result<usize, NpzError> {
    let Some(last) = data.len().checked_sub(END_OF_CENTRAL_DIR_LEN) else {
        return Err(NpzError::EndOfCentralDirNotFound);
    };
    let first = last.saturating_sub(u16::MAX as usize);
    (first..=last)
        .rev()
        .find(|&i| {
            let record = &data[i..];
            record[..4] == END_OF_CENTRAL_DIR.to_le_bytes()
                && i + END_OF_CENTRAL_DIR_LEN
                    + u16::from_le_bytes([record[20], record[21]]) as usize
                    == data.len()
        })
        .ok_or(NpzError::EndOfCentralDirNotFound)
}

fn read_directory(data: &[u8], eocd: usize) -> Result<Directory, NpzError> {
    use NpzError::Reading;

    let mut reader = NpzReader::new(&data[eocd..]);
    let mut dir = Directory {
        entries: reader.skip(10).map_err(Reading)?.read_u16().map_err(Reading)? as _,
        size: reader.read_u32().map_err(Reading)? as _,
        offset: reader.read_u32().map_err(Reading)? as _,
    };

    let Some(locator) = eocd.checked_sub(ZIP64_LOCATOR_LEN) else {
        return Ok(dir);
    };
    let mut reader = NpzReader::new(&data[locator..eocd]);
    if reader.read_u32().map_err(Reading)? != ZIP64_LOCATOR {
        return Ok(dir);
    }
    let record = reader.skip(4).map_err(Reading)?.read_u64().map_err(Reading)?;

    let record = usize::try_from(record)
        .ok()
        .and_then(|offset| data.get(offset..))
        .ok_or(Reading(NpzReadError::Eos))?;
    let mut reader = NpzReader::new(record);
    let signature = reader.read_u32().map_err(Reading)?;
    if signature != ZIP64_END_OF_CENTRAL_DIR {
        return Err(NpzError::SignatureMismatch(signature));
    }
    reader.skip(8 + 2 + 2 + 4 + 4 + 8).map_err(Reading)?;
    dir.entries = reader.read_u64().map_err(Reading)?;
    dir.size = reader.read_u64().map_err(Reading)?;
    dir.offset = reader.read_u64().map_err(Reading)?;
    Ok(dir)
}

fn read_central_header<'a>(
    reader: &mut NpzReader<'a>,
    data: &'a [u8],
) -> Result<NpzEntry<'a>, NpzError> {
    use NpzError::*;

    let signature = reader.read_u32().map_err(Reading)?;
    if signature != CENTRAL_HEADER {
        return Err(SignatureMismatch(signature));
    }
    let flags = reader.skip(4).map_err(Reading)?.read_u16().map_err(Reading)?;
    let method = reader.read_u16().map_err(Reading)?;
    let crc32 = reader.skip(4).map_err(Reading)?.read_u32().map_err(Reading)?;
    let mut compressed = reader.read_u32().map_err(Reading)? as u64;
    let mut size = reader.read_u32().map_err(Reading)? as u64;
    let name_len = reader.read_u16().map_err(Reading)? as usize;
    let extra_len = reader.read_u16().map_err(Reading)? as usize;
    let comment_len = reader.read_u16().map_err(Reading)? as usize;
    let mut offset = reader.skip(8).map_err(Reading)?.read_u32().map_err(Reading)? as u64;
    let name = reader.read_str(name_len).map_err(Reading)?;
    let extra = reader.read_bytes(extra_len).map_err(Reading)?;
    reader.skip(comment_len).map_err(Reading)?;

    // zip64 extra holds only the fields saturated in the fixed header, in this order
    let mut extra = NpzReader::new(extra);
    while !extra.remaining().is_empty() {
        let id = extra.read_u16().map_err(Reading)?;
        let len = extra.read_u16().map_err(Reading)? as usize;
        let mut field = NpzReader::new(extra.read_bytes(len).map_err(Reading)?);
        if id != ZIP64_EXTRA {
            continue;
        }
        for value in [&mut size, &mut compressed, &mut offset] {
            if *value == u32::MAX as u64 {
                *value = field.read_u64().map_err(Reading)?;
            }
        }
    }

    if flags & FLAG_ENCRYPTED != 0 {
        return Err(Encrypted(name.into()));
    }
    let compression =
        Compression::try_from(method).map_err(|_| CompressionNotSupport(name.into(), method))?;

    let to_usize = |n: u64| usize::try_from(n).map_err(|_| Reading(NpzReadError::Eos));
    let (size, compressed, offset) = (to_usize(size)?, to_usize(compressed)?, to_usize(offset)?);

    let local = data.get(offset..).ok_or(Reading(NpzReadError::Eos))?;
    let mut local = NpzReader::new(local);
    let signature = local.read_u32().map_err(Reading)?;
    if signature != LOCAL_HEADER {
        return Err(SignatureMismatch(signature));
    }
    // sizes in the local header may be saturated or deferred, trust the central ones
    let name_len = local.skip(22).map_err(Reading)?.read_u16().map_err(Reading)? as usize;
    let extra_len = local.read_u16().map_err(Reading)? as usize;
    let raw = local
        .skip(name_len + extra_len)
        .map_err(Reading)?
        .read_bytes(compressed)
        .map_err(Reading)?;

    Ok(NpzEntry {
        name,
        compression,
        crc32,
        size,
        raw,
    })
}
