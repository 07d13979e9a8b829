use crate::{
    zip::{
        CENTRAL_HEADER, END_OF_CENTRAL_DIR, LOCAL_HEADER, ZIP64_END_OF_CENTRAL_DIR, ZIP64_EXTRA,
        ZIP64_LOCATOR,
    },
    Compression, Element, NpyHeader, NpyView, NPY_SUFFIX,
};
use flate2::{write::DeflateEncoder, Crc};
use internal::Internal;
use std::{
    io::{Error, ErrorKind, Result, Write},
    slice::from_raw_parts,
};

const VERSION_DEFAULT: u16 = 20;
const VERSION_ZIP64: u16 = 45;
const FLAG_UTF8: u16 = 1 << 11;
// 1980-01-01 00:00:00, the first representable DOS timestamp
const DOS_TIME: u16 = 0;
const DOS_DATE: u16 = (1 << 5) | 1;
const U32_LIMIT: u64 = u32::MAX as _;

/// Writes an `.npz`, one `.npy` member per array.
pub struct NpzWriter<T: Write> {
    writer: Internal<T>,
    records: Vec<Record>,
    compression: Compression,
    force_zip64: bool,
}

struct Record {
    name: String,
    compression: Compression,
    crc32: u32,
    size: u64,
    compressed: u64,
    offset: u64,
    zip64: bool,
}

impl<T: Write> NpzWriter<T> {
    #[inline]
    pub fn new(writer: T) -> Self {
        Self {
            writer: Internal::new(writer),
            records: Vec::new(),
            compression: Compression::Stored,
            force_zip64: false,
        }
    }

    /// Deflates every member, as `numpy.savez_compressed` does.
    #[inline]
    pub fn compressed(writer: T) -> Self {
        Self {
            compression: Compression::Deflated,
            ..Self::new(writer)
        }
    }

    /// Writes zip64 extras on every member, as `numpy.savez` does.
    #[inline]
    pub fn force_zip64(self) -> Self {
        Self {
            force_zip64: true,
            ..self
        }
    }

    pub fn write_array<U: Element>(&mut self, name: &str, shape: &[usize], data: &[U]) -> Result<()> {
        if shape.iter().product::<usize>() != data.len() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("{} elements do not fill shape {shape:?}", data.len()),
            ));
        }
        let bytes = unsafe { from_raw_parts(data.as_ptr().cast::<u8>(), size_of_val(data)) };
        self.write_npy(name, &NpyHeader::new(U::DTYPE, false, shape), bytes)
    }

    #[inline]
    pub fn write_view(&mut self, name: &str, view: &NpyView) -> Result<()> {
        let header = NpyHeader::new(view.dtype(), false, view.shape());
        self.write_npy(name, &header, view.as_bytes())
    }

    /// Writes `data` as laid out by `header`; `data` is not checked against it.
    pub fn write_npy(&mut self, name: &str, header: &NpyHeader, data: &[u8]) -> Result<()> {
        let name = if name.ends_with(NPY_SUFFIX) {
            name.to_string()
        } else {
            format!("{name}{NPY_SUFFIX}")
        };
        if self.records.iter().any(|r| r.name == name) {
            return Err(Error::new(
                ErrorKind::AlreadyExists,
                format!("duplicate entry: {name}"),
            ));
        }

        let header = header.to_bytes();
        let mut crc = Crc::new();
        crc.update(&header);
        crc.update(data);

        let deflated = match self.compression {
            Compression::Stored => None,
            Compression::Deflated => {
                let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&header)?;
                encoder.write_all(data)?;
                Some(encoder.finish()?)
            }
        };

        let size = (header.len() + data.len()) as u64;
        let compressed = deflated.as_ref().map_or(size, |d| d.len() as _);
        let offset = self.writer.written_bytes() as u64;
        let record = Record {
            name,
            compression: self.compression,
            crc32: crc.sum(),
            size,
            compressed,
            offset,
            zip64: self.force_zip64
                || size >= U32_LIMIT
                || compressed >= U32_LIMIT
                || offset >= U32_LIMIT,
        };

        let w = &mut self.writer;
        w.write(LOCAL_HEADER)?;
        w.write(record.version())?;
        w.write(record.flags())?;
        w.write(record.compression as u16)?;
        w.write(DOS_TIME)?;
        w.write(DOS_DATE)?;
        w.write(record.crc32)?;
        if record.zip64 {
            w.write(u32::MAX)?;
            w.write(u32::MAX)?;
        } else {
            w.write(record.compressed as u32)?;
            w.write(record.size as u32)?;
        }
        w.write(record.name.len() as u16)?;
        w.write(if record.zip64 { 4 + 16 } else { 0u16 })?;
        w.write_bytes(record.name.as_bytes())?;
        if record.zip64 {
            w.write(ZIP64_EXTRA)?;
            w.write(16u16)?;
            w.write(record.size)?;
            w.write(record.compressed)?;
        }
        match &deflated {
            Some(deflated) => w.write_bytes(deflated)?,
            None => {
                w.write_bytes(&header)?;
                w.write_bytes(data)?;
            }
        }

        self.records.push(record);
        Ok(())
    }

    /// Writes the central directory and hands back the inner writer.
    pub fn finish(self) -> Result<T> {
        let Self {
            mut writer,
            records,
            force_zip64,
            ..
        } = self;
        let w = &mut writer;

        let cd_offset = w.written_bytes() as u64;
        for r in &records {
            w.write(CENTRAL_HEADER)?;
            w.write(r.version())?;
            w.write(r.version())?;
            w.write(r.flags())?;
            w.write(r.compression as u16)?;
            w.write(DOS_TIME)?;
            w.write(DOS_DATE)?;
            w.write(r.crc32)?;
            if r.zip64 {
                w.write(u32::MAX)?;
                w.write(u32::MAX)?;
            } else {
                w.write(r.compressed as u32)?;
                w.write(r.size as u32)?;
            }
            w.write(r.name.len() as u16)?;
            w.write(if r.zip64 { 4 + 24 } else { 0u16 })?;
            w.write(0u16)?;
            w.write(0u16)?;
            w.write(0u16)?;
            w.write(0u32)?;
            w.write(if r.zip64 { u32::MAX } else { r.offset as u32 })?;
            w.write_bytes(r.name.as_bytes())?;
            if r.zip64 {
                w.write(ZIP64_EXTRA)?;
                w.write(24u16)?;
                w.write(r.size)?;
                w.write(r.compressed)?;
                w.write(r.offset)?;
            }
        }
        let cd_size = w.written_bytes() as u64 - cd_offset;
        let n = records.len() as u64;

        if force_zip64 || n >= u16::MAX as u64 || cd_offset >= U32_LIMIT || cd_size >= U32_LIMIT {
            let record_offset = w.written_bytes() as u64;
            w.write(ZIP64_END_OF_CENTRAL_DIR)?;
            w.write(44u64)?;
            w.write(VERSION_ZIP64)?;
            w.write(VERSION_ZIP64)?;
            w.write(0u32)?;
            w.write(0u32)?;
            w.write(n)?;
            w.write(n)?;
            w.write(cd_size)?;
            w.write(cd_offset)?;

            w.write(ZIP64_LOCATOR)?;
            w.write(0u32)?;
            w.write(record_offset)?;
            w.write(1u32)?;
        }

        let n = n.min(u16::MAX as _) as u16;
        w.write(END_OF_CENTRAL_DIR)?;
        w.write(0u16)?;
        w.write(0u16)?;
        w.write(n)?;
        w.write(n)?;
        w.write(cd_size.min(U32_LIMIT) as u32)?;
        w.write(cd_offset.min(U32_LIMIT) as u32)?;
        w.write(0u16)?;

        writer.into_inner()
    }
}

impl Record {
    #[inline]
    fn version(&self) -> u16 {
        if self.zip64 {
            VERSION_ZIP64
        } else {
            VERSION_DEFAULT
        }
    }

    #[inline]
    fn flags(&self) -> u16 {
        if self.name.is_ascii() {
            0
        } else {
            FLAG_UTF8
        }
    }
}

mod internal {
    use std::io::{BufWriter, Result, Write};

    pub(super) struct Internal<T: Write>(BufWriter<T>, usize);

    pub(super) trait LittleEndian: Copy {
        fn write_to<T: Write>(self, w: &mut Internal<T>) -> Result<()>;
    }

    macro_rules! little_endian {
        ($($ty:ty)+) => {
            $(
                impl LittleEndian for $ty {
                    #[inline]
                    fn write_to<T: Write>(self, w: &mut Internal<T>) -> Result<()> {
                        w.write_bytes(&self.to_le_bytes())
                    }
                }
            )+
        };
    }

    little_endian!(u16 u32 u64);

    impl<T: Write> Internal<T> {
        #[inline]
        pub fn new(writer: T) -> Self {
            Self(BufWriter::new(writer), 0)
        }

        #[inline]
        pub const fn written_bytes(&self) -> usize {
            self.1
        }

        #[inline]
        pub fn write_bytes(&mut self, val: &[u8]) -> Result<()> {
            self.1 += val.len();
            self.0.write_all(val)
        }

        #[inline]
        pub fn write(&mut self, val: impl LittleEndian) -> Result<()> {
            val.write_to(self)
        }

        #[inline]
        pub fn into_inner(self) -> Result<T> {
            self.0.into_inner().map_err(|e| e.into_error())
        }
    }
}
