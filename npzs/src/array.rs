use crate::{Element, NpyDType, NpyHeader, NpzReadError, NpzReader};
use rayon::{iter::IndexedParallelIterator, iter::ParallelIterator, slice::ParallelSliceMut};
use std::{borrow::Cow, error::Error, fmt, marker::PhantomData, ops::Range};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum NpyError {
    Reading(NpzReadError),
    MagicMismatch,
    VersionNotSupport(u8, u8),
    HeaderMalformed(&'static str),
    DTypeNotSupport(String),
    EndianNotSupport,
    SizeOverflow,
    TypeMismatch { expected: NpyDType, found: NpyDType },
}

impl fmt::Display for NpyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reading(e) => write!(f, "reading error: {e}"),
            Self::MagicMismatch => f.write_str("magic mismatch"),
            Self::VersionNotSupport(major, minor) => {
                write!(f, "version {major}.{minor} not support")
            }
            Self::HeaderMalformed(what) => write!(f, "malformed header: {what}"),
            Self::DTypeNotSupport(descr) => write!(f, "dtype not support: {descr}"),
            Self::EndianNotSupport => f.write_str("endian not support"),
            Self::SizeOverflow => f.write_str("array size overflows usize"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {expected}, found {found}")
            }
        }
    }
}

impl Error for NpyError {}

/// An array decoded from one `.npy` payload.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NpyArray<'a> {
    pub dtype: NpyDType,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
    data: Cow<'a, [u8]>,
}

impl<'a> NpyArray<'a> {
    /// Parses an `.npy` payload without copying the data.
    pub fn new(npy: &'a [u8]) -> Result<Self, NpyError> {
        let mut reader = NpzReader::new(npy);
        let header = reader.read_npy_header()?;
        let offset = npy.len() - reader.remaining().len();
        let nbytes = check(&header, reader.remaining().len())?;
        Ok(Self::from_header(
            header,
            Cow::Borrowed(&npy[offset..][..nbytes]),
        ))
    }

    /// Parses an owned `.npy` payload, dropping the header bytes in place.
    pub fn from_vec(mut npy: Vec<u8>) -> Result<NpyArray<'static>, NpyError> {
        let mut reader = NpzReader::new(&npy);
        let header = reader.read_npy_header()?;
        let offset = npy.len() - reader.remaining().len();
        let nbytes = check(&header, reader.remaining().len())?;
        npy.truncate(offset + nbytes);
        npy.drain(..offset);
        Ok(NpyArray::from_header(header, Cow::Owned(npy)))
    }

    fn from_header(header: NpyHeader, data: Cow<'a, [u8]>) -> Self {
        Self {
            dtype: header.dtype,
            fortran_order: header.fortran_order,
            shape: header.shape,
            data,
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn nbytes(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub const fn is_borrowed(&self) -> bool {
        matches!(self.data, Cow::Borrowed(_))
    }

    pub fn into_parts(self) -> (NpyDType, Vec<usize>, Cow<'a, [u8]>) {
        (self.dtype, self.shape, self.data)
    }

    /// A C-ordered view, `None` if the array is stored in Fortran order.
    pub fn view(&self) -> Option<NpyView<'_>> {
        if self.fortran_order && self.shape.len() > 1 {
            None
        } else {
            Some(NpyView::new(self.dtype, self.shape.clone(), &self.data))
        }
    }

    /// Rewrites a Fortran-ordered array into C order.
    /// C-ordered and 1-d arrays come back untouched.
    pub fn into_c_order(self) -> Self {
        if !self.fortran_order {
            return self;
        }
        if self.shape.len() <= 1 {
            return Self {
                fortran_order: false,
                ..self
            };
        }

        let size = self.dtype.size();
        // strides of each axis, in elements, for the source layout
        let mut strides = Vec::with_capacity(self.shape.len());
        let mut acc = 1;
        for &d in &self.shape {
            strides.push(acc);
            acc *= d;
        }

        let src = &*self.data;
        let shape = &self.shape;
        let mut dst = vec![0u8; src.len()];
        dst.par_chunks_mut(size).enumerate().for_each(|(i, dst)| {
            let mut rem = i;
            let mut j = 0;
            for (&d, &s) in shape.iter().zip(&strides).rev() {
                j += rem % d * s;
                rem /= d;
            }
            dst.copy_from_slice(&src[j * size..][..size]);
        });

        Self {
            dtype: self.dtype,
            fortran_order: false,
            shape: self.shape,
            data: Cow::Owned(dst),
        }
    }
}

fn check(header: &NpyHeader, available: usize) -> Result<usize, NpyError> {
    if !header.dtype.is_native_endian() {
        return Err(NpyError::EndianNotSupport);
    }
    let nbytes = header.nbytes().ok_or(NpyError::SizeOverflow)?;
    if available < nbytes {
        return Err(NpyError::Reading(NpzReadError::Eos));
    }
    Ok(nbytes)
}

/// A borrowed C-ordered array.
///
/// The first axis counts rows. A 0-d view is treated as a single row.
#[derive(Clone, PartialEq, Eq)]
pub struct NpyView<'a> {
    dtype: NpyDType,
    shape: Vec<usize>,
    data: &'a [u8],
}

impl<'a> NpyView<'a> {
    /// # Panics
    ///
    /// If `data` does not hold exactly `shape` elements of `dtype`.
    pub fn new(dtype: NpyDType, shape: Vec<usize>, data: &'a [u8]) -> Self {
        assert_eq!(
            shape.iter().product::<usize>() * dtype.size(),
            data.len(),
            "data length does not match shape",
        );
        Self { dtype, shape, data }
    }

    #[inline]
    pub const fn dtype(&self) -> NpyDType {
        self.dtype
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Bytes of one row.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.shape.iter().skip(1).product::<usize>() * self.dtype.size()
    }

    /// Rows in `range`, clamped to the view like a Python slice.
    pub fn slice_rows(&self, range: Range<usize>) -> Self {
        let len = self.len();
        let end = range.end.min(len);
        let start = range.start.min(end);

        let row = self.row_bytes();
        let mut shape = self.shape.clone();
        match shape.first_mut() {
            Some(first) => *first = end - start,
            None => shape.push(end - start),
        }
        Self {
            dtype: self.dtype,
            shape,
            data: &self.data[start * row..end * row],
        }
    }

    pub fn typed<T: Element>(&self) -> Result<NpyElements<'a, T>, NpyError> {
        if self.dtype == T::DTYPE {
            Ok(NpyElements {
                data: self.data,
                _phantom: PhantomData,
            })
        } else {
            Err(NpyError::TypeMismatch {
                expected: T::DTYPE,
                found: self.dtype,
            })
        }
    }
}

impl fmt::Debug for NpyView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NpyView")
            .field("dtype", &self.dtype.name())
            .field("shape", &self.shape)
            .field("nbytes", &self.data.len())
            .finish()
    }
}

/// Flat, typed access to a view. Reads are unaligned.
#[derive(Clone, Copy)]
pub struct NpyElements<'a, T> {
    data: &'a [u8],
    _phantom: PhantomData<T>,
}

impl<'a, T: Element> NpyElements<'a, T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / size_of::<T>()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<T> {
        self.data
            .chunks_exact(size_of::<T>())
            .nth(index)
            .map(T::from_ne_slice)
    }

    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = T> + 'a {
        self.data.chunks_exact(size_of::<T>()).map(T::from_ne_slice)
    }

    #[inline]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}
