//! See <https://numpy.org/doc/stable/reference/generated/numpy.lib.format.html>.

use crate::{NpyDType, NpyError, NpzReader};
use fancy_regex::Regex;
use std::{fmt, sync::LazyLock};

pub(crate) const MAGIC: [u8; 6] = *b"\x93NUMPY";
/// Total header length is padded to a multiple of this.
pub(crate) const HEADER_ALIGNMENT: usize = 64;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NpyHeader {
    pub version: (u8, u8),
    pub dtype: NpyDType,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

impl NpzReader<'_> {
    /// Reads the magic, version and header dict of an `.npy` payload,
    /// leaving the reader at the first data byte.
    pub fn read_npy_header(&mut self) -> Result<NpyHeader, NpyError> {
        use NpyError::*;

        if self.read_array::<6>().map_err(Reading)? != MAGIC {
            return Err(MagicMismatch);
        }
        let major = self.read_u8().map_err(Reading)?;
        let minor = self.read_u8().map_err(Reading)?;
        let len = match (major, minor) {
            (1, 0) => self.read_u16().map_err(Reading)? as usize,
            (2, 0) | (3, 0) => self.read_u32().map_err(Reading)? as usize,
            _ => return Err(VersionNotSupport(major, minor)),
        };
        let dict = self.read_str(len).map_err(Reading)?;
        if major < 3 && !dict.is_ascii() {
            return Err(HeaderMalformed("non-ascii header"));
        }

        let (dtype, fortran_order, shape) = parse_dict(dict)?;
        Ok(NpyHeader {
            version: (major, minor),
            dtype,
            fortran_order,
            shape,
        })
    }
}

impl NpyHeader {
    #[inline]
    pub fn new(dtype: NpyDType, fortran_order: bool, shape: &[usize]) -> Self {
        Self {
            version: (1, 0),
            dtype,
            fortran_order,
            shape: shape.to_vec(),
        }
    }

    /// Count of elements, `None` on overflow.
    pub fn n_elements(&self) -> Option<usize> {
        self.shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    pub fn nbytes(&self) -> Option<usize> {
        self.n_elements()?.checked_mul(self.dtype.size())
    }

    /// Encodes magic, version, length and the padded dict.
    /// The version is raised to 2.0 when the dict outgrows a `u16` length.
    pub fn to_bytes(&self) -> Vec<u8> {
        let dict = format!(
            "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}",
            self.dtype.descr(),
            if self.fortran_order { "True" } else { "False" },
            PyTuple(&self.shape),
        );

        let mut prefix = MAGIC.len() + 2 + 2;
        let mut padded = (prefix + dict.len() + 1).next_multiple_of(HEADER_ALIGNMENT) - prefix;
        let v1 = padded <= u16::MAX as usize;
        if !v1 {
            prefix += 2;
            padded = (prefix + dict.len() + 1).next_multiple_of(HEADER_ALIGNMENT) - prefix;
        }

        let mut ans = Vec::with_capacity(prefix + padded);
        ans.extend_from_slice(&MAGIC);
        if v1 {
            ans.extend_from_slice(&[1, 0]);
            ans.extend_from_slice(&(padded as u16).to_le_bytes());
        } else {
            ans.extend_from_slice(&[2, 0]);
            ans.extend_from_slice(&(padded as u32).to_le_bytes());
        }
        ans.extend_from_slice(dict.as_bytes());
        ans.resize(prefix + padded - 1, b' ');
        ans.push(b'\n');
        ans
    }
}

fn parse_dict(dict: &str) -> Result<(NpyDType, bool, Vec<usize>), NpyError> {
    use NpyError::*;

    const DESCR: &str = r#"['"]descr['"]\s*:\s*(?:['"](?<simple>[^'"]*)['"]|(?<other>[\[{]))"#;
    const FORTRAN: &str = r#"['"]fortran_order['"]\s*:\s*(?<value>True|False)"#;
    const SHAPE: &str = r#"['"]shape['"]\s*:\s*\((?<dims>[^)]*)\)"#;
    static DESCR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(DESCR).unwrap());
    static FORTRAN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(FORTRAN).unwrap());
    static SHAPE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(SHAPE).unwrap());

    if !dict.trim_start().starts_with('{') {
        return Err(HeaderMalformed("header is not a dict"));
    }

    let descr = DESCR_REGEX
        .captures(dict)
        .ok()
        .flatten()
        .ok_or(HeaderMalformed("descr"))?;
    let dtype = match descr.name("simple") {
        Some(simple) => {
            let simple = simple.as_str();
            NpyDType::parse(simple).ok_or_else(|| DTypeNotSupport(simple.into()))?
        }
        None => return Err(DTypeNotSupport("structured".into())),
    };

    let fortran_order = FORTRAN_REGEX
        .captures(dict)
        .ok()
        .flatten()
        .and_then(|c| c.name("value"))
        .ok_or(HeaderMalformed("fortran_order"))?
        .as_str()
        == "True";

    let dims = SHAPE_REGEX
        .captures(dict)
        .ok()
        .flatten()
        .and_then(|c| c.name("dims"))
        .ok_or(HeaderMalformed("shape"))?;
    let shape = dims
        .as_str()
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        // Python 2 writes long integers with a trailing `L`
        .map(|d| d.trim_end_matches('L').parse())
        .collect::<Result<Vec<usize>, _>>()
        .map_err(|_| HeaderMalformed("shape"))?;

    Ok((dtype, fortran_order, shape))
}

/// Formats a shape the way Python's `repr(tuple)` does.
struct PyTuple<'a>(&'a [usize]);

impl fmt::Display for PyTuple<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            [] => f.write_str("()"),
            [d] => write!(f, "({d},)"),
            [first, tail @ ..] => {
                write!(f, "({first}")?;
                for d in tail {
                    write!(f, ", {d}")?;
                }
                f.write_str(")")
            }
        }
    }
}
