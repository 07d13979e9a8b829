//! See <https://numpy.org/doc/stable/reference/arrays.dtypes.html#specifying-and-constructing-data-types>.

use half::f16;
use std::fmt;

/// Character code of an array-protocol type string.
#[derive(num_enum::TryFromPrimitive, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum NpyKind {
    Bool = b'b',
    Int = b'i',
    UInt = b'u',
    Float = b'f',
    Complex = b'c',
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ByteOrder {
    Little,
    Big,
    /// Single-byte types carry `|`.
    Ignore,
}

impl ByteOrder {
    pub const NATIVE: Self = if cfg!(target_endian = "little") {
        Self::Little
    } else {
        Self::Big
    };

    const fn symbol(self) -> char {
        match self {
            Self::Little => '<',
            Self::Big => '>',
            Self::Ignore => '|',
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NpyDType {
    pub kind: NpyKind,
    pub order: ByteOrder,
    size: usize,
}

impl NpyDType {
    pub const fn native(kind: NpyKind, size: usize) -> Self {
        Self {
            kind,
            order: if size == 1 {
                ByteOrder::Ignore
            } else {
                ByteOrder::NATIVE
            },
            size,
        }
    }

    /// Parses a simple type string such as `<f4` or `|u1`.
    pub fn parse(descr: &str) -> Option<Self> {
        let (order, tail) = match descr.as_bytes() {
            [b'<', tail @ ..] => (ByteOrder::Little, tail),
            [b'>', tail @ ..] => (ByteOrder::Big, tail),
            [b'|', tail @ ..] => (ByteOrder::Ignore, tail),
            [b'=', tail @ ..] => (ByteOrder::NATIVE, tail),
            tail => (ByteOrder::NATIVE, tail),
        };
        let [kind, size @ ..] = tail else {
            return None;
        };
        let kind = NpyKind::try_from(*kind).ok()?;
        let size: usize = std::str::from_utf8(size).ok()?.parse().ok()?;

        #[rustfmt::skip]
        let valid = match kind {
            NpyKind::Bool           => size == 1,
            NpyKind::Int
            | NpyKind::UInt         => matches!(size, 1 | 2 | 4 | 8),
            NpyKind::Float          => matches!(size, 2 | 4 | 8),
            NpyKind::Complex        => matches!(size, 8 | 16),
        };
        if !valid {
            return None;
        }
        let order = if size == 1 { ByteOrder::Ignore } else { order };
        Some(Self { kind, order, size })
    }

    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_native_endian(&self) -> bool {
        matches!(self.order, ByteOrder::Ignore) || self.order == ByteOrder::NATIVE
    }

    /// The type string written into `.npy` headers.
    pub fn descr(&self) -> String {
        format!(
            "{}{}{}",
            self.order.symbol(),
            self.kind as u8 as char,
            self.size
        )
    }

    pub fn name(&self) -> &'static str {
        #[rustfmt::skip]
        let name = match (self.kind, self.size) {
            (NpyKind::Bool   ,  _) => "bool",
            (NpyKind::Int    ,  1) => "i8",
            (NpyKind::Int    ,  2) => "i16",
            (NpyKind::Int    ,  4) => "i32",
            (NpyKind::Int    ,  _) => "i64",
            (NpyKind::UInt   ,  1) => "u8",
            (NpyKind::UInt   ,  2) => "u16",
            (NpyKind::UInt   ,  4) => "u32",
            (NpyKind::UInt   ,  _) => "u64",
            (NpyKind::Float  ,  2) => "f16",
            (NpyKind::Float  ,  4) => "f32",
            (NpyKind::Float  ,  _) => "f64",
            (NpyKind::Complex,  8) => "c64",
            (NpyKind::Complex,  _) => "c128",
        };
        name
    }
}

impl fmt::Display for NpyDType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rust types that have a one-to-one `.npy` counterpart.
pub trait Element: Copy + Send + Sync + 'static {
    const DTYPE: NpyDType;

    /// Decodes one element from exactly `DTYPE.size()` native-endian bytes.
    fn from_ne_slice(bytes: &[u8]) -> Self;
}

macro_rules! element {
    ($($ty:ty => $kind:ident;)+) => {
        $(
            impl Element for $ty {
                const DTYPE: NpyDType = NpyDType::native(NpyKind::$kind, size_of::<$ty>());

                #[inline]
                fn from_ne_slice(bytes: &[u8]) -> Self {
                    let mut buf = [0; size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(buf)
                }
            }
        )+
    };
}

element! {
    i8  => Int  ;
    i16 => Int  ;
    i32 => Int  ;
    i64 => Int  ;
    u8  => UInt ;
    u16 => UInt ;
    u32 => UInt ;
    u64 => UInt ;
    f16 => Float;
    f32 => Float;
    f64 => Float;
}

impl Element for bool {
    const DTYPE: NpyDType = NpyDType::native(NpyKind::Bool, 1);

    #[inline]
    fn from_ne_slice(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

#[test]
fn test_parse_descr() {
    let f4 = NpyDType::parse("<f4").unwrap();
    assert_eq!(f4.kind, NpyKind::Float);
    assert_eq!(f4.order, ByteOrder::Little);
    assert_eq!(f4.size(), 4);
    assert_eq!(f4.name(), "f32");
    assert_eq!(f4.descr(), "<f4");

    let u1 = NpyDType::parse("|u1").unwrap();
    assert_eq!(u1, u8::DTYPE);
    assert!(u1.is_native_endian());
    assert_eq!(NpyDType::parse("<u1"), Some(u1));

    assert_eq!(NpyDType::parse("=f8"), Some(f64::DTYPE));
    assert_eq!(NpyDType::parse("|b1"), Some(bool::DTYPE));
    assert_eq!(NpyDType::parse("<c16").unwrap().name(), "c128");

    assert_eq!(NpyDType::parse(">i4").unwrap().order, ByteOrder::Big);
    assert_eq!(NpyDType::parse("<f16"), None);
    assert_eq!(NpyDType::parse("<i3"), None);
    assert_eq!(NpyDType::parse("|O8"), None);
    assert_eq!(NpyDType::parse("<U10"), None);
    assert_eq!(NpyDType::parse(""), None);
}

#[test]
fn test_element() {
    assert_eq!(f32::from_ne_slice(&1.5f32.to_ne_bytes()), 1.5);
    assert_eq!(i16::from_ne_slice(&(-3i16).to_ne_bytes()), -3);
    assert_eq!(f16::from_ne_slice(&f16::ONE.to_ne_bytes()), f16::ONE);
    assert!(bool::from_ne_slice(&[1]));
    assert!(!bool::from_ne_slice(&[0]));
    assert_eq!(f16::DTYPE.descr(), NpyDType::parse("=f2").unwrap().descr());
}
