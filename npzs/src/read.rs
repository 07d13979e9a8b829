use std::str::{from_utf8, Utf8Error};

/// Little-endian cursor over a borrowed byte buffer.
#[derive(Clone)]
#[repr(transparent)]
pub struct NpzReader<'a>(&'a [u8]);

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum NpzReadError {
    Eos,
    Utf8(Utf8Error),
}

impl std::fmt::Display for NpzReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eos => f.write_str("unexpected end of stream"),
            Self::Utf8(e) => write!(f, "invalid utf8: {e}"),
        }
    }
}

impl std::error::Error for NpzReadError {}

macro_rules! read_le {
    ($($name:ident -> $ty:ty;)+) => {
        $(
            #[inline]
            pub fn $name(&mut self) -> Result<$ty, NpzReadError> {
                self.read_array().map(<$ty>::from_le_bytes)
            }
        )+
    };
}

impl<'a> NpzReader<'a> {
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self(data)
    }

    #[inline]
    pub const fn remaining(&self) -> &'a [u8] {
        self.0
    }

    pub fn skip(&mut self, len: usize) -> Result<&mut Self, NpzReadError> {
        let (_, tail) = self.0.split_at_checked(len).ok_or(NpzReadError::Eos)?;
        self.0 = tail;
        Ok(self)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], NpzReadError> {
        let (head, tail) = self.0.split_at_checked(len).ok_or(NpzReadError::Eos)?;
        self.0 = tail;
        Ok(head)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], NpzReadError> {
        let mut ans = [0; N];
        ans.copy_from_slice(self.read_bytes(N)?);
        Ok(ans)
    }

    read_le! {
        read_u8  -> u8 ;
        read_u16 -> u16;
        read_u32 -> u32;
        read_u64 -> u64;
    }

    pub fn read_str(&mut self, len: usize) -> Result<&'a str, NpzReadError> {
        from_utf8(self.read_bytes(len)?).map_err(NpzReadError::Utf8)
    }
}

#[test]
fn test_reader() {
    let data = [1, 2, 0, 3, 0, 0, 0, b'o', b'k', 0xff];
    let mut reader = NpzReader::new(&data);
    assert_eq!(reader.read_u8(), Ok(1));
    assert_eq!(reader.read_u16(), Ok(2));
    assert_eq!(reader.read_u32(), Ok(3));
    assert_eq!(reader.read_str(2), Ok("ok"));
    assert_eq!(reader.read_u16(), Err(NpzReadError::Eos));
    assert_eq!(reader.remaining(), &[0xff]);
    assert!(matches!(reader.read_str(1), Err(NpzReadError::Utf8(_))));
}
