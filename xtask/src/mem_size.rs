use std::fmt;

/// Byte count printed with a binary unit, e.g. `1.5MiB`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub(crate) struct MemSize(pub usize);

impl fmt::Display for MemSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

        let mut unit = 0;
        let mut scaled = self.0 as f64;
        while scaled >= 1024. && unit < UNITS.len() - 1 {
            scaled /= 1024.;
            unit += 1;
        }
        if unit == 0 || scaled.fract() == 0. {
            write!(f, "{}{}", scaled as usize, UNITS[unit])
        } else {
            write!(f, "{scaled:.1}{}", UNITS[unit])
        }
    }
}

#[test]
fn test_mem_size() {
    assert_eq!(MemSize(0).to_string(), "0B");
    assert_eq!(MemSize(1000).to_string(), "1000B");
    assert_eq!(MemSize(2048).to_string(), "2KiB");
    assert_eq!(MemSize(3 << 19).to_string(), "1.5MiB");
    assert_eq!(MemSize(5 << 40).to_string(), "5TiB");
}
