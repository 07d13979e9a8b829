use regex::Regex;
use std::{fmt, sync::LazyLock};

/// Compiles comma or space separated globs into one anchored regex.
/// `*` matches any run of characters and `?` exactly one.
#[inline]
pub(crate) fn compile_patterns(patterns: &str) -> Regex {
    Regex::new(&Patterns(patterns).to_string()).unwrap()
}

struct Patterns<'a>(&'a str);

impl fmt::Display for Patterns<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        static SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,\s]+").unwrap());

        let mut first = true;
        for glob in SEPARATOR.split(self.0).filter(|s| !s.is_empty()) {
            if !first {
                f.write_str("|")?;
            }
            first = false;
            write!(f, "^")?;
            for c in glob.chars() {
                match c {
                    '*' => f.write_str(".*")?,
                    '?' => f.write_str(".")?,
                    c => f.write_str(&regex::escape(c.encode_utf8(&mut [0; 4])))?,
                }
            }
            write!(f, "$")?;
        }
        if first {
            // nothing given, match nothing
            f.write_str("[^\\s\\S]")?;
        }
        Ok(())
    }
}

#[test]
fn test_patterns() {
    assert_eq!(Patterns("data").to_string(), "^data$");
    assert_eq!(Patterns("cal.*").to_string(), r"^cal\..*$");
    assert_eq!(Patterns("a, b?").to_string(), "^a$|^b.$");

    let regex = compile_patterns("*");
    assert!(regex.is_match("data"));
    assert!(regex.is_match("arr_0"));

    let regex = compile_patterns("data labels");
    assert!(regex.is_match("data"));
    assert!(regex.is_match("labels"));
    assert!(!regex.is_match("data2"));

    let regex = compile_patterns("cal.*");
    assert!(regex.is_match("cal.x"));
    assert!(!regex.is_match("calx"));

    assert!(!compile_patterns("").is_match("data"));
}
