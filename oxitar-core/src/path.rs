//! Path helpers for archive-stored names.

use std::path::{MAIN_SEPARATOR, PathBuf};

/// Convert an archive-stored name (always `/`-separated) into a platform path.
pub fn normalize_separators(name: &str) -> PathBuf {
    if MAIN_SEPARATOR == '/' {
        PathBuf::from(name)
    } else {
        PathBuf::from(name.replace('/', MAIN_SEPARATOR.encode_utf8(&mut [0u8; 4])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_separators() {
        let path = normalize_separators("usr/share/doc/readme");
        let parts: Vec<_> = path.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(parts, ["usr", "share", "doc", "readme"]);
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_separators(""), PathBuf::new());
    }
}
