//! Dataset locators and the `data/<segment>/.../<file>` resource path convention.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Directory every resource path starts with.
pub const DATA_DIR: &str = "data";

/// Ordered path segments plus a terminal file name identifying one CSV resource.
///
/// Empty strings stand for "not chosen yet"; such a locator is incomplete and never loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetLocator {
    pub segments: Vec<String>,
    pub file: String,
}

impl DatasetLocator {
    pub fn new<I, S>(segments: I, file: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            file: file.into(),
        }
    }

    /// True when every segment and the file name are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.segments.is_empty()
            && self.segments.iter().all(|s| !s.is_empty())
            && !self.file.is_empty()
    }

    /// Relative resource path with each segment percent-encoded on its own.
    pub fn resource_path(&self) -> String {
        let mut path = String::from(DATA_DIR);
        for part in self.segments.iter().chain(std::iter::once(&self.file)) {
            path.push('/');
            path.push_str(&encode_component(part));
        }
        path
    }
}

impl fmt::Display for DatasetLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{} / ", segment)?;
        }
        f.write_str(&self.file)
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(b, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')')
}

/// Percent-encode one path component (same character set as `encodeURIComponent`).
pub fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            // Writing to a String cannot fail
            let _ = write!(out, "%{:02X}", b);
        }
    }
    out
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Inverse of [`encode_component`]. Malformed escapes are kept literally.
pub fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness() {
        assert!(!DatasetLocator::default().is_complete());
        assert!(!DatasetLocator::new(["dyjets", "", "TP"], "dyjets.csv").is_complete());
        assert!(!DatasetLocator::new(["dyjets", "m10", "TP"], "").is_complete());
        assert!(DatasetLocator::new(["dyjets", "m10", "TP"], "dyjets.csv").is_complete());
    }

    #[test]
    fn resource_path_encodes_each_segment() {
        let locator = DatasetLocator::new(
            ["0 jets ggh - ggh (105-106)", "m10_to_m10__Multiclass__Sigmoid", "TP"],
            "0 jets ggh - ggh (105-106).csv",
        );
        assert_eq!(
            locator.resource_path(),
            "data/0%20jets%20ggh%20-%20ggh%20(105-106)/m10_to_m10__Multiclass__Sigmoid/TP/0%20jets%20ggh%20-%20ggh%20(105-106).csv"
        );
    }

    #[test]
    fn encode_component_matches_uri_component_rules() {
        assert_eq!(encode_component("a/b"), "a%2Fb");
        assert_eq!(encode_component("x+y=z"), "x%2By%3Dz");
        assert_eq!(encode_component("é"), "%C3%A9");
        assert_eq!(encode_component("all (binary)"), "all%20(binary)");
    }

    #[test]
    fn decode_component_reverses_encoding() {
        for raw in ["2p jets high mjj - ggh (113-116)", "a/b%c", "é ü", "100%"] {
            assert_eq!(decode_component(&encode_component(raw)), raw);
        }
        assert_eq!(decode_component("bad%zzescape%"), "bad%zzescape%");
    }

    #[test]
    fn display_joins_segments_and_file() {
        let locator = DatasetLocator::new(["ttbar", "m10", "all"], "ttbar.csv");
        assert_eq!(locator.to_string(), "ttbar / m10 / all / ttbar.csv");
    }
}
