//! PDF color space definitions.

use std::collections::HashMap;
use std::sync::LazyLock;

/// A PDF color space: name plus component count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PDFColorSpace {
    pub name: String,
    pub ncomponents: usize,
}

impl PDFColorSpace {
    pub fn new(name: &str, ncomponents: usize) -> Self {
        Self {
            name: name.to_string(),
            ncomponents,
        }
    }
}

/// Predefined PDF color spaces. DeviceGray is the default.
pub static PREDEFINED_COLORSPACE: LazyLock<HashMap<&'static str, PDFColorSpace>> =
    LazyLock::new(|| {
        let entries = [
            ("DeviceGray", 1),
            ("CalGray", 1),
            ("CalRGB", 3),
            ("Lab", 3),
            ("DeviceRGB", 3),
            ("DeviceCMYK", 4),
            ("Separation", 1),
            ("Indexed", 1),
            ("Pattern", 1),
        ];

        let mut map = HashMap::with_capacity(entries.len());
        for (name, n) in entries {
            map.insert(name, PDFColorSpace::new(name, n));
        }
        map
    });

/// Inline image color space abbreviations (PDF 1.7 table 93).
pub static INLINE_COLORSPACE_ABBREV: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        HashMap::from([
            ("G", "DeviceGray"),
            ("RGB", "DeviceRGB"),
            ("CMYK", "DeviceCMYK"),
            ("I", "Indexed"),
        ])
    });

/// Inline image filter abbreviations (PDF 1.7 table 94).
pub static INLINE_FILTER_ABBREV: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        HashMap::from([
            ("AHx", "ASCIIHexDecode"),
            ("A85", "ASCII85Decode"),
            ("LZW", "LZWDecode"),
            ("Fl", "FlateDecode"),
            ("RL", "RunLengthDecode"),
            ("CCF", "CCITTFaxDecode"),
            ("DCT", "DCTDecode"),
        ])
    });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_colorspaces() {
        assert_eq!(PREDEFINED_COLORSPACE.get("DeviceRGB").unwrap().ncomponents, 3);
        assert_eq!(PREDEFINED_COLORSPACE.get("DeviceCMYK").unwrap().ncomponents, 4);
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(*INLINE_COLORSPACE_ABBREV.get("G").unwrap(), "DeviceGray");
        assert_eq!(*INLINE_FILTER_ABBREV.get("CCF").unwrap(), "CCITTFaxDecode");
    }
}
