//! Font resources.
//!
//! A [`PDFFont`] is built from a (fully resolved) font spec dictionary.
//! It owns the code scanner for the font's input bytes, the ToUnicode
//! map, the simple-font encoding, and the glyph widths the interpreter
//! needs to advance the text matrix.

use super::cmap::{parse_tounicode, CMap, Code, UnicodeMap};
use super::encoding::{DiffEntry, EncodingDB};
use crate::model::objects::PDFObject;
use std::collections::HashMap;

/// Names that select the 2-byte identity CMap.
fn is_identity_cmap(name: &str) -> bool {
    matches!(name, "Identity-H" | "Identity-V" | "DLIdent-H" | "DLIdent-V")
}

/// Names that select the 1-byte identity CMap.
fn is_identity_cmap_byte(name: &str) -> bool {
    matches!(name, "OneByteIdentityH" | "OneByteIdentityV")
}

fn is_vertical_name(name: &str) -> bool {
    name.ends_with("-V") || name.ends_with('V')
}

/// Predefined 2-byte CJK CMap names the engine accepts without the CMap
/// resource files (codes pass through as CIDs).
fn is_cjk_2byte_cmap(name: &str) -> bool {
    matches!(
        name,
        "H" | "V"
            | "UniJIS-UTF16-H" | "UniJIS-UTF16-V"
            | "UniJIS-UCS2-H" | "UniJIS-UCS2-V"
            | "90ms-RKSJ-H" | "90ms-RKSJ-V"
            | "EUC-H" | "EUC-V"
            | "GBK-EUC-H" | "GBK-EUC-V"
            | "UniGB-UTF16-H" | "UniGB-UTF16-V"
            | "UniGB-UCS2-H" | "UniGB-UCS2-V"
            | "B5pc-H" | "B5pc-V"
            | "UniCNS-UTF16-H" | "UniCNS-UTF16-V"
            | "UniKS-UTF16-H" | "UniKS-UTF16-V"
            | "KSCms-UHC-H" | "KSCms-UHC-V"
    )
}

/// A font resource ready for text decoding.
#[derive(Debug)]
pub struct PDFFont {
    /// Font Subtype (Type1, TrueType, Type3, Type0, MMType1)
    pub subtype: String,
    /// BaseFont name
    pub basefont: Option<String>,
    /// Input-code scanner and CID mapping
    cmap: CMap,
    /// ToUnicode mapping, when the font carries one
    unicode_map: Option<UnicodeMap>,
    /// Simple-font byte-to-Unicode encoding
    encoding: Option<HashMap<u8, String>>,
    /// Identity text encoding (Encoding name "Identity")
    encoding_identity: bool,
    /// Glyph widths by CID, in 1/1000 em
    widths: HashMap<u32, f64>,
    default_width: f64,
    vertical: bool,
    multibyte: bool,
}

impl PDFFont {
    /// Build a font from its resolved spec dictionary.
    ///
    /// `tounicode_data` is the decoded ToUnicode stream, when present;
    /// `encoding_cmap_data` the decoded embedded Encoding CMap stream of
    /// a composite font.
    pub fn new(
        spec: &HashMap<String, PDFObject>,
        tounicode_data: Option<&[u8]>,
        encoding_cmap_data: Option<&[u8]>,
    ) -> Self {
        let subtype = spec
            .get("Subtype")
            .and_then(|s| s.as_name().ok())
            .unwrap_or("")
            .to_string();
        let is_type0 = subtype == "Type0";

        let basefont = spec.get("BaseFont").and_then(|obj| match obj {
            PDFObject::Name(name) => Some(name.clone()),
            PDFObject::String(s) => String::from_utf8(s.clone()).ok(),
            _ => None,
        });

        let (cmap, multibyte) = if is_type0 {
            (Self::composite_cmap(spec, encoding_cmap_data), true)
        } else {
            (CMap::identity_byte(0), false)
        };
        let vertical = cmap.is_vertical();

        // ToUnicode takes priority for text extraction. A parse that
        // yields no mappings is treated as absent.
        let unicode_map = tounicode_data.and_then(|data| {
            if data.is_empty() {
                return None;
            }
            match parse_tounicode(data) {
                Ok(parsed) if !parsed.unicode_map.is_empty() => Some(parsed.unicode_map),
                _ => None,
            }
        });

        // ToUnicode given as the name /Identity-H etc. means codes are
        // Unicode scalars already; model that as an empty map plus the
        // identity flag below.
        let tounicode_identity = matches!(
            spec.get("ToUnicode"),
            Some(PDFObject::Name(name)) if name.contains("Identity")
        );

        let (encoding, encoding_identity) = if is_type0 {
            (None, tounicode_identity)
        } else {
            match spec.get("Encoding") {
                Some(PDFObject::Name(name)) if name == "Identity" => (None, true),
                Some(PDFObject::Name(name)) => {
                    (Some(EncodingDB::get_encoding(name, None)), tounicode_identity)
                }
                Some(PDFObject::Dict(dict)) => {
                    let base = dict
                        .get("BaseEncoding")
                        .and_then(|obj| obj.as_name().ok())
                        .unwrap_or("StandardEncoding");
                    let differences = Self::parse_differences(dict.get("Differences"));
                    (
                        Some(EncodingDB::get_encoding(base, differences.as_deref())),
                        tounicode_identity,
                    )
                }
                // Simple fonts without an Encoding entry read as
                // StandardEncoding.
                _ => (
                    Some(EncodingDB::get_encoding("StandardEncoding", None)),
                    tounicode_identity,
                ),
            }
        };

        let widths = Self::parse_widths(spec);
        let default_width = spec
            .get("DW")
            .and_then(|obj| obj.as_num().ok())
            .unwrap_or(1000.0);

        Self {
            subtype,
            basefont,
            cmap,
            unicode_map,
            encoding,
            encoding_identity,
            widths,
            default_width,
            vertical,
            multibyte,
        }
    }

    /// Pick the code scanner for a composite font's Encoding entry.
    fn composite_cmap(spec: &HashMap<String, PDFObject>, cmap_data: Option<&[u8]>) -> CMap {
        let name = match spec.get("Encoding") {
            Some(PDFObject::Name(name)) => Some(name.as_str()),
            Some(PDFObject::Stream(stream)) => match stream.get("CMapName") {
                Some(PDFObject::Name(name)) => Some(name.as_str()),
                Some(PDFObject::String(bytes)) => std::str::from_utf8(bytes).ok(),
                _ => None,
            },
            _ => None,
        };

        // An embedded CMap stream defines its own codespaces.
        if let Some(data) = cmap_data {
            if let Ok(parsed) = super::cmap::CMapParser::new(data).parse() {
                if parsed.cmap.has_codespaces() {
                    let mut cmap = parsed.cmap;
                    if let Some(name) = name {
                        if cmap.name().is_none() {
                            cmap.attrs.insert("CMapName".into(), name.to_string());
                        }
                    }
                    return cmap;
                }
            }
        }

        match name {
            Some(name) if is_identity_cmap_byte(name) => {
                CMap::identity_byte(is_vertical_name(name) as i32)
            }
            Some(name) if is_identity_cmap(name) => CMap::identity(is_vertical_name(name) as i32),
            Some(name) if is_cjk_2byte_cmap(name) => {
                let mut cmap = CMap::identity(is_vertical_name(name) as i32);
                cmap.attrs.insert("CMapName".into(), name.to_string());
                cmap
            }
            Some(name) => {
                // Unknown predefined CMap: scan 2-byte codes so the text
                // machinery keeps moving.
                let mut cmap = CMap::identity(is_vertical_name(name) as i32);
                cmap.attrs.insert("CMapName".into(), name.to_string());
                cmap
            }
            None => CMap::identity(0),
        }
    }

    fn parse_differences(diff_obj: Option<&PDFObject>) -> Option<Vec<DiffEntry>> {
        let arr = match diff_obj {
            Some(PDFObject::Array(a)) => a,
            _ => return None,
        };

        let mut result = Vec::with_capacity(arr.len());
        for item in arr {
            match item {
                PDFObject::Int(n) if (0..=255).contains(n) => {
                    result.push(DiffEntry::Code(*n as u8));
                }
                PDFObject::Name(name) => result.push(DiffEntry::Name(name.clone())),
                _ => {}
            }
        }

        Some(result)
    }

    /// Parse glyph widths: the CID-font `W` array or the simple-font
    /// `Widths` + `FirstChar` pair.
    fn parse_widths(spec: &HashMap<String, PDFObject>) -> HashMap<u32, f64> {
        let mut widths = HashMap::new();

        if let Some(PDFObject::Array(w_array)) = spec.get("W") {
            // Two run formats: `cid [w1 w2 ...]` and `cid_lo cid_hi w`.
            let mut run: Vec<f64> = Vec::new();
            for item in w_array {
                match item {
                    PDFObject::Array(arr) => {
                        if let Some(start) = run.pop() {
                            for (i, w) in arr.iter().enumerate() {
                                if let Ok(width) = w.as_num() {
                                    widths.insert(start as u32 + i as u32, width);
                                }
                            }
                        }
                        run.clear();
                    }
                    other => {
                        if let Ok(n) = other.as_num() {
                            run.push(n);
                            if run.len() == 3 {
                                let (lo, hi, w) = (run[0] as u32, run[1] as u32, run[2]);
                                for cid in lo..=hi.min(lo.saturating_add(65535)) {
                                    widths.insert(cid, w);
                                }
                                run.clear();
                            }
                        }
                    }
                }
            }
        }

        if widths.is_empty() {
            if let Some(PDFObject::Array(widths_array)) = spec.get("Widths") {
                let first_char = spec
                    .get("FirstChar")
                    .and_then(|v| v.as_int().ok())
                    .unwrap_or(0)
                    .max(0) as u32;
                for (i, width_obj) in widths_array.iter().enumerate() {
                    if let Ok(width) = width_obj.as_num() {
                        widths.insert(first_char + i as u32, width);
                    }
                }
            }
        }

        widths
    }

    /// Split raw string bytes into input codes. The flag is false for
    /// bytes that matched no codespace.
    pub fn decode(&self, data: &[u8]) -> Vec<(Code, bool)> {
        self.cmap.scan_codes(data)
    }

    /// Translate one code to Unicode text.
    ///
    /// Order: ToUnicode CMap, then the simple-font encoding, then the
    /// identity interpretation when the encoding declares it. `None`
    /// means unmapped; the caller substitutes U+FFFD.
    pub fn to_unicode(&self, code: Code) -> Option<String> {
        if let Some(map) = &self.unicode_map {
            if let Some(text) = map.get(code) {
                return Some(text);
            }
        }

        if let Some(encoding) = &self.encoding {
            if code.1 <= 255 {
                if let Some(text) = encoding.get(&(code.1 as u8)) {
                    return Some(text.clone());
                }
            }
        }

        if self.encoding_identity {
            return char::from_u32(code.1).map(|c| c.to_string());
        }

        None
    }

    /// The CID for an input code.
    pub fn cid(&self, code: Code) -> u32 {
        self.cmap.cid(code)
    }

    /// Glyph width for a CID in text space units (em/1000 applied).
    pub fn char_width(&self, cid: u32) -> f64 {
        self.widths.get(&cid).copied().unwrap_or(self.default_width) * 0.001
    }

    pub fn is_vertical(&self) -> bool {
        self.vertical
    }

    pub fn is_multibyte(&self) -> bool {
        self.multibyte
    }

    /// The CMapName of the font's code scanner, if declared.
    pub fn cmap_name(&self) -> Option<&str> {
        self.cmap.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_spec(encoding: Option<PDFObject>) -> HashMap<String, PDFObject> {
        let mut spec = HashMap::new();
        spec.insert("Subtype".to_string(), PDFObject::Name("Type1".into()));
        spec.insert("BaseFont".to_string(), PDFObject::Name("Helvetica".into()));
        if let Some(encoding) = encoding {
            spec.insert("Encoding".to_string(), encoding);
        }
        spec
    }

    #[test]
    fn test_simple_font_decodes_bytes() {
        let font = PDFFont::new(
            &simple_spec(Some(PDFObject::Name("WinAnsiEncoding".into()))),
            None,
            None,
        );
        let codes = font.decode(b"Hi");
        assert_eq!(codes.len(), 2);
        assert_eq!(font.to_unicode(codes[0].0).as_deref(), Some("H"));
        assert_eq!(font.to_unicode(codes[1].0).as_deref(), Some("i"));
    }

    #[test]
    fn test_differences_override() {
        let mut enc_dict = HashMap::new();
        enc_dict.insert(
            "BaseEncoding".to_string(),
            PDFObject::Name("WinAnsiEncoding".into()),
        );
        enc_dict.insert(
            "Differences".to_string(),
            PDFObject::Array(vec![
                PDFObject::Int(72),
                PDFObject::Name("bullet".into()),
            ]),
        );
        let font = PDFFont::new(&simple_spec(Some(PDFObject::Dict(enc_dict))), None, None);
        let codes = font.decode(b"H");
        assert_eq!(font.to_unicode(codes[0].0).as_deref(), Some("\u{2022}"));
    }

    #[test]
    fn test_type0_identity_two_byte() {
        let mut spec = HashMap::new();
        spec.insert("Subtype".to_string(), PDFObject::Name("Type0".into()));
        spec.insert("Encoding".to_string(), PDFObject::Name("Identity-H".into()));
        let font = PDFFont::new(&spec, None, None);
        let codes = font.decode(&[0x00, 0x41, 0x00, 0x42]);
        assert_eq!(codes, vec![((2, 0x41), true), ((2, 0x42), true)]);
        assert!(font.is_multibyte());
        // No ToUnicode: codes stay unmapped.
        assert_eq!(font.to_unicode((2, 0x41)), None);
    }

    #[test]
    fn test_type0_tounicode() {
        let tounicode = b"1 begincodespacerange <0000> <FFFF> endcodespacerange
1 beginbfchar <0041> <0058> endbfchar endcmap";
        let mut spec = HashMap::new();
        spec.insert("Subtype".to_string(), PDFObject::Name("Type0".into()));
        spec.insert("Encoding".to_string(), PDFObject::Name("Identity-H".into()));
        let font = PDFFont::new(&spec, Some(tounicode), None);
        assert_eq!(font.to_unicode((2, 0x41)).as_deref(), Some("X"));
    }

    #[test]
    fn test_widths_simple() {
        let mut spec = simple_spec(None);
        spec.insert("FirstChar".to_string(), PDFObject::Int(65));
        spec.insert(
            "Widths".to_string(),
            PDFObject::Array(vec![PDFObject::Int(500), PDFObject::Int(600)]),
        );
        let font = PDFFont::new(&spec, None, None);
        assert_eq!(font.char_width(65), 0.5);
        assert_eq!(font.char_width(66), 0.6);
        assert_eq!(font.char_width(67), 1.0); // default
    }

    #[test]
    fn test_widths_cid_formats() {
        let mut spec = HashMap::new();
        spec.insert("Subtype".to_string(), PDFObject::Name("Type0".into()));
        spec.insert(
            "W".to_string(),
            PDFObject::Array(vec![
                PDFObject::Int(1),
                PDFObject::Array(vec![PDFObject::Int(250), PDFObject::Int(300)]),
                PDFObject::Int(10),
                PDFObject::Int(12),
                PDFObject::Int(400),
            ]),
        );
        let font = PDFFont::new(&spec, None, None);
        assert_eq!(font.char_width(1), 0.25);
        assert_eq!(font.char_width(2), 0.3);
        assert_eq!(font.char_width(11), 0.4);
    }

    #[test]
    fn test_vertical_cmap_name() {
        let mut spec = HashMap::new();
        spec.insert("Subtype".to_string(), PDFObject::Name("Type0".into()));
        spec.insert("Encoding".to_string(), PDFObject::Name("Identity-V".into()));
        let font = PDFFont::new(&spec, None, None);
        assert!(font.is_vertical());
    }
}
