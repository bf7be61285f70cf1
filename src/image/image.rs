//! Image objects extracted from a page.
//!
//! One type serves both inline images and image XObjects: an attribute
//! dictionary (abbreviations already expanded, references already
//! resolved) plus the raw payload, with a decoded-bytes accessor that
//! runs the filter pipeline.

use crate::codec;
use crate::error::Result;
use crate::model::objects::PDFObject;
use bytes::Bytes;
use std::collections::HashMap;

/// A sampled image drawn on a page.
#[derive(Debug, Clone)]
pub struct ImageObject {
    /// Resource name for XObjects; `None` for inline images
    pub name: Option<String>,
    /// Image attributes, canonical keys, references resolved
    pub attrs: HashMap<String, PDFObject>,
    /// Raw (still filtered) sample data
    rawdata: Bytes,
}

impl ImageObject {
    pub fn new(
        name: Option<String>,
        attrs: HashMap<String, PDFObject>,
        rawdata: impl Into<Bytes>,
    ) -> Self {
        Self {
            name,
            attrs,
            rawdata: rawdata.into(),
        }
    }

    pub fn width(&self) -> Option<i64> {
        self.attrs.get("Width").and_then(|v| v.as_int().ok())
    }

    pub fn height(&self) -> Option<i64> {
        self.attrs.get("Height").and_then(|v| v.as_int().ok())
    }

    pub fn bits_per_component(&self) -> Option<i64> {
        self.attrs
            .get("BitsPerComponent")
            .and_then(|v| v.as_int().ok())
    }

    /// Color space name; for array forms, the family name.
    pub fn color_space(&self) -> Option<String> {
        match self.attrs.get("ColorSpace")? {
            PDFObject::Name(name) => Some(name.clone()),
            PDFObject::Array(arr) => match arr.first() {
                Some(PDFObject::Name(name)) => Some(name.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// First filter name, if any.
    pub fn filter(&self) -> Option<String> {
        match self.attrs.get("Filter")? {
            PDFObject::Name(name) => Some(name.clone()),
            PDFObject::Array(arr) => match arr.first() {
                Some(PDFObject::Name(name)) => Some(name.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn decode_parms(&self) -> Option<&PDFObject> {
        self.attrs.get("DecodeParms")
    }

    pub fn is_mask(&self) -> bool {
        matches!(self.attrs.get("ImageMask"), Some(PDFObject::Bool(true)))
    }

    /// Raw sample data before any filter is applied.
    pub fn rawdata(&self) -> &[u8] {
        self.rawdata.as_ref()
    }

    /// Sample data after the filter pipeline. DCT and JBIG2 payloads
    /// pass through unchanged.
    pub fn decoded_data(&self) -> Result<Vec<u8>> {
        codec::apply_filters(
            self.rawdata.as_ref(),
            self.attrs.get("Filter"),
            self.attrs.get("DecodeParms"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_accessors() {
        let mut attrs = HashMap::new();
        attrs.insert("Width".to_string(), PDFObject::Int(1800));
        attrs.insert("Height".to_string(), PDFObject::Int(3113));
        attrs.insert("BitsPerComponent".to_string(), PDFObject::Int(1));
        attrs.insert(
            "Filter".to_string(),
            PDFObject::Name("CCITTFaxDecode".into()),
        );
        attrs.insert(
            "ColorSpace".to_string(),
            PDFObject::Name("DeviceGray".into()),
        );

        let image = ImageObject::new(None, attrs, Vec::new());
        assert_eq!(image.width(), Some(1800));
        assert_eq!(image.height(), Some(3113));
        assert_eq!(image.bits_per_component(), Some(1));
        assert_eq!(image.filter().as_deref(), Some("CCITTFaxDecode"));
        assert_eq!(image.color_space().as_deref(), Some("DeviceGray"));
    }

    #[test]
    fn test_decoded_data_runs_pipeline() {
        let mut attrs = HashMap::new();
        attrs.insert(
            "Filter".to_string(),
            PDFObject::Name("ASCIIHexDecode".into()),
        );
        let image = ImageObject::new(None, attrs, b"48454c4c4f>".to_vec());
        assert_eq!(image.decoded_data().unwrap(), b"HELLO");
    }
}
