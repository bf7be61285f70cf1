//! Content-stream parsing.
//!
//! Content streams are sequences of operands followed by an operator.
//! [`ContentParser`] tokenizes the page's streams (concatenated with a
//! single space separator), groups operands under their operator, and
//! handles the `BI … ID … EI` inline-image construct, whose payload
//! length is found by scanning for the end marker at a token boundary.

use crate::model::color::{INLINE_COLORSPACE_ABBREV, INLINE_FILTER_ABBREV};
use crate::model::objects::PDFObject;
use crate::parser::lexer::{is_whitespace, Keyword, PSBaseParser, PSToken};
use std::collections::HashMap;
use std::rc::Rc;

/// One event from the content stream.
#[derive(Debug, Clone)]
pub enum ContentOp {
    /// An operator with its collected operands, in source order.
    Operator {
        keyword: Keyword,
        operands: Vec<PDFObject>,
    },
    /// An inline image: expanded attribute dictionary plus raw payload.
    InlineImage {
        attrs: HashMap<String, PDFObject>,
        data: Vec<u8>,
    },
}

/// Canonical key for an abbreviated inline-image dictionary entry.
fn expand_inline_key(key: &str) -> &str {
    match key {
        "BPC" => "BitsPerComponent",
        "CS" => "ColorSpace",
        "W" => "Width",
        "H" => "Height",
        "IM" => "ImageMask",
        "DP" => "DecodeParms",
        "F" => "Filter",
        "D" => "Decode",
        "I" => "Interpolate",
        other => other,
    }
}

/// Canonical value for abbreviated filter / color space names.
fn expand_inline_value(key: &str, value: PDFObject) -> PDFObject {
    let expand = |name: String| -> PDFObject {
        let expanded = match key {
            "Filter" => INLINE_FILTER_ABBREV.get(name.as_str()).copied(),
            "ColorSpace" => INLINE_COLORSPACE_ABBREV.get(name.as_str()).copied(),
            _ => None,
        };
        PDFObject::Name(expanded.map(str::to_string).unwrap_or(name))
    };

    match value {
        PDFObject::Name(name) => expand(name),
        PDFObject::Array(arr) => PDFObject::Array(
            arr.into_iter()
                .map(|item| match item {
                    PDFObject::Name(name) => expand(name),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

/// Collection frame for nested arrays and dictionaries.
enum Frame {
    Array(Vec<PDFObject>),
    Dict(Vec<PDFObject>),
}

/// Parser producing [`ContentOp`]s from a page's content streams.
pub struct ContentParser {
    data: Rc<[u8]>,
    lexer: PSBaseParser<'static>,
    operands: Vec<PDFObject>,
    frames: Vec<Frame>,
    /// Between BI and ID: operands form the image dictionary.
    in_image_dict: bool,
}

impl ContentParser {
    /// Join the streams with single-space separators and parse the whole.
    pub fn new(streams: &[Vec<u8>]) -> Self {
        let total: usize = streams.iter().map(Vec::len).sum();
        let mut joined = Vec::with_capacity(total + streams.len());
        for (i, stream) in streams.iter().enumerate() {
            if i > 0 {
                joined.push(b' ');
            }
            joined.extend_from_slice(stream);
        }
        let data: Rc<[u8]> = joined.into();
        let lexer = PSBaseParser::new_shared(Rc::clone(&data));

        Self {
            data,
            lexer,
            operands: Vec::new(),
            frames: Vec::new(),
            in_image_dict: false,
        }
    }

    fn push_value(&mut self, value: PDFObject) {
        match self.frames.last_mut() {
            Some(Frame::Array(items)) | Some(Frame::Dict(items)) => items.push(value),
            None => self.operands.push(value),
        }
    }

    fn token_to_object(token: PSToken) -> Option<PDFObject> {
        match token {
            PSToken::Int(n) => Some(PDFObject::Int(n)),
            PSToken::Real(n) => Some(PDFObject::Real(n)),
            PSToken::Bool(b) => Some(PDFObject::Bool(b)),
            PSToken::Literal(name) => Some(PDFObject::Name(name)),
            PSToken::String(s) => Some(PDFObject::String(s)),
            PSToken::Array(_) | PSToken::Keyword(_) => None,
        }
    }

    fn build_dict(items: Vec<PDFObject>) -> HashMap<String, PDFObject> {
        let mut dict = HashMap::new();
        let mut iter = items.into_iter();
        while let Some(key) = iter.next() {
            if let PDFObject::Name(name) = key {
                if let Some(value) = iter.next() {
                    dict.insert(name, value);
                }
            }
        }
        dict
    }

    /// Assemble the inline image dictionary from the operands between BI
    /// and ID, expanding abbreviated keys and values.
    fn build_image_attrs(&mut self) -> HashMap<String, PDFObject> {
        let mut attrs = HashMap::new();
        let mut iter = std::mem::take(&mut self.operands).into_iter();
        while let Some(key) = iter.next() {
            if let PDFObject::Name(name) = key {
                if let Some(value) = iter.next() {
                    let key = expand_inline_key(&name).to_string();
                    let value = expand_inline_value(&key, value);
                    attrs.insert(key, value);
                }
            }
        }
        attrs
    }

    /// The end marker for the inline payload: `~>` when the first filter
    /// is ASCII85, otherwise `EI`.
    fn image_end_marker(attrs: &HashMap<String, PDFObject>) -> &'static [u8] {
        let first_filter = match attrs.get("Filter") {
            Some(PDFObject::Name(name)) => Some(name.as_str()),
            Some(PDFObject::Array(arr)) => match arr.first() {
                Some(PDFObject::Name(name)) => Some(name.as_str()),
                _ => None,
            },
            _ => None,
        };
        match first_filter {
            Some("ASCII85Decode") => b"~>",
            _ => b"EI",
        }
    }

    /// Read the raw payload after ID up to the end marker at a token
    /// boundary. Trailing EOL bytes before the marker are trimmed.
    fn read_image_data(&mut self, target: &[u8]) -> Vec<u8> {
        let data = Rc::clone(&self.data);
        let data: &[u8] = &data;
        let mut pos = self.lexer.tell();

        // Exactly one whitespace byte separates ID from the payload.
        if pos < data.len() && is_whitespace(data[pos]) {
            pos += 1;
        }

        let start = pos;
        let mut end = data.len();
        let mut after = data.len();
        while pos + target.len() <= data.len() {
            if &data[pos..pos + target.len()] == target {
                let next = data.get(pos + target.len()).copied();
                if next.is_none() || next.is_some_and(is_whitespace) {
                    end = pos;
                    after = pos + target.len();
                    break;
                }
            }
            pos += 1;
        }

        let mut payload = data[start..end].to_vec();
        while matches!(payload.last(), Some(b' ') | Some(b'\r') | Some(b'\n')) {
            payload.pop();
        }

        self.lexer.set_pos(after);
        payload
    }

    /// Produce the next operator or inline image.
    pub fn next_op(&mut self) -> Option<ContentOp> {
        loop {
            let token = match self.lexer.next_token() {
                Some(Ok((_, token))) => token,
                Some(Err(_)) => {
                    // Skip the offending byte and resynchronize.
                    let pos = self.lexer.tell();
                    self.lexer.set_pos(pos + 1);
                    continue;
                }
                None => return None,
            };

            let keyword = match token {
                PSToken::Keyword(kw) => kw,
                other => {
                    if let Some(obj) = Self::token_to_object(other) {
                        self.push_value(obj);
                    }
                    continue;
                }
            };

            match keyword {
                Keyword::ArrayStart => self.frames.push(Frame::Array(Vec::new())),
                Keyword::ArrayEnd => {
                    if let Some(Frame::Array(items)) = self.frames.pop() {
                        self.push_value(PDFObject::Array(items));
                    }
                }
                Keyword::DictStart => self.frames.push(Frame::Dict(Vec::new())),
                Keyword::DictEnd => {
                    if let Some(Frame::Dict(items)) = self.frames.pop() {
                        self.push_value(PDFObject::Dict(Self::build_dict(items)));
                    }
                }
                // Procedures are not content operators; fold their items
                // into an array so the operand count stays sane.
                Keyword::BraceOpen => self.frames.push(Frame::Array(Vec::new())),
                Keyword::BraceClose => {
                    if let Some(Frame::Array(items)) = self.frames.pop() {
                        self.push_value(PDFObject::Array(items));
                    }
                }

                Keyword::True => self.push_value(PDFObject::Bool(true)),
                Keyword::False => self.push_value(PDFObject::Bool(false)),
                Keyword::Null => self.push_value(PDFObject::Null),

                Keyword::BI => {
                    self.in_image_dict = true;
                    self.operands.clear();
                }
                Keyword::ID if self.in_image_dict => {
                    self.in_image_dict = false;
                    let attrs = self.build_image_attrs();
                    let marker = Self::image_end_marker(&attrs);
                    let data = self.read_image_data(marker);
                    return Some(ContentOp::InlineImage { attrs, data });
                }
                Keyword::EI => {
                    // Stray EI outside an image; drop it.
                    self.operands.clear();
                }

                kw => {
                    if self.in_image_dict {
                        // Keywords inside the image dict are malformed;
                        // ignore them.
                        continue;
                    }
                    if !self.frames.is_empty() {
                        // Keyword inside an array/dict literal: ignore.
                        continue;
                    }
                    let operands = std::mem::take(&mut self.operands);
                    return Some(ContentOp::Operator {
                        keyword: kw,
                        operands,
                    });
                }
            }
        }
    }
}

impl Iterator for ContentParser {
    type Item = ContentOp;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_op()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(data: &[u8]) -> Vec<ContentOp> {
        ContentParser::new(&[data.to_vec()]).collect()
    }

    #[test]
    fn test_operands_group_under_operator() {
        let result = ops(b"1 0 0 1 100 200 cm BT ET");
        assert_eq!(result.len(), 3);
        match &result[0] {
            ContentOp::Operator { keyword, operands } => {
                assert_eq!(*keyword, Keyword::Cm);
                assert_eq!(operands.len(), 6);
            }
            _ => panic!("expected operator"),
        }
    }

    #[test]
    fn test_tj_array() {
        let result = ops(b"[(Hello) -250 (World)] TJ");
        match &result[0] {
            ContentOp::Operator { keyword, operands } => {
                assert_eq!(*keyword, Keyword::TJ);
                let arr = operands[0].as_array().unwrap();
                assert_eq!(arr.len(), 3);
                assert_eq!(arr[0], PDFObject::String(b"Hello".to_vec()));
                assert_eq!(arr[1], PDFObject::Int(-250));
            }
            _ => panic!("expected operator"),
        }
    }

    #[test]
    fn test_inline_image() {
        let result = ops(b"BI /W 2 /H 2 /BPC 8 /CS /G /F /CCF ID \x01\x02\x03\x04 EI Q");
        match &result[0] {
            ContentOp::InlineImage { attrs, data } => {
                assert_eq!(attrs.get("Width").unwrap().as_int().unwrap(), 2);
                assert_eq!(
                    attrs.get("ColorSpace").unwrap().as_name().unwrap(),
                    "DeviceGray"
                );
                assert_eq!(
                    attrs.get("Filter").unwrap().as_name().unwrap(),
                    "CCITTFaxDecode"
                );
                assert_eq!(data, &[0x01, 0x02, 0x03, 0x04]);
            }
            _ => panic!("expected inline image"),
        }
        assert!(matches!(
            result[1],
            ContentOp::Operator {
                keyword: Keyword::QQ,
                ..
            }
        ));
    }

    #[test]
    fn test_inline_image_ei_inside_payload() {
        // "EI" not at a token boundary must not terminate the payload.
        let result = ops(b"BI /W 1 /H 1 ID EIX EI n");
        match &result[0] {
            ContentOp::InlineImage { data, .. } => {
                assert_eq!(data, b"EIX");
            }
            _ => panic!("expected inline image"),
        }
    }

    #[test]
    fn test_streams_joined_with_space() {
        let parts = vec![b"BT".to_vec(), b"ET".to_vec()];
        let result: Vec<ContentOp> = ContentParser::new(&parts).collect();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_bdc_with_dict_operand() {
        let result = ops(b"/Span << /MCID 0 >> BDC EMC");
        match &result[0] {
            ContentOp::Operator { keyword, operands } => {
                assert_eq!(*keyword, Keyword::BDC);
                assert_eq!(operands.len(), 2);
                assert!(matches!(operands[1], PDFObject::Dict(_)));
            }
            _ => panic!("expected operator"),
        }
    }
}
