//! PDF object parser.
//!
//! Assembles lexer tokens into [`PDFObject`] values, folding the
//! `N G R` token triple into indirect references with one-token
//! lookahead.

use crate::error::{PdfError, Result};
use crate::model::objects::{PDFObjRef, PDFObject};
use crate::parser::lexer::{Keyword, PSBaseParser, PSToken};
use std::collections::HashMap;

/// Parses PDF object syntax from a byte slice.
pub struct PDFParser<'a> {
    base: PSBaseParser<'a>,
    /// Lookahead buffer for pushed-back tokens
    lookahead: Vec<PSToken>,
    /// Keys that occurred more than once in a dictionary (last wins)
    duplicate_keys: Vec<String>,
}

impl<'a> PDFParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            base: PSBaseParser::new(data),
            lookahead: Vec::new(),
            duplicate_keys: Vec::new(),
        }
    }

    /// Unparsed remainder of the input.
    pub fn remaining(&self) -> &[u8] {
        self.base.remaining()
    }

    /// Current position in the input.
    pub fn tell(&self) -> usize {
        self.base.tell()
    }

    /// Duplicate dictionary keys seen so far (the later value won).
    pub fn take_duplicate_keys(&mut self) -> Vec<String> {
        std::mem::take(&mut self.duplicate_keys)
    }

    fn next_token(&mut self) -> Result<Option<PSToken>> {
        if let Some(tok) = self.lookahead.pop() {
            return Ok(Some(tok));
        }
        match self.base.next_token() {
            Some(Ok((_, tok))) => Ok(Some(tok)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn push_back(&mut self, tok: PSToken) {
        self.lookahead.push(tok);
    }

    /// Parse the next PDF object.
    pub fn parse_object(&mut self) -> Result<PDFObject> {
        let token = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
        self.token_to_object(token)
    }

    fn token_to_object(&mut self, token: PSToken) -> Result<PDFObject> {
        match token {
            PSToken::Int(n) => {
                // Possible indirect reference: objid genno R
                if let Ok(Some(tok2)) = self.next_token() {
                    if let PSToken::Int(m) = tok2 {
                        if let Ok(Some(tok3)) = self.next_token() {
                            if tok3 == PSToken::Keyword(Keyword::R) && n >= 0 && m >= 0 {
                                return Ok(PDFObject::Ref(PDFObjRef::new(n as u32, m as u32)));
                            }
                            self.push_back(tok3);
                        }
                        self.push_back(PSToken::Int(m));
                    } else {
                        self.push_back(tok2);
                    }
                }
                Ok(PDFObject::Int(n))
            }
            PSToken::Real(n) => Ok(PDFObject::Real(n)),
            PSToken::Bool(b) => Ok(PDFObject::Bool(b)),
            PSToken::Literal(s) => Ok(PDFObject::Name(s)),
            PSToken::String(s) => Ok(PDFObject::String(s)),
            PSToken::Keyword(Keyword::Null) => Ok(PDFObject::Null),
            PSToken::Keyword(Keyword::True) => Ok(PDFObject::Bool(true)),
            PSToken::Keyword(Keyword::False) => Ok(PDFObject::Bool(false)),
            PSToken::Keyword(Keyword::ArrayStart) => self.parse_array(),
            PSToken::Keyword(Keyword::DictStart) => self.parse_dict(),
            PSToken::Keyword(kw) => Err(PdfError::TokenError {
                pos: self.base.tell(),
                msg: format!(
                    "unexpected keyword: {}",
                    String::from_utf8_lossy(kw.as_bytes())
                ),
            }),
            PSToken::Array(_) => Err(PdfError::TokenError {
                pos: self.base.tell(),
                msg: "unexpected compound token".into(),
            }),
        }
    }

    fn parse_array(&mut self) -> Result<PDFObject> {
        let mut arr = Vec::new();

        loop {
            let token = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            if token == PSToken::Keyword(Keyword::ArrayEnd) {
                break;
            }
            arr.push(self.token_to_object(token)?);
        }

        Ok(PDFObject::Array(arr))
    }

    fn parse_dict(&mut self) -> Result<PDFObject> {
        let mut dict = HashMap::new();

        loop {
            let token = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            if token == PSToken::Keyword(Keyword::DictEnd) {
                break;
            }

            let key = match token {
                PSToken::Literal(name) => name,
                _ => {
                    return Err(PdfError::TokenError {
                        pos: self.base.tell(),
                        msg: "expected name as dict key".into(),
                    });
                }
            };

            let value = self.parse_object()?;
            if dict.insert(key.clone(), value).is_some() {
                // Last occurrence wins; remember the key for the caller's
                // warning channel.
                self.duplicate_keys.push(key);
            }
        }

        Ok(PDFObject::Dict(dict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_indirect_ref() {
        let mut parser = PDFParser::new(b"12 0 R");
        let obj = parser.parse_object().unwrap();
        assert_eq!(obj, PDFObject::Ref(PDFObjRef::new(12, 0)));
    }

    #[test]
    fn test_two_ints_not_a_ref() {
        let mut parser = PDFParser::new(b"12 0 obj");
        assert_eq!(parser.parse_object().unwrap(), PDFObject::Int(12));
        assert_eq!(parser.parse_object().unwrap(), PDFObject::Int(0));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let mut parser = PDFParser::new(b"<< /A 1 /A 2 >>");
        let obj = parser.parse_object().unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("A").unwrap().as_int().unwrap(), 2);
        assert_eq!(parser.take_duplicate_keys(), vec!["A".to_string()]);
    }

    #[test]
    fn test_nested_structures() {
        let mut parser = PDFParser::new(b"<< /Kids [3 0 R [1 2]] /N null >>");
        let obj = parser.parse_object().unwrap();
        let dict = obj.as_dict().unwrap();
        let kids = dict.get("Kids").unwrap().as_array().unwrap();
        assert_eq!(kids[0], PDFObject::Ref(PDFObjRef::new(3, 0)));
        assert_eq!(
            kids[1],
            PDFObject::Array(vec![PDFObject::Int(1), PDFObject::Int(2)])
        );
        assert!(dict.get("N").unwrap().is_null());
    }
}
