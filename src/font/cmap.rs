//! Character maps.
//!
//! A CMap translates font input byte sequences into codes (and CIDs for
//! composite fonts); a [`UnicodeMap`] translates codes into Unicode text.
//! CMap files are PostScript-like programs, but the subset CMaps use is
//! small, so [`CMapParser`] drives the ordinary tokenizer and interprets
//! just the dozen CMap operators.

use crate::error::{PdfError, Result};
use crate::font::encoding::name2unicode;
use crate::parser::lexer::{Keyword, PSBaseParser, PSToken};
use std::collections::HashMap;

/// A code, at most 4 bytes, as (length, big-endian value).
pub type Code = (u8, u32);

fn code_of(bytes: &[u8]) -> Option<Code> {
    if bytes.is_empty() || bytes.len() > 4 {
        return None;
    }
    let mut value = 0u32;
    for &b in bytes {
        value = (value << 8) | b as u32;
    }
    Some((bytes.len() as u8, value))
}

/// A declared codespace range: byte sequences of one length between a low
/// and a high bound.
#[derive(Debug, Clone, PartialEq)]
pub struct CodespaceRange {
    pub nbytes: u8,
    pub low: u32,
    pub high: u32,
}

impl CodespaceRange {
    fn contains(&self, code: Code) -> bool {
        code.0 == self.nbytes && (self.low..=self.high).contains(&code.1)
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.nbytes == other.nbytes && self.low <= other.high && other.low <= self.high
    }
}

/// A range mapping codes to consecutive CIDs.
#[derive(Debug, Clone)]
struct CidRange {
    nbytes: u8,
    low: u32,
    high: u32,
    cid_start: u32,
}

/// Byte-sequence to code/CID mapping for one font.
#[derive(Debug, Default)]
pub struct CMap {
    /// CMap attributes (CMapName, Registry, Ordering)
    pub attrs: HashMap<String, String>,
    /// Writing mode: 0 horizontal, 1 vertical
    pub wmode: i32,
    codespaces: Vec<CodespaceRange>,
    code2cid: HashMap<Code, u32>,
    ranges: Vec<CidRange>,
}

impl CMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The 2-byte identity CMap (Identity-H / Identity-V).
    pub fn identity(wmode: i32) -> Self {
        let mut cmap = Self::new();
        cmap.wmode = wmode;
        cmap.codespaces.push(CodespaceRange {
            nbytes: 2,
            low: 0x0000,
            high: 0xffff,
        });
        cmap
    }

    /// The 1-byte identity CMap (OneByteIdentityH / OneByteIdentityV).
    pub fn identity_byte(wmode: i32) -> Self {
        let mut cmap = Self::new();
        cmap.wmode = wmode;
        cmap.codespaces.push(CodespaceRange {
            nbytes: 1,
            low: 0x00,
            high: 0xff,
        });
        cmap
    }

    pub fn is_vertical(&self) -> bool {
        self.wmode != 0
    }

    /// The CMapName attribute, if declared.
    pub fn name(&self) -> Option<&str> {
        self.attrs.get("CMapName").map(String::as_str)
    }

    /// Declare a codespace range. Ranges may not overlap.
    pub fn add_codespace(&mut self, low: &[u8], high: &[u8]) -> Result<()> {
        if low.len() != high.len() || low.is_empty() || low.len() > 4 {
            return Err(PdfError::CMapError(format!(
                "bad codespace bounds: {:02x?} {:02x?}",
                low, high
            )));
        }
        let range = CodespaceRange {
            nbytes: low.len() as u8,
            low: code_of(low).unwrap().1,
            high: code_of(high).unwrap().1,
        };
        if range.low > range.high {
            return Err(PdfError::CMapError("inverted codespace range".into()));
        }
        if let Some(existing) = self.codespaces.iter().find(|r| r.overlaps(&range)) {
            return Err(PdfError::CMapError(format!(
                "overlapping codespace ranges: {:x}-{:x} and {:x}-{:x}",
                existing.low, existing.high, range.low, range.high
            )));
        }
        self.codespaces.push(range);
        Ok(())
    }

    pub fn codespaces(&self) -> &[CodespaceRange] {
        &self.codespaces
    }

    pub fn has_codespaces(&self) -> bool {
        !self.codespaces.is_empty()
    }

    /// Map one code to a CID.
    pub fn add_code2cid(&mut self, code: &[u8], cid: u32) {
        if let Some(code) = code_of(code) {
            self.code2cid.insert(code, cid);
        }
    }

    /// Map a code range to consecutive CIDs starting at `cid_start`.
    pub fn add_cid_range(&mut self, low: &[u8], high: &[u8], cid_start: u32) {
        if low.len() != high.len() {
            return;
        }
        if let (Some(low), Some(high)) = (code_of(low), code_of(high)) {
            self.ranges.push(CidRange {
                nbytes: low.0,
                low: low.1,
                high: high.1,
                cid_start,
            });
        }
    }

    /// Look up the CID for a code. Codes without an explicit mapping
    /// identity-map to their value.
    pub fn cid(&self, code: Code) -> u32 {
        if let Some(&cid) = self.code2cid.get(&code) {
            return cid;
        }
        for range in &self.ranges {
            if range.nbytes == code.0 && (range.low..=range.high).contains(&code.1) {
                return range.cid_start + (code.1 - range.low);
            }
        }
        code.1
    }

    /// Split raw string bytes into codes by greedy longest match against
    /// the codespace ranges. Bytes matching no codespace are consumed one
    /// at a time and flagged (`false` in the pair).
    pub fn scan_codes(&self, data: &[u8]) -> Vec<(Code, bool)> {
        let mut out = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            let mut matched = None;
            let max_len = 4.min(data.len() - pos);
            for len in (1..=max_len).rev() {
                let code = match code_of(&data[pos..pos + len]) {
                    Some(code) => code,
                    None => continue,
                };
                if self.codespaces.iter().any(|r| r.contains(code)) {
                    matched = Some(code);
                    break;
                }
            }

            match matched {
                Some(code) => {
                    out.push((code, true));
                    pos += code.0 as usize;
                }
                None => {
                    out.push(((1, data[pos] as u32), false));
                    pos += 1;
                }
            }
        }

        out
    }
}

/// Code to Unicode mapping extracted from a ToUnicode CMap.
#[derive(Debug, Default)]
pub struct UnicodeMap {
    single: HashMap<Code, String>,
    ranges: Vec<BfRange>,
}

#[derive(Debug)]
struct BfRange {
    nbytes: u8,
    low: u32,
    high: u32,
    /// UTF-16BE bytes of the destination for the low end; the tail bytes
    /// increment across the range.
    dst: Vec<u8>,
}

impl UnicodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.ranges.is_empty()
    }

    /// Map a single code to the Unicode text encoded as UTF-16BE bytes.
    pub fn add_char(&mut self, code: Code, utf16be: &[u8]) {
        let text = decode_utf16be(utf16be);
        // A non-breaking space must not shadow a plain space already
        // mapped for the same code.
        if text == "\u{00a0}" {
            if let Some(existing) = self.single.get(&code) {
                if existing == " " {
                    return;
                }
            }
        }
        self.single.insert(code, text);
    }

    /// Map a code range to Unicode starting at the given UTF-16BE bytes.
    pub fn add_range(&mut self, low: Code, high: Code, dst: Vec<u8>) {
        if low.0 != high.0 || low.1 > high.1 {
            return;
        }
        self.ranges.push(BfRange {
            nbytes: low.0,
            low: low.1,
            high: high.1,
            dst,
        });
    }

    /// Unicode text for a code, if mapped.
    ///
    /// Ranges increment the final (up to) four destination bytes as a
    /// big-endian counter, preserving any prefix, then decode UTF-16BE.
    pub fn get(&self, code: Code) -> Option<String> {
        if let Some(s) = self.single.get(&code) {
            return Some(s.clone());
        }

        for range in &self.ranges {
            if range.nbytes == code.0 && (range.low..=range.high).contains(&code.1) {
                let offset = code.1 - range.low;
                let bytes = &range.dst;
                let var_start = bytes.len().saturating_sub(4);
                let (prefix, var) = bytes.split_at(var_start);

                let mut base = 0u32;
                for &b in var {
                    base = (base << 8) | b as u32;
                }
                let incremented = base.wrapping_add(offset).to_be_bytes();

                let mut result = prefix.to_vec();
                result.extend_from_slice(&incremented[4 - var.len()..]);
                return Some(decode_utf16be(&result));
            }
        }

        None
    }
}

fn decode_utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .filter(|chunk| chunk.len() == 2)
        .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// The result of parsing one CMap file.
#[derive(Debug, Default)]
pub struct ParsedCMap {
    /// Codespaces and CID mappings
    pub cmap: CMap,
    /// bf mappings (code to Unicode)
    pub unicode_map: UnicodeMap,
    /// Name given to `usecmap`, if any
    pub usecmap: Option<String>,
}

/// Which begin/end section the parser is inside.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    None,
    Codespace,
    BfChar,
    BfRange,
    CidChar,
    CidRange,
    NotDef,
}

/// Parser for CMap files.
pub struct CMapParser<'a> {
    lexer: PSBaseParser<'a>,
    stack: Vec<PSToken>,
    section: Section,
}

impl<'a> CMapParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: PSBaseParser::new(data),
            stack: Vec::new(),
            section: Section::None,
        }
    }

    /// Run the parser over the whole file.
    pub fn parse(mut self) -> Result<ParsedCMap> {
        let mut out = ParsedCMap::default();

        while let Some(token) = self.lexer.next_token() {
            let (_, token) = match token {
                Ok(t) => t,
                // CMap bodies may carry binary sections we do not
                // understand; skip the bad byte and continue.
                Err(_) => continue,
            };

            match token {
                PSToken::Keyword(kw) => self.handle_keyword(kw, &mut out)?,
                other => self.stack.push(other),
            }
        }

        Ok(out)
    }

    fn handle_keyword(&mut self, kw: Keyword, out: &mut ParsedCMap) -> Result<()> {
        match kw {
            Keyword::BeginCodeSpaceRange => self.begin(Section::Codespace),
            Keyword::BeginBfChar => self.begin(Section::BfChar),
            Keyword::BeginBfRange => self.begin(Section::BfRange),
            Keyword::BeginCidChar => self.begin(Section::CidChar),
            Keyword::BeginCidRange => self.begin(Section::CidRange),
            Keyword::BeginNotDefChar | Keyword::BeginNotDefRange => self.begin(Section::NotDef),

            Keyword::EndCodeSpaceRange => {
                let items = self.end(Section::Codespace);
                for pair in items.chunks(2) {
                    if let [PSToken::String(low), PSToken::String(high)] = pair {
                        out.cmap.add_codespace(low, high)?;
                    }
                }
            }
            Keyword::EndBfChar => {
                let items = self.end(Section::BfChar);
                for pair in items.chunks(2) {
                    let (code, dst) = match pair {
                        [PSToken::String(code), dst] => (code, dst),
                        _ => continue,
                    };
                    let code = match code_of(code) {
                        Some(code) => code,
                        None => continue,
                    };
                    match dst {
                        PSToken::String(bytes) => out.unicode_map.add_char(code, bytes),
                        // Destination may be a glyph name.
                        PSToken::Literal(name) => {
                            if let Ok(text) = name2unicode(name) {
                                let utf16: Vec<u8> = text
                                    .encode_utf16()
                                    .flat_map(|u| u.to_be_bytes())
                                    .collect();
                                out.unicode_map.add_char(code, &utf16);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Keyword::EndBfRange => {
                let items = self.end(Section::BfRange);
                for triple in items.chunks(3) {
                    let (low, high, dst) = match triple {
                        [PSToken::String(low), PSToken::String(high), dst] => (low, high, dst),
                        _ => continue,
                    };
                    let (low, high) = match (code_of(low), code_of(high)) {
                        (Some(low), Some(high)) => (low, high),
                        _ => continue,
                    };
                    match dst {
                        PSToken::String(bytes) => {
                            out.unicode_map.add_range(low, high, bytes.clone());
                        }
                        PSToken::Array(arr) => {
                            // One destination per code in the range.
                            for (i, item) in arr.iter().enumerate() {
                                let code = (low.0, low.1 + i as u32);
                                if code.1 > high.1 {
                                    break;
                                }
                                if let PSToken::String(bytes) = item {
                                    out.unicode_map.add_char(code, bytes);
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            Keyword::EndCidChar => {
                let items = self.end(Section::CidChar);
                for pair in items.chunks(2) {
                    if let [PSToken::String(code), PSToken::Int(cid)] = pair {
                        if *cid >= 0 {
                            out.cmap.add_code2cid(code, *cid as u32);
                        }
                    }
                }
            }
            Keyword::EndCidRange => {
                let items = self.end(Section::CidRange);
                for triple in items.chunks(3) {
                    if let [PSToken::String(low), PSToken::String(high), PSToken::Int(cid)] = triple
                    {
                        if *cid >= 0 {
                            out.cmap.add_cid_range(low, high, *cid as u32);
                        }
                    }
                }
            }
            Keyword::EndNotDefChar | Keyword::EndNotDefRange => {
                // notdef mappings replace nothing we extract.
                self.end(Section::NotDef);
            }

            Keyword::UseCMap => {
                if let Some(PSToken::Literal(name)) = self.stack.pop() {
                    out.usecmap = Some(name);
                }
            }
            Keyword::CMapDef => {
                // /Key value def
                let value = self.stack.pop();
                let key = self.stack.pop();
                if let (Some(PSToken::Literal(key)), Some(value)) = (key, value) {
                    match key.as_str() {
                        "WMode" => {
                            if let PSToken::Int(n) = value {
                                out.cmap.wmode = n as i32;
                            }
                        }
                        "CMapName" => {
                            if let PSToken::Literal(name) = value {
                                out.cmap.attrs.insert(key.clone(), name);
                            }
                        }
                        "Registry" | "Ordering" => {
                            if let PSToken::String(s) = value {
                                out.cmap
                                    .attrs
                                    .insert(key.clone(), String::from_utf8_lossy(&s).into_owned());
                            }
                        }
                        _ => {}
                    }
                }
            }
            Keyword::EndCMap => {
                self.stack.clear();
            }
            Keyword::ArrayStart => self.stack.push(PSToken::Keyword(Keyword::ArrayStart)),
            Keyword::ArrayEnd => {
                // Collapse back to the matching ArrayStart.
                let mut items = Vec::new();
                while let Some(token) = self.stack.pop() {
                    if token == PSToken::Keyword(Keyword::ArrayStart) {
                        items.reverse();
                        self.stack.push(PSToken::Array(items));
                        return Ok(());
                    }
                    items.push(token);
                }
            }
            // Dict structure, `begin`/`end`, and anything else the CMap
            // prologue uses carries no mappings.
            _ => {}
        }
        Ok(())
    }

    fn begin(&mut self, section: Section) {
        self.section = section;
        self.stack.clear();
    }

    fn end(&mut self, section: Section) -> Vec<PSToken> {
        if self.section == section {
            self.section = Section::None;
            std::mem::take(&mut self.stack)
        } else {
            self.stack.clear();
            Vec::new()
        }
    }
}

/// Parse a ToUnicode CMap stream.
pub fn parse_tounicode(data: &[u8]) -> Result<ParsedCMap> {
    CMapParser::new(data).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0041> <0041>
<0042> <00660069>
endbfchar
1 beginbfrange
<0050> <0052> <0070>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end";

    #[test]
    fn test_parse_tounicode_sample() {
        let parsed = parse_tounicode(SAMPLE).unwrap();
        assert_eq!(parsed.cmap.name(), Some("Adobe-Identity-UCS"));
        assert_eq!(parsed.cmap.codespaces().len(), 1);
        assert_eq!(parsed.unicode_map.get((2, 0x41)).as_deref(), Some("A"));
        assert_eq!(parsed.unicode_map.get((2, 0x42)).as_deref(), Some("fi"));
        assert_eq!(parsed.unicode_map.get((2, 0x50)).as_deref(), Some("p"));
        assert_eq!(parsed.unicode_map.get((2, 0x52)).as_deref(), Some("r"));
        assert_eq!(parsed.unicode_map.get((2, 0x53)), None);
    }

    #[test]
    fn test_bfrange_array_form() {
        let data = b"1 begincodespacerange <00> <FF> endcodespacerange
1 beginbfrange <41> <42> [<0058> <0059>] endbfrange endcmap";
        let parsed = parse_tounicode(data).unwrap();
        assert_eq!(parsed.unicode_map.get((1, 0x41)).as_deref(), Some("X"));
        assert_eq!(parsed.unicode_map.get((1, 0x42)).as_deref(), Some("Y"));
    }

    #[test]
    fn test_overlapping_codespace_rejected() {
        let data = b"2 begincodespacerange <00> <80> <40> <FF> endcodespacerange endcmap";
        assert!(matches!(
            CMapParser::new(data).parse(),
            Err(PdfError::CMapError(_))
        ));
    }

    #[test]
    fn test_scan_codes_greedy_longest() {
        let mut cmap = CMap::new();
        cmap.add_codespace(&[0x00], &[0x7f]).unwrap();
        cmap.add_codespace(&[0x81, 0x40], &[0xfc, 0xfc]).unwrap();

        let codes = cmap.scan_codes(&[0x41, 0x81, 0x41, 0x42]);
        assert_eq!(
            codes,
            vec![
                ((1, 0x41), true),
                ((2, 0x8141), true),
                ((1, 0x42), true),
            ]
        );
    }

    #[test]
    fn test_scan_codes_unmatched_byte() {
        let mut cmap = CMap::new();
        cmap.add_codespace(&[0x00], &[0x40]).unwrap();
        let codes = cmap.scan_codes(&[0x41]);
        assert_eq!(codes, vec![((1, 0x41), false)]);
    }

    #[test]
    fn test_cid_ranges() {
        let mut cmap = CMap::new();
        cmap.add_cid_range(&[0x20], &[0x7e], 1);
        assert_eq!(cmap.cid((1, 0x20)), 1);
        assert_eq!(cmap.cid((1, 0x21)), 2);
        // Outside every range: identity.
        assert_eq!(cmap.cid((1, 0x10)), 0x10);
    }

    #[test]
    fn test_bfrange_increment_preserves_prefix() {
        let mut map = UnicodeMap::new();
        map.add_range((2, 0x10), (2, 0x12), vec![0x30, 0x41]);
        assert_eq!(map.get((2, 0x11)).as_deref(), Some("\u{3042}"));
    }

    #[test]
    fn test_wmode_parsed() {
        let data = b"/WMode 1 def 1 begincodespacerange <00> <FF> endcodespacerange endcmap";
        let parsed = CMapParser::new(data).parse().unwrap();
        assert!(parsed.cmap.is_vertical());
    }
}
