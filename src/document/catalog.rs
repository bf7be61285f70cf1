//! PDF document: header, xref chain, trailer, and object resolution.
//!
//! The document parses the header and cross-reference machinery eagerly;
//! everything else is lazy. Objects are parsed on first resolution and
//! cached; stream payloads decode through the filter pipeline on demand
//! and are memoized per (object number, generation).

use crate::codec;
use crate::document::views::Catalog;
use crate::error::{PdfError, Result};
use crate::font::pdffont::PDFFont;
use crate::model::objects::{PDFObject, PDFStream};
use crate::parser::pdf_parser::PDFParser;
use bytes::Bytes;
use indexmap::IndexMap;
use log::warn;
use memmap2::Mmap;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// How far from end-of-file the startxref keyword is searched for.
const STARTXREF_WINDOW: usize = 1024;

/// Slack allowed between the declared Length and the scanned endstream
/// before the declared length is distrusted.
const ENDSTREAM_SLACK: usize = 64;

/// One cross-reference entry.
#[derive(Debug, Clone, PartialEq)]
enum XRefEntry {
    /// Free entry in the deleted-object list
    Free {
        #[allow(dead_code)]
        next_free: u32,
        #[allow(dead_code)]
        genno: u32,
    },
    /// Object stored at a byte offset in the file
    InUse { offset: usize, genno: u32 },
    /// Object stored inside an object stream
    Compressed { stream_objid: u32, index: usize },
}

/// One cross-reference section with its trailer.
#[derive(Debug, Default)]
struct XRef {
    entries: HashMap<u32, XRefEntry>,
    trailer: HashMap<String, PDFObject>,
    /// Set when this section was rebuilt by scanning for objects
    is_fallback: bool,
}

impl XRef {
    fn new() -> Self {
        Self::default()
    }

    fn get(&self, objid: u32) -> Option<&XRefEntry> {
        self.entries.get(&objid)
    }

    fn objids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }
}

/// Byte source: owned bytes or a shared file mapping. Random access and
/// size query only; every read slices at an absolute offset.
#[derive(Debug, Clone)]
enum PdfBytes {
    Owned(Bytes),
    Shared(Bytes),
}

impl PdfBytes {
    fn as_slice(&self) -> &[u8] {
        match self {
            Self::Owned(data) | Self::Shared(data) => data.as_ref(),
        }
    }

    fn len(&self) -> usize {
        self.as_slice().len()
    }
}

/// Object cache with optional LRU-style bounding. Unbounded by default.
#[derive(Debug)]
struct ObjectCache {
    capacity: Option<usize>,
    map: IndexMap<u32, Rc<PDFObject>>,
}

impl ObjectCache {
    fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            map: IndexMap::new(),
        }
    }

    fn get(&mut self, objid: u32) -> Option<Rc<PDFObject>> {
        let index = self.map.get_index_of(&objid)?;
        let value = Rc::clone(self.map.get_index(index)?.1);
        if index + 1 != self.map.len() {
            self.map.move_index(index, self.map.len() - 1);
        }
        Some(value)
    }

    fn insert(&mut self, objid: u32, value: Rc<PDFObject>) {
        if self.map.contains_key(&objid) {
            self.map.shift_remove(&objid);
        }
        self.map.insert(objid, value);
        if let Some(capacity) = self.capacity {
            if self.map.len() > capacity {
                self.map.shift_remove_index(0);
            }
        }
    }
}

/// A parsed PDF document.
#[derive(Debug)]
pub struct PDFDocument {
    data: PdfBytes,
    /// Header version, e.g. "1.6"
    version: String,
    /// XRef sections, newest first
    xrefs: Vec<XRef>,
    /// Catalog dictionary (resolved trailer Root)
    catalog: HashMap<String, PDFObject>,
    /// Object cache
    cache: RefCell<ObjectCache>,
    /// Decoded stream payloads keyed by (objid, genno)
    stream_cache: RefCell<HashMap<(u32, u32), Rc<[u8]>>>,
    /// Fonts keyed by the font dictionary's object number
    font_cache: RefCell<HashMap<u32, Rc<PDFFont>>>,
    /// Accumulated non-fatal warnings
    warnings: RefCell<Vec<String>>,
}

impl PDFDocument {
    /// Open a document from a byte slice (copies the data).
    pub fn new<D: AsRef<[u8]>>(data: D) -> Result<Self> {
        Self::open(PdfBytes::Owned(Bytes::copy_from_slice(data.as_ref())))
    }

    /// Open a document from shared bytes (zero-copy).
    pub fn from_bytes(data: Bytes) -> Result<Self> {
        Self::open(PdfBytes::Shared(data))
    }

    /// Open a document over a memory-mapped file.
    pub fn from_mmap(mmap: Mmap) -> Result<Self> {
        Self::open(PdfBytes::Shared(Bytes::from_owner(mmap)))
    }

    fn open(data: PdfBytes) -> Result<Self> {
        let mut doc = Self {
            data,
            version: String::new(),
            xrefs: Vec::new(),
            catalog: HashMap::new(),
            cache: RefCell::new(ObjectCache::new(None)),
            stream_cache: RefCell::new(HashMap::new()),
            font_cache: RefCell::new(HashMap::new()),
            warnings: RefCell::new(Vec::new()),
        };
        doc.parse()?;
        Ok(doc)
    }

    /// Bound the object cache to the given number of entries.
    pub fn set_cache_capacity(&self, capacity: Option<usize>) {
        self.cache.borrow_mut().capacity = capacity;
    }

    /// The raw file bytes.
    pub fn bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Header version, e.g. `"1.6"`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The catalog dictionary (trailer `Root`, resolved).
    pub fn catalog_dict(&self) -> &HashMap<String, PDFObject> {
        &self.catalog
    }

    /// Typed view over the catalog.
    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(self, self.catalog.clone())
    }

    /// Accumulated non-fatal warnings, oldest first.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    pub(crate) fn warn(&self, msg: impl Into<String>) {
        let msg = msg.into();
        warn!("{}", msg);
        self.warnings.borrow_mut().push(msg);
    }

    /// Iterate over the trailers of all xref sections, newest first.
    pub fn trailers(&self) -> impl Iterator<Item = &HashMap<String, PDFObject>> {
        self.xrefs.iter().map(|x| &x.trailer)
    }

    /// All object numbers present in the merged xref.
    pub fn objids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.xrefs.iter().flat_map(|x| x.objids()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    // ========================================================================
    // Document open
    // ========================================================================

    fn parse(&mut self) -> Result<()> {
        self.version = self.parse_header()?;

        let mut loaded = false;
        if let Ok(pos) = self.find_startxref() {
            if self.load_xrefs(pos).is_ok() && !self.xrefs.is_empty() {
                loaded = true;
            }
        }

        // Damaged file: rebuild the table by scanning for objects.
        if !loaded {
            self.warn("no usable xref; rebuilding by scanning for objects");
            let xref = self.load_xref_fallback()?;
            self.xrefs.push(xref);
        }

        // Encryption is out of scope: recognize and refuse.
        for xref in &self.xrefs {
            if xref.trailer.contains_key("Encrypt") {
                return Err(PdfError::Unsupported("encrypted document".into()));
            }
        }

        // Resolve the catalog from the newest trailer that has a Root.
        let root_refs: Vec<PDFObject> = self
            .xrefs
            .iter()
            .filter_map(|x| x.trailer.get("Root").cloned())
            .collect();
        for root_ref in root_refs {
            if let Ok(PDFObject::Dict(dict)) = self.resolve(&root_ref) {
                self.catalog = dict;
                break;
            }
        }

        Ok(())
    }

    /// Parse `%PDF-1.N` from the head of the file.
    fn parse_header(&self) -> Result<String> {
        let data = self.data.as_slice();
        let window = &data[..data.len().min(STARTXREF_WINDOW)];
        let start = window
            .windows(5)
            .position(|w| w == b"%PDF-")
            .ok_or(PdfError::MalformedHeader)?;

        let rest = &window[start + 5..];
        let end = rest
            .iter()
            .position(|&b| !(b.is_ascii_digit() || b == b'.'))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(PdfError::MalformedHeader);
        }
        Ok(String::from_utf8_lossy(&rest[..end]).into_owned())
    }

    /// Locate the last `startxref` in the final window of the file and
    /// read the offset after it.
    fn find_startxref(&self) -> Result<usize> {
        let needle = b"startxref";
        let data = self.data.as_slice();
        if data.len() < needle.len() {
            return Err(PdfError::NoValidXRef);
        }

        let search_start = data.len().saturating_sub(STARTXREF_WINDOW);
        for i in (search_start..=data.len() - needle.len()).rev() {
            if &data[i..i + needle.len()] == needle {
                let rest = &data[i + needle.len()..];
                let mut pos = 0;
                while pos < rest.len() && rest[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                let mut num_end = pos;
                while num_end < rest.len() && rest[num_end].is_ascii_digit() {
                    num_end += 1;
                }
                if num_end > pos {
                    let num_str = std::str::from_utf8(&rest[pos..num_end])
                        .map_err(|_| PdfError::NoValidXRef)?;
                    return num_str.parse().map_err(|_| PdfError::NoValidXRef);
                }
            }
        }

        Err(PdfError::NoValidXRef)
    }

    /// Walk the trailer `Prev` chain. Sections are stored newest first,
    /// so lookups hit the overriding entry before older ones.
    fn load_xrefs(&mut self, mut pos: usize) -> Result<()> {
        let mut visited = HashSet::new();

        while visited.insert(pos) {
            let xref = self.load_xref_at(pos)?;

            let prev = xref
                .trailer
                .get("Prev")
                .and_then(|p| p.as_int().ok())
                .map(|n| n as usize);

            // Hybrid files also carry XRefStm; load it after this section
            // so the stream entries fill the gaps.
            let xrefstm = xref
                .trailer
                .get("XRefStm")
                .and_then(|p| p.as_int().ok())
                .map(|n| n as usize);

            self.xrefs.push(xref);

            if let Some(stm_pos) = xrefstm {
                if visited.insert(stm_pos) {
                    if let Ok(stm_xref) = self.load_xref_at(stm_pos) {
                        self.xrefs.push(stm_xref);
                    }
                }
            }

            match prev {
                Some(prev_pos) => pos = prev_pos,
                None => break,
            }
        }

        Ok(())
    }

    fn load_xref_at(&self, pos: usize) -> Result<XRef> {
        if pos >= self.data.len() {
            return Err(PdfError::NoValidXRef);
        }
        let data = &self.data.as_slice()[pos..];
        let skip = data
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(0);

        if data[skip..].starts_with(b"xref") {
            self.load_classic_xref(pos + skip)
        } else {
            self.load_xref_stream(pos + skip)
        }
    }

    /// Parse a classic `xref` table followed by `trailer <<...>>`.
    fn load_classic_xref(&self, pos: usize) -> Result<XRef> {
        let mut xref = XRef::new();
        let data = &self.data.as_slice()[pos..];
        let mut cursor = 4; // past "xref"

        loop {
            while cursor < data.len() && data[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            if cursor >= data.len() {
                break;
            }
            if data[cursor..].starts_with(b"trailer") {
                cursor += 7;
                break;
            }

            // Subsection header: start count
            let (start_objid, used) = read_decimal(&data[cursor..])?;
            cursor += used;
            while cursor < data.len() && data[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            let (count, used) = read_decimal(&data[cursor..])?;
            cursor += used;

            let mut base_objid = start_objid;
            for i in 0..count {
                while cursor < data.len() && data[cursor].is_ascii_whitespace() {
                    cursor += 1;
                }
                let (offset, used) = read_decimal(&data[cursor..])?;
                cursor += used;
                while cursor < data.len() && data[cursor] == b' ' {
                    cursor += 1;
                }
                let (genno, used) = read_decimal(&data[cursor..])?;
                cursor += used;
                while cursor < data.len() && data[cursor] == b' ' {
                    cursor += 1;
                }
                let marker = if cursor < data.len() { data[cursor] } else { b'f' };
                cursor += 1;

                // Some writers start the first subsection at 1 but still
                // emit the object-0 free entry; realign so entries match.
                if i == 0 && base_objid > 0 && marker == b'f' && offset == 0 && genno == 65535 {
                    base_objid -= 1;
                }

                let objid = (base_objid + i) as u32;
                let entry = match marker {
                    b'n' => XRefEntry::InUse {
                        offset: offset as usize,
                        genno: genno as u32,
                    },
                    _ => XRefEntry::Free {
                        next_free: offset as u32,
                        genno: genno as u32,
                    },
                };
                xref.entries.insert(objid, entry);
            }
        }

        // Trailer dictionary.
        let data = &self.data.as_slice()[pos + cursor..];
        let skip = data
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(0);
        if data[skip..].starts_with(b"<<") {
            let mut parser = PDFParser::new(&data[skip..]);
            if let Ok(PDFObject::Dict(dict)) = parser.parse_object() {
                xref.trailer = dict;
            }
            for key in parser.take_duplicate_keys() {
                self.warn(format!("duplicate trailer key: /{}", key));
            }
        }

        if xref.trailer.is_empty() {
            return Err(PdfError::SyntaxError("xref table without trailer".into()));
        }

        Ok(xref)
    }

    /// Parse a cross-reference stream (`Type=XRef`, PDF 1.5+).
    fn load_xref_stream(&self, pos: usize) -> Result<XRef> {
        let obj = self.parse_object_at(pos, false)?;
        let stream = obj.as_stream()?;

        let w_arr = stream
            .get("W")
            .ok_or_else(|| PdfError::SyntaxError("missing W in xref stream".into()))?
            .as_array()?;
        if w_arr.len() < 3 {
            return Err(PdfError::SyntaxError("W must have 3 elements".into()));
        }
        let w0 = w_arr[0].as_int()? as usize;
        let w1 = w_arr[1].as_int()? as usize;
        let w2 = w_arr[2].as_int()? as usize;
        let entry_size = w0 + w1 + w2;
        if entry_size == 0 {
            return Err(PdfError::SyntaxError("zero-width xref entries".into()));
        }

        let size = stream
            .get("Size")
            .ok_or_else(|| PdfError::SyntaxError("missing Size in xref stream".into()))?
            .as_int()? as usize;

        let index = match stream.get("Index") {
            Some(idx) => {
                let arr = idx.as_array()?;
                let mut pairs = Vec::new();
                let mut i = 0;
                while i + 1 < arr.len() {
                    pairs.push((arr[i].as_int()? as u32, arr[i + 1].as_int()? as usize));
                    i += 2;
                }
                pairs
            }
            None => vec![(0, size)],
        };

        let data = self.decode_stream(stream)?;

        let mut xref = XRef::new();
        let mut data_pos = 0;

        for (start_objid, count) in index {
            for i in 0..count {
                if data_pos + entry_size > data.len() {
                    break;
                }

                let objid = start_objid + i as u32;
                let entry_type = if w0 > 0 {
                    crate::utils::nunpack(&data[data_pos..data_pos + w0], 1)
                } else {
                    1
                };
                let field1 =
                    crate::utils::nunpack(&data[data_pos + w0..data_pos + w0 + w1], 0);
                let field2 =
                    crate::utils::nunpack(&data[data_pos + w0 + w1..data_pos + entry_size], 0);
                data_pos += entry_size;

                let entry = match entry_type {
                    0 => XRefEntry::Free {
                        next_free: field1 as u32,
                        genno: field2 as u32,
                    },
                    1 => XRefEntry::InUse {
                        offset: field1 as usize,
                        genno: field2 as u32,
                    },
                    2 => XRefEntry::Compressed {
                        stream_objid: field1 as u32,
                        index: field2 as usize,
                    },
                    _ => continue,
                };
                xref.entries.insert(objid, entry);
            }
        }

        // The stream dictionary doubles as the trailer.
        for (key, value) in &stream.attrs {
            if !matches!(key.as_str(), "Length" | "Filter" | "DecodeParms" | "W" | "Index" | "Type")
            {
                xref.trailer.insert(key.clone(), value.clone());
            }
        }

        Ok(xref)
    }

    /// Rebuild the xref by scanning the whole file for `N G obj`.
    fn load_xref_fallback(&self) -> Result<XRef> {
        use regex::bytes::Regex;

        let mut xref = XRef::new();
        xref.is_fallback = true;
        let re = Regex::new(r"(\d+)\s+(\d+)\s+obj\b").unwrap();

        for cap in re.captures_iter(self.data.as_slice()) {
            let objid: u32 = match std::str::from_utf8(&cap[1]).ok().and_then(|s| s.parse().ok()) {
                Some(v) => v,
                None => continue,
            };
            let genno: u32 = std::str::from_utf8(&cap[2])
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            let pos = cap.get(0).unwrap().start();
            // Later definitions of the same object override earlier ones.
            xref.entries
                .insert(objid, XRefEntry::InUse { offset: pos, genno });
        }

        if xref.entries.is_empty() {
            return Err(PdfError::NoValidXRef);
        }

        // Take the last trailer dict in the file.
        let data = self.data.as_slice();
        let needle = b"trailer";
        let mut search_end = data.len();
        while let Some(found) = rfind(&data[..search_end], needle) {
            let after = &data[found + needle.len()..];
            let skip = after
                .iter()
                .position(|b| !b.is_ascii_whitespace())
                .unwrap_or(0);
            if after[skip..].starts_with(b"<<") {
                let mut parser = PDFParser::new(&after[skip..]);
                if let Ok(PDFObject::Dict(dict)) = parser.parse_object() {
                    xref.trailer = dict;
                    break;
                }
            }
            search_end = found;
        }

        Ok(xref)
    }

    // ========================================================================
    // Object resolution
    // ========================================================================

    /// Fetch an object by number, parsing and caching it on first use.
    pub fn getobj(&self, objid: u32) -> Result<Rc<PDFObject>> {
        if objid == 0 {
            return Err(PdfError::ObjectNotFound(0));
        }

        if let Some(obj) = self.cache.borrow_mut().get(objid) {
            return Ok(obj);
        }

        for xref in &self.xrefs {
            let entry = match xref.get(objid) {
                Some(entry) => entry.clone(),
                None => continue,
            };

            let parsed = match entry {
                XRefEntry::Free { .. } => return Err(PdfError::ObjectNotFound(objid)),
                XRefEntry::InUse { offset, genno } => {
                    match self.parse_indirect_at(offset, objid, genno, xref.is_fallback) {
                        Ok(obj) => obj,
                        Err(_) => continue, // damaged entry; try an older section
                    }
                }
                XRefEntry::Compressed {
                    stream_objid,
                    index,
                } => match self.parse_object_from_stream(stream_objid, index) {
                    Ok(obj) => obj,
                    Err(_) => continue,
                },
            };

            let shared = Rc::new(parsed);
            self.cache.borrow_mut().insert(objid, Rc::clone(&shared));
            return Ok(shared);
        }

        Err(PdfError::ObjectNotFound(objid))
    }

    /// Resolve indirect references, transparently and recursively.
    ///
    /// A dangling reference resolves to `Null` after recording a warning,
    /// so damage stays contained to the object that referenced it.
    /// Reference chains are depth-limited so cycles terminate.
    pub fn resolve(&self, obj: &PDFObject) -> Result<PDFObject> {
        self.resolve_limited(obj, 32)
    }

    fn resolve_limited(&self, obj: &PDFObject, depth: usize) -> Result<PDFObject> {
        match obj {
            PDFObject::Ref(r) => {
                if depth == 0 {
                    self.warn(format!("reference chain too deep at {} {} R", r.objid, r.genno));
                    return Ok(PDFObject::Null);
                }
                match self.getobj(r.objid) {
                    Ok(resolved) => {
                        if let PDFObject::Ref(_) = resolved.as_ref() {
                            self.resolve_limited(resolved.as_ref(), depth - 1)
                        } else {
                            Ok(resolved.as_ref().clone())
                        }
                    }
                    Err(PdfError::ObjectNotFound(objid)) => {
                        self.warn(format!("missing object: {} {} R", objid, r.genno));
                        Ok(PDFObject::Null)
                    }
                    Err(e) => Err(e),
                }
            }
            _ => Ok(obj.clone()),
        }
    }

    /// Resolve references recursively through arrays and dictionaries.
    /// Depth-limited so reference cycles terminate.
    pub fn resolve_deep(&self, obj: &PDFObject, depth: usize) -> PDFObject {
        if depth == 0 {
            return obj.clone();
        }
        match obj {
            PDFObject::Ref(_) => match self.resolve(obj) {
                Ok(resolved) => self.resolve_deep(&resolved, depth - 1),
                Err(_) => PDFObject::Null,
            },
            PDFObject::Array(arr) => PDFObject::Array(
                arr.iter()
                    .map(|item| self.resolve_deep(item, depth - 1))
                    .collect(),
            ),
            PDFObject::Dict(dict) => PDFObject::Dict(
                dict.iter()
                    .map(|(k, v)| (k.clone(), self.resolve_deep(v, depth - 1)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Decode a stream's payload through the filter pipeline, memoized
    /// per (objid, genno) when the stream is document-bound.
    pub fn decode_stream(&self, stream: &PDFStream) -> Result<Rc<[u8]>> {
        let key = match (stream.objid, stream.genno) {
            (Some(objid), Some(genno)) => Some((objid, genno)),
            _ => None,
        };

        if let Some(key) = key {
            if let Some(cached) = self.stream_cache.borrow().get(&key) {
                return Ok(Rc::clone(cached));
            }
        }

        let filter = stream
            .get("Filter")
            .map(|f| self.resolve_deep(f, 4));
        let parms = stream
            .get_any(&["DecodeParms", "DP"])
            .map(|p| self.resolve_deep(p, 4));

        let decoded: Rc<[u8]> =
            codec::apply_filters(stream.rawdata(), filter.as_ref(), parms.as_ref())?.into();

        if let Some(key) = key {
            self.stream_cache
                .borrow_mut()
                .insert(key, Rc::clone(&decoded));
        }

        Ok(decoded)
    }

    /// Fetch the font built from the dictionary at `objid`, building and
    /// caching it on first use.
    ///
    /// Fonts are parsed once per document: a cached entry is returned
    /// without invoking `build`. The file is immutable after open, so
    /// entries never invalidate.
    pub fn get_or_build_font<F>(&self, objid: u32, build: F) -> Option<Rc<PDFFont>>
    where
        F: FnOnce() -> Option<PDFFont>,
    {
        {
            let cache = self.font_cache.borrow();
            if let Some(font) = cache.get(&objid) {
                return Some(Rc::clone(font));
            }
        }

        let font = Rc::new(build()?);
        self.font_cache
            .borrow_mut()
            .insert(objid, Rc::clone(&font));
        Some(font)
    }

    // ========================================================================
    // Indirect object parsing
    // ========================================================================

    /// Parse `N G obj ... endobj` at a byte offset.
    fn parse_indirect_at(
        &self,
        offset: usize,
        objid: u32,
        genno: u32,
        fallback: bool,
    ) -> Result<PDFObject> {
        self.parse_object_at(offset, fallback).map(|mut obj| {
            if let PDFObject::Stream(ref mut stream) = obj {
                stream.set_objid(objid, genno);
            }
            obj
        })
    }

    /// Parse one indirect object at a byte offset. When `fallback` is
    /// set the declared Length is ignored in favor of the endstream scan.
    fn parse_object_at(&self, offset: usize, fallback: bool) -> Result<PDFObject> {
        let file = self.data.as_slice();
        if offset >= file.len() {
            return Err(PdfError::SyntaxError(format!(
                "object offset {} beyond end of file ({})",
                offset,
                file.len()
            )));
        }
        let mut data = &file[offset..];

        // Header: objid genno obj
        let (_objid, used) = read_decimal(data)?;
        data = skip_ws(&data[used..]);
        let (_genno, used) = read_decimal(data)?;
        data = skip_ws(&data[used..]);
        if !data.starts_with(b"obj") {
            return Err(PdfError::SyntaxError(format!(
                "expected 'obj' at offset {}",
                offset
            )));
        }
        data = skip_ws(&data[3..]);

        let mut parser = PDFParser::new(data);
        let obj = parser.parse_object()?;
        for key in parser.take_duplicate_keys() {
            self.warn(format!("duplicate dictionary key: /{}", key));
        }

        // A dictionary followed by `stream` is a stream object.
        if let PDFObject::Dict(dict) = &obj {
            let remaining = parser.remaining();
            let skip = remaining
                .iter()
                .position(|b| !b.is_ascii_whitespace())
                .unwrap_or(remaining.len());
            if remaining[skip..].starts_with(b"stream") {
                let payload = self.read_stream_payload(&remaining[skip + 6..], dict, fallback)?;
                return Ok(PDFObject::Stream(Box::new(PDFStream::new(
                    dict.clone(),
                    payload,
                ))));
            }
        }

        Ok(obj)
    }

    /// Slice the raw stream payload following the `stream` keyword.
    ///
    /// The EOL after `stream` is one LF or one CRLF, never CR alone. The
    /// declared Length is preferred; when it is absent, zero, or
    /// overshoots the scanned `endstream` by more than a small slack, the
    /// scan wins and a warning is recorded.
    fn read_stream_payload(
        &self,
        data: &[u8],
        dict: &HashMap<String, PDFObject>,
        fallback: bool,
    ) -> Result<Vec<u8>> {
        let mut pos = 0;
        if data.get(pos) == Some(&b'\r') {
            pos += 1;
        }
        if data.get(pos) == Some(&b'\n') {
            pos += 1;
        }
        let data = &data[pos..];

        let length: usize = if fallback {
            0
        } else {
            dict.get("Length")
                .and_then(|len_obj| self.resolve(len_obj).ok())
                .and_then(|resolved| resolved.as_int().ok())
                .filter(|&len| len > 0)
                .map(|len| len as usize)
                .unwrap_or(0)
        };

        let end_pos = find_endstream(data);
        let use_endstream = fallback
            || length == 0
            || end_pos
                .map(|p| p > length.saturating_add(ENDSTREAM_SLACK))
                .unwrap_or(false);

        if use_endstream {
            if !fallback && length > 0 {
                self.warn("stream Length disagrees with endstream; trusting endstream");
            }
            if let Some(end) = end_pos {
                return Ok(data[..end].to_vec());
            }
            if length > 0 && length <= data.len() {
                return Ok(data[..length].to_vec());
            }
            return Ok(data.to_vec());
        }

        // Trust a Length that lands on the endstream keyword, even when
        // the payload itself happens to contain those bytes.
        if length <= data.len() {
            let after = skip_ws(&data[length..]);
            if after.starts_with(b"endstream") || end_pos.is_none() {
                return Ok(data[..length].to_vec());
            }
        }

        match end_pos {
            // Length overshoots the endstream keyword: the scan wins.
            Some(end) if length > end => {
                self.warn("stream Length beyond endstream; trusting endstream");
                Ok(data[..end].to_vec())
            }
            _ if length <= data.len() => Ok(data[..length].to_vec()),
            Some(end) => {
                self.warn("stream Length beyond end of data; trusting endstream");
                Ok(data[..end].to_vec())
            }
            None => Ok(data.to_vec()),
        }
    }

    /// Materialize one object from an object stream (`Type=ObjStm`).
    fn parse_object_from_stream(&self, stream_objid: u32, index: usize) -> Result<PDFObject> {
        let container = self.getobj(stream_objid)?;
        let stream = container.as_stream()?;
        let data = self.decode_stream(stream)?;

        let n = stream
            .get("N")
            .ok_or_else(|| PdfError::SyntaxError("missing N in ObjStm".into()))?
            .as_int()? as usize;
        let first = stream
            .get("First")
            .ok_or_else(|| PdfError::SyntaxError("missing First in ObjStm".into()))?
            .as_int()? as usize;

        if index >= n {
            return Err(PdfError::SyntaxError(format!(
                "object index {} >= N {}",
                index, n
            )));
        }
        if first > data.len() {
            return Err(PdfError::SyntaxError("ObjStm First beyond data".into()));
        }

        // Header: N pairs of (objid, offset-from-First).
        let mut header = PDFParser::new(&data[..first]);
        let mut offsets = Vec::with_capacity(n);
        for _ in 0..n {
            let _objid = header.parse_object()?.as_int()?;
            offsets.push(header.parse_object()?.as_int()? as usize);
        }

        let obj_offset = first + offsets.get(index).copied().unwrap_or(0);
        if obj_offset > data.len() {
            return Err(PdfError::SyntaxError("ObjStm offset beyond data".into()));
        }

        let mut parser = PDFParser::new(&data[obj_offset..]);
        parser.parse_object()
    }
}

fn skip_ws(data: &[u8]) -> &[u8] {
    let skip = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    &data[skip..]
}

/// Read an unsigned decimal integer, returning (value, bytes consumed).
fn read_decimal(data: &[u8]) -> Result<(i64, usize)> {
    let mut pos = 0;
    while pos < data.len() && data[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos == 0 {
        return Err(PdfError::SyntaxError("expected number".into()));
    }
    let value: i64 = std::str::from_utf8(&data[..pos])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| PdfError::SyntaxError("invalid number".into()))?;
    Ok((value, pos))
}

/// Scan forward for `endstream`, trimming trailing EOL bytes before it.
fn find_endstream(data: &[u8]) -> Option<usize> {
    let needle = b"endstream";
    let limit = data.len().checked_sub(needle.len())?;
    for i in 0..=limit {
        if &data[i..i + needle.len()] == needle {
            let mut end = i;
            while end > 0 && matches!(data[end - 1], b' ' | b'\r' | b'\n') {
                end -= 1;
            }
            return Some(end);
        }
    }
    None
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| &haystack[i..i + needle.len()] == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_decimal() {
        assert_eq!(read_decimal(b"123 rest").unwrap(), (123, 3));
        assert!(read_decimal(b"abc").is_err());
    }

    #[test]
    fn test_find_endstream_trims_eol() {
        assert_eq!(find_endstream(b"abc\r\nendstream"), Some(3));
        assert_eq!(find_endstream(b"abcendstream"), Some(3));
        assert_eq!(find_endstream(b"no terminator"), None);
    }
}
