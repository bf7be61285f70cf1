//! Typed views over document dictionaries.
//!
//! Each view wraps a dictionary and exposes a fixed set of accessors for
//! one PDF object kind, resolving indirect references through the
//! document on access. Unknown keys go through the generic `get`.

use super::catalog::PDFDocument;
use crate::model::objects::PDFObject;
use std::collections::HashMap;

/// The document's root dictionary (`Type=Catalog`).
pub struct Catalog<'a> {
    doc: &'a PDFDocument,
    dict: HashMap<String, PDFObject>,
}

impl<'a> Catalog<'a> {
    pub(crate) fn new(doc: &'a PDFDocument, dict: HashMap<String, PDFObject>) -> Self {
        Self { doc, dict }
    }

    /// The `Type` entry; "Catalog" on well-formed documents.
    pub fn type_name(&self) -> Option<String> {
        match self.dict.get("Type") {
            Some(PDFObject::Name(name)) => Some(name.clone()),
            _ => None,
        }
    }

    /// The root of the page tree, resolved.
    pub fn pages(&self) -> Option<PDFObject> {
        self.get("Pages")
    }

    /// The document outline (bookmarks) dictionary, resolved.
    pub fn outlines(&self) -> Option<PDFObject> {
        self.get("Outlines")
    }

    /// The document-level metadata stream, resolved.
    pub fn metadata(&self) -> Option<PDFObject> {
        self.get("Metadata")
    }

    /// The Names dictionary, resolved.
    pub fn names(&self) -> Option<PDFObject> {
        self.get("Names")
    }

    /// Generic resolved access for any catalog entry.
    pub fn get(&self, name: &str) -> Option<PDFObject> {
        let value = self.dict.get(name)?;
        self.doc.resolve(value).ok().filter(|obj| !obj.is_null())
    }

    /// The underlying dictionary.
    pub fn dict(&self) -> &HashMap<String, PDFObject> {
        &self.dict
    }
}

/// An annotation dictionary on a page.
pub struct Annot<'a> {
    doc: &'a PDFDocument,
    dict: HashMap<String, PDFObject>,
}

impl<'a> Annot<'a> {
    pub(crate) fn new(doc: &'a PDFDocument, dict: HashMap<String, PDFObject>) -> Self {
        Self { doc, dict }
    }

    /// Annotation subtype name (e.g. "Text", "Link").
    pub fn subtype(&self) -> Option<String> {
        match self.dict.get("Subtype") {
            Some(PDFObject::Name(name)) => Some(name.clone()),
            _ => None,
        }
    }

    /// The annotation's short subject string, raw bytes.
    pub fn subj(&self) -> Option<Vec<u8>> {
        match self.get("Subj")? {
            PDFObject::String(s) => Some(s),
            _ => None,
        }
    }

    /// The annotation's text contents, raw bytes.
    pub fn contents(&self) -> Option<Vec<u8>> {
        match self.get("Contents")? {
            PDFObject::String(s) => Some(s),
            _ => None,
        }
    }

    /// The annotation rectangle.
    pub fn rect(&self) -> Option<[f64; 4]> {
        let arr = match self.get("Rect")? {
            PDFObject::Array(arr) => arr,
            _ => return None,
        };
        if arr.len() != 4 {
            return None;
        }
        Some([
            arr[0].as_num().ok()?,
            arr[1].as_num().ok()?,
            arr[2].as_num().ok()?,
            arr[3].as_num().ok()?,
        ])
    }

    /// Generic resolved access for any annotation entry.
    pub fn get(&self, name: &str) -> Option<PDFObject> {
        let value = self.dict.get(name)?;
        self.doc.resolve(value).ok().filter(|obj| !obj.is_null())
    }

    /// The underlying dictionary.
    pub fn dict(&self) -> &HashMap<String, PDFObject> {
        &self.dict
    }
}
