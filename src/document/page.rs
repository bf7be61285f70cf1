//! Page tree traversal and page attributes.
//!
//! Pages inherit `Resources`, `MediaBox`, `CropBox`, and `Rotate` along
//! the parent chain; the iterator carries the inherited values down the
//! preorder walk so each leaf sees its effective attributes.

use super::catalog::PDFDocument;
use super::views::Annot;
use crate::error::{PdfError, Result};
use crate::model::objects::PDFObject;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// A page of the document with inheritance applied.
#[derive(Debug)]
pub struct PDFPage {
    /// Object number of the page dictionary
    pub pageid: u32,
    /// Page attributes with inherited entries filled in
    pub attrs: HashMap<String, PDFObject>,
    /// Media box (physical sheet rectangle)
    pub mediabox: Option<[f64; 4]>,
    /// Crop box; defaults to the media box
    pub cropbox: Option<[f64; 4]>,
    /// Page rotation in degrees, normalized to 0/90/180/270
    pub rotate: i64,
    /// The Annots entry, unresolved
    pub annots: Option<PDFObject>,
    /// Effective resources dictionary after inheritance
    pub resources: HashMap<String, PDFObject>,
}

impl PDFPage {
    /// Iterate the document's pages in preorder.
    pub fn create_pages(doc: &PDFDocument) -> PageIterator<'_> {
        PageIterator::new(doc)
    }

    fn from_attrs(
        pageid: u32,
        attrs: HashMap<String, PDFObject>,
        doc: &PDFDocument,
    ) -> Result<Self> {
        let mediabox = Self::parse_box(attrs.get("MediaBox"), doc);
        let cropbox = Self::parse_box(attrs.get("CropBox"), doc).or(mediabox);
        let rotate = attrs
            .get("Rotate")
            .and_then(|r| doc.resolve(r).ok())
            .and_then(|r| r.as_int().ok())
            .map(|r| ((r % 360) + 360) % 360)
            .unwrap_or(0);
        let annots = attrs.get("Annots").cloned();
        // The effective resources are always a defined dictionary,
        // possibly empty.
        let resources = attrs
            .get("Resources")
            .and_then(|r| doc.resolve(r).ok())
            .and_then(|r| r.as_dict().ok().cloned())
            .unwrap_or_default();

        Ok(Self {
            pageid,
            attrs,
            mediabox,
            cropbox,
            rotate,
            annots,
            resources,
        })
    }

    /// Generic resolved access to a page attribute.
    pub fn get(&self, name: &str, doc: &PDFDocument) -> Option<PDFObject> {
        let value = self.attrs.get(name)?;
        doc.resolve(value).ok().filter(|obj| !obj.is_null())
    }

    /// The page's annotations as typed views.
    pub fn annotations<'a>(&self, doc: &'a PDFDocument) -> Vec<Annot<'a>> {
        let annots = match &self.annots {
            Some(obj) => obj,
            None => return Vec::new(),
        };
        let arr = match doc.resolve(annots) {
            Ok(PDFObject::Array(arr)) => arr,
            _ => return Vec::new(),
        };
        arr.iter()
            .filter_map(|item| match doc.resolve(item) {
                Ok(PDFObject::Dict(dict)) => Some(Annot::new(doc, dict)),
                _ => None,
            })
            .collect()
    }

    /// Decoded content streams, in document order. `Contents` may be a
    /// single stream or an array of streams.
    pub fn content_streams(&self, doc: &PDFDocument) -> Vec<Vec<u8>> {
        let contents_obj = match self.attrs.get("Contents") {
            Some(obj) => obj,
            None => return Vec::new(),
        };

        let resolved = match doc.resolve(contents_obj) {
            Ok(obj) => obj,
            Err(_) => return Vec::new(),
        };

        match resolved {
            PDFObject::Stream(stream) => match doc.decode_stream(&stream) {
                Ok(data) => vec![data.to_vec()],
                Err(e) => {
                    doc.warn(format!("content stream decode failed: {}", e));
                    Vec::new()
                }
            },
            PDFObject::Array(arr) => arr
                .iter()
                .filter_map(|item| match doc.resolve(item) {
                    Ok(PDFObject::Stream(stream)) => match doc.decode_stream(&stream) {
                        Ok(data) => Some(data.to_vec()),
                        Err(e) => {
                            doc.warn(format!("content stream decode failed: {}", e));
                            None
                        }
                    },
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn parse_box(obj: Option<&PDFObject>, doc: &PDFDocument) -> Option<[f64; 4]> {
        let resolved = doc.resolve(obj?).ok()?;
        let arr = resolved.as_array().ok()?;
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
}

/// Inheritable attributes carried down the page tree.
#[derive(Debug)]
struct InheritedNode {
    parent: Option<Rc<InheritedNode>>,
    resources: Option<PDFObject>,
    mediabox: Option<PDFObject>,
    cropbox: Option<PDFObject>,
    rotate: Option<PDFObject>,
}

impl InheritedNode {
    fn from_dict(parent: Option<Rc<InheritedNode>>, dict: &HashMap<String, PDFObject>) -> Rc<Self> {
        Rc::new(Self {
            parent,
            resources: dict.get("Resources").cloned(),
            mediabox: dict.get("MediaBox").cloned(),
            cropbox: dict.get("CropBox").cloned(),
            rotate: dict.get("Rotate").cloned(),
        })
    }

    fn lookup(&self, select: fn(&Self) -> Option<&PDFObject>) -> Option<&PDFObject> {
        select(self).or_else(|| self.parent.as_deref().and_then(|p| p.lookup(select)))
    }

    /// Fill missing inheritable keys; the leaf's own entries win.
    fn apply_to(&self, dest: &mut HashMap<String, PDFObject>) {
        let slots: [(&str, fn(&Self) -> Option<&PDFObject>); 4] = [
            ("Resources", |n| n.resources.as_ref()),
            ("MediaBox", |n| n.mediabox.as_ref()),
            ("CropBox", |n| n.cropbox.as_ref()),
            ("Rotate", |n| n.rotate.as_ref()),
        ];
        for (key, select) in slots {
            if !dest.contains_key(key) {
                if let Some(value) = self.lookup(select) {
                    dest.insert(key.to_string(), value.clone());
                }
            }
        }
    }
}

/// Preorder iterator over the page tree with damaged-file fallback.
pub struct PageIterator<'a> {
    doc: &'a PDFDocument,
    /// Depth-first stack: (objid, inherited attributes)
    stack: Vec<(u32, Rc<InheritedNode>)>,
    /// Cycle protection
    visited: HashSet<u32>,
    /// Fallback: scan all objects for Type=Page
    fallback_mode: bool,
    fallback_objids: Vec<u32>,
    fallback_idx: usize,
    pages_yielded: bool,
}

impl<'a> PageIterator<'a> {
    fn new(doc: &'a PDFDocument) -> Self {
        let catalog = doc.catalog_dict();

        if let Some(PDFObject::Ref(pages_ref)) = catalog.get("Pages") {
            let inherited = InheritedNode::from_dict(None, catalog);
            return Self {
                doc,
                stack: vec![(pages_ref.objid, inherited)],
                visited: HashSet::new(),
                fallback_mode: false,
                fallback_objids: Vec::new(),
                fallback_idx: 0,
                pages_yielded: false,
            };
        }

        Self {
            doc,
            stack: Vec::new(),
            visited: HashSet::new(),
            fallback_mode: true,
            fallback_objids: doc.objids(),
            fallback_idx: 0,
            pages_yielded: false,
        }
    }
}

impl<'a> Iterator for PageIterator<'a> {
    type Item = Result<PDFPage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fallback_mode {
            while self.fallback_idx < self.fallback_objids.len() {
                let objid = self.fallback_objids[self.fallback_idx];
                self.fallback_idx += 1;

                if let Ok(obj) = self.doc.getobj(objid) {
                    if let Ok(dict) = obj.as_dict() {
                        if matches!(dict.get("Type"), Some(PDFObject::Name(n)) if n == "Page") {
                            return Some(PDFPage::from_attrs(objid, dict.clone(), self.doc));
                        }
                    }
                }
            }
            return None;
        }

        while let Some((objid, parent_inherited)) = self.stack.pop() {
            if !self.visited.insert(objid) {
                self.doc
                    .warn(format!("page tree cycle at object {}", objid));
                continue;
            }

            let obj = match self.doc.getobj(objid) {
                Ok(o) => o,
                Err(_) => continue,
            };
            let dict = match obj.as_dict() {
                Ok(d) => d,
                Err(_) => continue,
            };

            match dict.get("Type") {
                Some(PDFObject::Name(name)) if name == "Pages" => {
                    let inherited =
                        InheritedNode::from_dict(Some(Rc::clone(&parent_inherited)), dict);
                    if let Some(kids) = dict.get("Kids") {
                        if let Ok(PDFObject::Array(kids_arr)) = self.doc.resolve(kids) {
                            for kid in kids_arr.iter().rev() {
                                if let Ok(kid_ref) = kid.as_objref() {
                                    self.stack.push((kid_ref.objid, Rc::clone(&inherited)));
                                }
                            }
                        }
                    }
                }
                Some(PDFObject::Name(name)) if name == "Page" => {
                    let mut attrs = dict.clone();
                    parent_inherited.apply_to(&mut attrs);
                    self.pages_yielded = true;
                    return Some(PDFPage::from_attrs(objid, attrs, self.doc));
                }
                _ => {}
            }
        }

        // Tree walk found nothing: fall back to object scanning once.
        if !self.pages_yielded && !self.fallback_mode {
            self.fallback_mode = true;
            self.fallback_objids = self.doc.objids();
            return self.next();
        }

        None
    }
}

/// Resolve the nth page (1-based) without materializing the whole list.
pub fn get_page(doc: &PDFDocument, page_number: usize) -> Result<PDFPage> {
    if page_number == 0 {
        return Err(PdfError::KeyError("page numbers are 1-based".into()));
    }
    PDFPage::create_pages(doc)
        .nth(page_number - 1)
        .unwrap_or_else(|| {
            Err(PdfError::KeyError(format!(
                "page {} out of range",
                page_number
            )))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherited_node_fills_missing() {
        let mut root = HashMap::new();
        root.insert("MediaBox".to_string(), PDFObject::Name("root".into()));
        root.insert("Rotate".to_string(), PDFObject::Int(90));

        let mut mid = HashMap::new();
        mid.insert("Resources".to_string(), PDFObject::Name("mid".into()));

        let root_node = InheritedNode::from_dict(None, &root);
        let mid_node = InheritedNode::from_dict(Some(root_node), &mid);

        let mut leaf = HashMap::new();
        leaf.insert("Resources".to_string(), PDFObject::Name("leaf".into()));

        mid_node.apply_to(&mut leaf);

        assert_eq!(leaf.get("Resources"), Some(&PDFObject::Name("leaf".into())));
        assert_eq!(leaf.get("MediaBox"), Some(&PDFObject::Name("root".into())));
        assert_eq!(leaf.get("Rotate"), Some(&PDFObject::Int(90)));
    }
}
