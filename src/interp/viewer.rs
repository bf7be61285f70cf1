//! Page navigation and rendering.
//!
//! The viewer wraps a document, tracks the current 1-based page number,
//! and renders the current page's content streams into its canvas.

use super::device::Canvas;
use super::interpreter::PageInterpreter;
use crate::document::catalog::PDFDocument;
use crate::document::page::{get_page, PDFPage};
use crate::error::{PdfError, Result};

/// Interactive-style viewer over one document.
pub struct Viewer {
    doc: PDFDocument,
    /// Current page, cached between navigate and render
    current_page: Option<PDFPage>,
    /// Current 1-based page number
    current_number: usize,
    canvas: Canvas,
}

impl Viewer {
    pub fn new(doc: PDFDocument) -> Self {
        Self {
            doc,
            current_page: None,
            current_number: 0,
            canvas: Canvas::new(),
        }
    }

    /// Open a viewer directly over raw PDF bytes.
    pub fn open<D: AsRef<[u8]>>(data: D) -> Result<Self> {
        Ok(Self::new(PDFDocument::new(data)?))
    }

    /// The underlying document.
    pub fn document(&self) -> &PDFDocument {
        &self.doc
    }

    /// The current page number (1-based); 0 before the first navigation.
    pub fn current_page_number(&self) -> usize {
        self.current_number
    }

    /// The current canvas. Empty until `render` runs.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Move to the given 1-based page. Resets the canvas.
    pub fn navigate(&mut self, page_number: usize) -> Result<&mut Self> {
        let page = get_page(&self.doc, page_number)?;
        self.current_page = Some(page);
        self.current_number = page_number;
        self.canvas.reset();
        Ok(self)
    }

    /// Move to the next page.
    pub fn next(&mut self) -> Result<&mut Self> {
        self.navigate(self.current_number + 1)
    }

    /// Move to the previous page.
    pub fn prev(&mut self) -> Result<&mut Self> {
        if self.current_number <= 1 {
            return Err(PdfError::KeyError("already at the first page".into()));
        }
        self.navigate(self.current_number - 1)
    }

    /// Interpret the current page's content into the canvas.
    pub fn render(&mut self) -> Result<&Canvas> {
        let page = self
            .current_page
            .as_ref()
            .ok_or_else(|| PdfError::KeyError("no page selected; navigate first".into()))?;

        self.canvas.reset();
        let mut interpreter = PageInterpreter::new(&mut self.canvas);
        interpreter.process_page(page, Some(&self.doc));
        Ok(&self.canvas)
    }
}
