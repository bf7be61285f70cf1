//! Output devices for page interpretation.
//!
//! The interpreter talks to a [`PDFDevice`]; [`Canvas`] is the device
//! that accumulates one page's extraction results: decoded text
//! fragments, images, form invocations, and the operator listing.

use crate::image::ImageObject;
use crate::utils::{Matrix, Rect};

/// Interface the interpreter renders through. Default methods ignore
/// every event so devices override only what they collect.
pub trait PDFDevice {
    /// Begin processing a page.
    fn begin_page(&mut self, _pageid: u32, _mediabox: Rect, _ctm: Matrix) {}

    /// End processing a page.
    fn end_page(&mut self, _pageid: u32) {}

    /// A Form XObject invocation begins.
    fn begin_form(&mut self, _name: &str, _bbox: Rect, _matrix: Matrix) {}

    /// A Form XObject invocation ends.
    fn end_form(&mut self, _name: &str) {}

    /// One decoded text fragment from a text-showing operator.
    fn show_text(&mut self, _text: &str) {}

    /// An image XObject was drawn.
    fn render_image(&mut self, _image: ImageObject) {}

    /// An inline image was encountered.
    fn render_inline_image(&mut self, _image: ImageObject) {}

    /// A marked-content section begins (BMC/BDC).
    fn begin_tag(&mut self, _tag: &str) {}

    /// A marked-content section ends (EMC).
    fn end_tag(&mut self) {}

    /// One operation reproduced for the operator listing, already
    /// formatted with decoded string operands.
    fn record_operation(&mut self, _line: &str) {}
}

/// Per-page accumulator for extraction output.
#[derive(Debug, Default)]
pub struct Canvas {
    /// Decoded Unicode fragments in content-stream order
    pub strings: Vec<String>,
    /// Inline images in encounter order
    pub inline_images: Vec<ImageObject>,
    /// Image XObjects drawn, in encounter order
    pub images: Vec<ImageObject>,
    /// Form XObject invocations, in encounter order
    pub forms: Vec<String>,
    /// Reproduction of the content stream with decoded strings
    pub text_content: String,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all accumulated content. Called on page navigation.
    pub fn reset(&mut self) {
        self.strings.clear();
        self.inline_images.clear();
        self.images.clear();
        self.forms.clear();
        self.text_content.clear();
    }
}

impl PDFDevice for Canvas {
    fn show_text(&mut self, text: &str) {
        self.strings.push(text.to_string());
    }

    fn render_image(&mut self, image: ImageObject) {
        self.images.push(image);
    }

    fn render_inline_image(&mut self, image: ImageObject) {
        self.inline_images.push(image);
    }

    fn begin_form(&mut self, name: &str, _bbox: Rect, _matrix: Matrix) {
        self.forms.push(name.to_string());
    }

    fn record_operation(&mut self, line: &str) {
        self.text_content.push_str(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_reset() {
        let mut canvas = Canvas::new();
        canvas.show_text("hello");
        canvas.record_operation("\n BT");
        canvas.forms.push("Fm0".into());
        canvas.reset();
        assert!(canvas.strings.is_empty());
        assert!(canvas.text_content.is_empty());
        assert!(canvas.forms.is_empty());
    }
}
