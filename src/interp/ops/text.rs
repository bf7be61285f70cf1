//! Text operators.
//!
//! Text showing decodes string bytes through the current font and pushes
//! the Unicode fragments to the device; the text matrix advances by
//! glyph widths, char/word spacing, and horizontal scaling so later
//! positioning operators stay consistent.

use crate::interp::device::PDFDevice;
use crate::interp::interpreter::PageInterpreter;
use crate::model::objects::PDFObject;

impl<'a, D: PDFDevice> PageInterpreter<'a, D> {
    /// BT - begin a text object. Nested BT is coerced with a warning.
    pub(crate) fn op_begin_text(&mut self) {
        if self.in_text {
            self.warn("BT inside a text object; coercing");
        }
        self.in_text = true;
        self.bt_stack_depth = self.gstack.len();
        self.textstate.reset();
    }

    /// ET - end a text object.
    pub(crate) fn op_end_text(&mut self) {
        if !self.in_text {
            self.warn("ET outside a text object");
        } else if self.gstack.len() != self.bt_stack_depth {
            self.warn(format!(
                "graphics state stack depth changed inside text object ({} -> {})",
                self.bt_stack_depth,
                self.gstack.len()
            ));
        }
        self.in_text = false;
    }

    /// Tf - select font and size from the resource font map.
    pub(crate) fn op_set_font(&mut self, fontid: &str, fontsize: f64) {
        match self.fontmap.get(fontid) {
            Some(font) => self.textstate.font = Some(font.clone()),
            None => self.warn(format!("undefined font resource: /{}", fontid)),
        }
        self.textstate.fontname = Some(fontid.to_string());
        self.textstate.fontsize = fontsize;
    }

    /// Td / TD - move to the start of the next line. TD also sets the
    /// leading to ty.
    pub(crate) fn op_text_move(&mut self, tx: f64, ty: f64, set_leading: bool) {
        let (a, b, c, d, e, f) = self.textstate.matrix;
        self.textstate.matrix = (a, b, c, d, tx * a + ty * c + e, tx * b + ty * d + f);
        self.textstate.linematrix = (0.0, 0.0);
        if set_leading {
            self.textstate.leading = ty;
        }
    }

    /// Tm - set the text matrix and line matrix.
    pub(crate) fn op_set_text_matrix(&mut self, m: crate::utils::Matrix) {
        self.textstate.matrix = m;
        self.textstate.linematrix = (0.0, 0.0);
    }

    /// T* - move to the next line using the stored leading.
    pub(crate) fn op_next_line(&mut self) {
        let (a, b, c, d, e, f) = self.textstate.matrix;
        let leading = self.textstate.leading;
        self.textstate.matrix = (a, b, c, d, leading * c + e, leading * d + f);
        self.textstate.linematrix = (0.0, 0.0);
    }

    /// Tj - show one string.
    pub(crate) fn op_show_string(&mut self, s: Vec<u8>) {
        self.show_seq_items(vec![PDFObject::String(s)]);
    }

    /// TJ - show a sequence of strings and positioning numbers.
    pub(crate) fn op_show_seq(&mut self, seq: Vec<PDFObject>) {
        self.show_seq_items(seq);
    }

    fn show_seq_items(&mut self, seq: Vec<PDFObject>) {
        if !self.in_text {
            self.warn("text-showing operator outside BT/ET");
        }

        let fontsize = self.textstate.fontsize;
        let scaling = self.textstate.scaling * 0.01;
        let charspace = self.textstate.charspace * scaling;
        let wordspace = self.textstate.wordspace * scaling;
        let dxscale = 0.001 * fontsize * scaling;
        let vertical = self
            .textstate
            .font
            .as_ref()
            .map(|f| f.is_vertical())
            .unwrap_or(false);

        for item in seq {
            match item {
                PDFObject::Int(_) | PDFObject::Real(_) => {
                    // Positioning adjustment in thousandths of text space.
                    let n = item.as_num().unwrap_or(0.0);
                    if vertical {
                        self.textstate.linematrix.1 -= n * dxscale;
                    } else {
                        self.textstate.linematrix.0 -= n * dxscale;
                    }
                }
                PDFObject::String(bytes) => {
                    let fragment = self.show_bytes(&bytes, fontsize, charspace, wordspace, scaling);
                    self.device.show_text(&fragment);
                }
                _ => {}
            }
        }
    }

    /// Decode one string's bytes, advance the line matrix per glyph, and
    /// return the decoded fragment.
    fn show_bytes(
        &mut self,
        bytes: &[u8],
        fontsize: f64,
        charspace: f64,
        wordspace: f64,
        scaling: f64,
    ) -> String {
        let font = match self.textstate.font.clone() {
            Some(font) => font,
            None => {
                // Every byte is an unmapped code: emit U+FFFD and advance
                // by the default one-em width so later positioning
                // operators stay consistent.
                self.warn("text shown with no font selected");
                let mut fragment = String::new();
                for &byte in bytes {
                    fragment.push('\u{FFFD}');
                    let mut advance = fontsize * scaling + charspace;
                    if byte == 32 {
                        advance += wordspace;
                    }
                    self.textstate.linematrix.0 += advance;
                }
                return fragment;
            }
        };

        let vertical = font.is_vertical();
        let mut fragment = String::new();

        for (code, matched) in font.decode(bytes) {
            match font.to_unicode(code) {
                Some(text) if matched => fragment.push_str(&text),
                _ => {
                    self.warn(format!("unmapped code {:#x}; using U+FFFD", code.1));
                    fragment.push('\u{FFFD}');
                }
            }

            let mut advance = font.char_width(font.cid(code)) * fontsize * scaling + charspace;
            if code == (1, 32) {
                advance += wordspace;
            }
            if vertical {
                self.textstate.linematrix.1 += advance;
            } else {
                self.textstate.linematrix.0 += advance;
            }
        }

        fragment
    }
}
