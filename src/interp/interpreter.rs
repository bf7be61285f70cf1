//! Page interpreter.
//!
//! Executes content-stream operators against a graphics-state stack and
//! the page's resource environment, emitting canvas events through the
//! device seam. Every executed operation is also reproduced into the
//! device's operator listing with decoded string operands.

use super::content::{ContentOp, ContentParser};
use super::device::PDFDevice;
use crate::document::catalog::PDFDocument;
use crate::document::page::PDFPage;
use crate::font::pdffont::PDFFont;
use crate::image::ImageObject;
use crate::model::objects::{PDFObject, PDFStream};
use crate::model::state::{PDFGraphicState, PDFTextState};
use crate::parser::lexer::Keyword;
use crate::utils::{format_number, Matrix, MATRIX_IDENTITY};
use log::warn;
use std::collections::HashMap;
use std::rc::Rc;

/// Path segment for path-construction operators.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    CurveTo(f64, f64, f64, f64, f64, f64),
    ClosePath,
}

/// Saved graphics state for q/Q.
pub(crate) type SavedState = (Matrix, PDFTextState, PDFGraphicState);

/// Full interpreter state saved around a Form XObject invocation.
pub(crate) struct InterpreterState {
    pub(crate) gstack: Vec<SavedState>,
    pub(crate) ctm: Matrix,
    pub(crate) textstate: PDFTextState,
    pub(crate) graphicstate: PDFGraphicState,
    pub(crate) curpath: Vec<PathSegment>,
    pub(crate) fontmap: HashMap<String, Rc<PDFFont>>,
    pub(crate) resources: HashMap<String, PDFObject>,
    pub(crate) xobjmap: HashMap<String, PDFStream>,
}

/// Executes a page's content streams against a device.
pub struct PageInterpreter<'a, D: PDFDevice> {
    pub(crate) device: &'a mut D,
    pub(crate) doc: Option<&'a PDFDocument>,
    /// Current transformation matrix
    pub(crate) ctm: Matrix,
    pub(crate) textstate: PDFTextState,
    pub(crate) graphicstate: PDFGraphicState,
    /// Graphics state stack for q/Q
    pub(crate) gstack: Vec<SavedState>,
    /// Current path under construction
    pub(crate) curpath: Vec<PathSegment>,
    /// Fonts of the current resource dictionary
    pub(crate) fontmap: HashMap<String, Rc<PDFFont>>,
    /// XObjects of the current resource dictionary
    pub(crate) xobjmap: HashMap<String, PDFStream>,
    /// The current resource dictionary itself
    pub(crate) resources: HashMap<String, PDFObject>,
    /// Stack of active Form XObjects, for recursion protection
    pub(crate) xobj_stack: Vec<String>,
    /// Inside a BT..ET text object
    pub(crate) in_text: bool,
    /// gstack depth recorded at BT, checked at ET
    pub(crate) bt_stack_depth: usize,
    /// BX..EX nesting: unknown operators are silent inside
    pub(crate) compat_depth: usize,
}

impl<'a, D: PDFDevice> PageInterpreter<'a, D> {
    pub fn new(device: &'a mut D) -> Self {
        Self {
            device,
            doc: None,
            ctm: MATRIX_IDENTITY,
            textstate: PDFTextState::new(),
            graphicstate: PDFGraphicState::new(),
            gstack: Vec::new(),
            curpath: Vec::new(),
            fontmap: HashMap::new(),
            xobjmap: HashMap::new(),
            resources: HashMap::new(),
            xobj_stack: Vec::new(),
            in_text: false,
            bt_stack_depth: 0,
            compat_depth: 0,
        }
    }

    pub(crate) fn warn(&self, msg: impl Into<String>) {
        let msg = msg.into();
        match self.doc {
            Some(doc) => doc.warn(msg),
            None => warn!("{}", msg),
        }
    }

    /// Reset per-render state. Called at the start of page rendering and
    /// of each Form XObject body.
    pub fn init_state(&mut self, ctm: Matrix) {
        self.gstack.clear();
        self.ctm = ctm;
        self.textstate = PDFTextState::new();
        self.graphicstate = PDFGraphicState::new();
        self.curpath.clear();
        self.in_text = false;
        self.compat_depth = 0;
    }

    /// Interpret a full page: set up the CTM from the media box and
    /// rotation, bind resources, and run the content streams.
    pub fn process_page(&mut self, page: &PDFPage, doc: Option<&'a PDFDocument>) {
        self.doc = doc;
        let mediabox = page.mediabox.unwrap_or([0.0, 0.0, 612.0, 792.0]);
        let (x0, y0, x1, y1) = (mediabox[0], mediabox[1], mediabox[2], mediabox[3]);

        let ctm = match page.rotate {
            90 => (0.0, -1.0, 1.0, 0.0, -y0, x1),
            180 => (-1.0, 0.0, 0.0, -1.0, x1, y1),
            270 => (0.0, 1.0, -1.0, 0.0, y1, -x0),
            _ => (1.0, 0.0, 0.0, 1.0, -x0, -y0),
        };

        self.device.begin_page(page.pageid, (x0, y0, x1, y1), ctm);
        self.init_resources(&page.resources);
        self.init_state(ctm);

        let streams = match doc {
            Some(doc) => page.content_streams(doc),
            None => Vec::new(),
        };
        self.execute(&streams);

        if !self.gstack.is_empty() {
            self.warn(format!(
                "unbalanced q/Q: {} state(s) left at end of content",
                self.gstack.len()
            ));
        }

        self.device.end_page(page.pageid);
    }

    /// Bind a resource dictionary: build the font map and XObject map.
    pub fn init_resources(&mut self, resources: &HashMap<String, PDFObject>) {
        self.fontmap.clear();
        self.xobjmap.clear();
        self.resources = resources.clone();

        if let Some(fonts) = self.resolve_dict_entry(resources.get("Font")) {
            for (fontid, spec_obj) in fonts {
                // Fonts named by reference are built once and cached on
                // the document; re-rendering reuses the parsed font.
                let font = match (&spec_obj, self.doc) {
                    (PDFObject::Ref(r), Some(doc)) => {
                        doc.get_or_build_font(r.objid, || self.build_font(&spec_obj))
                    }
                    _ => self.build_font(&spec_obj).map(Rc::new),
                };
                if let Some(font) = font {
                    self.fontmap.insert(fontid, font);
                }
            }
        }

        if let Some(xobjects) = self.resolve_dict_entry(resources.get("XObject")) {
            for (xobjid, xobj) in xobjects {
                let stream = match self.resolve_obj(&xobj) {
                    Some(PDFObject::Stream(s)) => Some(*s),
                    _ => None,
                };
                if let Some(stream) = stream {
                    self.xobjmap.insert(xobjid, stream);
                }
            }
        }
    }

    /// Resolve an optional dictionary-valued resource entry.
    fn resolve_dict_entry(
        &self,
        obj: Option<&PDFObject>,
    ) -> Option<HashMap<String, PDFObject>> {
        match self.resolve_obj(obj?)? {
            PDFObject::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Resolve through the document when one is attached.
    pub(crate) fn resolve_obj(&self, obj: &PDFObject) -> Option<PDFObject> {
        match self.doc {
            Some(doc) => doc.resolve(obj).ok(),
            None => Some(obj.clone()),
        }
    }

    /// Build one font from its spec, merging Type0 descendant entries
    /// and decoding the ToUnicode / embedded Encoding CMap streams.
    fn build_font(&self, spec_obj: &PDFObject) -> Option<PDFFont> {
        let mut spec = match self.resolve_obj(spec_obj)? {
            PDFObject::Dict(d) => d,
            _ => return None,
        };

        let subtype = spec
            .get("Subtype")
            .and_then(|s| s.as_name().ok())
            .unwrap_or("")
            .to_string();

        // A Type0 font keeps its own Encoding and ToUnicode but takes
        // widths and the descriptor from the first descendant.
        if subtype == "Type0" {
            if let Some(dfonts) = spec.get("DescendantFonts").cloned() {
                if let Some(PDFObject::Array(arr)) = self.resolve_obj(&dfonts) {
                    if let Some(first) = arr.first() {
                        if let Some(PDFObject::Dict(descendant)) = self.resolve_obj(first) {
                            for (key, value) in descendant {
                                spec.entry(key).or_insert(value);
                            }
                        }
                    }
                }
            }
        }

        // Resolve the entries the font constructor reads directly.
        for key in ["Encoding", "Widths", "W", "FirstChar", "FontDescriptor", "DW"] {
            if let Some(PDFObject::Ref(_)) = spec.get(key) {
                if let Some(resolved) = self.resolve_obj(&spec[key]) {
                    spec.insert(key.to_string(), resolved);
                }
            }
        }

        let tounicode_data = self.extract_stream_data(spec.get("ToUnicode"));
        let encoding_cmap_data = match spec.get("Encoding") {
            Some(obj @ PDFObject::Stream(_)) => self.extract_stream_data(Some(obj)),
            _ => None,
        };

        Some(PDFFont::new(
            &spec,
            tounicode_data.as_deref(),
            encoding_cmap_data.as_deref(),
        ))
    }

    /// Resolve and decode a stream-valued entry.
    fn extract_stream_data(&self, obj: Option<&PDFObject>) -> Option<Vec<u8>> {
        let resolved = self.resolve_obj(obj?)?;
        let stream = match &resolved {
            PDFObject::Stream(s) => s,
            _ => return None,
        };
        match self.doc {
            Some(doc) => match doc.decode_stream(stream) {
                Ok(data) => Some(data.to_vec()),
                Err(e) => {
                    self.warn(format!("stream decode failed: {}", e));
                    None
                }
            },
            None => Some(stream.rawdata().to_vec()),
        }
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Run the content streams, dispatching each operation.
    pub fn execute(&mut self, streams: &[Vec<u8>]) {
        if streams.is_empty() {
            return;
        }

        let parser = ContentParser::new(streams);
        for op in parser {
            match op {
                ContentOp::Operator { keyword, operands } => {
                    let line = self.format_operation(&operands, &keyword);
                    self.device.record_operation(&line);
                    self.dispatch(keyword, operands);
                }
                ContentOp::InlineImage { attrs, data } => {
                    self.device.record_operation("\n BI");
                    self.device.record_operation("\n ID");
                    self.device.record_operation("\n EI");
                    let image = ImageObject::new(None, attrs, data);
                    self.device.render_inline_image(image);
                }
            }
        }
    }

    /// Re-run execution under different resources and CTM (forms).
    pub(crate) fn render_contents(
        &mut self,
        resources: HashMap<String, PDFObject>,
        streams: Vec<Vec<u8>>,
        ctm: Matrix,
    ) {
        self.init_resources(&resources);
        self.init_state(ctm);
        self.execute(&streams);
    }

    pub(crate) fn snapshot_state(&mut self) -> InterpreterState {
        InterpreterState {
            gstack: std::mem::take(&mut self.gstack),
            ctm: self.ctm,
            textstate: self.textstate.clone(),
            graphicstate: self.graphicstate.clone(),
            curpath: std::mem::take(&mut self.curpath),
            fontmap: std::mem::take(&mut self.fontmap),
            resources: std::mem::take(&mut self.resources),
            xobjmap: std::mem::take(&mut self.xobjmap),
        }
    }

    pub(crate) fn restore_state(&mut self, state: InterpreterState) {
        self.gstack = state.gstack;
        self.ctm = state.ctm;
        self.textstate = state.textstate;
        self.graphicstate = state.graphicstate;
        self.curpath = state.curpath;
        self.fontmap = state.fontmap;
        self.resources = state.resources;
        self.xobjmap = state.xobjmap;
    }

    // ========================================================================
    // Operator listing
    // ========================================================================

    /// Decode string bytes through the current font for display.
    pub(crate) fn decode_string(&self, bytes: &[u8], report: bool) -> String {
        match &self.textstate.font {
            Some(font) => {
                let mut out = String::new();
                for (code, matched) in font.decode(bytes) {
                    match font.to_unicode(code) {
                        Some(text) if matched => out.push_str(&text),
                        _ => {
                            if report {
                                self.warn(format!(
                                    "unmapped code {:#x} in font; using U+FFFD",
                                    code.1
                                ));
                            }
                            out.push('\u{FFFD}');
                        }
                    }
                }
                out
            }
            None => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }

    fn format_operand(&self, obj: &PDFObject) -> String {
        match obj {
            PDFObject::Null => "null".to_string(),
            PDFObject::Bool(b) => b.to_string(),
            PDFObject::Int(n) => n.to_string(),
            PDFObject::Real(n) => format_number(*n),
            PDFObject::Name(name) => format!("/{}", name),
            PDFObject::String(bytes) => format!("({})", self.decode_string(bytes, false)),
            PDFObject::Array(arr) => {
                let items: Vec<String> = arr.iter().map(|o| self.format_operand(o)).collect();
                format!("[{}]", items.join(" "))
            }
            PDFObject::Dict(dict) => {
                let mut keys: Vec<&String> = dict.keys().collect();
                keys.sort();
                let items: Vec<String> = keys
                    .into_iter()
                    .map(|k| format!("/{} {}", k, self.format_operand(&dict[k])))
                    .collect();
                format!("<<{}>>", items.join(" "))
            }
            PDFObject::Stream(_) => "<stream>".to_string(),
            PDFObject::Ref(r) => format!("{} {} R", r.objid, r.genno),
        }
    }

    /// One line of the operator listing: newline, operands, operator.
    fn format_operation(&self, operands: &[PDFObject], keyword: &Keyword) -> String {
        let operands_str: Vec<String> = operands.iter().map(|o| self.format_operand(o)).collect();
        format!(
            "\n{} {}",
            operands_str.join(" "),
            String::from_utf8_lossy(keyword.as_bytes())
        )
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn dispatch(&mut self, keyword: Keyword, mut args: Vec<PDFObject>) {
        match keyword {
            // Graphics state
            Keyword::Q => self.op_save(),
            Keyword::QQ => self.op_restore(),
            Keyword::Cm => {
                if let Some(m) = Self::pop_matrix(&mut args) {
                    self.op_concat_matrix(m);
                }
            }
            Keyword::W => {
                if let Some(w) = Self::pop_number(&mut args) {
                    self.op_linewidth(w);
                }
            }
            Keyword::J => {
                if let Some(n) = Self::pop_int(&mut args) {
                    self.graphicstate.linecap = Some(n);
                }
            }
            Keyword::Jl => {
                if let Some(n) = Self::pop_int(&mut args) {
                    self.graphicstate.linejoin = Some(n);
                }
            }
            Keyword::M => {
                if let Some(m) = Self::pop_number(&mut args) {
                    self.graphicstate.miterlimit = Some(m);
                }
            }
            Keyword::D => {
                let phase = Self::pop_number(&mut args).unwrap_or(0.0);
                let dash = Self::pop_number_array(&mut args).unwrap_or_default();
                self.graphicstate.dash = Some((dash, phase));
            }
            Keyword::Ri => {
                if let Some(name) = Self::pop_name(&mut args) {
                    self.graphicstate.intent = Some(name);
                }
            }
            Keyword::I => {
                if let Some(f) = Self::pop_number(&mut args) {
                    self.graphicstate.flatness = Some(f);
                }
            }
            Keyword::Gs => {
                if let Some(name) = Self::pop_name(&mut args) {
                    self.op_extgstate(&name);
                }
            }

            // Path construction
            Keyword::Mv => {
                if let Some((x, y)) = Self::pop_point(&mut args) {
                    self.op_moveto(x, y);
                }
            }
            Keyword::L => {
                if let Some((x, y)) = Self::pop_point(&mut args) {
                    self.op_lineto(x, y);
                }
            }
            Keyword::C => {
                if let Some([x1, y1, x2, y2, x3, y3]) = Self::pop_n::<6>(&mut args) {
                    self.op_curveto(x1, y1, x2, y2, x3, y3);
                }
            }
            Keyword::V => {
                if let Some([x2, y2, x3, y3]) = Self::pop_n::<4>(&mut args) {
                    self.op_curveto_v(x2, y2, x3, y3);
                }
            }
            Keyword::Y => {
                if let Some([x1, y1, x3, y3]) = Self::pop_n::<4>(&mut args) {
                    self.op_curveto_y(x1, y1, x3, y3);
                }
            }
            Keyword::H => self.op_closepath(),
            Keyword::Re => {
                if let Some([x, y, w, h]) = Self::pop_n::<4>(&mut args) {
                    self.op_rect(x, y, w, h);
                }
            }

            // Path painting
            Keyword::S => self.op_paint(true, false),
            Keyword::Sl => {
                self.op_closepath();
                self.op_paint(true, false);
            }
            Keyword::F | Keyword::Fl | Keyword::FStar => self.op_paint(false, true),
            Keyword::B | Keyword::BStar => self.op_paint(true, true),
            Keyword::Bl | Keyword::BlStar => {
                self.op_closepath();
                self.op_paint(true, true);
            }
            Keyword::N => self.op_endpath(),

            // Clipping: observed, path continues to the paint operator.
            Keyword::WClip | Keyword::WStar => {}

            // Color
            Keyword::CS => {
                if let Some(name) = Self::pop_name(&mut args) {
                    self.op_set_colorspace(&name, true);
                }
            }
            Keyword::Cs => {
                if let Some(name) = Self::pop_name(&mut args) {
                    self.op_set_colorspace(&name, false);
                }
            }
            Keyword::SC | Keyword::SCN => self.op_set_color_components(&mut args, true),
            Keyword::Sc | Keyword::Scn => self.op_set_color_components(&mut args, false),
            Keyword::G => {
                if let Some(g) = Self::pop_number(&mut args) {
                    self.op_set_gray(g, true);
                }
            }
            Keyword::Gr => {
                if let Some(g) = Self::pop_number(&mut args) {
                    self.op_set_gray(g, false);
                }
            }
            Keyword::RG => {
                if let Some([r, g, b]) = Self::pop_n::<3>(&mut args) {
                    self.op_set_rgb(r, g, b, true);
                }
            }
            Keyword::Rg => {
                if let Some([r, g, b]) = Self::pop_n::<3>(&mut args) {
                    self.op_set_rgb(r, g, b, false);
                }
            }
            Keyword::K => {
                if let Some([c, m, y, k]) = Self::pop_n::<4>(&mut args) {
                    self.op_set_cmyk(c, m, y, k, true);
                }
            }
            Keyword::Kc => {
                if let Some([c, m, y, k]) = Self::pop_n::<4>(&mut args) {
                    self.op_set_cmyk(c, m, y, k, false);
                }
            }

            // Text object
            Keyword::BT => self.op_begin_text(),
            Keyword::ET => self.op_end_text(),

            // Text state
            Keyword::Tc => {
                if let Some(v) = Self::pop_number(&mut args) {
                    self.textstate.charspace = v;
                }
            }
            Keyword::Tw => {
                if let Some(v) = Self::pop_number(&mut args) {
                    self.textstate.wordspace = v;
                }
            }
            Keyword::Tz => {
                if let Some(v) = Self::pop_number(&mut args) {
                    self.textstate.scaling = v;
                }
            }
            Keyword::TL => {
                if let Some(v) = Self::pop_number(&mut args) {
                    self.textstate.leading = -v;
                }
            }
            Keyword::Tf => {
                let size = Self::pop_number(&mut args).unwrap_or(0.0);
                let fontid = Self::pop_name(&mut args).unwrap_or_default();
                self.op_set_font(&fontid, size);
            }
            Keyword::Tr => {
                if let Some(v) = Self::pop_int(&mut args) {
                    self.textstate.render = v;
                }
            }
            Keyword::Ts => {
                if let Some(v) = Self::pop_number(&mut args) {
                    self.textstate.rise = v;
                }
            }

            // Text positioning
            Keyword::Td => {
                if let Some((tx, ty)) = Self::pop_point(&mut args) {
                    self.op_text_move(tx, ty, false);
                }
            }
            Keyword::TD => {
                if let Some((tx, ty)) = Self::pop_point(&mut args) {
                    self.op_text_move(tx, ty, true);
                }
            }
            Keyword::Tm => {
                if let Some(m) = Self::pop_matrix(&mut args) {
                    self.op_set_text_matrix(m);
                }
            }
            Keyword::TStar => self.op_next_line(),

            // Text showing
            Keyword::Tj => {
                if let Some(s) = Self::pop_string(&mut args) {
                    self.op_show_string(s);
                }
            }
            Keyword::TJ => {
                if let Some(PDFObject::Array(arr)) = args.pop() {
                    self.op_show_seq(arr);
                }
            }
            Keyword::Quote => {
                if let Some(s) = Self::pop_string(&mut args) {
                    self.op_next_line();
                    self.op_show_string(s);
                }
            }
            Keyword::DoubleQuote => {
                let s = Self::pop_string(&mut args).unwrap_or_default();
                let ac = Self::pop_number(&mut args).unwrap_or(0.0);
                let aw = Self::pop_number(&mut args).unwrap_or(0.0);
                self.textstate.wordspace = aw;
                self.textstate.charspace = ac;
                self.op_next_line();
                self.op_show_string(s);
            }

            // XObjects
            Keyword::Do => {
                if let Some(name) = Self::pop_name(&mut args) {
                    self.op_invoke_xobject(&name);
                }
            }

            // Marked content: observed, passed through to the listing.
            Keyword::BMC | Keyword::BDC => {
                let tag = args
                    .iter()
                    .find_map(|a| a.as_name().ok().map(str::to_string))
                    .unwrap_or_default();
                self.device.begin_tag(&tag);
            }
            Keyword::EMC => self.device.end_tag(),
            Keyword::MP | Keyword::DP => {}

            // Shading and Type3 glyph metrics: observed only.
            Keyword::Sh | Keyword::D0 | Keyword::D1 => {}

            // Compatibility sections
            Keyword::BX => self.compat_depth += 1,
            Keyword::EX => {
                self.compat_depth = self.compat_depth.saturating_sub(1);
            }

            Keyword::Unknown(bytes) => {
                if self.compat_depth == 0 {
                    self.warn(format!(
                        "unknown operator: {}",
                        String::from_utf8_lossy(&bytes)
                    ));
                }
            }

            // Document-structure keywords have no business in content
            // streams; report and continue.
            other => {
                if self.compat_depth == 0 {
                    self.warn(format!(
                        "unexpected keyword in content stream: {}",
                        String::from_utf8_lossy(other.as_bytes())
                    ));
                }
            }
        }
    }

    // ========================================================================
    // Operand stack helpers
    // ========================================================================

    fn pop_number(args: &mut Vec<PDFObject>) -> Option<f64> {
        args.pop().and_then(|t| t.as_num().ok())
    }

    fn pop_int(args: &mut Vec<PDFObject>) -> Option<i32> {
        args.pop().and_then(|t| match t {
            PDFObject::Int(n) => Some(n as i32),
            PDFObject::Real(n) => Some(n as i32),
            _ => None,
        })
    }

    fn pop_string(args: &mut Vec<PDFObject>) -> Option<Vec<u8>> {
        args.pop().and_then(|t| match t {
            PDFObject::String(s) => Some(s),
            _ => None,
        })
    }

    fn pop_name(args: &mut Vec<PDFObject>) -> Option<String> {
        args.pop().and_then(|t| match t {
            PDFObject::Name(name) => Some(name),
            _ => None,
        })
    }

    fn pop_number_array(args: &mut Vec<PDFObject>) -> Option<Vec<f64>> {
        args.pop().and_then(|t| match t {
            PDFObject::Array(arr) => {
                Some(arr.iter().filter_map(|x| x.as_num().ok()).collect())
            }
            _ => None,
        })
    }

    fn pop_point(args: &mut Vec<PDFObject>) -> Option<(f64, f64)> {
        let y = Self::pop_number(args)?;
        let x = Self::pop_number(args)?;
        Some((x, y))
    }

    /// Pop N numbers, returned in source order.
    fn pop_n<const N: usize>(args: &mut Vec<PDFObject>) -> Option<[f64; N]> {
        if args.len() < N {
            return None;
        }
        let mut out = [0.0; N];
        for slot in out.iter_mut().rev() {
            *slot = Self::pop_number(args)?;
        }
        Some(out)
    }

    fn pop_matrix(args: &mut Vec<PDFObject>) -> Option<Matrix> {
        let [a, b, c, d, e, f] = Self::pop_n::<6>(args)?;
        Some((a, b, c, d, e, f))
    }
}

/// Convenience entry point: interpret one page onto a device.
pub fn process_page<D: PDFDevice>(device: &mut D, page: &PDFPage, doc: &PDFDocument) {
    let mut interpreter = PageInterpreter::new(device);
    interpreter.process_page(page, Some(doc));
}
