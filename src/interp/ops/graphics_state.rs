//! Graphics-state operators: q, Q, cm, w, gs.
//!
//! Line cap/join, miter limit, dash, intent, and flatness are plain
//! field stores and stay in the dispatcher.

use crate::interp::device::PDFDevice;
use crate::interp::interpreter::PageInterpreter;
use crate::model::objects::PDFObject;
use crate::utils::{mult_matrix, Matrix};

impl<'a, D: PDFDevice> PageInterpreter<'a, D> {
    /// q - push the graphics state.
    pub(crate) fn op_save(&mut self) {
        self.gstack
            .push((self.ctm, self.textstate.clone(), self.graphicstate.clone()));
    }

    /// Q - pop the graphics state. Underflow is reported and the current
    /// state kept.
    pub(crate) fn op_restore(&mut self) {
        match self.gstack.pop() {
            Some((ctm, textstate, graphicstate)) => {
                self.ctm = ctm;
                self.textstate = textstate;
                self.graphicstate = graphicstate;
            }
            None => self.warn("Q with empty graphics state stack"),
        }
    }

    /// cm - concatenate onto the CTM.
    pub(crate) fn op_concat_matrix(&mut self, matrix: Matrix) {
        self.ctm = mult_matrix(matrix, self.ctm);
    }

    /// w - set the line width, scaled into device space.
    pub(crate) fn op_linewidth(&mut self, linewidth: f64) {
        let scale = self.ctm.0.hypot(self.ctm.1);
        self.graphicstate.linewidth = linewidth * scale;
    }

    /// gs - apply an ExtGState parameter dictionary from the resources.
    /// The parameters this engine tracks are LW and Font.
    pub(crate) fn op_extgstate(&mut self, name: &str) {
        let extgstate = self
            .resources
            .get("ExtGState")
            .and_then(|obj| self.resolve_obj(obj))
            .and_then(|obj| match obj {
                PDFObject::Dict(d) => d.get(name).and_then(|e| self.resolve_obj(e)),
                _ => None,
            });

        let params = match extgstate {
            Some(PDFObject::Dict(d)) => d,
            _ => return,
        };

        if let Some(lw) = params.get("LW").and_then(|v| v.as_num().ok()) {
            self.graphicstate.linewidth = lw;
        }

        // Font entry: [font_ref size]
        if let Some(PDFObject::Array(arr)) = params.get("Font") {
            if arr.len() == 2 {
                if let Ok(size) = arr[1].as_num() {
                    self.textstate.fontsize = size;
                }
            }
        }
    }
}
