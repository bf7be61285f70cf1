//! XObject invocation.
//!
//! `Do` resolves a name in the resource XObject dictionary. Image
//! XObjects are handed to the device; Form XObjects are interpreted
//! recursively under a saved interpreter state and the form's (or the
//! page's) resources.

use crate::interp::device::PDFDevice;
use crate::interp::interpreter::PageInterpreter;
use crate::image::ImageObject;
use crate::model::objects::PDFObject;
use crate::utils::{mult_matrix, Matrix, Rect, MATRIX_IDENTITY};
use std::collections::HashMap;

impl<'a, D: PDFDevice> PageInterpreter<'a, D> {
    /// Do - invoke a named XObject.
    pub(crate) fn op_invoke_xobject(&mut self, name: &str) {
        let xobj = match self.xobjmap.get(name) {
            Some(xobj) => xobj.clone(),
            None => {
                self.warn(format!("undefined XObject: /{}", name));
                return;
            }
        };

        let subtype = xobj
            .get("Subtype")
            .and_then(|obj| obj.as_name().ok())
            .unwrap_or("");

        if subtype == "Form" {
            self.invoke_form(name, &xobj);
        } else if subtype == "Image" {
            self.invoke_image(name, &xobj);
        } else {
            self.warn(format!("XObject /{} has unsupported subtype", name));
        }
    }

    fn invoke_form(&mut self, name: &str, xobj: &crate::model::objects::PDFStream) {
        if self.xobj_stack.iter().any(|n| n == name) {
            self.warn(format!("recursive Form XObject: /{}", name));
            return;
        }

        let bbox = Self::parse_bbox(xobj.get("BBox")).unwrap_or((0.0, 0.0, 1.0, 1.0));
        let matrix = Self::parse_matrix(xobj.get("Matrix"));

        let resources = xobj
            .get("Resources")
            .and_then(|r| self.resolve_obj(r))
            .and_then(|r| match r {
                PDFObject::Dict(d) => Some(d),
                _ => None,
            })
            .unwrap_or_else(|| self.resources.clone());

        let data = match self.doc {
            Some(doc) => match doc.decode_stream(xobj) {
                Ok(data) => data.to_vec(),
                Err(e) => {
                    self.warn(format!("form /{} decode failed: {}", name, e));
                    return;
                }
            },
            None => xobj.rawdata().to_vec(),
        };

        let saved = self.snapshot_state();
        self.xobj_stack.push(name.to_string());
        self.device.begin_form(name, bbox, matrix);

        let form_ctm = mult_matrix(matrix, self.ctm);
        self.render_contents(resources, vec![data], form_ctm);

        self.device.end_form(name);
        self.xobj_stack.pop();
        self.restore_state(saved);
    }

    fn invoke_image(&mut self, name: &str, xobj: &crate::model::objects::PDFStream) {
        // Resolve references inside the attributes so the image is
        // self-contained for the canvas.
        let attrs: HashMap<String, PDFObject> = match self.doc {
            Some(doc) => xobj
                .attrs
                .iter()
                .map(|(k, v)| (k.clone(), doc.resolve_deep(v, 4)))
                .collect(),
            None => xobj.attrs.clone(),
        };

        let image = ImageObject::new(Some(name.to_string()), attrs, xobj.rawdata_bytes());
        self.device.render_image(image);
    }

    pub(crate) fn parse_bbox(obj: Option<&PDFObject>) -> Option<Rect> {
        let arr = obj?.as_array().ok()?;
        if arr.len() < 4 {
            return None;
        }
        Some((
            arr[0].as_num().ok()?,
            arr[1].as_num().ok()?,
            arr[2].as_num().ok()?,
            arr[3].as_num().ok()?,
        ))
    }

    pub(crate) fn parse_matrix(obj: Option<&PDFObject>) -> Matrix {
        let arr = match obj.and_then(|o| o.as_array().ok()) {
            Some(arr) if arr.len() >= 6 => arr,
            _ => return MATRIX_IDENTITY,
        };
        let nums: Vec<f64> = arr.iter().filter_map(|v| v.as_num().ok()).collect();
        match nums.as_slice() {
            [a, b, c, d, e, f, ..] => (*a, *b, *c, *d, *e, *f),
            _ => MATRIX_IDENTITY,
        }
    }
}
