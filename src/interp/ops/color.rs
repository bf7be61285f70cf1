//! Color operators: CS, cs, SC, SCN, sc, scn, G, g, RG, rg, K, k.

use crate::interp::device::PDFDevice;
use crate::interp::interpreter::PageInterpreter;
use crate::model::color::{PDFColorSpace, PREDEFINED_COLORSPACE};
use crate::model::objects::PDFObject;
use crate::model::state::Color;

impl<'a, D: PDFDevice> PageInterpreter<'a, D> {
    /// CS / cs - select a color space by name, looking through the
    /// resource ColorSpace dictionary for non-device spaces.
    pub(crate) fn op_set_colorspace(&mut self, name: &str, stroke: bool) {
        let cs = PREDEFINED_COLORSPACE.get(name).cloned().or_else(|| {
            // A named entry in Resources.ColorSpace; component count
            // from the family when the entry is an array.
            let entry = self
                .resources
                .get("ColorSpace")
                .and_then(|obj| self.resolve_obj(obj))
                .and_then(|obj| match obj {
                    PDFObject::Dict(d) => d.get(name).and_then(|e| self.resolve_obj(e)),
                    _ => None,
                })?;
            let family = match &entry {
                PDFObject::Name(family) => family.clone(),
                PDFObject::Array(arr) => match arr.first() {
                    Some(PDFObject::Name(family)) => family.clone(),
                    _ => return None,
                },
                _ => return None,
            };
            Some(
                PREDEFINED_COLORSPACE
                    .get(family.as_str())
                    .cloned()
                    .unwrap_or_else(|| PDFColorSpace::new(&family, 1)),
            )
        });

        let cs = match cs {
            Some(cs) => cs,
            None => {
                self.warn(format!("unknown color space: /{}", name));
                return;
            }
        };

        if stroke {
            self.graphicstate.scs = cs;
            self.graphicstate.scolor = Color::Gray(0.0);
        } else {
            self.graphicstate.ncs = cs;
            self.graphicstate.ncolor = Color::Gray(0.0);
        }
    }

    /// SC / SCN / sc / scn - set color components in the current space.
    /// SCN/scn may carry a trailing pattern name.
    pub(crate) fn op_set_color_components(&mut self, args: &mut Vec<PDFObject>, stroke: bool) {
        let pattern = match args.last() {
            Some(PDFObject::Name(name)) => {
                let name = name.clone();
                args.pop();
                Some(name)
            }
            _ => None,
        };

        let components: Vec<f64> = args.iter().filter_map(|a| a.as_num().ok()).collect();
        args.clear();

        let color = match pattern {
            Some(name) => Color::Pattern(name),
            None => match components.as_slice() {
                [g] => Color::Gray(*g),
                [r, g, b] => Color::Rgb(*r, *g, *b),
                [c, m, y, k] => Color::Cmyk(*c, *m, *y, *k),
                _ => Color::Components(components),
            },
        };

        if stroke {
            self.graphicstate.scolor = color;
        } else {
            self.graphicstate.ncolor = color;
        }
    }

    /// G / g - DeviceGray shortcut.
    pub(crate) fn op_set_gray(&mut self, gray: f64, stroke: bool) {
        let cs = PREDEFINED_COLORSPACE["DeviceGray"].clone();
        if stroke {
            self.graphicstate.scs = cs;
            self.graphicstate.scolor = Color::Gray(gray);
        } else {
            self.graphicstate.ncs = cs;
            self.graphicstate.ncolor = Color::Gray(gray);
        }
    }

    /// RG / rg - DeviceRGB shortcut.
    pub(crate) fn op_set_rgb(&mut self, r: f64, g: f64, b: f64, stroke: bool) {
        let cs = PREDEFINED_COLORSPACE["DeviceRGB"].clone();
        if stroke {
            self.graphicstate.scs = cs;
            self.graphicstate.scolor = Color::Rgb(r, g, b);
        } else {
            self.graphicstate.ncs = cs;
            self.graphicstate.ncolor = Color::Rgb(r, g, b);
        }
    }

    /// K / k - DeviceCMYK shortcut.
    pub(crate) fn op_set_cmyk(&mut self, c: f64, m: f64, y: f64, k: f64, stroke: bool) {
        let cs = PREDEFINED_COLORSPACE["DeviceCMYK"].clone();
        if stroke {
            self.graphicstate.scs = cs;
            self.graphicstate.scolor = Color::Cmyk(c, m, y, k);
        } else {
            self.graphicstate.ncs = cs;
            self.graphicstate.ncolor = Color::Cmyk(c, m, y, k);
        }
    }
}
