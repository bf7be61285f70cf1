//! Path construction and painting operators.
//!
//! The canvas extracts no vector graphics, but the path must still be
//! tracked so the current point stays correct for `v`, `y`, and `h`.

use crate::interp::device::PDFDevice;
use crate::interp::interpreter::{PageInterpreter, PathSegment};

impl<'a, D: PDFDevice> PageInterpreter<'a, D> {
    fn current_point(&self) -> Option<(f64, f64)> {
        for segment in self.curpath.iter().rev() {
            match *segment {
                PathSegment::MoveTo(x, y) => return Some((x, y)),
                PathSegment::LineTo(x, y) => return Some((x, y)),
                PathSegment::CurveTo(.., x3, y3) => return Some((x3, y3)),
                PathSegment::ClosePath => continue,
            }
        }
        None
    }

    /// m - begin a new subpath.
    pub(crate) fn op_moveto(&mut self, x: f64, y: f64) {
        self.curpath.push(PathSegment::MoveTo(x, y));
    }

    /// l - straight segment.
    pub(crate) fn op_lineto(&mut self, x: f64, y: f64) {
        self.curpath.push(PathSegment::LineTo(x, y));
    }

    /// c - cubic Bezier with two explicit control points.
    pub(crate) fn op_curveto(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        self.curpath
            .push(PathSegment::CurveTo(x1, y1, x2, y2, x3, y3));
    }

    /// v - Bezier whose first control point is the current point.
    pub(crate) fn op_curveto_v(&mut self, x2: f64, y2: f64, x3: f64, y3: f64) {
        let (x0, y0) = self.current_point().unwrap_or((x2, y2));
        self.curpath
            .push(PathSegment::CurveTo(x0, y0, x2, y2, x3, y3));
    }

    /// y - Bezier whose second control point is the endpoint.
    pub(crate) fn op_curveto_y(&mut self, x1: f64, y1: f64, x3: f64, y3: f64) {
        self.curpath
            .push(PathSegment::CurveTo(x1, y1, x3, y3, x3, y3));
    }

    /// h - close the current subpath.
    pub(crate) fn op_closepath(&mut self) {
        if !self.curpath.is_empty() {
            self.curpath.push(PathSegment::ClosePath);
        }
    }

    /// re - rectangle as a closed subpath.
    pub(crate) fn op_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.curpath.push(PathSegment::MoveTo(x, y));
        self.curpath.push(PathSegment::LineTo(x + w, y));
        self.curpath.push(PathSegment::LineTo(x + w, y + h));
        self.curpath.push(PathSegment::LineTo(x, y + h));
        self.curpath.push(PathSegment::ClosePath);
    }

    /// Painting operators (S, f, B, and friends): the path is consumed.
    pub(crate) fn op_paint(&mut self, _stroke: bool, _fill: bool) {
        self.curpath.clear();
    }

    /// n - end the path without painting (used after W/W* clipping).
    pub(crate) fn op_endpath(&mut self) {
        self.curpath.clear();
    }
}
