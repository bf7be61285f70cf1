//! Graphics and text state records.

use super::color::{PDFColorSpace, PREDEFINED_COLORSPACE};
use crate::font::pdffont::PDFFont;
use crate::utils::{Matrix, Point, MATRIX_IDENTITY};
use std::rc::Rc;

/// Color value in the current color space.
#[derive(Debug, Clone, PartialEq)]
pub enum Color {
    /// Greyscale (0.0 = black, 1.0 = white)
    Gray(f64),
    /// RGB color
    Rgb(f64, f64, f64),
    /// CMYK color
    Cmyk(f64, f64, f64, f64),
    /// Components in a non-device color space (SC/SCN operands)
    Components(Vec<f64>),
    /// Named pattern (scn/SCN with a name operand)
    Pattern(String),
}

impl Default for Color {
    fn default() -> Self {
        Color::Gray(0.0)
    }
}

/// Text state: font, sizing, spacing, and the text/line matrices.
#[derive(Debug, Clone)]
pub struct PDFTextState {
    /// Current font (None until the first Tf)
    pub font: Option<Rc<PDFFont>>,
    /// Current font resource name (e.g., "F1")
    pub fontname: Option<String>,
    /// Font size in user units
    pub fontsize: f64,
    /// Character spacing (Tc)
    pub charspace: f64,
    /// Word spacing (Tw), applied to byte 32 in simple fonts
    pub wordspace: f64,
    /// Horizontal scaling percentage (Tz, 100 = normal)
    pub scaling: f64,
    /// Text leading (TL), stored negated so T* adds it directly
    pub leading: f64,
    /// Text rendering mode (Tr, 0-7)
    pub render: i32,
    /// Text rise (Ts)
    pub rise: f64,
    /// Text matrix (Tm)
    pub matrix: Matrix,
    /// Position within the current line
    pub linematrix: Point,
}

impl PDFTextState {
    pub fn new() -> Self {
        Self {
            font: None,
            fontname: None,
            fontsize: 0.0,
            charspace: 0.0,
            wordspace: 0.0,
            scaling: 100.0,
            leading: 0.0,
            render: 0,
            rise: 0.0,
            matrix: MATRIX_IDENTITY,
            linematrix: (0.0, 0.0),
        }
    }

    /// Reset the text and line matrices. Called by BT.
    pub fn reset(&mut self) {
        self.matrix = MATRIX_IDENTITY;
        self.linematrix = (0.0, 0.0);
    }
}

impl Default for PDFTextState {
    fn default() -> Self {
        Self::new()
    }
}

/// Graphics state: line parameters and color state.
#[derive(Debug, Clone)]
pub struct PDFGraphicState {
    pub linewidth: f64,
    pub linecap: Option<i32>,
    pub linejoin: Option<i32>,
    pub miterlimit: Option<f64>,
    /// Dash pattern: (array, phase)
    pub dash: Option<(Vec<f64>, f64)>,
    /// Rendering intent name
    pub intent: Option<String>,
    /// Flatness tolerance
    pub flatness: Option<f64>,

    /// Stroking color
    pub scolor: Color,
    /// Stroking color space
    pub scs: PDFColorSpace,

    /// Non-stroking (fill) color
    pub ncolor: Color,
    /// Non-stroking color space
    pub ncs: PDFColorSpace,
}

impl PDFGraphicState {
    pub fn new() -> Self {
        let device_gray = PREDEFINED_COLORSPACE
            .get("DeviceGray")
            .expect("DeviceGray must exist")
            .clone();

        Self {
            linewidth: 0.0,
            linecap: None,
            linejoin: None,
            miterlimit: None,
            dash: None,
            intent: None,
            flatness: None,
            scolor: Color::Gray(0.0),
            scs: device_gray.clone(),
            ncolor: Color::Gray(0.0),
            ncs: device_gray,
        }
    }
}

impl Default for PDFGraphicState {
    fn default() -> Self {
        Self::new()
    }
}
