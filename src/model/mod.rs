//! PDF data model: objects, color spaces, and interpreter state.

pub mod color;
pub mod objects;
pub mod state;

pub use color::PDFColorSpace;
pub use objects::{PDFObjRef, PDFObject, PDFStream};
pub use state::{Color, PDFGraphicState, PDFTextState};
