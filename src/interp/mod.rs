//! Content-stream interpretation.
//!
//! - `content`: operand/operator grouping and inline images
//! - `interpreter`: the operator machine
//! - `device`: output seam and the per-page canvas
//! - `viewer`: page navigation and rendering

pub mod content;
pub mod device;
pub mod interpreter;
pub mod ops;
pub mod viewer;

pub use content::{ContentOp, ContentParser};
pub use device::{Canvas, PDFDevice};
pub use interpreter::{process_page, PageInterpreter, PathSegment};
pub use viewer::Viewer;
