//! atril - a lazy PDF reader and content-stream interpreter.
//!
//! Given a seekable byte source, the engine exposes the document's
//! object graph (catalog, page tree, resources) and renders a page's
//! content stream into a [`Canvas`] of decoded text strings, extracted
//! images, and a listing of the graphics operators with decoded string
//! arguments.
//!
//! ```no_run
//! use atril::{PDFDocument, Viewer};
//!
//! let data = std::fs::read("sample.pdf").unwrap();
//! let mut viewer = Viewer::open(&data).unwrap();
//! viewer.navigate(1).unwrap();
//! viewer.render().unwrap();
//! for fragment in &viewer.canvas().strings {
//!     print!("{}", fragment);
//! }
//! ```

pub mod codec;
pub mod document;
pub mod error;
pub mod font;
pub mod image;
pub mod interp;
pub mod model;
pub mod parser;
pub mod utils;

pub use document::{get_page, Annot, Catalog, PDFDocument, PDFPage};
pub use error::{PdfError, Result};
pub use image::ImageObject;
pub use interp::{Canvas, PDFDevice, PageInterpreter, Viewer};
pub use model::{PDFObjRef, PDFObject, PDFStream};
