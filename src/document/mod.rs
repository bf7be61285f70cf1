//! Document structure: xref machinery, pages, and typed views.

pub mod catalog;
pub mod page;
pub mod views;

pub use catalog::PDFDocument;
pub use page::{get_page, PDFPage, PageIterator};
pub use views::{Annot, Catalog};
