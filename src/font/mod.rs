//! Font machinery: CMaps, encodings, and font resources.

pub mod cmap;
pub mod encoding;
pub mod latin_enc;
pub mod pdffont;

pub use cmap::{CMap, CMapParser, ParsedCMap, UnicodeMap};
pub use encoding::{name2unicode, DiffEntry, EncodingDB};
pub use pdffont::PDFFont;
