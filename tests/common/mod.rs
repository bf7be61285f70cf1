//! Synthetic PDF construction for integration tests.
//!
//! Builds small but structurally correct files: object offsets are
//! tracked as objects are appended, and the classic xref table and
//! trailer are generated to match.
#![allow(dead_code)]

/// Incremental builder for a single-section classic-xref PDF.
pub struct PdfBuilder {
    data: Vec<u8>,
    /// (objid, offset) in insertion order
    offsets: Vec<(u32, usize)>,
}

impl PdfBuilder {
    pub fn new(version: &str) -> Self {
        let mut data = Vec::new();
        data.extend_from_slice(format!("%PDF-{}\n", version).as_bytes());
        // Binary-detection comment line, as writers emit.
        data.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");
        Self {
            data,
            offsets: Vec::new(),
        }
    }

    /// Append `objid 0 obj <body> endobj`, recording its offset.
    pub fn object(&mut self, objid: u32, body: &str) -> &mut Self {
        self.offsets.push((objid, self.data.len()));
        self.data
            .extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", objid, body).as_bytes());
        self
    }

    /// Append a stream object with the given dictionary extras and
    /// payload. The Length entry is added automatically.
    pub fn stream(&mut self, objid: u32, dict_extras: &str, payload: &[u8]) -> &mut Self {
        self.offsets.push((objid, self.data.len()));
        let header = format!(
            "{} 0 obj\n<< /Length {} {} >>\nstream\n",
            objid,
            payload.len(),
            dict_extras
        );
        self.data.extend_from_slice(header.as_bytes());
        self.data.extend_from_slice(payload);
        self.data.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    /// Raw access for irregular constructs.
    pub fn raw(&mut self, objid: u32, bytes: &[u8]) -> &mut Self {
        self.offsets.push((objid, self.data.len()));
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn current_offset(&self) -> usize {
        self.data.len()
    }

    /// Write the xref table, trailer, and startxref. `root` is the
    /// catalog object number.
    pub fn finish(mut self, root: u32) -> Vec<u8> {
        let trailer = format!("<< /Size {} /Root {} 0 R >>", self.size(), root);
        self.finish_with_trailer(&trailer)
    }

    pub fn size(&self) -> u32 {
        self.offsets.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1
    }

    pub fn finish_with_trailer(&mut self, trailer: &str) -> Vec<u8> {
        let xref_offset = self.data.len();
        let mut entries = self.offsets.clone();
        entries.sort_by_key(|(id, _)| *id);

        let size = self.size();
        self.data.extend_from_slice(b"xref\n");
        self.data
            .extend_from_slice(format!("0 {}\n", size).as_bytes());
        self.data.extend_from_slice(b"0000000000 65535 f \n");
        let mut next = 1u32;
        for (objid, offset) in &entries {
            // Fill gaps with free entries so the subsection stays dense.
            while next < *objid {
                self.data.extend_from_slice(b"0000000000 00000 f \n");
                next += 1;
            }
            self.data
                .extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
            next = objid + 1;
        }

        self.data
            .extend_from_slice(format!("trailer\n{}\n", trailer).as_bytes());
        self.data
            .extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_offset).as_bytes());
        std::mem::take(&mut self.data)
    }
}

/// A minimal two-page document: a page tree with inherited Resources and
/// MediaBox, a WinAnsi Type1 font, and simple text content per page.
pub fn two_page_document() -> Vec<u8> {
    let mut builder = PdfBuilder::new("1.6");
    builder
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 \
             /MediaBox [0 0 612 792] /Resources << /Font << /F1 5 0 R >> >> >>",
        )
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 6 0 R >>")
        .object(
            4,
            "<< /Type /Page /Parent 2 0 R /Contents 7 0 R /MediaBox [0 0 300 400] >>",
        )
        .object(
            5,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica \
             /Encoding /WinAnsiEncoding >>",
        );
    builder.stream(6, "", b"BT /F1 12 Tf 72 720 Td (First page) Tj ET");
    builder.stream(7, "", b"BT /F1 10 Tf [(Sec) -20 (ond)] TJ ET");
    builder.finish(1)
}
