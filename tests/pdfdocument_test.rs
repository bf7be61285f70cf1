//! Document-level tests: header, xref, trailer, object resolution.

mod common;

use atril::{PDFDocument, PDFObject, PdfError};
use common::PdfBuilder;

#[test]
fn test_header_version() {
    let data = common::two_page_document();
    let doc = PDFDocument::new(&data).unwrap();
    assert_eq!(doc.version(), "1.6");
}

#[test]
fn test_missing_header_is_fatal() {
    let err = PDFDocument::new(b"not a pdf at all").unwrap_err();
    assert!(matches!(err, PdfError::MalformedHeader));
}

#[test]
fn test_catalog_typed_view() {
    let data = common::two_page_document();
    let doc = PDFDocument::new(&data).unwrap();
    let catalog = doc.catalog();
    assert_eq!(catalog.type_name().as_deref(), Some("Catalog"));
    assert!(matches!(catalog.pages(), Some(PDFObject::Dict(_))));
}

#[test]
fn test_resolution_is_referentially_transparent() {
    let data = common::two_page_document();
    let doc = PDFDocument::new(&data).unwrap();
    let r = PDFObject::Ref(atril::PDFObjRef::new(2, 0));
    let first = doc.resolve(&r).unwrap();
    let second = doc.resolve(&r).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_missing_object_resolves_to_null_with_warning() {
    let data = common::two_page_document();
    let doc = PDFDocument::new(&data).unwrap();
    let r = PDFObject::Ref(atril::PDFObjRef::new(99, 0));
    assert!(doc.resolve(&r).unwrap().is_null());
    assert!(doc.warnings().iter().any(|w| w.contains("missing object")));
}

#[test]
fn test_stream_raw_length_matches_declared() {
    let data = common::two_page_document();
    let doc = PDFDocument::new(&data).unwrap();
    let obj = doc.getobj(6).unwrap();
    let stream = obj.as_stream().unwrap();
    let declared = stream.get("Length").unwrap().as_int().unwrap() as usize;
    assert_eq!(stream.rawdata().len(), declared);
}

#[test]
fn test_stream_decode_is_memoized() {
    let data = common::two_page_document();
    let doc = PDFDocument::new(&data).unwrap();
    let obj = doc.getobj(6).unwrap();
    let stream = obj.as_stream().unwrap();
    let first = doc.decode_stream(stream).unwrap();
    let second = doc.decode_stream(stream).unwrap();
    assert_eq!(first, second);
    // Same shared allocation: the decode ran once.
    assert!(std::rc::Rc::ptr_eq(&first, &second));
}

#[test]
fn test_length_overshoot_falls_back_to_endstream() {
    let mut builder = PdfBuilder::new("1.4");
    builder
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
        .raw(
            3,
            b"3 0 obj\n<< /Length 9999 >>\nstream\nshort\nendstream\nendobj\n",
        );
    let data = builder.finish(1);

    let doc = PDFDocument::new(&data).unwrap();
    let obj = doc.getobj(3).unwrap();
    assert_eq!(obj.as_stream().unwrap().rawdata(), b"short");
    assert!(doc
        .warnings()
        .iter()
        .any(|w| w.contains("endstream")));
}

#[test]
fn test_encrypted_document_is_refused() {
    let mut builder = PdfBuilder::new("1.4");
    builder
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
        .object(3, "<< /Filter /Standard /V 1 /R 2 >>");
    let size = builder.size();
    let data = builder.finish_with_trailer(&format!(
        "<< /Size {} /Root 1 0 R /Encrypt 3 0 R >>",
        size
    ));

    let err = PDFDocument::new(&data).unwrap_err();
    assert!(matches!(err, PdfError::Unsupported(_)));
}

#[test]
fn test_prev_chain_newest_entry_wins() {
    // First revision: object 3 says "old". Second revision redefines it
    // and chains to the first section with Prev.
    let mut data = Vec::new();
    data.extend_from_slice(b"%PDF-1.4\n");

    let off1 = data.len();
    data.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    let off2 = data.len();
    data.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
    let off3_old = data.len();
    data.extend_from_slice(b"3 0 obj\n(old)\nendobj\n");

    let xref1 = data.len();
    data.extend_from_slice(
        format!(
            "xref\n0 4\n0000000000 65535 f \n{:010} 00000 n \n{:010} 00000 n \n{:010} 00000 n \n",
            off1, off2, off3_old
        )
        .as_bytes(),
    );
    data.extend_from_slice(b"trailer\n<< /Size 4 /Root 1 0 R >>\n");

    let off3_new = data.len();
    data.extend_from_slice(b"3 0 obj\n(new)\nendobj\n");

    let xref2 = data.len();
    data.extend_from_slice(
        format!("xref\n3 1\n{:010} 00000 n \n", off3_new).as_bytes(),
    );
    data.extend_from_slice(
        format!("trailer\n<< /Size 4 /Root 1 0 R /Prev {} >>\n", xref1).as_bytes(),
    );
    data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref2).as_bytes());

    let doc = PDFDocument::new(&data).unwrap();
    let obj = doc.getobj(3).unwrap();
    assert_eq!(obj.as_string().unwrap(), b"new");
}

#[test]
fn test_xref_stream_and_object_streams() {
    // Catalog and Pages live compressed in an object stream; the xref is
    // a cross-reference stream with W [1 2 1].
    let mut data = Vec::new();
    data.extend_from_slice(b"%PDF-1.5\n");

    let o1 = "<< /Type /Catalog /Pages 2 0 R >>";
    let o2 = "<< /Type /Pages /Kids [3 0 R] /Count 1 >>";
    let header = format!("1 0 2 {} ", o1.len() + 1);
    let first = header.len();
    let objstm_payload = format!("{}{} {}", header, o1, o2);

    let off4 = data.len();
    data.extend_from_slice(
        format!(
            "4 0 obj\n<< /Type /ObjStm /N 2 /First {} /Length {} >>\nstream\n{}\nendstream\nendobj\n",
            first,
            objstm_payload.len(),
            objstm_payload
        )
        .as_bytes(),
    );

    let off3 = data.len();
    data.extend_from_slice(
        b"3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << >> >>\nendobj\n",
    );

    let off5 = data.len();
    // Entries: 0 free, 1-2 compressed in stream 4, 3-5 direct.
    let mut entries = Vec::new();
    entries.extend_from_slice(&[0, 0, 0, 255]); // obj 0: free
    entries.extend_from_slice(&[2, 0, 4, 0]); // obj 1: in stream 4, index 0
    entries.extend_from_slice(&[2, 0, 4, 1]); // obj 2: in stream 4, index 1
    entries.push(1);
    entries.extend_from_slice(&(off3 as u16).to_be_bytes());
    entries.push(0);
    entries.push(1);
    entries.extend_from_slice(&(off4 as u16).to_be_bytes());
    entries.push(0);
    entries.push(1);
    entries.extend_from_slice(&(off5 as u16).to_be_bytes());
    entries.push(0);

    data.extend_from_slice(
        format!(
            "5 0 obj\n<< /Type /XRef /W [1 2 1] /Size 6 /Root 1 0 R /Length {} >>\nstream\n",
            entries.len()
        )
        .as_bytes(),
    );
    data.extend_from_slice(&entries);
    data.extend_from_slice(b"\nendstream\nendobj\n");
    data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", off5).as_bytes());

    let doc = PDFDocument::new(&data).unwrap();
    assert_eq!(doc.version(), "1.5");
    assert_eq!(
        doc.catalog().type_name().as_deref(),
        Some("Catalog")
    );
    // Object 2 comes out of the object stream.
    let pages = doc.getobj(2).unwrap();
    assert_eq!(
        pages.as_dict().unwrap().get("Count").unwrap().as_int().unwrap(),
        1
    );
    // And the page itself resolves normally.
    let page = doc.getobj(3).unwrap();
    assert_eq!(
        page.as_dict().unwrap().get("Type").unwrap().as_name().unwrap(),
        "Page"
    );
}

#[test]
fn test_fallback_scan_on_broken_xref() {
    let mut data = Vec::new();
    data.extend_from_slice(b"%PDF-1.4\n");
    data.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    data.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
    data.extend_from_slice(b"trailer\n<< /Size 3 /Root 1 0 R >>\n");
    data.extend_from_slice(b"startxref\n999999\n%%EOF\n");

    let doc = PDFDocument::new(&data).unwrap();
    assert_eq!(doc.catalog().type_name().as_deref(), Some("Catalog"));
    assert!(!doc.warnings().is_empty());
}

#[test]
fn test_duplicate_dict_keys_warn_last_wins() {
    let mut builder = PdfBuilder::new("1.4");
    builder
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
        .object(3, "<< /A 1 /A 2 >>");
    let data = builder.finish(1);

    let doc = PDFDocument::new(&data).unwrap();
    let obj = doc.getobj(3).unwrap();
    assert_eq!(obj.as_dict().unwrap().get("A").unwrap().as_int().unwrap(), 2);
    assert!(doc.warnings().iter().any(|w| w.contains("duplicate")));
}
