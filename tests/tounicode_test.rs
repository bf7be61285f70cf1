//! ToUnicode and composite-font decoding through the document path.

mod common;

use atril::interp::process_page;
use atril::{Canvas, PDFDocument, PDFPage};
use common::PdfBuilder;

fn render_first_page(data: &[u8]) -> (PDFDocument, Canvas) {
    let doc = PDFDocument::new(data).unwrap();
    let page = PDFPage::create_pages(&doc).next().unwrap().unwrap();
    let mut canvas = Canvas::new();
    process_page(&mut canvas, &page, &doc);
    (doc, canvas)
}

const TOUNICODE: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0048>
<0004> <0065006C006C006F>
endbfchar
1 beginbfrange
<0010> <0012> <0061>
endbfrange
endcmap
end
end";

fn type0_document(content: &[u8]) -> Vec<u8> {
    let mut builder = PdfBuilder::new("1.6");
    builder
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 4 0 R >> >> >>",
        )
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 7 0 R >>")
        .object(
            4,
            "<< /Type /Font /Subtype /Type0 /BaseFont /NotoSans \
             /Encoding /Identity-H /DescendantFonts [5 0 R] /ToUnicode 6 0 R >>",
        )
        .object(
            5,
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /NotoSans \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /DW 1000 /W [3 [600] 4 [700]] >>",
        );
    builder.stream(6, "", TOUNICODE);
    builder.stream(7, "", content);
    builder.finish(1)
}

#[test]
fn test_type0_tounicode_bfchar() {
    // Codes 0x0003 and 0x0004 through the ToUnicode map.
    let data = type0_document(b"BT /F1 12 Tf <00030004> Tj ET");
    let (_, canvas) = render_first_page(&data);
    assert_eq!(canvas.strings, vec!["HHello".to_string()]);
}

#[test]
fn test_type0_tounicode_bfrange() {
    // Codes 0x0010..0x0012 map to a, b, c.
    let data = type0_document(b"BT /F1 12 Tf <001000110012> Tj ET");
    let (_, canvas) = render_first_page(&data);
    assert_eq!(canvas.strings, vec!["abc".to_string()]);
}

#[test]
fn test_type0_unmapped_code_is_replacement() {
    let data = type0_document(b"BT /F1 12 Tf <0999> Tj ET");
    let (doc, canvas) = render_first_page(&data);
    assert_eq!(canvas.strings, vec!["\u{FFFD}".to_string()]);
    assert!(doc.warnings().iter().any(|w| w.contains("U+FFFD")));
}

#[test]
fn test_type0_without_tounicode_is_unmapped() {
    let mut builder = PdfBuilder::new("1.6");
    builder
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 4 0 R >> >> >>",
        )
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 5 0 R >>")
        .object(
            4,
            "<< /Type /Font /Subtype /Type0 /BaseFont /X /Encoding /Identity-H >>",
        );
    builder.stream(5, "", b"BT /F1 12 Tf <0041> Tj ET");
    let data = builder.finish(1);

    let (_, canvas) = render_first_page(&data);
    assert_eq!(canvas.strings, vec!["\u{FFFD}".to_string()]);
}

#[test]
fn test_simple_font_tounicode_overrides_encoding() {
    // The ToUnicode map wins over WinAnsi for mapped codes and falls
    // back to the encoding for the rest.
    let tounicode = b"1 begincodespacerange <00> <FF> endcodespacerange
1 beginbfchar <41> <0058> endbfchar endcmap";

    let mut builder = PdfBuilder::new("1.4");
    builder
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 4 0 R >> >> >>",
        )
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 6 0 R >>")
        .object(
            4,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica \
             /Encoding /WinAnsiEncoding /ToUnicode 5 0 R >>",
        );
    builder.stream(5, "", tounicode);
    builder.stream(6, "", b"BT /F1 12 Tf (AB) Tj ET");
    let data = builder.finish(1);

    let (_, canvas) = render_first_page(&data);
    assert_eq!(canvas.strings, vec!["XB".to_string()]);
}
