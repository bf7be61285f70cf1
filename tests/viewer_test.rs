//! Viewer navigation and canvas lifecycle tests.

mod common;

use atril::Viewer;
use common::PdfBuilder;

fn document_with_image_on_page_two() -> Vec<u8> {
    let mut builder = PdfBuilder::new("1.6");
    builder
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 \
             /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 5 0 R >> >> >>",
        )
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 6 0 R >>")
        .object(4, "<< /Type /Page /Parent 2 0 R /Contents 7 0 R >>")
        .object(
            5,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica \
             /Encoding /WinAnsiEncoding >>",
        );
    builder.stream(6, "", b"BT /F1 12 Tf (page one text) Tj ET");
    builder.stream(
        7,
        "",
        b"BI /W 4 /H 4 /BPC 8 /CS /G ID \x10\x20\x30\x40 EI",
    );
    builder.finish(1)
}

#[test]
fn test_navigate_and_render() {
    let data = common::two_page_document();
    let mut viewer = Viewer::open(&data).unwrap();
    viewer.navigate(1).unwrap();
    viewer.render().unwrap();
    assert_eq!(viewer.canvas().strings, vec!["First page".to_string()]);
}

#[test]
fn test_next_and_prev() {
    let data = common::two_page_document();
    let mut viewer = Viewer::open(&data).unwrap();
    viewer.navigate(1).unwrap();
    viewer.next().unwrap();
    assert_eq!(viewer.current_page_number(), 2);
    viewer.render().unwrap();
    assert_eq!(
        viewer.canvas().strings,
        vec!["Sec".to_string(), "ond".to_string()]
    );
    viewer.prev().unwrap();
    assert_eq!(viewer.current_page_number(), 1);
}

#[test]
fn test_canvas_resets_on_navigation() {
    let data = document_with_image_on_page_two();
    let mut viewer = Viewer::open(&data).unwrap();

    viewer.navigate(2).unwrap();
    viewer.render().unwrap();
    assert_eq!(viewer.canvas().inline_images.len(), 1);

    viewer.prev().unwrap();
    viewer.render().unwrap();
    assert!(viewer.canvas().inline_images.is_empty());
    assert_eq!(viewer.canvas().strings, vec!["page one text".to_string()]);
}

#[test]
fn test_navigate_out_of_range() {
    let data = common::two_page_document();
    let mut viewer = Viewer::open(&data).unwrap();
    assert!(viewer.navigate(0).is_err());
    assert!(viewer.navigate(3).is_err());
    // A failed navigation leaves the viewer usable.
    viewer.navigate(2).unwrap();
    viewer.render().unwrap();
}

#[test]
fn test_render_before_navigate_is_error() {
    let data = common::two_page_document();
    let mut viewer = Viewer::open(&data).unwrap();
    assert!(viewer.render().is_err());
}

#[test]
fn test_prev_at_first_page_is_error() {
    let data = common::two_page_document();
    let mut viewer = Viewer::open(&data).unwrap();
    viewer.navigate(1).unwrap();
    assert!(viewer.prev().is_err());
}

#[test]
fn test_render_is_repeatable() {
    let data = common::two_page_document();
    let mut viewer = Viewer::open(&data).unwrap();
    viewer.navigate(1).unwrap();
    viewer.render().unwrap();
    let first = viewer.canvas().text_content.clone();
    viewer.render().unwrap();
    assert_eq!(viewer.canvas().text_content, first);
    // render resets the canvas; fragments are not duplicated.
    assert_eq!(viewer.canvas().strings.len(), 1);
}
