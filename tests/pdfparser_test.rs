//! Object-syntax tests for the PDF parser.

use atril::parser::PDFParser;
use atril::PDFObject;

#[test]
fn test_parse_simple_dict() {
    let data = b"<< /Type /Page /Count 5 >>";
    let mut parser = PDFParser::new(data);
    let obj = parser.parse_object().unwrap();

    let dict = obj.as_dict().unwrap();
    assert_eq!(dict.get("Type").unwrap().as_name().unwrap(), "Page");
    assert_eq!(dict.get("Count").unwrap().as_int().unwrap(), 5);
}

#[test]
fn test_parse_nested_dict() {
    let data = b"<< /Resources << /Font << /F1 1 0 R >> >> >>";
    let mut parser = PDFParser::new(data);
    let obj = parser.parse_object().unwrap();

    let dict = obj.as_dict().unwrap();
    let resources = dict.get("Resources").unwrap().as_dict().unwrap();
    let font = resources.get("Font").unwrap().as_dict().unwrap();
    let f1 = font.get("F1").unwrap().as_objref().unwrap();
    assert_eq!(f1.objid, 1);
    assert_eq!(f1.genno, 0);
}

#[test]
fn test_parse_array_of_mixed_values() {
    let data = b"[ 1 2.5 /Name (string) <414243> true null ]";
    let mut parser = PDFParser::new(data);
    let obj = parser.parse_object().unwrap();

    let arr = obj.as_array().unwrap();
    assert_eq!(arr.len(), 7);
    assert_eq!(arr[0].as_int().unwrap(), 1);
    assert_eq!(arr[1].as_num().unwrap(), 2.5);
    assert_eq!(arr[2].as_name().unwrap(), "Name");
    assert_eq!(arr[3].as_string().unwrap(), b"string");
    assert_eq!(arr[4].as_string().unwrap(), b"ABC");
    assert_eq!(arr[5], PDFObject::Bool(true));
    assert!(arr[6].is_null());
}

#[test]
fn test_reference_requires_r_keyword() {
    let mut parser = PDFParser::new(b"[1 0 R 1 0 2]");
    let obj = parser.parse_object().unwrap();
    let arr = obj.as_array().unwrap();
    assert_eq!(arr.len(), 4);
    assert!(arr[0].as_objref().is_ok());
    assert_eq!(arr[1].as_int().unwrap(), 1);
    assert_eq!(arr[2].as_int().unwrap(), 0);
    assert_eq!(arr[3].as_int().unwrap(), 2);
}

#[test]
fn test_name_hex_escapes() {
    let mut parser = PDFParser::new(b"/Adobe#20Green");
    let obj = parser.parse_object().unwrap();
    assert_eq!(obj.as_name().unwrap(), "Adobe Green");
}

#[test]
fn test_string_escapes() {
    let mut parser = PDFParser::new(b"(line1\\nline2 \\(paren\\) \\101)");
    let obj = parser.parse_object().unwrap();
    assert_eq!(obj.as_string().unwrap(), b"line1\nline2 (paren) A");
}

#[test]
fn test_unterminated_dict_is_error() {
    let mut parser = PDFParser::new(b"<< /Key (value)");
    assert!(parser.parse_object().is_err());
}

#[test]
fn test_comments_ignored() {
    let mut parser = PDFParser::new(b"% leading comment\n42");
    assert_eq!(parser.parse_object().unwrap().as_int().unwrap(), 42);
}
