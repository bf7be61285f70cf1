//! Geometry and byte-handling helpers shared across the engine.

/// A 2D point (x, y).
pub type Point = (f64, f64);

/// A rectangle (x0, y0, x1, y1), bottom-left to top-right.
pub type Rect = (f64, f64, f64, f64);

/// A 6-element affine transformation matrix (a, b, c, d, e, f).
/// Transforms point (x, y) to (ax + cy + e, bx + dy + f).
pub type Matrix = (f64, f64, f64, f64, f64, f64);

/// Identity transformation matrix.
pub const MATRIX_IDENTITY: Matrix = (1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

/// Multiplies two matrices: result = m1 * m0 (m0 applied first).
pub fn mult_matrix(m1: Matrix, m0: Matrix) -> Matrix {
    let (a1, b1, c1, d1, e1, f1) = m1;
    let (a0, b0, c0, d0, e0, f0) = m0;
    (
        a0 * a1 + c0 * b1,
        b0 * a1 + d0 * b1,
        a0 * c1 + c0 * d1,
        b0 * c1 + d0 * d1,
        a0 * e1 + c0 * f1 + e0,
        b0 * e1 + d0 * f1 + f0,
    )
}

/// Moves the origin of a matrix to the given point in its own coordinate
/// system.
pub fn translate_matrix(m: Matrix, v: Point) -> Matrix {
    let (a, b, c, d, e, f) = m;
    let (x, y) = v;
    (a, b, c, d, x * a + y * c + e, x * b + y * d + f)
}

/// Applies a matrix to a point.
pub fn apply_matrix_pt(m: Matrix, v: Point) -> Point {
    let (a, b, c, d, e, f) = m;
    let (x, y) = v;
    (a * x + c * y + e, b * x + d * y + f)
}

/// Unpacks up to 8 big-endian bytes into an integer.
/// Empty input returns the default.
pub fn nunpack(s: &[u8], default: u64) -> u64 {
    if s.is_empty() {
        return default;
    }
    let mut value: u64 = 0;
    for &b in s.iter().take(8) {
        value = (value << 8) | b as u64;
    }
    value
}

/// Decodes a PDF text string: UTF-16BE when it carries a BOM, otherwise
/// PDFDocEncoding treated as Latin-1 (sufficient for the printable range).
pub fn decode_text(s: &[u8]) -> String {
    if s.starts_with(&[0xfe, 0xff]) {
        let mut out = String::new();
        for chunk in s[2..].chunks(2) {
            if chunk.len() == 2 {
                let cp = u16::from_be_bytes([chunk[0], chunk[1]]);
                if let Some(c) = char::from_u32(cp as u32) {
                    out.push(c);
                }
            }
        }
        out
    } else {
        s.iter().map(|&b| char::from(b)).collect()
    }
}

/// Formats a number the way content streams print them: integers bare,
/// reals with the shortest representation that round-trips.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let mut s = format!("{}", value);
        if let Some(stripped) = s.strip_suffix(".0") {
            s = stripped.to_string();
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mult_matrix_identity() {
        let m = (2.0, 0.0, 0.0, 3.0, 5.0, 7.0);
        assert_eq!(mult_matrix(m, MATRIX_IDENTITY), m);
        assert_eq!(mult_matrix(MATRIX_IDENTITY, m), m);
    }

    #[test]
    fn test_apply_matrix_pt() {
        let m = (2.0, 0.0, 0.0, 2.0, 1.0, 1.0);
        assert_eq!(apply_matrix_pt(m, (3.0, 4.0)), (7.0, 9.0));
    }

    #[test]
    fn test_nunpack() {
        assert_eq!(nunpack(&[], 9), 9);
        assert_eq!(nunpack(&[0x01, 0x00], 0), 256);
        assert_eq!(nunpack(&[0xff], 0), 255);
    }

    #[test]
    fn test_decode_text_utf16() {
        assert_eq!(decode_text(&[0xfe, 0xff, 0x00, 0x41]), "A");
        assert_eq!(decode_text(b"plain"), "plain");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-1.5), "-1.5");
        assert_eq!(format_number(0.0), "0");
    }
}
