//! PDF object serialization.
//!
//! Serializes PDF objects to their byte representation according to
//! PDF specification ISO 32000-1:2008, Section 7.3.

use crate::object::{Dict, Object};

/// Serializer for PDF objects.
///
/// Converts PDF Object types to their byte representation following
/// the PDF specification syntax rules. Dictionary keys are written in sorted
/// order so output is reproducible.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Whether to use compact formatting (minimal whitespace)
    compact: bool,
}

impl ObjectSerializer {
    /// Create a new object serializer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj);
        buf
    }

    /// Serialize an object to a string (for debugging).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).to_string()
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn serialize_indirect(&self, id: u32, gen: u16, obj: &Object) -> Vec<u8> {
        let mut buf = format!("{} {} obj\n", id, gen).into_bytes();
        self.write_object(&mut buf, obj);
        buf.extend_from_slice(b"\nendobj\n");
        buf
    }

    fn write_object(&self, w: &mut Vec<u8>, obj: &Object) {
        match obj {
            Object::Null => w.extend_from_slice(b"null"),
            Object::Boolean(b) => w.extend_from_slice(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => w.extend_from_slice(i.to_string().as_bytes()),
            Object::Real(r) => self.write_real(w, *r),
            Object::String(s) => self.write_string(w, s),
            Object::Name(n) => self.write_name(w, n),
            Object::Array(arr) => self.write_array(w, arr),
            Object::Dictionary(dict) => self.write_dictionary(w, dict),
            Object::Stream { dict, data, .. } => self.write_stream(w, dict, data),
            Object::Reference(r) => w.extend_from_slice(format!("{} {} R", r.id, r.gen).as_bytes()),
        }
    }

    /// Write a real number with appropriate precision.
    fn write_real(&self, w: &mut Vec<u8>, value: f64) {
        if !value.is_finite() {
            w.extend_from_slice(b"0.0");
            return;
        }
        // Display is the shortest text that reads back exactly, never in exponent form
        let text = value.to_string();
        w.extend_from_slice(text.as_bytes());
        if !text.contains('.') {
            w.extend_from_slice(b".0");
        }
    }

    /// Write a PDF string.
    ///
    /// Uses literal string syntax `(...)` with proper escaping,
    /// or hex string syntax `<...>` for binary data.
    fn write_string(&self, w: &mut Vec<u8>, data: &[u8]) {
        let is_printable = data
            .iter()
            .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));

        if is_printable {
            w.push(b'(');
            for &byte in data {
                match byte {
                    b'(' => w.extend_from_slice(b"\\("),
                    b')' => w.extend_from_slice(b"\\)"),
                    b'\\' => w.extend_from_slice(b"\\\\"),
                    b'\n' => w.extend_from_slice(b"\\n"),
                    b'\r' => w.extend_from_slice(b"\\r"),
                    b'\t' => w.extend_from_slice(b"\\t"),
                    _ => w.push(byte),
                }
            }
            w.push(b')');
        } else {
            w.push(b'<');
            for byte in data {
                w.extend_from_slice(format!("{:02X}", byte).as_bytes());
            }
            w.push(b'>');
        }
    }

    /// Write a PDF name.
    ///
    /// Names start with `/`; delimiters, `#` and bytes outside `!`..`~` are written
    /// as `#xx`.
    fn write_name(&self, w: &mut Vec<u8>, name: &str) {
        w.push(b'/');
        for byte in name.bytes() {
            match byte {
                b'#' | b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' => {
                    w.extend_from_slice(format!("#{:02X}", byte).as_bytes())
                },
                b'!'..=b'~' => w.push(byte),
                _ => w.extend_from_slice(format!("#{:02X}", byte).as_bytes()),
            }
        }
    }

    /// Write a PDF array.
    fn write_array(&self, w: &mut Vec<u8>, arr: &[Object]) {
        w.push(b'[');
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                w.push(b' ');
            }
            self.write_object(w, obj);
        }
        w.push(b']');
    }

    /// Write a PDF dictionary.
    fn write_dictionary(&self, w: &mut Vec<u8>, dict: &Dict) {
        w.extend_from_slice(b"<<");

        // Sort keys for deterministic output
        let mut keys: Vec<_> = dict.keys().collect();
        keys.sort();

        for key in keys {
            w.extend_from_slice(if self.compact { b" " } else { b"\n  " });
            self.write_name(w, key);
            w.push(b' ');
            self.write_object(w, &dict[key]);
        }

        if !dict.is_empty() {
            w.extend_from_slice(if self.compact { b" " } else { b"\n" });
        }
        w.extend_from_slice(b">>");
    }

    /// Write a PDF stream. `/Length` always states the bytes actually written.
    fn write_stream(&self, w: &mut Vec<u8>, dict: &Dict, data: &[u8]) {
        let mut dict_with_length = dict.clone();
        dict_with_length.insert("Length".to_string(), Object::Integer(data.len() as i64));

        self.write_dictionary(w, &dict_with_length);
        w.extend_from_slice(b"\nstream\n");
        w.extend_from_slice(data);
        w.extend_from_slice(b"\nendstream");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectRef;
    use crate::parser::parse_object;

    #[test]
    fn test_serialize_scalars() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::Null), "null");
        assert_eq!(s.serialize_to_string(&Object::Boolean(true)), "true");
        assert_eq!(s.serialize_to_string(&Object::Integer(-123)), "-123");
    }

    #[test]
    fn test_serialize_real() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::Real(3.14258)), "3.14258");
        assert_eq!(s.serialize_to_string(&Object::Real(1.0)), "1.0");
        assert_eq!(s.serialize_to_string(&Object::Real(0.5)), "0.5");
        assert_eq!(s.serialize_to_string(&Object::Real(f64::NAN)), "0.0");
    }

    #[test]
    fn test_whole_and_precise_reals_stay_real() {
        let s = ObjectSerializer::compact();
        for value in [1.0, -3.0, 1e20, 0.123456789, 1e-7, 612.5] {
            let mut written = s.serialize(&Object::Real(value));
            written.push(b' ');
            let (_, parsed) = parse_object(&written).unwrap();
            assert_eq!(parsed, Object::Real(value), "{}", String::from_utf8_lossy(&written));
        }
    }

    #[test]
    fn test_serialize_string() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::String(b"Hello".to_vec())), "(Hello)");
        assert_eq!(
            s.serialize_to_string(&Object::String(b"Test (parens)".to_vec())),
            "(Test \\(parens\\))"
        );
        assert_eq!(s.serialize_to_string(&Object::String(vec![0x00, 0xFF, 0x80])), "<00FF80>");
    }

    #[test]
    fn test_serialize_name_escapes() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::name("Type")), "/Type");
        assert_eq!(s.serialize_to_string(&Object::name("Name With Space")), "/Name#20With#20Space");
        assert_eq!(s.serialize_to_string(&Object::name("A#(B)")), "/A#23#28B#29");
    }

    #[test]
    fn test_serialize_containers() {
        let s = ObjectSerializer::compact();
        let arr = Object::Array(vec![Object::Integer(1), Object::Reference(ObjectRef::new(10, 0))]);
        assert_eq!(s.serialize_to_string(&arr), "[1 10 0 R]");

        let mut dict = Dict::new();
        dict.insert("Type".to_string(), Object::name("Page"));
        dict.insert("Count".to_string(), Object::Integer(1));
        assert_eq!(s.serialize_to_string(&Object::Dictionary(dict)), "<< /Count 1 /Type /Page >>");
        assert_eq!(s.serialize_to_string(&Object::Dictionary(Dict::new())), "<<>>");
    }

    #[test]
    fn test_serialize_indirect() {
        let s = ObjectSerializer::new();
        let bytes = s.serialize_indirect(1, 0, &Object::Integer(42));
        assert_eq!(bytes, b"1 0 obj\n42\nendobj\n");
    }

    #[test]
    fn test_stream_length_is_rewritten() {
        let s = ObjectSerializer::compact();
        let mut dict = Dict::new();
        dict.insert("Length".to_string(), Object::Integer(999));
        let stream = Object::stream(dict, b"stream data".to_vec());

        let result = s.serialize_to_string(&stream);
        assert!(result.contains("/Length 11"));
        assert!(result.ends_with("stream\nstream data\nendstream"));
    }

    #[test]
    fn test_output_parses_back() {
        let mut dict = Dict::new();
        dict.insert("Title".to_string(), Object::String(b"a\\b(c)\n".to_vec()));
        dict.insert("Odd Name".to_string(), Object::Array(vec![Object::Real(-0.25), Object::Null]));
        let original = Object::Dictionary(dict);

        for s in [ObjectSerializer::new(), ObjectSerializer::compact()] {
            let bytes = s.serialize(&original);
            let (_, parsed) = parse_object(&bytes).unwrap();
            assert_eq!(parsed, original);
        }
    }
}
