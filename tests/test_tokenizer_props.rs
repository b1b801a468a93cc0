//! Property tests for the tokenizer and object parser.

use pdf_objgraph::lexer::token;
use pdf_objgraph::parser::parse_object;
use pdf_objgraph::writer::ObjectSerializer;
use pdf_objgraph::{Object, PdfDocument};
use proptest::prelude::*;

proptest! {
    #[test]
    fn tokenizer_never_panics(input in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = token(&input);
        let _ = parse_object(&input);
    }

    #[test]
    fn document_open_never_panics(body in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut data = b"%PDF-1.4\n".to_vec();
        data.extend_from_slice(&body);
        if let Ok(doc) = PdfDocument::from_bytes(data) {
            let _ = doc.page_count();
        }
    }

    #[test]
    fn integers_parse_back(n in -1_000_000_000_000i64..1_000_000_000_000i64) {
        let text = format!("{} ", n);
        let (_, obj) = parse_object(text.as_bytes()).unwrap();
        prop_assert_eq!(obj, Object::Integer(n));
    }

    #[test]
    fn two_integers_without_r_stay_integers(a in 0u32..100_000, b in 0u16..100) {
        let text = format!("{} {} ", a, b);
        let (rest, obj) = parse_object(text.as_bytes()).unwrap();
        prop_assert_eq!(obj, Object::Integer(a as i64));
        let (_, second) = parse_object(rest).unwrap();
        prop_assert_eq!(second, Object::Integer(b as i64));
    }

    #[test]
    fn serialized_strings_parse_back(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let original = Object::String(bytes);
        let written = ObjectSerializer::compact().serialize(&original);
        let (_, parsed) = parse_object(&written).unwrap();
        prop_assert_eq!(parsed, original);
    }

    #[test]
    fn serialized_names_parse_back(name in "[A-Za-z0-9 #()/<>.-]{1,16}") {
        let original = Object::Name(name);
        let written = ObjectSerializer::compact().serialize(&original);
        let mut padded = written.clone();
        padded.push(b' ');
        let (_, parsed) = parse_object(&padded).unwrap();
        prop_assert_eq!(parsed, original);
    }
}
