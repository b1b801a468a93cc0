//! PDF object types.
//!
//! [`Object`] is the single value type shared by the reader and the writer.
//! [`ObjectRef`] carries the [`DocumentId`] of the table it points into, so references
//! taken from different documents never compare equal.

use crate::decoders::{self, DecodeParams};
use crate::error::{Error, Result};
use bytes::Bytes;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Dictionary payload shared by `Dictionary` and `Stream` objects.
pub type Dict = HashMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array). Text strings are read with [`Object::as_text`].
    String(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dict),
    /// Stream (dictionary + data)
    Stream {
        /// Stream dictionary
        dict: Dict,
        /// Encoded stream data, exactly as stored in the file
        data: Bytes,
        /// Decoded data, filled on the first [`Object::get_data`] call
        decoded: DecodedData,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Lazily decoded stream payload.
///
/// Two streams compare equal regardless of whether either has been decoded yet.
#[derive(Debug, Clone, Default)]
pub struct DecodedData(OnceCell<Bytes>);

impl DecodedData {
    /// Decoded bytes, if already computed.
    pub fn get(&self) -> Option<&Bytes> {
        self.0.get()
    }
}

impl PartialEq for DecodedData {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Identity of the table an [`ObjectRef`] points into.
///
/// Every opened [`PdfDocument`](crate::document::PdfDocument) and every
/// [`PdfWriter`](crate::writer::PdfWriter) allocates a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Owner of references that were built by hand rather than parsed or allocated.
    pub const DETACHED: DocumentId = DocumentId(0);

    /// Allocate a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        DocumentId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// True for [`DocumentId::DETACHED`].
    pub fn is_detached(self) -> bool {
        self == Self::DETACHED
    }
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
    /// Document whose table this reference points into
    pub owner: DocumentId,
}

impl ObjectRef {
    /// Create a detached object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self {
            id,
            gen,
            owner: DocumentId::DETACHED,
        }
    }

    /// Create a reference owned by a specific document.
    pub fn owned(id: u32, gen: u16, owner: DocumentId) -> Self {
        Self { id, gen, owner }
    }

    /// Same id and generation, different owner.
    pub fn with_owner(self, owner: DocumentId) -> Self {
        Self { owner, ..self }
    }

    /// Cross-reference/cache key: (generation, id).
    pub fn key(&self) -> (u16, u32) {
        (self.gen, self.id)
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

/// Something that can turn an [`ObjectRef`] into a value.
///
/// The parser calls back through this trait for indirect `/Length` entries, and uses
/// [`ObjectResolver::next_object_offset`] to bound streams whose length is wrong.
pub trait ObjectResolver {
    /// Resolve a reference to its value.
    fn resolve_reference(&self, obj_ref: ObjectRef) -> Result<Rc<Object>>;

    /// Byte offset of the first known object that starts after `pos`, if any.
    fn next_object_offset(&self, _pos: usize) -> Option<usize> {
        None
    }
}

impl Object {
    /// Build a stream object from its dictionary and encoded data.
    pub fn stream(dict: Dict, data: impl Into<Bytes>) -> Self {
        Object::Stream {
            dict,
            data: data.into(),
            decoded: DecodedData::default(),
        }
    }

    /// Build a name object.
    pub fn name(name: impl Into<String>) -> Self {
        Object::Name(name.into())
    }

    /// Encode a text string: PDFDocEncoding when every char fits in latin-1,
    /// UTF-16BE with a byte-order mark otherwise.
    pub fn text(text: &str) -> Self {
        if text.chars().all(|c| (c as u32) < 0x100) {
            Object::String(text.chars().map(|c| c as u8).collect())
        } else {
            let mut bytes = vec![0xFE, 0xFF];
            for unit in text.encode_utf16() {
                bytes.extend_from_slice(&unit.to_be_bytes());
            }
            Object::String(bytes)
        }
    }

    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer or real, as f64.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Mutable dictionary access. Works for both Dictionary and Stream objects.
    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to real number.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Decode a text string.
    ///
    /// UTF-16BE when the string starts with a byte-order mark, otherwise each byte
    /// is taken as a latin-1 code point.
    pub fn as_text(&self) -> Option<String> {
        let bytes = self.as_string()?;
        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let units: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            Some(String::from_utf16_lossy(&units))
        } else {
            Some(bytes.iter().map(|&b| b as char).collect())
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Look up a key in a dictionary or stream dictionary.
    pub fn get(&self, key: &str) -> Option<&Object> {
        self.as_dict().and_then(|d| d.get(key))
    }

    /// Resolve this value: references are looked up through `resolver`,
    /// everything else is returned as is.
    pub fn resolve<R: ObjectResolver + ?Sized>(&self, resolver: &R) -> Result<Object> {
        match self {
            Object::Reference(r) => Ok(resolver.resolve_reference(*r)?.as_ref().clone()),
            other => Ok(other.clone()),
        }
    }

    /// Decoded stream data.
    ///
    /// Filters named by `/Filter` are applied once; the result is cached on the
    /// stream and returned by every later call.
    pub fn get_data(&self) -> Result<Bytes> {
        self.get_data_with_limit(0)
    }

    /// Like [`Object::get_data`], failing if the decoded size exceeds `limit` bytes
    /// (0 disables the check).
    pub fn get_data_with_limit(&self, limit: usize) -> Result<Bytes> {
        match self {
            Object::Stream {
                dict,
                data,
                decoded,
            } => {
                if let Some(cached) = decoded.0.get() {
                    return Ok(cached.clone());
                }
                let filters = dict
                    .get("Filter")
                    .map(extract_filter_names)
                    .unwrap_or_default();
                let out = if filters.is_empty() {
                    data.clone()
                } else {
                    let params = extract_decode_params(dict.get("DecodeParms"), filters.len());
                    Bytes::from(decoders::decode_stream(data, &filters, &params)?)
                };
                if limit > 0 && out.len() > limit {
                    return Err(Error::Decode(format!(
                        "decoded stream is {} bytes, limit is {}",
                        out.len(),
                        limit
                    )));
                }
                Ok(decoded.0.get_or_init(|| out).clone())
            },
            _ => Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: self.type_name().to_string(),
            }),
        }
    }

    /// Visit every direct child value (array items, dictionary and stream dictionary values).
    pub fn children_mut(&mut self) -> Box<dyn Iterator<Item = &mut Object> + '_> {
        match self {
            Object::Array(items) => Box::new(items.iter_mut()),
            Object::Dictionary(dict) | Object::Stream { dict, .. } => Box::new(dict.values_mut()),
            _ => Box::new(std::iter::empty()),
        }
    }
}

/// Extract filter names from a Filter object.
///
/// The Filter entry can be either:
/// - A single Name (e.g., /FlateDecode)
/// - An Array of Names (e.g., [/ASCII85Decode /FlateDecode])
fn extract_filter_names(filter_obj: &Object) -> Vec<String> {
    match filter_obj {
        Object::Name(name) => vec![name.clone()],
        Object::Array(arr) => arr
            .iter()
            .filter_map(|obj| obj.as_name().map(|s| s.to_string()))
            .collect(),
        _ => vec![],
    }
}

/// Extract per-filter decode parameters from a DecodeParms object.
///
/// PDF Spec: ISO 32000-1:2008, Section 7.4.2 - LZWDecode and FlateDecode Parameters
///
/// A single dictionary applies to the first filter; an array lines up with the
/// filter array, with `null` standing for "no parameters".
fn extract_decode_params(params_obj: Option<&Object>, filter_count: usize) -> Vec<Option<DecodeParams>> {
    let mut out = vec![None; filter_count];
    match params_obj {
        Some(Object::Dictionary(d)) => {
            if let Some(slot) = out.first_mut() {
                *slot = Some(DecodeParams::from_dict(d));
            }
        },
        Some(Object::Array(arr)) => {
            for (slot, obj) in out.iter_mut().zip(arr) {
                *slot = obj.as_dict().map(DecodeParams::from_dict);
            }
        },
        _ => {},
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_integer() {
        let obj = Object::Integer(42);
        assert_eq!(obj.as_integer(), Some(42));
        assert_eq!(obj.as_number(), Some(42.0));
        assert!(obj.as_name().is_none());
        assert!(!obj.is_null());
    }

    #[test]
    fn test_object_name() {
        let obj = Object::name("Type");
        assert_eq!(obj.as_name(), Some("Type"));
        assert!(obj.as_integer().is_none());
    }

    #[test]
    fn test_object_dictionary() {
        let mut dict = HashMap::new();
        dict.insert("Type".to_string(), Object::name("Page"));
        let obj = Object::Dictionary(dict);

        assert_eq!(obj.get("Type").and_then(|o| o.as_name()), Some("Page"));
        assert!(obj.get("Missing").is_none());
    }

    #[test]
    fn test_object_stream_dict_access() {
        let mut dict = HashMap::new();
        dict.insert("Length".to_string(), Object::Integer(100));
        let obj = Object::stream(dict, Bytes::from_static(b"stream data"));

        let d = obj.as_dict().unwrap();
        assert_eq!(d.get("Length").unwrap().as_integer(), Some(100));
    }

    #[test]
    fn test_object_ref_display() {
        let obj_ref = ObjectRef::new(10, 0);
        assert_eq!(format!("{}", obj_ref), "10 0 R");
        assert_eq!(obj_ref.key(), (0, 10));
    }

    #[test]
    fn test_object_ref_owner_distinguishes() {
        use std::collections::HashSet;
        let a = DocumentId::next();
        let b = DocumentId::next();
        assert_ne!(a, b);
        assert!(!a.is_detached());

        let mut set = HashSet::new();
        set.insert(ObjectRef::owned(1, 0, a));
        set.insert(ObjectRef::owned(1, 0, b));
        set.insert(ObjectRef::owned(1, 0, a));
        set.insert(ObjectRef::new(1, 0));

        assert_eq!(set.len(), 3);
        assert_eq!(ObjectRef::new(1, 0).with_owner(a), ObjectRef::owned(1, 0, a));
    }

    #[test]
    fn test_text_roundtrip() {
        let latin = Object::text("Chapter 1");
        assert_eq!(latin.as_string(), Some(&b"Chapter 1"[..]));
        assert_eq!(latin.as_text().as_deref(), Some("Chapter 1"));

        let wide = Object::text("Глава");
        assert_eq!(&wide.as_string().unwrap()[..2], &[0xFE, 0xFF]);
        assert_eq!(wide.as_text().as_deref(), Some("Глава"));
    }

    #[test]
    fn test_get_data_no_filter() {
        let obj = Object::stream(HashMap::new(), Bytes::from_static(b"Hello"));
        assert_eq!(&obj.get_data().unwrap()[..], b"Hello");
    }

    #[test]
    fn test_get_data_is_cached() {
        let mut dict = HashMap::new();
        dict.insert("Filter".to_string(), Object::name("ASCIIHexDecode"));
        let obj = Object::stream(dict, Bytes::from_static(b"48656C6C6F>"));

        let first = obj.get_data().unwrap();
        assert_eq!(&first[..], b"Hello");
        match &obj {
            Object::Stream { decoded, .. } => assert_eq!(decoded.get(), Some(&first)),
            _ => unreachable!(),
        }
        // Decoded cache does not affect equality.
        let fresh = Object::stream(obj.as_dict().unwrap().clone(), Bytes::from_static(b"48656C6C6F>"));
        assert_eq!(obj, fresh);
    }

    #[test]
    fn test_get_data_filter_array_and_limit() {
        let mut dict = HashMap::new();
        dict.insert("Filter".to_string(), Object::Array(vec![Object::name("AHx")]));
        let obj = Object::stream(dict, Bytes::from_static(b"48656C6C6F"));

        assert!(matches!(obj.get_data_with_limit(2), Err(Error::Decode(_))));
        assert_eq!(&obj.get_data().unwrap()[..], b"Hello");
    }

    #[test]
    fn test_get_data_not_a_stream() {
        match Object::Integer(42).get_data() {
            Err(Error::InvalidObjectType { expected, found }) => {
                assert_eq!(expected, "Stream");
                assert_eq!(found, "Integer");
            },
            other => panic!("Expected InvalidObjectType error, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_filter_names() {
        assert_eq!(extract_filter_names(&Object::name("FlateDecode")), vec!["FlateDecode"]);
        let filter = Object::Array(vec![Object::name("ASCII85Decode"), Object::name("FlateDecode")]);
        assert_eq!(extract_filter_names(&filter), vec!["ASCII85Decode", "FlateDecode"]);
        assert!(extract_filter_names(&Object::Integer(42)).is_empty());
    }

    #[test]
    fn test_extract_decode_params_alignment() {
        let mut parms = HashMap::new();
        parms.insert("Predictor".to_string(), Object::Integer(12));
        parms.insert("Columns".to_string(), Object::Integer(4));
        let arr = Object::Array(vec![Object::Null, Object::Dictionary(parms)]);

        let params = extract_decode_params(Some(&arr), 2);
        assert!(params[0].is_none());
        assert_eq!(params[1].as_ref().map(|p| p.predictor), Some(12));
        assert_eq!(params[1].as_ref().map(|p| p.columns), Some(4));
    }

    #[test]
    fn test_children_mut() {
        let mut arr = Object::Array(vec![Object::Integer(1), Object::Integer(2)]);
        for child in arr.children_mut() {
            *child = Object::Null;
        }
        assert_eq!(arr, Object::Array(vec![Object::Null, Object::Null]));
        assert_eq!(Object::Integer(3).children_mut().count(), 0);
    }
}
