//! PDF encryption collaborators.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.6 - Encryption
//!
//! The object store and the writer do not implement any cipher themselves. A reader
//! installs a [`SecurityHandler`] on an encrypted document; a writer takes an
//! [`EncryptionContext`]. Both work per object: the key for a string or stream is
//! derived from the owning object's number and generation.
//!
//! [`EncryptDict`] reads the common entries of the `/Encrypt` dictionary for handler
//! implementations.

use crate::error::{Error, Result};
use crate::object::Object;

mod handler;

pub use handler::{EncryptionContext, PasswordStatus, SecurityHandler};

/// PDF encryption dictionary (/Encrypt entry in trailer).
///
/// PDF Spec: Section 7.6.1 - General
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptDict {
    /// Security handler name (e.g. "Standard")
    pub filter: String,
    /// SubFilter name (optional, for public-key security)
    pub sub_filter: Option<String>,
    /// Algorithm version (V)
    pub version: u32,
    /// Revision number (R), when present
    pub revision: Option<u32>,
    /// Key length in bits (Length)
    pub length: Option<u32>,
    /// User permissions (P)
    pub permissions: Option<i32>,
    /// Encrypt metadata flag (EncryptMetadata): true by default
    pub encrypt_metadata: bool,
}

impl EncryptDict {
    /// Parse an encryption dictionary from a PDF object.
    pub fn from_object(obj: &Object) -> Result<Self> {
        let dict = obj
            .as_dict()
            .ok_or_else(|| Error::ReadError("Encrypt entry is not a dictionary".to_string()))?;

        let filter = dict
            .get("Filter")
            .and_then(|o| o.as_name())
            .ok_or_else(|| Error::ReadError("Encrypt dictionary missing /Filter".to_string()))?
            .to_string();

        let int = |key: &str| dict.get(key).and_then(|o| o.as_integer());

        Ok(EncryptDict {
            filter,
            sub_filter: dict
                .get("SubFilter")
                .and_then(|o| o.as_name())
                .map(|s| s.to_string()),
            version: int("V").and_then(|v| u32::try_from(v).ok()).unwrap_or(0),
            revision: int("R").and_then(|v| u32::try_from(v).ok()),
            length: int("Length").and_then(|v| u32::try_from(v).ok()),
            permissions: int("P").map(|p| p as i32),
            encrypt_metadata: dict
                .get("EncryptMetadata")
                .and_then(|o| o.as_bool())
                .unwrap_or(true),
        })
    }

    /// Key length in bytes; `/Length` when present, otherwise the default for `/V`.
    pub fn key_length_bytes(&self) -> usize {
        match self.length {
            Some(bits) => (bits / 8) as usize,
            None => match self.version {
                1 => 5,
                5 => 32,
                _ => 16,
            },
        }
    }
}
