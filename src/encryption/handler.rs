//! Security handler traits.
//!
//! PDF Spec: Section 7.6.2 - General Encryption Algorithm. Strings and stream data
//! are encrypted with a key derived from the owning indirect object; everything
//! else is left alone.

use crate::error::Result;
use crate::object::{Dict, Object};

/// Outcome of a password check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordStatus {
    /// The password matched neither the user nor the owner password
    NotDecrypted,
    /// Authenticated with the user password
    User,
    /// Authenticated with the owner password
    Owner,
}

impl PasswordStatus {
    /// True if a key was established.
    pub fn is_authenticated(self) -> bool {
        !matches!(self, PasswordStatus::NotDecrypted)
    }
}

/// Read-side decryption for an encrypted document.
pub trait SecurityHandler {
    /// Check `password` and, on success, derive the document key.
    fn authenticate(&mut self, password: &[u8]) -> Result<PasswordStatus>;

    /// True once a key has been derived.
    fn is_authenticated(&self) -> bool;

    /// Decrypt one string or stream payload belonging to object `id gen`.
    fn decrypt_bytes(&self, data: &[u8], id: u32, gen: u16) -> Result<Vec<u8>>;

    /// Decrypt every string and stream payload inside `obj`.
    ///
    /// Streams get a fresh decoded-data cache; references are left alone.
    fn decrypt_object(&self, obj: Object, id: u32, gen: u16) -> Result<Object> {
        Ok(match obj {
            Object::String(bytes) => Object::String(self.decrypt_bytes(&bytes, id, gen)?),
            Object::Array(items) => Object::Array(
                items
                    .into_iter()
                    .map(|item| self.decrypt_object(item, id, gen))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.decrypt_dict(dict, id, gen)?),
            Object::Stream { dict, data, .. } => {
                let data = self.decrypt_bytes(&data, id, gen)?;
                Object::stream(self.decrypt_dict(dict, id, gen)?, data)
            },
            other => other,
        })
    }

    /// Decrypt the values of a dictionary.
    fn decrypt_dict(&self, dict: Dict, id: u32, gen: u16) -> Result<Dict> {
        dict.into_iter()
            .map(|(k, v)| Ok((k, self.decrypt_object(v, id, gen)?)))
            .collect()
    }
}

/// Write-side encryption applied by the writer during serialization.
pub trait EncryptionContext {
    /// Encrypt one string or stream payload belonging to object `id gen`.
    fn encrypt_bytes(&self, data: &[u8], id: u32, gen: u16) -> Result<Vec<u8>>;

    /// Encrypt every string and stream payload inside `obj`.
    fn encrypt_object(&self, obj: &Object, id: u32, gen: u16) -> Result<Object> {
        Ok(match obj {
            Object::String(bytes) => Object::String(self.encrypt_bytes(bytes, id, gen)?),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.encrypt_object(item, id, gen))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Object::Dictionary(dict) => Object::Dictionary(
                dict.iter()
                    .map(|(k, v)| Ok((k.clone(), self.encrypt_object(v, id, gen)?)))
                    .collect::<Result<Dict>>()?,
            ),
            Object::Stream { dict, data, .. } => {
                let encrypted = self.encrypt_bytes(data, id, gen)?;
                let dict = dict
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.encrypt_object(v, id, gen)?)))
                    .collect::<Result<Dict>>()?;
                Object::stream(dict, encrypted)
            },
            other => other.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectRef;

    /// XOR with the low byte of the object number.
    struct XorHandler {
        authenticated: bool,
    }

    impl SecurityHandler for XorHandler {
        fn authenticate(&mut self, password: &[u8]) -> Result<PasswordStatus> {
            self.authenticated = password == b"secret";
            Ok(if self.authenticated {
                PasswordStatus::User
            } else {
                PasswordStatus::NotDecrypted
            })
        }

        fn is_authenticated(&self) -> bool {
            self.authenticated
        }

        fn decrypt_bytes(&self, data: &[u8], id: u32, _gen: u16) -> Result<Vec<u8>> {
            Ok(data.iter().map(|b| b ^ id as u8).collect())
        }
    }

    impl EncryptionContext for XorHandler {
        fn encrypt_bytes(&self, data: &[u8], id: u32, gen: u16) -> Result<Vec<u8>> {
            self.decrypt_bytes(data, id, gen)
        }
    }

    #[test]
    fn test_authenticate() {
        let mut handler = XorHandler { authenticated: false };
        assert_eq!(handler.authenticate(b"wrong").unwrap(), PasswordStatus::NotDecrypted);
        assert!(!handler.is_authenticated());
        assert!(handler.authenticate(b"secret").unwrap().is_authenticated());
    }

    #[test]
    fn test_object_roundtrip_touches_strings_and_streams_only() {
        let handler = XorHandler { authenticated: true };
        let mut dict = Dict::new();
        dict.insert("Title".to_string(), Object::String(b"abc".to_vec()));
        dict.insert("Next".to_string(), Object::Reference(ObjectRef::new(3, 0)));
        dict.insert("Kind".to_string(), Object::name("Thing"));
        let original = Object::Array(vec![Object::Dictionary(dict), Object::stream(Dict::new(), b"payload".to_vec())]);

        let encrypted = handler.encrypt_object(&original, 5, 0).unwrap();
        assert_ne!(encrypted, original);
        let inner = &encrypted.as_array().unwrap()[0];
        assert_eq!(inner.get("Kind"), Some(&Object::name("Thing")));
        assert_eq!(inner.get("Next"), Some(&Object::Reference(ObjectRef::new(3, 0))));

        let decrypted = handler.decrypt_object(encrypted, 5, 0).unwrap();
        assert_eq!(decrypted, original);
    }
}
