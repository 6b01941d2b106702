//! Escaping of document keys that MongoDB does not accept.
//!
//! MongoDB reserves dots for nested paths and a leading dollar sign for
//! operators, and rejects null bytes in keys. Attribute names may contain any
//! of them, so keys are escaped on the way in and restored on the way out.
//! Values are stored untouched.

use bson::{Bson, Document};

pub(crate) struct KeySanitizer;

impl KeySanitizer {
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    pub(crate) fn sanitize_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::sanitize_key(&key), Self::sanitize_value(value)))
            .collect()
    }

    fn sanitize_value(value: Bson) -> Bson {
        match value {
            Bson::Document(document) => Bson::Document(Self::sanitize_document(document)),
            Bson::Array(items) => Bson::Array(items.into_iter().map(Self::sanitize_value).collect()),
            other => other,
        }
    }

    pub(crate) fn sanitize_key(key: &str) -> String {
        Self::REPLACEMENTS
            .iter()
            .fold(key.to_string(), |key, (target, replacement)| key.replace(target, replacement))
    }

    pub(crate) fn restore_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::restore_key(&key), Self::restore_value(value)))
            .collect()
    }

    fn restore_value(value: Bson) -> Bson {
        match value {
            Bson::Document(document) => Bson::Document(Self::restore_document(document)),
            Bson::Array(items) => Bson::Array(items.into_iter().map(Self::restore_value).collect()),
            other => other,
        }
    }

    pub(crate) fn restore_key(key: &str) -> String {
        Self::REPLACEMENTS
            .iter()
            .rev()
            .fold(key.to_string(), |key, (target, replacement)| key.replace(replacement, target))
    }
}
