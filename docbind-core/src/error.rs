//! Error types and result types for document store operations.
//!
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.
//! Two variants are meant for the request boundary: [`DocumentStoreError::NotFound`]
//! and [`DocumentStoreError::BadRequest`]. Use [`DocumentStoreError::status_code`]
//! to map them onto a response.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// A document failed schema validation while being written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A declared field holds a value of the wrong kind or one rejected by its validator.
    #[error("Bad value for field {field}: {reason}")]
    BadValue { field: String, reason: String },
    /// A required field is absent or null.
    #[error("Missing value for required field {field}")]
    MissingValue { field: String },
    /// A field is present that the schema does not declare.
    #[error("Extra value for undeclared field {field}")]
    ExtraValue { field: String },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::BadValue { field, .. }
            | ValidationError::MissingValue { field }
            | ValidationError::ExtraValue { field } => field,
        }
    }
}

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// Application settings are missing or malformed. Not recoverable at runtime.
    #[error("Improperly configured: {0}")]
    Configuration(String),
    /// The document has an invalid structure for the requested operation.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// The document was rejected by its schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The requested resource does not exist. Surfaced as a 404 response.
    #[error("Resource not found")]
    NotFound,
    /// The submitted data is invalid. Surfaced as a 400 response.
    #[error("Bad request")]
    BadRequest(#[source] ValidationError),
}

impl DocumentStoreError {
    /// Narrows a validation failure into [`DocumentStoreError::BadRequest`].
    ///
    /// Every other error passes through unchanged.
    pub fn into_bad_request(self) -> Self {
        match self {
            DocumentStoreError::Validation(err) => DocumentStoreError::BadRequest(err),
            other => other,
        }
    }

    /// The HTTP status the request boundary should answer with, if this
    /// error is one of the user-facing conditions.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DocumentStoreError::NotFound => Some(404),
            DocumentStoreError::BadRequest(_) => Some(400),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentStoreError::NotFound)
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
