//! Declared fields and computed attributes of a document type.
//!
//! A [`Schema`] is attached to a document type at definition time. It lists
//! the persisted [`FieldDef`]s with their kind and required flag, and the
//! [`Virtual`] attributes that [`Model::to_dict`](crate::document::Model::to_dict)
//! may include on request.
//!
//! ```ignore
//! use docbind::schema::{FieldDef, FieldKind, Schema, Virtual};
//!
//! struct Post;
//!
//! impl Schema for Post {
//!     fn collection_name() -> &'static str {
//!         "posts"
//!     }
//!
//!     fn fields() -> Vec<FieldDef> {
//!         vec![
//!             FieldDef::new("title", FieldKind::String),
//!             FieldDef::new("views", FieldKind::Int).with_default(0),
//!             FieldDef::new("tags", FieldKind::Array(Box::new(FieldKind::String))).optional(),
//!         ]
//!     }
//!
//!     fn virtuals() -> Vec<Virtual<Self>> {
//!         vec![Virtual::new("title_length", |post| {
//!             post.get_str("title").map(|t| t.len() as i64).unwrap_or(0).into()
//!         })]
//!     }
//! }
//! ```

use bson::{Bson, Document};

use crate::{document::Model, error::ValidationError, filter::ID_KEY};

/// The kind of value a field accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    /// 32 or 64 bit integer.
    Int,
    /// Double, or an integer that widens to one.
    Float,
    Bool,
    DateTime,
    ObjectId,
    /// Embedded sub-document.
    Document,
    /// Array whose elements all match the inner kind.
    Array(Box<FieldKind>),
    /// Anything but null.
    Any,
}

impl FieldKind {
    pub fn accepts(&self, value: &Bson) -> bool {
        match (self, value) {
            (FieldKind::String, Bson::String(_)) => true,
            (FieldKind::Int, Bson::Int32(_) | Bson::Int64(_)) => true,
            (FieldKind::Float, Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_)) => true,
            (FieldKind::Bool, Bson::Boolean(_)) => true,
            (FieldKind::DateTime, Bson::DateTime(_)) => true,
            (FieldKind::ObjectId, Bson::ObjectId(_)) => true,
            (FieldKind::Document, Bson::Document(_)) => true,
            (FieldKind::Array(inner), Bson::Array(items)) => items.iter().all(|item| inner.accepts(item)),
            (FieldKind::Any, value) => !matches!(value, Bson::Null),
            _ => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            FieldKind::String => "string".into(),
            FieldKind::Int => "integer".into(),
            FieldKind::Float => "number".into(),
            FieldKind::Bool => "boolean".into(),
            FieldKind::DateTime => "datetime".into(),
            FieldKind::ObjectId => "object id".into(),
            FieldKind::Document => "document".into(),
            FieldKind::Array(inner) => format!("array of {}", inner.describe()),
            FieldKind::Any => "any value".into(),
        }
    }
}

/// A declared, persisted field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Bson>,
    pub validator: Option<fn(&Bson) -> bool>,
}

impl FieldDef {
    /// A required field of the given kind.
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            validator: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Value assigned to new models. A field with a default is not required.
    pub fn with_default(mut self, value: impl Into<Bson>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    /// Extra check run after the kind check.
    pub fn validated_by(mut self, validator: fn(&Bson) -> bool) -> Self {
        self.validator = Some(validator);
        self
    }

    fn check(&self, value: Option<&Bson>) -> Result<(), ValidationError> {
        let value = match value {
            None | Some(Bson::Null) if self.required => {
                return Err(ValidationError::MissingValue { field: self.name.to_string() });
            }
            None | Some(Bson::Null) => return Ok(()),
            Some(value) => value,
        };

        if !self.kind.accepts(value) {
            return Err(ValidationError::BadValue {
                field: self.name.to_string(),
                reason: format!("expected {}, got {:?}", self.kind.describe(), value.element_type()),
            });
        }

        if let Some(validator) = self.validator {
            if !validator(value) {
                return Err(ValidationError::BadValue {
                    field: self.name.to_string(),
                    reason: "rejected by validator".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// A computed attribute, evaluated when serialized and never persisted.
pub struct Virtual<S: Schema> {
    pub name: &'static str,
    pub accessor: fn(&Model<S>) -> Bson,
}

impl<S: Schema> Virtual<S> {
    pub fn new(name: &'static str, accessor: fn(&Model<S>) -> Bson) -> Self {
        Self { name, accessor }
    }

    pub fn evaluate(&self, model: &Model<S>) -> Bson {
        (self.accessor)(model)
    }
}

/// Type-level description of a document type.
pub trait Schema: Send + Sync + Sized + 'static {
    /// Name of the collection documents of this type live in.
    fn collection_name() -> &'static str;

    /// Declared persisted fields, in validation order.
    fn fields() -> Vec<FieldDef>;

    /// Computed attributes available to serialization.
    fn virtuals() -> Vec<Virtual<Self>> {
        Vec::new()
    }
}

/// Checks `attributes` against the fields declared by `S`.
///
/// Declared fields are checked in order, then undeclared keys. The identity
/// key is never treated as an attribute.
pub fn validate<S: Schema>(attributes: &Document) -> Result<(), ValidationError> {
    let fields = S::fields();

    for field in &fields {
        field.check(attributes.get(field.name))?;
    }

    if let Some(extra) = attributes
        .keys()
        .find(|key| key.as_str() != ID_KEY && !fields.iter().any(|field| field.name == key.as_str()))
    {
        return Err(ValidationError::ExtraValue { field: extra.to_string() });
    }

    Ok(())
}

/// Default values of `S`'s fields, keyed by field name.
pub fn defaults<S: Schema>() -> Document {
    S::fields()
        .into_iter()
        .filter_map(|field| field.default.map(|value| (field.name.to_string(), value)))
        .collect()
}
