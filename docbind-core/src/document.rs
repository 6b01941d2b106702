//! The base document type: an attribute bag bound to a schema and a session.
//!
//! A [`Model`] starts without an identity. The first successful
//! [`save`](Model::save) gives it one; later saves replace the stored
//! document in place. [`to_dict`](Model::to_dict) produces the external
//! representation, where the identity is only ever exposed as the resource
//! name under the `id` key.
//!
//! ```ignore
//! let mut post = session.create::<Post>();
//! post.populate(doc! { "title": "Hello" });
//! post.save().await?;
//!
//! let out = post.to_dict(&["title", "title_length"]);
//! assert_eq!(out.get_str("id")?, post.resource_name().unwrap());
//! ```

use bson::{Bson, Document, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, marker::PhantomData};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    filter::ID_KEY,
    query::Query,
    schema::{self, Schema},
    session::Session,
};

/// Key under which [`Model::to_dict`] exposes the resource name.
pub const EXTERNAL_ID_KEY: &str = "id";

/// One stored (or yet to be stored) document of type `S`.
pub struct Model<S: Schema> {
    session: Session,
    id: Option<ObjectId>,
    attributes: Document,
    _schema: PhantomData<fn() -> S>,
}

impl<S: Schema> Model<S> {
    /// Creates an unsaved model with the schema's default values.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            id: None,
            attributes: schema::defaults::<S>(),
            _schema: PhantomData,
        }
    }

    /// Rebuilds a model from a stored document, taking the identity from [`ID_KEY`].
    pub fn from_stored(session: Session, mut document: Document) -> DocumentStoreResult<Self> {
        let id = match document.remove(ID_KEY) {
            Some(Bson::ObjectId(id)) => id,
            Some(other) => {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "stored identity in {} is not an object id: {other}",
                    S::collection_name()
                )));
            }
            None => {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "stored document in {} has no identity",
                    S::collection_name()
                )));
            }
        };

        Ok(Self {
            session,
            id: Some(id),
            attributes: document,
            _schema: PhantomData,
        })
    }

    /// Creates an unsaved model from any serializable value.
    ///
    /// An `_id` produced by the value is ignored; identity is only assigned by saving.
    pub fn from_typed<T: Serialize>(session: Session, value: &T) -> DocumentStoreResult<Self> {
        let mut model = Self::new(session);
        model.populate(into_document(serialize_to_bson(value)?)?);
        model.attributes.remove(ID_KEY);
        Ok(model)
    }

    /// Deserializes the attributes into `T`. The identity is exposed as `_id`.
    pub fn to_typed<T: for<'de> Deserialize<'de>>(&self) -> DocumentStoreResult<T> {
        Ok(deserialize_from_bson(Bson::Document(self.wrap()))?)
    }

    /// A query over every document of this type.
    pub fn query(session: &Session) -> Query<S> {
        Query::new(session.clone())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn collection_name() -> &'static str {
        S::collection_name()
    }

    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }

    pub fn id(&self) -> Option<&ObjectId> {
        self.id.as_ref()
    }

    /// Hex rendering of the identity.
    pub fn pk(&self) -> Option<String> {
        self.id.map(|id| id.to_hex())
    }

    /// Globally unique name: `"<collection>:<identity>"`.
    pub fn resource_name(&self) -> Option<String> {
        self.id.map(|id| format!("{}:{}", S::collection_name(), id.to_hex()))
    }

    pub fn attributes(&self) -> &Document {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&Bson> {
        self.attributes.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Bson::as_str)
    }

    /// Assigns one attribute. Nothing is validated until the model is saved.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Bson>) -> &mut Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn unset(&mut self, name: &str) -> Option<Bson> {
        self.attributes.remove(name)
    }

    /// Assigns every entry of `data`, overwriting existing values.
    pub fn populate(&mut self, data: impl IntoIterator<Item = (String, Bson)>) -> &mut Self {
        for (name, value) in data {
            self.attributes.insert(name, value);
        }
        self
    }

    /// Like [`populate`](Model::populate) for a JSON object, such as a request body.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if `data` is not an object.
    pub fn populate_json(&mut self, data: &Value) -> DocumentStoreResult<&mut Self> {
        if !data.is_object() {
            return Err(DocumentStoreError::InvalidDocument("expected a JSON object".to_string()));
        }

        let document = into_document(serialize_to_bson(data)?)?;
        Ok(self.populate(document))
    }

    /// The persisted mapping: every attribute plus the identity when present.
    pub fn wrap(&self) -> Document {
        let mut raw = self.attributes.clone();
        if let Some(id) = self.id {
            raw.insert(ID_KEY, id);
        }
        raw
    }

    /// Writes the document and waits for the backend to take it.
    ///
    /// Only this model's write is applied. Writes queued on the session by
    /// [`Session::insert`] stay queued.
    ///
    /// # Errors
    ///
    /// Validation failures surface as [`DocumentStoreError::Validation`];
    /// backend failures pass through unchanged.
    pub async fn save(&mut self) -> DocumentStoreResult<()> {
        self.save_with(None).await
    }

    /// [`save`](Model::save) with an explicit write-acknowledgment flag.
    pub async fn save_with(&mut self, safe: Option<bool>) -> DocumentStoreResult<()> {
        let id = self.session.save_now(self, safe).await?;
        self.id = Some(id);
        Ok(())
    }

    /// Saves, answering invalid data with [`DocumentStoreError::BadRequest`].
    pub async fn maybe_save(&mut self) -> DocumentStoreResult<()> {
        self.save().await.map_err(DocumentStoreError::into_bad_request)
    }

    /// Deletes the document and waits for the backend. The model loses its identity.
    pub async fn remove(&mut self) -> DocumentStoreResult<()> {
        self.remove_with(None).await
    }

    pub async fn remove_with(&mut self, safe: Option<bool>) -> DocumentStoreResult<()> {
        self.session.remove_now(self, safe).await?;
        self.id = None;
        Ok(())
    }

    /// External representation of the document.
    ///
    /// With no `include` names the result holds every persisted attribute.
    /// Otherwise it holds the requested names found among the persisted
    /// attributes, then the requested names that are virtual attributes of
    /// the schema, evaluated now. A persisted attribute shadows a virtual one
    /// of the same name. The identity key never appears; `id` always holds
    /// the resource name, or null before the first save.
    pub fn to_dict(&self, include: &[&str]) -> Document {
        let raw = self.wrap();

        let mut data = if include.is_empty() {
            let mut data = raw.clone();
            data.remove(ID_KEY);
            data
        } else {
            include
                .iter()
                .filter(|name| **name != ID_KEY)
                .filter_map(|name| raw.get(*name).map(|value| (name.to_string(), value.clone())))
                .collect()
        };

        let wanted = include
            .iter()
            .filter(|name| **name != ID_KEY && !raw.contains_key(**name))
            .collect::<Vec<_>>();

        if !wanted.is_empty() {
            for attr in S::virtuals() {
                if wanted.contains(&&attr.name) {
                    data.insert(attr.name, attr.evaluate(self));
                }
            }
        }

        data.insert(
            EXTERNAL_ID_KEY,
            self.resource_name().map(Bson::String).unwrap_or(Bson::Null),
        );

        data
    }

    /// [`to_dict`](Model::to_dict) rendered as JSON.
    pub fn to_json(&self, include: &[&str]) -> DocumentStoreResult<Value> {
        Ok(serde_json::to_value(Bson::Document(self.to_dict(include)))?)
    }
}

fn into_document(bson: Bson) -> DocumentStoreResult<Document> {
    match bson {
        Bson::Document(document) => Ok(document),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
    }
}

impl<S: Schema> Clone for Model<S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            id: self.id,
            attributes: self.attributes.clone(),
            _schema: PhantomData,
        }
    }
}

impl<S: Schema> fmt::Debug for Model<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("collection", &S::collection_name())
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Models are equal when both are saved and share an identity.
impl<S: Schema> PartialEq for Model<S> {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }
}
