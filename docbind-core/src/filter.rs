//! Filter expressions and the selector handed to store backends.
//!
//! Predicates are built from a [`Field`] path and combined with [`Expr::and`],
//! [`Expr::or`] and [`Expr::not`]:
//!
//! ```ignore
//! use docbind::filter::Field;
//!
//! let adults_named_ann = Field::new("name").eq("Ann").and(Field::new("age").gte(18));
//! ```
//!
//! Backends interpret an [`Expr`] by implementing [`QueryVisitor`].

use bson::{Bson, oid::ObjectId};

use crate::error::DocumentStoreError;

/// Key under which the store keeps a document's identity.
pub const ID_KEY: &str = "_id";

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Field comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Field value is one of the values in an array.
    In,
    /// Field value is none of the values in an array.
    NotIn,
}

/// A filter expression over stored documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// All sub-expressions match.
    And(Vec<Expr>),
    /// Any sub-expression matches.
    Or(Vec<Expr>),
    /// The sub-expression does not match.
    Not(Box<Expr>),
    /// The field is present (`true`) or absent (`false`).
    Exists(String, bool),
    /// Compares a field against a value.
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    /// Combines with `other` using logical AND, flattening nested ANDs.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines with `other` using logical OR, flattening nested ORs.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn all(exprs: impl IntoIterator<Item = Expr>) -> Self {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn any(exprs: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Or(exprs.into_iter().collect())
    }
}

/// A field path used to build predicates.
#[derive(Debug, Clone)]
pub struct Field(String);

impl Field {
    pub fn new(path: impl Into<String>) -> Self {
        Field(path.into())
    }

    /// The identity field.
    pub fn id() -> Self {
        Field(ID_KEY.to_string())
    }

    pub fn path(&self) -> &str {
        &self.0
    }

    fn op(self, op: FieldOp, value: impl Into<Bson>) -> Expr {
        Expr::Field { field: self.0, op, value: value.into() }
    }

    pub fn eq(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::Ne, value)
    }

    pub fn gt(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::Gt, value)
    }

    pub fn gte(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::Gte, value)
    }

    pub fn lt(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::Lt, value)
    }

    pub fn lte(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::Lte, value)
    }

    pub fn in_values<V: Into<Bson>>(self, values: impl IntoIterator<Item = V>) -> Expr {
        let values = values.into_iter().map(Into::into).collect::<Vec<Bson>>();
        self.op(FieldOp::In, Bson::Array(values))
    }

    pub fn not_in_values<V: Into<Bson>>(self, values: impl IntoIterator<Item = V>) -> Expr {
        let values = values.into_iter().map(Into::into).collect::<Vec<Bson>>();
        self.op(FieldOp::NotIn, Bson::Array(values))
    }

    pub fn exists(self) -> Expr {
        Expr::Exists(self.0, true)
    }

    pub fn not_exists(self) -> Expr {
        Expr::Exists(self.0, false)
    }
}

/// What a backend executes: an optional filter plus ordering and slicing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    pub filter: Option<Expr>,
    pub sort: Vec<Sort>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `expr` to the filter, ANDed with any filter already present.
    pub fn with_filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(Sort { field: field.into(), direction });
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Interprets an identity argument as a store identity.
///
/// Accepts an ObjectId or its 24-character hex rendering. Anything else is
/// structurally invalid and yields `None`.
pub fn coerce_identity(value: &Bson) -> Option<ObjectId> {
    match value {
        Bson::ObjectId(oid) => Some(*oid),
        Bson::String(raw) => ObjectId::parse_str(raw.trim()).ok(),
        _ => None,
    }
}

/// Visitor used by backends to evaluate or translate filter expressions.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error>;
    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, *op, value),
        }
    }
}
