//! Filter evaluation and ordering for in-memory documents.

use std::cmp::Ordering;

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docbind_core::{
    error::DocumentStoreError,
    filter::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
};

/// Comparable view of a BSON value. All numbers compare as `f64`.
///
/// Values of different types order by type, following the BSON comparison
/// order: null, numbers, strings, documents, arrays, object ids, booleans,
/// dates, then every other type. Missing fields compare as null.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Number(f64),
    String(&'a str),
    Map(Vec<(&'a str, Comparable<'a>)>),
    Array(Vec<Comparable<'a>>),
    ObjectId(ObjectId),
    Bool(bool),
    DateTime(DateTime),
    Other(&'a Bson),
}

impl Comparable<'_> {
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
            Comparable::Other(_) => 8,
        }
    }

    fn same_type(&self, other: &Self) -> bool {
        self.type_rank() == other.type_rank()
    }
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(items) => Comparable::Array(items.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            other => Comparable::Other(other),
        }
    }
}

/// NaN sorts below every other number.
fn compare_numbers(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| b.is_nan().cmp(&a.is_nan()))
}

impl Ord for Comparable<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Ordering::Equal,
            (Comparable::Number(a), Comparable::Number(b)) => compare_numbers(*a, *b),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Map(a), Comparable::Map(b)) => a.cmp(b),
            (Comparable::Array(a), Comparable::Array(b)) => a.cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.cmp(b),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.cmp(b),
            (Comparable::Other(a), Comparable::Other(b)) => (a.element_type() as u8)
                .cmp(&(b.element_type() as u8))
                .then_with(|| a.to_string().cmp(&b.to_string())),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Comparable<'_> {}

/// Looks up a possibly dotted field path.
fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;

    for part in parts {
        current = current.as_document()?.get(part)?;
    }

    Some(current)
}

/// Evaluates filter expressions against one document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub(crate) fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub(crate) fn matches(document: &'a Document, expr: Option<&Expr>) -> bool {
        match expr {
            Some(expr) => DocumentEvaluator::new(document)
                .visit_expr(expr)
                .unwrap_or(false),
            None => true,
        }
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<bool, DocumentStoreError> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<bool, DocumentStoreError> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<bool, DocumentStoreError> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<bool, DocumentStoreError> {
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<bool, DocumentStoreError> {
        let stored = lookup(self.document, field);

        let candidates = match value {
            Bson::Array(values) => values.iter().map(Comparable::from).collect::<Vec<_>>(),
            _ => Vec::new(),
        };

        // A missing field behaves like null, so `ne` and `not in` match it.
        let left = stored.map(Comparable::from).unwrap_or(Comparable::Null);
        let right = Comparable::from(value);

        // Range operators only match values of the same type.
        let ranged = left.same_type(&right);

        Ok(match op {
            FieldOp::Eq => left == right || contains(&left, &right),
            FieldOp::Ne => !(left == right || contains(&left, &right)),
            FieldOp::Gt => ranged && left > right,
            FieldOp::Gte => ranged && left >= right,
            FieldOp::Lt => ranged && left < right,
            FieldOp::Lte => ranged && left <= right,
            FieldOp::In => candidates.iter().any(|candidate| contains(&left, candidate)),
            FieldOp::NotIn => !candidates.iter().any(|candidate| contains(&left, candidate)),
        })
    }
}

/// Array fields match when any element matches.
fn contains(left: &Comparable<'_>, candidate: &Comparable<'_>) -> bool {
    match left {
        Comparable::Array(items) => items.iter().any(|item| item == candidate),
        single => single == candidate,
    }
}

/// Orders two documents by the given sort keys.
pub(crate) fn compare(a: &Document, b: &Document, sort: &[Sort]) -> Ordering {
    for key in sort {
        let left = lookup(a, &key.field).map(Comparable::from).unwrap_or(Comparable::Null);
        let right = lookup(b, &key.field).map(Comparable::from).unwrap_or(Comparable::Null);

        let ordering = match key.direction {
            SortDirection::Asc => left.cmp(&right),
            SortDirection::Desc => right.cmp(&left),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use docbind_core::filter::Field;

    use super::*;

    fn check(document: &Document, expr: Expr) -> bool {
        DocumentEvaluator::matches(document, Some(&expr))
    }

    #[test]
    fn comparisons() {
        let document = doc! { "name": "Ann", "age": 31, "score": 4.5 };

        assert!(check(&document, Field::new("name").eq("Ann")));
        assert!(check(&document, Field::new("age").gte(31_i64)));
        assert!(check(&document, Field::new("score").lt(5)));
        assert!(!check(&document, Field::new("age").gt(40)));
        assert!(!check(&document, Field::new("name").gt(3)));
    }

    #[test]
    fn missing_fields() {
        let document = doc! { "name": "Ann" };

        assert!(check(&document, Field::new("age").not_exists()));
        assert!(check(&document, Field::new("age").ne(3)));
        assert!(!check(&document, Field::new("age").eq(3)));
    }

    #[test]
    fn membership_and_arrays() {
        let document = doc! { "tags": ["rust", "db"], "status": "open" };

        assert!(check(&document, Field::new("tags").eq("db")));
        assert!(check(&document, Field::new("status").in_values(["open", "new"])));
        assert!(check(&document, Field::new("tags").not_in_values(["go"])));
        assert!(!check(&document, Field::new("tags").in_values(["go", "c"])));
    }

    #[test]
    fn nested_paths_and_logic() {
        let document = doc! { "author": { "name": "Ann" }, "draft": false };

        let expr = Field::new("author.name")
            .eq("Ann")
            .and(Field::new("draft").eq(true).not());
        assert!(check(&document, expr));

        let expr = Field::new("draft").eq(true).or(Field::new("author.name").eq("Bob"));
        assert!(!check(&document, expr));
    }

    #[test]
    fn identity_filters() {
        let id = ObjectId::new();
        let document = doc! { "_id": id, "name": "Ann" };

        assert!(check(&document, Field::id().eq(id)));
        assert!(!check(&document, Field::id().eq(ObjectId::new())));
    }

    #[test]
    fn multi_key_sort() {
        let a = doc! { "group": 1, "name": "b" };
        let b = doc! { "group": 1, "name": "a" };
        let c = doc! { "group": 0, "name": "z" };

        let sort = vec![
            Sort { field: "group".into(), direction: SortDirection::Desc },
            Sort { field: "name".into(), direction: SortDirection::Asc },
        ];

        let mut docs = vec![c.clone(), a.clone(), b.clone()];
        docs.sort_by(|x, y| compare(x, y, &sort));

        assert_eq!(docs, vec![b, a, c]);
    }

    #[test]
    fn missing_values_sort_first() {
        let docs = [3, 0, 1, 0, 2].map(|views| match views {
            0 => doc! { "title": "none" },
            views => doc! { "views": views },
        });

        let sort = vec![Sort { field: "views".into(), direction: SortDirection::Asc }];
        let mut sorted = docs.to_vec();
        sorted.sort_by(|x, y| compare(x, y, &sort));

        let views: Vec<_> = sorted.iter().map(|d| d.get_i32("views").ok()).collect();
        assert_eq!(views, vec![None, None, Some(1), Some(2), Some(3)]);

        let sort = vec![Sort { field: "views".into(), direction: SortDirection::Desc }];
        sorted.sort_by(|x, y| compare(x, y, &sort));

        let views: Vec<_> = sorted.iter().map(|d| d.get_i32("views").ok()).collect();
        assert_eq!(views, vec![Some(3), Some(2), Some(1), None, None]);
    }

    #[test]
    fn mixed_types_follow_bson_order() {
        let id = ObjectId::new();
        let values = vec![
            Bson::DateTime(DateTime::from_millis(0)),
            Bson::Boolean(false),
            Bson::ObjectId(id),
            Bson::Array(vec![Bson::Int32(1)]),
            Bson::Document(doc! { "a": 1 }),
            Bson::String("a".into()),
            Bson::Double(f64::NAN),
            Bson::Int64(2),
            Bson::Null,
        ];

        let mut sorted: Vec<Comparable<'_>> = values.iter().map(Comparable::from).collect();
        sorted.sort();

        let ranks: Vec<_> = sorted.iter().map(Comparable::type_rank).collect();
        assert_eq!(ranks, vec![0, 1, 1, 2, 3, 4, 5, 6, 7]);
        assert!(matches!(sorted[1], Comparable::Number(n) if n.is_nan()));

        // Every pair is ordered consistently in both directions.
        for a in &sorted {
            for b in &sorted {
                assert_eq!(a.cmp(b), b.cmp(a).reverse());
            }
        }
    }

    #[test]
    fn range_filters_skip_other_types() {
        let missing = doc! { "name": "Ann" };
        let text = doc! { "views": "many" };

        assert!(!check(&missing, Field::new("views").gt(0)));
        assert!(!check(&missing, Field::new("views").lt(10)));
        assert!(!check(&text, Field::new("views").gt(0)));
        assert!(check(&text, Field::new("views").gt("a")));
    }
}
