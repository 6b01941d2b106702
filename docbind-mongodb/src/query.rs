//! Translation of filter expressions into MongoDB query documents.

use bson::{Bson, Document, doc};

use docbind_core::{
    error::DocumentStoreError,
    filter::{Expr, FieldOp, QueryVisitor},
};

/// Builds the MongoDB equivalent of an [`Expr`].
///
/// MongoDB has no top-level `$not`, so negation is expressed as a one-element `$nor`.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    pub(crate) fn translate(expr: Option<&Expr>) -> Result<Document, DocumentStoreError> {
        match expr {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    fn visit_all(&mut self, exprs: &[Expr]) -> Result<Vec<Document>, DocumentStoreError> {
        exprs.iter().map(|expr| self.visit_expr(expr)).collect()
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$and": self.visit_all(exprs)? })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$or": self.visit_all(exprs)? })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$nor": [self.visit_expr(expr)?] })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! { field: { "$exists": should_exist } })
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let operator = match op {
            FieldOp::Eq => "$eq",
            FieldOp::Ne => "$ne",
            FieldOp::Gt => "$gt",
            FieldOp::Gte => "$gte",
            FieldOp::Lt => "$lt",
            FieldOp::Lte => "$lte",
            FieldOp::In => "$in",
            FieldOp::NotIn => "$nin",
        };

        if matches!(op, FieldOp::In | FieldOp::NotIn) && !matches!(value, Bson::Array(_)) {
            return Err(DocumentStoreError::Backend(format!(
                "{operator} on field {field} requires an array value"
            )));
        }

        Ok(doc! { field: { operator: value.clone() } })
    }
}

#[cfg(test)]
mod tests {
    use bson::oid::ObjectId;
    use docbind_core::filter::Field;

    use super::*;

    #[test]
    fn translates_comparisons() {
        let id = ObjectId::new();

        assert_eq!(
            MongoQueryTranslator::translate(Some(&Field::id().eq(id))).unwrap(),
            doc! { "_id": { "$eq": id } }
        );
        assert_eq!(
            MongoQueryTranslator::translate(Some(&Field::new("tags").in_values(["a", "b"]))).unwrap(),
            doc! { "tags": { "$in": ["a", "b"] } }
        );
    }

    #[test]
    fn translates_logic() {
        let expr = Field::new("a").gt(1).and(Field::new("b").exists().not());

        assert_eq!(
            MongoQueryTranslator::translate(Some(&expr)).unwrap(),
            doc! {
                "$and": [
                    { "a": { "$gt": 1 } },
                    { "$nor": [{ "b": { "$exists": true } }] },
                ]
            }
        );
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(MongoQueryTranslator::translate(None).unwrap(), doc! {});
    }

    #[test]
    fn membership_requires_an_array() {
        let expr = Expr::Field { field: "a".into(), op: FieldOp::In, value: Bson::Int32(1) };

        assert!(MongoQueryTranslator::translate(Some(&expr)).is_err());
    }
}
