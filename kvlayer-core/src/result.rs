//! Uniform outcome of a terminal query operation.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    document::Document,
    error::{StoreError, StoreResult},
};

/// The outcome of a terminal operation.
///
/// A result is either a success carrying documents (possibly none) or an error carrying a
/// message and no documents. Callers branch on [`has_error`](Self::has_error) instead of
/// handling a propagated error.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    data: Vec<Document>,
    error: Option<String>,
}

impl QueryResult {
    /// Creates a successful result.
    pub fn ok(data: Vec<Document>) -> Self {
        Self { data, error: None }
    }

    /// Creates an error result with no documents.
    pub fn error(message: impl Into<String>) -> Self {
        Self { data: Vec::new(), error: Some(message.into()) }
    }

    /// Returns whether the operation failed.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the error message, if the operation failed.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns whether the result holds no documents.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// The returned documents, in result order.
    pub fn data(&self) -> &[Document] {
        &self.data
    }

    /// Returns the first document, if any.
    pub fn first(&self) -> Option<&Document> {
        self.data.first()
    }

    /// Consumes the result, returning the documents or the error message.
    pub fn into_result(self) -> Result<Vec<Document>, String> {
        match self.error {
            Some(message) => Err(message),
            None => Ok(self.data),
        }
    }

    /// Deserializes every returned document into `T`.
    ///
    /// # Errors
    ///
    /// An error result becomes [`StoreError::Serialization`] carrying its message. A
    /// document that does not fit `T` becomes [`StoreError::MalformedDocument`].
    pub fn deserialize<T: DeserializeOwned>(&self) -> StoreResult<Vec<T>> {
        if let Some(message) = &self.error {
            return Err(StoreError::Serialization(message.clone()));
        }

        self.data
            .iter()
            .map(|document| -> StoreResult<T> {
                Ok(serde_json::from_value(Value::Object(document.clone()))?)
            })
            .collect()
    }
}

impl From<StoreResult<Vec<Document>>> for QueryResult {
    fn from(result: StoreResult<Vec<Document>>) -> Self {
        match result {
            Ok(data) => QueryResult::ok(data),
            Err(err) => QueryResult::error(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn error_results_carry_no_data() {
        let result = QueryResult::from(Err::<Vec<Document>, _>(StoreError::NoUpdateData));

        assert!(result.has_error());
        assert!(result.is_empty());
        assert_eq!(result.error_message(), Some("No update data provided"));
        assert_eq!(result.into_result(), Err("No update data provided".to_string()));
    }

    #[test]
    fn empty_success_is_not_an_error() {
        let result = QueryResult::ok(vec![]);

        assert!(!result.has_error());
        assert!(result.is_empty());
        assert!(result.first().is_none());
    }

    #[test]
    fn deserializes_documents() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct User {
            id: String,
            age: u32,
        }

        let result = QueryResult::ok(vec![doc(json!({ "id": "1", "age": 30, "extra": true }))]);

        assert_eq!(
            result.deserialize::<User>().unwrap(),
            vec![User { id: "1".into(), age: 30 }]
        );
        assert!(matches!(
            QueryResult::ok(vec![doc(json!({ "id": 1 }))]).deserialize::<User>(),
            Err(StoreError::MalformedDocument(_))
        ));
    }
}
