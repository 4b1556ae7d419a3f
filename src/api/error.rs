//! Error types returned by the transport, the registry and the query client.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A failed HTTP exchange.
///
/// `status` is `None` when no response arrived at all (connection refused,
/// DNS failure, timeout).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
  pub status: Option<u16>,
  pub message: String,
  pub raw_body: Option<String>,
}

impl TransportError {
  pub fn network() -> Self {
    Self {
      status: None,
      message: "network failure".to_string(),
      raw_body: None,
    }
  }

  pub fn timeout() -> Self {
    Self {
      status: None,
      message: "request timed out".to_string(),
      raw_body: None,
    }
  }

  /// Build an error for a non-2xx response, preferring the server's `message`.
  pub fn from_response(status: u16, raw_body: String) -> Self {
    let message = serde_json::from_str::<Value>(&raw_body)
      .ok()
      .and_then(|body| body.get("message").and_then(Value::as_str).map(String::from))
      .filter(|m| !m.is_empty())
      .unwrap_or_else(|| format!("request failed with status {}", status));

    Self {
      status: Some(status),
      message,
      raw_body: Some(raw_body),
    }
  }

  /// The response body parsed as JSON, if there was one.
  pub fn body_json(&self) -> Option<Value> {
    self
      .raw_body
      .as_deref()
      .and_then(|raw| serde_json::from_str(raw).ok())
  }
}

/// One server-reported field error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
  pub field: String,
  pub message: String,
}

/// Field errors reported by the server for a rejected write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
  pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.joined())
  }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
  /// Extract field errors from a response body shaped like
  /// `{"error": {"errors": {"title": {"message": "..."}}}}`.
  pub fn from_body(body: &Value) -> Option<Self> {
    let errors = body.get("error")?.get("errors")?.as_object()?;

    let errors: Vec<FieldError> = errors
      .iter()
      .map(|(field, detail)| FieldError {
        field: field.clone(),
        message: detail
          .get("message")
          .and_then(Value::as_str)
          .map(String::from)
          .unwrap_or_else(|| format!("{} is invalid", field)),
      })
      .collect();

    if errors.is_empty() {
      None
    } else {
      Some(Self { errors })
    }
  }

  /// All messages joined with ", ".
  pub fn joined(&self) -> String {
    self
      .errors
      .iter()
      .map(|e| e.message.as_str())
      .collect::<Vec<_>>()
      .join(", ")
  }

  pub fn message_for(&self, field: &str) -> Option<&str> {
    self
      .errors
      .iter()
      .find(|e| e.field == field)
      .map(|e| e.message.as_str())
  }
}

/// Misuse of the operation registry. These are programming errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("operation '{0}' is already registered")]
  DuplicateOperation(String),

  #[error("operation '{0}' is not registered")]
  UnknownOperation(String),

  #[error("operation '{0}' is a mutation, not a query")]
  NotAQuery(String),

  #[error("operation '{0}' is a query, not a mutation")]
  NotAMutation(String),

  #[error("invalid arguments for '{operation}': {reason}")]
  InvalidArguments { operation: String, reason: String },
}

/// Outcome error of a fetch or mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  #[error(transparent)]
  Transport(#[from] TransportError),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Config(#[from] ConfigError),
}

impl ApiError {
  /// Classify a transport failure, promoting field errors to `Validation`.
  pub fn classify(err: TransportError) -> Self {
    match err.body_json().as_ref().and_then(ValidationError::from_body) {
      Some(validation) => ApiError::Validation(validation),
      None => ApiError::Transport(err),
    }
  }

  /// Message to show the user, or `fallback` when the server gave none.
  pub fn user_message(&self, fallback: &str) -> String {
    match self {
      ApiError::Validation(v) => v.joined(),
      ApiError::Transport(t) if t.status.is_some() && server_message(t).is_some() => {
        t.message.clone()
      }
      _ => fallback.to_string(),
    }
  }
}

fn server_message(err: &TransportError) -> Option<String> {
  err
    .body_json()?
    .get("message")
    .and_then(Value::as_str)
    .filter(|m| !m.is_empty())
    .map(String::from)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_response_message_preferred() {
    let err = TransportError::from_response(404, r#"{"message":"Book not found"}"#.to_string());
    assert_eq!(err.status, Some(404));
    assert_eq!(err.message, "Book not found");
  }

  #[test]
  fn test_response_generic_message() {
    let err = TransportError::from_response(502, "<html>bad gateway</html>".to_string());
    assert_eq!(err.message, "request failed with status 502");
    assert_eq!(err.raw_body.as_deref(), Some("<html>bad gateway</html>"));
  }

  #[test]
  fn test_validation_from_body() {
    let body = json!({
      "message": "Validation failed",
      "success": false,
      "error": {
        "name": "ValidationError",
        "errors": {
          "title": { "message": "Path `title` is required.", "kind": "required" },
          "isbn": { "message": "Path `isbn` is required." }
        }
      }
    });

    let validation = ValidationError::from_body(&body).unwrap();
    assert_eq!(validation.errors.len(), 2);
    assert_eq!(validation.message_for("title"), Some("Path `title` is required."));
    assert!(validation.joined().contains(", "));
  }

  #[test]
  fn test_classify_validation() {
    let raw = json!({
      "message": "Validation failed",
      "error": { "errors": { "title": { "message": "Title is required" } } }
    })
    .to_string();

    let err = ApiError::classify(TransportError::from_response(400, raw));
    match err {
      ApiError::Validation(v) => assert_eq!(v.message_for("title"), Some("Title is required")),
      other => panic!("expected validation error, got {:?}", other),
    }
  }

  #[test]
  fn test_classify_plain_error() {
    let raw = json!({ "message": "Not enough copies" }).to_string();
    let err = ApiError::classify(TransportError::from_response(400, raw));
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.user_message("Failed to borrow book!"), "Not enough copies");
  }

  #[test]
  fn test_user_message_fallback() {
    let err = ApiError::Transport(TransportError::network());
    assert_eq!(
      err.user_message("Failed to delete the book."),
      "Failed to delete the book."
    );

    let err = ApiError::Transport(TransportError::from_response(500, String::new()));
    assert_eq!(err.user_message("Failed to add book!"), "Failed to add book!");
  }
}
