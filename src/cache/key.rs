//! Cache keys and invalidation tags.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque label grouping cache entries that are invalidated together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(&'static str);

impl Tag {
  pub const BOOK: Tag = Tag("Book");
  pub const BORROW: Tag = Tag("Borrow");

  pub fn label(&self) -> &'static str {
    self.0
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Identifies one cached query result: operation name plus normalized args.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  args_hash: String,
  description: String,
}

impl CacheKey {
  /// Build a key from already-normalized arguments.
  ///
  /// `serde_json::Map` is a `BTreeMap` unless the `preserve_order` feature is
  /// enabled, so object keys serialize sorted and field order never produces
  /// distinct keys. Defaults are filled in by the registry beforehand.
  pub fn new(operation: &'static str, args: &Value) -> Self {
    let normalized = normalize_args(args);

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update(b":");
    hasher.update(normalized.as_bytes());
    let args_hash = hex::encode(hasher.finalize());

    let description = if args.is_null() {
      operation.to_string()
    } else {
      format!("{}({})", operation, normalized)
    };

    Self {
      args_hash,
      description,
    }
  }

  /// Human-readable form used in logs.
  pub fn description(&self) -> &str {
    &self.description
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.description)
  }
}

fn normalize_args(args: &Value) -> String {
  match args {
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_field_order_does_not_matter() {
    let a: Value = serde_json::from_str(r#"{"page":2,"limit":10}"#).unwrap();
    let b: Value = serde_json::from_str(r#"{"limit":10,"page":2}"#).unwrap();
    assert_eq!(CacheKey::new("getAllBooks", &a), CacheKey::new("getAllBooks", &b));
  }

  #[test]
  fn test_distinct_args_distinct_keys() {
    let a = CacheKey::new("getAllBooks", &json!({ "page": 1, "limit": 10 }));
    let b = CacheKey::new("getAllBooks", &json!({ "page": 2, "limit": 10 }));
    assert_ne!(a, b);
  }

  #[test]
  fn test_operation_is_part_of_key() {
    let a = CacheKey::new("getSingleBook", &json!("abc"));
    let b = CacheKey::new("getBorrowSummary", &json!("abc"));
    assert_ne!(a, b);
  }

  #[test]
  fn test_tag_labels() {
    assert_eq!(Tag::BOOK.label(), "Book");
    assert_eq!(Tag::BORROW.to_string(), "Borrow");
  }

  #[test]
  fn test_description() {
    assert_eq!(CacheKey::new("getBorrowSummary", &Value::Null).description(), "getBorrowSummary");
    assert_eq!(
      CacheKey::new("getSingleBook", &json!("abc")).description(),
      r#"getSingleBook("abc")"#
    );
  }
}
