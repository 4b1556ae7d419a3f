//! Serde types matching the catalog API's request and response bodies.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Book genre.
///
/// Genres outside the known set are kept verbatim so a record written by a
/// newer server still round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Genre {
  Fiction,
  NonFiction,
  Science,
  History,
  Biography,
  Fantasy,
  Other(String),
}

impl Genre {
  pub const ALL: [Genre; 6] = [
    Genre::Fiction,
    Genre::NonFiction,
    Genre::Science,
    Genre::History,
    Genre::Biography,
    Genre::Fantasy,
  ];

  pub fn as_str(&self) -> &str {
    match self {
      Genre::Fiction => "FICTION",
      Genre::NonFiction => "NON_FICTION",
      Genre::Science => "SCIENCE",
      Genre::History => "HISTORY",
      Genre::Biography => "BIOGRAPHY",
      Genre::Fantasy => "FANTASY",
      Genre::Other(s) => s,
    }
  }

  /// Human label, e.g. "NON FICTION".
  pub fn label(&self) -> String {
    self.as_str().replace('_', " ")
  }
}

impl From<String> for Genre {
  fn from(s: String) -> Self {
    match s.as_str() {
      "FICTION" => Genre::Fiction,
      "NON_FICTION" => Genre::NonFiction,
      "SCIENCE" => Genre::Science,
      "HISTORY" => Genre::History,
      "BIOGRAPHY" => Genre::Biography,
      "FANTASY" => Genre::Fantasy,
      _ => Genre::Other(s),
    }
  }
}

impl From<Genre> for String {
  fn from(g: Genre) -> Self {
    g.as_str().to_string()
  }
}

impl fmt::Display for Genre {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
  #[serde(rename = "_id")]
  pub id: String,
  pub title: String,
  pub author: String,
  pub genre: Genre,
  pub isbn: String,
  #[serde(default)]
  pub copies: u32,
  #[serde(default)]
  pub available: bool,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

impl Book {
  /// Whether the borrow form should accept a submission for this book.
  pub fn can_borrow(&self) -> bool {
    self.available && self.copies > 0
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageMeta {
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub page: u32,
  #[serde(default)]
  pub limit: u32,
}

impl PageMeta {
  /// Number of pages needed to show `total` books `limit` at a time.
  pub fn page_count(&self) -> u64 {
    if self.limit == 0 {
      return 0;
    }
    self.total.div_ceil(u64::from(self.limit))
  }
}

/// `GET /books` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BookPage {
  #[serde(default)]
  pub data: Vec<Book>,
  #[serde(default)]
  pub meta: PageMeta,
}

impl BookPage {
  /// Up to `n` books, newest first by `createdAt`.
  pub fn most_recent(&self, n: usize) -> Vec<Book> {
    let mut books = self.data.clone();
    books.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    books.truncate(n);
    books
  }
}

/// `GET /books/{id}` and write responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookEnvelope {
  pub data: Book,
}

/// Pagination arguments for `getAllBooks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PageParams {
  pub page: u32,
  pub limit: u32,
}

impl PageParams {
  pub const DEFAULT_PAGE: u32 = 1;
  pub const DEFAULT_LIMIT: u32 = 10;

  pub fn new(page: u32, limit: u32) -> Self {
    Self { page, limit }
  }
}

impl Default for PageParams {
  fn default() -> Self {
    Self {
      page: Self::DEFAULT_PAGE,
      limit: Self::DEFAULT_LIMIT,
    }
  }
}

/// `POST /books` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBook {
  pub title: String,
  pub author: String,
  pub genre: Genre,
  pub isbn: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub copies: u32,
  /// Left out of the payload entirely when unchecked; the server decides.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub available: Option<bool>,
}

/// `PUT /books/{id}` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookUpdate {
  pub title: String,
  pub author: String,
  pub genre: Genre,
  pub isbn: String,
  pub description: String,
  pub copies: u32,
  pub available: bool,
}

/// `POST /borrow` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
  pub book: String,
  pub quantity: u32,
  pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowedBook {
  pub title: String,
  pub isbn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowSummaryItem {
  pub book: BorrowedBook,
  pub total_quantity: u64,
}

/// `GET /borrow` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BorrowSummary {
  #[serde(default)]
  pub data: Vec<BorrowSummaryItem>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_page_count() {
    let meta = PageMeta {
      total: 25,
      page: 1,
      limit: 10,
    };
    assert_eq!(meta.page_count(), 3);

    let exact = PageMeta {
      total: 20,
      page: 1,
      limit: 10,
    };
    assert_eq!(exact.page_count(), 2);

    assert_eq!(PageMeta::default().page_count(), 0);
  }

  #[test]
  fn test_book_page_deserialize() {
    let body = json!({
      "data": [{
        "_id": "abc",
        "title": "Dune",
        "author": "Frank Herbert",
        "genre": "FANTASY",
        "isbn": "9780441172719",
        "copies": 4,
        "available": true,
        "createdAt": "2024-06-01T10:00:00.000Z"
      }],
      "meta": { "total": 25, "page": 1, "limit": 10 }
    });

    let page: BookPage = serde_json::from_value(body).unwrap();
    assert_eq!(page.data[0].id, "abc");
    assert_eq!(page.data[0].genre, Genre::Fantasy);
    assert_eq!(page.meta.total, 25);
    assert!(page.data[0].created_at.is_some());
  }

  #[test]
  fn test_unknown_genre_preserved() {
    let genre: Genre = serde_json::from_value(json!("POETRY")).unwrap();
    assert_eq!(genre, Genre::Other("POETRY".to_string()));
    assert_eq!(serde_json::to_value(&genre).unwrap(), json!("POETRY"));
    assert_eq!(Genre::NonFiction.label(), "NON FICTION");
  }

  #[test]
  fn test_new_book_omits_unchecked_available() {
    let book = NewBook {
      title: "Dune".to_string(),
      author: "Frank Herbert".to_string(),
      genre: Genre::Fantasy,
      isbn: "9780441172719".to_string(),
      description: None,
      copies: 1,
      available: None,
    };

    let value = serde_json::to_value(&book).unwrap();
    assert!(value.get("available").is_none());
    assert!(value.get("description").is_none());
    assert_eq!(value["genre"], "FANTASY");
  }

  #[test]
  fn test_borrow_request_shape() {
    let request = BorrowRequest {
      book: "abc".to_string(),
      quantity: 2,
      due_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
    };
    assert_eq!(
      serde_json::to_value(&request).unwrap(),
      json!({ "book": "abc", "quantity": 2, "dueDate": "2026-11-01" })
    );
  }

  #[test]
  fn test_most_recent_sorted() {
    let book = |id: &str, created: &str| Book {
      id: id.to_string(),
      title: id.to_string(),
      author: String::new(),
      genre: Genre::Fiction,
      isbn: String::new(),
      copies: 1,
      available: true,
      description: None,
      created_at: Some(created.parse().unwrap()),
    };

    let page = BookPage {
      data: vec![
        book("old", "2024-01-01T00:00:00Z"),
        book("new", "2024-03-01T00:00:00Z"),
        book("mid", "2024-02-01T00:00:00Z"),
      ],
      meta: PageMeta::default(),
    };

    let ids: Vec<String> = page.most_recent(2).into_iter().map(|b| b.id).collect();
    assert_eq!(ids, vec!["new", "mid"]);
  }
}
