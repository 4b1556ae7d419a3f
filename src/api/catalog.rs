//! Typed catalog operations for the views.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use tracing::error;

use super::endpoints::{
  ADD_BOOK, BORROW_BOOK, DELETE_BOOK, GET_ALL_BOOKS, GET_BORROW_SUMMARY, GET_SINGLE_BOOK,
  UPDATE_BOOK,
};
use super::error::ApiError;
use super::transport::{HttpTransport, Transport};
use super::types::{
  Book, BookEnvelope, BookPage, BookUpdate, BorrowRequest, BorrowSummary, NewBook, PageParams,
};
use crate::query::{QueryClient, Subscription};

/// Book and borrow operations over a [`QueryClient`].
///
/// Reads return subscriptions; a read that cannot even be issued returns a
/// subscription that reports the error. Writes return `'static` futures so a
/// view can hand them to a [`crate::query::Mutation`].
pub struct Catalog<T = HttpTransport> {
  client: QueryClient<T>,
}

impl<T> Clone for Catalog<T> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
    }
  }
}

impl<T: Transport> Catalog<T> {
  pub fn new(client: QueryClient<T>) -> Self {
    Self { client }
  }

  #[cfg(test)]
  pub fn client(&self) -> &QueryClient<T> {
    &self.client
  }

  pub fn books(&self, params: PageParams) -> Subscription<BookPage> {
    self.subscribe(GET_ALL_BOOKS, &params)
  }

  pub fn book(&self, id: &str) -> Subscription<BookEnvelope> {
    self.subscribe(GET_SINGLE_BOOK, id)
  }

  pub fn borrow_summary(&self) -> Subscription<BorrowSummary> {
    self.subscribe(GET_BORROW_SUMMARY, &())
  }

  fn subscribe<D, A>(&self, operation: &str, args: &A) -> Subscription<D>
  where
    D: DeserializeOwned,
    A: Serialize + ?Sized,
  {
    self.client.subscribe(operation, args).unwrap_or_else(|e| {
      error!("Cannot subscribe to {}: {}", operation, e);
      Subscription::failed(e)
    })
  }

  /// Create a book. Yields the created record when the server echoes it.
  pub fn add_book(
    &self,
    book: &NewBook,
  ) -> impl Future<Output = Result<Option<Book>, ApiError>> + Send + 'static {
    let request = self.client.mutate(ADD_BOOK, book);
    async move { request.await.map(echoed_book) }
  }

  pub fn update_book(
    &self,
    id: &str,
    update: &BookUpdate,
  ) -> impl Future<Output = Result<Option<Book>, ApiError>> + Send + 'static {
    let request = self
      .client
      .mutate(UPDATE_BOOK, &json!({ "id": id, "data": update }));
    async move { request.await.map(echoed_book) }
  }

  pub fn delete_book(&self, id: &str) -> impl Future<Output = Result<(), ApiError>> + Send + 'static {
    let request = self.client.mutate(DELETE_BOOK, id);
    async move { request.await.map(|_| ()) }
  }

  pub fn borrow_book(
    &self,
    borrow: &BorrowRequest,
  ) -> impl Future<Output = Result<(), ApiError>> + Send + 'static {
    let request = self.client.mutate(BORROW_BOOK, borrow);
    async move { request.await.map(|_| ()) }
  }

  /// Evict unused cache entries; called on every app tick.
  pub fn sweep(&self) -> usize {
    self.client.sweep()
  }

  pub fn shutdown(&self) {
    self.client.shutdown();
  }
}

fn echoed_book(body: Value) -> Option<Book> {
  serde_json::from_value::<BookEnvelope>(body)
    .ok()
    .map(|envelope| envelope.data)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{ConfigError, Genre, Registry, TransportError};
  use crate::cache::{CacheStore, EntryStatus};
  use crate::query::testing::MockTransport;
  use chrono::NaiveDate;
  use reqwest::Method;
  use std::sync::Arc;
  use std::time::Duration;

  fn catalog(transport: MockTransport) -> Catalog<MockTransport> {
    Catalog::new(QueryClient::new(
      Arc::new(Registry::catalog().unwrap()),
      Arc::new(CacheStore::new(Duration::ZERO)),
      Arc::new(transport),
    ))
  }

  fn book_json(id: &str) -> Value {
    json!({
      "_id": id,
      "title": "Dune",
      "author": "Frank Herbert",
      "genre": "FICTION",
      "isbn": "9780441013593",
      "description": "Spice",
      "copies": 4,
      "available": true,
      "createdAt": "2025-06-01T10:00:00.000Z"
    })
  }

  async fn settle<D: DeserializeOwned>(sub: &mut Subscription<D>) {
    for _ in 0..100 {
      sub.poll();
      if matches!(sub.status(), EntryStatus::Success | EntryStatus::Error) {
        return;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("subscription never settled");
  }

  #[tokio::test]
  async fn test_books_page_request() {
    let catalog = catalog(MockTransport::new(|_, _| {
      (
        Duration::ZERO,
        Ok(json!({ "data": [book_json("a")], "meta": { "total": 21, "page": 2, "limit": 10 } })),
      )
    }));

    let mut page = catalog.books(PageParams::new(2, 10));
    settle(&mut page).await;

    let calls = catalog.client().transport().calls();
    assert_eq!(calls[0].path, "/books?page=2&limit=10");

    let page = page.data().unwrap();
    assert_eq!(page.data[0].title, "Dune");
    assert_eq!(page.meta.page_count(), 3);
  }

  #[tokio::test]
  async fn test_single_book() {
    let catalog = catalog(MockTransport::new(|_, _| {
      (Duration::ZERO, Ok(json!({ "success": true, "data": book_json("a") })))
    }));

    let mut book = catalog.book("a");
    settle(&mut book).await;

    assert_eq!(catalog.client().transport().calls()[0].path, "/books/a");
    assert_eq!(book.data().unwrap().data.genre, Genre::Fiction);
  }

  #[tokio::test]
  async fn test_invalid_id_yields_failed_subscription() {
    let catalog = catalog(MockTransport::new(|_, _| (Duration::ZERO, Ok(Value::Null))));

    let book = catalog.book("a/b");
    assert!(book.is_error());
    assert!(book.key().is_none());
    assert!(matches!(
      book.error(),
      Some(ApiError::Config(ConfigError::InvalidArguments { .. }))
    ));
    assert_eq!(catalog.client().transport().call_count(), 0);
  }

  #[tokio::test]
  async fn test_add_book_payload_omits_unset_fields() {
    let catalog = catalog(MockTransport::new(|_, _| {
      (Duration::ZERO, Ok(json!({ "success": true, "data": book_json("new") })))
    }));

    let created = catalog
      .add_book(&NewBook {
        title: "Dune".to_string(),
        author: "Frank Herbert".to_string(),
        genre: Genre::Fiction,
        isbn: "9780441013593".to_string(),
        description: None,
        copies: 4,
        available: None,
      })
      .await
      .unwrap();
    assert_eq!(created.unwrap().id, "new");

    let call = &catalog.client().transport().calls()[0];
    assert_eq!(call.method, Method::POST);
    let body = call.body.as_ref().unwrap();
    assert!(body.get("available").is_none());
    assert!(body.get("description").is_none());
    assert_eq!(body["genre"], "FICTION");
  }

  #[tokio::test]
  async fn test_update_sends_id_in_path() {
    let catalog = catalog(MockTransport::new(|_, _| (Duration::ZERO, Ok(json!({ "success": true })))));

    let updated = catalog
      .update_book(
        "abc",
        &BookUpdate {
          title: "Dune".to_string(),
          author: "Frank Herbert".to_string(),
          genre: Genre::NonFiction,
          isbn: "9780441013593".to_string(),
          description: String::new(),
          copies: 2,
          available: false,
        },
      )
      .await
      .unwrap();
    assert_eq!(updated, None);

    let call = &catalog.client().transport().calls()[0];
    assert_eq!(call.method, Method::PUT);
    assert_eq!(call.path, "/books/abc");
    assert_eq!(call.body.as_ref().unwrap()["genre"], "NON_FICTION");
    assert_eq!(call.body.as_ref().unwrap()["available"], false);
  }

  #[tokio::test]
  async fn test_borrow_invalidates_summary_and_books() {
    let catalog = catalog(MockTransport::new(|request, _| {
      let body = match (request.method.clone(), request.path.as_str()) {
        (Method::GET, "/borrow") => json!({ "data": [] }),
        (Method::GET, _) => json!({ "data": [], "meta": { "total": 0, "page": 1, "limit": 10 } }),
        _ => json!({ "success": true }),
      };
      (Duration::ZERO, Ok(body))
    }));

    let mut summary = catalog.borrow_summary();
    let mut books = catalog.books(PageParams::default());
    settle(&mut summary).await;
    settle(&mut books).await;

    catalog
      .borrow_book(&BorrowRequest {
        book: "abc".to_string(),
        quantity: 1,
        due_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
      })
      .await
      .unwrap();

    let store = catalog.client().store();
    assert_eq!(store.status(summary.key().unwrap()), Some(EntryStatus::Stale));
    assert_eq!(store.status(books.key().unwrap()), Some(EntryStatus::Stale));

    let call = catalog.client().transport().calls().pop().unwrap();
    assert_eq!(call.path, "/borrow");
    assert_eq!(call.body.unwrap()["dueDate"], "2026-11-01");
  }

  #[tokio::test]
  async fn test_delete_reports_server_message() {
    let catalog = catalog(MockTransport::new(|_, _| {
      let body = r#"{"success":false,"message":"Book not found"}"#.to_string();
      (Duration::ZERO, Err(TransportError::from_response(404, body)))
    }));

    let err = catalog.delete_book("gone").await.unwrap_err();
    assert_eq!(err.user_message("Failed to delete the book."), "Book not found");
  }
}
