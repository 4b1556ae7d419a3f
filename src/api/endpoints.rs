//! Named catalog operations and the registry that resolves them to requests.
//!
//! Queries declare the tags they provide, mutations the tags they invalidate.
//! The registry is built once at startup and shared read-only afterwards.

use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;

use super::error::ConfigError;
use super::transport::Request;
use super::types::PageParams;
use crate::cache::Tag;

pub const GET_ALL_BOOKS: &str = "getAllBooks";
pub const GET_SINGLE_BOOK: &str = "getSingleBook";
pub const GET_BORROW_SUMMARY: &str = "getBorrowSummary";
pub const ADD_BOOK: &str = "addBook";
pub const UPDATE_BOOK: &str = "updateBook";
pub const DELETE_BOOK: &str = "deleteBook";
pub const BORROW_BOOK: &str = "borrowBook";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
  Query,
  Mutation,
}

/// Path and optional body produced from an operation's arguments.
pub struct Route {
  pub path: String,
  pub body: Option<Value>,
}

impl Route {
  fn get(path: String) -> Self {
    Self { path, body: None }
  }

  fn with_body(path: String, body: Value) -> Self {
    Self {
      path,
      body: Some(body),
    }
  }
}

/// Builds a route from arguments; the error string explains bad arguments.
pub type RouteBuilder = fn(&Value) -> Result<Route, String>;

/// Rewrites arguments into their canonical form, filling in defaults.
pub type ArgsNormalizer = fn(&Value) -> Result<Value, String>;

/// Immutable declaration of one query or mutation.
#[derive(Clone)]
pub struct Operation {
  name: &'static str,
  kind: OperationKind,
  method: Method,
  route: RouteBuilder,
  normalize: Option<ArgsNormalizer>,
  provides: Vec<Tag>,
  invalidates: Vec<Tag>,
}

impl Operation {
  /// A GET query.
  pub fn query(name: &'static str, route: RouteBuilder) -> Self {
    Self {
      name,
      kind: OperationKind::Query,
      method: Method::GET,
      route,
      normalize: None,
      provides: Vec::new(),
      invalidates: Vec::new(),
    }
  }

  pub fn mutation(name: &'static str, method: Method, route: RouteBuilder) -> Self {
    Self {
      name,
      kind: OperationKind::Mutation,
      method,
      route,
      normalize: None,
      provides: Vec::new(),
      invalidates: Vec::new(),
    }
  }

  /// Arguments that mean the same request should share a cache entry.
  pub fn normalized_by(mut self, normalize: ArgsNormalizer) -> Self {
    self.normalize = Some(normalize);
    self
  }

  pub fn provides(mut self, tags: &[Tag]) -> Self {
    self.provides = tags.to_vec();
    self
  }

  pub fn invalidates(mut self, tags: &[Tag]) -> Self {
    self.invalidates = tags.to_vec();
    self
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn kind(&self) -> OperationKind {
    self.kind
  }

  pub fn provided_tags(&self) -> &[Tag] {
    &self.provides
  }

  pub fn invalidated_tags(&self) -> &[Tag] {
    &self.invalidates
  }
}

impl std::fmt::Debug for Operation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Operation")
      .field("name", &self.name)
      .field("kind", &self.kind)
      .field("method", &self.method)
      .field("provides", &self.provides)
      .field("invalidates", &self.invalidates)
      .finish_non_exhaustive()
  }
}

/// Handle to a registered operation. Only valid for the registry that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationHandle(usize);

#[derive(Debug, Default)]
pub struct Registry {
  operations: Vec<Operation>,
  by_name: HashMap<&'static str, OperationHandle>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  /// The registry with every catalog operation.
  pub fn catalog() -> Result<Self, ConfigError> {
    let mut registry = Self::new();

    registry.register(
      Operation::query(GET_ALL_BOOKS, all_books_route)
        .normalized_by(page_args)
        .provides(&[Tag::BOOK]),
    )?;
    registry.register(Operation::query(GET_SINGLE_BOOK, single_book_route).provides(&[Tag::BOOK]))?;
    registry.register(
      Operation::query(GET_BORROW_SUMMARY, |_| Ok(Route::get("/borrow".to_string())))
        .provides(&[Tag::BORROW]),
    )?;

    registry.register(
      Operation::mutation(ADD_BOOK, Method::POST, |args| {
        Ok(Route::with_body("/books".to_string(), object_body(args)?))
      })
      .invalidates(&[Tag::BOOK]),
    )?;
    registry.register(
      Operation::mutation(UPDATE_BOOK, Method::PUT, update_book_route).invalidates(&[Tag::BOOK]),
    )?;
    registry.register(
      Operation::mutation(DELETE_BOOK, Method::DELETE, single_book_route)
        .invalidates(&[Tag::BOOK]),
    )?;
    registry.register(
      Operation::mutation(BORROW_BOOK, Method::POST, |args| {
        Ok(Route::with_body("/borrow".to_string(), object_body(args)?))
      })
      .invalidates(&[Tag::BORROW, Tag::BOOK]),
    )?;

    Ok(registry)
  }

  pub fn register(&mut self, operation: Operation) -> Result<OperationHandle, ConfigError> {
    if self.by_name.contains_key(operation.name) {
      return Err(ConfigError::DuplicateOperation(operation.name.to_string()));
    }

    let handle = OperationHandle(self.operations.len());
    self.by_name.insert(operation.name, handle);
    self.operations.push(operation);
    Ok(handle)
  }

  pub fn handle(&self, name: &str) -> Result<OperationHandle, ConfigError> {
    self
      .by_name
      .get(name)
      .copied()
      .ok_or_else(|| ConfigError::UnknownOperation(name.to_string()))
  }

  pub fn operation(&self, handle: OperationHandle) -> &Operation {
    &self.operations[handle.0]
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.operations.len()
  }

  /// Canonical arguments for `handle`: the cache key and the request are
  /// both built from these.
  pub fn normalize_args(&self, handle: OperationHandle, args: Value) -> Result<Value, ConfigError> {
    let operation = self.operation(handle);
    match operation.normalize {
      Some(normalize) => normalize(&args).map_err(|reason| ConfigError::InvalidArguments {
        operation: operation.name.to_string(),
        reason,
      }),
      None => Ok(args),
    }
  }

  /// Resolve an operation and its arguments into a request.
  pub fn build_request(&self, handle: OperationHandle, args: &Value) -> Result<Request, ConfigError> {
    let operation = self.operation(handle);
    let route = (operation.route)(args).map_err(|reason| ConfigError::InvalidArguments {
      operation: operation.name.to_string(),
      reason,
    })?;

    Ok(Request {
      method: operation.method.clone(),
      path: route.path,
      body: route.body,
    })
  }
}

fn page_params(args: &Value) -> Result<PageParams, String> {
  match args {
    Value::Null => Ok(PageParams::default()),
    other => serde_json::from_value(other.clone()).map_err(|e| e.to_string()),
  }
}

fn page_args(args: &Value) -> Result<Value, String> {
  serde_json::to_value(page_params(args)?).map_err(|e| e.to_string())
}

fn all_books_route(args: &Value) -> Result<Route, String> {
  let params = page_params(args)?;
  if params.page == 0 || params.limit == 0 {
    return Err("page and limit must be at least 1".to_string());
  }

  Ok(Route::get(format!(
    "/books?page={}&limit={}",
    params.page, params.limit
  )))
}

fn single_book_route(args: &Value) -> Result<Route, String> {
  let id = args.as_str().ok_or("expected a book id string")?;
  Ok(Route::get(format!("/books/{}", book_id(id)?)))
}

fn update_book_route(args: &Value) -> Result<Route, String> {
  let id = args
    .get("id")
    .and_then(Value::as_str)
    .ok_or("expected an 'id' string")?;
  let data = args.get("data").ok_or("expected a 'data' object")?;

  Ok(Route::with_body(
    format!("/books/{}", book_id(id)?),
    object_body(data)?,
  ))
}

fn book_id(id: &str) -> Result<&str, String> {
  if id.is_empty() {
    return Err("book id must not be empty".to_string());
  }
  if id.contains(['/', '?', '#']) {
    return Err(format!("book id '{}' contains reserved characters", id));
  }
  Ok(id)
}

fn object_body(args: &Value) -> Result<Value, String> {
  if args.is_object() {
    Ok(args.clone())
  } else {
    Err("expected a JSON object body".to_string())
  }
}
