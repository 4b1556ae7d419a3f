//! In-memory transport for query tests.

use serde_json::Value;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::api::{Request, Transport, TransportError};

type Responder = dyn Fn(&Request, usize) -> (Duration, Result<Value, TransportError>) + Send + Sync;

/// Answers each request from a closure and records every call.
///
/// The closure receives the request and its zero-based call index and returns
/// the delay before answering plus the outcome.
pub struct MockTransport {
  respond: Box<Responder>,
  calls: Mutex<Vec<Request>>,
}

impl MockTransport {
  pub fn new<F>(respond: F) -> Self
  where
    F: Fn(&Request, usize) -> (Duration, Result<Value, TransportError>) + Send + Sync + 'static,
  {
    Self {
      respond: Box::new(respond),
      calls: Mutex::new(Vec::new()),
    }
  }

  pub fn call_count(&self) -> usize {
    self.calls().len()
  }

  pub fn calls(&self) -> Vec<Request> {
    self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }
}

impl Transport for MockTransport {
  fn execute(&self, request: &Request) -> impl Future<Output = Result<Value, TransportError>> + Send {
    let index = {
      let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
      calls.push(request.clone());
      calls.len() - 1
    };
    let (delay, outcome) = (self.respond)(request, index);

    async move {
      if !delay.is_zero() {
        tokio::time::sleep(delay).await;
      }
      outcome
    }
  }
}
