//! Background mutations for synchronous callers.
//!
//! Views handle keys synchronously, so they cannot `.await` a write. A
//! `Mutation<T>` spawns the write future and the view polls it on every tick:
//!
//! ```ignore
//! // On submit
//! self.save.start(catalog.delete_book(id));
//!
//! // In tick
//! if self.save.poll() {
//!     match self.save.take_outcome() {
//!         Some(Ok(())) => notify_success(),
//!         Some(Err(e)) => notify_error(e.user_message("Failed to delete the book.")),
//!         None => {}
//!     }
//! }
//! ```

use std::future::Future;
use tokio::sync::oneshot;

use crate::api::{ApiError, TransportError};

/// State of a mutation
#[derive(Debug, Clone)]
pub enum MutationState<T> {
  /// Nothing submitted, or the last outcome was taken
  Idle,
  /// Request in flight
  Pending,
  /// The write succeeded
  Success(T),
  /// The write failed
  Failed(ApiError),
}

pub struct Mutation<T> {
  state: MutationState<T>,
  receiver: Option<oneshot::Receiver<Result<T, ApiError>>>,
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self {
      state: MutationState::Idle,
      receiver: None,
    }
  }

  #[cfg(test)]
  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, MutationState::Pending)
  }

  /// Spawn `future`. Returns `false` (and drops the future) if a previous
  /// submission is still pending.
  pub fn start<F>(&mut self, future: F) -> bool
  where
    F: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }

    let (tx, rx) = oneshot::channel();
    self.receiver = Some(rx);
    self.state = MutationState::Pending;

    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - the view may have been closed
      let _ = tx.send(result);
    });
    true
  }

  /// Poll for the outcome of a pending mutation.
  ///
  /// Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(value)) => {
        self.state = MutationState::Success(value);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = MutationState::Failed(error);
        self.receiver = None;
        true
      }
      Err(oneshot::error::TryRecvError::Empty) => false,
      Err(oneshot::error::TryRecvError::Closed) => {
        // Task ended without sending - treat as error
        self.state = MutationState::Failed(ApiError::Transport(TransportError {
          status: None,
          message: "request was cancelled".to_string(),
          raw_body: None,
        }));
        self.receiver = None;
        true
      }
    }
  }

  /// Take a settled outcome, returning the mutation to `Idle`.
  pub fn take_outcome(&mut self) -> Option<Result<T, ApiError>> {
    match std::mem::replace(&mut self.state, MutationState::Idle) {
      MutationState::Success(value) => Some(Ok(value)),
      MutationState::Failed(error) => Some(Err(error)),
      other => {
        self.state = other;
        None
      }
    }
  }
}

impl<T: Send + 'static> Default for Mutation<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Mutation<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Mutation")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}
