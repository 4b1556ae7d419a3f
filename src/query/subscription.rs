use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use crate::api::{ApiError, TransportError};
use crate::cache::{CacheKey, CacheStore, EntrySnapshot, EntryStatus, FetchMode};

/// Starts a fetch for the subscribed key.
pub(crate) type FetchFn = Arc<dyn Fn(FetchMode) + Send + Sync>;

struct Attachment {
  key: CacheKey,
  store: Arc<CacheStore>,
  rx: watch::Receiver<EntrySnapshot>,
  fetch: FetchFn,
}

/// A view's handle on one cache entry.
///
/// Call [`Subscription::poll`] on every tick to pick up new data; an entry that
/// was invalidated since the last poll is refetched automatically. Dropping the
/// subscription detaches it from the entry.
pub struct Subscription<T> {
  attachment: Option<Attachment>,
  status: EntryStatus,
  data: Option<T>,
  error: Option<ApiError>,
  decoded_from: Option<Arc<Value>>,
}

impl<T: DeserializeOwned> Subscription<T> {
  pub(crate) fn attach(
    key: CacheKey,
    store: Arc<CacheStore>,
    mut rx: watch::Receiver<EntrySnapshot>,
    fetch: FetchFn,
  ) -> Self {
    let snapshot = rx.borrow_and_update().clone();
    let mut subscription = Self {
      attachment: Some(Attachment {
        key,
        store,
        rx,
        fetch,
      }),
      status: EntryStatus::Uninitialized,
      data: None,
      error: None,
      decoded_from: None,
    };

    subscription.apply(&snapshot);
    if snapshot.needs_fetch() {
      subscription.fetch(FetchMode::IfIdle);
    }
    subscription
  }

  /// A subscription that could not be attached; it reports `error` forever.
  pub fn failed(error: ApiError) -> Self {
    Self {
      attachment: None,
      status: EntryStatus::Error,
      data: None,
      error: Some(error),
      decoded_from: None,
    }
  }

  /// Apply pending updates. Returns `true` if anything changed.
  pub fn poll(&mut self) -> bool {
    let snapshot = match &mut self.attachment {
      Some(attachment) => match attachment.rx.has_changed() {
        Ok(true) => attachment.rx.borrow_and_update().clone(),
        _ => return false,
      },
      None => return false,
    };

    self.apply(&snapshot);
    if snapshot.needs_fetch() {
      self.fetch(FetchMode::IfIdle);
    }
    true
  }

  /// Force a new fetch regardless of the current status.
  pub fn refetch(&self) {
    self.fetch(FetchMode::Force);
  }

  fn fetch(&self, mode: FetchMode) {
    if let Some(attachment) = &self.attachment {
      (attachment.fetch)(mode);
    }
  }

  fn apply(&mut self, snapshot: &EntrySnapshot) {
    self.status = snapshot.status;
    self.error = snapshot.error.clone();

    let Some(value) = &snapshot.value else {
      return;
    };
    if self
      .decoded_from
      .as_ref()
      .is_some_and(|prev| Arc::ptr_eq(prev, value))
    {
      return;
    }

    self.decoded_from = Some(Arc::clone(value));
    match T::deserialize(value.as_ref()) {
      Ok(data) => self.data = Some(data),
      Err(e) => {
        warn!("Unexpected response shape for {}: {}", self.describe(), e);
        self.data = None;
        self.status = EntryStatus::Error;
        self.error = Some(ApiError::Transport(TransportError {
          status: None,
          message: format!("unexpected response: {}", e),
          raw_body: Some(value.to_string()),
        }));
      }
    }
  }

  fn describe(&self) -> &str {
    self
      .attachment
      .as_ref()
      .map(|a| a.key.description())
      .unwrap_or("detached subscription")
  }
}

impl<T> Subscription<T> {
  pub fn status(&self) -> EntryStatus {
    self.status
  }

  /// Last successfully decoded value; kept while stale or refetching.
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.error.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    matches!(
      self.status,
      EntryStatus::Loading | EntryStatus::Uninitialized | EntryStatus::Stale
    )
  }

  pub fn is_error(&self) -> bool {
    self.status == EntryStatus::Error
  }

  pub fn key(&self) -> Option<&CacheKey> {
    self.attachment.as_ref().map(|a| &a.key)
  }
}

impl<T> Drop for Subscription<T> {
  fn drop(&mut self) {
    if let Some(attachment) = &self.attachment {
      attachment.store.unsubscribe(&attachment.key);
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Subscription<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("key", &self.key())
      .field("status", &self.status)
      .field("data", &self.data)
      .field("error", &self.error)
      .finish_non_exhaustive()
  }
}
