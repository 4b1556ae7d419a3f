//! In-memory cache store keyed by operation and arguments.
//!
//! Each entry tracks a fetch status, the last successful value, the last
//! error, its subscriber count and the tags it was created with. Fetches are
//! correlated with monotonically increasing tokens so a slow response can never
//! overwrite a newer one. Every change is published on a per-entry watch
//! channel so subscribers only wake up for the entries they own.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::key::{CacheKey, Tag};
use crate::api::ApiError;

/// Fetch status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
  /// Created but never fetched
  Uninitialized,
  /// A fetch is in flight
  Loading,
  /// The latest fetch succeeded
  Success,
  /// The latest fetch failed
  Error,
  /// Invalidated; keeps its value but must refetch on next access
  Stale,
}

/// Correlates a fetch with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
  /// Start a fetch unless one is already in flight
  IfIdle,
  /// Always start a new fetch (refetch)
  Force,
}

/// What the caller of `begin_fetch` should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTicket {
  /// Issue the request and resolve it with this token
  Issued(FetchToken),
  /// A fetch is already in flight; wait for its outcome
  Joined,
  /// No entry under this key
  Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
  Applied,
  Discarded,
}

/// Point-in-time view of an entry, as published to subscribers.
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
  pub status: EntryStatus,
  pub value: Option<Arc<Value>>,
  pub error: Option<ApiError>,
  pub updated_at: Option<DateTime<Utc>>,
}

impl EntrySnapshot {
  fn uninitialized() -> Self {
    Self {
      status: EntryStatus::Uninitialized,
      value: None,
      error: None,
      updated_at: None,
    }
  }

  /// Whether a subscriber reading this snapshot must start a fetch.
  pub fn needs_fetch(&self) -> bool {
    matches!(self.status, EntryStatus::Uninitialized | EntryStatus::Stale)
  }
}

struct Entry {
  snapshot: EntrySnapshot,
  tags: BTreeSet<Tag>,
  subscribers: usize,
  latest_issued: Option<FetchToken>,
  latest_applied: Option<FetchToken>,
  /// Invalidated while a fetch was in flight
  stale_on_resolve: bool,
  unused_since: Option<Instant>,
  tx: watch::Sender<EntrySnapshot>,
}

impl Entry {
  fn new(tags: &[Tag]) -> Self {
    let snapshot = EntrySnapshot::uninitialized();
    let (tx, _rx) = watch::channel(snapshot.clone());
    Self {
      snapshot,
      tags: tags.iter().copied().collect(),
      subscribers: 0,
      latest_issued: None,
      latest_applied: None,
      stale_on_resolve: false,
      unused_since: Some(Instant::now()),
      tx,
    }
  }

  fn set_status(&mut self, status: EntryStatus) {
    self.snapshot.status = status;
    self.publish();
  }

  fn publish(&self) {
    self.tx.send_replace(self.snapshot.clone());
  }

  fn is_evictable(&self, keep_unused: Duration) -> bool {
    self.subscribers == 0
      && self.snapshot.status != EntryStatus::Loading
      && self
        .unused_since
        .map_or(true, |since| since.elapsed() >= keep_unused)
  }
}

struct Inner {
  entries: HashMap<CacheKey, Entry>,
  next_token: u64,
}

impl Inner {
  fn entry_or_create(&mut self, key: &CacheKey, tags: &[Tag]) -> &mut Entry {
    self.entries.entry(key.clone()).or_insert_with(|| {
      trace!("Cache entry created: {}", key);
      Entry::new(tags)
    })
  }
}

/// Process-wide query cache.
///
/// Construct one at startup and hand it to the query client; drop it (or call
/// [`CacheStore::clear`]) at exit.
pub struct CacheStore {
  inner: Mutex<Inner>,
  keep_unused: Duration,
}

impl CacheStore {
  /// Create a store that retains unused entries for `keep_unused`.
  pub fn new(keep_unused: Duration) -> Self {
    Self {
      inner: Mutex::new(Inner {
        entries: HashMap::new(),
        next_token: 1,
      }),
      keep_unused,
    }
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Return the entry for `key`, creating it as uninitialized if needed.
  #[allow(dead_code)]
  pub fn get_or_create(&self, key: &CacheKey, tags: &[Tag]) -> EntrySnapshot {
    let mut inner = self.lock();
    inner.entry_or_create(key, tags).snapshot.clone()
  }

  #[cfg(test)]
  pub fn snapshot(&self, key: &CacheKey) -> Option<EntrySnapshot> {
    self.lock().entries.get(key).map(|e| e.snapshot.clone())
  }

  #[cfg(test)]
  pub fn status(&self, key: &CacheKey) -> Option<EntryStatus> {
    self.lock().entries.get(key).map(|e| e.snapshot.status)
  }

  #[cfg(test)]
  pub fn subscriber_count(&self, key: &CacheKey) -> Option<usize> {
    self.lock().entries.get(key).map(|e| e.subscribers)
  }

  /// Attach a subscriber to an existing entry.
  #[cfg(test)]
  pub fn subscribe(&self, key: &CacheKey) -> Option<watch::Receiver<EntrySnapshot>> {
    let mut inner = self.lock();
    let entry = inner.entries.get_mut(key)?;
    entry.subscribers += 1;
    entry.unused_since = None;
    Some(entry.tx.subscribe())
  }

  /// Create the entry if needed and subscribe to it under one lock, so a
  /// concurrent sweep cannot evict it in between.
  pub fn attach(
    &self,
    key: &CacheKey,
    tags: &[Tag],
  ) -> (EntrySnapshot, watch::Receiver<EntrySnapshot>) {
    let mut inner = self.lock();
    let entry = inner.entry_or_create(key, tags);
    entry.subscribers += 1;
    entry.unused_since = None;
    (entry.snapshot.clone(), entry.tx.subscribe())
  }

  /// Detach a subscriber. At zero subscribers the entry becomes evictable.
  pub fn unsubscribe(&self, key: &CacheKey) {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(key) else {
      return;
    };

    entry.subscribers = entry.subscribers.saturating_sub(1);
    if entry.subscribers > 0 {
      return;
    }

    entry.unused_since = Some(Instant::now());
    if entry.is_evictable(self.keep_unused) {
      inner.entries.remove(key);
      debug!("Cache entry evicted: {}", key);
    }
  }

  /// Start a fetch for `key` and hand out the token to resolve it with.
  pub fn begin_fetch(&self, key: &CacheKey, mode: FetchMode) -> FetchTicket {
    let mut inner = self.lock();
    let token = FetchToken(inner.next_token);

    let Some(entry) = inner.entries.get_mut(key) else {
      return FetchTicket::Missing;
    };

    if mode == FetchMode::IfIdle && entry.snapshot.status == EntryStatus::Loading {
      trace!("Joining in-flight fetch for {}", key);
      return FetchTicket::Joined;
    }

    entry.latest_issued = Some(token);
    entry.stale_on_resolve = false;
    entry.set_status(EntryStatus::Loading);
    inner.next_token += 1;

    debug!("Fetch {:?} started for {}", token, key);
    FetchTicket::Issued(token)
  }

  /// Apply a fetch outcome unless a newer outcome was already applied.
  pub fn resolve_fetch(
    &self,
    key: &CacheKey,
    token: FetchToken,
    outcome: Result<Value, ApiError>,
  ) -> Resolution {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(key) else {
      debug!("Fetch {:?} resolved after {} was evicted", token, key);
      return Resolution::Discarded;
    };

    let issued = entry.latest_issued.is_some_and(|latest| token <= latest);
    let superseded = entry.latest_applied.is_some_and(|applied| token <= applied);
    if !issued || superseded {
      warn!("Discarding out-of-order fetch {:?} for {}", token, key);
      return Resolution::Discarded;
    }

    entry.latest_applied = Some(token);
    entry.snapshot.updated_at = Some(Utc::now());
    let succeeded = match outcome {
      Ok(value) => {
        entry.snapshot.value = Some(Arc::new(value));
        entry.snapshot.error = None;
        true
      }
      Err(err) => {
        debug!("Fetch {:?} for {} failed: {}", token, key, err);
        entry.snapshot.error = Some(err);
        false
      }
    };

    // A newer fetch is still in flight; stay loading until it lands.
    if entry.latest_issued == Some(token) {
      let status = if entry.stale_on_resolve {
        EntryStatus::Stale
      } else if succeeded {
        EntryStatus::Success
      } else {
        EntryStatus::Error
      };
      entry.stale_on_resolve = false;
      entry.snapshot.status = status;
    }

    entry.publish();
    Resolution::Applied
  }

  /// Mark every entry carrying one of `tags` stale. Returns the affected keys.
  pub fn invalidate(&self, tags: &[Tag]) -> Vec<CacheKey> {
    let mut inner = self.lock();
    let mut affected = Vec::new();

    for (key, entry) in inner.entries.iter_mut() {
      if !tags.iter().any(|t| entry.tags.contains(t)) {
        continue;
      }

      match entry.snapshot.status {
        EntryStatus::Success | EntryStatus::Error => {
          entry.set_status(EntryStatus::Stale);
          affected.push(key.clone());
        }
        EntryStatus::Loading => {
          entry.stale_on_resolve = true;
          affected.push(key.clone());
        }
        EntryStatus::Uninitialized | EntryStatus::Stale => {}
      }
    }

    debug!("Invalidated {:?}: {} entries", tags, affected.len());
    affected
  }

  /// Drop entries with no subscribers whose retention window has passed.
  pub fn sweep(&self) -> usize {
    let keep_unused = self.keep_unused;
    let mut inner = self.lock();
    let before = inner.entries.len();
    inner.entries.retain(|_, e| !e.is_evictable(keep_unused));
    let evicted = before - inner.entries.len();
    if evicted > 0 {
      debug!("Swept {} unused cache entries", evicted);
    }
    evicted
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.lock().entries.is_empty()
  }

  #[cfg(test)]
  pub fn contains(&self, key: &CacheKey) -> bool {
    self.lock().entries.contains_key(key)
  }

  /// Drop every entry. Used at teardown.
  pub fn clear(&self) {
    self.lock().entries.clear();
  }
}

impl Default for CacheStore {
  fn default() -> Self {
    Self::new(Duration::from_secs(60))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::TransportError;
  use serde_json::json;

  fn list_key(page: u32) -> CacheKey {
    CacheKey::new("getAllBooks", &json!({ "page": page, "limit": 10 }))
  }

  fn issued(ticket: FetchTicket) -> FetchToken {
    match ticket {
      FetchTicket::Issued(token) => token,
      other => panic!("expected an issued token, got {:?}", other),
    }
  }

  fn store() -> CacheStore {
    CacheStore::new(Duration::ZERO)
  }

  #[test]
  fn test_get_or_create_is_idempotent() {
    let store = store();
    let key = list_key(1);

    let first = store.get_or_create(&key, &[Tag::BOOK]);
    assert_eq!(first.status, EntryStatus::Uninitialized);
    assert!(first.needs_fetch());

    store.begin_fetch(&key, FetchMode::IfIdle);
    let second = store.get_or_create(&key, &[Tag::BOOK]);
    assert_eq!(second.status, EntryStatus::Loading);
    assert_eq!(store.len(), 1);
  }

  #[test]
  fn test_begin_fetch_joins_in_flight() {
    let store = store();
    let key = list_key(1);
    store.get_or_create(&key, &[Tag::BOOK]);

    let ticket = store.begin_fetch(&key, FetchMode::IfIdle);
    assert!(matches!(ticket, FetchTicket::Issued(_)));
    assert_eq!(store.begin_fetch(&key, FetchMode::IfIdle), FetchTicket::Joined);
    assert_eq!(store.status(&key), Some(EntryStatus::Loading));
  }

  #[test]
  fn test_begin_fetch_missing_key() {
    let store = store();
    assert_eq!(store.begin_fetch(&list_key(1), FetchMode::Force), FetchTicket::Missing);
  }

  #[test]
  fn test_tokens_are_monotonic() {
    let store = store();
    let a = list_key(1);
    let b = list_key(2);
    store.get_or_create(&a, &[Tag::BOOK]);
    store.get_or_create(&b, &[Tag::BOOK]);

    let t1 = issued(store.begin_fetch(&a, FetchMode::IfIdle));
    let t2 = issued(store.begin_fetch(&b, FetchMode::IfIdle));
    let t3 = issued(store.begin_fetch(&a, FetchMode::Force));
    assert!(t1 < t2 && t2 < t3);
  }

  #[test]
  fn test_resolve_success_and_error() {
    let store = store();
    let key = list_key(1);
    store.get_or_create(&key, &[Tag::BOOK]);

    let token = issued(store.begin_fetch(&key, FetchMode::IfIdle));
    assert_eq!(
      store.resolve_fetch(&key, token, Ok(json!({ "data": [] }))),
      Resolution::Applied
    );
    let snapshot = store.snapshot(&key).unwrap();
    assert_eq!(snapshot.status, EntryStatus::Success);
    assert_eq!(snapshot.value.as_deref(), Some(&json!({ "data": [] })));

    let token = issued(store.begin_fetch(&key, FetchMode::Force));
    let err = ApiError::Transport(TransportError::network());
    store.resolve_fetch(&key, token, Err(err.clone()));
    let snapshot = store.snapshot(&key).unwrap();
    assert_eq!(snapshot.status, EntryStatus::Error);
    assert_eq!(snapshot.error, Some(err));
    // The last good value is kept for display.
    assert!(snapshot.value.is_some());
  }

  #[test]
  fn test_older_token_is_discarded() {
    let store = store();
    let key = list_key(1);
    store.get_or_create(&key, &[Tag::BOOK]);

    let slow = issued(store.begin_fetch(&key, FetchMode::IfIdle));
    let fast = issued(store.begin_fetch(&key, FetchMode::Force));

    assert_eq!(store.resolve_fetch(&key, fast, Ok(json!("new"))), Resolution::Applied);
    assert_eq!(store.resolve_fetch(&key, slow, Ok(json!("old"))), Resolution::Discarded);

    let snapshot = store.snapshot(&key).unwrap();
    assert_eq!(snapshot.value.as_deref(), Some(&json!("new")));
    assert_eq!(snapshot.status, EntryStatus::Success);
  }

  #[test]
  fn test_superseded_outcome_keeps_loading() {
    let store = store();
    let key = list_key(1);
    store.get_or_create(&key, &[Tag::BOOK]);

    let first = issued(store.begin_fetch(&key, FetchMode::IfIdle));
    let second = issued(store.begin_fetch(&key, FetchMode::Force));

    assert_eq!(store.resolve_fetch(&key, first, Ok(json!(1))), Resolution::Applied);
    assert_eq!(store.status(&key), Some(EntryStatus::Loading));

    assert_eq!(store.resolve_fetch(&key, second, Ok(json!(2))), Resolution::Applied);
    let snapshot = store.snapshot(&key).unwrap();
    assert_eq!(snapshot.status, EntryStatus::Success);
    assert_eq!(snapshot.value.as_deref(), Some(&json!(2)));
  }

  #[test]
  fn test_unissued_token_is_discarded() {
    let store = store();
    let a = list_key(1);
    let b = list_key(2);
    store.get_or_create(&a, &[Tag::BOOK]);
    store.get_or_create(&b, &[Tag::BOOK]);

    store.begin_fetch(&a, FetchMode::IfIdle);
    let later = issued(store.begin_fetch(&b, FetchMode::IfIdle));
    // `later` was never issued for `a`.
    assert_eq!(store.resolve_fetch(&a, later, Ok(json!(1))), Resolution::Discarded);
  }

  #[test]
  fn test_invalidate_marks_matching_entries_stale() {
    let store = store();
    let books = list_key(1);
    let summary = CacheKey::new("getBorrowSummary", &Value::Null);
    store.get_or_create(&books, &[Tag::BOOK]);
    store.get_or_create(&summary, &[Tag::BORROW]);

    for key in [&books, &summary] {
      let token = issued(store.begin_fetch(key, FetchMode::IfIdle));
      store.resolve_fetch(key, token, Ok(json!({ "data": [] })));
    }

    let affected = store.invalidate(&[Tag::BOOK]);
    assert_eq!(affected, vec![books.clone()]);

    let snapshot = store.snapshot(&books).unwrap();
    assert_eq!(snapshot.status, EntryStatus::Stale);
    assert!(snapshot.value.is_some());
    assert!(snapshot.needs_fetch());
    assert_eq!(store.status(&summary), Some(EntryStatus::Success));
  }

  #[test]
  fn test_invalidate_while_loading_resolves_stale() {
    let store = store();
    let key = list_key(1);
    store.get_or_create(&key, &[Tag::BOOK]);

    let token = issued(store.begin_fetch(&key, FetchMode::IfIdle));
    assert_eq!(store.invalidate(&[Tag::BOOK]), vec![key.clone()]);
    assert_eq!(store.status(&key), Some(EntryStatus::Loading));

    store.resolve_fetch(&key, token, Ok(json!("pre-mutation")));
    assert_eq!(store.status(&key), Some(EntryStatus::Stale));
  }

  #[test]
  fn test_repeat_invalidate_publishes_once() {
    let store = store();
    let key = list_key(1);
    let (_, mut rx) = store.attach(&key, &[Tag::BOOK]);

    let token = issued(store.begin_fetch(&key, FetchMode::IfIdle));
    store.resolve_fetch(&key, token, Ok(json!({ "data": [] })));
    rx.borrow_and_update();

    assert_eq!(store.invalidate(&[Tag::BOOK]), vec![key.clone()]);
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().status, EntryStatus::Stale);

    // Already stale: nothing to mark, nothing published.
    assert!(store.invalidate(&[Tag::BOOK]).is_empty());
    assert!(!rx.has_changed().unwrap());
  }

  #[test]
  fn test_uninitialized_entries_are_not_invalidated() {
    let store = store();
    let key = list_key(1);
    store.get_or_create(&key, &[Tag::BOOK]);
    assert!(store.invalidate(&[Tag::BOOK]).is_empty());
    assert_eq!(store.status(&key), Some(EntryStatus::Uninitialized));
  }

  #[test]
  fn test_unsubscribe_evicts_idle_entry() {
    let store = store();
    let key = list_key(1);
    store.get_or_create(&key, &[Tag::BOOK]);

    let _rx1 = store.subscribe(&key).unwrap();
    let _rx2 = store.subscribe(&key).unwrap();
    assert_eq!(store.subscriber_count(&key), Some(2));

    store.unsubscribe(&key);
    assert_eq!(store.subscriber_count(&key), Some(1));
    store.unsubscribe(&key);
    assert!(!store.contains(&key));
  }

  #[test]
  fn test_attach_creates_and_subscribes() {
    let store = store();
    let key = list_key(1);

    let (snapshot, _rx) = store.attach(&key, &[Tag::BOOK]);
    assert_eq!(snapshot.status, EntryStatus::Uninitialized);
    assert_eq!(store.subscriber_count(&key), Some(1));

    // Subscribed entries survive a sweep even with a zero retention window.
    assert_eq!(store.sweep(), 0);
    store.attach(&key, &[Tag::BOOK]);
    assert_eq!(store.subscriber_count(&key), Some(2));
  }

  #[test]
  fn test_loading_entry_survives_last_unsubscribe() {
    let store = store();
    let key = list_key(1);
    store.get_or_create(&key, &[Tag::BOOK]);
    let _rx = store.subscribe(&key).unwrap();

    let token = issued(store.begin_fetch(&key, FetchMode::IfIdle));
    store.unsubscribe(&key);
    assert!(store.contains(&key));

    assert_eq!(store.resolve_fetch(&key, token, Ok(json!(1))), Resolution::Applied);
    assert_eq!(store.status(&key), Some(EntryStatus::Success));

    assert_eq!(store.sweep(), 1);
    assert!(store.is_empty());
  }

  #[test]
  fn test_retention_window_keeps_unused_entries() {
    let store = CacheStore::new(Duration::from_secs(60));
    let key = list_key(1);
    store.get_or_create(&key, &[Tag::BOOK]);
    let _rx = store.subscribe(&key).unwrap();
    store.unsubscribe(&key);

    assert!(store.contains(&key));
    assert_eq!(store.sweep(), 0);
  }

  #[tokio::test]
  async fn test_subscribers_receive_transitions() {
    let store = store();
    let key = list_key(1);
    store.get_or_create(&key, &[Tag::BOOK]);
    let mut rx = store.subscribe(&key).unwrap();

    let token = issued(store.begin_fetch(&key, FetchMode::IfIdle));
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().status, EntryStatus::Loading);

    store.resolve_fetch(&key, token, Ok(json!(1)));
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().status, EntryStatus::Success);

    store.invalidate(&[Tag::BOOK]);
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().status, EntryStatus::Stale);
  }

  #[test]
  fn test_clear() {
    let store = store();
    store.get_or_create(&list_key(1), &[Tag::BOOK]);
    store.get_or_create(&list_key(2), &[Tag::BOOK]);
    store.clear();
    assert!(store.is_empty());
  }
}
