use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::subscription::{FetchFn, Subscription};
use crate::api::{ApiError, ConfigError, OperationKind, Registry, Request, Transport};
use crate::cache::{CacheKey, CacheStore, FetchMode, FetchTicket, Resolution, Tag};

/// Runs registered operations against a transport and keeps the cache current.
///
/// Queries go through [`QueryClient::subscribe`], which shares one cache entry
/// (and one in-flight request) between every subscriber of the same operation
/// and arguments. Writes go through [`QueryClient::mutate`], which invalidates
/// the mutation's tags once the server has answered.
pub struct QueryClient<T> {
  registry: Arc<Registry>,
  store: Arc<CacheStore>,
  transport: Arc<T>,
}

impl<T> Clone for QueryClient<T> {
  fn clone(&self) -> Self {
    Self {
      registry: Arc::clone(&self.registry),
      store: Arc::clone(&self.store),
      transport: Arc::clone(&self.transport),
    }
  }
}

impl<T: Transport> QueryClient<T> {
  pub fn new(registry: Arc<Registry>, store: Arc<CacheStore>, transport: Arc<T>) -> Self {
    Self {
      registry,
      store,
      transport,
    }
  }

  #[cfg(test)]
  pub fn store(&self) -> &Arc<CacheStore> {
    &self.store
  }

  #[cfg(test)]
  pub fn transport(&self) -> &T {
    &self.transport
  }

  /// Subscribe to a query, fetching it if the cache has nothing usable.
  pub fn subscribe<D, A>(&self, operation: &str, args: &A) -> Result<Subscription<D>, ApiError>
  where
    D: DeserializeOwned,
    A: Serialize + ?Sized,
  {
    let handle = self.registry.handle(operation)?;
    let op = self.registry.operation(handle);
    if op.kind() != OperationKind::Query {
      return Err(ConfigError::NotAQuery(op.name().to_string()).into());
    }

    let args = self.registry.normalize_args(handle, to_args(op.name(), args)?)?;
    let request = self.registry.build_request(handle, &args)?;
    let key = CacheKey::new(op.name(), &args);

    let (_, rx) = self.store.attach(&key, op.provided_tags());
    debug!("Subscribed to {}", key);

    let client = self.clone();
    let fetch_key = key.clone();
    let fetch: FetchFn = Arc::new(move |mode| {
      client.start_fetch(&fetch_key, &request, mode);
    });

    Ok(Subscription::attach(key, Arc::clone(&self.store), rx, fetch))
  }

  /// Begin a fetch for `key` and resolve it in the background.
  fn start_fetch(&self, key: &CacheKey, request: &Request, mode: FetchMode) {
    let token = match self.store.begin_fetch(key, mode) {
      FetchTicket::Issued(token) => token,
      FetchTicket::Joined => return,
      FetchTicket::Missing => {
        warn!("Fetch requested for evicted entry {}", key);
        return;
      }
    };

    let store = Arc::clone(&self.store);
    let transport = Arc::clone(&self.transport);
    let key = key.clone();
    let request = request.clone();

    tokio::spawn(async move {
      let outcome = transport.execute(&request).await.map_err(ApiError::classify);
      if store.resolve_fetch(&key, token, outcome) == Resolution::Discarded {
        debug!("Response for {} arrived too late", key);
      }
    });
  }

  /// Run a mutation and invalidate its tags once the server has answered.
  ///
  /// Argument and registry errors are returned before any request is sent
  /// and invalidate nothing. The returned future does not borrow `self`.
  pub fn mutate<A>(
    &self,
    operation: &str,
    args: &A,
  ) -> impl Future<Output = Result<Value, ApiError>> + Send + 'static
  where
    A: Serialize + ?Sized,
  {
    let prepared = self.prepare_mutation(operation, args);
    let store = Arc::clone(&self.store);
    let transport = Arc::clone(&self.transport);

    async move {
      let (name, request, tags) = prepared?;
      info!("{} {} ({})", request.method, request.path, name);

      let outcome = transport.execute(&request).await;
      let affected = store.invalidate(&tags);
      debug!("{} invalidated {} cache entries", name, affected.len());

      outcome.map_err(|e| {
        warn!("{} failed: {}", name, e);
        ApiError::classify(e)
      })
    }
  }

  fn prepare_mutation<A>(
    &self,
    operation: &str,
    args: &A,
  ) -> Result<(&'static str, Request, Vec<Tag>), ApiError>
  where
    A: Serialize + ?Sized,
  {
    let handle = self.registry.handle(operation)?;
    let op = self.registry.operation(handle);
    if op.kind() != OperationKind::Mutation {
      return Err(ConfigError::NotAMutation(op.name().to_string()).into());
    }

    let args = self.registry.normalize_args(handle, to_args(op.name(), args)?)?;
    let request = self.registry.build_request(handle, &args)?;
    Ok((op.name(), request, op.invalidated_tags().to_vec()))
  }

  /// Evict unused entries whose retention window has passed.
  pub fn sweep(&self) -> usize {
    self.store.sweep()
  }

  /// Drop every cache entry.
  pub fn shutdown(&self) {
    self.store.clear();
  }
}

fn to_args<A: Serialize + ?Sized>(operation: &str, args: &A) -> Result<Value, ConfigError> {
  serde_json::to_value(args).map_err(|e| ConfigError::InvalidArguments {
    operation: operation.to_string(),
    reason: e.to_string(),
  })
}
