//! Data fetching on top of the cache store.
//!
//! Views are synchronous: they subscribe to queries and start mutations from
//! key handlers, then poll on every tick.
//!
//! # Example
//!
//! ```ignore
//! // On view creation
//! let mut books: Subscription<BookPage> = client.subscribe("getAllBooks", &PageParams::default())?;
//!
//! // In event loop tick
//! if books.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match (books.data(), books.error()) {
//!     (Some(page), _) => render_page(page),
//!     (None, Some(e)) => render_error(e),
//!     (None, None) => render_spinner(),
//! }
//! ```

mod client;
mod mutation;
mod subscription;
#[cfg(test)]
pub(crate) mod testing;

pub use client::QueryClient;
pub use mutation::Mutation;
pub use subscription::Subscription;
