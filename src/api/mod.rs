//! Catalog API: wire types, errors, the HTTP transport and the operation registry.

mod catalog;
pub mod endpoints;
mod error;
mod transport;
mod types;

pub use catalog::Catalog;
pub use endpoints::{OperationKind, Registry};
pub use error::{ApiError, ConfigError, FieldError, TransportError};
pub use transport::{HttpTransport, Request, Transport};
pub use types::{
  Book, BookEnvelope, BookPage, BookUpdate, BorrowRequest, BorrowSummary, Genre, NewBook,
  PageParams,
};
