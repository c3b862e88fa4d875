//! Collection query protocol types.
//!
//! This crate defines the declarative query description that callers build
//! or decode, its validation rules, its URL-safe string form and the result
//! envelopes a compiled query produces.
//!
//! # Modules
//!
//! - [`query`] - The query model (`CollectionQuery`, `Where`, `Order`, ...)
//! - [`operator`] - Filter operators and their wire names
//! - [`validate`] - Structural validation
//! - [`codec`] - Reversible query-string encoding
//! - [`result`] - `CollectionResult` and page metadata
//! - [`error`] - Protocol error types
//!
//! # Example
//!
//! ```
//! use colq_proto::{codec, CollectionQuery, FilterOperator, Order, Where};
//!
//! let query = CollectionQuery::new()
//!     .filter(Where::new("age", FilterOperator::Gte, "18"))
//!     .order(Order::desc("created_at"))
//!     .take(20);
//!
//! let encoded = codec::encode(&query);
//! assert_eq!(codec::decode(&encoded).unwrap(), query);
//! ```

pub mod codec;
pub mod error;
pub mod operator;
pub mod query;
pub mod result;
pub mod validate;

pub use codec::{decode, encode, CodecError};
pub use error::Error;
pub use operator::FilterOperator;
pub use query::{CollectionQuery, IncludeSelect, NullsOrder, Order, SortDirection, Where};
pub use result::{CollectionResult, Page, PageInfo, DEFAULT_PAGE_SIZE};
pub use validate::ValidationError;
