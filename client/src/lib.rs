//! Typed HTTP client for the institute content API.
//!
//! Every endpoint has one method on [`ApiClient`]. Methods check the exact
//! status the endpoint answers with on success and turn anything else into a
//! [`ClientError`].

mod api;
mod error;
mod resource;

pub use api::{ApiClient, PageQuery, Paged, Session};
pub use error::{ClientError, ClientResultExt};
pub use resource::{Resource, SingletonResource};
