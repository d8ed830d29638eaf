//! Ensemble Core - Shared types for the ensemble cluster client
//!
//! This crate provides the vocabulary every other ensemble crate speaks:
//! - `RequestContext`: cancellation and deadlines for outbound calls
//! - `Point`, `Tag`, `Field`, `FieldValue`: data written to data nodes
//! - `Query`, `QueryResponse`: read requests and their raw results
//! - `Source`: connection template cloned for each data node
//! - `User`, `Role`, `Permission`: administrative records
//! - `Authorizer`: decorates outbound requests with credentials

pub mod admin;
pub mod auth;
pub mod context;
pub mod error;
pub mod permissions;
pub mod query;
pub mod source;
pub mod types;

pub use admin::{Role, User};
pub use auth::{authorizer_for, Authorizer, BasicAuth, BearerJwt, NoAuthorization};
pub use context::{Interrupted, RequestContext};
pub use error::{CoreError, Result};
pub use permissions::{Allowances, Permission, Permissions, Scope};
pub use query::{Query, QueryResponse};
pub use source::Source;
pub use types::*;
