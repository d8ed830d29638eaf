//! Ensemble Meta - Administrative client for cluster meta nodes
//!
//! This crate talks to the meta endpoint of a cluster:
//! - Meta URL parsing with TLS upgrade rules
//! - `MetaCtrl`: topology, user, role and permission operations
//! - `MetaClient`: the HTTP/JSON implementation of `MetaCtrl`
//! - `InMemoryCtrl`: a process-local `MetaCtrl` for tests and demos
//! - `UsersStore` / `RolesStore`: store-shaped adapters over a `MetaCtrl`

pub mod client;
pub mod ctrl;
pub mod error;
pub mod memory;
pub mod model;
pub mod stores;
pub mod url;

pub use client::{MetaClient, MetaClientOptions};
pub use ctrl::MetaCtrl;
pub use error::{MetaError, Result};
pub use memory::InMemoryCtrl;
pub use model::{Cluster, DataNode, MetaNode, MetaPermissions, MetaRole, MetaUser, Roles, Users};
pub use stores::{MetaRolesStore, MetaUsersStore, RolesStore, UsersStore};
pub use url::parse_meta_url;
