//! Ensemble Node - Client for individual data nodes
//!
//! This crate provides:
//! - `NodeClient`: connect, query and write against one data node
//! - `HttpNodeClient`: the HTTP implementation speaking `/ping`, `/query`, `/write`
//! - `NodeConnector`: builds connected clients from a `Source`, used by discovery
//! - Line protocol encoding for write bodies

pub mod client;
pub mod connector;
pub mod error;
pub mod line_protocol;

pub use client::{parse_node_url, HttpNodeClient, NodeClient};
pub use connector::{HttpNodeConnector, NodeConnector};
pub use error::{NodeError, Result};
