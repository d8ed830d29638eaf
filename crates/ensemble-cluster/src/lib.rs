//! Ensemble Cluster - Client for a multi-node time-series cluster
//!
//! This crate ties the meta and data node clients together:
//! - `ClusterClient`: discovers data nodes through the meta endpoint and
//!   spreads queries and writes across them
//! - `NodePool`: fixed set of connected nodes with a lock-free round-robin cursor
//! - `ClientConfig`: TOML-loadable connection settings
//!
//! # Example
//!
//! ```ignore
//! use ensemble_cluster::{ClientConfig, ClusterClient};
//! use ensemble_core::{Query, RequestContext};
//!
//! let config = ClientConfig::from_file("ensemble.toml")?;
//! let client = ClusterClient::from_config(&config)?;
//! let ctx = RequestContext::background();
//!
//! client.connect(&ctx, &config.source()).await?;
//! let resp = client.query(&ctx, &Query::new("SHOW DATABASES")).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod pool;

pub use client::ClusterClient;
pub use config::ClientConfig;
pub use error::{ClusterError, Result};
pub use pool::NodePool;
