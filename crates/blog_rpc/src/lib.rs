//! RPC surface for the blog service.
//!
//! # Responsibility
//! - Define wire messages and newline-delimited JSON framing.
//! - Serve the five blog RPCs over TCP against one owned store.
//! - Provide an async client for those RPCs.
//!
//! # Invariants
//! - The store is constructed once per process and injected; nothing here
//!   holds a global connection.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod protocol;
pub mod server;
pub mod store;

pub use client::{BlogClient, BlogStream, ClientError, ClientResult};
pub use config::{ConfigError, ServerConfig};
pub use dispatch::Dispatcher;
pub use protocol::{Blog, Code, Status};
pub use server::BlogServer;
pub use store::Store;
