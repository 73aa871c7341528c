//! A minimal embeddable HTTP/1.x server.
//!
//! One blocking accept, one parsed request, one routed handler, repeat.

pub mod acceptor;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod logging;
pub mod method;
pub mod response;
pub mod rest;
pub mod router;
pub mod server;
pub mod socket;
pub mod static_files;

/// Re-exports of common components for easier access
pub use acceptor::Listener;
pub use config::ServerConfig;
pub use connection::Connection;
pub use error::{ServerError, ServerResult};
pub use http::{Headers, HttpParser, Request, Status};
pub use method::{Method, MethodSet};
pub use response::Response;
pub use rest::{Resource, RestHandler};
pub use router::{Handler, Router};
pub use server::Server;
pub use socket::{ManagedSocket, Transport};
pub use static_files::FileHandler;
