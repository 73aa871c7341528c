use std::io;
use thiserror::Error;

/// Main error type for the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Could not resolve address {address}: {reason}")]
    AddressResolution { address: String, reason: String },

    #[error("Could not create socket: {0}")]
    SocketCreation(#[source] io::Error),

    #[error("Could not configure socket: {0}")]
    SocketOption(#[source] io::Error),

    #[error("Could not bind to socket: {0}")]
    Bind(#[source] io::Error),

    #[error("Could not listen for incoming connections: {0}")]
    Listen(#[source] io::Error),

    #[error("Could not accept incoming connection: {0}")]
    Accept(#[source] io::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid state: {0}")]
    State(String),

    #[error("No route for {0}")]
    NoRoute(String),

    #[error("Response error: {0}")]
    Response(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServerError {
    /// Whether the error takes the listener down rather than a single connection.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ServerError::Io(_)
                | ServerError::Protocol(_)
                | ServerError::NoRoute(_)
                | ServerError::Response(_)
        )
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
