use crate::connection::Connection;
use crate::error::{ServerError, ServerResult};
use crate::socket::ManagedSocket;
use log::{debug, info};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::cell::Cell;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

/// Pending connections the kernel queues while a request is being served
pub const DEFAULT_BACKLOG: i32 = 10_000;

/// The listening endpoint: a managed socket bound to a local address and
/// accepting TCP connections.
#[derive(Debug)]
pub struct Listener {
    socket: ManagedSocket,
    backlog: i32,
    connection_count: Cell<usize>,
}

impl Listener {
    /// Create an endpoint that has no descriptor yet
    pub fn new() -> Self {
        Self::with_backlog(DEFAULT_BACKLOG)
    }

    /// Create an endpoint that will listen with the given backlog
    pub fn with_backlog(backlog: i32) -> Self {
        Self {
            socket: ManagedSocket::new(),
            backlog,
            connection_count: Cell::new(0),
        }
    }

    /// Resolve `address:port`, then create, configure, bind and listen.
    ///
    /// Fails with [`ServerError::State`] if the endpoint already owns a
    /// descriptor. Each later step reports its own error variant.
    pub fn create(&mut self, address: &str, port: u16) -> ServerResult<()> {
        if self.socket.is_open() {
            return Err(ServerError::State("Socket already exists.".to_string()));
        }

        let addr = resolve(address, port)?;
        debug!("Resolved {}:{} to {}", address, port, addr);

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(ServerError::SocketCreation)?;
        self.socket = ManagedSocket::from(socket);

        let socket = self.socket.socket()?;
        // Lets a restarted server rebind while old connections sit in TIME_WAIT
        socket
            .set_reuse_address(true)
            .map_err(ServerError::SocketOption)?;
        socket
            .bind(&SockAddr::from(addr))
            .map_err(ServerError::Bind)?;
        socket.listen(self.backlog).map_err(ServerError::Listen)?;

        info!("Listening on {} (backlog {})", addr, self.backlog);
        Ok(())
    }

    /// Block until a client connects
    pub fn accept(&self) -> ServerResult<Connection> {
        let (socket, addr) = self.socket.socket()?.accept().map_err(ServerError::Accept)?;
        let peer_addr = addr.as_socket().ok_or_else(|| {
            ServerError::Accept(io::Error::new(
                io::ErrorKind::InvalidData,
                "peer address is not an inet address",
            ))
        })?;

        let id = self.connection_count.get();
        self.connection_count.set(id + 1);

        Ok(Connection::new(ManagedSocket::from(socket), peer_addr, id))
    }

    /// Get the local address this endpoint is bound to
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        let addr = self.socket.socket()?.local_addr()?;
        addr.as_socket().ok_or_else(|| {
            ServerError::State("listener is not bound to an inet address".to_string())
        })
    }

    /// Whether `create` has succeeded in allocating a descriptor
    pub fn is_created(&self) -> bool {
        self.socket.is_open()
    }

    /// Number of connections accepted so far
    pub fn accepted(&self) -> usize {
        self.connection_count.get()
    }
}

impl Default for Listener {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a host and port, preferring IPv4 results.
fn resolve(address: &str, port: u16) -> ServerResult<SocketAddr> {
    let resolution_error = |reason: String| ServerError::AddressResolution {
        address: format!("{}:{}", address, port),
        reason,
    };

    let addrs: Vec<SocketAddr> = (address, port)
        .to_socket_addrs()
        .map_err(|e| resolution_error(e.to_string()))?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| resolution_error("no addresses found".to_string()))
}
