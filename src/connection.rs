use crate::error::{ServerError, ServerResult};
use crate::socket::{ManagedSocket, Transport};
use socket2::SockAddr;
use std::ffi::CStr;
use std::net::SocketAddr;

const MAX_HOST_LENGTH: usize = 1025;

/// An accepted client connection.
///
/// Cloning is cheap and shares the descriptor; the connection closes when
/// the last clone goes away.
#[derive(Debug, Clone)]
pub struct Connection {
    socket: ManagedSocket,
    peer_addr: SocketAddr,
    id: usize,
}

impl Connection {
    pub(crate) fn new(socket: ManagedSocket, peer_addr: SocketAddr, id: usize) -> Self {
        Self {
            socket,
            peer_addr,
            id,
        }
    }

    /// Get the connection's peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get the connection's sequence number on its listener
    pub fn id(&self) -> usize {
        self.id
    }

    /// The peer's IP address in textual form
    pub fn client_ip(&self) -> String {
        self.peer_addr.ip().to_string()
    }

    /// Reverse-resolve the peer's address to a host name
    pub fn client_hostname(&self) -> ServerResult<String> {
        let addr = SockAddr::from(self.peer_addr);
        let mut host = [0 as libc::c_char; MAX_HOST_LENGTH];

        let ret = unsafe {
            libc::getnameinfo(
                addr.as_ptr() as *const libc::sockaddr,
                addr.len(),
                host.as_mut_ptr(),
                host.len() as libc::socklen_t,
                std::ptr::null_mut(),
                0,
                libc::NI_NAMEREQD,
            )
        };
        if ret != 0 {
            let reason = unsafe { CStr::from_ptr(libc::gai_strerror(ret)) };
            return Err(ServerError::AddressResolution {
                address: self.client_ip(),
                reason: reason.to_string_lossy().into_owned(),
            });
        }

        let name = unsafe { CStr::from_ptr(host.as_ptr()) };
        Ok(name.to_string_lossy().into_owned())
    }

    /// Get a reference to the shared socket handle
    pub fn socket(&self) -> &ManagedSocket {
        &self.socket
    }
}

impl Transport for Connection {
    fn read_block(&self, buffer: &mut [u8], peek: bool) -> ServerResult<usize> {
        self.socket.read_block(buffer, peek)
    }

    fn write_block(&self, buffer: &[u8]) -> ServerResult<usize> {
        self.socket.write_block(buffer)
    }
}
