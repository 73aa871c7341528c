use crate::error::{ServerError, ServerResult};
use log::{error, trace};
use socket2::Socket;
use std::fmt;
use std::io::{self, Read};
use std::mem::{ManuallyDrop, MaybeUninit};
use std::os::unix::io::{AsRawFd, RawFd};
use std::rc::Rc;

/// Number of bytes peeked while looking for a line terminator.
///
/// This is a hard limit: the terminator must already be queued inside the
/// window when the peek happens. A line (terminator included) longer than
/// the window is rejected with a protocol error instead of being truncated,
/// and so is a line whose terminator has not arrived yet because the client
/// split it across TCP segments.
pub const LINE_WINDOW: usize = 4096;

#[cfg(target_os = "linux")]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
#[cfg(not(target_os = "linux"))]
const SEND_FLAGS: libc::c_int = 0;

/// Block and line oriented I/O over a byte stream.
///
/// Implemented by [`ManagedSocket`] and everything wrapping one; the request
/// parser and the response writer only depend on this trait.
pub trait Transport {
    /// Issue a single receive of at most `buffer.len()` bytes.
    ///
    /// With `peek` set the bytes stay queued and the next read sees them again.
    /// Returns `0` once the peer has closed its side.
    fn read_block(&self, buffer: &mut [u8], peek: bool) -> ServerResult<usize>;

    /// Issue a single send, returning how many bytes were accepted.
    fn write_block(&self, buffer: &[u8]) -> ServerResult<usize>;

    /// Read one CRLF terminated line and return it without the terminator.
    ///
    /// Peeks [`LINE_WINDOW`] bytes to find the terminator, then consumes exactly
    /// the line. Returns an empty string if the peer closed the stream.
    ///
    /// Fails with [`ServerError::Protocol`] when no terminator is among the
    /// bytes available at the time of the peek, whether the line is too long
    /// or only partly received. Nothing is consumed in that case.
    fn read_line(&self) -> ServerResult<String> {
        let mut window = [0u8; LINE_WINDOW];
        let available = self.read_block(&mut window, true)?;
        if available == 0 {
            return Ok(String::new());
        }

        let end = window[..available]
            .windows(2)
            .position(|pair| pair == b"\r\n")
            .ok_or_else(|| ServerError::Protocol("line not found".to_string()))?;

        let line_length = end + 2;
        let mut consumed = 0;
        while consumed < line_length {
            let n = self.read_block(&mut window[consumed..line_length], false)?;
            if n == 0 {
                return Err(ServerError::Protocol(
                    "connection closed mid-line".to_string(),
                ));
            }
            consumed += n;
        }

        Ok(String::from_utf8_lossy(&window[..end]).into_owned())
    }

    /// Keep sending until the whole buffer has been written.
    fn write_all(&self, mut buffer: &[u8]) -> ServerResult<()> {
        while !buffer.is_empty() {
            let n = self.write_block(buffer)?;
            if n == 0 {
                return Err(ServerError::Io(io::Error::from(io::ErrorKind::WriteZero)));
            }
            buffer = &buffer[n..];
        }
        Ok(())
    }
}

/// The kernel descriptor behind a [`ManagedSocket`]. Closing happens here, once.
struct Descriptor {
    socket: ManuallyDrop<Socket>,
}

impl Drop for Descriptor {
    fn drop(&mut self) {
        let fd = self.socket.as_raw_fd();
        // The Socket itself is never dropped, so this is the only close.
        if let Err(e) = close_descriptor(fd) {
            error!("Error closing socket {}: {}", fd, e);
        } else {
            trace!("Closed socket {}", fd);
        }
    }
}

fn close_descriptor(fd: RawFd) -> io::Result<()> {
    #[cfg(test)]
    tests::record_close(fd);

    let ret = unsafe { libc::close(fd) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// A shared handle to an OS socket descriptor.
///
/// Clones refer to the same descriptor, which is closed when the last clone
/// is dropped. An empty handle owns nothing.
#[derive(Clone, Default)]
pub struct ManagedSocket {
    descriptor: Option<Rc<Descriptor>>,
}

impl ManagedSocket {
    /// Create a handle that does not own a descriptor yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this handle owns a descriptor
    pub fn is_open(&self) -> bool {
        self.descriptor.is_some()
    }

    /// Number of handles sharing the descriptor, 0 when empty
    pub fn owners(&self) -> usize {
        self.descriptor.as_ref().map_or(0, Rc::strong_count)
    }

    /// The raw descriptor number, if any
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.descriptor.as_ref().map(|d| d.socket.as_raw_fd())
    }

    /// Borrow the underlying socket for configuration calls
    pub fn socket(&self) -> ServerResult<&Socket> {
        self.descriptor
            .as_deref()
            .map(|d| &*d.socket)
            .ok_or_else(|| ServerError::State("socket has no descriptor".to_string()))
    }
}

impl From<Socket> for ManagedSocket {
    fn from(socket: Socket) -> Self {
        Self {
            descriptor: Some(Rc::new(Descriptor {
                socket: ManuallyDrop::new(socket),
            })),
        }
    }
}

impl Transport for ManagedSocket {
    fn read_block(&self, buffer: &mut [u8], peek: bool) -> ServerResult<usize> {
        let socket = self.socket()?;
        let n = if peek {
            // SAFETY: initialized bytes are valid `MaybeUninit<u8>`, and the
            // kernel only ever writes initialized bytes into the buffer.
            let buffer = unsafe { &mut *(buffer as *mut [u8] as *mut [MaybeUninit<u8>]) };
            socket.peek(buffer)?
        } else {
            let mut reader: &Socket = socket;
            reader.read(buffer)?
        };
        Ok(n)
    }

    fn write_block(&self, buffer: &[u8]) -> ServerResult<usize> {
        Ok(self.socket()?.send_with_flags(buffer, SEND_FLAGS)?)
    }
}

impl fmt::Debug for ManagedSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedSocket")
            .field("fd", &self.raw_fd())
            .field("owners", &self.owners())
            .finish()
    }
}
