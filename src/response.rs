use crate::error::{ServerError, ServerResult};
use crate::http::{Headers, Status};
use crate::socket::Transport;
use log::{debug, error};
use std::fmt::Write as _;

/// HTTP Response written straight to the client connection.
///
/// The status line and headers go out with the first body block, or when the
/// response is finished or dropped, whichever comes first. After that the
/// status and headers can no longer change what the client sees.
pub struct Response {
    transport: Box<dyn Transport>,
    status_code: u16,
    reason: Option<String>,
    version: String,
    headers: Headers,
    headers_sent: bool,
}

impl Response {
    /// Create a response that writes to `transport`, 200 OK by default
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self {
            transport: Box::new(transport),
            status_code: Status::Ok.code(),
            reason: None,
            version: "1.1".to_string(),
            headers: Headers::new(),
            headers_sent: false,
        }
    }

    /// Set the status code; the reason phrase falls back to the standard one
    pub fn set_status_code(&mut self, status_code: u16) -> &mut Self {
        self.status_code = status_code;
        self.reason = None;
        self
    }

    pub fn set_status(&mut self, status: Status) -> &mut Self {
        self.status_code = status.code();
        self.reason = Some(status.as_str().to_string());
        self
    }

    /// Override the reason phrase of the status line
    pub fn set_reason(&mut self, reason: &str) -> &mut Self {
        self.reason = Some(reason.to_string());
        self
    }

    /// Protocol version without the `HTTP/` prefix
    pub fn set_version(&mut self, version: &str) -> &mut Self {
        self.version = version.to_string();
        self
    }

    /// Set a header
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        if self.headers_sent {
            debug!("Header {} set after headers were sent", name);
        }
        self.headers.insert(name, value);
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The reason phrase that will be sent
    pub fn reason(&self) -> &str {
        match &self.reason {
            Some(reason) => reason,
            None => Status::from_code(self.status_code)
                .map(|s| s.as_str())
                .unwrap_or(""),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get a header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Send a block of body data, preceded by the headers on first use.
    ///
    /// A `Content-Length` header must be set before the first block.
    pub fn write_block(&mut self, data: &[u8]) -> ServerResult<()> {
        if !self.headers_sent {
            if !self.headers.contains("Content-Length") {
                return Err(ServerError::Response(
                    "The Content-Length header was not provided.".to_string(),
                ));
            }
            self.send_headers()?;
        }
        self.transport.write_all(data)
    }

    /// Set `Content-Length` from `body` and send it as the whole body
    pub fn write_body(&mut self, body: &[u8]) -> ServerResult<()> {
        if !self.headers_sent {
            self.set_header("Content-Length", &body.len().to_string());
        }
        self.write_block(body)
    }

    /// Send the headers if nothing has been sent yet
    pub fn finish(&mut self) -> ServerResult<()> {
        if self.headers_sent {
            return Ok(());
        }
        if !self.headers.contains("Content-Length") {
            self.headers.insert("Content-Length", "0");
        }
        self.send_headers()
    }

    fn send_headers(&mut self) -> ServerResult<()> {
        let mut head = String::new();
        // Writing into a String cannot fail
        let _ = write!(
            head,
            "HTTP/{} {} {}\r\n",
            self.version,
            self.status_code,
            self.reason()
        );
        for (name, value) in self.headers.iter() {
            let _ = write!(head, "{}: {}\r\n", name, value);
        }
        if !self.headers.contains("Date") {
            let now = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT");
            let _ = write!(head, "Date: {}\r\n", now);
        }
        head.push_str("\r\n");

        // Marked first so a failed send is not retried from Drop
        self.headers_sent = true;
        self.transport.write_all(head.as_bytes())
    }
}

impl Drop for Response {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            error!("Error sending response headers: {}", e);
        }
    }
}
