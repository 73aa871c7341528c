use crate::error::{ServerError, ServerResult};
use crate::method::Method;
use crate::socket::Transport;
use log::debug;

/// HTTP Status Codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Continue = 100,
    SwitchingProtocols = 101,

    Ok = 200,
    Created = 201,
    Accepted = 202,
    NoContent = 204,

    MovedPermanently = 301,
    Found = 302,
    NotModified = 304,

    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    RequestTimeout = 408,
    PayloadTooLarge = 413,

    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
}

impl Status {
    /// Get the text description for this status code
    pub fn as_str(&self) -> &'static str {
        match *self {
            Status::Continue => "Continue",
            Status::SwitchingProtocols => "Switching Protocols",

            Status::Ok => "OK",
            Status::Created => "Created",
            Status::Accepted => "Accepted",
            Status::NoContent => "No Content",

            Status::MovedPermanently => "Moved Permanently",
            Status::Found => "Found",
            Status::NotModified => "Not Modified",

            Status::BadRequest => "Bad Request",
            Status::Unauthorized => "Unauthorized",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::RequestTimeout => "Request Timeout",
            Status::PayloadTooLarge => "Payload Too Large",

            Status::InternalServerError => "Internal Server Error",
            Status::NotImplemented => "Not Implemented",
            Status::BadGateway => "Bad Gateway",
            Status::ServiceUnavailable => "Service Unavailable",
        }
    }

    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Look up a known status by its numeric code
    pub fn from_code(code: u16) -> Option<Status> {
        const ALL: [Status; 20] = [
            Status::Continue,
            Status::SwitchingProtocols,
            Status::Ok,
            Status::Created,
            Status::Accepted,
            Status::NoContent,
            Status::MovedPermanently,
            Status::Found,
            Status::NotModified,
            Status::BadRequest,
            Status::Unauthorized,
            Status::Forbidden,
            Status::NotFound,
            Status::MethodNotAllowed,
            Status::RequestTimeout,
            Status::PayloadTooLarge,
            Status::InternalServerError,
            Status::NotImplemented,
            Status::BadGateway,
            Status::ServiceUnavailable,
        ];
        ALL.iter().copied().find(|s| s.code() == code)
    }
}

/// Header fields with case-insensitive names.
///
/// Insertion order is kept for serialization; setting an existing name
/// replaces its value but keeps the spelling it was first stored under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, overwriting any previous value
    pub fn insert(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) => self.entries[i].1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    /// Get a header
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut String> {
        self.position(name).map(move |i| &mut self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

/// HTTP Request
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    version: String,
    headers: Headers,
    route: String,
}

impl Request {
    /// Create a new request
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            version: "HTTP/1.1".to_string(),
            headers: Headers::new(),
            route: String::new(),
        }
    }

    /// Builder-style header setter, mostly for handler tests
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Read and parse one request from a connection
    pub fn read_from<T: Transport + ?Sized>(transport: &T) -> ServerResult<Self> {
        HttpParser::new().parse(transport)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The protocol token from the request line, e.g. `HTTP/1.1`
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get a header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The route pattern that matched this request, empty before routing
    pub fn route(&self) -> &str {
        &self.route
    }

    pub(crate) fn set_route(&mut self, route: &str) {
        self.route = route.to_string();
    }
}

/// HTTP Parser State
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpParserState {
    RequestLine,
    Headers,
    Complete,
}

/// Line driven request parser.
///
/// Headers follow two legacy rules: a value ending in `,` swallows the next
/// non-blank line as a continuation, joined with a single space, and lines
/// without a colon are dropped. The continuation check only looks at the
/// previously stored value, so a header whose value happens to end in a
/// comma also absorbs the next header line.
#[derive(Debug)]
pub struct HttpParser {
    state: HttpParserState,
    method: Option<Method>,
    path: String,
    version: String,
    headers: Headers,
    last_header: Option<String>,
}

impl HttpParser {
    /// Create a new HTTP parser
    pub fn new() -> Self {
        Self {
            state: HttpParserState::RequestLine,
            method: None,
            path: String::new(),
            version: String::new(),
            headers: Headers::new(),
            last_header: None,
        }
    }

    pub fn state(&self) -> HttpParserState {
        self.state
    }

    /// Check if the parser has completed parsing a request
    pub fn is_complete(&self) -> bool {
        self.state == HttpParserState::Complete
    }

    /// Pull lines from the transport until the blank separator line
    pub fn parse<T: Transport + ?Sized>(mut self, transport: &T) -> ServerResult<Request> {
        while !self.is_complete() {
            let line = transport.read_line()?;
            self.feed_line(&line)?;
        }
        self.into_request()
    }

    /// Advance the state machine by one line (terminator already stripped)
    pub fn feed_line(&mut self, line: &str) -> ServerResult<HttpParserState> {
        match self.state {
            HttpParserState::RequestLine => {
                self.parse_request_line(line)?;
                self.state = HttpParserState::Headers;
            }
            HttpParserState::Headers => {
                if line.is_empty() {
                    self.state = HttpParserState::Complete;
                } else {
                    self.parse_header(line);
                }
            }
            HttpParserState::Complete => {
                return Err(ServerError::State("request already complete".to_string()));
            }
        }
        Ok(self.state)
    }

    /// Get the parsed request
    pub fn into_request(self) -> ServerResult<Request> {
        if !self.is_complete() {
            return Err(ServerError::Protocol("Request not complete".to_string()));
        }
        let method = self
            .method
            .ok_or_else(|| ServerError::Protocol("Method not set".to_string()))?;

        for (name, value) in self.headers.iter() {
            debug!("  {}: {}", name, value);
        }

        Ok(Request {
            method,
            path: self.path,
            version: self.version,
            headers: self.headers,
            route: String::new(),
        })
    }

    /// Parse a request line
    fn parse_request_line(&mut self, line: &str) -> ServerResult<()> {
        let invalid = || ServerError::Protocol(format!("Invalid request line: {}", line));

        let (method, rest) = line.split_once(' ').ok_or_else(invalid)?;
        let method = Method::parse(method);

        let rest = rest.trim_start_matches(' ');
        let (target, version) = rest.split_once(' ').ok_or_else(invalid)?;

        // Absolute-form targets carry a scheme and authority before the path
        let path = match target.split_once("://") {
            Some((scheme, remainder)) if !scheme.is_empty() && !scheme.contains('/') => {
                remainder.find('/').map_or("/", |i| &remainder[i..])
            }
            _ => target.find('/').map(|i| &target[i..]).ok_or_else(invalid)?,
        };

        debug!("  Request Method: {}", method);
        debug!("  Request Path: {}", path);

        self.method = Some(method);
        self.path = path.to_string();
        self.version = version.trim().to_string();
        Ok(())
    }

    /// Parse a header line; lines without a colon are dropped
    fn parse_header(&mut self, line: &str) {
        let line = line.trim_start_matches(' ');

        if let Some(name) = &self.last_header {
            if let Some(value) = self.headers.get_mut(name) {
                if value.ends_with(',') {
                    value.push(' ');
                    value.push_str(line);
                    return;
                }
            }
        }

        match line.split_once(':') {
            Some((name, value)) => {
                let name = name.trim();
                self.headers.insert(name, value.trim_start_matches(' '));
                self.last_header = Some(name.to_string());
            }
            None => debug!("Ignoring malformed header line: {}", line),
        }
    }
}

impl Default for HttpParser {
    fn default() -> Self {
        Self::new()
    }
}
