use std::fmt;
use std::ops::BitOr;

/// HTTP Methods
///
/// Parsing never fails: tokens outside the known set are kept as
/// [`Method::Unrecognized`] so handlers can still see them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Post,
    Put,
    Trace,
    Unrecognized(String),
}

impl Method {
    /// Parse a method token, ignoring case
    pub fn parse(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "CONNECT" => Method::Connect,
            "DELETE" => Method::Delete,
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "TRACE" => Method::Trace,
            _ => Method::Unrecognized(token.to_string()),
        }
    }

    /// Convert the method to a string
    pub fn as_str(&self) -> &str {
        match self {
            Method::Connect => "CONNECT",
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Trace => "TRACE",
            Method::Unrecognized(token) => token,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Method::Unrecognized(_))
    }

    fn bit(&self) -> u8 {
        match self {
            Method::Connect => 0x01,
            Method::Delete => 0x02,
            Method::Get => 0x04,
            Method::Head => 0x08,
            Method::Options => 0x10,
            Method::Post => 0x20,
            Method::Put => 0x40,
            Method::Trace => 0x80,
            Method::Unrecognized(_) => 0,
        }
    }
}

impl From<&str> for Method {
    fn from(token: &str) -> Self {
        Method::parse(token)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of methods a route answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSet(u8);

impl MethodSet {
    pub const NONE: MethodSet = MethodSet(0x00);
    pub const CONNECT: MethodSet = MethodSet(0x01);
    pub const DELETE: MethodSet = MethodSet(0x02);
    pub const GET: MethodSet = MethodSet(0x04);
    pub const HEAD: MethodSet = MethodSet(0x08);
    pub const OPTIONS: MethodSet = MethodSet(0x10);
    pub const POST: MethodSet = MethodSet(0x20);
    pub const PUT: MethodSet = MethodSet(0x40);
    pub const TRACE: MethodSet = MethodSet(0x80);
    /// DELETE, GET, POST and PUT
    pub const REST: MethodSet = MethodSet(0x66);
    /// Every method, including unrecognized ones
    pub const ALL: MethodSet = MethodSet(0xFF);

    /// Whether a request with `method` falls in this set
    pub fn contains(&self, method: &Method) -> bool {
        if *self == MethodSet::ALL {
            return true;
        }
        let bit = method.bit();
        bit != 0 && self.0 & bit == bit
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    fn members(&self) -> impl Iterator<Item = Method> + '_ {
        [
            Method::Connect,
            Method::Delete,
            Method::Get,
            Method::Head,
            Method::Options,
            Method::Post,
            Method::Put,
            Method::Trace,
        ]
        .into_iter()
        .filter(move |m| self.0 & m.bit() != 0)
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        MethodSet(method.bit())
    }
}

impl BitOr for MethodSet {
    type Output = MethodSet;

    fn bitor(self, rhs: MethodSet) -> MethodSet {
        MethodSet(self.0 | rhs.0)
    }
}

/// Renders as a comma separated list, suitable for an `Allow` header
impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, method) in self.members().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(method.as_str())?;
        }
        Ok(())
    }
}
