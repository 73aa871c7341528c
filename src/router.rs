use crate::error::{ServerError, ServerResult};
use crate::http::{Request, Status};
use crate::method::{Method, MethodSet};
use crate::response::Response;
use std::fmt;
use std::sync::Arc;

/// Something that can answer a routed request.
///
/// Implemented for every `Fn(&Request, &mut Response)` closure.
pub trait Handler: Send + Sync {
    fn handle(&self, request: &Request, response: &mut Response);
}

impl<F> Handler for F
where
    F: Fn(&Request, &mut Response) + Send + Sync,
{
    fn handle(&self, request: &Request, response: &mut Response) {
        self(request, response)
    }
}

/// A shared handler for processing HTTP requests
pub type HandlerFn = Arc<dyn Handler>;

/// A route entry in the router
#[derive(Clone)]
struct RouteEntry {
    /// The HTTP methods this route responds to
    methods: MethodSet,

    /// Path prefix this route matches
    pattern: String,

    handler: HandlerFn,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("methods", &self.methods)
            .field("pattern", &self.pattern)
            .field("handler", &"<function>")
            .finish()
    }
}

/// Ordered table of route patterns.
///
/// A pattern matches every path it is a prefix of, and routes are tried in
/// registration order: with `/a` registered before `/a/b`, a request for
/// `/a/b` goes to `/a`.
#[derive(Clone)]
pub struct Router {
    routes: Vec<RouteEntry>,

    /// The handler to use when no route matches
    error_handler: HandlerFn,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("error_handler", &"<function>")
            .finish()
    }
}

impl Router {
    /// Create a new router
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            error_handler: Arc::new(default_error_handler),
        }
    }

    /// Add a route answering every method
    pub fn add<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.add_for(MethodSet::ALL, pattern, handler)
    }

    /// Add a route restricted to a set of methods
    pub fn add_for<H: Handler + 'static>(
        &mut self,
        methods: MethodSet,
        pattern: &str,
        handler: H,
    ) -> &mut Self {
        self.routes.push(RouteEntry {
            methods,
            pattern: pattern.to_string(),
            handler: Arc::new(handler),
        });
        self
    }

    /// Add a GET route
    pub fn get<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.add_for(MethodSet::GET, pattern, handler)
    }

    /// Add a POST route
    pub fn post<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.add_for(MethodSet::POST, pattern, handler)
    }

    /// Add a PUT route
    pub fn put<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.add_for(MethodSet::PUT, pattern, handler)
    }

    /// Add a DELETE route
    pub fn delete<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.add_for(MethodSet::DELETE, pattern, handler)
    }

    /// Replace the handler invoked when no route matches
    pub fn set_error_handler<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Dispatch a request to the first matching route.
    ///
    /// Records the matched pattern on the request before calling the handler.
    /// When nothing matches, the error handler fills in the response and
    /// [`ServerError::NoRoute`] is returned so the caller can tell.
    pub fn route(&self, request: &mut Request, response: &mut Response) -> ServerResult<()> {
        match self.find(request.method(), request.path()) {
            Some(entry) => {
                request.set_route(&entry.pattern);
                entry.handler.handle(request, response);
                Ok(())
            }
            None => {
                self.error_handler.handle(request, response);
                Err(ServerError::NoRoute(format!(
                    "{} {}",
                    request.method(),
                    request.path()
                )))
            }
        }
    }

    /// The pattern that would handle `method` on `path`, if any
    pub fn matching_route(&self, method: &Method, path: &str) -> Option<&str> {
        self.find(method, path).map(|entry| entry.pattern.as_str())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn find(&self, method: &Method, path: &str) -> Option<&RouteEntry> {
        self.routes
            .iter()
            .find(|route| route.methods.contains(method) && path.starts_with(&route.pattern))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn default_error_handler(_request: &Request, response: &mut Response) {
    response.set_status(Status::NotFound);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::tests::MemoryTransport;

    fn respond_with(body: &'static str) -> impl Fn(&Request, &mut Response) + Send + Sync {
        move |_, response| {
            let _ = response.write_body(body.as_bytes());
        }
    }

    fn dispatch(router: &Router, method: Method, path: &str) -> (ServerResult<()>, Request, String) {
        let transport = MemoryTransport::default();
        let mut request = Request::new(method, path);
        let mut response = Response::new(transport.clone());
        let result = router.route(&mut request, &mut response);
        drop(response);
        (result, request, transport.written())
    }

    #[test]
    fn test_router_first_match_wins() {
        let mut router = Router::new();
        router.add("/a", respond_with("A"));
        router.add("/a/b", respond_with("AB"));

        let (result, request, written) = dispatch(&router, Method::Get, "/a/b");
        assert!(result.is_ok());
        assert_eq!(request.route(), "/a");
        assert!(written.ends_with("\r\n\r\nA"));
    }

    #[test]
    fn test_router_specific_pattern_first() {
        let mut router = Router::new();
        router.add("/a/b", respond_with("AB"));
        router.add("/a", respond_with("A"));

        assert_eq!(router.matching_route(&Method::Get, "/a/b/c"), Some("/a/b"));
        assert_eq!(router.matching_route(&Method::Get, "/a/x"), Some("/a"));
        assert_eq!(router.matching_route(&Method::Get, "/b"), None);
    }

    #[test]
    fn test_router_method_matching() {
        let mut router = Router::new();
        router.get("/api", respond_with("GET"));
        router.post("/api", respond_with("POST"));

        let (_, _, written) = dispatch(&router, Method::Get, "/api");
        assert!(written.ends_with("GET"));

        let (_, _, written) = dispatch(&router, Method::Post, "/api");
        assert!(written.ends_with("POST"));

        let (result, request, written) = dispatch(&router, Method::Put, "/api");
        assert!(matches!(result, Err(ServerError::NoRoute(_))));
        assert_eq!(request.route(), "");
        assert!(written.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn test_unrecognized_method_only_hits_all() {
        let mut router = Router::new();
        router.add_for(MethodSet::REST, "/rest", respond_with("rest"));
        router.add("/", respond_with("any"));

        let brew = Method::Unrecognized("BREW".to_string());
        assert_eq!(router.matching_route(&brew, "/rest"), Some("/"));
        assert_eq!(router.matching_route(&Method::Delete, "/rest"), Some("/rest"));
    }

    #[test]
    fn test_custom_error_handler() {
        let mut router = Router::new();
        router.set_error_handler(|request: &Request, response: &mut Response| {
            response.set_status_code(410);
            let _ = response.write_body(format!("gone: {}", request.path()).as_bytes());
        });

        let (result, _, written) = dispatch(&router, Method::Get, "/old");
        assert!(matches!(result, Err(ServerError::NoRoute(_))));
        assert!(written.starts_with("HTTP/1.1 410 "));
        assert!(written.ends_with("gone: /old"));
    }

    #[test]
    fn test_router_len() {
        let mut router = Router::new();
        assert!(router.is_empty());
        router.add("/", respond_with("root")).get("/x", respond_with("x"));
        assert_eq!(router.len(), 2);
    }
}
