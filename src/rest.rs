use crate::http::{Request, Status};
use crate::method::Method;
use crate::response::Response;
use crate::router::Handler;

/// A RESTful resource mounted under a route pattern.
///
/// Every action defaults to doing nothing, which leaves the preset
/// `501 Not Implemented` status in place.
pub trait Resource: Send + Sync {
    /// `GET /path`: the collection
    fn index(&self, _request: &Request, _response: &mut Response) {}

    /// `GET /path/{id}`: one member
    fn show(&self, _request: &Request, _response: &mut Response) {}

    /// `POST /path`
    fn create(&self, _request: &Request, _response: &mut Response) {}

    /// `PUT /path/{id}`
    fn update(&self, _request: &Request, _response: &mut Response) {}

    /// `DELETE /path/{id}`
    fn destroy(&self, _request: &Request, _response: &mut Response) {}
}

/// Adapts a [`Resource`] to a route [`Handler`]
pub struct RestHandler<R> {
    resource: R,
}

impl<R: Resource> RestHandler<R> {
    pub fn new(resource: R) -> Self {
        Self { resource }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }
}

impl<R: Resource> Handler for RestHandler<R> {
    fn handle(&self, request: &Request, response: &mut Response) {
        response.set_status(Status::NotImplemented);
        match request.method() {
            Method::Delete => self.resource.destroy(request, response),
            Method::Get if request.path() == request.route() => {
                self.resource.index(request, response)
            }
            Method::Get => self.resource.show(request, response),
            Method::Post => self.resource.create(request, response),
            Method::Put => self.resource.update(request, response),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodSet;
    use crate::router::Router;
    use crate::socket::tests::MemoryTransport;

    struct Users;

    impl Resource for Users {
        fn index(&self, _request: &Request, response: &mut Response) {
            response.set_status(Status::Ok);
            let _ = response.write_body(b"all users");
        }

        fn show(&self, request: &Request, response: &mut Response) {
            let id = &request.path()[request.route().len()..];
            response.set_status(Status::Ok);
            let _ = response.write_body(format!("user {}", id.trim_start_matches('/')).as_bytes());
        }
    }

    fn call(method: Method, path: &str) -> String {
        let mut router = Router::new();
        router.add_for(MethodSet::REST, "/users", RestHandler::new(Users));

        let transport = MemoryTransport::default();
        let mut request = Request::new(method, path);
        let mut response = Response::new(transport.clone());
        let _ = router.route(&mut request, &mut response);
        drop(response);
        transport.written()
    }

    #[test]
    fn test_get_collection_and_member() {
        let written = call(Method::Get, "/users");
        assert!(written.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(written.ends_with("all users"));

        let written = call(Method::Get, "/users/42");
        assert!(written.ends_with("user 42"));
    }

    #[test]
    fn test_unimplemented_actions() {
        for method in [Method::Post, Method::Put, Method::Delete] {
            let written = call(method, "/users/1");
            assert!(written.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
        }
    }

    #[test]
    fn test_non_rest_method_is_not_routed() {
        let written = call(Method::Head, "/users");
        assert!(written.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }
}
