use crate::acceptor::Listener;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::http::{Request, Status};
use crate::logging::ACCESS_TARGET;
use crate::response::Response;
use crate::router::Router;
use crate::socket::Transport;
use log::{debug, error, info, log_enabled, warn, Level};
use std::net::SocketAddr;

/// Sequential HTTP server: one blocking accept, one request, one dispatch.
///
/// A slow client holds up everyone queued behind it; failures on a single
/// connection are logged and the loop moves on to the next client.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    router: Router,
    listener: Listener,
}

impl Server {
    /// Create the listening endpoint described by `config`.
    ///
    /// Any failure here is fatal: the server never runs without a bound listener.
    pub fn new(config: ServerConfig, router: Router) -> ServerResult<Self> {
        let mut listener = Listener::with_backlog(config.backlog);
        if let Err(e) = listener.create(&config.listen_address, config.port) {
            error!("Could not start server on {}: {}", config.socket_address(), e);
            return Err(e);
        }

        Ok(Self {
            config,
            router,
            listener,
        })
    }

    /// Serve connections until a fatal error occurs
    pub fn run(&self) -> ServerResult<()> {
        info!("Serving on {}", self.local_addr()?);
        loop {
            if let Err(e) = self.serve_next() {
                error!("Server stopped: {}", e);
                return Err(e);
            }
        }
    }

    /// Accept one connection and handle its request.
    ///
    /// Only listener failures are returned; per-connection errors are logged.
    pub fn serve_next(&self) -> ServerResult<()> {
        let connection = self.listener.accept()?;
        let client_ip = connection.client_ip();
        debug!("Accepted connection #{} from {}", connection.id(), connection.peer_addr());
        if log_enabled!(Level::Debug) {
            match connection.client_hostname() {
                Ok(name) => debug!("  Client Hostname: {}", name),
                Err(e) => debug!("  Client Hostname unavailable: {}", e),
            }
        }

        match self.handle_connection(&connection, &client_ip) {
            Ok(()) => Ok(()),
            Err(e) if !e.is_fatal() => {
                warn!("Connection from {} failed: {}", client_ip, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Parse, decorate and route a single request
    fn handle_connection<T>(&self, connection: &T, client_ip: &str) -> ServerResult<()>
    where
        T: Transport + Clone + 'static,
    {
        let mut request = match Request::read_from(connection) {
            Ok(request) => request,
            Err(e @ ServerError::Protocol(_)) => {
                let mut response = Response::new(connection.clone());
                response.set_status(Status::BadRequest);
                if let Err(send_error) = response.finish() {
                    debug!("Could not send 400 to {}: {}", client_ip, send_error);
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let mut response = Response::new(connection.clone());
        if let Some(host) = request.header("Host") {
            let location = format!("http://{}{}", host, request.path());
            response.set_header("Location", &location);
        }

        let routed = self.router.route(&mut request, &mut response);
        let status = response.status_code();
        response.finish()?;

        info!(
            target: ACCESS_TARGET,
            "{} \"{} {}\" {}",
            client_ip,
            request.method(),
            request.path(),
            status
        );

        match routed {
            Err(ServerError::NoRoute(what)) => {
                debug!("No route for {}", what);
                Ok(())
            }
            other => other,
        }
    }

    /// Get the address the listener is bound to
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::tests::MemoryTransport;

    fn server_with(router: Router) -> Server {
        let config = ServerConfig::new().with_address("127.0.0.1", 0);
        Server::new(config, router).unwrap()
    }

    #[test]
    fn test_location_header_from_host() {
        let mut router = Router::new();
        router.add("/hello", |_: &Request, response: &mut Response| {
            let _ = response.write_body(b"ok");
        });
        let server = server_with(router);

        let transport =
            MemoryTransport::with_input(b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n");
        server.handle_connection(&transport, "127.0.0.1").unwrap();

        let written = transport.written();
        assert!(written.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(written.contains("Location: http://x/hello\r\n"));
        assert!(written.ends_with("\r\n\r\nok"));
    }

    #[test]
    fn test_no_host_no_location() {
        let server = server_with(Router::new());
        let transport = MemoryTransport::with_input(b"GET /hello HTTP/1.0\r\n\r\n");
        server.handle_connection(&transport, "127.0.0.1").unwrap();

        let written = transport.written();
        assert!(written.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(!written.contains("Location:"));
    }

    #[test]
    fn test_malformed_request_line_answers_400() {
        let server = server_with(Router::new());
        let transport = MemoryTransport::with_input(b"GARBAGE\r\n\r\n");
        let result = server.handle_connection(&transport, "127.0.0.1");

        assert!(matches!(result, Err(ServerError::Protocol(_))));
        assert!(transport.written().starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_startup_fails_on_taken_port() {
        let first = server_with(Router::new());
        let port = first.local_addr().unwrap().port();

        let config = ServerConfig::new().with_address("127.0.0.1", port);
        assert!(matches!(
            Server::new(config, Router::new()),
            Err(ServerError::Bind(_))
        ));
    }
}
