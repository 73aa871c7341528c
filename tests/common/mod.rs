#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc::channel;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use webby::{Router, Server, ServerConfig};

/// A response as seen by a client on the wire
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn parse(raw: &str) -> Self {
        let (head, body) = raw.split_once("\r\n\r\n").expect("no header terminator");
        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap();
        let mut parts = status_line.splitn(3, ' ');
        assert!(parts.next().unwrap().starts_with("HTTP/"));
        let status = parts.next().unwrap().parse().unwrap();
        let reason = parts.next().unwrap_or("").to_string();
        let headers = lines
            .filter_map(|line| line.split_once(": "))
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();

        Self {
            status,
            reason,
            headers,
            body: body.to_string(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Start a server on an ephemeral port that handles `connections` clients
pub fn spawn_server(router: Router, connections: usize) -> (SocketAddr, JoinHandle<()>) {
    let (tx, rx) = channel();

    let handle = thread::spawn(move || {
        let config = ServerConfig::new().with_address("127.0.0.1", 0);
        let server = Server::new(config, router).unwrap();
        tx.send(server.local_addr().unwrap()).unwrap();

        for _ in 0..connections {
            server.serve_next().unwrap();
        }
    });

    (rx.recv().unwrap(), handle)
}

/// Send raw bytes and read until the server closes the connection
pub fn send_raw(addr: SocketAddr, request: &[u8]) -> std::io::Result<String> {
    let mut client = TcpStream::connect(addr)?;
    client.set_read_timeout(Some(Duration::from_secs(5)))?;
    client.write_all(request)?;

    let mut reply = Vec::new();
    client.read_to_end(&mut reply)?;
    Ok(String::from_utf8_lossy(&reply).into_owned())
}

pub fn request(addr: SocketAddr, request: &str) -> RawResponse {
    RawResponse::parse(&send_raw(addr, request.as_bytes()).unwrap())
}
