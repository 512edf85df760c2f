//! Scripted localhost HTTP server for client tests.
//!
//! Each scripted reply answers exactly one connection; the join handle
//! yields the raw requests (head and body) in arrival order.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Reply {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

/// Bind an ephemeral port; returns the listener and its `http://` base URL.
pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    (listener, url)
}

pub fn serve(listener: TcpListener, replies: Vec<Reply>) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut requests = Vec::new();
        for reply in replies {
            let (mut sock, _) = listener.accept().await.unwrap();
            requests.push(read_request(&mut sock).await);

            let mut head = format!(
                "HTTP/1.1 {} Test\r\ncontent-length: {}\r\nconnection: close\r\n",
                reply.status,
                reply.body.len()
            );
            for (name, value) in &reply.headers {
                head.push_str(&format!("{name}: {value}\r\n"));
            }
            head.push_str("\r\n");
            sock.write_all(head.as_bytes()).await.unwrap();
            sock.write_all(reply.body.as_bytes()).await.unwrap();
        }
        requests
    })
}

/// Answer a single JSON request; the handle yields that request.
pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
    let (listener, url) = bind().await;
    let server = serve(
        listener,
        vec![Reply::new(status, body).header("content-type", "application/json")],
    );
    let handle = tokio::spawn(async move { server.await.unwrap().remove(0) });
    (url, handle)
}

async fn read_request(sock: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = sock.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
