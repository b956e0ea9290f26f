//! Mock Esplora server for integration tests.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

/// Canned reply for a route.
#[derive(Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
}

/// Minimal HTTP/1.1 server answering canned responses keyed by "METHOD /path".
pub struct MockEsplora {
    url: String,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockEsplora {
    pub async fn start(routes: Vec<(&str, MockResponse)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<HashMap<String, MockResponse>> = Arc::new(
            routes
                .into_iter()
                .map(|(route, response)| (route.to_string(), response))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    handle(stream, routes, seen).await;
                });
            }
        });

        Self { url, requests }
    }

    pub fn url(&self) -> String {
        self.url.clone()
    }

    /// Requests received so far as (route, body).
    pub async fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().await.clone()
    }
}

async fn handle(
    mut stream: TcpStream,
    routes: Arc<HashMap<String, MockResponse>>,
    seen: Arc<Mutex<Vec<(String, String)>>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request_line = head.lines().next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let route = format!(
        "{} {}",
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default()
    );
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    seen.lock().await.push((route.clone(), body));

    let response = routes.get(&route).cloned().unwrap_or(MockResponse {
        status: 404,
        body: "not found".to_string(),
    });
    let reply = format!(
        "HTTP/1.1 {} MOCK\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{}",
        response.status,
        response.body.len(),
        response.body
    );
    let _ = stream.write_all(reply.as_bytes()).await;
    let _ = stream.shutdown().await;
}
