//! Minimal HTTP/1.1 server on 127.0.0.1 for client tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct TestServer {
    /// `http://127.0.0.1:<port>` without a trailing slash
    pub url: String,
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Answer the n-th connection with the n-th `(status, body)`; the last one repeats
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let paths = Arc::new(Mutex::new(Vec::new()));

        let counter = hits.clone();
        let seen = paths.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _peer)) = listener.accept().await else {
                    return;
                };
                let idx = counter.fetch_add(1, Ordering::SeqCst);
                let path = read_request_path(&mut socket).await;
                seen.lock().unwrap().push(path);

                let (status, body) = responses
                    .get(idx)
                    .or_else(|| responses.last())
                    .cloned()
                    .unwrap_or((500, String::new()));

                let response = format!(
                    "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            url: format!("http://{}", addr),
            hits,
            paths,
        }
    }

    /// Accept connections and never answer
    pub async fn silent() -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _peer)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });

        Self {
            url: format!("http://{}", addr),
            hits,
            paths: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Connections accepted so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request targets (path + query) in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

async fn read_request_path(socket: &mut TcpStream) -> String {
    let mut buf = [0u8; 1024];
    let mut req = Vec::new();
    loop {
        match socket.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                req.extend_from_slice(&buf[..n]);
                if req.windows(4).any(|w| w == b"\r\n\r\n") || req.len() > 16 * 1024 {
                    break;
                }
            }
            Err(_) => break,
        }
    }

    let request_line = req
        .split(|b| *b == b'\n')
        .next()
        .map(|l| String::from_utf8_lossy(l).to_string())
        .unwrap_or_default();
    request_line.split_whitespace().nth(1).unwrap_or("/").to_string()
}
