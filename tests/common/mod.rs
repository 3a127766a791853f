#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tickload::{Config, Dispatcher, RequestTemplate, ResultRecord};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Minimal keep-alive HTTP/1.1 endpoint answering every request with a fixed
/// status after a fixed delay.
pub struct MockServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    requests: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(status: u16, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::serve(listener, status, delay)
    }

    pub fn serve(listener: TcpListener, status: u16, delay: Duration) -> Self {
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(AtomicUsize::new(0));

        let (conns, reqs) = (connections.clone(), requests.clone());
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                conns.fetch_add(1, Ordering::SeqCst);
                let reqs = reqs.clone();
                tokio::spawn(handle_connection(stream, status, delay, reqs));
            }
        });

        Self {
            addr,
            connections,
            requests,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/search/test", self.addr)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    status: u16,
    delay: Duration,
    requests: Arc<AtomicUsize>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let header_end = loop {
            if let Some(pos) = find_header_end(&buf) {
                break pos;
            }
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        };

        let body_len = content_length(&buf[..header_end]);
        while buf.len() < header_end + body_len {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
        buf.drain(..header_end + body_len);
        requests.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(delay).await;
        let response = format!("HTTP/1.1 {status} Mock\r\ncontent-length: 2\r\n\r\nok");
        if stream.write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(0)
}

/// An address nothing listens on.
pub fn refused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Runs a dispatcher for `window`, stops it, and returns every record it
/// emitted.
pub async fn run_for(
    workers: usize,
    period_ms: u64,
    template: RequestTemplate,
    window: Duration,
) -> Vec<ResultRecord> {
    let (tx, mut rx) = tickload::output::channel();
    let config = Config {
        workers,
        period_ms,
        ..Config::default()
    };
    let dispatcher = Dispatcher::start(&config, template, tx).unwrap();
    tokio::time::sleep(window).await;
    dispatcher.shutdown().await;

    let mut records = Vec::new();
    while let Some(record) = rx.recv().await {
        records.push(record);
    }
    records
}

pub fn count_for(records: &[ResultRecord], worker: &str) -> usize {
    records
        .iter()
        .filter(|r| r.worker.as_str() == worker)
        .count()
}
