#![allow(dead_code)]

//! Minimal HTTP/1.1 PocketBase stand-in on a loopback port.
//!
//! Every `GET /api/realtime` opens an event stream that immediately sends
//! `PB_CONNECT` with client id `cid{n}` (n counts connections from 1), then
//! hands the socket to the test. Every other request gets the canned reply
//! for its method and is recorded.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json(body: Value) -> Self {
        Self::new(200, body.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Replies {
    pub register: Reply,
    pub list: Reply,
}

impl Default for Replies {
    fn default() -> Self {
        Self {
            register: Reply::new(204, ""),
            list: Reply::ok_json(serde_json::json!({"items": []})),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    /// Path and query.
    pub target: String,
    pub body: String,
}

impl Request {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// Server side of one realtime connection.
#[derive(Debug)]
pub struct EventStream {
    pub client_id: String,
    socket: TcpStream,
}

impl EventStream {
    pub async fn send(&mut self, event: &str, data: &str) {
        let frame = format!("event: {event}\ndata: {data}\n\n");
        self.socket.write_all(frame.as_bytes()).await.unwrap();
        self.socket.flush().await.unwrap();
    }

    /// True once the client side has gone away.
    pub async fn closed_by_client(&mut self) -> bool {
        let mut buf = [0u8; 64];
        matches!(
            tokio::time::timeout(
                Duration::from_secs(5),
                self.socket.read(&mut buf)
            )
            .await,
            Ok(Ok(0) | Err(_))
        )
    }

    /// End the response body, as a server restart would.
    pub async fn close(mut self) {
        let _ = self.socket.shutdown().await;
    }
}

#[derive(Debug)]
pub struct StubServer {
    pub base_url: String,
    requests: mpsc::UnboundedReceiver<Request>,
    streams: mpsc::UnboundedReceiver<EventStream>,
}

impl StubServer {
    pub async fn start(replies: Replies) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (requests_tx, requests) = mpsc::unbounded_channel();
        let (streams_tx, streams) = mpsc::unbounded_channel();
        let connections = Arc::new(AtomicUsize::new(0));

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let replies = replies.clone();
                let requests_tx = requests_tx.clone();
                let streams_tx = streams_tx.clone();
                let connections = Arc::clone(&connections);
                tokio::spawn(async move {
                    serve(socket, replies, requests_tx, streams_tx, connections)
                        .await;
                });
            }
        });

        Self {
            base_url,
            requests,
            streams,
        }
    }

    /// Next realtime connection, after its `PB_CONNECT` was sent.
    pub async fn next_stream(&mut self) -> EventStream {
        tokio::time::timeout(Duration::from_secs(5), self.streams.recv())
            .await
            .expect("timed out waiting for a realtime connection")
            .expect("stub server stopped")
    }

    /// Next recorded non-stream request.
    pub async fn next_request(&mut self) -> Request {
        tokio::time::timeout(Duration::from_secs(5), self.requests.recv())
            .await
            .expect("timed out waiting for a request")
            .expect("stub server stopped")
    }
}

async fn serve(
    mut socket: TcpStream,
    replies: Replies,
    requests: mpsc::UnboundedSender<Request>,
    streams: mpsc::UnboundedSender<EventStream>,
    connections: Arc<AtomicUsize>,
) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };

    if request.method == "GET" && request.target == "/api/realtime" {
        let n = connections.fetch_add(1, Ordering::SeqCst) + 1;
        let client_id = format!("cid{n}");
        let head = "HTTP/1.1 200 OK\r\n\
                    Content-Type: text/event-stream\r\n\
                    Cache-Control: no-cache\r\n\
                    Connection: close\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        let mut stream = EventStream {
            client_id: client_id.clone(),
            socket,
        };
        let connect = serde_json::json!({"clientId": client_id}).to_string();
        stream.send("PB_CONNECT", &connect).await;
        let _ = streams.send(stream);
        return;
    }

    let reply = if request.method == "POST" {
        &replies.register
    } else {
        &replies.list
    };
    let _ = requests.send(request.clone());
    let response = format!(
        "HTTP/1.1 {} Stub\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{}",
        reply.status,
        reply.body.len(),
        reply.body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let read = socket.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.lines();
    let mut start = lines.next()?.split_whitespace();
    let method = start.next()?.to_string();
    let target = start.next()?.to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let read = socket.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..read]);
    }
    let body = String::from_utf8_lossy(&buf[head_end..]).into_owned();

    Some(Request {
        method,
        target,
        body,
    })
}
