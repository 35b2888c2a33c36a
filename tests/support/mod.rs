//! Minimal HTTP/1.1 stand-in for the UAA token endpoint and the RLP gateway.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub authorization: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Routes {
    pub token_status: u16,
    pub gateway_status: u16,
    pub sse_body: String,
}

impl Routes {
    pub fn streaming(sse_body: impl Into<String>) -> Self {
        Self {
            token_status: 200,
            gateway_status: 200,
            sse_body: sse_body.into(),
        }
    }
}

pub struct FakePlatform {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakePlatform {
    pub async fn spawn(routes: Routes) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let routes = routes.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = serve(socket, routes, recorded).await;
                });
            }
        });

        Ok(Self { addr, requests })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn gateway_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.target.starts_with("/v2/read"))
            .collect()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

async fn serve(
    mut socket: TcpStream,
    routes: Routes,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let mut authorization = None;
    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            match name.to_ascii_lowercase().as_str() {
                "authorization" => authorization = Some(value.to_string()),
                "content-length" => content_length = value.parse().unwrap_or(0),
                _ => {}
            }
        }
    }

    let mut body_read = buf.len() - header_end;
    while body_read < content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body_read += n;
    }

    recorded.lock().unwrap().push(RecordedRequest {
        method,
        target: target.clone(),
        authorization,
    });

    let response = if target.starts_with("/oauth/token") {
        if routes.token_status == 200 {
            let body = r#"{"access_token":"test-token","token_type":"bearer","expires_in":3600}"#;
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
        } else {
            empty_response(routes.token_status)
        }
    } else if target.starts_with("/v2/read") {
        if routes.gateway_status == 200 {
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{}",
                routes.sse_body
            )
        } else {
            empty_response(routes.gateway_status)
        }
    } else {
        empty_response(404)
    };

    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

fn empty_response(status: u16) -> String {
    format!(
        "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        status,
        reason(status)
    )
}

pub const METRICS_SSE: &str = concat!(
    "event: heartbeat\ndata: 1700000000\n\n",
    "data: {\"batch\":[",
    "{\"sourceId\":\"app-1\",\"instanceId\":\"0\",\"timestamp\":\"1700000000000000000\",",
    "\"tags\":{\"origin\":\"rep\"},",
    "\"counter\":{\"name\":\"requests\",\"delta\":\"1\",\"total\":\"42\"}},",
    "{\"sourceId\":\"app-1\",\"instanceId\":\"0\",\"timestamp\":\"1700000000000000000\",",
    "\"gauge\":{\"metrics\":{\"cpu\":{\"unit\":\"percentage\",\"value\":12.5}}}}",
    "]}\n\n",
    "event: closing\ndata: bye\n\n",
);
