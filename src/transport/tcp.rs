//! Default transport: plain-TCP HTTP/1.1 over `tokio::net`.
//!
//! Deliberately minimal — one request per connection (`connection: close`),
//! no TLS, no pooling. It exists so the dispatch core is usable out of the
//! box and so the failure taxonomy can be exercised against real sockets.

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::request::{RequestSpec, Target};
use crate::response::Response;

use super::{Connection, Phase, Transport, TransportError};

const MAX_RESPONSE_HEADERS: usize = 64;
const READ_CHUNK: usize = 8 * 1024;

/// Connection factory over `tokio::net::TcpStream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }

    async fn resolve(target: &Target) -> Result<Vec<std::net::SocketAddr>, TransportError> {
        let addrs: Vec<_> = tokio::net::lookup_host((target.host.as_str(), target.port))
            .await
            .map_err(|e| TransportError::DnsFailure {
                host: target.host.clone(),
                source: Some(e),
            })?
            .collect();
        if addrs.is_empty() {
            return Err(TransportError::DnsFailure {
                host: target.host.clone(),
                source: None,
            });
        }
        Ok(addrs)
    }

    fn classify_connect_error(err: std::io::Error, addr: &std::net::SocketAddr) -> TransportError {
        match err.kind() {
            ErrorKind::ConnectionRefused => TransportError::ConnectionRefused {
                addr: addr.to_string(),
            },
            ErrorKind::TimedOut => TransportError::TimedOut {
                phase: Phase::Connect,
                // OS-level connect timeout; the configured limit is unknown here.
                limit: Duration::ZERO,
            },
            _ if err.to_string().contains("unreachable") => TransportError::HostUnreachable {
                addr: addr.to_string(),
            },
            _ => TransportError::Io(err),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(
        &self,
        target: &Target,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn Connection>, TransportError> {
        let addrs = Self::resolve(target).await?;

        let attempt = async {
            let mut last_err = None;
            for addr in &addrs {
                match TcpStream::connect(addr).await {
                    Ok(stream) => return Ok(stream),
                    Err(e) => last_err = Some(Self::classify_connect_error(e, addr)),
                }
            }
            Err(last_err.unwrap_or(TransportError::ConnectionClosed))
        };

        let stream = match timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .map_err(|_| TransportError::TimedOut {
                    phase: Phase::Connect,
                    limit,
                })??,
            None => attempt.await?,
        };

        stream.set_nodelay(true).ok();
        Ok(Box::new(TcpConnection {
            stream: Some(stream),
        }))
    }
}

struct TcpConnection {
    /// `None` once aborted, making abort idempotent.
    stream: Option<TcpStream>,
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(
        &mut self,
        request: &RequestSpec,
        url: &url::Url,
        timeout: Option<Duration>,
    ) -> Result<Response, TransportError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or(TransportError::ConnectionClosed)?;

        let head = encode_head(request, url);
        stream.write_all(&head).await?;
        if let Some(body) = request.body_bytes() {
            stream.write_all(body).await?;
        }
        stream.flush().await?;

        let read = read_response(stream);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| TransportError::TimedOut {
                    phase: Phase::Read,
                    limit,
                })?,
            None => read.await,
        }
    }

    async fn abort(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await.ok();
        }
    }
}

fn encode_head(request: &RequestSpec, url: &url::Url) -> Vec<u8> {
    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }
    let authority = match url.port() {
        Some(port) => format!("{}:{port}", url.host_str().unwrap_or_default()),
        None => url.host_str().unwrap_or_default().to_string(),
    };

    let mut head = format!("{} {} HTTP/1.1\r\nhost: {}\r\n", request.method(), path, authority);
    for (name, value) in request.headers() {
        head.push_str(name.as_str());
        head.push_str(": ");
        head.push_str(&String::from_utf8_lossy(value.as_bytes()));
        head.push_str("\r\n");
    }
    if let Some(body) = request.body_bytes() {
        head.push_str(&format!("content-length: {}\r\n", body.len()));
    }
    head.push_str("connection: close\r\n\r\n");
    head.into_bytes()
}

async fn read_response(stream: &mut TcpStream) -> Result<Response, TransportError> {
    let mut buf = BytesMut::with_capacity(READ_CHUNK);

    // Accumulate until the response head parses as complete.
    let (status, headers, head_len) = loop {
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            return Err(TransportError::ConnectionClosed);
        }

        let mut header_slots = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
        let mut parsed = httparse::Response::new(&mut header_slots);
        match parsed.parse(&buf) {
            Ok(httparse::Status::Complete(head_len)) => {
                let status = StatusCode::from_u16(parsed.code.unwrap_or(0))
                    .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
                let mut headers = HeaderMap::with_capacity(parsed.headers.len());
                for h in parsed.headers.iter() {
                    let name = HeaderName::from_bytes(h.name.as_bytes())
                        .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
                    let value = HeaderValue::from_bytes(h.value)
                        .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
                    headers.append(name, value);
                }
                break (status, headers, head_len);
            }
            Ok(httparse::Status::Partial) => continue,
            Err(e) => return Err(TransportError::InvalidResponse(e.to_string())),
        }
    };

    let mut body = BytesMut::from(&buf[head_len..]);
    let content_length = headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    match content_length {
        Some(len) => {
            while body.len() < len {
                let n = stream.read_buf(&mut body).await?;
                if n == 0 {
                    return Err(TransportError::ConnectionClosed);
                }
            }
            body.truncate(len);
        }
        None => {
            // connection: close framing — the body runs to EOF.
            loop {
                let n = stream.read_buf(&mut body).await?;
                if n == 0 {
                    break;
                }
            }
        }
    }

    Ok(Response::new(status, headers, Bytes::from(body)))
}
