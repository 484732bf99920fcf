//! Async TCP front end using Tokio.
//!
//! Accepts TCP connections and answers exactly one HTTP/1.1 request per
//! connection through an [`Application`]. Every response carries
//! `Connection: close` and the socket is shut down after it is written.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::app::Application;
use crate::http::{DecodeError, RawRequest, Response, StatusCode};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid server configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, e.g. `127.0.0.1:8080`.
    pub address: String,
    /// Largest request (head plus body) buffered before answering `413`.
    pub max_request_bytes: usize,
    /// Initial read buffer capacity per connection.
    pub read_buffer_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_owned(),
            max_request_bytes: 8 * 1024 * 1024,
            read_buffer_bytes: 4096,
        }
    }
}

impl ServerConfig {
    /// Load settings from JSON; absent fields keep their defaults.
    ///
    /// ```
    /// use pathwise::server::ServerConfig;
    ///
    /// let config = ServerConfig::from_json(r#"{"address": "0.0.0.0:9000"}"#).unwrap();
    /// assert_eq!(config.address, "0.0.0.0:9000");
    /// assert_eq!(config.read_buffer_bytes, 4096);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, ServerError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The HTTP server.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use pathwise::app::{Application, Methods, Resource};
/// use pathwise::http::{Response, StatusCode};
/// use pathwise::router::RouteTable;
/// use pathwise::server::Server;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let hello: Arc<dyn Resource> = Arc::new(Methods::new().get(|_ctx| async {
///         Ok(Response::new(StatusCode::Ok).body("Hello!"))
///     }));
///     let mut table = RouteTable::new();
///     table.register("/", hello);
///
///     let server = Server::bind("127.0.0.1:8080").await?;
///     server.run(Application::new(table.compile()?)).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: ServerConfig,
}

impl Server {
    /// Binds to `addr` with otherwise default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        Self::with_config(ServerConfig {
            address: addr.as_ref().to_owned(),
            ..ServerConfig::default()
        })
        .await
    }

    /// Binds to `config.address`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn with_config(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.address)
            .await
            .map_err(|e| ServerError::Bind {
                addr: config.address.clone(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            config,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts accepting connections and answering them with `app`.
    ///
    /// Runs until the process is terminated. Accept failures are logged and
    /// skipped; each connection is served on its own task.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the TCP listener itself fails.
    pub async fn run(self, app: Application) -> Result<(), ServerError> {
        let app = Arc::new(app);
        let config = Arc::new(self.config);
        info!(address = %self.local_addr, routes = app.router().len(), "listening");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let app = Arc::clone(&app);
            let config = Arc::clone(&config);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, app, config).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Reads one request from `stream`, answers it, and closes the connection.
///
/// The body is read up to the declared `Content-Length`. If the peer stops
/// sending early the truncated body is passed on as-is, and the parser
/// declines to merge it as form data.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    app: Arc<Application>,
    config: Arc<ServerConfig>,
) -> Result<(), std::io::Error> {
    let mut buf = BytesMut::with_capacity(config.read_buffer_bytes);

    let (raw, body_offset) = loop {
        let bytes_read = stream.read_buf(&mut buf).await?;

        if buf.len() > config.max_request_bytes {
            warn!(peer = %peer_addr, "request too large, sending 413");
            return reply(&mut stream, too_large()).await;
        }

        match RawRequest::decode(&buf) {
            Ok(pair) => break pair,
            Err(DecodeError::Incomplete) if bytes_read > 0 => continue,
            Err(DecodeError::Incomplete) => {
                debug!(peer = %peer_addr, "connection closed before request head completed");
                return Ok(());
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                let response =
                    Response::new(StatusCode::BadRequest).body(format!("Bad Request: {e}"));
                return reply(&mut stream, response).await;
            }
        }
    };

    let declared = raw.content_length().unwrap_or(0);
    let total_needed = body_offset.saturating_add(declared);
    if total_needed > config.max_request_bytes {
        warn!(peer = %peer_addr, declared, "declared body too large, sending 413");
        return reply(&mut stream, too_large()).await;
    }

    while buf.len() < total_needed {
        if stream.read_buf(&mut buf).await? == 0 {
            debug!(peer = %peer_addr, "peer stopped sending before the declared body length");
            break;
        }
    }

    let end = total_needed.min(buf.len());
    let body = buf.split_to(end).split_off(body_offset).freeze();
    let raw = raw.scheme("http").body(body);

    debug!(peer = %peer_addr, method = %raw.method, target = %raw.target, "request received");

    let response = app.handle(raw).await;
    reply(&mut stream, response).await
}

fn too_large() -> Response {
    Response::new(StatusCode::PayloadTooLarge).body("Request entity too large")
}

async fn reply(stream: &mut TcpStream, response: Response) -> Result<(), std::io::Error> {
    stream.write_all(&response.into_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Methods, Resource};
    use crate::context::Context;
    use crate::router::RouteTable;

    async fn spawn_server(config: ServerConfig) -> SocketAddr {
        let echo: Arc<dyn Resource> = Arc::new(
            Methods::new()
                .get(|ctx: Context| async move {
                    let body = format!(
                        "{}:{}",
                        ctx.param("method").unwrap_or_default(),
                        ctx.param("continuation").unwrap_or_default()
                    );
                    Ok(Response::new(StatusCode::Ok).body(body))
                })
                .post(|ctx: Context| async move {
                    let name = ctx.query().argument_or("name", "nobody");
                    Ok(Response::new(StatusCode::Ok).body(name))
                }),
        );
        let mut table = RouteTable::new();
        table.register("/api/{method}/{continuation:\\d+}/", echo);
        let app = Application::new(table.compile().unwrap());

        let server = Server::with_config(ServerConfig {
            address: "127.0.0.1:0".into(),
            ..config
        })
        .await
        .unwrap();
        let addr = server.local_addr();
        tokio::spawn(server.run(app));
        addr
    }

    async fn roundtrip(addr: SocketAddr, request: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request).await.unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn serves_matched_route() {
        let addr = spawn_server(ServerConfig::default()).await;
        let res = roundtrip(addr, b"GET /api/echo/42/ HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(res.starts_with("HTTP/1.1 200 OK\r\n"), "{res}");
        assert!(res.contains("Connection: close\r\n"));
        assert!(res.ends_with("echo:42"));
    }

    #[tokio::test]
    async fn unmatched_route_is_404() {
        let addr = spawn_server(ServerConfig::default()).await;
        let res = roundtrip(addr, b"GET /api/echo/abc/ HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(res.starts_with("HTTP/1.1 404 Not Found\r\n"), "{res}");
    }

    #[tokio::test]
    async fn form_body_is_read_to_content_length() {
        let addr = spawn_server(ServerConfig::default()).await;
        let res = roundtrip(
            addr,
            b"POST /api/form/1/ HTTP/1.1\r\nHost: x\r\n\
              Content-Type: application/x-www-form-urlencoded\r\n\
              Content-Length: 8\r\n\r\nname=ada",
        )
        .await;
        assert!(res.ends_with("\r\n\r\nada"), "{res}");
    }

    #[tokio::test]
    async fn malformed_head_is_400() {
        let addr = spawn_server(ServerConfig::default()).await;
        let res = roundtrip(addr, b"GET / HTTP/1.1\r\nBad Header\r\n\r\n").await;
        assert!(res.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{res}");
    }

    #[tokio::test]
    async fn oversized_declared_body_is_413() {
        let addr = spawn_server(ServerConfig {
            max_request_bytes: 128,
            ..ServerConfig::default()
        })
        .await;
        let res = roundtrip(
            addr,
            b"POST /api/form/1/ HTTP/1.1\r\nContent-Length: 4096\r\n\r\n",
        )
        .await;
        assert!(res.starts_with("HTTP/1.1 413 Payload Too Large\r\n"), "{res}");
    }

    #[test]
    fn config_rejects_bad_json() {
        assert!(matches!(
            ServerConfig::from_json("{\"address\": 5}"),
            Err(ServerError::Config(_))
        ));
    }
}
