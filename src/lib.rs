//! # pathwise
//!
//! Path-template routing and request parsing on top of a small async
//! HTTP/1.1 server.
//!
//! Routes are written as templates such as `/api/{method}/{continuation:\d+}/`,
//! compiled once into anchored regular expressions, and tried in registration
//! order. Each incoming request is parsed into canonical headers, a matrix-aware
//! path, and a multi-valued argument table (query string plus form body), then
//! handed to the per-verb handler of the first matching resource.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pathwise::{Application, Methods, Resource, Response, RouteTable, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let greet: Arc<dyn Resource> = Arc::new(Methods::new().get(|ctx| async move {
//!         let name = ctx.param("name").unwrap_or("world").to_owned();
//!         Ok(Response::new(StatusCode::Ok).body(format!("Hello, {name}!")))
//!     }));
//!
//!     let mut routes = RouteTable::new();
//!     routes.register("/hello/{name:[a-z]+}", greet);
//!
//!     let server = Server::bind("127.0.0.1:8080").await?;
//!     server.run(Application::new(routes.compile()?)).await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod context;
pub mod http;
pub mod router;
pub mod server;

pub use app::{Application, ErrorReporter, HttpError, Methods, Resource};
pub use context::Context;
pub use http::{Headers, Method, ParsedRequest, RawRequest, RequestParser, Response, StatusCode};
pub use router::{RouteTable, RouteTemplate, Router, TemplateError};
pub use server::{Server, ServerConfig, ServerError};
