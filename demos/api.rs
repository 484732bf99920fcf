//! A tiny repository browser front end.
//!
//! ```text
//! cargo run --example api -- /path/to/repository
//! curl http://127.0.0.1:8080/
//! curl http://127.0.0.1:8080/api/status/17/
//! ```
//!
//! Set `RUST_LOG=pathwise=debug` to see route compilation and dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use pathwise::context::Context;
use pathwise::{Application, HttpError, Methods, Resource, Response, RouteTable, Server, StatusCode};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const FRONTPAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8"/>
<title>Repository browser</title>
</head>
<body>
<h1>Repository browser</h1>
<pre id="out"></pre>
<script>
var callbacks = {
  pending: {},
  run: function (id, payload) {
    var cb = this.pending[id];
    delete this.pending[id];
    return cb && cb(payload);
  }
};
function rpc(method, cb) {
  var id = Math.floor(Math.random() * 1000001);
  callbacks.pending[id] = cb;
  fetch("/api/" + method + "/" + id + "/").then(function (r) { return r.text(); }).then(eval);
}
rpc("status", function (payload) {
  document.getElementById("out").textContent = JSON.stringify(payload, null, 2);
});
</script>
</body>
</html>
"#;

/// Repository the demo was started against.
struct Repository(PathBuf);

fn frontpage() -> Methods {
    Methods::new().get(|_ctx| async {
        Ok(Response::new(StatusCode::Ok)
            .header("Content-Type", "text/html; charset=utf-8")
            .body(FRONTPAGE))
    })
}

fn api() -> Methods {
    Methods::new().get(|ctx: Context| async move {
        let method = ctx.param("method").unwrap_or_default();
        let continuation = ctx.param("continuation").unwrap_or_default();
        let repository = ctx
            .state::<Repository>()
            .map(|repo| repo.0.display().to_string());

        let payload = json!({
            "method": method,
            "repository": repository,
            "verbose": ctx.query().argument_or("verbose", "0") == "1",
        });
        let payload = serde_json::to_string(&payload)
            .map_err(|e| HttpError::with_message(StatusCode::InternalServerError, e.to_string()))?;

        Ok(Response::new(StatusCode::Ok)
            .header("Content-Type", "application/javascript")
            .body(format!("callbacks.run({continuation}, {payload})")))
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pathwise=info")),
        )
        .init();

    let repository = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("usage: api <repository>")?;

    let frontpage: Arc<dyn Resource> = Arc::new(frontpage());
    let api: Arc<dyn Resource> = Arc::new(api());

    let mut routes = RouteTable::new();
    routes
        .register("/", frontpage)
        .register("/api/{method}/{continuation:\\d+}/", api);

    let app = Application::new(routes.compile()?).state(Repository(repository));

    let server = Server::bind("127.0.0.1:8080").await?;
    println!("Listening on http://{}", server.local_addr());
    server.run(app).await?;
    Ok(())
}
