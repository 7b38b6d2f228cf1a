//! HTTP transport for the dispatch engine.
//!
//! One endpoint: `POST /` takes the `[command, parameter]` body and always
//! answers HTTP 200 with the `{code, info, body?}` envelope; failures ride
//! in `code`, never in the status line. `OPTIONS /` answers CORS preflight.
//! The one deliberate exception is the silent path: a dispatch that ends
//! [`DispatchOutcome::Silent`] parks the connection and never answers.

pub mod error;
pub mod tls;

pub use error::{Result, ServerError};
pub use tls::TlsPaths;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use std::net::SocketAddr;
use std::sync::Arc;
use switchboard_core::context::{AppContext, Exchange};
use switchboard_core::dispatch::{Dispatch, DispatchOutcome};
use switchboard_core::engine::Engine;
use switchboard_core::envelope::ResponseEnvelope;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Request bodies over this are refused at the transport.
pub const BODY_LIMIT: usize = 15 * 1024 * 1024;

const SERVER_HEADER: &str = concat!("switchboard/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
struct ServerState {
    app: Arc<AppContext>,
}

/// Builds the single-endpoint router over a started application.
pub fn router(app: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", post(dispatch_handler).options(preflight_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(ServerState { app })
}

/// Starts the engine if needed and serves it until ctrl-c.
pub async fn serve(mut engine: Engine, addr: SocketAddr, tls: Option<TlsPaths>) -> Result<()> {
    let app = engine.start()?;
    let router = router(app);
    match tls {
        Some(paths) => {
            let config = tls::load_server_config(&paths)?;
            let listener = tls::TlsListener::bind(addr, config).await?;
            info!("listening on https://{}", listener.local_addr()?);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            info!("listening on http://{}", listener.local_addr()?);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        error!("cannot listen for the shutdown signal");
    }
    info!("shutting down");
}

async fn dispatch_handler(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let exchange = Arc::new(exchange_from(&headers));
    match Dispatch::run(Arc::clone(&state.app), Arc::clone(&exchange), &body).await {
        DispatchOutcome::Reply(envelope) => reply(&exchange, &envelope),
        // no reply will ever come; leave the client waiting
        DispatchOutcome::Silent => std::future::pending().await,
    }
}

async fn preflight_handler() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(header::SERVER, HeaderValue::from_static(SERVER_HEADER));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    response
}

fn exchange_from(headers: &HeaderMap) -> Exchange {
    Exchange::new(headers.iter().filter_map(|(name, value)| {
        let value = value.to_str().ok()?;
        Some((name.as_str().to_string(), value.to_string()))
    }))
}

/// Serializes the envelope and applies the transport headers plus whatever
/// the exchange staged during dispatch.
fn reply(exchange: &Exchange, envelope: &ResponseEnvelope) -> Response {
    let body = match serde_json::to_vec(envelope) {
        Ok(body) => body,
        Err(err) => {
            error!("reply serialization failed: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::SERVER, HeaderValue::from_static(SERVER_HEADER));
    for (name, value) in exchange.staged() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            // append, not insert: several cookies may be staged
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!("dropping invalid staged header {name}"),
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::path::PathBuf;
    use std::time::Duration;
    use switchboard_core::registry::Registry;
    use switchboard_core::resource::{Handler, Resource};

    fn demo_state() -> ServerState {
        let mut registry = Registry::new();
        registry
            .register(
                "square",
                Resource::Command(Handler::sync(|_, param| {
                    let n = param.as_i64().unwrap_or(0);
                    Ok(Some(json!(n * n)))
                })),
            )
            .unwrap();
        registry
            .register(
                "greet",
                Resource::Command(Handler::sync(|ctx, _| {
                    ctx.exchange().set_cookie("switchboard-session", "Julien");
                    Ok(Some(json!(true)))
                })),
            )
            .unwrap();
        registry
            .register(
                "park",
                Resource::Command(Handler::async_fn(|_, _| {
                    Box::pin(async { Err("dropped".into()) })
                })),
            )
            .unwrap();
        ServerState {
            app: Arc::new(registry.seal(PathBuf::from("."))),
        }
    }

    async fn send(body: &'static [u8]) -> Response {
        dispatch_handler(State(demo_state()), HeaderMap::new(), Bytes::from_static(body)).await
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn spawn_router() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = demo_state().app;
        tokio::spawn(async move {
            axum::serve(listener, router(app)).await.unwrap();
        });
        addr
    }

    /// Raw HTTP/1.1 POST over a plain socket, returning the whole reply.
    fn raw_post(addr: SocketAddr, body: &[u8]) -> String {
        use std::io::{Read, Write};
        let mut stream = std::net::TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
            .set_write_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        write!(
            stream,
            "POST / HTTP/1.1\r\nhost: {addr}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        )
        .unwrap();
        // the server may answer and close before the whole body is written
        let _ = stream.write_all(body);
        let mut reply = Vec::new();
        let _ = stream.read_to_end(&mut reply);
        String::from_utf8_lossy(&reply).into_owned()
    }

    #[tokio::test]
    async fn test_reply_carries_envelope_and_transport_headers() {
        let response = send(br#"["square", 3]"#).await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert!(
            headers[header::SERVER]
                .to_str()
                .unwrap()
                .starts_with("switchboard/")
        );
        // default session staging came through the exchange
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");

        assert_eq!(
            body_json(response).await,
            json!({"code": "success", "info": "square executed", "body": 9})
        );
    }

    #[tokio::test]
    async fn test_dispatch_failures_still_answer_200() {
        let response = send(br#"["nope"]"#).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"code": "error", "info": "Command nope is not defined"})
        );
    }

    #[tokio::test]
    async fn test_staged_cookie_reaches_the_response() {
        let response = send(br#"["greet"]"#).await;
        assert_eq!(
            response.headers()[header::SET_COOKIE],
            "switchboard-session=Julien"
        );
    }

    #[tokio::test]
    async fn test_request_headers_reach_the_exchange() {
        let mut registry = Registry::new();
        registry
            .register(
                "echo_agent",
                Resource::Command(Handler::sync(|ctx, _| {
                    Ok(Some(json!(ctx.exchange().header("user-agent"))))
                })),
            )
            .unwrap();
        let state = ServerState {
            app: Arc::new(registry.seal(PathBuf::from("."))),
        };
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("demo/1.0"));

        let response = dispatch_handler(
            State(state),
            headers,
            Bytes::from_static(br#"["echo_agent"]"#),
        )
        .await;
        assert_eq!(body_json(response).await["body"], json!("demo/1.0"));
    }

    #[tokio::test]
    async fn test_silent_outcome_never_replies() {
        let parked = dispatch_handler(
            State(demo_state()),
            HeaderMap::new(),
            Bytes::from_static(br#"["park"]"#),
        );
        let outcome = tokio::time::timeout(Duration::from_millis(50), parked).await;
        assert!(outcome.is_err(), "silent dispatch must not answer");
    }

    #[tokio::test]
    async fn test_preflight_allows_cross_origin_posts() {
        let response = preflight_handler().await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
    }

    #[tokio::test]
    async fn test_router_serves_dispatch_over_tcp() {
        let addr = spawn_router().await;
        let reply = tokio::task::spawn_blocking(move || raw_post(addr, br#"["square", 3]"#))
            .await
            .unwrap();

        assert!(reply.starts_with("HTTP/1.1 200 OK"), "got {reply}");
        assert!(reply.contains(r#"{"code":"success","info":"square executed","body":9}"#));
    }

    #[tokio::test]
    async fn test_router_rejects_oversized_bodies() {
        let addr = spawn_router().await;
        let reply = tokio::task::spawn_blocking(move || {
            let body = vec![b'0'; BODY_LIMIT + 1];
            raw_post(addr, &body)
        })
        .await
        .unwrap();

        assert!(reply.starts_with("HTTP/1.1 413"), "got {reply}");
    }
}
