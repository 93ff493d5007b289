//! Local HTTP surface: the read-only active-rooms endpoint.
//!
//! ## Routes
//! | Method | Path                | Response                                        |
//! |--------|---------------------|-------------------------------------------------|
//! | GET    | `/api/rooms/active` | 200 `{"rooms":[...]}` or 500 `{"rooms":[],"error":...}` |
//! | GET    | `/healthz`          | 200 `ok`                                        |
//! | *      | anything else       | 404, or 405 for a non-GET on a known path       |
//!
//! Registry credentials never leave this process and upstream error detail
//! is logged, not returned.

use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::registry::{RoomRegistry, RoomSummary};

pub const ACTIVE_ROOMS_PATH: &str = "/api/rooms/active";
pub const HEALTH_PATH: &str = "/healthz";

/// Error text returned to callers when the registry cannot be reached.
pub const FETCH_FAILED_BODY_MESSAGE: &str = "Failed to fetch rooms";

const MAX_REQUEST_BYTES: usize = 8192;
const MAX_HEADERS: usize = 32;

#[derive(Debug, Serialize)]
struct RoomsPayload<'a> {
    rooms: &'a [RoomSummary],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

/// A response ready to be written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "application/json",
            body,
        }
    }

    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.to_string(),
        }
    }

    fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n{}",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len(),
            self.body,
        )
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "",
    }
}

/// Build the active-rooms response. Both registry failures map to the same
/// 500 payload; the detail only goes to the log.
pub async fn active_rooms_response<R: RoomRegistry>(registry: &R) -> Response {
    match registry.list_active_rooms().await {
        Ok(rooms) => {
            debug!(rooms = rooms.len(), "serving active rooms");
            let payload = RoomsPayload { rooms: &rooms, error: None };
            match serde_json::to_string(&payload) {
                Ok(body) => Response::json(200, body),
                Err(e) => {
                    error!(error = %e, "failed to serialize rooms");
                    failure_response()
                }
            }
        }
        Err(e) => {
            error!(error = %e, "error fetching active rooms");
            failure_response()
        }
    }
}

fn failure_response() -> Response {
    let payload = RoomsPayload {
        rooms: &[],
        error: Some(FETCH_FAILED_BODY_MESSAGE),
    };
    let body = serde_json::to_string(&payload)
        .unwrap_or_else(|_| r#"{"rooms":[],"error":"Failed to fetch rooms"}"#.to_string());
    Response::json(500, body)
}

/// Route one parsed request.
pub async fn route<R: RoomRegistry>(method: &str, target: &str, registry: &R) -> Response {
    let path = target.split(['?', '#']).next().unwrap_or("/");
    match (method, path) {
        ("GET", ACTIVE_ROOMS_PATH) => active_rooms_response(registry).await,
        ("GET", HEALTH_PATH) => Response::text(200, "ok"),
        (_, ACTIVE_ROOMS_PATH) | (_, HEALTH_PATH) => Response::text(405, "Method Not Allowed"),
        _ => Response::text(404, "Not Found"),
    }
}

/// Bind `addr` and serve until the listener fails.
pub async fn serve<R: RoomRegistry>(addr: &str, registry: R) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "room directory endpoint listening");
    serve_listener(listener, Arc::new(registry)).await
}

/// Accept loop over an already-bound listener.
pub async fn serve_listener<R: RoomRegistry>(
    listener: TcpListener,
    registry: Arc<R>,
) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, registry).await {
                warn!(peer = %peer, error = %e, "connection error");
            }
        });
    }
}

async fn handle_connection<R: RoomRegistry>(
    mut stream: TcpStream,
    registry: Arc<R>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut buf = vec![0u8; MAX_REQUEST_BYTES];
    let mut filled = 0;

    let (method, target) = loop {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Ok(());
        }
        filled += n;

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        match req.parse(&buf[..filled]) {
            Ok(httparse::Status::Complete(_)) => {
                let method = req.method.unwrap_or("GET").to_string();
                let target = req.path.unwrap_or("/").to_string();
                break (method, target);
            }
            Ok(httparse::Status::Partial) if filled < buf.len() => continue,
            _ => {
                let resp = Response::text(400, "Bad Request");
                stream.write_all(resp.to_http().as_bytes()).await?;
                return Ok(());
            }
        }
    };

    debug!(method = %method, target = %target, "request");
    let resp = route(&method, &target, registry.as_ref()).await;
    stream.write_all(resp.to_http().as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
