//! HTTP plumbing for the shared listener.
//!
//! Requests are parsed and answered by hyper.  This module builds the few
//! responses the bridge sends and turns an accepted upgrade into a
//! `tokio-tungstenite` stream.  A request the bridge refuses is answered
//! with [`RejectedRequest`]: hyper then closes the connection without
//! writing a response, which is how Ekos sees an unknown upgrade path.

use std::time::Duration;

use anyhow::Context;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{self, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use hyper::upgrade::Upgraded;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream;

use ekos_bridge_core::Channel;

/// Largest request head hyper buffers before answering 431.
pub const MAX_HEAD_LEN: usize = 8 * 1024;

/// How long a client may take to send its complete request head.
pub const HEAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest request body drained before answering a plain request.
const MAX_DISCARDED_BODY: usize = 64 * 1024;

pub type HttpResponse = Response<Full<Bytes>>;

/// The WebSocket stream of an upgraded connection.
pub type UpgradedSocket = WebSocketStream<TokioIo<Upgraded>>;

/// Reasons the bridge drops a connection without answering.
#[derive(Debug, Error)]
pub enum RejectedRequest {
    #[error("no channel at {0}")]
    UnknownPath(String),
    #[error("{0} listener is closed")]
    ChannelClosed(Channel),
    #[error("upgrade request without Sec-WebSocket-Key")]
    MissingKey,
    #[error("invalid handshake header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
}

/// `true` for a GET carrying `Upgrade: websocket`.
pub fn is_websocket_upgrade<B>(req: &Request<B>) -> bool {
    req.method() == Method::GET && has_token(req.headers(), header::UPGRADE, "websocket")
}

/// The request target with its query string, as Ekos sent it.
pub fn request_target<B>(req: &Request<B>) -> &str {
    req.uri().path_and_query().map_or("/", |pq| pq.as_str())
}

fn has_token(headers: &HeaderMap, name: HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|t| t.trim().eq_ignore_ascii_case(token))
}

/// A complete response that also ends the connection.
pub fn plain_response(status: StatusCode, content_type: Option<&'static str>, body: String) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    if let Some(content_type) = content_type {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

/// The `101 Switching Protocols` answer to a WebSocket handshake.
///
/// # Errors
///
/// Returns [`RejectedRequest::MissingKey`] if the request carries no
/// `Sec-WebSocket-Key`.
pub fn switching_protocols<B>(req: &Request<B>) -> Result<HttpResponse, RejectedRequest> {
    let key = req
        .headers()
        .get(header::SEC_WEBSOCKET_KEY)
        .ok_or(RejectedRequest::MissingKey)?;
    let accept = HeaderValue::from_str(&derive_accept_key(key.as_bytes()))?;

    let mut response = Response::new(Full::default());
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    let headers = response.headers_mut();
    headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
    headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
    headers.insert(header::SEC_WEBSOCKET_ACCEPT, accept);
    Ok(response)
}

/// Waits for hyper to hand over an upgraded connection and wraps it as a
/// server-side WebSocket.
///
/// # Errors
///
/// Returns an error if the connection closed before the upgrade completed.
pub async fn accept_websocket(req: Request<Incoming>) -> anyhow::Result<UpgradedSocket> {
    let upgraded = hyper::upgrade::on(req)
        .await
        .context("connection upgrade failed")?;
    Ok(WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Server, None).await)
}

/// Reads and drops a bounded request body so the answer is not reset.
pub async fn discard_body(body: Incoming) {
    // A short or oversized body is the client's problem; answer anyway.
    let _ = Limited::new(body, MAX_DISCARDED_BODY).collect().await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
