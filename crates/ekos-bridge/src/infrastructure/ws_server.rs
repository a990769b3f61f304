//! HTTP/WebSocket accept loop for the single bridge port.
//!
//! Every accepted TCP connection gets its own task, which serves it through
//! hyper's HTTP/1 connection.  The request handler asks the router what to
//! do and then answers a plain request, accepts an upgrade for a channel
//! session, or rejects the request so hyper drops the connection unanswered.

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::application::router::request_path;
use crate::application::{route_request, AuthenticateResponse, ChannelListeners, EventSender, Route};
use crate::infrastructure::channel_session::run_channel_session;
use crate::infrastructure::http::{
    accept_websocket, discard_body, is_websocket_upgrade, plain_response, request_target,
    switching_protocols, HttpResponse, RejectedRequest, HEAD_TIMEOUT, MAX_HEAD_LEN,
};

/// Everything a connection task needs from the running bridge.
pub struct AcceptContext {
    pub events: EventSender,
    pub listeners: ChannelListeners,
    /// Channel sessions are spawned here so shutdown can wait for them.
    pub tracker: TaskTracker,
}

/// Accepts connections until `stop` is cancelled.
///
/// Connection tasks are spawned on the context's tracker.
pub async fn run_accept_loop(listener: TcpListener, ctx: Arc<AcceptContext>, stop: CancellationToken) {
    loop {
        tokio::select! {
            _ = stop.cancelled() => {
                info!("accept loop stopped");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    debug!("accepted connection from {peer_addr}");
                    let ctx = Arc::clone(&ctx);
                    ctx.tracker.clone().spawn(serve_connection(stream, peer_addr, ctx));
                }
                Err(e) => {
                    // Transient (e.g. too many open files); keep accepting.
                    error!("accept error: {e}");
                }
            },
        }
    }
}

async fn serve_connection(stream: TcpStream, peer_addr: SocketAddr, ctx: Arc<AcceptContext>) {
    let service = service_fn(move |req| handle_request(req, peer_addr, Arc::clone(&ctx)));

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(HEAD_TIMEOUT)
        .max_buf_size(MAX_HEAD_LEN)
        .title_case_headers(true);

    if let Err(e) = builder
        .serve_connection(TokioIo::new(stream), service)
        .with_upgrades()
        .await
    {
        debug!("connection {peer_addr} ended: {e}");
    }
}

async fn handle_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    ctx: Arc<AcceptContext>,
) -> Result<HttpResponse, RejectedRequest> {
    let is_upgrade = is_websocket_upgrade(&req);
    let target = request_target(&req).to_string();
    if is_upgrade {
        info!("upgrade started {target} from {peer_addr}");
    } else {
        info!("request started {} {target} from {peer_addr}", req.method());
    }

    match route_request(&target, is_upgrade) {
        Route::Authenticate => {
            discard_body(req.into_body()).await;
            let body = AuthenticateResponse::granted().to_json();
            Ok(plain_response(StatusCode::OK, Some("application/json"), body))
        }
        Route::NotFound => {
            discard_body(req.into_body()).await;
            Ok(plain_response(StatusCode::NOT_FOUND, None, String::new()))
        }
        Route::Channel(channel) if ctx.listeners.is_closed(channel) => {
            debug!("{channel} listener closed; destroying {peer_addr}");
            Err(RejectedRequest::ChannelClosed(channel))
        }
        Route::Channel(channel) => {
            let response = switching_protocols(&req)?;
            let events = ctx.events.clone();
            let closed = ctx.listeners.token(channel);
            ctx.tracker.spawn(async move {
                let result = match accept_websocket(req).await {
                    Ok(ws_stream) => {
                        run_channel_session(ws_stream, peer_addr, channel, events, closed).await
                    }
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    warn!("{channel} connection from {peer_addr}: {e:#}");
                }
            });
            Ok(response)
        }
        Route::Reject => {
            let path = request_path(&target).to_string();
            warn!("no channel at {path}; destroying connection from {peer_addr}");
            Err(RejectedRequest::UnknownPath(path))
        }
    }
}
