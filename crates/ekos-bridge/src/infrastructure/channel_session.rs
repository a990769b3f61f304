//! One WebSocket connection on one channel.
//!
//! A session takes over an upgraded connection, registers itself with the
//! dispatcher and then runs a single select loop that
//!
//! - forwards every text or binary frame from Ekos as a [`BridgeEvent::Frame`],
//! - writes every [`Outbound`] instruction from the dispatcher to the socket,
//! - closes the socket when its channel listener is closed.
//!
//! Whatever ends the loop, the session reports [`BridgeEvent::Disconnected`]
//! exactly once.

use std::borrow::Cow;
use std::net::SocketAddr;

use anyhow::Context;
use ekos_bridge_core::Channel;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::{
    outbound_queue, BridgeEvent, ConnectionId, EventSender, InboundFrame, Outbound,
};

/// Runs a session until either side closes it.
///
/// # Errors
///
/// Returns an error if the dispatcher is gone or the socket fails while
/// writing.
pub async fn run_channel_session<S>(
    ws_stream: WebSocketStream<S>,
    peer_addr: SocketAddr,
    channel: Channel,
    events: EventSender,
    closed: CancellationToken,
) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = ConnectionId::new();
    let (outbound_tx, mut outbound_rx) = outbound_queue();
    events
        .send(BridgeEvent::Connected {
            channel,
            id,
            outbound: outbound_tx,
        })
        .context("dispatcher stopped before the session started")?;
    info!("{channel} connection {id} established from {peer_addr}");

    let (mut ws_sink, mut ws_source) = ws_stream.split();

    let result: anyhow::Result<()> = async {
        loop {
            tokio::select! {
                _ = closed.cancelled() => {
                    debug!("{channel} connection {id}: listener closed");
                    ws_sink
                        .send(close_message(CloseCode::Away, "bridge shutting down"))
                        .await
                        .context("failed to send close frame")?;
                    break;
                }

                outbound = outbound_rx.recv() => match outbound {
                    Some(Outbound::Text(text)) => {
                        ws_sink
                            .send(WsMessage::Text(text))
                            .await
                            .with_context(|| format!("{channel} connection {id}: send failed"))?;
                    }
                    Some(Outbound::Close { reason }) => {
                        ws_sink
                            .send(close_message(CloseCode::Invalid, &reason))
                            .await
                            .context("failed to send close frame")?;
                        break;
                    }
                    None => {
                        debug!("{channel} connection {id}: dispatcher gone");
                        break;
                    }
                },

                incoming = ws_source.next() => match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        forward(&events, channel, id, InboundFrame::Text(text));
                    }
                    Some(Ok(WsMessage::Binary(bytes))) => {
                        forward(&events, channel, id, InboundFrame::Binary(bytes));
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        debug!("{channel} connection {id}: close frame {frame:?}");
                        break;
                    }
                    Some(Ok(other)) => {
                        // Ping/Pong are answered by tungstenite itself.
                        debug!("{channel} connection {id}: ignoring {other:?}");
                    }
                    Some(Err(e)) => {
                        warn!("{channel} connection {id}: read error: {e}");
                        break;
                    }
                    None => break,
                },
            }
        }
        Ok(())
    }
    .await;

    // The dispatcher may already be gone during shutdown.
    let _ = events.send(BridgeEvent::Disconnected { channel, id });
    info!("{channel} connection {id} from {peer_addr} closed");
    result
}

fn forward(events: &EventSender, channel: Channel, id: ConnectionId, frame: InboundFrame) {
    if events
        .send(BridgeEvent::Frame { channel, id, frame })
        .is_err()
    {
        debug!("{channel} connection {id}: dispatcher gone; frame dropped");
    }
}

fn close_message(code: CloseCode, reason: &str) -> WsMessage {
    WsMessage::Close(Some(CloseFrame {
        code,
        reason: Cow::Owned(reason.to_string()),
    }))
}
