//! Live WebSocket channel to the backend.
//!
//! One connection per conversation mount, authenticated with the bearer
//! token on the connect request. There is no reconnect policy: when the
//! connection drops, the poll loop remains the only delivery path.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::wire::{ClientEvent, ServerEvent};

/// Connect the live channel and split it into an outbound event sender
/// and an inbound event receiver.
///
/// Two background tasks shuttle frames: the writer drains the outbound
/// queue into the socket, the reader decodes inbound frames into the
/// receiver. Both wind down when their channel side closes or the socket
/// drops, so dropping the returned halves is the teardown.
pub async fn open(
    config: &ClientConfig,
    token: &str,
) -> Result<(mpsc::Sender<ClientEvent>, mpsc::Receiver<ServerEvent>), ClientError> {
    let url = config.websocket_url();
    debug!(url = %url, "connecting live channel");

    let mut request = url.into_client_request()?;
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| ClientError::Connection("bearer token is not a valid header value".to_string()))?;
    request.headers_mut().insert(AUTHORIZATION, bearer);

    let (stream, _) = connect_async(request).await?;
    let (mut sink, mut source) = stream.split();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientEvent>(config.outbound_buffer_size);
    let (inbound_tx, inbound_rx) = mpsc::channel::<ServerEvent>(config.inbound_buffer_size);

    tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "failed to encode outbound event");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(text)).await.is_err() {
                warn!("live channel send failed, poll loop remains the delivery path");
                break;
            }
        }
        let _ = sink.close().await;
        debug!("live channel writer finished");
    });

    tokio::spawn(async move {
        while let Some(frame) = source.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(event) => {
                        if inbound_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "ignoring undecodable frame"),
                },
                Ok(WsMessage::Ping(_) | WsMessage::Pong(_)) => {}
                Ok(WsMessage::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
        debug!("live channel reader finished");
    });

    Ok((outbound_tx, inbound_rx))
}
