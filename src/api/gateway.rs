use crate::api::AppState;
use crate::api::middleware::verify_token;
use crate::api::schemas::chat::GatewayFrame;
use crate::api::schemas::messaging::MessagePayload;
use crate::domain::user::Principal;
use crate::services::fanout::ChatEvent;
use axum::{
    extract::{
        Query, State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    http::Extensions,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use opentelemetry::global;
use serde::Deserialize;
use tokio::sync::broadcast;
use tower_http::request_id::RequestId;
use tracing::{Instrument, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: String,
}

/// Upgrades a client into its realtime room. The room is keyed by the
/// caller's own principal id, taken from the verified token rather than any
/// client-supplied value.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    extensions: Extensions,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let request_id = extensions
        .get::<RequestId>()
        .map(|id| id.header_value().to_str().unwrap_or_default().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match verify_token(&params.token, &state.config.auth.jwt_secret) {
        Ok(claims) => {
            let principal = claims.principal();
            ws.on_upgrade(move |socket| handle_socket(socket, state, principal, request_id))
        }
        Err(e) => {
            tracing::warn!(error = %e, "WebSocket handshake failed: invalid token");
            axum::http::StatusCode::UNAUTHORIZED.into_response()
        }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, principal: Principal, request_id: String) {
    let span = tracing::info_span!(
        "websocket_session",
        request_id = %request_id,
        user_id = %principal.id,
        otel.kind = "server",
        ws.session_id = %Uuid::new_v4()
    );

    async move {
        let meter = global::meter("parentline-server");
        let active_connections = meter
            .i64_up_down_counter("websocket_active_connections")
            .with_description("Number of active WebSocket connections")
            .build();
        active_connections.add(1, &[]);

        tracing::info!("WebSocket connected");
        let mut rx = state.fanout.subscribe(principal.id).await;

        let (mut ws_sink, mut ws_stream) = socket.split();
        let mut shutdown_rx = state.shutdown_rx.clone();

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        let _ = ws_sink
                            .send(WsMessage::Close(Some(axum::extract::ws::CloseFrame {
                                code: axum::extract::ws::close_code::AWAY,
                                reason: "Server shutting down".into(),
                            })))
                            .await;
                        break;
                    }
                }

                msg = ws_stream.next() => {
                    match msg {
                        Some(Ok(WsMessage::Close(_))) => break,
                        Some(Ok(_)) => {
                            // The gateway is push-only; inbound frames are ignored.
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            break;
                        }
                        None => break,
                    }
                }

                result = rx.recv() => {
                    match result {
                        Ok(ChatEvent::NewMessage(enriched)) => {
                            let frame = GatewayFrame::new_message(MessagePayload::from((*enriched).clone()));
                            match serde_json::to_string(&frame) {
                                Ok(text) => {
                                    if ws_sink.send(WsMessage::Text(text.into())).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => {
                                    tracing::error!(error = %e, "Failed to encode gateway frame");
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            // Dropped pushes are acceptable; the HTTP surface is
                            // the source of truth.
                            warn!(missed, "Realtime channel lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }

        let _ = ws_sink.close().await;
        active_connections.add(-1, &[]);
        tracing::info!("WebSocket disconnected");
    }
    .instrument(span)
    .await;
}
