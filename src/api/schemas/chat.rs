use crate::api::schemas::messaging::MessagePayload;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationRequest {
    pub recipient_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartConversationResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: MessagePayload,
}

/// Frame pushed over the WebSocket gateway on every successful send.
#[derive(Debug, Serialize)]
pub struct GatewayFrame {
    pub event: &'static str,
    pub data: MessagePayload,
}

impl GatewayFrame {
    #[must_use]
    pub const fn new_message(data: MessagePayload) -> Self {
        Self { event: "newMessage", data }
    }
}
