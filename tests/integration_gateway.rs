mod common;

use common::TestApp;
use futures::StreamExt;
use parentline_server::domain::user::Role;
use std::time::Duration;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

#[tokio::test]
async fn test_gateway_pushes_new_message_to_recipient() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let parent = app.insert_user("Fay Parent", Role::Parent, true).await;
    let teacher = app.insert_user("Gil Teacher", Role::Teacher, true).await;
    let parent_token = app.token_for(parent, Role::Parent);
    let teacher_token = app.token_for(teacher, Role::Teacher);

    let url = format!("{}?token={}", app.ws_url, teacher_token);
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.expect("WebSocket handshake failed");
    // Give the session a moment to register its channel.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let resp = app.send_message(&parent_token, teacher, "Live push", None).await;
    assert_eq!(resp.status(), 201);

    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("Timed out waiting for push")
        .expect("Stream ended")
        .expect("WebSocket error");

    let text = frame.into_text().expect("Expected a text frame");
    let body: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(body["event"], "newMessage");
    assert_eq!(body["data"]["content"], "Live push");
    assert_eq!(body["data"]["sender"]["id"], parent.to_string());
}

#[tokio::test]
async fn test_gateway_does_not_echo_to_sender() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let parent = app.insert_user("Hal Parent", Role::Parent, true).await;
    let teacher = app.insert_user("Ida Teacher", Role::Teacher, true).await;
    let parent_token = app.token_for(parent, Role::Parent);

    let url = format!("{}?token={}", app.ws_url, parent_token);
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.expect("WebSocket handshake failed");
    tokio::time::sleep(Duration::from_millis(100)).await;

    app.send_message(&parent_token, teacher, "Outgoing only", None).await;

    // Events target the recipient; the sender's own session stays quiet.
    let result = tokio::time::timeout(Duration::from_millis(500), socket.next()).await;
    assert!(result.is_err(), "Sender should not receive their own message");
}

#[tokio::test]
async fn test_gateway_rejects_invalid_token() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let res = tokio_tungstenite::connect_async(format!("{}?token=invalid", app.ws_url)).await;
    assert!(res.is_err());
}

#[tokio::test]
async fn test_gateway_rejects_missing_token() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let res = tokio_tungstenite::connect_async(app.ws_url.clone()).await;
    assert!(res.is_err());
}

#[tokio::test]
async fn test_gateway_ignores_inbound_frames() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let parent = app.insert_user("Jon Parent", Role::Parent, true).await;
    let teacher = app.insert_user("Kim Teacher", Role::Teacher, true).await;
    let parent_token = app.token_for(parent, Role::Parent);
    let teacher_token = app.token_for(teacher, Role::Teacher);

    let url = format!("{}?token={}", app.ws_url, teacher_token);
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.expect("WebSocket handshake failed");
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The gateway is push-only; a client frame must not disturb the session.
    use futures::SinkExt;
    socket.send(WsMessage::Text("{\"event\":\"bogus\"}".into())).await.unwrap();

    let resp = app.send_message(&parent_token, teacher, "Still alive", None).await;
    assert_eq!(resp.status(), 201);

    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("Timed out waiting for push")
        .expect("Stream ended")
        .expect("WebSocket error");
    let body: serde_json::Value = serde_json::from_str(frame.into_text().unwrap().as_str()).unwrap();
    assert_eq!(body["data"]["content"], "Still alive");
}
