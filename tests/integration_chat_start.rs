mod common;

use common::TestApp;
use parentline_server::domain::user::Role;
use uuid::Uuid;

/// Walks the chat-start lifecycle in one test because the
/// no-teachers-available branch depends on global teacher availability.
#[tokio::test]
async fn test_chat_start_lifecycle() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let parent = app.insert_user("Ana Parent", Role::Parent, true).await;
    let busy_teacher = app.insert_user("Busy Teacher", Role::Teacher, false).await;
    let token = app.token_for(parent, Role::Parent);

    // Leftover teachers from other runs would mask the empty-roster branch.
    sqlx::query("UPDATE users SET is_available = FALSE WHERE role = 'teacher'")
        .execute(&app.pool)
        .await
        .unwrap();

    let resp = app.start_chat(&token, busy_teacher, "Is anyone there?").await;
    assert_eq!(resp.status(), 503);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NO_TEACHERS");
    assert_eq!(body["availableTeachers"].as_array().unwrap().len(), 0);

    // With an alternative on the roster the same request surfaces it.
    let open_teacher = app.insert_user("Open Teacher", Role::Teacher, true).await;
    let resp = app.start_chat(&token, busy_teacher, "Is anyone there?").await;
    assert_eq!(resp.status(), 423);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "TEACHER_UNAVAILABLE");
    let alternatives = body["availableTeachers"].as_array().unwrap();
    assert!(alternatives.iter().any(|t| t["id"] == open_teacher.to_string()));
    assert!(body["suggestion"].is_string());

    // Targeting the available teacher succeeds and persists the opener.
    let resp = app.start_chat(&token, open_teacher, "Hello, I'd like to discuss my child").await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Conversation started successfully");
    assert_eq!(body["data"]["content"], "Hello, I'd like to discuss my child");

    let thread: serde_json::Value = app.get_messages(&token, Some(open_teacher)).await.json().await.unwrap();
    assert_eq!(thread["count"], 1);
}

#[tokio::test]
async fn test_chat_start_requires_parent_role() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let teacher = app.insert_user("Cy Teacher", Role::Teacher, false).await;
    let colleague = app.insert_user("Di Teacher", Role::Teacher, false).await;
    let token = app.token_for(teacher, Role::Teacher);

    let resp = app.start_chat(&token, colleague, "Teacher to teacher").await;
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_chat_start_missing_fields() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let parent = app.insert_user("Edo Parent", Role::Parent, true).await;
    let token = app.token_for(parent, Role::Parent);

    let resp = app
        .client
        .post(format!("{}/chat/start", app.server_url))
        .header("Authorization", format!("Bearer {token}"))
        .json(&serde_json::json!({ "recipientId": Uuid::new_v4().to_string() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = app
        .client
        .post(format!("{}/chat/start", app.server_url))
        .header("Authorization", format!("Bearer {token}"))
        .json(&serde_json::json!({ "recipientId": "not-a-uuid", "content": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
