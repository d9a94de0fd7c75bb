mod common;

use common::TestApp;
use parentline_server::domain::user::Role;
use uuid::Uuid;

#[tokio::test]
async fn test_endpoints_require_authentication() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let resp = app.client.get(format!("{}/messages", app.server_url)).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .post(format!("{}/messages", app.server_url))
        .json(&serde_json::json!({ "receiverId": Uuid::new_v4().to_string(), "content": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app.client.get(format!("{}/messages/conversations", app.server_url)).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .get(format!("{}/messages", app.server_url))
        .header("Authorization", "Bearer not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_parent_cannot_message_about_another_parents_child() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let parent = app.insert_user("Sam Parent", Role::Parent, true).await;
    let other_parent = app.insert_user("Tess Parent", Role::Parent, true).await;
    let teacher = app.insert_user("Uma Teacher", Role::Teacher, true).await;
    let student = app.insert_student("Vic Student", other_parent, teacher).await;

    let token = app.token_for(parent, Role::Parent);
    let resp = app.send_message(&token, teacher, "About someone else's child", Some(student)).await;
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "You can only message about your own children");
}

#[tokio::test]
async fn test_teacher_cannot_message_about_unassigned_student() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let parent = app.insert_user("Wes Parent", Role::Parent, true).await;
    let teacher = app.insert_user("Xena Teacher", Role::Teacher, true).await;
    let other_teacher = app.insert_user("Yael Teacher", Role::Teacher, true).await;
    let student = app.insert_student("Zoe Student", parent, teacher).await;

    let token = app.token_for(other_teacher, Role::Teacher);
    let resp = app.send_message(&token, parent, "About a student I don't teach", Some(student)).await;
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "You can only message about your own students");
}

#[tokio::test]
async fn test_scoped_thread_requires_relationship_to_student() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let parent = app.insert_user("Amy Parent", Role::Parent, true).await;
    let other_parent = app.insert_user("Ben Parent", Role::Parent, true).await;
    let teacher = app.insert_user("Cal Teacher", Role::Teacher, true).await;
    let student = app.insert_student("Dee Student", parent, teacher).await;

    let token = app.token_for(other_parent, Role::Parent);
    let resp = app.get_messages(&token, Some(student)).await;
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Unauthorized access");
}

#[tokio::test]
async fn test_unknown_scope_id_is_not_found() {
    let Some(app) = TestApp::try_spawn().await else { return };

    let parent = app.insert_user("Eli Parent", Role::Parent, true).await;
    let token = app.token_for(parent, Role::Parent);

    let resp = app.get_messages(&token, Some(Uuid::new_v4())).await;
    assert_eq!(resp.status(), 404);
}
