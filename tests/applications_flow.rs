mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_vec, TestApp};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize)]
struct LifeStory {
    category: String,
    lesson: String,
}

#[derive(Deserialize)]
struct ApplicationResponse {
    id: Uuid,
    status: String,
    life_stories: Vec<LifeStory>,
    approved_by: Option<Uuid>,
    interview_date: Option<String>,
}

fn sample_application() -> serde_json::Value {
    json!({
        "applicant_name": "Ruth Calder",
        "email": "ruth@example.com",
        "age": 61,
        "bio": "Retired engineering director.",
        "expertise": "career, leadership",
        "years_experience": 35,
        "life_stories": [{
            "category": "career",
            "title": "The plant that almost closed",
            "story": "We turned the line around in a winter.",
            "lesson": "Listen to the floor before the spreadsheet.",
        }],
        "challenges": ["burnout"],
        "principles": ["show up early"],
    })
}

#[tokio::test]
async fn anyone_submits_only_admins_review() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app
        .post_json("/api/mentor-applications", &sample_application(), None)
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_vec(response.into_body()).await?;
    let submitted: ApplicationResponse = serde_json::from_slice(&body)?;
    assert_eq!(submitted.status, "pending");
    assert_eq!(submitted.life_stories.len(), 1);
    assert_eq!(submitted.life_stories[0].category, "career");
    assert!(submitted.life_stories[0].lesson.contains("spreadsheet"));

    app.insert_user("plain", "plain@example.com", "pw-plain", "user")
        .await?;
    let plain_token = app.login_token("plain@example.com", "pw-plain").await?;
    let response = app.get("/api/mentor-applications", Some(&plain_token)).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.insert_user("admin", "admin@example.com", "pw-admin", "admin")
        .await?;
    let admin_token = app.login_token("admin@example.com", "pw-admin").await?;
    let response = app
        .get("/api/mentor-applications?status=pending", Some(&admin_token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let listed: Vec<ApplicationResponse> = serde_json::from_slice(&body)?;
    assert_eq!(listed.len(), 1);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn review_moves_forward_only() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app
        .post_json("/api/mentor-applications", &sample_application(), None)
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_vec(response.into_body()).await?;
    let submitted: ApplicationResponse = serde_json::from_slice(&body)?;

    let admin = app
        .insert_user("admin", "admin@example.com", "pw-admin", "admin")
        .await?;
    let admin_token = app.login_token("admin@example.com", "pw-admin").await?;
    let review_path = format!("/api/mentor-applications/{}", submitted.id);

    let response = app
        .patch_json(
            &review_path,
            &json!({
                "status": "interview_scheduled",
                "interview_date": "2026-09-01T15:00:00Z",
                "admin_notes": "strong writing",
            }),
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let scheduled: ApplicationResponse = serde_json::from_slice(&body)?;
    assert_eq!(scheduled.status, "interview_scheduled");
    assert!(scheduled.interview_date.is_some());

    let response = app
        .patch_json(&review_path, &json!({ "status": "approved" }), Some(&admin_token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let approved: ApplicationResponse = serde_json::from_slice(&body)?;
    assert_eq!(approved.status, "approved");
    assert_eq!(approved.approved_by, Some(admin));

    // Settled applications stay settled.
    let response = app
        .patch_json(&review_path, &json!({ "status": "rejected" }), Some(&admin_token))
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .patch_json(&review_path, &json!({ "status": "archived" }), Some(&admin_token))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn validates_submissions() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app
        .post_json(
            "/api/mentor-applications",
            &json!({
                "applicant_name": "No Bio",
                "email": "nobio@example.com",
                "bio": "",
                "expertise": "career",
            }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            "/api/mentor-applications",
            &json!({
                "applicant_name": "Bad Email",
                "email": "not-an-email",
                "bio": "bio",
                "expertise": "career",
            }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}
