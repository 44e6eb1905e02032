mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, NaiveDateTime, Utc};
use common::{acquire_db_lock, at, body_to_vec, future_day, iso, TestApp};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize)]
struct CouncilResponse {
    id: Uuid,
    scheduled_date: String,
    current_mentees: i32,
    final_time_confirmed: bool,
    coordination_status: String,
}

#[derive(Deserialize)]
struct CouncilMentorRow {
    human_mentor_id: Uuid,
    confirmed: bool,
    availability_response: String,
}

#[derive(Deserialize)]
struct CouncilDetail {
    session: CouncilResponse,
    mentors: Vec<CouncilMentorRow>,
}

struct Seed {
    admin_token: String,
    mentor_ids: Vec<Uuid>,
}

async fn seed_council_world(app: &TestApp, mentor_count: usize) -> Result<Seed> {
    let org = app.insert_organization("Acme Mentoring").await?;
    app.insert_user("admin", "admin@example.com", "pw-admin", "admin")
        .await?;

    let mut mentor_ids = Vec::with_capacity(mentor_count);
    for i in 0..mentor_count {
        let user = app
            .insert_user(
                &format!("mentor{i}"),
                &format!("mentor{i}@example.com"),
                "pw-mentor",
                "user",
            )
            .await?;
        mentor_ids.push(app.insert_mentor(user, org, false).await?);
    }

    Ok(Seed {
        admin_token: app.login_token("admin@example.com", "pw-admin").await?,
        mentor_ids,
    })
}

async fn propose(
    app: &TestApp,
    seed: &Seed,
    slots: &[NaiveDateTime],
    max_mentees: i32,
    deadline: Option<NaiveDateTime>,
) -> Result<CouncilResponse> {
    let response = app
        .post_json(
            "/api/councils",
            &json!({
                "title": "Career crossroads council",
                "duration": 60,
                "timezone": "UTC",
                "max_mentees": max_mentees,
                "mentor_minimum": 3,
                "mentor_maximum": 5,
                "proposed_time_slots": slots.iter().map(|s| iso(*s)).collect::<Vec<_>>(),
                "mentor_response_deadline": deadline.map(iso),
            }),
            Some(&seed.admin_token),
        )
        .await?;
    anyhow::ensure!(
        response.status() == StatusCode::CREATED,
        "proposal failed with status {}",
        response.status()
    );
    let body = body_to_vec(response.into_body()).await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn invite(
    app: &TestApp,
    seed: &Seed,
    session_id: Uuid,
    mentor_id: Uuid,
) -> Result<StatusCode> {
    let response = app
        .post_json(
            &format!("/api/councils/{session_id}/mentors"),
            &json!({ "human_mentor_id": mentor_id }),
            Some(&seed.admin_token),
        )
        .await?;
    Ok(response.status())
}

async fn respond(
    app: &TestApp,
    token: &str,
    session_id: Uuid,
    mentor_id: Uuid,
    response: &str,
    slots: &[NaiveDateTime],
) -> Result<StatusCode> {
    let reply = app
        .patch_json(
            &format!("/api/councils/{session_id}/mentors/{mentor_id}/response"),
            &json!({
                "response": response,
                "available_time_slots": slots.iter().map(|s| iso(*s)).collect::<Vec<_>>(),
            }),
            Some(token),
        )
        .await?;
    Ok(reply.status())
}

async fn confirm(app: &TestApp, seed: &Seed, session_id: Uuid) -> Result<CouncilResponse> {
    let response = app
        .post_json(
            &format!("/api/councils/{session_id}/confirm"),
            &json!({}),
            Some(&seed.admin_token),
        )
        .await?;
    anyhow::ensure!(
        response.status() == StatusCode::OK,
        "confirm failed with status {}",
        response.status()
    );
    let body = body_to_vec(response.into_body()).await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn detail(app: &TestApp, seed: &Seed, session_id: Uuid) -> Result<CouncilDetail> {
    let response = app
        .get(&format!("/api/councils/{session_id}"), Some(&seed.admin_token))
        .await?;
    anyhow::ensure!(response.status() == StatusCode::OK, "detail fetch failed");
    let body = body_to_vec(response.into_body()).await?;
    Ok(serde_json::from_slice(&body)?)
}

// The quorum walk in proposal order: three mentors can make the second slot,
// two the first, minimum three. The second slot wins as soon as its third
// "available" lands, regardless of who answered first.
#[tokio::test]
async fn first_slot_reaching_quorum_wins_in_proposal_order() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let seed = seed_council_world(&app, 6).await?;

    let t1 = at(future_day(7), 10, 0);
    let t2 = at(future_day(8), 10, 0);
    let council = propose(&app, &seed, &[t1, t2], 5, None).await?;
    assert_eq!(council.coordination_status, "pending");
    assert!(!council.final_time_confirmed);

    for mentor_id in &seed.mentor_ids[..5] {
        assert_eq!(
            invite(&app, &seed, council.id, *mentor_id).await?,
            StatusCode::CREATED
        );
    }
    // The roster is capped at five.
    assert_eq!(
        invite(&app, &seed, council.id, seed.mentor_ids[5]).await?,
        StatusCode::CONFLICT
    );

    let [a, b, c, d, e] = [
        seed.mentor_ids[0],
        seed.mentor_ids[1],
        seed.mentor_ids[2],
        seed.mentor_ids[3],
        seed.mentor_ids[4],
    ];

    // D and E answer first, for the earlier slot.
    assert_eq!(
        respond(&app, &seed.admin_token, council.id, d, "available", &[t1]).await?,
        StatusCode::OK
    );
    assert_eq!(
        respond(&app, &seed.admin_token, council.id, e, "available", &[t1]).await?,
        StatusCode::OK
    );
    let current = detail(&app, &seed, council.id).await?;
    assert_eq!(current.session.coordination_status, "coordinating");

    respond(&app, &seed.admin_token, council.id, a, "available", &[t2]).await?;
    respond(&app, &seed.admin_token, council.id, b, "available", &[t2]).await?;

    // Neither slot has three yet.
    let unsettled = confirm(&app, &seed, council.id).await?;
    assert_eq!(unsettled.coordination_status, "coordinating");
    assert!(!unsettled.final_time_confirmed);

    respond(&app, &seed.admin_token, council.id, c, "available", &[t2]).await?;

    let settled = confirm(&app, &seed, council.id).await?;
    assert_eq!(settled.coordination_status, "confirmed");
    assert!(settled.final_time_confirmed);
    assert_eq!(settled.scheduled_date, iso(t2));

    // Confirming again changes nothing.
    let again = confirm(&app, &seed, council.id).await?;
    assert_eq!(again.scheduled_date, iso(t2));
    assert_eq!(again.coordination_status, "confirmed");

    // Only the mentors available at the chosen slot are marked confirmed.
    let final_state = detail(&app, &seed, council.id).await?;
    for row in &final_state.mentors {
        let expected = [a, b, c].contains(&row.human_mentor_id);
        assert_eq!(row.confirmed, expected, "mentor {}", row.human_mentor_id);
    }

    // The roster and the responses are frozen once coordination settles.
    assert_eq!(
        invite(&app, &seed, council.id, seed.mentor_ids[5]).await?,
        StatusCode::CONFLICT
    );
    assert_eq!(
        respond(&app, &seed.admin_token, council.id, d, "available", &[t2]).await?,
        StatusCode::CONFLICT
    );

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn participant_registration_honors_capacity_and_uniqueness() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let seed = seed_council_world(&app, 3).await?;

    let council = propose(&app, &seed, &[at(future_day(7), 10, 0)], 2, None).await?;

    app.insert_user("mentee1", "mentee1@example.com", "pw-mentee", "user")
        .await?;
    app.insert_user("mentee2", "mentee2@example.com", "pw-mentee", "user")
        .await?;
    app.insert_user("mentee3", "mentee3@example.com", "pw-mentee", "user")
        .await?;
    let token1 = app.login_token("mentee1@example.com", "pw-mentee").await?;
    let token2 = app.login_token("mentee2@example.com", "pw-mentee").await?;
    let token3 = app.login_token("mentee3@example.com", "pw-mentee").await?;

    let register_path = format!("/api/councils/{}/participants", council.id);
    let response = app
        .post_json(&register_path, &json!({ "session_goals": "clarity" }), Some(&token1))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Registering twice is a conflict, not a second seat.
    let response = app.post_json(&register_path, &json!({}), Some(&token1)).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.post_json(&register_path, &json!({}), Some(&token2)).await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    // The room is full.
    let response = app.post_json(&register_path, &json!({}), Some(&token3)).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let current = detail(&app, &seed, council.id).await?;
    assert_eq!(current.session.current_mentees, 2);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn coordination_fails_after_the_deadline_and_stays_failed() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let seed = seed_council_world(&app, 3).await?;

    let deadline = Utc::now().naive_utc() - Duration::hours(1);
    let council = propose(&app, &seed, &[at(future_day(7), 10, 0)], 5, Some(deadline)).await?;

    for mentor_id in &seed.mentor_ids {
        invite(&app, &seed, council.id, *mentor_id).await?;
    }
    respond(
        &app,
        &seed.admin_token,
        council.id,
        seed.mentor_ids[0],
        "unavailable",
        &[],
    )
    .await?;

    let failed = confirm(&app, &seed, council.id).await?;
    assert_eq!(failed.coordination_status, "failed");
    assert!(!failed.final_time_confirmed);

    // Terminal: no late responses, no automatic retry.
    assert_eq!(
        respond(
            &app,
            &seed.admin_token,
            council.id,
            seed.mentor_ids[1],
            "available",
            &[at(future_day(7), 10, 0)],
        )
        .await?,
        StatusCode::CONFLICT
    );
    let still_failed = confirm(&app, &seed, council.id).await?;
    assert_eq!(still_failed.coordination_status, "failed");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn validates_proposals_and_guards_mentor_responses() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let seed = seed_council_world(&app, 2).await?;

    // Proposals need at least one future slot and admin rights.
    let response = app
        .post_json(
            "/api/councils",
            &json!({ "title": "Empty", "proposed_time_slots": [] }),
            Some(&seed.admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            "/api/councils",
            &json!({
                "title": "Stale",
                "proposed_time_slots": [iso(Utc::now().naive_utc() - Duration::hours(2))],
            }),
            Some(&seed.admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mentor0_token = app.login_token("mentor0@example.com", "pw-mentor").await?;
    let response = app
        .post_json(
            "/api/councils",
            &json!({
                "title": "Unauthorized",
                "proposed_time_slots": [iso(at(future_day(7), 10, 0))],
            }),
            Some(&mentor0_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let council = propose(&app, &seed, &[at(future_day(7), 10, 0)], 5, None).await?;
    invite(&app, &seed, council.id, seed.mentor_ids[0]).await?;
    invite(&app, &seed, council.id, seed.mentor_ids[1]).await?;

    // A mentor cannot answer for a colleague, and "pending" is not an answer.
    assert_eq!(
        respond(
            &app,
            &mentor0_token,
            council.id,
            seed.mentor_ids[1],
            "available",
            &[at(future_day(7), 10, 0)],
        )
        .await?,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        respond(
            &app,
            &mentor0_token,
            council.id,
            seed.mentor_ids[0],
            "pending",
            &[],
        )
        .await?,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        respond(
            &app,
            &mentor0_token,
            council.id,
            seed.mentor_ids[0],
            "tentative",
            &[at(future_day(7), 10, 0)],
        )
        .await?,
        StatusCode::OK
    );

    // Tentative answers never count toward the quorum.
    let current = detail(&app, &seed, council.id).await?;
    assert_eq!(current.session.coordination_status, "coordinating");
    assert_eq!(current.mentors[0].availability_response, "tentative");
    let unsettled = confirm(&app, &seed, council.id).await?;
    assert!(!unsettled.final_time_confirmed);

    app.cleanup().await?;
    Ok(())
}
