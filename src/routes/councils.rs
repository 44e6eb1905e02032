use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::{CouncilMentor, CouncilParticipant, CouncilSession, HumanMentor},
    scheduling::{
        council::{self, CouncilProposal},
        AvailabilityResponse, MeetingType,
    },
    schema::{council_mentors, council_participants, council_sessions, human_mentors},
    state::AppState,
};

use super::to_iso;

#[derive(Deserialize)]
pub struct ProposeCouncilRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub max_mentees: Option<i32>,
    #[serde(default)]
    pub mentor_minimum: Option<i32>,
    #[serde(default)]
    pub mentor_maximum: Option<i32>,
    #[serde(default)]
    pub meeting_type: Option<String>,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    pub proposed_time_slots: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub mentor_response_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub coordinator_notes: Option<String>,
}

#[derive(Serialize)]
pub struct CouncilResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: String,
    pub duration: i32,
    pub timezone: String,
    pub max_mentees: i32,
    pub current_mentees: i32,
    pub meeting_type: String,
    pub status: String,
    pub organization_id: Option<Uuid>,
    pub proposed_time_slots: Vec<String>,
    pub mentor_response_deadline: Option<String>,
    pub final_time_confirmed: bool,
    pub mentor_minimum: i32,
    pub mentor_maximum: i32,
    pub coordination_status: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct CouncilMentorResponse {
    pub id: Uuid,
    pub human_mentor_id: Uuid,
    pub role: String,
    pub confirmed: bool,
    pub availability_response: String,
    pub response_date: Option<String>,
    pub available_time_slots: Vec<String>,
    pub conflict_notes: Option<String>,
}

#[derive(Serialize)]
pub struct CouncilParticipantResponse {
    pub id: Uuid,
    pub mentee_id: Uuid,
    pub session_goals: Option<String>,
    pub questions: Option<String>,
    pub registration_date: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct CouncilDetailResponse {
    pub session: CouncilResponse,
    pub mentors: Vec<CouncilMentorResponse>,
    pub participants: Vec<CouncilParticipantResponse>,
}

pub async fn propose_council(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ProposeCouncilRequest>,
) -> AppResult<(StatusCode, Json<CouncilResponse>)> {
    user.require_admin()?;

    let meeting_type: MeetingType = payload
        .meeting_type
        .as_deref()
        .unwrap_or("video")
        .parse()
        .map_err(AppError::from)?;

    let proposal = CouncilProposal {
        title: payload.title,
        description: payload.description,
        duration_minutes: payload.duration.unwrap_or(60),
        timezone: payload
            .timezone
            .unwrap_or_else(|| "America/New_York".to_string()),
        max_mentees: payload.max_mentees.unwrap_or(5),
        mentor_minimum: payload.mentor_minimum.unwrap_or(3),
        mentor_maximum: payload.mentor_maximum.unwrap_or(5),
        meeting_type,
        organization_id: payload.organization_id,
        proposed_slots: payload
            .proposed_time_slots
            .iter()
            .map(|slot| slot.naive_utc())
            .collect(),
        mentor_response_deadline: payload
            .mentor_response_deadline
            .map(|deadline| deadline.naive_utc()),
        coordinator_notes: payload.coordinator_notes,
    };

    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();
    let session = council::propose_council_session(&mut conn, &proposal, now)?;
    let response = to_council_response(session)?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_councils(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CouncilResponse>>> {
    let mut conn = state.db()?;
    let sessions: Vec<CouncilSession> = council_sessions::table
        .order(council_sessions::scheduled_date.asc())
        .load(&mut conn)?;

    let mut response = Vec::with_capacity(sessions.len());
    for session in sessions {
        response.push(to_council_response(session)?);
    }
    Ok(Json(response))
}

pub async fn get_council(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<CouncilDetailResponse>> {
    let mut conn = state.db()?;
    let session: CouncilSession = council_sessions::table
        .find(session_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    let mentors: Vec<CouncilMentor> = council_mentors::table
        .filter(council_mentors::council_session_id.eq(session_id))
        .order(council_mentors::created_at.asc())
        .load(&mut conn)?;

    let participants: Vec<CouncilParticipant> = council_participants::table
        .filter(council_participants::council_session_id.eq(session_id))
        .order(council_participants::registration_date.asc())
        .load(&mut conn)?;

    let mut mentor_rows = Vec::with_capacity(mentors.len());
    for mentor in mentors {
        mentor_rows.push(to_council_mentor_response(mentor)?);
    }

    Ok(Json(CouncilDetailResponse {
        session: to_council_response(session)?,
        mentors: mentor_rows,
        participants: participants
            .into_iter()
            .map(to_participant_response)
            .collect(),
    }))
}

#[derive(Deserialize)]
pub struct InviteMentorRequest {
    pub human_mentor_id: Uuid,
}

pub async fn invite_mentor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<InviteMentorRequest>,
) -> AppResult<(StatusCode, Json<CouncilMentorResponse>)> {
    user.require_admin()?;

    let mut conn = state.db()?;
    let row = council::invite_mentor(&mut conn, session_id, payload.human_mentor_id)?;
    Ok((StatusCode::CREATED, Json(to_council_mentor_response(row)?)))
}

#[derive(Deserialize)]
pub struct MentorResponseRequest {
    pub response: String,
    #[serde(default)]
    pub available_time_slots: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub conflict_notes: Option<String>,
}

pub async fn record_response(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((session_id, human_mentor_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<MentorResponseRequest>,
) -> AppResult<Json<CouncilMentorResponse>> {
    let response: AvailabilityResponse = payload.response.parse().map_err(AppError::from)?;

    let mut conn = state.db()?;
    if !user.is_admin() {
        let mentor: HumanMentor = human_mentors::table
            .find(human_mentor_id)
            .first(&mut conn)
            .optional()?
            .ok_or_else(AppError::not_found)?;
        if mentor.user_id != user.user_id {
            return Err(AppError::forbidden());
        }
    }

    let slots: Vec<_> = payload
        .available_time_slots
        .iter()
        .map(|slot| slot.naive_utc())
        .collect();
    let now = Utc::now().naive_utc();
    let row = council::record_mentor_response(
        &mut conn,
        session_id,
        human_mentor_id,
        response,
        &slots,
        payload.conflict_notes,
        now,
    )?;
    Ok(Json(to_council_mentor_response(row)?))
}

pub async fn confirm_council(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<CouncilResponse>> {
    user.require_admin()?;

    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();
    let session = council::try_confirm(&mut conn, session_id, now)?;
    Ok(Json(to_council_response(session)?))
}

#[derive(Deserialize)]
pub struct RegisterParticipantRequest {
    #[serde(default)]
    pub session_goals: Option<String>,
    #[serde(default)]
    pub questions: Option<String>,
}

pub async fn register_participant(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<RegisterParticipantRequest>,
) -> AppResult<(StatusCode, Json<CouncilParticipantResponse>)> {
    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();
    let row = council::register_participant(
        &mut conn,
        session_id,
        user.user_id,
        payload.session_goals,
        payload.questions,
        now,
    )?;
    Ok((StatusCode::CREATED, Json(to_participant_response(row))))
}

fn to_council_response(session: CouncilSession) -> AppResult<CouncilResponse> {
    let proposed = council::slots_from_json(&session.proposed_time_slots)
        .map_err(AppError::from)?
        .into_iter()
        .map(to_iso)
        .collect();

    Ok(CouncilResponse {
        id: session.id,
        title: session.title,
        description: session.description,
        scheduled_date: to_iso(session.scheduled_date),
        duration: session.duration,
        timezone: session.timezone,
        max_mentees: session.max_mentees,
        current_mentees: session.current_mentees,
        meeting_type: session.meeting_type,
        status: session.status,
        organization_id: session.organization_id,
        proposed_time_slots: proposed,
        mentor_response_deadline: session.mentor_response_deadline.map(to_iso),
        final_time_confirmed: session.final_time_confirmed,
        mentor_minimum: session.mentor_minimum,
        mentor_maximum: session.mentor_maximum,
        coordination_status: session.coordination_status,
        created_at: to_iso(session.created_at),
    })
}

fn to_council_mentor_response(row: CouncilMentor) -> AppResult<CouncilMentorResponse> {
    let slots = council::slots_from_json(&row.available_time_slots)
        .map_err(AppError::from)?
        .into_iter()
        .map(to_iso)
        .collect();

    Ok(CouncilMentorResponse {
        id: row.id,
        human_mentor_id: row.human_mentor_id,
        role: row.role,
        confirmed: row.confirmed,
        availability_response: row.availability_response,
        response_date: row.response_date.map(to_iso),
        available_time_slots: slots,
        conflict_notes: row.conflict_notes,
    })
}

fn to_participant_response(row: CouncilParticipant) -> CouncilParticipantResponse {
    CouncilParticipantResponse {
        id: row.id,
        mentee_id: row.mentee_id,
        session_goals: row.session_goals,
        questions: row.questions,
        registration_date: to_iso(row.registration_date),
        status: row.status,
    }
}
