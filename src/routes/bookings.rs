use axum::{
    extract::{Path, Query, State},
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
    models::{HumanMentor, SessionBooking},
    scheduling::{
        booking::{self, BookingRequest},
        BookingStatus, MeetingType, SessionType,
    },
    schema::{human_mentors, session_bookings},
    state::AppState,
};

use super::to_iso;

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub human_mentor_id: Uuid,
    pub scheduled_date: DateTime<Utc>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub session_type: Option<String>,
    #[serde(default)]
    pub meeting_type: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub session_goals: Option<String>,
    #[serde(default)]
    pub mentee_questions: Option<String>,
    #[serde(default)]
    pub calendly_event_id: Option<String>,
    #[serde(default)]
    pub calendly_event_url: Option<String>,
}

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub mentee_id: Uuid,
    pub human_mentor_id: Uuid,
    pub session_type: String,
    pub duration: i32,
    pub scheduled_date: String,
    pub timezone: String,
    pub meeting_type: String,
    pub status: String,
    pub session_goals: Option<String>,
    pub mentee_questions: Option<String>,
    pub calendly_event_id: Option<String>,
    pub calendly_event_url: Option<String>,
    pub reminder_sent: bool,
    pub confirmation_sent: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let session_type: SessionType = payload
        .session_type
        .as_deref()
        .unwrap_or("individual")
        .parse()
        .map_err(AppError::from)?;
    let meeting_type: MeetingType = payload
        .meeting_type
        .as_deref()
        .unwrap_or("video")
        .parse()
        .map_err(AppError::from)?;

    let request = BookingRequest {
        mentee_id: user.user_id,
        human_mentor_id: payload.human_mentor_id,
        scheduled_date: payload.scheduled_date.naive_utc(),
        duration_minutes: payload.duration.unwrap_or(60),
        session_type,
        meeting_type,
        timezone: payload
            .timezone
            .unwrap_or_else(|| "America/New_York".to_string()),
        session_goals: payload.session_goals,
        mentee_questions: payload.mentee_questions,
        calendly_event_id: payload.calendly_event_id,
        calendly_event_url: payload.calendly_event_url,
    };

    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();
    let booked = booking::create_booking(&mut conn, &request, now)?;
    Ok((StatusCode::CREATED, Json(to_booking_response(booked))))
}

#[derive(Deserialize)]
pub struct ListBookingsQuery {
    /// "mentee" (default) or "mentor".
    #[serde(default)]
    pub side: Option<String>,
}

pub async fn list_my_bookings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListBookingsQuery>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let mut conn = state.db()?;

    let bookings: Vec<SessionBooking> = match query.side.as_deref().unwrap_or("mentee") {
        "mentee" => session_bookings::table
            .filter(session_bookings::mentee_id.eq(user.user_id))
            .order(session_bookings::scheduled_date.asc())
            .load(&mut conn)?,
        "mentor" => {
            let mentor: HumanMentor = human_mentors::table
                .filter(human_mentors::user_id.eq(user.user_id))
                .first(&mut conn)
                .optional()?
                .ok_or_else(AppError::not_found)?;
            session_bookings::table
                .filter(session_bookings::human_mentor_id.eq(mentor.id))
                .order(session_bookings::scheduled_date.asc())
                .load(&mut conn)?
        }
        _ => return Err(AppError::bad_request("side must be mentee or mentor")),
    };

    Ok(Json(
        bookings.into_iter().map(to_booking_response).collect(),
    ))
}

pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let mut conn = state.db()?;
    let booked: SessionBooking = session_bookings::table
        .find(booking_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    authorize_booking_access(&mut conn, &user, &booked)?;
    Ok(Json(to_booking_response(booked)))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Applies a lifecycle transition. Mentees may cancel their own bookings;
/// everything else is for the mentor (or an admin) to drive.
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<BookingResponse>> {
    let requested: BookingStatus = payload.status.parse().map_err(AppError::from)?;

    let mut conn = state.db()?;
    let booked: SessionBooking = session_bookings::table
        .find(booking_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    let is_mentee = booked.mentee_id == user.user_id;
    let is_mentor = owns_mentor_profile(&mut conn, &user, booked.human_mentor_id)?;
    let allowed = match requested {
        BookingStatus::Cancelled => user.is_admin() || is_mentee || is_mentor,
        _ => user.is_admin() || is_mentor,
    };
    if !allowed {
        return Err(AppError::forbidden());
    }

    let now = Utc::now().naive_utc();
    let updated = booking::apply_status_transition(&mut conn, booking_id, requested, now)?;
    Ok(Json(to_booking_response(updated)))
}

fn authorize_booking_access(
    conn: &mut diesel::PgConnection,
    user: &AuthenticatedUser,
    booked: &SessionBooking,
) -> Result<(), AppError> {
    if user.is_admin() || booked.mentee_id == user.user_id {
        return Ok(());
    }
    if owns_mentor_profile(conn, user, booked.human_mentor_id)? {
        return Ok(());
    }
    Err(AppError::forbidden())
}

fn owns_mentor_profile(
    conn: &mut diesel::PgConnection,
    user: &AuthenticatedUser,
    human_mentor_id: Uuid,
) -> Result<bool, AppError> {
    let owner: Option<Uuid> = human_mentors::table
        .find(human_mentor_id)
        .select(human_mentors::user_id)
        .first(conn)
        .optional()?;
    Ok(owner == Some(user.user_id))
}

fn to_booking_response(booked: SessionBooking) -> BookingResponse {
    BookingResponse {
        id: booked.id,
        mentee_id: booked.mentee_id,
        human_mentor_id: booked.human_mentor_id,
        session_type: booked.session_type,
        duration: booked.duration,
        scheduled_date: to_iso(booked.scheduled_date),
        timezone: booked.timezone,
        meeting_type: booked.meeting_type,
        status: booked.status,
        session_goals: booked.session_goals,
        mentee_questions: booked.mentee_questions,
        calendly_event_id: booked.calendly_event_id,
        calendly_event_url: booked.calendly_event_url,
        reminder_sent: booked.reminder_sent,
        confirmation_sent: booked.confirmation_sent,
        created_at: to_iso(booked.created_at),
        updated_at: to_iso(booked.updated_at),
    }
}
