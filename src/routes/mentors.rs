use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::{
        HumanMentor, MentorAvailability, MentorUnavailability, NewHumanMentor,
        NewMentorAvailability, NewMentorUnavailability,
    },
    scheduling::{booking, parse_timezone, RecurringPattern},
    schema::{human_mentors, mentor_availability, mentor_unavailability, organizations, users},
    state::AppState,
};

use super::to_iso;

#[derive(Serialize)]
pub struct MentorResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expertise: String,
    pub bio: String,
    pub experience: String,
    pub hourly_rate_cents: i32,
    pub rating: Option<f32>,
    pub total_sessions: i32,
    pub is_active: bool,
    pub organization_id: Uuid,
    pub use_calendly: bool,
    pub default_session_duration: i32,
    pub buffer_time: i32,
    pub advance_booking_days: i32,
    pub timezone: String,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct CreateMentorRequest {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub expertise: String,
    pub bio: String,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub hourly_rate_cents: Option<i32>,
    #[serde(default)]
    pub use_calendly: bool,
    #[serde(default)]
    pub default_session_duration: Option<i32>,
    #[serde(default)]
    pub buffer_time: Option<i32>,
    #[serde(default)]
    pub advance_booking_days: Option<i32>,
    #[serde(default)]
    pub timezone: Option<String>,
}

pub async fn list_mentors(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<MentorResponse>>> {
    let mut conn = state.db()?;
    let mentors: Vec<HumanMentor> = human_mentors::table
        .filter(human_mentors::is_active.eq(true))
        .order(human_mentors::created_at.asc())
        .load(&mut conn)?;
    Ok(Json(mentors.into_iter().map(to_mentor_response).collect()))
}

pub async fn create_mentor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateMentorRequest>,
) -> AppResult<(StatusCode, Json<MentorResponse>)> {
    user.require_admin()?;

    if payload.expertise.trim().is_empty() || payload.bio.trim().is_empty() {
        return Err(AppError::bad_request("expertise and bio are required"));
    }
    let timezone = payload
        .timezone
        .unwrap_or_else(|| "America/New_York".to_string());
    parse_timezone(&timezone).map_err(AppError::from)?;

    let duration = payload.default_session_duration.unwrap_or(30);
    let buffer = payload.buffer_time.unwrap_or(15);
    let advance = payload.advance_booking_days.unwrap_or(30);
    if duration <= 0 || buffer < 0 || advance <= 0 {
        return Err(AppError::bad_request(
            "scheduling parameters must be positive",
        ));
    }

    let mut conn = state.db()?;

    let owner: Option<Uuid> = users::table
        .find(payload.user_id)
        .select(users::id)
        .first(&mut conn)
        .optional()?;
    if owner.is_none() {
        return Err(AppError::not_found());
    }
    let org: Option<Uuid> = organizations::table
        .find(payload.organization_id)
        .select(organizations::id)
        .first(&mut conn)
        .optional()?;
    if org.is_none() {
        return Err(AppError::not_found());
    }

    let new_mentor = NewHumanMentor {
        id: Uuid::new_v4(),
        user_id: payload.user_id,
        expertise: payload.expertise.trim().to_string(),
        bio: payload.bio.trim().to_string(),
        experience: payload.experience.unwrap_or_default(),
        hourly_rate_cents: payload.hourly_rate_cents.unwrap_or(0),
        organization_id: payload.organization_id,
        use_calendly: payload.use_calendly,
        default_session_duration: duration,
        buffer_time: buffer,
        advance_booking_days: advance,
        timezone,
    };

    match diesel::insert_into(human_mentors::table)
        .values(&new_mentor)
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(AppError::bad_request("user already has a mentor profile"));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let mentor: HumanMentor = human_mentors::table.find(new_mentor.id).first(&mut conn)?;
    Ok((StatusCode::CREATED, Json(to_mentor_response(mentor))))
}

pub async fn get_mentor(
    State(state): State<AppState>,
    Path(mentor_id): Path<Uuid>,
) -> AppResult<Json<MentorResponse>> {
    let mut conn = state.db()?;
    let mentor = load_mentor(&mut conn, mentor_id)?;
    Ok(Json(to_mentor_response(mentor)))
}

#[derive(Serialize)]
pub struct AvailabilityRuleResponse {
    pub id: Uuid,
    pub day_of_week: i32,
    pub start_time: String,
    pub end_time: String,
    pub timezone: String,
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct CreateAvailabilityRequest {
    pub day_of_week: i32,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub day_of_week: Option<i32>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub timezone: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn list_availability(
    State(state): State<AppState>,
    Path(mentor_id): Path<Uuid>,
) -> AppResult<Json<Vec<AvailabilityRuleResponse>>> {
    let mut conn = state.db()?;
    load_mentor(&mut conn, mentor_id)?;

    let rules: Vec<MentorAvailability> = mentor_availability::table
        .filter(mentor_availability::human_mentor_id.eq(mentor_id))
        .order((
            mentor_availability::day_of_week.asc(),
            mentor_availability::start_time.asc(),
        ))
        .load(&mut conn)?;

    Ok(Json(rules.into_iter().map(to_rule_response).collect()))
}

pub async fn add_availability(
    State(state): State<AppState>,
    Path(mentor_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateAvailabilityRequest>,
) -> AppResult<(StatusCode, Json<AvailabilityRuleResponse>)> {
    let mut conn = state.db()?;
    let mentor = load_mentor(&mut conn, mentor_id)?;
    authorize_manage(&user, &mentor)?;

    if !(0..=6).contains(&payload.day_of_week) {
        return Err(AppError::bad_request(
            "day_of_week must be between 0 (Sunday) and 6 (Saturday)",
        ));
    }
    let start_time = parse_time(&payload.start_time)?;
    let end_time = parse_time(&payload.end_time)?;
    if start_time >= end_time {
        return Err(AppError::bad_request("start_time must precede end_time"));
    }
    // New rules inherit the mentor's zone unless the caller pins one.
    let timezone = payload.timezone.unwrap_or_else(|| mentor.timezone.clone());
    parse_timezone(&timezone).map_err(AppError::from)?;

    let new_rule = NewMentorAvailability {
        id: Uuid::new_v4(),
        human_mentor_id: mentor_id,
        day_of_week: payload.day_of_week,
        start_time,
        end_time,
        timezone,
    };

    diesel::insert_into(mentor_availability::table)
        .values(&new_rule)
        .execute(&mut conn)?;

    let rule: MentorAvailability = mentor_availability::table
        .find(new_rule.id)
        .first(&mut conn)?;
    Ok((StatusCode::CREATED, Json(to_rule_response(rule))))
}

pub async fn update_availability(
    State(state): State<AppState>,
    Path((mentor_id, rule_id)): Path<(Uuid, Uuid)>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> AppResult<Json<AvailabilityRuleResponse>> {
    let mut conn = state.db()?;
    let mentor = load_mentor(&mut conn, mentor_id)?;
    authorize_manage(&user, &mentor)?;

    let rule: MentorAvailability = mentor_availability::table
        .find(rule_id)
        .filter(mentor_availability::human_mentor_id.eq(mentor_id))
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    let day_of_week = payload.day_of_week.unwrap_or(rule.day_of_week);
    if !(0..=6).contains(&day_of_week) {
        return Err(AppError::bad_request(
            "day_of_week must be between 0 (Sunday) and 6 (Saturday)",
        ));
    }
    let start_time = match payload.start_time.as_deref() {
        Some(raw) => parse_time(raw)?,
        None => rule.start_time,
    };
    let end_time = match payload.end_time.as_deref() {
        Some(raw) => parse_time(raw)?,
        None => rule.end_time,
    };
    if start_time >= end_time {
        return Err(AppError::bad_request("start_time must precede end_time"));
    }
    let timezone = payload.timezone.unwrap_or_else(|| rule.timezone.clone());
    parse_timezone(&timezone).map_err(AppError::from)?;
    let is_active = payload.is_active.unwrap_or(rule.is_active);

    let now = Utc::now().naive_utc();
    diesel::update(mentor_availability::table.find(rule_id))
        .set((
            mentor_availability::day_of_week.eq(day_of_week),
            mentor_availability::start_time.eq(start_time),
            mentor_availability::end_time.eq(end_time),
            mentor_availability::timezone.eq(&timezone),
            mentor_availability::is_active.eq(is_active),
            mentor_availability::updated_at.eq(now),
        ))
        .execute(&mut conn)?;

    let updated: MentorAvailability =
        mentor_availability::table.find(rule_id).first(&mut conn)?;
    Ok(Json(to_rule_response(updated)))
}

pub async fn delete_availability(
    State(state): State<AppState>,
    Path((mentor_id, rule_id)): Path<(Uuid, Uuid)>,
    user: AuthenticatedUser,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let mentor = load_mentor(&mut conn, mentor_id)?;
    authorize_manage(&user, &mentor)?;

    let deleted = diesel::delete(
        mentor_availability::table
            .find(rule_id)
            .filter(mentor_availability::human_mentor_id.eq(mentor_id)),
    )
    .execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct UnavailabilityResponse {
    pub id: Uuid,
    pub start_date: String,
    pub end_date: String,
    pub reason: Option<String>,
    pub is_recurring: bool,
    pub recurring_pattern: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateUnavailabilityRequest {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_pattern: Option<String>,
}

pub async fn list_unavailability(
    State(state): State<AppState>,
    Path(mentor_id): Path<Uuid>,
) -> AppResult<Json<Vec<UnavailabilityResponse>>> {
    let mut conn = state.db()?;
    load_mentor(&mut conn, mentor_id)?;

    let blocks: Vec<MentorUnavailability> = mentor_unavailability::table
        .filter(mentor_unavailability::human_mentor_id.eq(mentor_id))
        .order(mentor_unavailability::start_date.asc())
        .load(&mut conn)?;

    Ok(Json(blocks.into_iter().map(to_block_response).collect()))
}

pub async fn add_unavailability(
    State(state): State<AppState>,
    Path(mentor_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateUnavailabilityRequest>,
) -> AppResult<(StatusCode, Json<UnavailabilityResponse>)> {
    let mut conn = state.db()?;
    let mentor = load_mentor(&mut conn, mentor_id)?;
    authorize_manage(&user, &mentor)?;

    if payload.start_date >= payload.end_date {
        return Err(AppError::bad_request("start_date must precede end_date"));
    }
    let recurring_pattern = if payload.is_recurring {
        let raw = payload.recurring_pattern.as_deref().ok_or_else(|| {
            AppError::bad_request("recurring blocks need a recurring_pattern")
        })?;
        let pattern: RecurringPattern = raw.parse().map_err(AppError::from)?;
        Some(pattern.as_str().to_string())
    } else {
        None
    };

    let new_block = NewMentorUnavailability {
        id: Uuid::new_v4(),
        human_mentor_id: mentor_id,
        start_date: payload.start_date.naive_utc(),
        end_date: payload.end_date.naive_utc(),
        reason: payload.reason,
        is_recurring: payload.is_recurring,
        recurring_pattern,
    };

    diesel::insert_into(mentor_unavailability::table)
        .values(&new_block)
        .execute(&mut conn)?;

    let block: MentorUnavailability = mentor_unavailability::table
        .find(new_block.id)
        .first(&mut conn)?;
    Ok((StatusCode::CREATED, Json(to_block_response(block))))
}

pub async fn delete_unavailability(
    State(state): State<AppState>,
    Path((mentor_id, block_id)): Path<(Uuid, Uuid)>,
    user: AuthenticatedUser,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let mentor = load_mentor(&mut conn, mentor_id)?;
    authorize_manage(&user, &mentor)?;

    let deleted = diesel::delete(
        mentor_unavailability::table
            .find(block_id)
            .filter(mentor_unavailability::human_mentor_id.eq(mentor_id)),
    )
    .execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub slots: Vec<String>,
}

/// Bookable start instants for a mentor. Natively scheduled mentors go
/// through the availability engine; Calendly-delegated mentors return the
/// provider's slots untouched.
pub async fn list_slots(
    State(state): State<AppState>,
    Path(mentor_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> AppResult<Json<SlotsResponse>> {
    let mut conn = state.db()?;
    let mentor = load_mentor(&mut conn, mentor_id)?;

    let now = Utc::now().naive_utc();
    let range_start = query.from.map(|dt| dt.naive_utc()).unwrap_or(now);
    let range_end = query
        .to
        .map(|dt| dt.naive_utc())
        .unwrap_or(now + Duration::days(i64::from(mentor.advance_booking_days)));
    if range_end < range_start {
        return Err(AppError::bad_request("to must not precede from"));
    }

    let slots = if mentor.use_calendly {
        drop(conn);
        state
            .calendar
            .mentor_slots(&mentor, range_start, range_end)
            .await?
    } else {
        let duration = query
            .duration
            .unwrap_or(i64::from(mentor.default_session_duration));
        booking::native_slots(&mut conn, &mentor, range_start, range_end, duration, now)?
    };

    Ok(Json(SlotsResponse {
        slots: slots.into_iter().map(to_iso).collect(),
    }))
}

pub(super) fn load_mentor(
    conn: &mut diesel::PgConnection,
    mentor_id: Uuid,
) -> AppResult<HumanMentor> {
    human_mentors::table
        .find(mentor_id)
        .first(conn)
        .optional()?
        .ok_or_else(AppError::not_found)
}

fn authorize_manage(user: &AuthenticatedUser, mentor: &HumanMentor) -> Result<(), AppError> {
    if user.is_admin() || mentor.user_id == user.user_id {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}

fn parse_time(raw: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| AppError::bad_request("times must look like 09:00 or 09:00:00"))
}

fn to_mentor_response(mentor: HumanMentor) -> MentorResponse {
    MentorResponse {
        id: mentor.id,
        user_id: mentor.user_id,
        expertise: mentor.expertise,
        bio: mentor.bio,
        experience: mentor.experience,
        hourly_rate_cents: mentor.hourly_rate_cents,
        rating: mentor.rating,
        total_sessions: mentor.total_sessions,
        is_active: mentor.is_active,
        organization_id: mentor.organization_id,
        use_calendly: mentor.use_calendly,
        default_session_duration: mentor.default_session_duration,
        buffer_time: mentor.buffer_time,
        advance_booking_days: mentor.advance_booking_days,
        timezone: mentor.timezone,
        created_at: to_iso(mentor.created_at),
    }
}

fn to_rule_response(rule: MentorAvailability) -> AvailabilityRuleResponse {
    AvailabilityRuleResponse {
        id: rule.id,
        day_of_week: rule.day_of_week,
        start_time: rule.start_time.format("%H:%M:%S").to_string(),
        end_time: rule.end_time.format("%H:%M:%S").to_string(),
        timezone: rule.timezone,
        is_active: rule.is_active,
    }
}

fn to_block_response(block: MentorUnavailability) -> UnavailabilityResponse {
    UnavailabilityResponse {
        id: block.id,
        start_date: to_iso(block.start_date),
        end_date: to_iso(block.end_date),
        reason: block.reason,
        is_recurring: block.is_recurring,
        recurring_pattern: block.recurring_pattern,
    }
}
