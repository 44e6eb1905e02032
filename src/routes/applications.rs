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
    models::{MentorApplication, NewMentorApplication},
    schema::mentor_applications,
    state::AppState,
};

use super::to_iso;

const STATUS_PENDING: &str = "pending";
const STATUS_INTERVIEW_SCHEDULED: &str = "interview_scheduled";
const STATUS_APPROVED: &str = "approved";
const STATUS_REJECTED: &str = "rejected";

const APPLICATION_STATUSES: &[&str] = &[
    STATUS_PENDING,
    STATUS_INTERVIEW_SCHEDULED,
    STATUS_APPROVED,
    STATUS_REJECTED,
];

/// Structured story an applicant submits for their profile; stored as typed
/// JSONB rather than a free-form blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeStory {
    pub category: String,
    pub title: String,
    pub story: String,
    pub lesson: String,
}

#[derive(Deserialize)]
pub struct SubmitApplicationRequest {
    pub applicant_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    pub bio: String,
    pub expertise: String,
    #[serde(default)]
    pub years_experience: Option<i32>,
    #[serde(default)]
    pub life_stories: Vec<LifeStory>,
    #[serde(default)]
    pub challenges: Vec<String>,
    #[serde(default)]
    pub quotes: Vec<String>,
    #[serde(default)]
    pub principles: Vec<String>,
    #[serde(default)]
    pub career_wisdom: Option<String>,
    #[serde(default)]
    pub relationship_advice: Option<String>,
    #[serde(default)]
    pub parenting_insights: Option<String>,
    #[serde(default)]
    pub spiritual_guidance: Option<String>,
    #[serde(default)]
    pub financial_wisdom: Option<String>,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub applicant_name: String,
    pub email: String,
    pub bio: String,
    pub expertise: String,
    pub years_experience: Option<i32>,
    pub life_stories: Vec<LifeStory>,
    pub organization_id: Option<Uuid>,
    pub status: String,
    pub admin_notes: Option<String>,
    pub interview_date: Option<String>,
    pub approved_by: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

pub async fn submit_application(
    State(state): State<AppState>,
    Json(payload): Json<SubmitApplicationRequest>,
) -> AppResult<(StatusCode, Json<ApplicationResponse>)> {
    let applicant_name = payload.applicant_name.trim();
    let email = payload.email.trim().to_lowercase();
    if applicant_name.is_empty() {
        return Err(AppError::bad_request("applicant_name must not be empty"));
    }
    if !email.contains('@') {
        return Err(AppError::bad_request("email address is not valid"));
    }
    if payload.bio.trim().is_empty() || payload.expertise.trim().is_empty() {
        return Err(AppError::bad_request("bio and expertise are required"));
    }

    let new_application = NewMentorApplication {
        id: Uuid::new_v4(),
        applicant_name: applicant_name.to_string(),
        email,
        phone: payload.phone,
        age: payload.age,
        bio: payload.bio.trim().to_string(),
        expertise: payload.expertise.trim().to_string(),
        years_experience: payload.years_experience,
        life_stories: serde_json::to_value(&payload.life_stories)?,
        challenges: serde_json::to_value(&payload.challenges)?,
        quotes: serde_json::to_value(&payload.quotes)?,
        principles: serde_json::to_value(&payload.principles)?,
        career_wisdom: payload.career_wisdom,
        relationship_advice: payload.relationship_advice,
        parenting_insights: payload.parenting_insights,
        spiritual_guidance: payload.spiritual_guidance,
        financial_wisdom: payload.financial_wisdom,
        organization_id: payload.organization_id,
        status: STATUS_PENDING.to_string(),
    };

    let mut conn = state.db()?;
    diesel::insert_into(mentor_applications::table)
        .values(&new_application)
        .execute(&mut conn)?;

    let application: MentorApplication = mentor_applications::table
        .find(new_application.id)
        .first(&mut conn)?;
    Ok((
        StatusCode::CREATED,
        Json(to_application_response(application)?),
    ))
}

#[derive(Deserialize)]
pub struct ListApplicationsQuery {
    #[serde(default)]
    pub status: Option<String>,
}

pub async fn list_applications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListApplicationsQuery>,
) -> AppResult<Json<Vec<ApplicationResponse>>> {
    user.require_admin()?;

    let mut conn = state.db()?;
    let applications: Vec<MentorApplication> = match query.status {
        Some(status) => {
            if !APPLICATION_STATUSES.contains(&status.as_str()) {
                return Err(AppError::bad_request("unknown application status"));
            }
            mentor_applications::table
                .filter(mentor_applications::status.eq(status))
                .order(mentor_applications::created_at.asc())
                .load(&mut conn)?
        }
        None => mentor_applications::table
            .order(mentor_applications::created_at.asc())
            .load(&mut conn)?,
    };

    let mut response = Vec::with_capacity(applications.len());
    for application in applications {
        response.push(to_application_response(application)?);
    }
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct ReviewApplicationRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub interview_date: Option<DateTime<Utc>>,
}

/// Admin review. Status moves forward only: pending may go to interview,
/// approval, or rejection; an interview resolves to approval or rejection;
/// approved and rejected are final.
pub async fn review_application(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<ReviewApplicationRequest>,
) -> AppResult<Json<ApplicationResponse>> {
    user.require_admin()?;

    let mut conn = state.db()?;
    let existing: MentorApplication = mentor_applications::table
        .find(application_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    let mut next_status = existing.status.clone();
    let mut approved_by = existing.approved_by;
    if let Some(requested) = payload.status {
        if !APPLICATION_STATUSES.contains(&requested.as_str()) {
            return Err(AppError::bad_request("unknown application status"));
        }
        if !application_transition_allowed(&existing.status, &requested) {
            return Err(AppError::conflict(format!(
                "cannot move application from {} to {}",
                existing.status, requested
            )));
        }
        if requested == STATUS_APPROVED {
            approved_by = Some(user.user_id);
        }
        next_status = requested;
    }

    let now = Utc::now().naive_utc();
    diesel::update(mentor_applications::table.find(application_id))
        .set((
            mentor_applications::status.eq(&next_status),
            mentor_applications::admin_notes.eq(payload
                .admin_notes
                .or(existing.admin_notes.clone())),
            mentor_applications::interview_date.eq(payload
                .interview_date
                .map(|date| date.naive_utc())
                .or(existing.interview_date)),
            mentor_applications::approved_by.eq(approved_by),
            mentor_applications::updated_at.eq(now),
        ))
        .execute(&mut conn)?;

    let updated: MentorApplication = mentor_applications::table
        .find(application_id)
        .first(&mut conn)?;
    Ok(Json(to_application_response(updated)?))
}

fn application_transition_allowed(current: &str, requested: &str) -> bool {
    matches!(
        (current, requested),
        (
            STATUS_PENDING,
            STATUS_INTERVIEW_SCHEDULED | STATUS_APPROVED | STATUS_REJECTED
        ) | (
            STATUS_INTERVIEW_SCHEDULED,
            STATUS_APPROVED | STATUS_REJECTED
        )
    )
}

fn to_application_response(application: MentorApplication) -> AppResult<ApplicationResponse> {
    let life_stories: Vec<LifeStory> = serde_json::from_value(application.life_stories)?;
    Ok(ApplicationResponse {
        id: application.id,
        applicant_name: application.applicant_name,
        email: application.email,
        bio: application.bio,
        expertise: application.expertise,
        years_experience: application.years_experience,
        life_stories,
        organization_id: application.organization_id,
        status: application.status,
        admin_notes: application.admin_notes,
        interview_date: application.interview_date.map(to_iso),
        approved_by: application.approved_by,
        created_at: to_iso(application.created_at),
        updated_at: to_iso(application.updated_at),
    })
}
