use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::{NewOrganization, Organization},
    schema::{
        ai_mentors, chat_messages, council_mentors, council_sessions, human_mentors,
        mentor_applications, mentor_availability, mentor_unavailability, organizations,
        session_bookings, users,
    },
    state::AppState,
};

use super::to_iso;

const ORG_TYPES: &[&str] = &["church", "business", "city", "nonprofit"];

#[derive(Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub org_type: Option<String>,
}

#[derive(Serialize)]
pub struct OrganizationResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub org_type: String,
    pub created_at: String,
    pub updated_at: String,
}

pub async fn list_organizations(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<OrganizationResponse>>> {
    let mut conn = state.db()?;
    let orgs: Vec<Organization> = organizations::table
        .order(organizations::name.asc())
        .load(&mut conn)?;
    Ok(Json(orgs.into_iter().map(to_org_response).collect()))
}

pub async fn create_organization(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateOrganizationRequest>,
) -> AppResult<(StatusCode, Json<OrganizationResponse>)> {
    user.require_admin()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    let org_type = payload.org_type.unwrap_or_else(|| "business".to_string());
    if !ORG_TYPES.contains(&org_type.as_str()) {
        return Err(AppError::bad_request(
            "type must be church, business, city, or nonprofit",
        ));
    }

    let new_org = NewOrganization {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: payload.description.unwrap_or_default(),
        org_type,
    };

    let mut conn = state.db()?;
    diesel::insert_into(organizations::table)
        .values(&new_org)
        .execute(&mut conn)?;

    let org: Organization = organizations::table.find(new_org.id).first(&mut conn)?;
    Ok((StatusCode::CREATED, Json(to_org_response(org))))
}

/// Deletes an organization and everything it owns in one transaction. Its
/// mentors (AI and human) disappear with their dependent rows; user accounts
/// outlive the organization and are merely detached.
pub async fn delete_organization(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(org_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_admin()?;

    let mut conn = state.db()?;
    conn.transaction::<(), AppError, _>(|conn| {
        organizations::table
            .find(org_id)
            .first::<Organization>(conn)
            .optional()?
            .ok_or_else(AppError::not_found)?;

        diesel::update(users::table.filter(users::organization_id.eq(org_id)))
            .set(users::organization_id.eq::<Option<Uuid>>(None))
            .execute(conn)?;
        diesel::update(
            mentor_applications::table.filter(mentor_applications::organization_id.eq(org_id)),
        )
        .set(mentor_applications::organization_id.eq::<Option<Uuid>>(None))
        .execute(conn)?;
        diesel::update(
            council_sessions::table.filter(council_sessions::organization_id.eq(org_id)),
        )
        .set(council_sessions::organization_id.eq::<Option<Uuid>>(None))
        .execute(conn)?;

        let ai_ids: Vec<Uuid> = ai_mentors::table
            .filter(ai_mentors::organization_id.eq(org_id))
            .select(ai_mentors::id)
            .load(conn)?;
        if !ai_ids.is_empty() {
            diesel::delete(
                chat_messages::table.filter(chat_messages::ai_mentor_id.eq_any(&ai_ids)),
            )
            .execute(conn)?;
            diesel::delete(ai_mentors::table.filter(ai_mentors::id.eq_any(&ai_ids)))
                .execute(conn)?;
        }

        let mentor_ids: Vec<Uuid> = human_mentors::table
            .filter(human_mentors::organization_id.eq(org_id))
            .select(human_mentors::id)
            .load(conn)?;
        if !mentor_ids.is_empty() {
            delete_mentor_dependents(conn, &mentor_ids)?;
            diesel::delete(human_mentors::table.filter(human_mentors::id.eq_any(&mentor_ids)))
                .execute(conn)?;
        }

        diesel::delete(organizations::table.find(org_id)).execute(conn)?;
        Ok(())
    })?;

    Ok(StatusCode::NO_CONTENT)
}

pub(super) fn delete_mentor_dependents(
    conn: &mut PgConnection,
    mentor_ids: &[Uuid],
) -> Result<(), AppError> {
    diesel::delete(
        mentor_availability::table
            .filter(mentor_availability::human_mentor_id.eq_any(mentor_ids)),
    )
    .execute(conn)?;
    diesel::delete(
        mentor_unavailability::table
            .filter(mentor_unavailability::human_mentor_id.eq_any(mentor_ids)),
    )
    .execute(conn)?;
    diesel::delete(
        session_bookings::table.filter(session_bookings::human_mentor_id.eq_any(mentor_ids)),
    )
    .execute(conn)?;
    diesel::delete(
        council_mentors::table.filter(council_mentors::human_mentor_id.eq_any(mentor_ids)),
    )
    .execute(conn)?;
    Ok(())
}

fn to_org_response(org: Organization) -> OrganizationResponse {
    OrganizationResponse {
        id: org.id,
        name: org.name,
        description: org.description,
        org_type: org.org_type,
        created_at: to_iso(org.created_at),
        updated_at: to_iso(org.updated_at),
    }
}
