use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    schema::{
        chat_messages, council_participants, council_sessions, human_mentors,
        mentor_applications, refresh_tokens, session_bookings, users,
    },
    state::AppState,
};

use super::organizations::delete_mentor_dependents;

/// Deletes a user account and everything hanging off it in one transaction:
/// chat history, bookings as mentee, council registrations (each releasing
/// its seat), and any mentor profile with its calendar.
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_admin()?;

    let mut conn = state.db()?;
    conn.transaction::<(), AppError, _>(|conn| {
        let exists: Option<Uuid> = users::table
            .find(user_id)
            .select(users::id)
            .first(conn)
            .optional()?;
        if exists.is_none() {
            return Err(AppError::not_found());
        }

        diesel::delete(refresh_tokens::table.filter(refresh_tokens::user_id.eq(user_id)))
            .execute(conn)?;
        diesel::delete(chat_messages::table.filter(chat_messages::user_id.eq(user_id)))
            .execute(conn)?;

        let joined_sessions: Vec<Uuid> = council_participants::table
            .filter(council_participants::mentee_id.eq(user_id))
            .select(council_participants::council_session_id)
            .load(conn)?;
        diesel::delete(
            council_participants::table.filter(council_participants::mentee_id.eq(user_id)),
        )
        .execute(conn)?;
        for session_id in joined_sessions {
            diesel::update(
                council_sessions::table
                    .find(session_id)
                    .filter(council_sessions::current_mentees.gt(0)),
            )
            .set(
                council_sessions::current_mentees.eq(council_sessions::current_mentees - 1),
            )
            .execute(conn)?;
        }

        diesel::delete(session_bookings::table.filter(session_bookings::mentee_id.eq(user_id)))
            .execute(conn)?;

        let mentor_id: Option<Uuid> = human_mentors::table
            .filter(human_mentors::user_id.eq(user_id))
            .select(human_mentors::id)
            .first(conn)
            .optional()?;
        if let Some(mentor_id) = mentor_id {
            delete_mentor_dependents(conn, &[mentor_id])?;
            diesel::delete(human_mentors::table.find(mentor_id)).execute(conn)?;
        }

        diesel::update(
            mentor_applications::table.filter(mentor_applications::approved_by.eq(user_id)),
        )
        .set(mentor_applications::approved_by.eq::<Option<Uuid>>(None))
        .execute(conn)?;

        diesel::delete(users::table.find(user_id)).execute(conn)?;
        Ok(())
    })?;

    Ok(StatusCode::NO_CONTENT)
}
