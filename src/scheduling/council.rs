//! Council session coordination: proposing candidate times, collecting
//! per-mentor availability, and settling on the first slot that reaches the
//! mentor quorum.

use chrono::NaiveDateTime;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel::PgConnection;
use uuid::Uuid;

use crate::models::{
    CouncilMentor, CouncilParticipant, CouncilSession, NewCouncilMentor, NewCouncilParticipant,
    NewCouncilSession,
};
use crate::schema::{council_mentors, council_participants, council_sessions, human_mentors, users};

use super::{
    parse_timezone, AvailabilityResponse, CoordinationStatus, MeetingType, SchedulingError,
    SchedulingResult,
};

const MAX_DURATION_MINUTES: i32 = 480;

#[derive(Debug)]
pub struct CouncilProposal {
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub timezone: String,
    pub max_mentees: i32,
    pub mentor_minimum: i32,
    pub mentor_maximum: i32,
    pub meeting_type: MeetingType,
    pub organization_id: Option<Uuid>,
    pub proposed_slots: Vec<NaiveDateTime>,
    pub mentor_response_deadline: Option<NaiveDateTime>,
    pub coordinator_notes: Option<String>,
}

/// Creates a council session in coordination state `pending`. The proposal
/// order of the slots is preserved; it decides ties at confirmation time.
pub fn propose_council_session(
    conn: &mut PgConnection,
    proposal: &CouncilProposal,
    now: NaiveDateTime,
) -> SchedulingResult<CouncilSession> {
    let title = proposal.title.trim();
    if title.is_empty() {
        return Err(SchedulingError::Validation("title must not be empty".into()));
    }
    if proposal.duration_minutes <= 0 || proposal.duration_minutes > MAX_DURATION_MINUTES {
        return Err(SchedulingError::Validation(format!(
            "duration must be between 1 and {MAX_DURATION_MINUTES} minutes"
        )));
    }
    if proposal.mentor_minimum < 1 || proposal.mentor_maximum < proposal.mentor_minimum {
        return Err(SchedulingError::Validation(
            "mentor minimum must be at least 1 and no greater than the maximum".into(),
        ));
    }
    if proposal.max_mentees < 1 {
        return Err(SchedulingError::Validation(
            "a council session needs room for at least one mentee".into(),
        ));
    }
    if proposal.proposed_slots.is_empty() {
        return Err(SchedulingError::Validation(
            "at least one time slot must be proposed".into(),
        ));
    }
    if proposal.proposed_slots.iter().any(|slot| *slot <= now) {
        return Err(SchedulingError::Validation(
            "proposed time slots must be in the future".into(),
        ));
    }
    parse_timezone(&proposal.timezone)?;

    let new_session = NewCouncilSession {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: proposal.description.clone(),
        // Placeholder until a slot is confirmed; the first proposal leads.
        scheduled_date: proposal.proposed_slots[0],
        duration: proposal.duration_minutes,
        timezone: proposal.timezone.clone(),
        max_mentees: proposal.max_mentees,
        meeting_type: proposal.meeting_type.as_str().to_string(),
        status: "scheduled".to_string(),
        organization_id: proposal.organization_id,
        proposed_time_slots: slots_to_json(&proposal.proposed_slots)?,
        mentor_response_deadline: proposal.mentor_response_deadline,
        coordinator_notes: proposal.coordinator_notes.clone(),
        mentor_minimum: proposal.mentor_minimum,
        mentor_maximum: proposal.mentor_maximum,
        coordination_status: CoordinationStatus::Pending.as_str().to_string(),
    };

    diesel::insert_into(council_sessions::table)
        .values(&new_session)
        .execute(conn)?;

    let session = council_sessions::table.find(new_session.id).first(conn)?;
    Ok(session)
}

/// Adds a mentor to the roster with a pending availability response.
pub fn invite_mentor(
    conn: &mut PgConnection,
    session_id: Uuid,
    human_mentor_id: Uuid,
) -> SchedulingResult<CouncilMentor> {
    conn.transaction::<CouncilMentor, SchedulingError, _>(|conn| {
        let session: CouncilSession = council_sessions::table
            .find(session_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or(SchedulingError::NotFound("council session"))?;

        let coordination: CoordinationStatus = session.coordination_status.parse()?;
        if coordination.is_terminal() {
            return Err(SchedulingError::Conflict(
                "the mentor roster is closed once coordination is settled".into(),
            ));
        }

        let mentor_exists: Option<Uuid> = human_mentors::table
            .find(human_mentor_id)
            .select(human_mentors::id)
            .first(conn)
            .optional()?;
        if mentor_exists.is_none() {
            return Err(SchedulingError::NotFound("mentor"));
        }

        let invited: i64 = council_mentors::table
            .filter(council_mentors::council_session_id.eq(session_id))
            .select(count_star())
            .first(conn)?;
        if invited >= i64::from(session.mentor_maximum) {
            return Err(SchedulingError::Capacity(
                "council session already has its maximum number of mentors",
            ));
        }

        let new_mentor = NewCouncilMentor {
            id: Uuid::new_v4(),
            council_session_id: session_id,
            human_mentor_id,
            role: "mentor".to_string(),
            availability_response: AvailabilityResponse::Pending.as_str().to_string(),
            available_time_slots: slots_to_json(&[])?,
        };

        match diesel::insert_into(council_mentors::table)
            .values(&new_mentor)
            .execute(conn)
        {
            Ok(_) => {}
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                return Err(SchedulingError::Conflict(
                    "mentor is already invited to this session".into(),
                ));
            }
            Err(err) => return Err(err.into()),
        }

        let row = council_mentors::table.find(new_mentor.id).first(conn)?;
        Ok(row)
    })
}

/// Records a mentor's availability answer and moves the session from
/// `pending` to `coordinating` once the first answer lands.
pub fn record_mentor_response(
    conn: &mut PgConnection,
    session_id: Uuid,
    human_mentor_id: Uuid,
    response: AvailabilityResponse,
    available_slots: &[NaiveDateTime],
    conflict_notes: Option<String>,
    now: NaiveDateTime,
) -> SchedulingResult<CouncilMentor> {
    if response == AvailabilityResponse::Pending {
        return Err(SchedulingError::Validation(
            "response must be available, unavailable, or tentative".into(),
        ));
    }

    conn.transaction::<CouncilMentor, SchedulingError, _>(|conn| {
        let session: CouncilSession = council_sessions::table
            .find(session_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or(SchedulingError::NotFound("council session"))?;

        let coordination: CoordinationStatus = session.coordination_status.parse()?;
        if coordination.is_terminal() {
            return Err(SchedulingError::Conflict(format!(
                "coordination is already {coordination}"
            )));
        }

        let membership: CouncilMentor = council_mentors::table
            .filter(council_mentors::council_session_id.eq(session_id))
            .filter(council_mentors::human_mentor_id.eq(human_mentor_id))
            .first(conn)
            .optional()?
            .ok_or(SchedulingError::NotFound("council mentor"))?;

        diesel::update(council_mentors::table.find(membership.id))
            .set((
                council_mentors::availability_response.eq(response.as_str()),
                council_mentors::response_date.eq(Some(now)),
                council_mentors::available_time_slots.eq(slots_to_json(available_slots)?),
                council_mentors::conflict_notes.eq(conflict_notes),
            ))
            .execute(conn)?;

        if coordination == CoordinationStatus::Pending {
            diesel::update(council_sessions::table.find(session_id))
                .set((
                    council_sessions::coordination_status
                        .eq(CoordinationStatus::Coordinating.as_str()),
                    council_sessions::updated_at.eq(now),
                ))
                .execute(conn)?;
        }

        let updated = council_mentors::table.find(membership.id).first(conn)?;
        Ok(updated)
    })
}

/// Picks the first proposed slot (in proposal order) that enough mentors can
/// attend. Earliest proposal wins; who answered first is irrelevant.
fn first_qualifying_slot(
    proposed: &[NaiveDateTime],
    responses: &[(AvailabilityResponse, Vec<NaiveDateTime>)],
    minimum: usize,
) -> Option<NaiveDateTime> {
    proposed
        .iter()
        .find(|slot| {
            responses
                .iter()
                .filter(|(response, slots)| {
                    *response == AvailabilityResponse::Available && slots.contains(slot)
                })
                .count()
                >= minimum
        })
        .copied()
}

/// Attempts to settle the session on a final time. Idempotent once confirmed;
/// `failed` is terminal and only a fresh proposal restarts coordination.
pub fn try_confirm(
    conn: &mut PgConnection,
    session_id: Uuid,
    now: NaiveDateTime,
) -> SchedulingResult<CouncilSession> {
    conn.transaction::<CouncilSession, SchedulingError, _>(|conn| {
        let session: CouncilSession = council_sessions::table
            .find(session_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or(SchedulingError::NotFound("council session"))?;

        let coordination: CoordinationStatus = session.coordination_status.parse()?;
        if session.final_time_confirmed || coordination == CoordinationStatus::Failed {
            return Ok(session);
        }

        let proposed = slots_from_json(&session.proposed_time_slots)?;
        let members: Vec<CouncilMentor> = council_mentors::table
            .filter(council_mentors::council_session_id.eq(session_id))
            .load(conn)?;

        let mut responses = Vec::with_capacity(members.len());
        for member in &members {
            let response: AvailabilityResponse = member.availability_response.parse()?;
            let slots = slots_from_json(&member.available_time_slots)?;
            responses.push((response, slots));
        }

        let winner =
            first_qualifying_slot(&proposed, &responses, session.mentor_minimum as usize);

        if let Some(slot) = winner {
            diesel::update(council_sessions::table.find(session_id))
                .set((
                    council_sessions::scheduled_date.eq(slot),
                    council_sessions::final_time_confirmed.eq(true),
                    council_sessions::coordination_status
                        .eq(CoordinationStatus::Confirmed.as_str()),
                    council_sessions::updated_at.eq(now),
                ))
                .execute(conn)?;

            let confirmed_ids: Vec<Uuid> = members
                .iter()
                .zip(&responses)
                .filter(|(_, (response, slots))| {
                    *response == AvailabilityResponse::Available && slots.contains(&slot)
                })
                .map(|(member, _)| member.id)
                .collect();

            if !confirmed_ids.is_empty() {
                diesel::update(
                    council_mentors::table.filter(council_mentors::id.eq_any(&confirmed_ids)),
                )
                .set(council_mentors::confirmed.eq(true))
                .execute(conn)?;
            }
        } else if session
            .mentor_response_deadline
            .is_some_and(|deadline| now > deadline)
        {
            diesel::update(council_sessions::table.find(session_id))
                .set((
                    council_sessions::coordination_status
                        .eq(CoordinationStatus::Failed.as_str()),
                    council_sessions::updated_at.eq(now),
                ))
                .execute(conn)?;
        } else {
            return Ok(session);
        }

        let updated = council_sessions::table.find(session_id).first(conn)?;
        Ok(updated)
    })
}

/// Registers a mentee, holding the session row lock across the capacity
/// check and the counter bump.
pub fn register_participant(
    conn: &mut PgConnection,
    session_id: Uuid,
    mentee_id: Uuid,
    session_goals: Option<String>,
    questions: Option<String>,
    now: NaiveDateTime,
) -> SchedulingResult<CouncilParticipant> {
    conn.transaction::<CouncilParticipant, SchedulingError, _>(|conn| {
        let session: CouncilSession = council_sessions::table
            .find(session_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or(SchedulingError::NotFound("council session"))?;

        let mentee_exists: Option<Uuid> = users::table
            .find(mentee_id)
            .select(users::id)
            .first(conn)
            .optional()?;
        if mentee_exists.is_none() {
            return Err(SchedulingError::NotFound("user"));
        }

        if session.current_mentees >= session.max_mentees {
            return Err(SchedulingError::Capacity("council session is full"));
        }

        let new_participant = NewCouncilParticipant {
            id: Uuid::new_v4(),
            council_session_id: session_id,
            mentee_id,
            session_goals,
            questions,
            status: "registered".to_string(),
        };

        match diesel::insert_into(council_participants::table)
            .values(&new_participant)
            .execute(conn)
        {
            Ok(_) => {}
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                return Err(SchedulingError::Conflict(
                    "mentee is already registered for this session".into(),
                ));
            }
            Err(err) => return Err(err.into()),
        }

        diesel::update(council_sessions::table.find(session_id))
            .set((
                council_sessions::current_mentees.eq(session.current_mentees + 1),
                council_sessions::updated_at.eq(now),
            ))
            .execute(conn)?;

        let row = council_participants::table
            .find(new_participant.id)
            .first(conn)?;
        Ok(row)
    })
}

pub(crate) fn slots_to_json(slots: &[NaiveDateTime]) -> SchedulingResult<serde_json::Value> {
    serde_json::to_value(slots)
        .map_err(|err| SchedulingError::Validation(format!("could not encode time slots: {err}")))
}

pub(crate) fn slots_from_json(value: &serde_json::Value) -> SchedulingResult<Vec<NaiveDateTime>> {
    serde_json::from_value(value.clone()).map_err(|err| {
        SchedulingError::Conflict(format!("stored time slots are malformed: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::first_qualifying_slot;
    use crate::scheduling::AvailabilityResponse::{self, *};
    use chrono::{NaiveDate, NaiveDateTime};

    fn dt(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn respond(
        response: AvailabilityResponse,
        slots: &[NaiveDateTime],
    ) -> (AvailabilityResponse, Vec<NaiveDateTime>) {
        (response, slots.to_vec())
    }

    #[test]
    fn later_proposal_with_quorum_beats_earlier_without() {
        let t1 = dt(1, 10);
        let t2 = dt(2, 10);
        // A, B, C can make T2; D, E only T1. Minimum of three: T2 wins even
        // though T1 is listed first and D/E answered for it.
        let responses = vec![
            respond(Available, &[t2]),
            respond(Available, &[t2]),
            respond(Available, &[t2]),
            respond(Available, &[t1]),
            respond(Available, &[t1]),
        ];
        assert_eq!(first_qualifying_slot(&[t1, t2], &responses, 3), Some(t2));
    }

    #[test]
    fn proposal_order_breaks_ties() {
        let t1 = dt(1, 10);
        let t2 = dt(2, 10);
        let responses = vec![
            respond(Available, &[t1, t2]),
            respond(Available, &[t1, t2]),
            respond(Available, &[t1, t2]),
        ];
        // Both qualify; the first proposed slot is chosen.
        assert_eq!(first_qualifying_slot(&[t2, t1], &responses, 3), Some(t2));
    }

    #[test]
    fn tentative_and_unavailable_do_not_count() {
        let t1 = dt(1, 10);
        let responses = vec![
            respond(Available, &[t1]),
            respond(Tentative, &[t1]),
            respond(Unavailable, &[t1]),
            respond(Pending, &[]),
        ];
        assert_eq!(first_qualifying_slot(&[t1], &responses, 2), None);
    }

    #[test]
    fn no_slot_without_quorum() {
        let t1 = dt(1, 10);
        let responses = vec![respond(Available, &[t1])];
        assert_eq!(first_qualifying_slot(&[t1], &responses, 3), None);
    }
}
