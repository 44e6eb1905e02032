//! Individual session booking: transactional create with a write-time
//! availability re-check, plus the pure status-transition validator.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::result::DatabaseErrorInformation;
use diesel::PgConnection;
use uuid::Uuid;

use crate::models::{HumanMentor, NewSessionBooking, SessionBooking};
use crate::schema::{
    council_mentors, council_sessions, human_mentors, mentor_availability, mentor_unavailability,
    session_bookings, users,
};

use super::availability::{
    candidate_slots, AvailabilityInputs, BlockedPeriod, BusySession, SchedulingPolicy, WeeklyRule,
};
use super::{
    parse_timezone, BookingStatus, MeetingType, SchedulingError, SchedulingResult, SessionType,
};

const OVERLAP_CONSTRAINT: &str = "session_bookings_no_overlap";
const MAX_DURATION_MINUTES: i32 = 480;

#[derive(Debug)]
pub struct BookingRequest {
    pub mentee_id: Uuid,
    pub human_mentor_id: Uuid,
    pub scheduled_date: NaiveDateTime,
    pub duration_minutes: i32,
    pub session_type: SessionType,
    pub meeting_type: MeetingType,
    pub timezone: String,
    pub session_goals: Option<String>,
    pub mentee_questions: Option<String>,
    pub calendly_event_id: Option<String>,
    pub calendly_event_url: Option<String>,
}

/// Whether `requested` may follow `current`. Terminal states admit nothing;
/// `scheduled -> completed` is a permitted skip-forward.
pub fn transition_allowed(current: BookingStatus, requested: BookingStatus) -> bool {
    use BookingStatus::*;
    match (current, requested) {
        (Scheduled, Confirmed | Completed | Cancelled | NoShow) => true,
        (Confirmed, Completed | Cancelled | NoShow) => true,
        _ => false,
    }
}

/// Creates a booking with status `scheduled`. The requested instant is
/// re-derived against current stored state inside the transaction, with the
/// mentor row locked; the overlap exclusion constraint is the final guard, so
/// of two concurrent requests for the same window exactly one succeeds.
pub fn create_booking(
    conn: &mut PgConnection,
    request: &BookingRequest,
    now: NaiveDateTime,
) -> SchedulingResult<SessionBooking> {
    if request.duration_minutes <= 0 || request.duration_minutes > MAX_DURATION_MINUTES {
        return Err(SchedulingError::Validation(format!(
            "duration must be between 1 and {MAX_DURATION_MINUTES} minutes"
        )));
    }
    if request.scheduled_date <= now {
        return Err(SchedulingError::Validation(
            "scheduled date must be in the future".into(),
        ));
    }
    parse_timezone(&request.timezone)?;

    conn.transaction::<SessionBooking, SchedulingError, _>(|conn| {
        let mentee_exists: Option<Uuid> = users::table
            .find(request.mentee_id)
            .select(users::id)
            .first(conn)
            .optional()?;
        if mentee_exists.is_none() {
            return Err(SchedulingError::NotFound("user"));
        }

        let mentor: HumanMentor = human_mentors::table
            .find(request.human_mentor_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or(SchedulingError::NotFound("mentor"))?;

        if !mentor.is_active {
            return Err(SchedulingError::Validation(
                "mentor is not currently accepting bookings".into(),
            ));
        }

        if mentor.use_calendly {
            // External calendar is authoritative; its slots arrive pre-validated.
        } else {
            if request.meeting_type == MeetingType::Calendly {
                return Err(SchedulingError::Validation(
                    "mentor does not use an external calendar".into(),
                ));
            }
            let inputs = load_availability_inputs(conn, &mentor)?;
            let slots = candidate_slots(
                &mentor_policy(&mentor),
                &inputs,
                request.scheduled_date,
                request.scheduled_date,
                i64::from(request.duration_minutes),
                now,
            )?;
            if !slots.contains(&request.scheduled_date) {
                return Err(SchedulingError::SlotUnavailable);
            }
        }

        let new_booking = NewSessionBooking {
            id: Uuid::new_v4(),
            mentee_id: request.mentee_id,
            human_mentor_id: mentor.id,
            session_type: request.session_type.as_str().to_string(),
            duration: request.duration_minutes,
            scheduled_date: request.scheduled_date,
            timezone: request.timezone.clone(),
            meeting_type: request.meeting_type.as_str().to_string(),
            location: None,
            video_link: None,
            calendly_event_id: request.calendly_event_id.clone(),
            calendly_event_url: request.calendly_event_url.clone(),
            session_goals: request.session_goals.clone(),
            preparation_notes: None,
            mentee_questions: request.mentee_questions.clone(),
            status: BookingStatus::Scheduled.as_str().to_string(),
            reminder_sent: false,
            confirmation_sent: false,
        };

        if let Err(err) = diesel::insert_into(session_bookings::table)
            .values(&new_booking)
            .execute(conn)
        {
            return Err(match err {
                diesel::result::Error::DatabaseError(_, ref info)
                    if info.constraint_name() == Some(OVERLAP_CONSTRAINT) =>
                {
                    SchedulingError::SlotUnavailable
                }
                other => other.into(),
            });
        }

        let booking = session_bookings::table.find(new_booking.id).first(conn)?;
        Ok(booking)
    })
}

/// Applies a status transition after validating it, rejecting anything out of
/// a terminal state with a conflict.
pub fn apply_status_transition(
    conn: &mut PgConnection,
    booking_id: Uuid,
    requested: BookingStatus,
    now: NaiveDateTime,
) -> SchedulingResult<SessionBooking> {
    conn.transaction::<SessionBooking, SchedulingError, _>(|conn| {
        let booking: SessionBooking = session_bookings::table
            .find(booking_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or(SchedulingError::NotFound("booking"))?;

        let current: BookingStatus = booking.status.parse()?;
        if !transition_allowed(current, requested) {
            return Err(SchedulingError::Conflict(format!(
                "cannot move booking from {current} to {requested}"
            )));
        }

        diesel::update(session_bookings::table.find(booking_id))
            .set((
                session_bookings::status.eq(requested.as_str()),
                session_bookings::updated_at.eq(now),
            ))
            .execute(conn)?;

        let updated = session_bookings::table.find(booking_id).first(conn)?;
        Ok(updated)
    })
}

pub fn mentor_policy(mentor: &HumanMentor) -> SchedulingPolicy {
    SchedulingPolicy {
        buffer_minutes: i64::from(mentor.buffer_time),
        advance_booking_days: i64::from(mentor.advance_booking_days),
    }
}

/// Candidate slots for a natively scheduled mentor over a date range. Callers
/// handle the `use_calendly` branch before reaching this.
pub fn native_slots(
    conn: &mut PgConnection,
    mentor: &HumanMentor,
    range_start: NaiveDateTime,
    range_end: NaiveDateTime,
    duration_minutes: i64,
    now: NaiveDateTime,
) -> SchedulingResult<Vec<NaiveDateTime>> {
    let inputs = load_availability_inputs(conn, mentor)?;
    candidate_slots(
        &mentor_policy(mentor),
        &inputs,
        range_start,
        range_end,
        duration_minutes,
        now,
    )
}

/// Loads the engine inputs for one mentor: active weekly rules, unavailability
/// blocks, and every session already holding the calendar (non-cancelled
/// bookings plus finally-confirmed council seats).
pub fn load_availability_inputs(
    conn: &mut PgConnection,
    mentor: &HumanMentor,
) -> SchedulingResult<AvailabilityInputs> {
    let rule_rows: Vec<crate::models::MentorAvailability> = mentor_availability::table
        .filter(mentor_availability::human_mentor_id.eq(mentor.id))
        .filter(mentor_availability::is_active.eq(true))
        .load(conn)?;

    let mut rules = Vec::with_capacity(rule_rows.len());
    for row in rule_rows {
        rules.push(WeeklyRule {
            day_of_week: row.day_of_week,
            start_time: row.start_time,
            end_time: row.end_time,
            timezone: parse_timezone(&row.timezone)?,
            is_active: row.is_active,
        });
    }

    let block_rows: Vec<crate::models::MentorUnavailability> = mentor_unavailability::table
        .filter(mentor_unavailability::human_mentor_id.eq(mentor.id))
        .load(conn)?;

    let mut blocked = Vec::with_capacity(block_rows.len());
    for row in block_rows {
        let recurrence = if row.is_recurring {
            row.recurring_pattern.as_deref().map(str::parse).transpose()?
        } else {
            None
        };
        blocked.push(BlockedPeriod {
            start: row.start_date,
            end: row.end_date,
            recurrence,
        });
    }

    let booking_rows: Vec<(NaiveDateTime, i32)> = session_bookings::table
        .filter(session_bookings::human_mentor_id.eq(mentor.id))
        .filter(session_bookings::status.ne(BookingStatus::Cancelled.as_str()))
        .select((session_bookings::scheduled_date, session_bookings::duration))
        .load(conn)?;

    let council_rows: Vec<(NaiveDateTime, i32)> = council_mentors::table
        .inner_join(council_sessions::table)
        .filter(council_mentors::human_mentor_id.eq(mentor.id))
        .filter(council_mentors::confirmed.eq(true))
        .filter(council_sessions::final_time_confirmed.eq(true))
        .select((
            council_sessions::scheduled_date,
            council_sessions::duration,
        ))
        .load(conn)?;

    let busy = booking_rows
        .into_iter()
        .chain(council_rows)
        .map(|(start, duration)| BusySession {
            start,
            duration_minutes: i64::from(duration),
        })
        .collect();

    Ok(AvailabilityInputs {
        rules,
        blocked,
        busy,
    })
}

#[cfg(test)]
mod tests {
    use super::transition_allowed;
    use crate::scheduling::BookingStatus::*;

    #[test]
    fn scheduled_moves_forward_or_out() {
        assert!(transition_allowed(Scheduled, Confirmed));
        assert!(transition_allowed(Scheduled, Completed));
        assert!(transition_allowed(Scheduled, Cancelled));
        assert!(transition_allowed(Scheduled, NoShow));
        assert!(!transition_allowed(Scheduled, Scheduled));
    }

    #[test]
    fn confirmed_cannot_regress() {
        assert!(transition_allowed(Confirmed, Completed));
        assert!(transition_allowed(Confirmed, Cancelled));
        assert!(transition_allowed(Confirmed, NoShow));
        assert!(!transition_allowed(Confirmed, Scheduled));
        assert!(!transition_allowed(Confirmed, Confirmed));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for terminal in [Completed, Cancelled, NoShow] {
            for requested in [Scheduled, Confirmed, Completed, Cancelled, NoShow] {
                assert!(
                    !transition_allowed(terminal, requested),
                    "{terminal:?} -> {requested:?} must be rejected"
                );
            }
        }
    }
}
