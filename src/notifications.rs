//! Notification dispatch. The coordinators only flip `confirmation_sent` /
//! `reminder_sent` / `notification_sent` flags; this worker consumes them,
//! claiming one row at a time with `FOR UPDATE SKIP LOCKED` so several
//! notifier processes can drain the same database.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use serde_json::json;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::models::{CouncilMentor, CouncilSession, SessionBooking};
use crate::scheduling::BookingStatus;
use crate::schema::{council_mentors, council_sessions, session_bookings};
use crate::state::AppState;

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn booking_confirmation(&self, booking: &SessionBooking) -> Result<()>;
    async fn booking_reminder(&self, booking: &SessionBooking) -> Result<()>;
    async fn council_invitation(
        &self,
        session: &CouncilSession,
        mentor: &CouncilMentor,
    ) -> Result<()>;
}

/// Posts one JSON event per notification to a configured webhook.
pub struct WebhookNotifier {
    http: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn post(&self, payload: serde_json::Value) -> Result<()> {
        self.http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .context("notification webhook request failed")?
            .error_for_status()
            .context("notification webhook rejected the event")?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn booking_confirmation(&self, booking: &SessionBooking) -> Result<()> {
        self.post(json!({
            "event": "booking.confirmation",
            "booking_id": booking.id,
            "mentee_id": booking.mentee_id,
            "human_mentor_id": booking.human_mentor_id,
            "scheduled_date": booking.scheduled_date.and_utc().to_rfc3339(),
        }))
        .await
    }

    async fn booking_reminder(&self, booking: &SessionBooking) -> Result<()> {
        self.post(json!({
            "event": "booking.reminder",
            "booking_id": booking.id,
            "mentee_id": booking.mentee_id,
            "human_mentor_id": booking.human_mentor_id,
            "scheduled_date": booking.scheduled_date.and_utc().to_rfc3339(),
        }))
        .await
    }

    async fn council_invitation(
        &self,
        session: &CouncilSession,
        mentor: &CouncilMentor,
    ) -> Result<()> {
        self.post(json!({
            "event": "council.invitation",
            "council_session_id": session.id,
            "human_mentor_id": mentor.human_mentor_id,
            "title": session.title,
            "response_deadline": session
                .mentor_response_deadline
                .map(|deadline| deadline.and_utc().to_rfc3339()),
        }))
        .await
    }
}

/// Fallback sink when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_confirmation(&self, booking: &SessionBooking) -> Result<()> {
        info!(booking_id = %booking.id, "booking confirmation dispatched");
        Ok(())
    }

    async fn booking_reminder(&self, booking: &SessionBooking) -> Result<()> {
        info!(booking_id = %booking.id, "booking reminder dispatched");
        Ok(())
    }

    async fn council_invitation(
        &self,
        session: &CouncilSession,
        mentor: &CouncilMentor,
    ) -> Result<()> {
        info!(
            council_session_id = %session.id,
            human_mentor_id = %mentor.human_mentor_id,
            "council invitation dispatched"
        );
        Ok(())
    }
}

/// Claims the oldest booking still owed a confirmation and flips its flag.
pub fn claim_unsent_confirmation(conn: &mut PgConnection) -> QueryResult<Option<SessionBooking>> {
    let now = Utc::now().naive_utc();
    conn.transaction(|conn| {
        let booking = session_bookings::table
            .filter(session_bookings::confirmation_sent.eq(false))
            .filter(session_bookings::status.ne(BookingStatus::Cancelled.as_str()))
            .order(session_bookings::created_at.asc())
            .for_update()
            .skip_locked()
            .first::<SessionBooking>(conn)
            .optional()?;

        if let Some(booking) = booking {
            diesel::update(session_bookings::table.find(booking.id))
                .set((
                    session_bookings::confirmation_sent.eq(true),
                    session_bookings::updated_at.eq(now),
                ))
                .execute(conn)?;
            let refreshed = session_bookings::table.find(booking.id).first(conn)?;
            Ok(Some(refreshed))
        } else {
            Ok(None)
        }
    })
}

/// Claims the next booking inside the reminder window.
pub fn claim_due_reminder(
    conn: &mut PgConnection,
    now: NaiveDateTime,
    lead: Duration,
) -> QueryResult<Option<SessionBooking>> {
    conn.transaction(|conn| {
        let booking = session_bookings::table
            .filter(session_bookings::reminder_sent.eq(false))
            .filter(
                session_bookings::status
                    .eq_any([BookingStatus::Scheduled.as_str(), BookingStatus::Confirmed.as_str()]),
            )
            .filter(session_bookings::scheduled_date.gt(now))
            .filter(session_bookings::scheduled_date.le(now + lead))
            .order(session_bookings::scheduled_date.asc())
            .for_update()
            .skip_locked()
            .first::<SessionBooking>(conn)
            .optional()?;

        if let Some(booking) = booking {
            diesel::update(session_bookings::table.find(booking.id))
                .set((
                    session_bookings::reminder_sent.eq(true),
                    session_bookings::updated_at.eq(now),
                ))
                .execute(conn)?;
            let refreshed = session_bookings::table.find(booking.id).first(conn)?;
            Ok(Some(refreshed))
        } else {
            Ok(None)
        }
    })
}

/// Claims the next council invitation that has not gone out yet.
pub fn claim_unsent_council_invite(
    conn: &mut PgConnection,
    now: NaiveDateTime,
) -> QueryResult<Option<(CouncilMentor, CouncilSession)>> {
    conn.transaction(|conn| {
        let pair = council_mentors::table
            .inner_join(council_sessions::table)
            .filter(council_mentors::notification_sent.eq(false))
            .order(council_mentors::created_at.asc())
            .for_update()
            .skip_locked()
            .first::<(CouncilMentor, CouncilSession)>(conn)
            .optional()?;

        if let Some((mentor, session)) = pair {
            diesel::update(council_mentors::table.find(mentor.id))
                .set((
                    council_mentors::notification_sent.eq(true),
                    council_mentors::last_reminder_sent.eq(Some(now)),
                ))
                .execute(conn)?;
            let refreshed = council_mentors::table.find(mentor.id).first(conn)?;
            Ok(Some((refreshed, session)))
        } else {
            Ok(None)
        }
    })
}

pub struct NotificationWorker {
    state: Arc<AppState>,
    notifier: Arc<dyn Notifier>,
    poll_interval: StdDuration,
}

impl NotificationWorker {
    pub fn new(
        state: Arc<AppState>,
        notifier: Arc<dyn Notifier>,
        poll_interval: StdDuration,
    ) -> Self {
        Self {
            state,
            notifier,
            poll_interval,
        }
    }

    pub async fn run(&self) {
        info!("notification worker started");
        loop {
            match self.tick().await {
                Ok(true) => {}
                Ok(false) => sleep(self.poll_interval).await,
                Err(err) => {
                    error!(error = %err, "notification tick failed");
                    sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Dispatches at most one notification. Returns whether anything was due.
    async fn tick(&self) -> Result<bool> {
        let mut conn = match self.state.db() {
            Ok(conn) => conn,
            Err(err) => {
                error!(?err, "failed to obtain database connection in notifier");
                return Ok(false);
            }
        };
        let now = Utc::now().naive_utc();
        let lead = Duration::minutes(self.state.config.reminder_lead_minutes);

        if let Some(booking) = claim_unsent_confirmation(&mut conn)? {
            drop(conn);
            if let Err(err) = self.notifier.booking_confirmation(&booking).await {
                warn!(booking_id = %booking.id, error = %err, "confirmation dispatch failed");
                self.reset_confirmation_flag(booking.id);
            }
            return Ok(true);
        }

        if let Some(booking) = claim_due_reminder(&mut conn, now, lead)? {
            drop(conn);
            if let Err(err) = self.notifier.booking_reminder(&booking).await {
                warn!(booking_id = %booking.id, error = %err, "reminder dispatch failed");
                self.reset_reminder_flag(booking.id);
            }
            return Ok(true);
        }

        if let Some((mentor, session)) = claim_unsent_council_invite(&mut conn, now)? {
            drop(conn);
            if let Err(err) = self.notifier.council_invitation(&session, &mentor).await {
                warn!(
                    council_session_id = %session.id,
                    error = %err,
                    "council invitation dispatch failed"
                );
                if let Ok(mut conn) = self.state.db() {
                    let _ = diesel::update(council_mentors::table.find(mentor.id))
                        .set(council_mentors::notification_sent.eq(false))
                        .execute(&mut conn);
                }
            }
            return Ok(true);
        }

        Ok(false)
    }

    // Best-effort rollbacks so a failed dispatch is retried on a later tick.
    fn reset_confirmation_flag(&self, booking_id: uuid::Uuid) {
        if let Ok(mut conn) = self.state.db() {
            let _ = diesel::update(session_bookings::table.find(booking_id))
                .set(session_bookings::confirmation_sent.eq(false))
                .execute(&mut conn);
        }
    }

    fn reset_reminder_flag(&self, booking_id: uuid::Uuid) {
        if let Ok(mut conn) = self.state.db() {
            let _ = diesel::update(session_bookings::table.find(booking_id))
                .set(session_bookings::reminder_sent.eq(false))
                .execute(&mut conn);
        }
    }
}
