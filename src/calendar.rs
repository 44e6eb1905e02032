//! External calendar collaborator. When a mentor delegates scheduling
//! (`use_calendly`), the provider is authoritative: the slots it returns are
//! treated as opaque, already-valid candidates and the availability engine is
//! never consulted.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::models::HumanMentor;

#[async_trait]
pub trait CalendarService: Send + Sync + 'static {
    /// Candidate start instants (UTC) for the mentor's external event type
    /// within `[range_start, range_end]`.
    async fn mentor_slots(
        &self,
        mentor: &HumanMentor,
        range_start: NaiveDateTime,
        range_end: NaiveDateTime,
    ) -> Result<Vec<NaiveDateTime>>;
}

pub struct CalendlyClient {
    http: reqwest::Client,
    api_base: String,
    api_token: Option<String>,
}

impl CalendlyClient {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.calendly_api_base.trim_end_matches('/').to_string(),
            api_token: config.calendly_api_token.clone(),
        }
    }
}

#[derive(Deserialize)]
struct AvailableTimesResponse {
    collection: Vec<AvailableTime>,
}

#[derive(Deserialize)]
struct AvailableTime {
    start_time: DateTime<Utc>,
}

#[async_trait]
impl CalendarService for CalendlyClient {
    async fn mentor_slots(
        &self,
        mentor: &HumanMentor,
        range_start: NaiveDateTime,
        range_end: NaiveDateTime,
    ) -> Result<Vec<NaiveDateTime>> {
        let Some(event_type) = mentor.calendly_event_type.as_deref() else {
            bail!("mentor has no external event type configured");
        };

        let mut request = self
            .http
            .get(format!("{}/event_type_available_times", self.api_base))
            .query(&[
                ("event_type", event_type),
                ("start_time", &range_start.and_utc().to_rfc3339()),
                ("end_time", &range_end.and_utc().to_rfc3339()),
            ]);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("calendar provider request failed")?
            .error_for_status()
            .context("calendar provider returned an error")?;

        let body: AvailableTimesResponse = response
            .json()
            .await
            .context("calendar provider returned malformed availability")?;

        let mut slots: Vec<NaiveDateTime> = body
            .collection
            .into_iter()
            .map(|entry| entry.start_time.naive_utc())
            .collect();
        slots.sort();
        slots.dedup();
        Ok(slots)
    }
}
