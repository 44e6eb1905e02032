//! Session-coordination core: availability computation, individual booking,
//! and council coordination. Everything here is transport-agnostic; the HTTP
//! layer maps `SchedulingError` onto response codes.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub mod availability;
pub mod booking;
pub mod council;

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("{0}")]
    Validation(String),
    #[error("requested slot is no longer available")]
    SlotUnavailable,
    #[error("{0}")]
    Capacity(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

pub type SchedulingResult<T> = Result<T, SchedulingError>;

fn unknown_value(what: &str, value: &str) -> SchedulingError {
    SchedulingError::Validation(format!("unknown {what}: {value}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Scheduled => "scheduled",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }
}

impl FromStr for BookingStatus {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(BookingStatus::Scheduled),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "no_show" => Ok(BookingStatus::NoShow),
            other => Err(unknown_value("booking status", other)),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    Individual,
    Council,
}

impl SessionType {
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionType::Individual => "individual",
            SessionType::Council => "council",
        }
    }
}

impl FromStr for SessionType {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(SessionType::Individual),
            "council" => Ok(SessionType::Council),
            other => Err(unknown_value("session type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingType {
    Video,
    InPerson,
    Calendly,
}

impl MeetingType {
    pub const fn as_str(self) -> &'static str {
        match self {
            MeetingType::Video => "video",
            MeetingType::InPerson => "in_person",
            MeetingType::Calendly => "calendly",
        }
    }
}

impl FromStr for MeetingType {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(MeetingType::Video),
            "in_person" => Ok(MeetingType::InPerson),
            "calendly" => Ok(MeetingType::Calendly),
            other => Err(unknown_value("meeting type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityResponse {
    Pending,
    Available,
    Unavailable,
    Tentative,
}

impl AvailabilityResponse {
    pub const fn as_str(self) -> &'static str {
        match self {
            AvailabilityResponse::Pending => "pending",
            AvailabilityResponse::Available => "available",
            AvailabilityResponse::Unavailable => "unavailable",
            AvailabilityResponse::Tentative => "tentative",
        }
    }
}

impl FromStr for AvailabilityResponse {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AvailabilityResponse::Pending),
            "available" => Ok(AvailabilityResponse::Available),
            "unavailable" => Ok(AvailabilityResponse::Unavailable),
            "tentative" => Ok(AvailabilityResponse::Tentative),
            other => Err(unknown_value("availability response", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinationStatus {
    Pending,
    Coordinating,
    Confirmed,
    Failed,
}

impl CoordinationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            CoordinationStatus::Pending => "pending",
            CoordinationStatus::Coordinating => "coordinating",
            CoordinationStatus::Confirmed => "confirmed",
            CoordinationStatus::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            CoordinationStatus::Confirmed | CoordinationStatus::Failed
        )
    }
}

impl FromStr for CoordinationStatus {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CoordinationStatus::Pending),
            "coordinating" => Ok(CoordinationStatus::Coordinating),
            "confirmed" => Ok(CoordinationStatus::Confirmed),
            "failed" => Ok(CoordinationStatus::Failed),
            other => Err(unknown_value("coordination status", other)),
        }
    }
}

impl fmt::Display for CoordinationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurringPattern {
    Daily,
    Weekly,
    Monthly,
}

impl RecurringPattern {
    pub const fn as_str(self) -> &'static str {
        match self {
            RecurringPattern::Daily => "daily",
            RecurringPattern::Weekly => "weekly",
            RecurringPattern::Monthly => "monthly",
        }
    }
}

impl FromStr for RecurringPattern {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(RecurringPattern::Daily),
            "weekly" => Ok(RecurringPattern::Weekly),
            "monthly" => Ok(RecurringPattern::Monthly),
            other => Err(unknown_value("recurring pattern", other)),
        }
    }
}

pub fn parse_timezone(name: &str) -> SchedulingResult<chrono_tz::Tz> {
    name.parse::<chrono_tz::Tz>()
        .map_err(|_| SchedulingError::Validation(format!("unknown timezone: {name}")))
}
