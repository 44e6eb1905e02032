use chrono::{NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = organizations)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub org_type: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = organizations)]
pub struct NewOrganization {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub org_type: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = users)]
#[diesel(belongs_to(Organization))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_image: Option<String>,
    pub role: String,
    pub subscription_plan: String,
    pub messages_used: i32,
    pub messages_limit: i32,
    pub sessions_used: i32,
    pub sessions_limit: i32,
    pub organization_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub subscription_plan: String,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = ai_mentors)]
#[diesel(belongs_to(Organization))]
pub struct AiMentor {
    pub id: Uuid,
    pub name: String,
    pub personality: String,
    pub expertise: String,
    pub avatar: String,
    pub backstory: String,
    pub organization_id: Uuid,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = ai_mentors)]
pub struct NewAiMentor {
    pub id: Uuid,
    pub name: String,
    pub personality: String,
    pub expertise: String,
    pub avatar: String,
    pub backstory: String,
    pub organization_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = chat_messages)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(AiMentor))]
pub struct ChatMessage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ai_mentor_id: Uuid,
    pub content: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_messages)]
pub struct NewChatMessage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ai_mentor_id: Uuid,
    pub content: String,
    pub role: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = human_mentors)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Organization))]
pub struct HumanMentor {
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
    pub calendly_url: Option<String>,
    pub calendly_event_type: Option<String>,
    pub use_calendly: bool,
    pub default_session_duration: i32,
    pub buffer_time: i32,
    pub advance_booking_days: i32,
    pub timezone: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = human_mentors)]
pub struct NewHumanMentor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expertise: String,
    pub bio: String,
    pub experience: String,
    pub hourly_rate_cents: i32,
    pub organization_id: Uuid,
    pub use_calendly: bool,
    pub default_session_duration: i32,
    pub buffer_time: i32,
    pub advance_booking_days: i32,
    pub timezone: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = mentor_availability)]
#[diesel(belongs_to(HumanMentor))]
pub struct MentorAvailability {
    pub id: Uuid,
    pub human_mentor_id: Uuid,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = mentor_availability)]
pub struct NewMentorAvailability {
    pub id: Uuid,
    pub human_mentor_id: Uuid,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = mentor_unavailability)]
#[diesel(belongs_to(HumanMentor))]
pub struct MentorUnavailability {
    pub id: Uuid,
    pub human_mentor_id: Uuid,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub reason: Option<String>,
    pub is_recurring: bool,
    pub recurring_pattern: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = mentor_unavailability)]
pub struct NewMentorUnavailability {
    pub id: Uuid,
    pub human_mentor_id: Uuid,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub reason: Option<String>,
    pub is_recurring: bool,
    pub recurring_pattern: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = session_bookings)]
#[diesel(belongs_to(HumanMentor))]
pub struct SessionBooking {
    pub id: Uuid,
    pub mentee_id: Uuid,
    pub human_mentor_id: Uuid,
    pub session_type: String,
    pub duration: i32,
    pub scheduled_date: NaiveDateTime,
    pub timezone: String,
    pub meeting_type: String,
    pub location: Option<String>,
    pub video_link: Option<String>,
    pub calendly_event_id: Option<String>,
    pub calendly_event_url: Option<String>,
    pub session_goals: Option<String>,
    pub preparation_notes: Option<String>,
    pub mentee_questions: Option<String>,
    pub status: String,
    pub session_notes: Option<String>,
    pub follow_up_actions: Option<String>,
    pub mentor_rating: Option<i32>,
    pub mentee_rating: Option<i32>,
    pub feedback: Option<String>,
    pub reminder_sent: bool,
    pub confirmation_sent: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = session_bookings)]
pub struct NewSessionBooking {
    pub id: Uuid,
    pub mentee_id: Uuid,
    pub human_mentor_id: Uuid,
    pub session_type: String,
    pub duration: i32,
    pub scheduled_date: NaiveDateTime,
    pub timezone: String,
    pub meeting_type: String,
    pub location: Option<String>,
    pub video_link: Option<String>,
    pub calendly_event_id: Option<String>,
    pub calendly_event_url: Option<String>,
    pub session_goals: Option<String>,
    pub preparation_notes: Option<String>,
    pub mentee_questions: Option<String>,
    pub status: String,
    pub reminder_sent: bool,
    pub confirmation_sent: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = council_sessions)]
#[diesel(belongs_to(Organization))]
pub struct CouncilSession {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: NaiveDateTime,
    pub duration: i32,
    pub timezone: String,
    pub max_mentees: i32,
    pub current_mentees: i32,
    pub meeting_type: String,
    pub video_link: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub organization_id: Option<Uuid>,
    pub proposed_time_slots: serde_json::Value,
    pub mentor_response_deadline: Option<NaiveDateTime>,
    pub final_time_confirmed: bool,
    pub coordinator_notes: Option<String>,
    pub mentor_minimum: i32,
    pub mentor_maximum: i32,
    pub coordination_status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = council_sessions)]
pub struct NewCouncilSession {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: NaiveDateTime,
    pub duration: i32,
    pub timezone: String,
    pub max_mentees: i32,
    pub meeting_type: String,
    pub status: String,
    pub organization_id: Option<Uuid>,
    pub proposed_time_slots: serde_json::Value,
    pub mentor_response_deadline: Option<NaiveDateTime>,
    pub coordinator_notes: Option<String>,
    pub mentor_minimum: i32,
    pub mentor_maximum: i32,
    pub coordination_status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = council_mentors)]
#[diesel(belongs_to(CouncilSession))]
#[diesel(belongs_to(HumanMentor))]
pub struct CouncilMentor {
    pub id: Uuid,
    pub council_session_id: Uuid,
    pub human_mentor_id: Uuid,
    pub role: String,
    pub confirmed: bool,
    pub availability_response: String,
    pub response_date: Option<NaiveDateTime>,
    pub available_time_slots: serde_json::Value,
    pub conflict_notes: Option<String>,
    pub notification_sent: bool,
    pub last_reminder_sent: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = council_mentors)]
pub struct NewCouncilMentor {
    pub id: Uuid,
    pub council_session_id: Uuid,
    pub human_mentor_id: Uuid,
    pub role: String,
    pub availability_response: String,
    pub available_time_slots: serde_json::Value,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = council_participants)]
#[diesel(belongs_to(CouncilSession))]
pub struct CouncilParticipant {
    pub id: Uuid,
    pub council_session_id: Uuid,
    pub mentee_id: Uuid,
    pub session_goals: Option<String>,
    pub questions: Option<String>,
    pub registration_date: NaiveDateTime,
    pub status: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = council_participants)]
pub struct NewCouncilParticipant {
    pub id: Uuid,
    pub council_session_id: Uuid,
    pub mentee_id: Uuid,
    pub session_goals: Option<String>,
    pub questions: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = mentor_applications)]
pub struct MentorApplication {
    pub id: Uuid,
    pub applicant_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub age: Option<i32>,
    pub bio: String,
    pub expertise: String,
    pub years_experience: Option<i32>,
    pub life_stories: serde_json::Value,
    pub challenges: serde_json::Value,
    pub quotes: serde_json::Value,
    pub principles: serde_json::Value,
    pub career_wisdom: Option<String>,
    pub relationship_advice: Option<String>,
    pub parenting_insights: Option<String>,
    pub spiritual_guidance: Option<String>,
    pub financial_wisdom: Option<String>,
    pub organization_id: Option<Uuid>,
    pub status: String,
    pub admin_notes: Option<String>,
    pub interview_date: Option<NaiveDateTime>,
    pub approved_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = mentor_applications)]
pub struct NewMentorApplication {
    pub id: Uuid,
    pub applicant_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub age: Option<i32>,
    pub bio: String,
    pub expertise: String,
    pub years_experience: Option<i32>,
    pub life_stories: serde_json::Value,
    pub challenges: serde_json::Value,
    pub quotes: serde_json::Value,
    pub principles: serde_json::Value,
    pub career_wisdom: Option<String>,
    pub relationship_advice: Option<String>,
    pub parenting_insights: Option<String>,
    pub spiritual_guidance: Option<String>,
    pub financial_wisdom: Option<String>,
    pub organization_id: Option<Uuid>,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = refresh_tokens)]
#[diesel(belongs_to(User))]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}
