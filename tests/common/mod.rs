use std::env;
use std::sync::Arc;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use http_body_util::BodyExt;
use mentorhub::auth::jwt::JwtService;
use mentorhub::auth::password;
use mentorhub::calendar::CalendarService;
use mentorhub::config::AppConfig;
use mentorhub::db::{self, PgPool};
use mentorhub::models::{
    HumanMentor, NewHumanMentor, NewMentorAvailability, NewOrganization, NewUser, SessionBooking,
};
use mentorhub::routes;
use mentorhub::state::AppState;
use once_cell::sync::Lazy;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// In-memory stand-in for the external calendar provider. Tests preload the
/// slots it should hand back for Calendly-delegated mentors.
#[derive(Default)]
pub struct FakeCalendar {
    slots: std::sync::Mutex<Vec<NaiveDateTime>>,
}

impl FakeCalendar {
    #[allow(dead_code)]
    pub fn set_slots(&self, slots: Vec<NaiveDateTime>) {
        *self.slots.lock().expect("calendar lock poisoned") = slots;
    }
}

#[async_trait]
impl CalendarService for FakeCalendar {
    async fn mentor_slots(
        &self,
        _mentor: &HumanMentor,
        range_start: NaiveDateTime,
        range_end: NaiveDateTime,
    ) -> Result<Vec<NaiveDateTime>> {
        let guard = self.slots.lock().expect("calendar lock poisoned");
        Ok(guard
            .iter()
            .copied()
            .filter(|slot| *slot >= range_start && *slot <= range_end)
            .collect())
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    calendar: Arc<FakeCalendar>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            refresh_token_expiry_days: 30,
            refresh_cookie_secure: false,
            refresh_cookie_domain: None,
            cors_allowed_origin: None,
            calendly_api_base: "http://127.0.0.1:0".to_string(),
            calendly_api_token: None,
            notifier_webhook_url: None,
            notifier_poll_seconds: 1,
            reminder_lead_minutes: 1440,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let calendar = Arc::new(FakeCalendar::default());
        let calendar_for_state: Arc<dyn CalendarService> = calendar.clone();
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool.clone(), config, calendar_for_state, jwt);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            calendar,
        })
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    #[allow(dead_code)]
    pub fn calendar(&self) -> Arc<FakeCalendar> {
        self.calendar.clone()
    }

    pub async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<Uuid> {
        let username = username.to_string();
        let email = email.to_string();
        let password = password.to_string();
        let role = role.to_string();
        self.with_conn(move |conn| {
            let password_hash = password::hash_password(&password)?;
            let user = NewUser {
                id: Uuid::new_v4(),
                username,
                email,
                password_hash,
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                role,
                subscription_plan: "ai-only".to_string(),
                organization_id: None,
            };
            diesel::insert_into(mentorhub::schema::users::table)
                .values(&user)
                .execute(conn)
                .context("failed to insert user")?;
            Ok(user.id)
        })
        .await
    }

    pub async fn insert_organization(&self, name: &str) -> Result<Uuid> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let org = NewOrganization {
                id: Uuid::new_v4(),
                name,
                description: String::new(),
                org_type: "business".to_string(),
            };
            diesel::insert_into(mentorhub::schema::organizations::table)
                .values(&org)
                .execute(conn)
                .context("failed to insert organization")?;
            Ok(org.id)
        })
        .await
    }

    /// Seeds a mentor with the default native-scheduling knobs: 30-minute
    /// sessions, 15-minute buffer, 30-day booking horizon.
    pub async fn insert_mentor(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        use_calendly: bool,
    ) -> Result<Uuid> {
        self.with_conn(move |conn| {
            let mentor = NewHumanMentor {
                id: Uuid::new_v4(),
                user_id,
                expertise: "career".to_string(),
                bio: "seasoned mentor".to_string(),
                experience: String::new(),
                hourly_rate_cents: 5000,
                organization_id,
                use_calendly,
                default_session_duration: 30,
                buffer_time: 15,
                advance_booking_days: 30,
                timezone: "UTC".to_string(),
            };
            diesel::insert_into(mentorhub::schema::human_mentors::table)
                .values(&mentor)
                .execute(conn)
                .context("failed to insert mentor")?;
            Ok(mentor.id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn insert_availability(
        &self,
        mentor_id: Uuid,
        day_of_week: i32,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<Uuid> {
        self.with_conn(move |conn| {
            let rule = NewMentorAvailability {
                id: Uuid::new_v4(),
                human_mentor_id: mentor_id,
                day_of_week,
                start_time: start,
                end_time: end,
                timezone: "UTC".to_string(),
            };
            diesel::insert_into(mentorhub::schema::mentor_availability::table)
                .values(&rule)
                .execute(conn)
                .context("failed to insert availability rule")?;
            Ok(rule.id)
        })
        .await
    }

    pub async fn login_token(&self, email: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            email: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json("/api/auth/login", &LoginPayload { email, password }, None)
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        let body = body_to_vec(response.into_body()).await?;
        #[derive(serde::Deserialize)]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = serde_json::from_slice(&body)?;
        Ok(parsed.access_token)
    }

    #[allow(dead_code)]
    pub async fn assign_organization(&self, user_id: Uuid, org_id: Uuid) -> Result<()> {
        self.with_conn(move |conn| {
            use mentorhub::schema::users::dsl::{organization_id, users};
            diesel::update(users.find(user_id))
                .set(organization_id.eq(Some(org_id)))
                .execute(conn)
                .context("failed to assign organization")?;
            Ok(())
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn user_organization(&self, user_id: Uuid) -> Result<Option<Uuid>> {
        self.with_conn(move |conn| {
            use mentorhub::schema::users::dsl::{organization_id, users};
            users
                .find(user_id)
                .select(organization_id)
                .first(conn)
                .context("failed to load user organization")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn booking_count_for_mentee(&self, user_id: Uuid) -> Result<i64> {
        self.with_conn(move |conn| {
            use mentorhub::schema::session_bookings::dsl::{mentee_id, session_bookings};
            session_bookings
                .filter(mentee_id.eq(user_id))
                .count()
                .get_result(conn)
                .context("failed to count bookings")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn availability_rule_count(&self, mentor_id: Uuid) -> Result<i64> {
        self.with_conn(move |conn| {
            use mentorhub::schema::mentor_availability::dsl::{
                human_mentor_id, mentor_availability,
            };
            mentor_availability
                .filter(human_mentor_id.eq(mentor_id))
                .count()
                .get_result(conn)
                .context("failed to count availability rules")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn council_current_mentees(&self, session_id: Uuid) -> Result<i32> {
        self.with_conn(move |conn| {
            use mentorhub::schema::council_sessions::dsl::{
                council_sessions, current_mentees,
            };
            council_sessions
                .find(session_id)
                .select(current_mentees)
                .first(conn)
                .context("failed to load council session")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn claim_confirmation(&self) -> Result<Option<SessionBooking>> {
        self.with_conn(|conn| {
            mentorhub::notifications::claim_unsent_confirmation(conn)
                .context("failed to claim confirmation")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn claim_reminder_due(&self, lead_minutes: i64) -> Result<Option<SessionBooking>> {
        self.with_conn(move |conn| {
            let now = Utc::now().naive_utc();
            mentorhub::notifications::claim_due_reminder(
                conn,
                now,
                Duration::minutes(lead_minutes),
            )
            .context("failed to claim reminder")
        })
        .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(Method::PATCH)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let builder = Request::builder().method(Method::DELETE).uri(path);
        let builder = if let Some(token) = token {
            builder.header("authorization", format!("Bearer {token}"))
        } else {
            builder
        };
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn post_with_cookie(
        &self,
        path: &str,
        cookie: &str,
    ) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("cookie", cookie)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

/// A date a week or so out, far enough ahead that slots on it are always
/// bookable and well inside the 30-day horizon.
#[allow(dead_code)]
pub fn future_day(days_ahead: i64) -> NaiveDate {
    (Utc::now() + Duration::days(days_ahead)).date_naive()
}

#[allow(dead_code)]
pub fn weekday_index(day: NaiveDate) -> i32 {
    day.weekday().num_days_from_sunday() as i32
}

#[allow(dead_code)]
pub fn at(day: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    day.and_hms_opt(hour, minute, 0).expect("valid clock time")
}

#[allow(dead_code)]
pub fn iso(instant: NaiveDateTime) -> String {
    instant.and_utc().to_rfc3339()
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE refresh_tokens, chat_messages, council_participants, council_mentors, \
         council_sessions, session_bookings, mentor_unavailability, mentor_availability, \
         mentor_applications, human_mentors, ai_mentors, users, organizations \
         RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
