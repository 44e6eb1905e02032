use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use chrono::NaiveDateTime;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod applications;
pub mod auth;
pub mod bookings;
pub mod councils;
pub mod health;
pub mod mentors;
pub mod organizations;
pub mod users;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let mentors_routes = Router::new()
        .route("/", get(mentors::list_mentors).post(mentors::create_mentor))
        .route("/:id", get(mentors::get_mentor))
        .route(
            "/:id/availability",
            get(mentors::list_availability).post(mentors::add_availability),
        )
        .route(
            "/:id/availability/:rule_id",
            patch(mentors::update_availability).delete(mentors::delete_availability),
        )
        .route(
            "/:id/unavailability",
            get(mentors::list_unavailability).post(mentors::add_unavailability),
        )
        .route(
            "/:id/unavailability/:block_id",
            delete(mentors::delete_unavailability),
        )
        .route("/:id/slots", get(mentors::list_slots));

    let bookings_routes = Router::new()
        .route(
            "/",
            get(bookings::list_my_bookings).post(bookings::create_booking),
        )
        .route("/:id", get(bookings::get_booking))
        .route("/:id/status", patch(bookings::update_status));

    let councils_routes = Router::new()
        .route(
            "/",
            get(councils::list_councils).post(councils::propose_council),
        )
        .route("/:id", get(councils::get_council))
        .route("/:id/mentors", post(councils::invite_mentor))
        .route(
            "/:id/mentors/:mentor_id/response",
            patch(councils::record_response),
        )
        .route("/:id/confirm", post(councils::confirm_council))
        .route("/:id/participants", post(councils::register_participant));

    let organizations_routes = Router::new()
        .route(
            "/",
            get(organizations::list_organizations).post(organizations::create_organization),
        )
        .route("/:id", delete(organizations::delete_organization));

    let users_routes = Router::new().route("/:id", delete(users::delete_user));

    // Application submission is public; list/review enforce admin in-handler.
    let applications_routes = Router::new()
        .route(
            "/",
            get(applications::list_applications).post(applications::submit_application),
        )
        .route("/:id", patch(applications::review_application));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/mentors", mentors_routes)
        .nest("/api/bookings", bookings_routes)
        .nest("/api/councils", councils_routes)
        .nest("/api/organizations", organizations_routes)
        .nest("/api/users", users_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .nest("/api/mentor-applications", applications_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    dt.and_utc().to_rfc3339()
}
