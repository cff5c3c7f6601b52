//! HTTP routes
//!
//! | Path | Access |
//! |------|--------|
//! | `/api/v1/tours` | reads public, writes admin and lead-guide |
//! | `/api/v1/tours/top-5-cheap` | public |
//! | `/api/v1/tours/{id}/reviews` | authenticated, create user |
//! | `/api/v1/reviews` | authenticated, create user, edit user and admin |
//! | `/api/v1/users` | admin |
//! | `/api/v1/users/me/reviews` | authenticated |
//! | `/api/v1/bookings` | admin and lead-guide |
//! | `/health`, `/ready` | public |

use axum::{http::Uri, middleware::from_fn_with_state, routing::get, Router};
use tower_http::catch_panic::CatchPanicLayer;

use crate::{
    handlers::{
        ApiOperation, AppError, HandlerConfig, PopulateSpec, QueryLimits, QueryPreset, ReferencedBy,
        References, ResourceHandlers,
    },
    health::{health, readiness},
    middleware::{error_boundary, panic_response, Access, JwtAuth, Role},
    resources::{Booking, Review, Tour, User},
    state::AppState,
};

const STAFF: &[Role] = &[Role::Admin, Role::LeadGuide];
const ADMIN: &[Role] = &[Role::Admin];
const REVIEWERS: &[Role] = &[Role::User];
const REVIEW_EDITORS: &[Role] = &[Role::User, Role::Admin];

/// Fixed query behind `/api/v1/tours/top-5-cheap`
pub fn top_five_cheap() -> QueryPreset {
    QueryPreset::new()
        .set("limit", "5")
        .set("sort", "-ratingsAverage,price")
        .set("fields", "name,price,ratingsAverage,summary,difficulty")
}

/// Build the application router with error rendering and authentication
pub fn app(state: AppState) -> Router {
    let environment = state.config().service.environment;

    api(&state)
        .route("/health", get(health))
        .route("/ready", get(readiness))
        .with_state(state.clone())
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(state.auth().clone(), JwtAuth::middleware))
        .layer(from_fn_with_state(environment, error_boundary))
}

fn api(state: &AppState) -> Router<AppState> {
    let limits: QueryLimits = state.config().query.into();

    let review_author = || {
        PopulateSpec::new("user", References::<User, _>::new(state.users().clone()))
            .select(&["name", "photo"])
    };
    let tour_guides = || {
        PopulateSpec::new("guides", References::<User, _>::new(state.users().clone()))
            .select(&["name", "email", "photo", "role"])
    };
    let reviews_of_tour = PopulateSpec::new(
        "reviews",
        ReferencedBy::<Review, _>::new(state.reviews().clone(), "tour").nested(review_author()),
    );

    let tours = ResourceHandlers::<Tour, _>::new(
        state.tours().clone(),
        HandlerConfig::new()
            .writes(Access::Roles(STAFF))
            .populate(reviews_of_tour)
            .populate(tour_guides())
            .populate_list(tour_guides()),
    )
    .with_limits(limits);

    let cheap_tours = ResourceHandlers::<Tour, _>::new(
        state.tours().clone(),
        HandlerConfig::new().preset(top_five_cheap()),
    )
    .with_limits(limits);

    let reviews_config = || {
        HandlerConfig::new()
            .access(Access::Authenticated)
            .allow(ApiOperation::Create, Access::Roles(REVIEWERS))
            .owned_by("user")
            .populate_list(review_author())
    };

    let nested_reviews = ResourceHandlers::<Review, _>::new(
        state.reviews().clone(),
        reviews_config().nested_under("id", "tour"),
    )
    .with_limits(limits);

    let reviews = ResourceHandlers::<Review, _>::new(
        state.reviews().clone(),
        reviews_config()
            .allow(ApiOperation::Update, Access::Roles(REVIEW_EDITORS))
            .allow(ApiOperation::Delete, Access::Roles(REVIEW_EDITORS))
            .populate(review_author()),
    )
    .with_limits(limits);

    let my_reviews = ResourceHandlers::<Review, _>::new(
        state.reviews().clone(),
        HandlerConfig::new()
            .access(Access::Authenticated)
            .scoped_to_principal("user"),
    )
    .with_limits(limits);

    let users = ResourceHandlers::<User, _>::new(
        state.users().clone(),
        HandlerConfig::new().access(Access::Roles(ADMIN)),
    )
    .with_limits(limits);

    let bookings = ResourceHandlers::<Booking, _>::new(
        state.bookings().clone(),
        HandlerConfig::new().access(Access::Roles(STAFF)),
    )
    .with_limits(limits);

    Router::new()
        .route("/api/v1/tours/top-5-cheap", cheap_tours.list_route())
        .route("/api/v1/tours/{id}/reviews", nested_reviews.collection_route())
        .nest("/api/v1/tours", tours.router())
        .nest("/api/v1/reviews", reviews.router())
        .route("/api/v1/users/me/reviews", my_reviews.list_route())
        .nest("/api/v1/users", users.router())
        .nest("/api/v1/bookings", bookings.router())
}

async fn route_not_found(uri: Uri) -> AppError {
    AppError::route_not_found(&uri.to_string())
}
