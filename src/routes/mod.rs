pub mod applications;
pub mod auth;
pub mod health;
pub mod notifications;
pub mod profile;
pub mod questions;
pub mod reviews;
pub mod tasks;
pub mod telegram;
pub mod users;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use tower::Layer;

use crate::{
    config::Config,
    middleware::{
        auth::require_bearer_auth,
        locale::resolve_locale,
        rate_limit::{new_rps_state, rps_middleware},
    },
    AppState,
};

/// All API routes with auth and rate limits applied.
pub fn api_router(state: AppState, config: &Config) -> Router {
    let base_routes = Router::new().route("/health", get(health::health));

    let public_api = Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/telegram", post(auth::telegram_login))
        .route("/api/users/:id", get(users::get_public_profile))
        .route("/api/users/:id/reviews", get(users::list_user_reviews))
        .route("/api/tasks", get(tasks::list_tasks))
        .route("/api/tasks/:id", get(tasks::get_task))
        .route("/api/tasks/:id/questions", get(questions::list_questions))
        .route("/api/telegram/webhook", post(telegram::handle_webhook))
        .layer(from_fn_with_state(
            new_rps_state(config.public_rps),
            rps_middleware,
        ));

    let protected_api = Router::new()
        .route(
            "/api/profile",
            get(profile::get_profile)
                .patch(profile::update_profile)
                .delete(profile::delete_profile),
        )
        .route(
            "/api/profile/deletion-preflight",
            get(profile::deletion_preflight),
        )
        .route("/api/tasks", post(tasks::create_task))
        .route("/api/tasks/can-create", get(tasks::can_create_task))
        .route("/api/tasks/mine", get(tasks::my_tasks))
        .route("/api/tasks/assigned", get(tasks::assigned_tasks))
        .route("/api/tasks/:id", axum::routing::patch(tasks::update_task))
        .route("/api/tasks/:id/cancel", post(tasks::cancel_task))
        .route("/api/tasks/:id/reopen", post(tasks::reopen_task))
        .route("/api/tasks/:id/mark-complete", post(tasks::mark_complete))
        .route(
            "/api/tasks/:id/confirm-completion",
            post(tasks::confirm_completion),
        )
        .route("/api/tasks/:id/dispute", post(tasks::dispute_task))
        .route(
            "/api/tasks/:id/remove-professional",
            post(tasks::remove_professional),
        )
        .route(
            "/api/tasks/:id/applications",
            get(applications::list_for_task).post(applications::apply),
        )
        .route("/api/tasks/:id/questions", post(questions::ask_question))
        .route("/api/questions/:id/answer", post(questions::answer_question))
        .route("/api/applications/mine", get(applications::my_applications))
        .route("/api/applications/:id/accept", post(applications::accept))
        .route("/api/applications/:id/reject", post(applications::reject))
        .route("/api/applications/:id/withdraw", post(applications::withdraw))
        .route("/api/reviews", post(reviews::create_review))
        .route("/api/reviews/pending", get(reviews::pending_reviews))
        .route("/api/notifications", get(notifications::list_notifications))
        .route(
            "/api/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/api/notifications/dismiss-all",
            post(notifications::dismiss_all),
        )
        .route(
            "/api/notifications/:id/dismiss",
            post(notifications::dismiss),
        )
        .route(
            "/api/notifications/:id/undismiss",
            post(notifications::undismiss),
        )
        .route(
            "/api/telegram/link-token",
            post(telegram::create_link_token),
        )
        .route("/api/telegram/link", delete(telegram::unlink))
        .route_layer(from_fn(require_bearer_auth))
        .layer(from_fn_with_state(new_rps_state(config.api_rps), rps_middleware));

    base_routes
        .merge(public_api)
        .merge(protected_api)
        .with_state(state)
}

/// Puts locale resolution in front of routing so `/{locale}/...` paths reach
/// the same handlers as their unprefixed form.
pub fn with_locale(router: Router) -> Router {
    Router::new().fallback_service(from_fn(resolve_locale).layer(router))
}
