//! HTTP surface for receiving SMS webhooks.
//!
//! The server is deliberately thin: parse the form, resolve routing
//! settings, hand the message to the mail dispatcher, answer with the
//! provider's expected TwiML reply.

pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use handlers::{health, sms_profile_webhook, sms_webhook, AppState, SmsForm};

/// Build the application router.
///
/// `/sms/` with an empty profile segment matches neither route and falls
/// through to the 404 fallback, which is the contract for a missing
/// profile name.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sms", post(sms_webhook))
        .route("/sms/:profile", post(sms_profile_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
