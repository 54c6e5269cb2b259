//! Webhook endpoint handlers.
//!
//! Response policy, fixed by the provider contract:
//! - dispatch success → `200 text/xml` with an empty TwiML document
//! - dispatch failure → `200` with an empty body; a non-2xx status would
//!   trigger the provider's own retry logic, and the failure is a local
//!   configuration problem the provider cannot fix. Failures are only
//!   observable in the logs.
//! - unknown or unreadable profile → `404` with a generic message
//! - malformed form body → `400`

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::{self, EmailConfig, GlobalConfig};
use crate::mail::{self, MailSender};

/// Empty TwiML document the provider expects on success.
pub const TWIML_EMPTY: &str = "<Response></Response>";

/// Shared application state.
///
/// The config is resolved once at startup and never mutated; the sender is
/// a trait object so tests can substitute a recording fake.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GlobalConfig>,
    pub config_dir: Arc<PathBuf>,
    pub sender: Arc<dyn MailSender>,
}

impl AppState {
    pub fn new(config: GlobalConfig, config_dir: PathBuf, sender: Arc<dyn MailSender>) -> Self {
        Self {
            config: Arc::new(config),
            config_dir: Arc::new(config_dir),
            sender,
        }
    }
}

/// Twilio-style form payload.
///
/// Missing fields collapse to empty strings rather than rejecting the
/// request; the provider always sends both, and an empty sender still makes
/// a deliverable email.
#[derive(Debug, Deserialize)]
pub struct SmsForm {
    #[serde(default, rename = "From")]
    pub from: String,
    #[serde(default, rename = "Body")]
    pub body: String,
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Single-tenant endpoint: `POST /sms`.
///
/// Routing comes from the `[email]` table of the global config; without
/// one this route does not exist as far as callers can tell.
pub async fn sms_webhook(
    State(state): State<AppState>,
    form: Result<Form<SmsForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => return bad_form(rejection),
    };

    let Some(email) = state.config.email.clone() else {
        warn!("single_tenant_route_unconfigured");
        return not_found("default");
    };

    // No account means a bare `-t` invocation, matching a single msmtp
    // account setup; an explicit msmtp_profile still selects one.
    let account = email
        .msmtp_profile
        .clone()
        .filter(|account| !account.trim().is_empty());
    deliver(&state, "default", form, email, account.as_deref()).await
}

/// Multi-profile endpoint: `POST /sms/<profile>`.
///
/// The profile file is re-read on every request, so edits under
/// `sms2mail.d/` take effect without a restart.
pub async fn sms_profile_webhook(
    State(state): State<AppState>,
    Path(profile): Path<String>,
    form: Result<Form<SmsForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => return bad_form(rejection),
    };

    if !config::valid_profile_name(&profile) {
        warn!(profile = %profile, "profile_name_invalid");
        return not_found(&profile);
    }

    let email = match config::load_profile(&state.config_dir, &profile).await {
        Ok(email) => email,
        Err(e) => {
            warn!(profile = %profile, error = %e, "profile_load_failed");
            return not_found(&profile);
        }
    };

    let account = email.account().to_string();
    deliver(&state, &profile, form, email, Some(account.as_str())).await
}

/// Dispatch one SMS and translate the outcome to the provider response.
async fn deliver(
    state: &AppState,
    profile: &str,
    form: SmsForm,
    email: EmailConfig,
    account: Option<&str>,
) -> Response {
    info!(sms_from = %form.from, profile = %profile, "sms_received");

    match mail::dispatch(state.sender.as_ref(), &form.from, &form.body, &email, account).await {
        Ok(()) => {
            info!(profile = %profile, "mail_dispatched");
            twiml_ok()
        }
        Err(e) => {
            // 200 with an empty body, on purpose: an error status would
            // make the provider re-deliver the webhook.
            error!(profile = %profile, error = %e, "mail_dispatch_failed");
            StatusCode::OK.into_response()
        }
    }
}

fn twiml_ok() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        TWIML_EMPTY,
    )
        .into_response()
}

/// Generic 404; the body never distinguishes an absent file from a
/// malformed one.
fn not_found(profile: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        format!("Profile '{profile}' not found or invalid"),
    )
        .into_response()
}

/// Axum's stock form rejections answer 415/422; the provider contract pins
/// every malformed body to 400.
fn bad_form(rejection: FormRejection) -> Response {
    warn!(reason = %rejection.body_text(), "form_rejected");
    (StatusCode::BAD_REQUEST, "Failed to parse form").into_response()
}
