//! sms2mail - SMS webhook to email relay.
//!
//! One axum server with two delivery routes:
//! - `POST /sms` — single-tenant, routing taken from the global config
//! - `POST /sms/<profile>` — per-profile routing read from `sms2mail.d/`
//!
//! ## Architecture
//!
//! ```text
//! Provider webhook → HTTP handler → profile config → compose → msmtp stdin
//! ```
//!
//! Delivery pipes a composed plain-text email into a local msmtp-compatible
//! executable. Nothing is queued, cached, or retried; a dispatch failure is
//! logged locally and deliberately hidden from the provider (see
//! [`web::handlers`]).

pub mod cli;
pub mod config;
pub mod mail;
pub mod web;

// Re-export commonly used types
pub use config::{ConfigError, EmailConfig, GlobalConfig, ResolvedConfig};
pub use mail::{DispatchError, MailSender, MsmtpSender};
pub use web::AppState;
