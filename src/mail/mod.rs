//! Email composition and submission.
//!
//! [`compose`] builds the plain-text message, [`MailSender`] is the narrow
//! boundary to the external mail-submission program, and [`dispatch`] ties
//! the two together for one inbound SMS.

pub mod msmtp;

use async_trait::async_trait;
use std::process::ExitStatus;
use thiserror::Error;

use crate::config::EmailConfig;

pub use msmtp::MsmtpSender;

/// Mail dispatch failure.
///
/// Never surfaced to the webhook caller; see the handler module for why.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("config is missing an email_from or email_to address")]
    MissingAddress,

    #[error("failed to spawn '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write message to mail program stdin")]
    Stdin(#[source] std::io::Error),

    #[error("failed waiting for mail program")]
    Wait(#[source] std::io::Error),

    /// Non-zero exit; `output` carries combined stdout/stderr, which is
    /// where msmtp explains account and authentication problems.
    #[error("mail program exited with {status}: {output}")]
    Command { status: ExitStatus, output: String },
}

/// Submission boundary.
///
/// One method: feed a fully composed message to the mail program. Tests
/// substitute a recording fake; production uses [`MsmtpSender`].
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Transmit `message`, optionally selecting a named msmtp account.
    async fn send(&self, message: &str, account: Option<&str>) -> Result<(), DispatchError>;
}

/// Compose the plain-text email piped to the mail program.
///
/// The program is invoked with `-t`, which reads the envelope back out of
/// the `To:`/`From:` header lines in this text, so their exact form matters.
pub fn compose(sms_from: &str, sms_body: &str, email: &EmailConfig) -> String {
    format!(
        "To: {to}\n\
         From: {from}\n\
         Subject: SMS from {sms_from}\n\
         MIME-Version: 1.0\n\
         Content-Type: text/plain; charset=\"UTF-8\"\n\
         \n\
         You received a new SMS from: {sms_from}\n\
         \n\
         ---\n\
         {sms_body}\n\
         ---",
        to = email.email_to,
        from = email.email_from,
    )
}

/// Compose and submit one SMS as an email.
///
/// The address check happens here, at dispatch time, rather than when the
/// config is loaded: a half-filled profile file only fails the requests
/// that hit it.
pub async fn dispatch(
    sender: &dyn MailSender,
    sms_from: &str,
    sms_body: &str,
    email: &EmailConfig,
    account: Option<&str>,
) -> Result<(), DispatchError> {
    if email.email_from.trim().is_empty() || email.email_to.trim().is_empty() {
        return Err(DispatchError::MissingAddress);
    }

    let message = compose(sms_from, sms_body, email);
    sender.send(&message, account).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every (message, account) pair instead of spawning anything.
    pub(crate) struct RecordingSender {
        pub sent: Mutex<Vec<(String, Option<String>)>>,
        pub fail: bool,
    }

    impl RecordingSender {
        pub fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl MailSender for RecordingSender {
        async fn send(&self, message: &str, account: Option<&str>) -> Result<(), DispatchError> {
            self.sent
                .lock()
                .unwrap()
                .push((message.to_string(), account.map(str::to_string)));
            if self.fail {
                use std::os::unix::process::ExitStatusExt;
                return Err(DispatchError::Command {
                    status: ExitStatus::from_raw(256),
                    output: "msmtp: cannot connect".to_string(),
                });
            }
            Ok(())
        }
    }

    fn email() -> EmailConfig {
        EmailConfig {
            email_from: "a@x.com".to_string(),
            email_to: "b@x.com".to_string(),
            msmtp_profile: None,
        }
    }

    #[test]
    fn test_compose_headers_and_body() {
        let message = compose("+15551234567", "hello", &email());

        let lines: Vec<&str> = message.lines().collect();
        assert_eq!(lines[0], "To: b@x.com");
        assert_eq!(lines[1], "From: a@x.com");
        assert_eq!(lines[2], "Subject: SMS from +15551234567");
        assert_eq!(lines[3], "MIME-Version: 1.0");
        assert_eq!(lines[4], "Content-Type: text/plain; charset=\"UTF-8\"");
        assert_eq!(lines[5], "");

        // Body wrapped between delimiter lines.
        assert!(message.contains("You received a new SMS from: +15551234567"));
        assert!(message.contains("---\nhello\n---"));
        assert!(message.ends_with("---"));
    }

    #[test]
    fn test_compose_blank_line_separates_headers() {
        let message = compose("+1555", "body", &email());
        let (headers, _body) = message
            .split_once("\n\n")
            .expect("headers and body separated by a blank line");
        assert!(headers.starts_with("To: "));
        assert!(!headers.contains("You received"));
    }

    #[tokio::test]
    async fn test_dispatch_sends_composed_message() {
        let sender = RecordingSender::new();
        dispatch(&sender, "+1555", "hi", &email(), Some("work"))
            .await
            .unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.contains("Subject: SMS from +1555"));
        assert_eq!(sent[0].1.as_deref(), Some("work"));
    }

    #[tokio::test]
    async fn test_dispatch_without_account() {
        let sender = RecordingSender::new();
        dispatch(&sender, "+1555", "hi", &email(), None).await.unwrap();
        assert_eq!(sender.sent.lock().unwrap()[0].1, None);
    }

    #[tokio::test]
    async fn test_dispatch_missing_address_skips_send() {
        let sender = RecordingSender::new();
        let bad = EmailConfig {
            email_to: String::new(),
            ..email()
        };

        let result = dispatch(&sender, "+1555", "hi", &bad, None).await;
        assert!(matches!(result, Err(DispatchError::MissingAddress)));
        assert!(sender.sent.lock().unwrap().is_empty());
    }
}
