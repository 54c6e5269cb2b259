//! msmtp subprocess transport.
//!
//! The composed message is piped to `<program> [-a <account>] -t`. `-t`
//! makes msmtp read recipients and sender from the header lines in the text
//! itself, so no addresses appear on the command line.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{DispatchError, MailSender};

/// Sends mail by piping into an msmtp-compatible executable found on PATH.
#[derive(Debug, Clone)]
pub struct MsmtpSender {
    program: String,
}

impl MsmtpSender {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Confirm the executable is reachable by running `<program> --version`.
    ///
    /// Only the spawn matters; the exit status is ignored so that
    /// sendmail-compatible substitutes without a `--version` flag still
    /// pass. A spawn failure means the program is not on PATH, which is a
    /// startup-fatal condition for the caller.
    pub async fn probe(&self) -> Result<(), DispatchError> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| DispatchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        debug!(program = %self.program, status = %status, "mail_program_probed");
        Ok(())
    }
}

#[async_trait]
impl MailSender for MsmtpSender {
    async fn send(&self, message: &str, account: Option<&str>) -> Result<(), DispatchError> {
        let mut command = Command::new(&self.program);
        if let Some(account) = account {
            command.args(["-a", account]);
        }
        command.arg("-t");

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DispatchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Write the whole message, then drop the handle to close the pipe;
        // msmtp reads until EOF before submitting.
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.as_bytes())
                .await
                .map_err(DispatchError::Stdin)?;
        }

        let output = child.wait_with_output().await.map_err(DispatchError::Wait)?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(DispatchError::Command {
                status: output.status,
                output: combined.trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    /// Drop a tiny shell script into `dir` to stand in for msmtp.
    fn fake_program(dir: &Path, name: &str, script: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_probe_missing_program() {
        let sender = MsmtpSender::new("sms2mail-no-such-program");
        let result = sender.probe().await;
        assert!(matches!(result, Err(DispatchError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_probe_ignores_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_program(dir.path(), "grumpy", "exit 3");
        assert!(MsmtpSender::new(program).probe().await.is_ok());
    }

    #[tokio::test]
    async fn test_send_pipes_message_and_account() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("capture");
        let program = fake_program(
            dir.path(),
            "msmtp",
            &format!("echo \"$@\" > {0}.args\ncat > {0}.stdin", capture.display()),
        );

        MsmtpSender::new(program)
            .send("To: b@x.com\n\nhello", Some("work"))
            .await
            .unwrap();

        let args = fs::read_to_string(dir.path().join("capture.args")).unwrap();
        assert_eq!(args.trim(), "-a work -t");
        let stdin = fs::read_to_string(dir.path().join("capture.stdin")).unwrap();
        assert_eq!(stdin, "To: b@x.com\n\nhello");
    }

    #[tokio::test]
    async fn test_send_without_account_omits_flag() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("capture");
        let program = fake_program(
            dir.path(),
            "msmtp",
            &format!("echo \"$@\" > {}.args\ncat > /dev/null", capture.display()),
        );

        MsmtpSender::new(program).send("x", None).await.unwrap();

        let args = fs::read_to_string(dir.path().join("capture.args")).unwrap();
        assert_eq!(args.trim(), "-t");
    }

    #[tokio::test]
    async fn test_send_failure_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_program(
            dir.path(),
            "msmtp",
            "cat > /dev/null\necho 'account not found' >&2\nexit 78",
        );

        let result = MsmtpSender::new(program).send("x", None).await;
        match result {
            Err(DispatchError::Command { status, output }) => {
                assert_eq!(status.code(), Some(78));
                assert!(output.contains("account not found"));
            }
            other => panic!("expected Command error, got {other:?}"),
        }
    }
}
