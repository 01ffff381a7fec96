//! Application-default credentials via the gcloud CLI
//!
//! A token is read with `gcloud auth application-default print-access-token`.
//! When none is available the interactive `gcloud auth application-default
//! login` flow is run and the read is retried, a bounded number of times.

use std::fmt;
use std::process::Stdio;

use tokio::process::Command;

use dpx_core::AuthError;

/// Environment variable pointing at a service account key file
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Text gcloud prints after a successful interactive login
const LOGIN_SUCCESS_MARKER: &str = "You are now logged in as";

/// Notice shown when a credentials file overrides the user's login
pub fn credentials_file_notice() -> Option<String> {
    std::env::var(CREDENTIALS_ENV).ok().map(|path| {
        format!(
            "{} is set, using credentials from {} to access gcloud",
            CREDENTIALS_ENV, path
        )
    })
}

/// OAuth bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Reads application-default credentials through gcloud
pub struct GcloudCredentials {
    gcloud: String,
    attempts: u32,
}

impl GcloudCredentials {
    /// Create a credential source using the given gcloud executable
    pub fn new(gcloud: impl Into<String>, attempts: u32) -> Self {
        Self {
            gcloud: gcloud.into(),
            attempts: attempts.max(1),
        }
    }

    /// Get an access token, logging in interactively when needed.
    ///
    /// Every login is followed by a fresh read; a login that does not
    /// succeed aborts immediately.
    pub async fn access_token(&self) -> Result<AccessToken, AuthError> {
        if let Some(token) = self.print_access_token().await? {
            tracing::debug!("Obtained access token without login");
            return Ok(token);
        }

        for attempt in 1..=self.attempts {
            tracing::info!(
                "No application-default credentials, starting gcloud login ({}/{})",
                attempt,
                self.attempts
            );
            self.login().await?;

            if let Some(token) = self.print_access_token().await? {
                tracing::debug!("Obtained access token after login {}", attempt);
                return Ok(token);
            }
        }

        Err(AuthError::Exhausted {
            attempts: self.attempts,
        })
    }

    async fn print_access_token(&self) -> Result<Option<AccessToken>, AuthError> {
        let output = Command::new(&self.gcloud)
            .args(["auth", "application-default", "print-access-token"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| self.gcloud_error(source))?;

        if !output.status.success() {
            tracing::debug!(
                "print-access-token failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Ok(None);
        }
        Ok(Some(AccessToken(token)))
    }

    async fn login(&self) -> Result<(), AuthError> {
        let output = Command::new(&self.gcloud)
            .args(["-q", "auth", "application-default", "login"])
            .stdin(Stdio::inherit())
            .output()
            .await
            .map_err(|source| self.gcloud_error(source))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.success()
            || stdout.contains(LOGIN_SUCCESS_MARKER)
            || stderr.contains(LOGIN_SUCCESS_MARKER)
        {
            return Ok(());
        }

        let detail = if stderr.trim().is_empty() {
            format!("gcloud login exited with {}", output.status)
        } else {
            stderr.trim().to_string()
        };
        Err(AuthError::LoginFailed(detail))
    }

    fn gcloud_error(&self, source: std::io::Error) -> AuthError {
        AuthError::Gcloud {
            program: self.gcloud.clone(),
            source,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Write an executable stand-in for gcloud
    fn fake_gcloud(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("gcloud");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_token_without_login() {
        let dir = TempDir::new().unwrap();
        let gcloud = fake_gcloud(dir.path(), "echo ya29.token");
        let creds = GcloudCredentials::new(gcloud.to_string_lossy(), 5);
        let token = creds.access_token().await.unwrap();
        assert_eq!(token.as_str(), "ya29.token");
    }

    #[tokio::test]
    async fn test_login_then_token() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("logged-in");
        let gcloud = fake_gcloud(
            dir.path(),
            &format!(
                r#"case "$*" in
  *print-access-token*) [ -f "{m}" ] && echo ya29.fresh && exit 0; exit 1 ;;
  *login*) touch "{m}"; echo "You are now logged in as dev@example.com" >&2; exit 0 ;;
esac"#,
                m = marker.display()
            ),
        );
        let creds = GcloudCredentials::new(gcloud.to_string_lossy(), 5);
        let token = creds.access_token().await.unwrap();
        assert_eq!(token.as_str(), "ya29.fresh");
    }

    #[tokio::test]
    async fn test_failed_login_aborts() {
        let dir = TempDir::new().unwrap();
        let gcloud = fake_gcloud(
            dir.path(),
            r#"case "$*" in
  *print-access-token*) exit 1 ;;
  *login*) echo "browser closed" >&2; exit 1 ;;
esac"#,
        );
        let creds = GcloudCredentials::new(gcloud.to_string_lossy(), 5);
        match creds.access_token().await {
            Err(AuthError::LoginFailed(detail)) => assert_eq!(detail, "browser closed"),
            other => panic!("expected LoginFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_attempts_exhausted() {
        let dir = TempDir::new().unwrap();
        let count = dir.path().join("logins");
        let gcloud = fake_gcloud(
            dir.path(),
            &format!(
                r#"case "$*" in
  *print-access-token*) exit 1 ;;
  *login*) echo x >> "{c}"; exit 0 ;;
esac"#,
                c = count.display()
            ),
        );
        let creds = GcloudCredentials::new(gcloud.to_string_lossy(), 5);
        match creds.access_token().await {
            Err(AuthError::Exhausted { attempts }) => assert_eq!(attempts, 5),
            other => panic!("expected Exhausted, got {:?}", other),
        }
        let logins = std::fs::read_to_string(&count).unwrap();
        assert_eq!(logins.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_token_after_last_login() {
        let dir = TempDir::new().unwrap();
        let count = dir.path().join("logins");
        let gcloud = fake_gcloud(
            dir.path(),
            &format!(
                r#"case "$*" in
  *print-access-token*)
    [ -f "{c}" ] && [ "$(wc -l < "{c}")" -ge 5 ] && echo ya29.late && exit 0
    exit 1 ;;
  *login*) echo x >> "{c}"; exit 0 ;;
esac"#,
                c = count.display()
            ),
        );
        let creds = GcloudCredentials::new(gcloud.to_string_lossy(), 5);
        let token = creds.access_token().await.unwrap();
        assert_eq!(token.as_str(), "ya29.late");

        let logins = std::fs::read_to_string(&count).unwrap();
        assert_eq!(logins.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_missing_gcloud() {
        let creds = GcloudCredentials::new("/nonexistent/gcloud", 5);
        assert!(matches!(
            creds.access_token().await,
            Err(AuthError::Gcloud { .. })
        ));
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AccessToken::new("secret");
        assert!(!format!("{:?}", token).contains("secret"));
    }
}
