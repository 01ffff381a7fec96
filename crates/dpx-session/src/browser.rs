//! Chrome/Chromium launched through the SOCKS tunnel
//!
//! Every session gets a fresh throwaway profile so the proxy settings never
//! touch the user's own browser. Host resolution is forced through the proxy
//! so cluster-internal hostnames resolve on the far side.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use dpx_core::config::{BrowserConfig, ProcessGroup, TerminationConfig};
use dpx_core::traits::BrowserProcess;
use dpx_core::{BrowserState, LaunchError, Target, TerminationError};

use crate::process::{ManagedChild, StopOutcome};

/// Find a Chrome or Chromium executable on this machine
pub fn find_browser_executable() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        if let Some(path) = spotlight_chrome() {
            return Some(path);
        }
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else {
        &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
            "/snap/bin/chromium",
        ]
    };

    candidates.iter().find_map(|candidate| {
        let path = Path::new(candidate);
        if path.is_absolute() {
            path.exists().then(|| path.to_path_buf())
        } else {
            which::which(candidate).ok()
        }
    })
}

/// Locate Chrome by bundle identifier, wherever it was installed
#[cfg(target_os = "macos")]
fn spotlight_chrome() -> Option<PathBuf> {
    let output = std::process::Command::new("mdfind")
        .args(["kMDItemCFBundleIdentifier", "=", "com.google.Chrome"])
        .output()
        .ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let bundle = stdout.lines().next()?.trim();
    if bundle.is_empty() {
        return None;
    }
    let path = Path::new(bundle).join("Contents/MacOS/Google Chrome");
    path.exists().then_some(path)
}

/// Browser arguments for a session proxied through `port`
pub fn browser_args(
    profile_dir: &Path,
    port: u16,
    urls: &[String],
    extra_args: &[String],
) -> Vec<String> {
    let mut args = vec![
        format!("--proxy-server=socks5://127.0.0.1:{}", port),
        "--host-resolver-rules=MAP * 0.0.0.0 , EXCLUDE localhost".to_string(),
        format!("--user-data-dir={}", profile_dir.display()),
        "--no-default-browser-check".to_string(),
        "--no-first-run".to_string(),
        "--enable-kiosk-mode".to_string(),
        "--new-window".to_string(),
    ];
    args.extend(extra_args.iter().cloned());
    args.extend(urls.iter().cloned());
    args
}

/// Console URLs for `target` followed by the user's extra URIs
pub fn session_urls(target: &Target, extra_uris: &[String], config: &BrowserConfig) -> Vec<String> {
    let mut urls = config.console_ports().urls(&target.node);
    urls.extend(extra_uris.iter().cloned());
    urls
}

/// Create the per-session profile directory.
///
/// The directory is deliberately left behind after the session; Chrome may
/// still hold files in it while shutting down.
pub fn create_profile_dir() -> Result<PathBuf, LaunchError> {
    let dir = tempfile::Builder::new()
        .prefix("dpx-profile-")
        .tempdir()
        .map_err(LaunchError::ProfileDir)?;
    Ok(dir.keep())
}

/// A browser subprocess
pub struct ChromeBrowser {
    child: ManagedChild,
    profile_dir: PathBuf,
    state: BrowserState,
    termination: TerminationConfig,
}

impl ChromeBrowser {
    /// Launch `executable` against the tunnel on `port`
    pub fn start(
        executable: &Path,
        target: &Target,
        port: u16,
        extra_uris: &[String],
        config: &BrowserConfig,
    ) -> Result<Self, LaunchError> {
        let profile_dir = create_profile_dir()?;
        let urls = session_urls(target, extra_uris, config);
        let args = browser_args(&profile_dir, port, &urls, &config.extra_args);
        tracing::info!("Executing: {} {}", executable.display(), args.join(" "));

        let mut command = Command::new(executable);
        command.args(&args).stdout(Stdio::null()).stderr(Stdio::null());
        Self::spawn(command, profile_dir, config.termination)
    }

    /// Wrap an already configured command
    pub fn spawn(
        command: Command,
        profile_dir: PathBuf,
        termination: TerminationConfig,
    ) -> Result<Self, LaunchError> {
        let child = ManagedChild::spawn("browser", command, ProcessGroup::Own)?;
        Ok(Self {
            child,
            profile_dir,
            state: BrowserState::Running,
            termination,
        })
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }
}

#[async_trait]
impl BrowserProcess for ChromeBrowser {
    fn state(&self) -> BrowserState {
        self.state
    }

    async fn wait_exit(&mut self) -> std::io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        if self.state == BrowserState::Running {
            self.state = BrowserState::Exited;
        }
        tracing::info!("Browser exited with {}", status);
        Ok(status)
    }

    async fn stop(&mut self) -> Result<(), TerminationError> {
        if !self.state.is_live() {
            return Ok(());
        }

        tracing::info!("Stopping browser (pid {})", self.child.pid());
        self.state = match self.child.terminate(&self.termination).await? {
            StopOutcome::AlreadyExited => BrowserState::Exited,
            StopOutcome::Terminated | StopOutcome::Killed => BrowserState::Stopped,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpx_core::config::ConsoleProfile;

    fn target() -> Target {
        Target {
            project: "proj1".to_string(),
            region: "global".to_string(),
            cluster: "clusterA".to_string(),
            job: None,
            node: "clusterA-m".to_string(),
            zone: "us-central1-a".to_string(),
        }
    }

    #[test]
    fn test_args_order() {
        let urls = session_urls(
            &target(),
            &["http://clusterA-w-0:8042".to_string()],
            &BrowserConfig::default(),
        );
        let args = browser_args(Path::new("/tmp/profile"), 7421, &urls, &[]);

        assert_eq!(args[0], "--proxy-server=socks5://127.0.0.1:7421");
        assert_eq!(
            args[1],
            "--host-resolver-rules=MAP * 0.0.0.0 , EXCLUDE localhost"
        );
        assert_eq!(args[2], "--user-data-dir=/tmp/profile");
        assert_eq!(
            &args[7..],
            &[
                "http://clusterA-m:8088",
                "http://clusterA-m:9870",
                "http://clusterA-m:19888/jobhistory/",
                "http://clusterA-w-0:8042",
            ]
        );
    }

    #[test]
    fn test_hadoop2_namenode_url() {
        let config = BrowserConfig {
            console_profile: ConsoleProfile::Hadoop2,
            ..BrowserConfig::default()
        };
        let urls = session_urls(&target(), &[], &config);
        assert_eq!(urls[1], "http://clusterA-m:50070");
    }

    #[test]
    fn test_extra_args_precede_urls() {
        let urls = vec!["http://clusterA-m:8088".to_string()];
        let args = browser_args(
            Path::new("/tmp/p"),
            5000,
            &urls,
            &["--incognito".to_string()],
        );
        assert_eq!(args[args.len() - 2], "--incognito");
        assert_eq!(args[args.len() - 1], "http://clusterA-m:8088");
    }

    #[test]
    fn test_profile_dir_is_kept() {
        let dir = create_profile_dir().unwrap();
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        std::fs::remove_dir(&dir).unwrap();
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::time::Duration;

        fn quick_termination() -> TerminationConfig {
            TerminationConfig {
                grace_polls: 10,
                poll_interval: Duration::from_millis(20),
            }
        }

        #[tokio::test]
        async fn test_wait_exit_reports_status() {
            let mut browser =
                ChromeBrowser::spawn(Command::new("true"), PathBuf::from("/tmp"), quick_termination())
                    .unwrap();
            let status = browser.wait_exit().await.unwrap();
            assert!(status.success());
            assert_eq!(browser.state(), BrowserState::Exited);

            browser.stop().await.unwrap();
            assert_eq!(browser.state(), BrowserState::Exited);
        }

        #[tokio::test]
        async fn test_stop_running_browser() {
            let mut cmd = Command::new("sleep");
            cmd.arg("30");
            let mut browser =
                ChromeBrowser::spawn(cmd, PathBuf::from("/tmp"), quick_termination()).unwrap();

            browser.stop().await.unwrap();
            assert_eq!(browser.state(), BrowserState::Stopped);
            browser.stop().await.unwrap();
            assert_eq!(browser.state(), BrowserState::Stopped);
        }

        #[tokio::test]
        async fn test_missing_executable() {
            let result = ChromeBrowser::start(
                Path::new("/nonexistent/chrome"),
                &target(),
                7421,
                &[],
                &BrowserConfig::default(),
            );
            assert!(matches!(result, Err(LaunchError::Spawn { .. })));
        }
    }
}
