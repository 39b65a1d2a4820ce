// Core types and enums for the update lifecycle
// State machine states, service payloads, prompts, errors and configuration

use serde::{Deserialize, Serialize};

/// Update states for the state machine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", content = "data")]
pub enum UpdateState {
    /// No update operation has run yet
    #[default]
    Idle,

    /// Waiting for the update service to answer a check
    Checking,

    /// A newer version was found and has not been downloaded
    Available(UpdateInfo),

    /// The service reported no newer version
    UpToDate,

    /// The update artifact is being transferred
    Downloading(DownloadProgress),

    /// The artifact is staged; install happens on restart or exit
    Downloaded(UpdateInfo),

    /// The last operation failed; a new check may be requested
    Error(String),
}

impl UpdateState {
    /// Short name used in logs and `InvalidState` errors
    pub fn name(&self) -> &'static str {
        match self {
            UpdateState::Idle => "Idle",
            UpdateState::Checking => "Checking",
            UpdateState::Available(_) => "Available",
            UpdateState::UpToDate => "UpToDate",
            UpdateState::Downloading(_) => "Downloading",
            UpdateState::Downloaded(_) => "Downloaded",
            UpdateState::Error(_) => "Error",
        }
    }

    /// Same variant, ignoring the payload. Moving between phases is a
    /// transition; a progress update inside Downloading is not.
    pub fn same_phase(&self, other: &UpdateState) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Whether a new check may start from this state.
    /// Checking and Downloading are in flight and cannot be overlapped.
    pub fn accepts_check(&self) -> bool {
        !matches!(self, UpdateState::Checking | UpdateState::Downloading(_))
    }
}

/// Release reported by the update service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    /// Version identifier (e.g. "2.1.0")
    pub version: String,

    /// Release notes, if the distribution endpoint publishes any
    #[serde(default)]
    pub release_notes: Option<String>,

    /// Publication date as reported by the endpoint
    #[serde(default)]
    pub release_date: Option<String>,
}

impl UpdateInfo {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release_notes: None,
            release_date: None,
        }
    }
}

/// Snapshot of an in-flight download.
/// Each snapshot replaces the previous one; no history is kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    /// Bytes received so far
    pub transferred: u64,
    /// Total size, 0 when the endpoint did not send a content length
    pub total: u64,
    /// Current transfer rate
    pub bytes_per_second: u64,
    /// Completion in percent (0.0 - 100.0)
    pub percent: f64,
}

impl DownloadProgress {
    /// Build a snapshot, deriving the percentage from the byte counts
    pub fn from_bytes(transferred: u64, total: u64, bytes_per_second: u64) -> Self {
        let percent = if total > 0 {
            ((transferred as f64 / total as f64) * 100.0).min(100.0)
        } else {
            0.0
        };
        Self {
            transferred,
            total,
            bytes_per_second,
            percent,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0
    }

    /// Human-readable status line sent alongside the percentage
    pub fn status_line(&self) -> String {
        format!(
            "Download speed: {} - Downloaded {}% ({}/{})",
            self.bytes_per_second, self.percent, self.transferred, self.total
        )
    }
}

/// Binary question presented to the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "info")]
pub enum UpdatePrompt {
    /// "A new version is available. Download now or later?"
    DownloadAvailable(UpdateInfo),
    /// "Update downloaded. Restart now or later?"
    RestartToInstall(UpdateInfo),
}

impl UpdatePrompt {
    pub fn info(&self) -> &UpdateInfo {
        match self {
            UpdatePrompt::DownloadAvailable(info) | UpdatePrompt::RestartToInstall(info) => info,
        }
    }
}

/// User's answer to an `UpdatePrompt`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PromptAnswer {
    /// "Download" / "Restart Now"
    Accept,
    /// "Later" / "Restart Later"
    Defer,
}

/// Result of `request_check`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The service has been asked to check
    Started,
    /// Checks are disabled in the development environment
    Skipped,
}

/// Deployment environment; update checks only run in production
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    /// Parse the value of the environment override variable
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Environment::Production),
            "development" | "dev" => Some(Environment::Development),
            _ => None,
        }
    }
}

/// Configuration for the update lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdateConfig {
    /// Checks are skipped outside production
    pub environment: Environment,

    /// Start downloading without asking when an update is found
    pub auto_download: bool,

    /// Install a staged update when the process exits
    pub auto_install_on_exit: bool,

    /// Delay before the automatic check after startup
    pub startup_check_delay_secs: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            auto_download: false,
            auto_install_on_exit: true,
            startup_check_delay_secs: 5,
        }
    }
}

/// Error types for update operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "message")]
pub enum UpdateError {
    /// The distribution endpoint was unreachable or returned malformed data
    Check(String),

    /// The transfer failed part way
    Download(String),

    /// Install or restart could not be triggered
    Install(String),

    /// Operation not allowed in the current state
    InvalidState { current: String, attempted: String },

    /// A prompt answer arrived with no prompt outstanding
    NoPendingPrompt,

    /// Configuration could not be read or written
    Config(String),
}

impl std::fmt::Display for UpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::Check(msg) => write!(f, "{}", msg),
            UpdateError::Download(msg) => write!(f, "{}", msg),
            UpdateError::Install(msg) => write!(f, "Install failed: {}", msg),
            UpdateError::InvalidState { current, attempted } => {
                write!(f, "Cannot {} while {}", attempted, current)
            }
            UpdateError::NoPendingPrompt => write!(f, "No update prompt is pending"),
            UpdateError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for UpdateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_state_default() {
        assert_eq!(UpdateState::default(), UpdateState::Idle);
    }

    #[test]
    fn test_accepts_check() {
        assert!(UpdateState::Idle.accepts_check());
        assert!(UpdateState::UpToDate.accepts_check());
        assert!(UpdateState::Available(UpdateInfo::new("2.0.0")).accepts_check());
        assert!(UpdateState::Downloaded(UpdateInfo::new("2.0.0")).accepts_check());
        assert!(UpdateState::Error("boom".to_string()).accepts_check());
        assert!(!UpdateState::Checking.accepts_check());
        assert!(!UpdateState::Downloading(DownloadProgress::default()).accepts_check());
    }

    #[test]
    fn test_progress_from_bytes() {
        let progress = DownloadProgress::from_bytes(512, 2048, 100);
        assert_eq!(progress.percent, 25.0);
        assert!(!progress.is_complete());

        let unknown = DownloadProgress::from_bytes(512, 0, 100);
        assert_eq!(unknown.percent, 0.0);

        let done = DownloadProgress::from_bytes(2048, 2048, 100);
        assert!(done.is_complete());
    }

    #[test]
    fn test_progress_status_line() {
        let progress = DownloadProgress {
            transferred: 50,
            total: 100,
            bytes_per_second: 10,
            percent: 50.0,
        };
        assert_eq!(
            progress.status_line(),
            "Download speed: 10 - Downloaded 50% (50/100)"
        );
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("development"), Some(Environment::Development));
        assert_eq!(Environment::parse(" PROD "), Some(Environment::Production));
        assert_eq!(Environment::parse("staging"), None);
    }

    #[test]
    fn test_update_config_default() {
        let config = UpdateConfig::default();
        assert_eq!(config.environment, Environment::Production);
        assert!(!config.auto_download);
        assert!(config.auto_install_on_exit);
        assert_eq!(config.startup_check_delay_secs, 5);
    }

    #[test]
    fn test_update_config_partial_json() {
        let config: UpdateConfig =
            serde_json::from_str(r#"{"environment":"development"}"#).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert!(config.auto_install_on_exit);
    }

    #[test]
    fn test_update_error_display() {
        let error = UpdateError::InvalidState {
            current: "Downloading".to_string(),
            attempted: "check for updates".to_string(),
        };
        assert_eq!(error.to_string(), "Cannot check for updates while Downloading");
        assert_eq!(
            UpdateError::Check("network unreachable".to_string()).to_string(),
            "network unreachable"
        );
    }

    #[test]
    fn test_update_state_serialization() {
        let state = UpdateState::Available(UpdateInfo::new("2.1.0"));
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: UpdateState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }

    #[test]
    fn test_same_phase_ignores_payload() {
        let early = UpdateState::Downloading(DownloadProgress::from_bytes(10, 100, 5));
        let late = UpdateState::Downloading(DownloadProgress::from_bytes(90, 100, 5));
        assert!(early.same_phase(&late));
        assert!(!early.same_phase(&UpdateState::Downloaded(UpdateInfo::new("2.1.0"))));
        assert!(!UpdateState::Idle.same_phase(&UpdateState::Checking));
    }

    #[test]
    fn test_prompt_info() {
        let info = UpdateInfo::new("2.1.0");
        assert_eq!(UpdatePrompt::DownloadAvailable(info.clone()).info(), &info);
        assert_eq!(UpdatePrompt::RestartToInstall(info.clone()).info().version, "2.1.0");
    }
}
