// Update Service Client interface
// Commands go out through `UpdateService`; lifecycle events come back
// asynchronously as `ServiceEvent`s on the pump's queue.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::update::{DownloadProgress, UpdateError, UpdateInfo};

/// Lifecycle event emitted by the update distribution client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServiceEvent {
    /// The client started querying the endpoint
    Checking,
    /// A newer release exists
    Available(UpdateInfo),
    /// The running version is current
    NotAvailable(Option<UpdateInfo>),
    /// Check, download or install failed
    Error(String),
    /// Transfer progress snapshot
    Progress(DownloadProgress),
    /// The artifact is staged and ready to install
    Downloaded(UpdateInfo),
}

impl ServiceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServiceEvent::Checking => "checking",
            ServiceEvent::Available(_) => "available",
            ServiceEvent::NotAvailable(_) => "not-available",
            ServiceEvent::Error(_) => "error",
            ServiceEvent::Progress(_) => "progress",
            ServiceEvent::Downloaded(_) => "downloaded",
        }
    }
}

/// Commands the controller issues to the update distribution client.
///
/// Every command returns as soon as the work is started; outcomes arrive
/// later as `ServiceEvent`s. An `Err` means the command could not even be
/// started and is treated like an `error` event.
pub trait UpdateService: Send + Sync {
    fn check_for_updates(&self) -> Result<(), UpdateError>;

    fn download_update(&self) -> Result<(), UpdateError>;

    /// Install the staged artifact and restart the application
    fn quit_and_install(&self) -> Result<(), UpdateError>;

    /// Install the staged artifact while the process is shutting down
    fn install_on_exit(&self) -> Result<(), UpdateError>;
}

/// Downloaded artifact held by a service until it is installed.
///
/// The artifact stays staged until an install of it succeeds, so a failed
/// "restart now" still leaves it for the install on exit.
pub struct StagedArtifact<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Default for StagedArtifact<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> StagedArtifact<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a freshly downloaded artifact, replacing any older one
    pub fn stage(&self, artifact: T) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(artifact);
    }

    pub fn is_staged(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Run `install` on the staged artifact; it is released only on success
    pub fn install_with<F>(&self, install: F) -> Result<(), UpdateError>
    where
        F: FnOnce(&T) -> Result<(), UpdateError>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let artifact = slot
            .as_ref()
            .ok_or_else(|| UpdateError::Install("No downloaded update".to_string()))?;
        install(artifact)?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_without_artifact_fails() {
        let staged: StagedArtifact<Vec<u8>> = StagedArtifact::new();
        let result = staged.install_with(|_| Ok(()));
        assert!(matches!(result, Err(UpdateError::Install(_))));
    }

    #[test]
    fn test_failed_install_keeps_artifact() {
        let staged = StagedArtifact::new();
        staged.stage(vec![1u8, 2, 3]);

        let result = staged.install_with(|_| Err(UpdateError::Install("disk full".to_string())));
        assert_eq!(result, Err(UpdateError::Install("disk full".to_string())));
        assert!(staged.is_staged());

        // the later install on exit still finds it
        let mut installed = Vec::new();
        staged
            .install_with(|bytes| {
                installed = bytes.clone();
                Ok(())
            })
            .unwrap();
        assert_eq!(installed, vec![1, 2, 3]);
        assert!(!staged.is_staged());
    }
}
