// Update Controller - State Machine for the update lifecycle
// Owns UpdateState, reacts to update service events and user answers,
// and reports every step to the UI over the bridge.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::bridge::{EventEmitter, HostEvent};
use crate::update::{
    CheckOutcome, Environment, PromptAnswer, ServiceEvent, UpdateConfig, UpdateError, UpdateInfo,
    UpdatePrompt, UpdatePrompter, UpdateService, UpdateState,
};

/// Next state for a service event. Total over every (state, event) pair.
///
/// A running download is not interrupted by stale check results, and
/// progress or completion events only count while a download can be running.
pub fn next_state(current: &UpdateState, event: &ServiceEvent) -> UpdateState {
    use UpdateState as S;

    let downloading = matches!(current, S::Downloading(_));
    let download_possible = downloading || matches!(current, S::Available(_));

    match event {
        ServiceEvent::Error(message) => S::Error(message.clone()),
        ServiceEvent::Checking | ServiceEvent::Available(_) | ServiceEvent::NotAvailable(_)
            if downloading =>
        {
            current.clone()
        }
        ServiceEvent::Checking => S::Checking,
        ServiceEvent::Available(info) => S::Available(info.clone()),
        ServiceEvent::NotAvailable(_) => S::UpToDate,
        ServiceEvent::Progress(progress) if download_possible => S::Downloading(progress.clone()),
        ServiceEvent::Downloaded(info) if download_possible => S::Downloaded(info.clone()),
        ServiceEvent::Progress(_) | ServiceEvent::Downloaded(_) => current.clone(),
    }
}

struct Inner {
    state: UpdateState,
    /// Prompt shown to the user and not yet answered
    pending_prompt: Option<UpdatePrompt>,
    /// Downloaded artifact awaiting install, kept across later re-checks
    staged: Option<UpdateInfo>,
}

/// Work to do once the state lock is released
enum FollowUp {
    None,
    Present(UpdatePrompt),
    StartDownload,
}

/// Update controller - single owner of the update state
pub struct UpdateController {
    inner: Mutex<Inner>,
    config: UpdateConfig,
    service: Arc<dyn UpdateService>,
    prompter: Arc<dyn UpdatePrompter>,
    emitter: Arc<EventEmitter>,
}

impl UpdateController {
    pub fn new(
        config: UpdateConfig,
        service: Arc<dyn UpdateService>,
        prompter: Arc<dyn UpdatePrompter>,
        emitter: Arc<EventEmitter>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: UpdateState::Idle,
                pending_prompt: None,
                staged: None,
            }),
            config,
            service,
            prompter,
            emitter,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the current update state
    pub fn state(&self) -> UpdateState {
        self.lock().state.clone()
    }

    /// Prompt waiting for an answer, if any
    pub fn pending_prompt(&self) -> Option<UpdatePrompt> {
        self.lock().pending_prompt.clone()
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    fn notify(&self, text: impl Into<String>) {
        let text = text.into();
        log::info!("[UpdateController] {}", text);
        self.emitter.emit(HostEvent::UpdateStatus(text));
    }

    fn set_state(inner: &mut Inner, new_state: UpdateState) {
        if !inner.state.same_phase(&new_state) {
            log::info!(
                "[UpdateController] State transition: {} -> {}",
                inner.state.name(),
                new_state.name()
            );
            // Any prompt belongs to the state it was raised in
            inner.pending_prompt = None;
        }
        inner.state = new_state;
    }

    /// Ask the update service whether a newer version exists.
    ///
    /// Rejected while a check or download is in flight. Skipped entirely in
    /// the development environment.
    pub fn request_check(&self) -> Result<CheckOutcome, UpdateError> {
        if self.config.environment == Environment::Development {
            self.notify("Skipping update check in development mode");
            return Ok(CheckOutcome::Skipped);
        }

        {
            let mut inner = self.lock();
            if !inner.state.accepts_check() {
                log::warn!(
                    "[UpdateController] Check rejected while {}",
                    inner.state.name()
                );
                return Err(UpdateError::InvalidState {
                    current: inner.state.name().to_string(),
                    attempted: "check for updates".to_string(),
                });
            }
            Self::set_state(&mut inner, UpdateState::Checking);
        }
        self.notify("Checking for updates...");

        if let Err(e) = self.service.check_for_updates() {
            self.handle_service_event(ServiceEvent::Error(e.to_string()));
        }
        Ok(CheckOutcome::Started)
    }

    /// Start downloading the available update
    pub fn start_download(&self) -> Result<(), UpdateError> {
        {
            let mut inner = self.lock();
            if !matches!(inner.state, UpdateState::Available(_)) {
                return Err(UpdateError::InvalidState {
                    current: inner.state.name().to_string(),
                    attempted: "download update".to_string(),
                });
            }
            Self::set_state(&mut inner, UpdateState::Downloading(Default::default()));
        }
        self.notify("Downloading update...");

        if let Err(e) = self.service.download_update() {
            self.handle_service_event(ServiceEvent::Error(e.to_string()));
        }
        Ok(())
    }

    /// Apply the user's answer to a presented prompt.
    ///
    /// `prompt` must be the prompt still pending; answers to prompts that
    /// were superseded by a later state change are rejected.
    pub fn resolve_prompt(
        &self,
        prompt: &UpdatePrompt,
        answer: PromptAnswer,
    ) -> Result<(), UpdateError> {
        {
            let mut inner = self.lock();
            if inner.pending_prompt.as_ref() != Some(prompt) {
                log::warn!(
                    "[UpdateController] Ignoring answer for {} prompt that is no longer pending",
                    prompt.info().version
                );
                return Err(UpdateError::NoPendingPrompt);
            }
            inner.pending_prompt = None;
        }
        log::info!(
            "[UpdateController] Prompt for {} answered: {:?}",
            prompt.info().version,
            answer
        );

        match (prompt, answer) {
            (UpdatePrompt::DownloadAvailable(_), PromptAnswer::Accept) => self.start_download(),
            (UpdatePrompt::DownloadAvailable(info), PromptAnswer::Defer) => {
                log::info!("[UpdateController] Download of {} postponed", info.version);
                Ok(())
            }
            (UpdatePrompt::RestartToInstall(info), PromptAnswer::Accept) => {
                log::info!("[UpdateController] Restarting to install {}", info.version);
                self.service.quit_and_install().map_err(|e| {
                    self.handle_service_event(ServiceEvent::Error(e.to_string()));
                    e
                })
            }
            (UpdatePrompt::RestartToInstall(info), PromptAnswer::Defer) => {
                log::info!(
                    "[UpdateController] Install of {} deferred until exit",
                    info.version
                );
                Ok(())
            }
        }
    }

    /// Apply an event from the update service
    pub fn handle_service_event(&self, event: ServiceEvent) {
        let mut notices = Vec::new();
        let follow_up = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let previous = inner.state.clone();
            let next = next_state(&previous, &event);
            let changed = previous != next;
            Self::set_state(inner, next);

            match (&event, &inner.state) {
                (ServiceEvent::Error(message), _) => {
                    log::error!("[UpdateController] Update error: {}", message);
                    notices.push(HostEvent::UpdateStatus(format!(
                        "Error checking for updates: {}",
                        message
                    )));
                    FollowUp::None
                }
                (ServiceEvent::Checking, UpdateState::Checking) => {
                    if changed {
                        notices.push(HostEvent::UpdateStatus("Checking for updates...".to_string()));
                    }
                    FollowUp::None
                }
                (ServiceEvent::NotAvailable(_), UpdateState::UpToDate) => {
                    notices.push(HostEvent::UpdateStatus("App is up to date.".to_string()));
                    FollowUp::None
                }
                (ServiceEvent::Available(info), UpdateState::Available(_)) => {
                    notices.push(HostEvent::UpdateStatus(format!(
                        "Update available: {}",
                        info.version
                    )));
                    if self.config.auto_download {
                        FollowUp::StartDownload
                    } else {
                        let prompt = UpdatePrompt::DownloadAvailable(info.clone());
                        inner.pending_prompt = Some(prompt.clone());
                        FollowUp::Present(prompt)
                    }
                }
                (ServiceEvent::Progress(progress), UpdateState::Downloading(_)) => {
                    notices.push(HostEvent::UpdateStatus(progress.status_line()));
                    notices.push(HostEvent::DownloadProgress(progress.percent));
                    FollowUp::None
                }
                (ServiceEvent::Downloaded(info), UpdateState::Downloaded(_)) => {
                    inner.staged = Some(info.clone());
                    notices.push(HostEvent::UpdateStatus(format!(
                        "Update downloaded: {}",
                        info.version
                    )));
                    let prompt = UpdatePrompt::RestartToInstall(info.clone());
                    inner.pending_prompt = Some(prompt.clone());
                    FollowUp::Present(prompt)
                }
                (event, state) => {
                    log::debug!(
                        "[UpdateController] Ignoring {} event while {}",
                        event.name(),
                        state.name()
                    );
                    FollowUp::None
                }
            }
        };

        for notice in notices {
            if let HostEvent::UpdateStatus(text) = &notice {
                log::info!("[UpdateController] {}", text);
            }
            self.emitter.emit(notice);
        }

        match follow_up {
            FollowUp::None => {}
            FollowUp::Present(prompt) => self.prompter.present(&prompt),
            FollowUp::StartDownload => {
                if let Err(e) = self.start_download() {
                    log::warn!("[UpdateController] Auto-download not started: {}", e);
                }
            }
        }
    }

    /// Process is exiting: install a staged update if policy allows.
    /// Returns `true` if the install was handed to the service.
    pub fn on_exit(&self) -> Result<bool, UpdateError> {
        if !self.config.auto_install_on_exit {
            return Ok(false);
        }
        let staged = self.lock().staged.clone();
        match staged {
            Some(info) => {
                log::info!("[UpdateController] Installing {} on exit", info.version);
                self.service.install_on_exit()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
