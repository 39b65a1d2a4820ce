// Tauri host adapter
// Backs the core traits with Tauri: webview event emission for the UI
// surface, native message dialogs for prompts, tauri-plugin-updater for the
// update service, and the run-event hooks for window close and exit.
//
// The embedding application registers the updater and dialog plugins, calls
// `install` from its setup hook, adds `bridge_send` and `update_state` to its
// invoke handler and forwards run events to `handle_run_event`:
//
// ```ignore
// tauri::Builder::default()
//     .plugin(tauri_plugin_dialog::init())
//     .plugin(tauri_plugin_updater::Builder::new().build())
//     .setup(|app| {
//         print_host_lib::desktop::install(app.handle(), "main", Arc::new(UnavailablePrintSubsystem))?;
//         Ok(())
//     })
//     .invoke_handler(tauri::generate_handler![
//         print_host_lib::desktop::bridge_send,
//         print_host_lib::desktop::update_state
//     ])
//     .build(tauri::generate_context!())?
//     .run(print_host_lib::desktop::handle_run_event);
// ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use serde_json::Value;
use tauri::{AppHandle, Emitter, EventTarget, Manager, RunEvent, State, WindowEvent};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tauri_plugin_updater::{Update, UpdaterExt};

use crate::bridge::{BridgeError, EventEmitter, HostEvent, MessageBridge, UiSurface};
use crate::print::{PrintDispatcher, PrintSubsystem};
use crate::update::{
    load_config, pump_channel, run_pump, startup_check, DownloadProgress, PromptAnswer,
    PromptText, PumpSender, ServiceEvent, StagedArtifact, UpdateController, UpdateError,
    UpdateInfo, UpdatePrompt, UpdatePrompter, UpdateService, UpdateState,
};

/// Managed state holding the host core for the process lifetime
pub struct DesktopHost {
    bridge: Arc<MessageBridge>,
    controller: Arc<UpdateController>,
    window_label: String,
}

/// UI surface backed by one webview window
struct WebviewSurface {
    app: AppHandle,
    label: String,
}

impl UiSurface for WebviewSurface {
    fn deliver(&self, event: &HostEvent) -> Result<(), BridgeError> {
        self.app
            .emit_to(
                EventTarget::webview_window(self.label.clone()),
                event.channel().name(),
                event.payload(),
            )
            .map_err(|e| BridgeError::Delivery(e.to_string()))
    }
}

/// Prompts shown as native message dialogs
struct DialogPrompter {
    app: AppHandle,
    sender: PumpSender,
}

impl UpdatePrompter for DialogPrompter {
    fn present(&self, prompt: &UpdatePrompt) {
        let text = PromptText::for_prompt(prompt);
        let sender = self.sender.clone();
        let prompt = prompt.clone();

        self.app
            .dialog()
            .message(format!("{}\n\n{}", text.message, text.detail))
            .title(text.title)
            .kind(MessageDialogKind::Info)
            .buttons(MessageDialogButtons::OkCancelCustom(
                text.accept_label.to_string(),
                text.defer_label.to_string(),
            ))
            .show(move |accepted| {
                let answer = if accepted {
                    PromptAnswer::Accept
                } else {
                    PromptAnswer::Defer
                };
                sender.answer(prompt, answer);
            });
    }
}

/// Update service backed by tauri-plugin-updater
struct TauriUpdateService {
    app: AppHandle,
    sender: PumpSender,
    /// Release found by the last check
    pending: Arc<Mutex<Option<Update>>>,
    /// Downloaded artifact awaiting install
    staged: Arc<StagedArtifact<(Update, Vec<u8>)>>,
}

fn update_info(update: &Update) -> UpdateInfo {
    UpdateInfo {
        version: update.version.clone(),
        release_notes: update.body.clone(),
        release_date: update.date.map(|date| date.to_string()),
    }
}

impl TauriUpdateService {
    fn new(app: AppHandle, sender: PumpSender) -> Self {
        Self {
            app,
            sender,
            pending: Arc::new(Mutex::new(None)),
            staged: Arc::new(StagedArtifact::new()),
        }
    }

    fn install_staged(&self) -> Result<(), UpdateError> {
        self.staged.install_with(|(update, bytes)| {
            update
                .install(bytes)
                .map_err(|e| UpdateError::Install(e.to_string()))
        })
    }
}

impl UpdateService for TauriUpdateService {
    fn check_for_updates(&self) -> Result<(), UpdateError> {
        let updater = self
            .app
            .updater()
            .map_err(|e| UpdateError::Check(e.to_string()))?;
        let sender = self.sender.clone();
        let pending = Arc::clone(&self.pending);

        sender.service_event(ServiceEvent::Checking);
        tauri::async_runtime::spawn(async move {
            let event = match updater.check().await {
                Ok(Some(update)) => {
                    let info = update_info(&update);
                    *pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(update);
                    ServiceEvent::Available(info)
                }
                Ok(None) => ServiceEvent::NotAvailable(None),
                Err(e) => ServiceEvent::Error(e.to_string()),
            };
            sender.service_event(event);
        });
        Ok(())
    }

    fn download_update(&self) -> Result<(), UpdateError> {
        let update = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| UpdateError::Download("No update has been found yet".to_string()))?;
        let sender = self.sender.clone();
        let staged = Arc::clone(&self.staged);

        tauri::async_runtime::spawn(async move {
            let started = Instant::now();
            let mut transferred: u64 = 0;
            let progress_sender = sender.clone();

            let result = update
                .download(
                    |chunk_length, content_length| {
                        transferred += chunk_length as u64;
                        let elapsed = started.elapsed().as_secs_f64();
                        let bytes_per_second = if elapsed > 0.0 {
                            (transferred as f64 / elapsed) as u64
                        } else {
                            0
                        };
                        progress_sender.service_event(ServiceEvent::Progress(
                            DownloadProgress::from_bytes(
                                transferred,
                                content_length.unwrap_or(0),
                                bytes_per_second,
                            ),
                        ));
                    },
                    || log::info!("[Desktop] Update download finished"),
                )
                .await;

            match result {
                Ok(bytes) => {
                    let info = update_info(&update);
                    staged.stage((update, bytes));
                    sender.service_event(ServiceEvent::Downloaded(info));
                }
                Err(e) => {
                    sender.service_event(ServiceEvent::Error(e.to_string()));
                }
            }
        });
        Ok(())
    }

    fn quit_and_install(&self) -> Result<(), UpdateError> {
        self.install_staged()?;
        log::info!("[Desktop] Update installed, restarting");
        self.app.restart()
    }

    fn install_on_exit(&self) -> Result<(), UpdateError> {
        self.install_staged()
    }
}

/// Build the host core, attach it to `window_label` and start the update
/// pump and the delayed startup check.
pub fn install(
    app: &AppHandle,
    window_label: &str,
    printer: Arc<dyn PrintSubsystem>,
) -> Result<(), String> {
    let config = load_config();
    let emitter = Arc::new(EventEmitter::new());
    let (sender, rx) = pump_channel();

    let service = Arc::new(TauriUpdateService::new(app.clone(), sender.clone()));
    let prompter = Arc::new(DialogPrompter {
        app: app.clone(),
        sender,
    });
    let controller = Arc::new(UpdateController::new(
        config,
        service,
        prompter,
        emitter.clone(),
    ));
    let dispatcher = Arc::new(PrintDispatcher::new(printer, emitter.clone()));
    let bridge = Arc::new(MessageBridge::new(emitter, controller.clone(), dispatcher));

    bridge.attach(Arc::new(WebviewSurface {
        app: app.clone(),
        label: window_label.to_string(),
    }));

    tauri::async_runtime::spawn(run_pump(controller.clone(), rx));
    tauri::async_runtime::spawn(startup_check(controller.clone()));

    if !app.manage(DesktopHost {
        bridge,
        controller,
        window_label: window_label.to_string(),
    }) {
        return Err("Host core is already installed".to_string());
    }
    log::info!("[Desktop] Host core attached to window {}", window_label);
    Ok(())
}

/// Single entry point for UI -> host messages.
/// Routing runs on the blocking pool, off the thread serving the command.
#[tauri::command]
pub async fn bridge_send(
    channel: String,
    payload: Option<Value>,
    host: State<'_, DesktopHost>,
) -> Result<(), String> {
    let bridge = Arc::clone(&host.bridge);
    tauri::async_runtime::spawn_blocking(move || {
        bridge.dispatch(&channel, &payload.unwrap_or(Value::Null))
    })
    .await
    .map_err(|e| e.to_string())?
    .map_err(|e| e.to_string())
}

/// Read-only snapshot of the update state
#[tauri::command]
pub fn update_state(host: State<'_, DesktopHost>) -> UpdateState {
    host.controller.state()
}

/// Run-event hook: detach the surface when its window goes away and install
/// a staged update on exit
pub fn handle_run_event(app: &AppHandle, event: RunEvent) {
    let Some(host) = app.try_state::<DesktopHost>() else {
        return;
    };

    match event {
        RunEvent::WindowEvent {
            label,
            event: WindowEvent::Destroyed,
            ..
        } if label == host.window_label => {
            host.bridge.detach();
        }
        RunEvent::Exit => match host.controller.on_exit() {
            Ok(true) => log::info!("[Desktop] Staged update installed on exit"),
            Ok(false) => {}
            Err(e) => log::error!("[Desktop] Install on exit failed: {}", e),
        },
        _ => {}
    }
}
