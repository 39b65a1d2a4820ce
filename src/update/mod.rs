// Update lifecycle
// State machine driving check -> download -> install, the interface to the
// external update service, and the event pump feeding it.

mod config;
mod controller;
mod prompt;
mod pump;
mod service;
mod types;

// Re-export core types for external use
pub use types::{
    CheckOutcome, DownloadProgress, Environment, PromptAnswer, UpdateConfig, UpdateError,
    UpdateInfo, UpdatePrompt, UpdateState,
};

// Re-export config functions
pub use config::{
    apply_environment_override, get_config_path, load_config, load_config_from, save_config,
    save_config_to, ENVIRONMENT_VAR,
};

pub use controller::{next_state, UpdateController};
pub use prompt::{PromptText, UpdatePrompter};
pub use pump::{
    pump_channel, run_pump, schedule_startup_check, spawn_pump, startup_check, PumpMessage,
    PumpSender,
};
pub use service::{ServiceEvent, StagedArtifact, UpdateService};
