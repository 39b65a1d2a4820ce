// User prompts for the update lifecycle
// The controller presents a prompt and returns; the answer comes back later
// through `UpdateController::resolve_prompt`.

use crate::update::UpdatePrompt;

/// Presents a binary choice to the user without blocking the caller
pub trait UpdatePrompter: Send + Sync {
    fn present(&self, prompt: &UpdatePrompt);
}

/// Button labels and text for a prompt, in the order (accept, defer)
pub struct PromptText {
    pub title: &'static str,
    pub message: String,
    pub detail: &'static str,
    pub accept_label: &'static str,
    pub defer_label: &'static str,
}

impl PromptText {
    pub fn for_prompt(prompt: &UpdatePrompt) -> Self {
        match prompt {
            UpdatePrompt::DownloadAvailable(info) => Self {
                title: "Update Available",
                message: format!("A new version ({}) is available!", info.version),
                detail: "Do you want to download it now?",
                accept_label: "Download",
                defer_label: "Later",
            },
            UpdatePrompt::RestartToInstall(_) => Self {
                title: "Update Ready",
                message: "Update has been downloaded.".to_string(),
                detail: "The application will restart to install the update.",
                accept_label: "Restart Now",
                defer_label: "Restart Later",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::UpdateInfo;

    #[test]
    fn test_prompt_text_download() {
        let text = PromptText::for_prompt(&UpdatePrompt::DownloadAvailable(UpdateInfo::new("2.1.0")));
        assert_eq!(text.message, "A new version (2.1.0) is available!");
        assert_eq!(text.accept_label, "Download");
        assert_eq!(text.defer_label, "Later");
    }

    #[test]
    fn test_prompt_text_restart() {
        let text = PromptText::for_prompt(&UpdatePrompt::RestartToInstall(UpdateInfo::new("2.1.0")));
        assert_eq!(text.title, "Update Ready");
        assert_eq!(text.accept_label, "Restart Now");
    }
}
