use std::process::{Command, Stdio};

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use ghwf_workflow_runner::UserInteraction;

/// Prompts on the controlling terminal.
pub struct TerminalInteraction {
    theme: ColorfulTheme,
}

impl TerminalInteraction {
    pub fn new() -> Self {
        Self { theme: ColorfulTheme::default() }
    }
}

impl UserInteraction for TerminalInteraction {
    fn confirm(&mut self, prompt: &str, default: bool) -> bool {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "prompt failed, using default");
                default
            })
    }

    fn open_url(&mut self, url: &str) -> bool {
        let mut cmd = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", ""]);
            cmd
        } else {
            Command::new("xdg-open")
        };

        match cmd
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::debug!(error = %e, "could not launch browser");
                false
            }
        }
    }

    fn acknowledge(&mut self, prompt: &str) {
        let result = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text();
        if let Err(e) = result {
            tracing::warn!(error = %e, "acknowledgment prompt failed");
        }
    }
}
