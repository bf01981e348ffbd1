//! Terminal implementations of the notification and prompt seams, plus
//! blocking stdin helpers.

use std::future::Future;
use std::io::{self, BufRead, Write};
use std::pin::Pin;

use anyhow::Result;
use tracing::debug;

use bankbot_core::auth::{PromptError, PromptText, ReauthDecision, ReauthPrompt};
use bankbot_core::notify::{Notification, NotificationLevel, Notifier};

/// Read one line from stdin. `None` on end of input.
pub async fn read_line(prompt: &str) -> Result<Option<String>> {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || read_line_blocking(&prompt)).await?
}

fn read_line_blocking(prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Read a password without echo
pub async fn read_password(prompt: &str) -> Result<String> {
    let prompt = prompt.to_string();
    let password = tokio::task::spawn_blocking(move || rpassword::prompt_password(prompt)).await??;
    Ok(password)
}

/// Prints notifications to stderr.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        let marker = match notification.level {
            NotificationLevel::Error => "✗",
        };
        eprintln!("{} {}", marker, notification.message);
    }
}

/// Asks "sign in again?" on the terminal.
pub struct TerminalPrompt;

impl TerminalPrompt {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl ReauthPrompt for TerminalPrompt {
    fn confirm(
        &self,
        text: PromptText,
    ) -> Pin<Box<dyn Future<Output = Result<ReauthDecision, PromptError>> + Send + '_>> {
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                eprintln!();
                eprintln!("== {} ==", text.title);
                eprintln!("{}", text.body);
                let question = format!("[y] {}  [n] {} > ", text.confirm_label, text.cancel_label);

                let answer = read_line_blocking(&question)
                    .map_err(|e| PromptError::UiError(e.to_string()))?
                    .ok_or_else(|| PromptError::Unavailable("stdin closed".to_string()))?;
                debug!(answer = %answer, "Re-authentication answer");

                Ok(match answer.to_lowercase().as_str() {
                    "y" | "yes" => ReauthDecision::Confirmed,
                    _ => ReauthDecision::Cancelled,
                })
            })
            .await
            .map_err(|e| PromptError::UiError(format!("Task failed: {}", e)))?
        })
    }
}
