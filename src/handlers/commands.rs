use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tracing::info;

use crate::llm::media::save_image;
use crate::state::{ConversationLog, Session};

pub const HELP_TEXT: &str = "Type a drawing request to optimize it and generate an image.
Follow-up requests refine the previous prompt (e.g. \"a cyberpunk cat\", then \"give the cat sunglasses\").

Commands:
  /history      show every request and its optimized prompt
  /save [dir]   download the last generated image (default: output dir or .)
  /help         show this message
  /quit         end the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Empty,
    Help,
    History,
    Save(Option<PathBuf>),
    Quit,
    Draw(String),
    Unknown(String),
}

pub fn parse_command(line: &str) -> SessionCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return SessionCommand::Empty;
    }
    if !trimmed.starts_with('/') {
        return SessionCommand::Draw(trimmed.to_string());
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts
        .next()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    match name.as_str() {
        "/help" | "/h" | "/?" => SessionCommand::Help,
        "/history" => SessionCommand::History,
        "/save" => SessionCommand::Save(arg.map(PathBuf::from)),
        "/quit" | "/exit" | "/q" => SessionCommand::Quit,
        _ => SessionCommand::Unknown(name),
    }
}

pub fn render_history(log: &ConversationLog) -> String {
    if log.is_empty() {
        return "No history yet.".to_string();
    }
    let mut lines = Vec::with_capacity(log.len() * 3);
    for (idx, (user_text, prompt)) in log.history().into_iter().enumerate() {
        let number = idx + 1;
        lines.push(format!("User {number}: {user_text}"));
        lines.push(format!("Optimized {number}: {prompt}"));
        lines.push("---".to_string());
    }
    lines.join("\n")
}

pub fn resolve_save_dir(explicit: Option<&Path>, configured: Option<&Path>) -> PathBuf {
    explicit
        .or(configured)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub async fn save_last_image(session: &Session, dir: &Path) -> Result<PathBuf> {
    let image = session
        .last_image
        .as_ref()
        .ok_or_else(|| anyhow!("No image generated yet; nothing to save."))?;
    let path = save_image(&image.url, dir).await?;
    info!("Saved last image for prompt {:?} to {}", image.prompt, path.display());
    Ok(path)
}
