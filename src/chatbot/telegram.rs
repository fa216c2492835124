//! Telegram client using teloxide.

use std::path::Path;

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ButtonRequest, FileId, KeyboardButton, KeyboardMarkup, ReplyMarkup};
use thiserror::Error;
use tracing::{info, warn};

use crate::chatbot::message::{Keyboard, MenuItem, Reply};

/// Telegram's message limit, counted in UTF-16 code units.
const MAX_MESSAGE_UNITS: usize = 4096;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("request failed: {0}")]
    Request(#[from] teloxide::RequestError),
    #[error("download failed: {0}")]
    Download(#[from] teloxide::DownloadError),
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send a reply, split into several messages when it is too long.
    /// The keyboard is attached to the last part.
    pub async fn send_reply(&self, chat_id: i64, reply: &Reply) -> Result<(), TelegramError> {
        let parts = split_message(&reply.text, MAX_MESSAGE_UNITS);
        let last = parts.len().saturating_sub(1);

        for (i, part) in parts.iter().enumerate() {
            let mut request = self.bot.send_message(ChatId(chat_id), part.as_str());
            if i == last
                && let Some(keyboard) = reply.keyboard
            {
                request = request.reply_markup(ReplyMarkup::Keyboard(keyboard_markup(keyboard)));
            }

            request.await.map_err(|e| {
                warn!("Failed to send to {chat_id}: {e}");
                e
            })?;
        }

        Ok(())
    }

    /// Download a Telegram file by id into `dest`. A partial file is removed on failure.
    pub async fn download_file(&self, file_id: &str, dest: &Path) -> Result<u64, TelegramError> {
        let file = self.bot.get_file(FileId(file_id.to_string())).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut out = tokio::fs::File::create(dest).await?;
        if let Err(e) = self.bot.download_file(&file.path, &mut out).await {
            drop(out);
            discard_partial(dest).await;
            return Err(e.into());
        }

        info!("📥 Downloaded {} ({} bytes)", dest.display(), file.size);
        Ok(u64::from(file.size))
    }
}

async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to remove partial download {}: {e}", path.display());
    }
}

fn keyboard_markup(keyboard: Keyboard) -> KeyboardMarkup {
    match keyboard {
        Keyboard::MainMenu => {
            let rows: Vec<Vec<KeyboardButton>> = MenuItem::ROWS
                .iter()
                .map(|row| row.iter().map(|item| KeyboardButton::new(item.label())).collect())
                .collect();
            KeyboardMarkup::new(rows).resize_keyboard()
        }
        Keyboard::SharePhone => KeyboardMarkup::new(vec![vec![
            KeyboardButton::new("Share Phone Number").request(ButtonRequest::Contact),
        ]])
        .resize_keyboard(),
    }
}

/// Reduce a user-supplied file name to its last path component.
pub fn safe_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();
    match base {
        "" | "." | ".." => "upload.bin".to_string(),
        _ => base.to_string(),
    }
}

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Split text into chunks of at most `max_units` UTF-16 units, preferring line breaks.
fn split_message(text: &str, max_units: usize) -> Vec<String> {
    if utf16_len(text) <= max_units {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = utf16_len(line);

        if current_len + line_len > max_units && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > max_units {
            // A single over-long line is cut at char boundaries.
            for c in line.chars() {
                let c_len = c.len_utf16();
                if current_len + c_len > max_units {
                    parts.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                current.push(c);
                current_len += c_len;
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(split_message("hello", 10), vec!["hello"]);
    }

    #[test]
    fn test_split_on_lines() {
        let parts = split_message("aaaa\nbbbb\ncccc", 10);
        assert_eq!(parts, vec!["aaaa\nbbbb\n", "cccc"]);
    }

    #[test]
    fn test_split_long_line() {
        let text = "x".repeat(25);
        let parts = split_message(&text, 10);
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.chars().count() <= 10));
        assert_eq!(parts.concat(), text);
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        let text = "é".repeat(15);
        let parts = split_message(&text, 10);
        assert_eq!(parts, vec!["é".repeat(10), "é".repeat(5)]);
    }

    #[test]
    fn test_split_counts_utf16_units() {
        let text = "😊".repeat(3000);
        let parts = split_message(&text, MAX_MESSAGE_UNITS);
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| utf16_len(p) <= MAX_MESSAGE_UNITS));
        assert_eq!(parts.concat(), text);
    }

    #[test]
    fn test_split_mixed_lines_under_limit() {
        let line = format!("{}\n", "🔍 result ".repeat(50));
        let text = line.repeat(20);
        let parts = split_message(&text, MAX_MESSAGE_UNITS);
        assert!(parts.len() > 1);
        assert!(parts.iter().all(|p| utf16_len(p) <= MAX_MESSAGE_UNITS));
        assert!(parts.iter().all(|p| p.ends_with('\n')));
        assert_eq!(parts.concat(), text);
    }

    #[tokio::test]
    async fn test_discard_partial_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("half.bin");
        std::fs::write(&path, b"partial").unwrap();

        discard_partial(&path).await;
        assert!(!path.exists());

        // Missing file is fine
        discard_partial(&path).await;
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("report.pdf"), "report.pdf");
        assert_eq!(safe_file_name("../../etc/passwd"), "passwd");
        assert_eq!(safe_file_name("C:\\Users\\me\\notes.txt"), "notes.txt");
        assert_eq!(safe_file_name(".."), "upload.bin");
        assert_eq!(safe_file_name("dir/"), "upload.bin");
    }

    #[test]
    fn test_main_menu_layout() {
        let markup = keyboard_markup(Keyboard::MainMenu);
        let labels: Vec<Vec<String>> = markup
            .keyboard
            .iter()
            .map(|row| row.iter().map(|b| b.text.clone()).collect())
            .collect();
        assert_eq!(
            labels,
            vec![
                vec!["💬 Gemini Chat".to_string(), "🔍 Web Search".to_string()],
                vec!["📁 Upload File".to_string()],
            ]
        );
    }
}
