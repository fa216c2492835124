//! Inbound/outbound message types and the sentiment reply format.

use std::fmt;

/// A text message as received from Telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Chat the reply goes to (positive = private chat).
    pub chat_id: i64,
    /// Sender's Telegram user id, shown in log lines.
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub text: String,
}

impl InboundMessage {
    /// The bare username (no `@`), or the first name when the user has none.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.first_name)
    }

    /// First 100 chars of the text, for log lines.
    pub fn preview(&self) -> String {
        self.text.chars().take(100).collect()
    }
}

/// Reply keyboards the bot can attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    MainMenu,
    /// One button asking the user to share their phone number.
    SharePhone,
}

/// An outbound reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_menu(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(Keyboard::MainMenu),
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// The three buttons of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Chat,
    WebSearch,
    UploadFile,
}

impl MenuItem {
    /// Rows as laid out on the keyboard.
    pub const ROWS: [&'static [MenuItem]; 2] = [
        &[MenuItem::Chat, MenuItem::WebSearch],
        &[MenuItem::UploadFile],
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuItem::Chat => "💬 Gemini Chat",
            MenuItem::WebSearch => "🔍 Web Search",
            MenuItem::UploadFile => "📁 Upload File",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MenuItem::Chat => {
                "💬 Gemini Chat mode enabled.\n\nSend me any message and I’ll respond using Gemini AI."
            }
            MenuItem::WebSearch => "🔍 Web Search mode.\n\nUse:\n/websearch <your query>",
            MenuItem::UploadFile => "📁 File Upload mode.\n\nPlease upload a file or image now.",
        }
    }

    /// Exact (case-sensitive) match against a button label.
    pub fn from_label(text: &str) -> Option<Self> {
        [MenuItem::Chat, MenuItem::WebSearch, MenuItem::UploadFile]
            .into_iter()
            .find(|item| item.label() == text)
    }
}

/// Prefix a reply body with the sentiment line.
///
/// Example output:
/// ```text
/// Sentiment: POSITIVE (0.97)
/// Hello!
/// ```
pub fn compose_reply(label: &impl fmt::Display, score: f64, body: &str) -> String {
    format!("Sentiment: {label} ({score:.2})\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_reply() {
        assert_eq!(
            compose_reply(&"POSITIVE", 0.97, "Hello!"),
            "Sentiment: POSITIVE (0.97)\nHello!"
        );
    }

    #[test]
    fn test_compose_reply_two_decimals() {
        assert_eq!(compose_reply(&"NEGATIVE", 1.0, "x"), "Sentiment: NEGATIVE (1.00)\nx");
        assert_eq!(compose_reply(&"NEUTRAL", 0.5, ""), "Sentiment: NEUTRAL (0.50)\n");
    }

    #[test]
    fn test_compose_keeps_multiline_body() {
        let out = compose_reply(&"POSITIVE", 0.8, "line1\nline2");
        assert_eq!(out.lines().collect::<Vec<_>>(), vec!["Sentiment: POSITIVE (0.80)", "line1", "line2"]);
    }

    #[test]
    fn test_menu_labels_exact() {
        assert_eq!(MenuItem::from_label("💬 Gemini Chat"), Some(MenuItem::Chat));
        assert_eq!(MenuItem::from_label("🔍 Web Search"), Some(MenuItem::WebSearch));
        assert_eq!(MenuItem::from_label("📁 Upload File"), Some(MenuItem::UploadFile));
        assert_eq!(MenuItem::from_label("💬 gemini chat"), None);
        assert_eq!(MenuItem::from_label(" 🔍 Web Search"), None);
    }

    #[test]
    fn test_menu_rows_cover_every_item() {
        let items: Vec<MenuItem> = MenuItem::ROWS.iter().flat_map(|r| r.iter().copied()).collect();
        assert_eq!(items, vec![MenuItem::Chat, MenuItem::WebSearch, MenuItem::UploadFile]);
    }

    #[test]
    fn test_display_name() {
        let mut msg = InboundMessage {
            chat_id: 10,
            user_id: 10,
            username: Some("alice".to_string()),
            first_name: "Alice".to_string(),
            text: "hi".to_string(),
        };
        assert_eq!(msg.display_name(), "alice");
        msg.username = None;
        assert_eq!(msg.display_name(), "Alice");
    }
}
