//! Chatbot module - routes Telegram messages to Gemini, sentiment analysis and Brave search.

pub mod args;
pub mod brave;
pub mod database;
pub mod gemini;
pub mod message;
pub mod router;
pub mod search;
pub mod sentiment;
pub mod telegram;


pub use brave::BraveClient;
pub use database::{ChatStore, Database};
pub use gemini::{GeminiClient, TextGenerator};
pub use message::{InboundMessage, Keyboard, MenuItem, Reply};
pub use router::{Router, RouterConfig};
pub use search::{SearchHit, WebSearch};
pub use sentiment::{HuggingFaceClassifier, LexicalFallback, SentimentClassifier};
pub use telegram::TelegramClient;
