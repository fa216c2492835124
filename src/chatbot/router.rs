//! Routes inbound messages and commands to the services that answer them.

use std::sync::Arc;

use mongodb::bson::DateTime;
use tracing::{info, warn};

use crate::chatbot::args::{SearchRequest, USAGE};
use crate::chatbot::database::{ChatRecord, ChatStore, FileRecord, UserRecord};
use crate::chatbot::gemini::{GENERATION_FAILED, TextGenerator};
use crate::chatbot::message::{InboundMessage, Keyboard, MenuItem, Reply, compose_reply};
use crate::chatbot::search::{SEARCH_FAILED, WebSearch, format_results};
use crate::chatbot::sentiment::{SentimentClassifier, SentimentLabel, SentimentResult};

/// Substrings (of the lower-cased text) that end a conversation.
const FAREWELL_KEYWORDS: [&str; 5] = ["bye", "goodbye", "see you", "take care", "later"];

const FAREWELL_POSITIVE: &str = "Goodbye! Have a fantastic day! 😊";
const FAREWELL_NEGATIVE: &str = "I'm here if you ever need to talk. Take care! 💙";
const FAREWELL_NEUTRAL: &str = "Take care! See you soon! 👋";

pub const WELCOME: &str = "Welcome!\nPlease share your phone number:";
pub const WELCOME_BACK: &str = "Welcome back!";
pub const CHOOSE_OPTION: &str = "Choose an option from the menu below 👇";
pub const PHONE_SAVED: &str = "Phone number saved. Thank you!";
pub const FILE_FAILED: &str = "Error processing the file.";

/// Behaviour switches for the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// Append every answered chat turn to the store.
    pub persist_chat_log: bool,
    /// Classify user text and prefix replies with the sentiment line.
    pub sentiment_enabled: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            persist_chat_log: false,
            sentiment_enabled: true,
        }
    }
}

/// What a free-text message asks for. First match wins, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Menu(MenuItem),
    Farewell,
    Chat,
}

pub fn detect_intent(text: &str) -> Intent {
    if let Some(item) = MenuItem::from_label(text) {
        return Intent::Menu(item);
    }
    let lowered = text.to_lowercase();
    if FAREWELL_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return Intent::Farewell;
    }
    Intent::Chat
}

/// Goodbye line for a classified farewell.
fn farewell_for(label: &SentimentLabel) -> &'static str {
    match label {
        SentimentLabel::Positive => FAREWELL_POSITIVE,
        SentimentLabel::Negative => FAREWELL_NEGATIVE,
        _ => FAREWELL_NEUTRAL,
    }
}

/// The message router. Holds every external service it calls; built once at start-up.
pub struct Router {
    config: RouterConfig,
    generator: Arc<dyn TextGenerator>,
    classifier: Arc<dyn SentimentClassifier>,
    search: Arc<dyn WebSearch>,
    store: Option<Arc<dyn ChatStore>>,
}

impl Router {
    pub fn new(
        config: RouterConfig,
        generator: Arc<dyn TextGenerator>,
        classifier: Arc<dyn SentimentClassifier>,
        search: Arc<dyn WebSearch>,
        store: Option<Arc<dyn ChatStore>>,
    ) -> Self {
        Self {
            config,
            generator,
            classifier,
            search,
            store,
        }
    }

    /// Answer a free-text message.
    pub async fn handle_text(&self, msg: &InboundMessage) -> Reply {
        match detect_intent(&msg.text) {
            Intent::Menu(item) => {
                info!("📋 Menu '{}' from {} ({})", item.label(), msg.display_name(), msg.user_id);
                Reply::with_menu(item.description())
            }
            Intent::Farewell => {
                info!(
                    "👋 Farewell from {} ({}): \"{}\"",
                    msg.display_name(),
                    msg.user_id,
                    msg.preview()
                );
                let sentiment = self.classify(&msg.text).await;
                let body = match sentiment {
                    Some(ref s) => farewell_for(&s.label),
                    None => FAREWELL_NEUTRAL,
                };
                self.finish_turn(msg, sentiment, body.to_string()).await
            }
            Intent::Chat => {
                info!(
                    "💬 Chat from {} ({}): \"{}\"",
                    msg.display_name(),
                    msg.user_id,
                    msg.preview()
                );
                let body = match self.generator.generate(&msg.text).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Gemini API error: {e}");
                        GENERATION_FAILED.to_string()
                    }
                };
                let sentiment = self.classify(&msg.text).await;
                self.finish_turn(msg, sentiment, body).await
            }
        }
    }

    /// Answer `/websearch <args>`.
    pub async fn handle_websearch<S: AsRef<str>>(&self, args: &[S]) -> Reply {
        let request = match SearchRequest::parse(args) {
            Ok(request) => request,
            Err(e) => {
                info!("Rejected /websearch: {e}");
                return Reply::text(USAGE);
            }
        };

        match self.search.search(&request).await {
            Ok(hits) => Reply::text(format_results(&hits)),
            Err(e) => {
                warn!("Web search error: {e}");
                Reply::text(SEARCH_FAILED)
            }
        }
    }

    /// Answer `/start`. Registers the user when a store is configured.
    pub async fn handle_start(&self, msg: &InboundMessage) -> Vec<Reply> {
        let is_new = match self.store {
            Some(ref store) => {
                let user = UserRecord {
                    chat_id: msg.chat_id,
                    first_name: msg.first_name.clone(),
                    username: msg.username.clone(),
                    phone_number: None,
                    created_at: DateTime::now(),
                };
                match store.register_user(&user).await {
                    Ok(is_new) => is_new,
                    Err(e) => {
                        warn!("Failed to register user {}: {e}", msg.chat_id);
                        true
                    }
                }
            }
            None => true,
        };

        if is_new {
            info!("🆕 New user {} ({})", msg.display_name(), msg.chat_id);
            vec![
                Reply::with_keyboard(WELCOME, Keyboard::SharePhone),
                Reply::with_menu(CHOOSE_OPTION),
            ]
        } else {
            vec![Reply::with_menu(WELCOME_BACK)]
        }
    }

    /// Answer a shared contact.
    pub async fn handle_contact(&self, chat_id: i64, phone_number: &str) -> Reply {
        if let Some(ref store) = self.store
            && let Err(e) = store.save_phone_number(chat_id, phone_number).await
        {
            warn!("Failed to save phone number for {chat_id}: {e}");
        }
        Reply::with_menu(PHONE_SAVED)
    }

    /// Answer a saved upload, recording it when a store is configured.
    /// Store failures are logged only.
    pub async fn handle_file_received(&self, chat_id: i64, file_name: &str) -> Reply {
        if let Some(ref store) = self.store {
            let record = FileRecord {
                chat_id,
                file_name: file_name.to_string(),
                description: format!("Processed {file_name}"),
                timestamp: DateTime::now(),
            };
            if let Err(e) = store.log_file(&record).await {
                warn!("Failed to record file {file_name}: {e}");
            }
        }
        Reply::text(format!("File received: {file_name}"))
    }

    /// Classify `text`, or `None` when sentiment is switched off.
    ///
    /// A failed classification is reported as `UNKNOWN`; wrap the classifier in
    /// `LexicalFallback` to get a heuristic label instead.
    async fn classify(&self, text: &str) -> Option<SentimentResult> {
        if !self.config.sentiment_enabled {
            return None;
        }
        match self.classifier.classify(text).await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Sentiment classification failed: {e}");
                Some(SentimentResult::unknown())
            }
        }
    }

    async fn finish_turn(
        &self,
        msg: &InboundMessage,
        sentiment: Option<SentimentResult>,
        body: String,
    ) -> Reply {
        let text = match sentiment {
            Some(ref s) => compose_reply(&s.label, s.rounded_score(), &body),
            None => body.clone(),
        };

        if self.config.persist_chat_log
            && let Some(ref store) = self.store
        {
            let record = ChatRecord {
                chat_id: msg.chat_id,
                user_input: msg.text.clone(),
                sentiment_category: sentiment.as_ref().map(|s| s.label.to_string()),
                sentiment_score: sentiment.as_ref().map(SentimentResult::rounded_score),
                bot_response: body,
                timestamp: DateTime::now(),
            };
            if let Err(e) = store.log_chat(&record).await {
                warn!("Failed to log chat turn: {e}");
            }
        }

        Reply::with_menu(text)
    }
}
