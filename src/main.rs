use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use teloxide::prelude::*;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;

use aibot::chatbot::args::parse_command;
use aibot::chatbot::router::FILE_FAILED;
use aibot::chatbot::telegram::safe_file_name;
use aibot::chatbot::{
    BraveClient, ChatStore, Database, GeminiClient, HuggingFaceClassifier, InboundMessage,
    LexicalFallback, Reply, Router, SentimentClassifier, TelegramClient,
};
use aibot::config::Config;

struct BotState {
    router: Router,
    telegram: TelegramClient,
    download_dir: PathBuf,
}

impl BotState {
    async fn new(config: &Config, bot: &Bot) -> anyhow::Result<Self> {
        let generator = GeminiClient::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.request_timeout,
        )
        .context("Failed to build Gemini client")?;

        let hosted = HuggingFaceClassifier::new(
            &config.sentiment_endpoint,
            &config.sentiment_model,
            config.hf_api_token.clone(),
            config.request_timeout,
        )
        .context("Failed to build sentiment client")?;
        let classifier: Arc<dyn SentimentClassifier> = if config.lexical_sentiment_fallback {
            Arc::new(LexicalFallback::new(Arc::new(hosted)))
        } else {
            Arc::new(hosted)
        };

        let search = BraveClient::new(config.brave_search_api_key.clone(), config.request_timeout)
            .context("Failed to build Brave client")?;

        // The bot still answers without MongoDB; only the metadata is lost
        let store: Option<Arc<dyn ChatStore>> = match config.mongo_uri {
            Some(ref uri) => match Database::connect(uri, &config.mongo_db_name).await {
                Ok(db) => Some(Arc::new(db) as Arc<dyn ChatStore>),
                Err(e) => {
                    warn!("MongoDB unavailable, running without persistence: {e}");
                    None
                }
            },
            None => {
                info!("No mongo_uri configured, persistence disabled");
                None
            }
        };

        let router = Router::new(
            config.router_config(),
            Arc::new(generator),
            classifier,
            Arc::new(search),
            store,
        );

        Ok(Self {
            router,
            telegram: TelegramClient::new(bot.clone()),
            download_dir: config.download_dir(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "aibot.json".to_string());
    let config = Config::load_or_env(&config_path).context("Failed to load config")?;

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log dir {}", log_dir.display()))?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("aibot.log"))
        .context("Failed to open log file")?;
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting aibot...");
    info!("Loaded config from {config_path}");
    info!(
        "Gemini model: {}, sentiment: {} (lexical fallback: {}), chat log: {}",
        config.gemini_model,
        if config.sentiment_enabled { config.sentiment_model.as_str() } else { "off" },
        config.lexical_sentiment_fallback,
        config.persist_chat_log,
    );

    let state = Arc::new(BotState::new(&config, &bot).await?);

    match bot.get_me().await {
        Ok(me) => info!("Bot user ID: {}, username: @{}", me.id, me.username()),
        Err(e) => warn!("Failed to get bot info: {e}"),
    }

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;

    if let Some(contact) = msg.contact() {
        info!("📱 Contact shared in chat {chat_id}");
        let reply = state.router.handle_contact(chat_id, &contact.phone_number).await;
        send(&state, chat_id, &reply).await;
        return Ok(());
    }

    if msg.document().is_some() || msg.photo().is_some() {
        handle_upload(&msg, &state).await;
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };
    let inbound = telegram_to_inbound(&msg, text);

    if let Some(command) = parse_command(text) {
        match command.name {
            "start" => {
                for reply in state.router.handle_start(&inbound).await {
                    send(&state, chat_id, &reply).await;
                }
            }
            "websearch" => {
                info!(
                    "🔍 /websearch from {} ({}): {:?}",
                    inbound.display_name(),
                    inbound.user_id,
                    command.args
                );
                let reply = state.router.handle_websearch(command.args.as_slice()).await;
                send(&state, chat_id, &reply).await;
            }
            other => debug!("Ignoring unknown command /{other}"),
        }
        return Ok(());
    }

    let reply = state.router.handle_text(&inbound).await;
    send(&state, chat_id, &reply).await;
    Ok(())
}

/// Save a document or the largest size of a photo into the download dir.
async fn handle_upload(msg: &Message, state: &BotState) {
    let chat_id = msg.chat.id.0;

    let (file_id, file_name) = if let Some(doc) = msg.document() {
        let name = match doc.file_name {
            Some(ref name) => safe_file_name(name),
            None => format!("document_{}", doc.file.id.0),
        };
        (doc.file.id.0.clone(), name)
    } else if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        (photo.file.id.0.clone(), format!("photo_{}.jpg", photo.file.id.0))
    } else {
        return;
    };

    let dest = state.download_dir.join(&file_name);
    let reply = match state.telegram.download_file(&file_id, &dest).await {
        Ok(_) => state.router.handle_file_received(chat_id, &file_name).await,
        Err(e) => {
            error!("File handling error for {file_name}: {e}");
            Reply::text(FILE_FAILED)
        }
    };
    send(state, chat_id, &reply).await;
}

async fn send(state: &BotState, chat_id: i64, reply: &Reply) {
    if let Err(e) = state.telegram.send_reply(chat_id, reply).await {
        warn!("Failed to reply in chat {chat_id}: {e}");
    }
}

fn telegram_to_inbound(msg: &Message, text: &str) -> InboundMessage {
    let user = msg.from.as_ref();

    InboundMessage {
        chat_id: msg.chat.id.0,
        user_id: user.map(|u| u.id.0 as i64).unwrap_or(0),
        username: user.and_then(|u| u.username.clone()),
        first_name: user
            .map(|u| u.first_name.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        text: text.to_string(),
    }
}
