//! MongoDB store for users, chat turns and received files.

use async_trait::async_trait;
use mongodb::bson::{DateTime, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database as MongoDatabase};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Collection names.
pub mod collections {
    pub const USERS: &str = "users";
    pub const CHATS: &str = "chats";
    pub const FILES: &str = "files";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

/// A bot user, keyed by the private chat id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub chat_id: i64,
    pub first_name: String,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime,
}

/// One answered message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub chat_id: i64,
    pub user_input: String,
    pub sentiment_category: Option<String>,
    pub sentiment_score: Option<f64>,
    pub bot_response: String,
    pub timestamp: DateTime,
}

/// A file or photo the bot downloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub chat_id: i64,
    pub file_name: String,
    pub description: String,
    pub timestamp: DateTime,
}

/// Metadata persistence used by the bot. Writes only; nothing reads chat logs back.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Insert the user if absent. Returns `true` when the user is new.
    async fn register_user(&self, user: &UserRecord) -> Result<bool, StoreError>;
    async fn save_phone_number(&self, chat_id: i64, phone_number: &str) -> Result<(), StoreError>;
    async fn log_chat(&self, record: &ChatRecord) -> Result<(), StoreError>;
    async fn log_file(&self, record: &FileRecord) -> Result<(), StoreError>;
}

/// MongoDB connection holding the bot's three collections.
#[derive(Debug, Clone)]
pub struct Database {
    db: MongoDatabase,
}

impl Database {
    /// Connect and ping so a bad URI fails at start-up instead of on first write.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Connected to MongoDB database: {}", db_name);

        Ok(Self {
            db: client.database(db_name),
        })
    }

    fn users(&self) -> Collection<UserRecord> {
        self.db.collection(collections::USERS)
    }

    fn chats(&self) -> Collection<ChatRecord> {
        self.db.collection(collections::CHATS)
    }

    fn files(&self) -> Collection<FileRecord> {
        self.db.collection(collections::FILES)
    }
}

#[async_trait]
impl ChatStore for Database {
    async fn register_user(&self, user: &UserRecord) -> Result<bool, StoreError> {
        let result = self
            .users()
            .update_one(
                doc! { "chat_id": user.chat_id },
                doc! {
                    "$setOnInsert": {
                        "first_name": user.first_name.as_str(),
                        "username": user.username.clone(),
                        "phone_number": user.phone_number.clone(),
                        "created_at": user.created_at,
                    }
                },
            )
            .upsert(true)
            .await?;

        Ok(result.upserted_id.is_some())
    }

    async fn save_phone_number(&self, chat_id: i64, phone_number: &str) -> Result<(), StoreError> {
        self.users()
            .update_one(
                doc! { "chat_id": chat_id },
                doc! { "$set": { "phone_number": phone_number } },
            )
            .await?;
        Ok(())
    }

    async fn log_chat(&self, record: &ChatRecord) -> Result<(), StoreError> {
        self.chats().insert_one(record).await?;
        Ok(())
    }

    async fn log_file(&self, record: &FileRecord) -> Result<(), StoreError> {
        self.files().insert_one(record).await?;
        Ok(())
    }
}
