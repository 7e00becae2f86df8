//! Chat Session Store
//!
//! Durable chats and their ordered messages. Order within a chat is
//! `(created_at, id)` ascending; `append_message` never writes a timestamp
//! older than the newest one already in the chat.

use super::models::{ChatSummary, ChatWithMessages, Message, Sender};
use crate::core::db::Database;
use crate::core::error::{Error, Result};
use chrono::{SecondsFormat, Utc};
use tracing::debug;

pub const DEFAULT_CHAT_TITLE: &str = "New chat";

type MessageRow = (i64, i64, String, String, bool, String);

fn message_from_row(
    (id, chat_id, sender, text, complete, created_at): MessageRow,
) -> Result<Message> {
    let sender = sender.parse::<Sender>().map_err(Error::Internal)?;
    Ok(Message {
        id,
        chat_id,
        sender,
        text,
        complete,
        created_at,
    })
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Clone, Debug)]
pub struct ChatStore {
    db: Database,
}

impl ChatStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Always creates a new chat; there is no deduplication.
    pub async fn create_chat(&self, owner_id: i64, title: Option<&str>) -> Result<ChatSummary> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_CHAT_TITLE);

        let id = sqlx::query("INSERT INTO chats (user_id, title, created_at) VALUES (?, ?, ?)")
            .bind(owner_id)
            .bind(title)
            .bind(now_timestamp())
            .execute(self.db.pool())
            .await?
            .last_insert_rowid();

        debug!(chat_id = id, owner_id, "chat created");

        Ok(ChatSummary {
            id,
            title: title.to_string(),
        })
    }

    pub async fn list_chats(&self, owner_id: i64) -> Result<Vec<ChatSummary>> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, title FROM chats WHERE user_id = ? ORDER BY id")
                .bind(owner_id)
                .fetch_all(self.db.pool())
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, title)| ChatSummary { id, title })
            .collect())
    }

    /// Owner of `chat_id`, or [`Error::NotFound`].
    pub async fn chat_owner(&self, chat_id: i64) -> Result<i64> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT user_id FROM chats WHERE id = ?")
            .bind(chat_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|(owner,)| owner)
            .ok_or_else(|| Error::NotFound("chat not found".to_string()))
    }

    /// No ownership check happens here; callers decide.
    pub async fn get_chat_with_messages(&self, chat_id: i64) -> Result<ChatWithMessages> {
        let chat: Option<(i64, i64, String)> =
            sqlx::query_as("SELECT id, user_id, title FROM chats WHERE id = ?")
                .bind(chat_id)
                .fetch_optional(self.db.pool())
                .await?;
        let (id, owner_id, title) =
            chat.ok_or_else(|| Error::NotFound("chat not found".to_string()))?;

        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, chat_id, sender, text, complete, created_at FROM messages \
             WHERE chat_id = ? ORDER BY created_at, id",
        )
        .bind(chat_id)
        .fetch_all(self.db.pool())
        .await?;

        let messages = rows
            .into_iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(ChatWithMessages {
            id,
            owner_id,
            title,
            messages,
        })
    }

    /// Append with a server-assigned timestamp. [`Error::NotFound`] if the
    /// chat does not exist.
    pub async fn append_message(
        &self,
        chat_id: i64,
        sender: Sender,
        text: &str,
        complete: bool,
    ) -> Result<Message> {
        // Single statement: the chat lookup, the monotonic timestamp and the
        // insert cannot interleave with another append.
        let row: Option<(i64, String)> = sqlx::query_as(
            "INSERT INTO messages (chat_id, sender, text, complete, created_at) \
             SELECT c.id, ?, ?, ?, MAX(?, COALESCE((SELECT MAX(m.created_at) FROM messages m WHERE m.chat_id = c.id), '')) \
             FROM chats c WHERE c.id = ? \
             RETURNING id, created_at",
        )
        .bind(sender.as_str())
        .bind(text)
        .bind(complete)
        .bind(now_timestamp())
        .bind(chat_id)
        .fetch_optional(self.db.pool())
        .await?;

        let (id, created_at) =
            row.ok_or_else(|| Error::NotFound("chat not found".to_string()))?;

        debug!(chat_id, message_id = id, sender = sender.as_str(), "message appended");

        Ok(Message {
            id,
            chat_id,
            sender,
            text: text.to_string(),
            complete,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_user() -> (ChatStore, i64) {
        let db = Database::in_memory().await.unwrap();
        let user_id = sqlx::query(
            "INSERT INTO users (name, email, password_hash, created_at) VALUES ('Ann', 'a@b.com', 'x', 'now')",
        )
        .execute(db.pool())
        .await
        .unwrap()
        .last_insert_rowid();
        (ChatStore::new(db), user_id)
    }

    #[tokio::test]
    async fn test_fresh_chat_has_no_messages() {
        let (store, user_id) = store_with_user().await;
        let chat = store.create_chat(user_id, None).await.unwrap();
        assert_eq!(chat.title, DEFAULT_CHAT_TITLE);

        let loaded = store.get_chat_with_messages(chat.id).await.unwrap();
        assert_eq!(loaded.owner_id, user_id);
        assert!(loaded.messages.is_empty());
    }

    #[tokio::test]
    async fn test_each_create_makes_a_new_chat() {
        let (store, user_id) = store_with_user().await;
        let a = store.create_chat(user_id, None).await.unwrap();
        let b = store.create_chat(user_id, Some("Headache")).await.unwrap();
        assert_ne!(a.id, b.id);

        let chats = store.list_chats(user_id).await.unwrap();
        assert_eq!(chats, vec![a, b]);
        assert!(store.list_chats(user_id + 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_messages_come_back_in_append_order() {
        let (store, user_id) = store_with_user().await;
        let chat = store.create_chat(user_id, None).await.unwrap();

        for i in 0..10 {
            let sender = if i % 2 == 0 { Sender::User } else { Sender::Assistant };
            store
                .append_message(chat.id, sender, &format!("m{i}"), true)
                .await
                .unwrap();
        }

        let loaded = store.get_chat_with_messages(chat.id).await.unwrap();
        let texts: Vec<_> = loaded.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["m0", "m1", "m2", "m3", "m4", "m5", "m6", "m7", "m8", "m9"]);
        assert!(loaded
            .messages
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn test_timestamps_never_go_backwards() {
        let (store, user_id) = store_with_user().await;
        let chat = store.create_chat(user_id, None).await.unwrap();
        sqlx::query(
            "INSERT INTO messages (chat_id, sender, text, created_at) VALUES (?, 'user', 'future', '2999-01-01T00:00:00.000000Z')",
        )
        .bind(chat.id)
        .execute(store.db.pool())
        .await
        .unwrap();

        let appended = store
            .append_message(chat.id, Sender::Assistant, "later", true)
            .await
            .unwrap();
        assert_eq!(appended.created_at, "2999-01-01T00:00:00.000000Z");

        let loaded = store.get_chat_with_messages(chat.id).await.unwrap();
        assert_eq!(loaded.messages.last().unwrap().text, "later");
    }

    #[tokio::test]
    async fn test_append_to_missing_chat_is_not_found() {
        let (store, _) = store_with_user().await;
        let err = store
            .append_message(404, Sender::User, "hi", true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(matches!(
            store.get_chat_with_messages(404).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(store.chat_owner(404).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_partial_flag_round_trips() {
        let (store, user_id) = store_with_user().await;
        let chat = store.create_chat(user_id, None).await.unwrap();
        store
            .append_message(chat.id, Sender::Assistant, "half a reply", false)
            .await
            .unwrap();

        let loaded = store.get_chat_with_messages(chat.id).await.unwrap();
        assert!(!loaded.messages[0].complete);
    }
}
