//! Chat data model.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Who wrote a message. There are exactly two roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    /// Column value in `messages.sender`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Sender::User),
            "assistant" => Ok(Sender::Assistant),
            other => Err(format!("unknown sender: {other}")),
        }
    }
}

/// One row of `GET /auth/chats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub sender: Sender,
    pub text: String,
    /// `false` for an assistant reply that was cut short.
    pub complete: bool,
    pub created_at: String,
}

/// A chat and its messages, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ChatWithMessages {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub messages: Vec<Message>,
}

/// Message as rendered by `GET /auth/chats/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: i64,
    pub sender: Sender,
    pub text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not", default = "default_true")]
    pub complete: bool,
}

fn default_true() -> bool {
    true
}

impl From<Message> for MessageView {
    fn from(msg: Message) -> Self {
        Self {
            id: msg.id,
            sender: msg.sender,
            text: msg.text,
            complete: msg.complete,
        }
    }
}
