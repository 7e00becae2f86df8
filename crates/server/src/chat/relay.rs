//! Streaming Relay
//!
//! One relay session per `send_message` request:
//!
//! ```text
//! Received -> PromptPersisted -> StreamOpen -> Streaming -> Completed
//!     \______________\_______________\____________\______-> Failed
//! ```
//!
//! [`Relay::start`] runs everything up to and including the first upstream
//! fragment, so any failure before that point is still an ordinary error
//! response. From then on a spawned pump task owns the upstream stream and
//! feeds a bounded channel that the HTTP layer drains into server-sent
//! events. The pump persists the assistant reply before it drops its end of
//! the channel, so a client that reads the stream to its end sees a
//! consistent chat afterwards.

use super::models::Sender;
use super::store::ChatStore;
use crate::ai::{CompletionSource, FragmentStream};
use crate::core::error::{Error, Result};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Received,
    PromptPersisted,
    StreamOpen,
    Streaming,
    Completed,
    Failed,
}

/// What the HTTP layer forwards to the client, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Fragment(String),
    /// Upstream finished; always the last event of a successful session.
    Done,
    /// Session aborted after streaming began; always the last event.
    Error(String),
}

/// Why a session that had started streaming did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interruption {
    ClientGone,
    FlushTimeout,
    UpstreamIdle,
    UpstreamFailed(String),
    ReplyTooLarge,
}

impl Interruption {
    fn client_message(&self) -> &'static str {
        match self {
            Interruption::ClientGone => "client disconnected",
            Interruption::FlushTimeout => "client too slow",
            Interruption::UpstreamIdle => "assistant timed out",
            Interruption::UpstreamFailed(_) => "assistant failed",
            Interruption::ReplyTooLarge => "reply too long",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Completed {
        reply: String,
        persisted: bool,
    },
    Interrupted {
        reason: Interruption,
        /// Text handed to the client before the interruption.
        delivered: String,
        persisted: bool,
    },
}

impl RelayOutcome {
    pub fn state(&self) -> RelayState {
        match self {
            RelayOutcome::Completed { .. } => RelayState::Completed,
            RelayOutcome::Interrupted { .. } => RelayState::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RelaySettings {
    /// Longest allowed silence from upstream, including before the first
    /// fragment.
    pub idle_timeout: Duration,
    /// Longest wait for the client side to accept one event.
    pub flush_timeout: Duration,
    pub max_prompt_bytes: usize,
    /// Cap on the accumulated reply.
    pub max_reply_bytes: usize,
    /// Capacity of the channel between pump and client writer.
    pub buffer: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(45),
            flush_timeout: Duration::from_secs(30),
            max_prompt_bytes: 128 * 1024,
            max_reply_bytes: 64 * 1024,
            buffer: 16,
        }
    }
}

/// A session that has switched to streaming.
pub struct RelayStream {
    pub events: mpsc::Receiver<RelayEvent>,
    /// Resolves once the reply has been persisted (or skipped).
    pub task: JoinHandle<RelayOutcome>,
}

#[derive(Clone)]
pub struct Relay {
    store: ChatStore,
    source: Arc<dyn CompletionSource>,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(store: ChatStore, source: Arc<dyn CompletionSource>, settings: RelaySettings) -> Self {
        Self {
            store,
            source,
            settings,
        }
    }

    /// Persist the prompt, open the upstream stream and wait for its first
    /// fragment. Errors returned here happen before any event is sent.
    pub async fn start(&self, chat_id: i64, prompt: &str) -> Result<RelayStream> {
        trace_state(chat_id, RelayState::Received);

        if prompt.trim().is_empty() {
            return Err(Error::BadRequest("message text is empty".to_string()));
        }
        if prompt.len() > self.settings.max_prompt_bytes {
            return Err(Error::BadRequest(format!(
                "message text exceeds {} bytes",
                self.settings.max_prompt_bytes
            )));
        }

        self.store
            .append_message(chat_id, Sender::User, prompt, true)
            .await?;
        trace_state(chat_id, RelayState::PromptPersisted);

        let mut upstream = self.open_upstream(prompt).await.map_err(|e| {
            warn!(chat_id, "upstream failed before first fragment: {}", e);
            trace_state(chat_id, RelayState::Failed);
            Error::Internal(format!("assistant unavailable: {e}"))
        })?;
        trace_state(chat_id, RelayState::StreamOpen);

        let first = match timeout(self.settings.idle_timeout, upstream.next()).await {
            Ok(Some(Ok(fragment))) => fragment,
            Ok(Some(Err(e))) => return Err(self.fail_before_streaming(chat_id, e.to_string())),
            Ok(None) => return Err(self.fail_before_streaming(chat_id, "empty reply".into())),
            Err(_) => return Err(self.fail_before_streaming(chat_id, "timed out".into())),
        };
        trace_state(chat_id, RelayState::Streaming);

        let (tx, events) = mpsc::channel(self.settings.buffer.max(1));
        let pump = Pump {
            store: self.store.clone(),
            settings: self.settings,
            chat_id,
        };
        let task = tokio::spawn(pump.run(first, upstream, tx));

        Ok(RelayStream { events, task })
    }

    async fn open_upstream(&self, prompt: &str) -> std::result::Result<FragmentStream, String> {
        match timeout(self.settings.idle_timeout, self.source.open_stream(prompt)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("timed out".to_string()),
        }
    }

    fn fail_before_streaming(&self, chat_id: i64, reason: String) -> Error {
        warn!(chat_id, "upstream produced no fragment: {}", reason);
        trace_state(chat_id, RelayState::Failed);
        Error::Internal(format!("assistant produced no reply: {reason}"))
    }
}

/// SSE frames cannot carry a bare `\r`, so fragments are normalised to `\n`
/// before they are delivered or stored.
fn normalize_newlines(fragment: String) -> String {
    if fragment.contains('\r') {
        fragment.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        fragment
    }
}

fn trace_state(chat_id: i64, state: RelayState) {
    debug!(chat_id, ?state, "relay");
}

struct Pump {
    store: ChatStore,
    settings: RelaySettings,
    chat_id: i64,
}

impl Pump {
    async fn run(
        self,
        first: String,
        upstream: FragmentStream,
        tx: mpsc::Sender<RelayEvent>,
    ) -> RelayOutcome {
        let mut delivered = String::new();
        let forwarded = self.forward(first, upstream, &tx, &mut delivered).await;

        let outcome = match forwarded {
            Ok(()) => {
                if self.deliver(&tx, RelayEvent::Done).await.is_err() {
                    debug!(chat_id = self.chat_id, "client left before the done event");
                }
                let persisted = self.persist(&delivered, true).await;
                info!(
                    chat_id = self.chat_id,
                    bytes = delivered.len(),
                    "assistant reply completed"
                );
                RelayOutcome::Completed {
                    reply: delivered,
                    persisted,
                }
            }
            Err(reason) => {
                warn!(chat_id = self.chat_id, ?reason, "relay interrupted");
                // A full or closed channel has no room for the error frame
                if !matches!(reason, Interruption::ClientGone | Interruption::FlushTimeout)
                    && self
                        .deliver(&tx, RelayEvent::Error(reason.client_message().to_string()))
                        .await
                        .is_err()
                {
                    debug!(chat_id = self.chat_id, "client left before the error event");
                }
                // Zero delivered fragments leave no assistant row behind
                let persisted = !delivered.is_empty() && self.persist(&delivered, false).await;
                RelayOutcome::Interrupted {
                    reason,
                    delivered,
                    persisted,
                }
            }
        };

        trace_state(self.chat_id, outcome.state());
        drop(tx);
        outcome
    }

    /// Forward fragments in upstream order. Only text the channel accepted
    /// is added to `delivered`.
    async fn forward(
        &self,
        first: String,
        mut upstream: FragmentStream,
        tx: &mpsc::Sender<RelayEvent>,
        delivered: &mut String,
    ) -> std::result::Result<(), Interruption> {
        let mut pending = Some(first);

        loop {
            let fragment = match pending.take() {
                Some(fragment) => fragment,
                None => {
                    let next = tokio::select! {
                        _ = tx.closed() => return Err(Interruption::ClientGone),
                        next = timeout(self.settings.idle_timeout, upstream.next()) => next,
                    };
                    match next {
                        Err(_) => return Err(Interruption::UpstreamIdle),
                        Ok(None) => return Ok(()),
                        Ok(Some(Err(e))) => return Err(Interruption::UpstreamFailed(e.to_string())),
                        Ok(Some(Ok(fragment))) => fragment,
                    }
                }
            };
            let fragment = normalize_newlines(fragment);

            if delivered.len() + fragment.len() > self.settings.max_reply_bytes {
                return Err(Interruption::ReplyTooLarge);
            }

            self.deliver(tx, RelayEvent::Fragment(fragment.clone())).await?;
            delivered.push_str(&fragment);
        }
    }

    async fn deliver(
        &self,
        tx: &mpsc::Sender<RelayEvent>,
        event: RelayEvent,
    ) -> std::result::Result<(), Interruption> {
        match timeout(self.settings.flush_timeout, tx.send(event)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(Interruption::ClientGone),
            Err(_) => Err(Interruption::FlushTimeout),
        }
    }

    async fn persist(&self, text: &str, complete: bool) -> bool {
        match self
            .store
            .append_message(self.chat_id, Sender::Assistant, text, complete)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                // The client already has the text; only the durable copy is missing
                error!(chat_id = self.chat_id, complete, "failed to persist assistant reply: {}", e);
                false
            }
        }
    }
}
