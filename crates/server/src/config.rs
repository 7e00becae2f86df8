//! Server configuration and shared application state.
//!
//! Configuration is read from `FIRSTAID_*` environment variables once at
//! startup and never mutated afterwards.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::ai::{AiConfig, CompletionSource, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
use crate::chat::{ChatStore, Relay, RelaySettings};
use crate::core::auth::{AuthManager, PasswordHasher, TokenService};
use crate::core::db::Database;
use crate::records::{DocumentStore, DrugStore, ProfileStore};

/// Configuration for the First Aid server
#[derive(Clone)]
pub struct ServerConfig {
    /// TCP address to bind
    pub bind_address: String,
    /// sqlx SQLite URL
    pub database_url: String,
    /// HS256 signing secret for bearer tokens
    pub jwt_secret: Vec<u8>,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_level: String,
    pub ai: AiConfig,
    pub relay: RelaySettings,
    pub bcrypt_cost: u32,
    /// Answer 404 for chats the caller does not own
    pub enforce_chat_ownership: bool,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_address", &self.bind_address)
            .field("database_url", &self.database_url)
            .field("log_level", &self.log_level)
            .field("ai", &self.ai)
            .field("relay", &self.relay)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("enforce_chat_ownership", &self.enforce_chat_ownership)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Defaults for everything except the signing secret.
    pub fn with_secret(secret: impl Into<Vec<u8>>) -> Self {
        let relay = RelaySettings::default();
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            database_url: "sqlite://firstaid.db".to_string(),
            jwt_secret: secret.into(),
            log_level: "info".to_string(),
            ai: AiConfig::default(),
            relay,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            enforce_chat_ownership: false,
        }
    }

    /// Build from environment variables. Fails only when the signing secret
    /// is missing or empty.
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("FIRSTAID_JWT_SECRET")
            .context("FIRSTAID_JWT_SECRET must be set")?;
        if secret.is_empty() {
            bail!("FIRSTAID_JWT_SECRET must not be empty");
        }

        let defaults = RelaySettings::default();

        Ok(Self {
            bind_address: env_or("FIRSTAID_BIND", "0.0.0.0:8080"),
            database_url: env_or("FIRSTAID_DATABASE_URL", "sqlite://firstaid.db"),
            jwt_secret: secret.into_bytes(),
            log_level: env_or("FIRSTAID_LOG", "info"),
            ai: AiConfig {
                model: env_or("FIRSTAID_AI_MODEL", DEFAULT_MODEL),
                system_prompt: env_or("FIRSTAID_AI_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
                api_key: std::env::var("FIRSTAID_AI_API_KEY")
                    .ok()
                    .filter(|k| !k.is_empty()),
            },
            relay: RelaySettings {
                idle_timeout: Duration::from_secs(parse_env(
                    "FIRSTAID_UPSTREAM_IDLE_TIMEOUT_SECS",
                    defaults.idle_timeout.as_secs(),
                )),
                flush_timeout: Duration::from_secs(parse_env(
                    "FIRSTAID_FLUSH_TIMEOUT_SECS",
                    defaults.flush_timeout.as_secs(),
                )),
                max_prompt_bytes: parse_env("FIRSTAID_MAX_PROMPT_BYTES", defaults.max_prompt_bytes),
                max_reply_bytes: parse_env("FIRSTAID_MAX_REPLY_BYTES", defaults.max_reply_bytes),
                buffer: parse_env("FIRSTAID_RELAY_BUFFER", defaults.buffer),
            },
            bcrypt_cost: parse_env("FIRSTAID_BCRYPT_COST", bcrypt::DEFAULT_COST),
            enforce_chat_ownership: std::env::var("FIRSTAID_ENFORCE_CHAT_OWNERSHIP")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub db: Database,
    pub auth: Arc<AuthManager>,
    pub chats: ChatStore,
    pub relay: Relay,
    pub profiles: ProfileStore,
    pub drugs: DrugStore,
    pub documents: DocumentStore,
}

impl AppState {
    /// Wire every service onto one database and one completion source.
    pub fn new(config: ServerConfig, db: Database, source: Arc<dyn CompletionSource>) -> Self {
        let auth = AuthManager::new(
            db.clone(),
            PasswordHasher::new(config.bcrypt_cost),
            TokenService::new(&config.jwt_secret),
        );
        let chats = ChatStore::new(db.clone());
        let relay = Relay::new(chats.clone(), source, config.relay);

        Self {
            profiles: ProfileStore::new(db.clone()),
            drugs: DrugStore::new(db.clone()),
            documents: DocumentStore::new(db.clone()),
            auth: Arc::new(auth),
            chats,
            relay,
            db,
            config: Arc::new(config),
        }
    }
}
