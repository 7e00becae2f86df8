//! Authentication Module
//!
//! Handles user signup, login, and mapping bearer tokens back to users.
//! Users live in the `users` table; tokens are stateless JWTs.

pub mod handlers;
pub mod middleware;
pub mod password;
pub mod token;
pub mod validate;

use crate::core::db::Database;
use crate::core::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use password::PasswordHasher;
pub use token::{Claims, TokenError, TokenService};

/// User record stored in database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

type UserRow = (i64, String, String, String, String);

impl From<UserRow> for User {
    fn from((id, name, email, password_hash, created_at): UserRow) -> Self {
        Self {
            id,
            name,
            email,
            password_hash,
            created_at: created_at.parse().unwrap_or_else(|e| {
                warn!(user_id = id, "unreadable created_at {:?}: {}", created_at, e);
                DateTime::<Utc>::UNIX_EPOCH
            }),
        }
    }
}

/// Auth manager handles all authentication
pub struct AuthManager {
    db: Database,
    hasher: PasswordHasher,
    tokens: TokenService,
    /// Verified against when the email is unknown, so a login for a missing
    /// account costs the same as a wrong password.
    dummy_hash: String,
}

impl AuthManager {
    pub fn new(db: Database, hasher: PasswordHasher, tokens: TokenService) -> Self {
        let dummy_hash = hasher.hash("firstaid-dummy-password").unwrap_or_default();
        Self {
            db,
            hasher,
            tokens,
            dummy_hash,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register a new user and return a fresh token for them.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<(User, String)> {
        if self.find_by_email(email).await?.is_some() {
            return Err(Error::Conflict("user already exists".to_string()));
        }

        let password_hash = self.hasher.hash_async(password.to_string()).await?;
        let created_at = Utc::now();

        let mut tx = self.db.pool().begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO users (name, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(email)
        .bind(&password_hash)
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await;

        let user_id = match inserted {
            Ok(result) => result.last_insert_rowid(),
            // Lost a race with a concurrent signup for the same email
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(Error::Conflict("user already exists".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        sqlx::query("INSERT INTO medical_cards (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let user = User {
            id: user_id,
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            created_at,
        };
        let token = self.issue_token(&user)?;

        info!(user_id, "[Auth] User registered: {}", email);

        Ok((user, token))
    }

    /// Check credentials and return a fresh token. Unknown email and wrong
    /// password both yield [`Error::Unauthenticated`].
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String)> {
        let found = self.find_by_email(email).await?;

        let hashed = found
            .as_ref()
            .map(|u| u.password_hash.clone())
            .unwrap_or_else(|| self.dummy_hash.clone());
        let valid = self.hasher.verify_async(password.to_string(), hashed).await;

        match found {
            Some(user) if valid => {
                let token = self.issue_token(&user)?;
                info!(user_id = user.id, "[Auth] User logged in");
                Ok((user, token))
            }
            _ => {
                warn!("[Auth] Failed login attempt for {}", email);
                Err(Error::Unauthenticated)
            }
        }
    }

    /// Map validated claims back to the durable user. A user deleted after
    /// the token was issued is [`Error::NotFound`].
    pub async fn resolve(&self, claims: &Claims) -> Result<User> {
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| Error::NotFound("user not found".to_string()))?;
        self.get_user(user_id).await
    }

    /// Get user by ID
    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(User::from)
            .ok_or_else(|| Error::NotFound("user not found".to_string()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(User::from))
    }

    fn issue_token(&self, user: &User) -> Result<String> {
        self.tokens
            .issue(user.id, &user.email)
            .map_err(|e| Error::Internal(e.to_string()))
    }
}
