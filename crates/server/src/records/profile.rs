//! Profile and medical card (`/auth/me`).

use crate::core::auth::validate::is_valid_email;
use crate::core::db::Database;
use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub snils: String,
    pub passport: String,
    pub address: String,
    pub allergies: String,
    pub chronic_conditions: String,
    pub blood_type: String,
}

/// Partial update. `None` leaves the stored value as it is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub snils: Option<String>,
    pub passport: Option<String>,
    pub address: Option<String>,
    pub allergies: Option<String>,
    pub chronic_conditions: Option<String>,
    pub blood_type: Option<String>,
}

impl ProfileUpdate {
    fn check(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(Error::Validation("empty name".to_string()));
            }
        }
        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                return Err(Error::Validation("wrong email format".to_string()));
            }
        }
        Ok(())
    }
}

type ProfileRow = (String, String, String, String, String, String, String, String);

#[derive(Clone, Debug)]
pub struct ProfileStore {
    db: Database,
}

impl ProfileStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Missing medical card fields read as empty strings.
    pub async fn get(&self, user_id: i64) -> Result<Profile> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT u.name, u.email, u.snils, u.passport, u.address, \
                    COALESCE(m.allergies, ''), COALESCE(m.chronic_conditions, ''), COALESCE(m.blood_type, '') \
             FROM users u LEFT JOIN medical_cards m ON m.user_id = u.id \
             WHERE u.id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        let (name, email, snils, passport, address, allergies, chronic_conditions, blood_type) =
            row.ok_or_else(|| Error::NotFound("user not found".to_string()))?;

        Ok(Profile {
            name,
            email,
            snils,
            passport,
            address,
            allergies,
            chronic_conditions,
            blood_type,
        })
    }

    pub async fn update(&self, user_id: i64, update: ProfileUpdate) -> Result<()> {
        update.check()?;

        let mut tx = self.db.pool().begin().await?;

        let updated = sqlx::query(
            "UPDATE users SET \
                name = COALESCE(?1, name), \
                email = COALESCE(?2, email), \
                snils = COALESCE(?3, snils), \
                passport = COALESCE(?4, passport), \
                address = COALESCE(?5, address) \
             WHERE id = ?6",
        )
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.email.as_deref())
        .bind(update.snils.as_deref())
        .bind(update.passport.as_deref())
        .bind(update.address.as_deref())
        .bind(user_id)
        .execute(&mut *tx)
        .await;

        match updated {
            Ok(result) if result.rows_affected() == 0 => {
                return Err(Error::NotFound("user not found".to_string()));
            }
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(Error::Conflict("email already in use".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        sqlx::query(
            "INSERT INTO medical_cards (user_id, allergies, chronic_conditions, blood_type) \
             VALUES (?1, COALESCE(?2, ''), COALESCE(?3, ''), COALESCE(?4, '')) \
             ON CONFLICT(user_id) DO UPDATE SET \
                allergies = COALESCE(?2, allergies), \
                chronic_conditions = COALESCE(?3, chronic_conditions), \
                blood_type = COALESCE(?4, blood_type)",
        )
        .bind(user_id)
        .bind(update.allergies.as_deref())
        .bind(update.chronic_conditions.as_deref())
        .bind(update.blood_type.as_deref())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(user_id, "profile updated");
        Ok(())
    }
}
