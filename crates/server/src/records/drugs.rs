//! Per-user drug inventory.

use super::{from_column, to_column};
use crate::core::db::Database;
use crate::core::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drug {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub expiry: Option<DateTime<Utc>>,
    pub location: String,
    pub manufacturer: String,
    pub dose: String,
    pub amount: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewDrug {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub expiry: Option<DateTime<Utc>>,
    pub location: String,
    pub manufacturer: String,
    pub dose: String,
    pub amount: String,
}

type DrugRow = (
    i64,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
);

#[derive(Clone, Debug)]
pub struct DrugStore {
    db: Database,
}

impl DrugStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Drug>> {
        let rows: Vec<DrugRow> = sqlx::query_as(
            "SELECT id, name, type, description, expiry, location, manufacturer, dose, amount \
             FROM drugs WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, name, kind, description, expiry, location, manufacturer, dose, amount)| Drug {
                    id,
                    name,
                    kind,
                    description,
                    expiry: from_column(expiry),
                    location,
                    manufacturer,
                    dose,
                    amount,
                },
            )
            .collect())
    }

    pub async fn add(&self, user_id: i64, drug: NewDrug) -> Result<i64> {
        if drug.name.trim().is_empty() {
            return Err(Error::BadRequest("drug name is empty".to_string()));
        }

        let id = sqlx::query(
            "INSERT INTO drugs (user_id, name, type, description, expiry, location, manufacturer, dose, amount) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(drug.name.trim())
        .bind(&drug.kind)
        .bind(&drug.description)
        .bind(to_column(drug.expiry))
        .bind(&drug.location)
        .bind(&drug.manufacturer)
        .bind(&drug.dose)
        .bind(&drug.amount)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();

        debug!(user_id, drug_id = id, "drug added");
        Ok(id)
    }

    /// Someone else's drug is [`Error::NotFound`], same as a missing one.
    pub async fn remove(&self, user_id: i64, drug_id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM drugs WHERE id = ? AND user_id = ?")
            .bind(drug_id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("drug not found".to_string()));
        }

        debug!(user_id, drug_id, "drug removed");
        Ok(())
    }
}
