//! Uploaded documents. `file_data` travels as base64 and is stored as bytes.

use super::{from_column, to_column};
use crate::core::db::Database;
use crate::core::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub date: Option<DateTime<Utc>>,
    pub doctor: String,
    /// Base64
    pub file_data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub date: Option<DateTime<Utc>>,
    pub doctor: String,
    /// Base64
    pub file_data: String,
}

type DocumentRow = (i64, String, String, Option<String>, String, Vec<u8>);

#[derive(Clone, Debug)]
pub struct DocumentStore {
    db: Database,
}

impl DocumentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Document>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT id, name, type, date, doctor, file_data FROM documents WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, kind, date, doctor, file_data)| Document {
                id,
                name,
                kind,
                date: from_column(date),
                doctor,
                file_data: STANDARD.encode(file_data),
            })
            .collect())
    }

    pub async fn add(&self, user_id: i64, doc: NewDocument) -> Result<i64> {
        if doc.name.trim().is_empty() {
            return Err(Error::BadRequest("document name is empty".to_string()));
        }
        let bytes = STANDARD
            .decode(doc.file_data.trim())
            .map_err(|e| Error::BadRequest(format!("file_data is not valid base64: {e}")))?;

        let id = sqlx::query(
            "INSERT INTO documents (user_id, name, type, date, doctor, file_data) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(doc.name.trim())
        .bind(&doc.kind)
        .bind(to_column(doc.date))
        .bind(&doc.doctor)
        .bind(bytes)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();

        debug!(user_id, document_id = id, "document added");
        Ok(id)
    }

    /// Someone else's document is [`Error::NotFound`], same as a missing one.
    pub async fn remove(&self, user_id: i64, document_id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ? AND user_id = ?")
            .bind(document_id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("document not found".to_string()));
        }

        debug!(user_id, document_id, "document removed");
        Ok(())
    }
}
