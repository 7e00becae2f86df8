//! Personal health records: profile and medical card, drug inventory,
//! uploaded documents. Every query is scoped to the calling user.

pub mod documents;
pub mod drugs;
pub mod handlers;
pub mod profile;

pub use documents::DocumentStore;
pub use drugs::DrugStore;
pub use handlers::router;
pub use profile::ProfileStore;

use chrono::{DateTime, Utc};

fn to_column(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339())
}

/// Unparseable stored values read back as `None`.
fn from_column(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc))
}
