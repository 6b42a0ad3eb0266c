use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::error;
use serde_json::Value;
use uuid::Uuid;

use crate::shared::schema::activity_logs;
use crate::shared::utils::DbPool;

/// Append-only audit row. Written as a side effect of nearly every mutating
/// handler; a failed write is logged and swallowed so it never fails the
/// request that triggered it.
#[derive(Debug, Insertable)]
#[diesel(table_name = activity_logs)]
pub struct NewActivity {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub type_: String,
    pub message: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl NewActivity {
    pub fn new(
        user_id: Option<Uuid>,
        organization_id: Option<Uuid>,
        kind: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            organization_id,
            type_: kind.to_string(),
            message: message.into(),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

pub fn log_activity(pool: &DbPool, entry: NewActivity) {
    let mut conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            error!("activity log skipped, no connection: {e}");
            return;
        }
    };
    if let Err(e) = diesel::insert_into(activity_logs::table)
        .values(&entry)
        .execute(&mut conn)
    {
        error!("failed to record activity '{}': {e}", entry.type_);
    }
}
