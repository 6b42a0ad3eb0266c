use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::activity::{log_activity, NewActivity};
use crate::shared::schema::messages;
use crate::shared::state::AppState;
use crate::shared::utils::{bad_request, db_error, not_found, ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub content: String,
    pub read_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct OrgQuery {
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
}

/// Preview used in the activity log for posted messages.
pub fn content_preview(content: &str) -> String {
    let head: String = content.chars().take(40).collect();
    format!("{head}...")
}

// GET /api/messages?organization_id=
//
// Full history, chronological. No pagination.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrgQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(organization_id) = query.organization_id else {
        return Err(bad_request("Missing organization_id"));
    };
    let mut conn = state.conn.get().map_err(db_error)?;

    let rows: Vec<Message> = messages::table
        .filter(messages::organization_id.eq(organization_id))
        .order(messages::created_at.asc())
        .load(&mut conn)
        .map_err(db_error)?;

    Ok(Json(json!({ "messages": rows })))
}

// POST /api/messages
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (Some(user_id), Some(organization_id), Some(content)) = (
        req.user_id,
        req.organization_id,
        req.content.filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(bad_request("Missing fields"));
    };
    let username = req.username.unwrap_or_else(|| "Anonymous".to_string());
    let type_ = req.type_.unwrap_or_else(|| "general".to_string());

    let mut conn = state.conn.get().map_err(db_error)?;

    let message = Message {
        id: Uuid::new_v4(),
        organization_id,
        user_id,
        username: username.clone(),
        type_,
        content: content.clone(),
        read_by: Vec::new(),
        created_at: Utc::now(),
    };

    diesel::insert_into(messages::table)
        .values(&message)
        .execute(&mut conn)
        .map_err(db_error)?;

    log_activity(
        &state.conn,
        NewActivity::new(
            Some(user_id),
            Some(organization_id),
            "message-posted",
            format!("{username} posted: \"{}\"", content_preview(&content)),
        ),
    );

    Ok((StatusCode::CREATED, Json(json!({ "message": message }))))
}

// PATCH /api/messages/:id/read
//
// Atomic set-union on read_by: the id is appended only when not already
// present, so repeats and concurrent readers cannot produce duplicates. The
// statement always matches an existing row, so zero affected rows means the
// message does not exist.
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(user_id) = req.user_id else {
        return Err(bad_request("Missing user_id"));
    };
    let mut conn = state.conn.get().map_err(db_error)?;

    let affected = diesel::sql_query(
        "UPDATE messages SET read_by = CASE \
             WHEN read_by @> ARRAY[$2] THEN read_by \
             ELSE array_append(read_by, $2) END \
         WHERE id = $1",
    )
    .bind::<diesel::sql_types::Uuid, _>(id)
    .bind::<diesel::sql_types::Uuid, _>(user_id)
    .execute(&mut conn)
    .map_err(db_error)?;

    if affected == 0 {
        return Err(not_found("Message not found"));
    }

    log_activity(
        &state.conn,
        NewActivity::new(
            Some(user_id),
            req.organization_id,
            "message-read",
            format!("Marked message {id} as read"),
        ),
    );

    Ok(Json(json!({ "success": true })))
}
