use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::user_integrations;
use crate::shared::state::AppState;
use crate::shared::utils::{db_error, ApiError};

#[derive(Debug, Clone, Serialize, Queryable)]
pub struct Integration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// GET /api/integrations/:user_id
pub async fn list_integrations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;

    let rows: Vec<Integration> = user_integrations::table
        .filter(user_integrations::user_id.eq(user_id))
        .load(&mut conn)
        .map_err(db_error)?;

    Ok(Json(json!({ "integrations": rows })))
}

// DELETE /api/integrations/:id
pub async fn delete_integration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;

    diesel::delete(user_integrations::table.filter(user_integrations::id.eq(id)))
        .execute(&mut conn)
        .map_err(db_error)?;

    Ok(Json(json!({ "success": true })))
}
