use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::user_preferences;
use crate::shared::state::AppState;
use crate::shared::utils::{bad_request, db_error, ApiError};

#[derive(Debug, Clone, Serialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = user_preferences)]
pub struct UserPreferences {
    pub user_id: Uuid,
    pub goal: Option<String>,
    pub company_type: Option<String>,
    pub role: Option<String>,
    pub theme: Option<String>,
    pub display_mode: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SavePreferencesRequest {
    pub user_id: Option<Uuid>,
    pub goal: Option<String>,
    pub company_type: Option<String>,
    pub role: Option<String>,
    pub theme: Option<String>,
    pub display_mode: Option<String>,
}

// GET /api/preferences/:id
//
// A missing row is not an error; the client treats null as "not onboarded".
pub async fn get_preferences(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;

    let preferences: Option<UserPreferences> = user_preferences::table
        .find(user_id)
        .first(&mut conn)
        .optional()
        .map_err(db_error)?;

    Ok(Json(json!({ "preferences": preferences })))
}

// POST /api/preferences
pub async fn save_preferences(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SavePreferencesRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(user_id) = req.user_id else {
        return Err(bad_request("Missing user_id"));
    };

    let record = UserPreferences {
        user_id,
        goal: req.goal,
        company_type: req.company_type,
        role: req.role,
        theme: req.theme,
        display_mode: req.display_mode,
        updated_at: Utc::now(),
    };

    let mut conn = state.conn.get().map_err(db_error)?;

    diesel::insert_into(user_preferences::table)
        .values(&record)
        .on_conflict(user_preferences::user_id)
        .do_update()
        .set(&record)
        .execute(&mut conn)
        .map_err(db_error)?;

    Ok(Json(json!({ "success": true })))
}
