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
use crate::shared::schema::tag_presets;
use crate::shared::state::AppState;
use crate::shared::utils::{bad_request, db_error, not_found, ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = tag_presets)]
pub struct TagPreset {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub label: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct OrgQuery {
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub label: Option<String>,
    pub color: Option<String>,
    pub organization_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagRequest {
    pub label: Option<String>,
    pub color: Option<String>,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteTagRequest {
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignTagRequest {
    pub lead_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveTagRequest {
    pub lead_id: Option<Uuid>,
    pub tag: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
}

// GET /api/tags?organization_id=
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrgQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(organization_id) = query.organization_id else {
        return Err(bad_request("Missing organization_id"));
    };
    let mut conn = state.conn.get().map_err(db_error)?;

    let rows: Vec<TagPreset> = tag_presets::table
        .filter(tag_presets::organization_id.eq(organization_id))
        .order(tag_presets::created_at.desc())
        .load(&mut conn)
        .map_err(db_error)?;

    Ok(Json(json!({ "tags": rows })))
}

// POST /api/tags
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (Some(label), Some(color), Some(organization_id), Some(user_id)) = (
        req.label.filter(|s| !s.trim().is_empty()),
        req.color.filter(|s| !s.trim().is_empty()),
        req.organization_id,
        req.user_id,
    ) else {
        return Err(bad_request("Missing required fields"));
    };

    let mut conn = state.conn.get().map_err(db_error)?;

    let tag = TagPreset {
        id: Uuid::new_v4(),
        organization_id,
        label: label.clone(),
        color: color.clone(),
        created_at: Utc::now(),
    };

    diesel::insert_into(tag_presets::table)
        .values(&tag)
        .execute(&mut conn)
        .map_err(db_error)?;

    log_activity(
        &state.conn,
        NewActivity::new(
            Some(user_id),
            Some(organization_id),
            "tag-created",
            format!("Created tag \"{label}\""),
        )
        .with_metadata(json!({ "color": color })),
    );

    Ok((StatusCode::CREATED, Json(json!({ "tag": tag }))))
}

// PATCH /api/tags/:id
pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTagRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(label), Some(user_id), Some(organization_id)) = (
        req.label.filter(|s| !s.trim().is_empty()),
        req.user_id,
        req.organization_id,
    ) else {
        return Err(bad_request("Missing required fields"));
    };
    let mut conn = state.conn.get().map_err(db_error)?;

    // Color is only overwritten when the caller provides one.
    let result = if let Some(color) = req.color.clone() {
        diesel::update(tag_presets::table.filter(tag_presets::id.eq(id)))
            .set((
                tag_presets::label.eq(label.clone()),
                tag_presets::color.eq(color),
            ))
            .execute(&mut conn)
    } else {
        diesel::update(tag_presets::table.filter(tag_presets::id.eq(id)))
            .set(tag_presets::label.eq(label.clone()))
            .execute(&mut conn)
    };
    result.map_err(db_error)?;

    log_activity(
        &state.conn,
        NewActivity::new(
            Some(user_id),
            Some(organization_id),
            "tag-updated",
            format!("Updated tag \"{label}\""),
        )
        .with_metadata(json!({ "color": req.color })),
    );

    Ok(Json(json!({ "success": true })))
}

// DELETE /api/tags/:id
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<DeleteTagRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(user_id), Some(organization_id), Some(label)) = (
        req.user_id,
        req.organization_id,
        req.label.filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(bad_request("Missing required fields for deletion log"));
    };

    let mut conn = state.conn.get().map_err(db_error)?;

    diesel::delete(tag_presets::table.filter(tag_presets::id.eq(id)))
        .execute(&mut conn)
        .map_err(db_error)?;

    log_activity(
        &state.conn,
        NewActivity::new(
            Some(user_id),
            Some(organization_id),
            "tag-deleted",
            format!("Deleted tag \"{label}\""),
        ),
    );

    Ok(Json(json!({ "success": true })))
}

// POST /api/tags/assign
//
// Atomic append guarded by containment: assigning the same tag twice leaves a
// single entry, and concurrent assigns cannot lose each other's writes. The
// statement always matches an existing lead, so zero affected rows means the
// lead does not exist.
pub async fn assign_tag(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssignTagRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(lead_id), Some(tag_id), Some(user_id), Some(organization_id), Some(label)) = (
        req.lead_id,
        req.tag_id,
        req.user_id,
        req.organization_id,
        req.label.filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(bad_request("Missing required fields"));
    };

    let mut conn = state.conn.get().map_err(db_error)?;

    let affected = diesel::sql_query(
        "UPDATE leads SET tags = CASE \
             WHEN tags @> ARRAY[$2] THEN tags \
             ELSE array_append(tags, $2) END \
         WHERE id = $1",
    )
    .bind::<diesel::sql_types::Uuid, _>(lead_id)
    .bind::<diesel::sql_types::Uuid, _>(tag_id)
    .execute(&mut conn)
    .map_err(db_error)?;

    if affected == 0 {
        return Err(not_found("Lead not found"));
    }

    log_activity(
        &state.conn,
        NewActivity::new(
            Some(user_id),
            Some(organization_id),
            "tag-assigned",
            format!("Assigned tag \"{label}\""),
        ),
    );

    Ok(Json(json!({ "success": true })))
}

// POST /api/tags/remove
pub async fn remove_tag(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RemoveTagRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(lead_id), Some(tag), Some(user_id), Some(organization_id)) = (
        req.lead_id,
        req.tag,
        req.user_id,
        req.organization_id,
    ) else {
        return Err(bad_request("Missing required fields"));
    };

    let mut conn = state.conn.get().map_err(db_error)?;

    let affected = diesel::sql_query("UPDATE leads SET tags = array_remove(tags, $2) WHERE id = $1")
        .bind::<diesel::sql_types::Uuid, _>(lead_id)
        .bind::<diesel::sql_types::Uuid, _>(tag)
        .execute(&mut conn)
        .map_err(db_error)?;

    if affected == 0 {
        return Err(not_found("Lead not found"));
    }

    log_activity(
        &state.conn,
        NewActivity::new(
            Some(user_id),
            Some(organization_id),
            "tag-removed",
            format!("Removed tag \"{tag}\""),
        ),
    );

    Ok(Json(json!({ "success": true })))
}
