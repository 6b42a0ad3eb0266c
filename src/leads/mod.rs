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
use crate::crm::ContactFields;
use crate::shared::schema::leads;
use crate::shared::state::AppState;
use crate::shared::utils::{bad_request, db_error, ApiError};

pub const STATUS_NEW: &str = "new";
pub const STATUS_SYNCED: &str = "synced";
pub const STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = leads)]
pub struct Lead {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub status: String,
    pub stage: Option<String>,
    pub tags: Vec<Uuid>,
    pub notes: String,
    pub persona_summary: Option<String>,
    pub lead_score: Option<i32>,
    pub outreach_tone: Option<String>,
    pub outreach_message: Option<String>,
    pub sent: bool,
    pub synced_at: Option<DateTime<Utc>>,
    pub enriched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct OrgQuery {
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub org_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLeadRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeadRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub notes: String,
    pub stage: Option<String>,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteLeadRequest {
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SyncLeadRequest {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
}

// GET /api/leads?organization_id=
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrgQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(organization_id) = query.organization_id else {
        return Err(bad_request("Missing org ID"));
    };
    let mut conn = state.conn.get().map_err(db_error)?;

    let rows: Vec<Lead> = leads::table
        .filter(leads::organization_id.eq(organization_id))
        .order(leads::synced_at.desc())
        .load(&mut conn)
        .map_err(db_error)?;

    Ok(Json(json!({ "leads": rows })))
}

// POST /api/leads
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (Some(name), Some(email), Some(organization_id), Some(user_id)) = (
        req.name.filter(|s| !s.trim().is_empty()),
        req.email.filter(|s| !s.trim().is_empty()),
        req.organization_id,
        req.user_id,
    ) else {
        return Err(bad_request("Missing required fields"));
    };

    let mut conn = state.conn.get().map_err(db_error)?;

    let lead = Lead {
        id: Uuid::new_v4(),
        organization_id,
        user_id,
        name: name.clone(),
        email: email.clone(),
        title: req.title,
        company: req.company,
        status: STATUS_NEW.to_string(),
        stage: None,
        tags: req.tags,
        notes: req.notes,
        persona_summary: None,
        lead_score: None,
        outreach_tone: None,
        outreach_message: None,
        sent: false,
        synced_at: None,
        enriched_at: None,
        created_at: Utc::now(),
    };

    diesel::insert_into(leads::table)
        .values(&lead)
        .execute(&mut conn)
        .map_err(db_error)?;

    log_activity(
        &state.conn,
        NewActivity::new(
            Some(user_id),
            Some(organization_id),
            "lead-added",
            format!("Added lead \"{name}\" ({email})"),
        ),
    );

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "lead": lead }))))
}

// PUT/PATCH /api/leads/:id
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLeadRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(name), Some(email)) = (
        req.name.filter(|s| !s.trim().is_empty()),
        req.email.filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(bad_request("Missing required fields"));
    };

    let mut conn = state.conn.get().map_err(db_error)?;

    // Stage is only overwritten when the caller provides one.
    let result = if let Some(stage) = req.stage {
        diesel::update(leads::table.filter(leads::id.eq(id)))
            .set((
                leads::name.eq(name.clone()),
                leads::email.eq(email.clone()),
                leads::title.eq(req.title),
                leads::company.eq(req.company),
                leads::tags.eq(req.tags),
                leads::notes.eq(req.notes),
                leads::stage.eq(stage),
            ))
            .execute(&mut conn)
    } else {
        diesel::update(leads::table.filter(leads::id.eq(id)))
            .set((
                leads::name.eq(name.clone()),
                leads::email.eq(email.clone()),
                leads::title.eq(req.title),
                leads::company.eq(req.company),
                leads::tags.eq(req.tags),
                leads::notes.eq(req.notes),
            ))
            .execute(&mut conn)
    };
    result.map_err(db_error)?;

    log_activity(
        &state.conn,
        NewActivity::new(
            req.user_id,
            req.organization_id,
            "lead-updated",
            format!("Updated lead \"{name}\" ({email})"),
        ),
    );

    Ok(Json(json!({ "success": true })))
}

// DELETE /api/leads/:id
pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<DeleteLeadRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.conn.get().map_err(db_error)?;

    diesel::delete(leads::table.filter(leads::id.eq(id)))
        .execute(&mut conn)
        .map_err(db_error)?;

    log_activity(
        &state.conn,
        NewActivity::new(
            req.user_id,
            req.organization_id,
            "lead-deleted",
            format!("Deleted lead ID {id}"),
        ),
    );

    Ok(Json(json!({ "success": true })))
}

// POST /api/leads/sync
pub async fn sync_lead(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SyncLeadRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let (Some(id), Some(name), Some(email)) = (
        req.id,
        req.name.filter(|s| !s.trim().is_empty()),
        req.email.filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(bad_request("Missing required fields"));
    };

    let contact = ContactFields {
        name: name.clone(),
        email: email.clone(),
        title: req.title,
        company: req.company,
    };

    let outcome = state.crm.sync_contact(&contact).await;
    let (status, sync_error) = match &outcome {
        Ok(()) => (STATUS_SYNCED, None),
        Err(e) => (STATUS_FAILED, Some(e.to_string())),
    };

    // synced_at is stamped on both outcomes; only the status differs.
    let update = {
        let mut conn = match state.conn.get() {
            Ok(conn) => conn,
            Err(e) => return Err(sync_failure(&state, &req.user_id, &req.organization_id, &name, e)),
        };
        diesel::update(leads::table.filter(leads::id.eq(id)))
            .set((
                leads::status.eq(status),
                leads::synced_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
    };
    if let Err(e) = update {
        return Err(sync_failure(&state, &req.user_id, &req.organization_id, &name, e));
    }

    let entry = if outcome.is_ok() {
        NewActivity::new(
            req.user_id,
            req.organization_id,
            "hubspot-sync",
            format!("Synced lead \"{name}\" ({email})"),
        )
    } else {
        NewActivity::new(
            req.user_id,
            req.organization_id,
            "hubspot-sync-failed",
            format!("Failed to sync lead \"{name}\" ({email})"),
        )
        .with_metadata(json!({ "error": sync_error }))
    };
    log_activity(&state.conn, entry);

    Ok(Json(json!({ "success": outcome.is_ok(), "error": sync_error })))
}

fn sync_failure(
    state: &AppState,
    user_id: &Option<Uuid>,
    organization_id: &Option<Uuid>,
    name: &str,
    err: impl std::fmt::Display,
) -> (StatusCode, Json<Value>) {
    log_activity(
        &state.conn,
        NewActivity::new(
            *user_id,
            *organization_id,
            "hubspot-sync-error",
            format!("Exception while syncing lead \"{name}\""),
        )
        .with_metadata(json!({ "error": err.to_string() })),
    );
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": err.to_string() })),
    )
}

// GET /api/dashboard/leads?org_id=
pub async fn dashboard_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(org_id) = query.org_id else {
        return Err(bad_request("Missing org_id"));
    };
    let mut conn = state.conn.get().map_err(db_error)?;

    let rows: Vec<Lead> = leads::table
        .filter(leads::organization_id.eq(org_id))
        .load(&mut conn)
        .map_err(db_error)?;

    Ok(Json(json!({ "leads": rows })))
}
