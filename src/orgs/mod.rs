use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::{organizations, user_organizations, users};
use crate::shared::state::AppState;
use crate::shared::utils::{bad_request, db_error, ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = organizations)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_organizations)]
pub struct NewMembership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrgRequest {
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrgQuery {
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OrgUser {
    pub user_id: Uuid,
    pub username: String,
}

// GET /api/org/check/:user_id
//
// Errors and missing memberships both answer inOrg: false.
pub async fn check_membership(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Json<Value> {
    let Ok(mut conn) = state.conn.get() else {
        return Json(json!({ "inOrg": false }));
    };

    let membership: Option<Uuid> = user_organizations::table
        .filter(user_organizations::user_id.eq(user_id))
        .select(user_organizations::organization_id)
        .first(&mut conn)
        .optional()
        .unwrap_or(None);

    match membership {
        Some(org_id) => Json(json!({ "inOrg": true, "orgId": org_id })),
        None => Json(json!({ "inOrg": false })),
    }
}

// POST /api/org/create
pub async fn create_org(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrgRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (Some(user_id), Some(name)) = (req.user_id, req.name.filter(|s| !s.trim().is_empty()))
    else {
        return Err(bad_request("Missing fields"));
    };

    let mut conn = state.conn.get().map_err(db_error)?;

    let org = Organization {
        id: Uuid::new_v4(),
        name,
        created_by: user_id,
        created_at: Utc::now(),
    };

    diesel::insert_into(organizations::table)
        .values(&org)
        .execute(&mut conn)
        .map_err(db_error)?;

    let membership = NewMembership {
        id: Uuid::new_v4(),
        user_id,
        organization_id: org.id,
        role: "admin".to_string(),
        created_at: Utc::now(),
    };

    diesel::insert_into(user_organizations::table)
        .values(&membership)
        .execute(&mut conn)
        .map_err(db_error)?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "org": org }))))
}

// GET /api/org/users?organization_id=
pub async fn list_org_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrgQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(organization_id) = query.organization_id else {
        return Err(bad_request("Missing org id"));
    };
    let mut conn = state.conn.get().map_err(db_error)?;

    let rows: Vec<(Uuid, Option<String>)> = user_organizations::table
        .left_join(users::table)
        .filter(user_organizations::organization_id.eq(organization_id))
        .select((user_organizations::user_id, users::username.nullable()))
        .load(&mut conn)
        .map_err(db_error)?;

    let org_users: Vec<OrgUser> = rows
        .into_iter()
        .map(|(user_id, username)| OrgUser {
            user_id,
            username: username.unwrap_or_else(|| "Anonymous".to_string()),
        })
        .collect();

    Ok(Json(json!({ "users": org_users })))
}
