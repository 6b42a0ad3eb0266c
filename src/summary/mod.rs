use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::activity::{log_activity, NewActivity};
use crate::leads::{Lead, STATUS_FAILED, STATUS_SYNCED};
use crate::llm::ChatRequest;
use crate::messages::Message;
use crate::shared::schema::{daily_summaries, leads, messages};
use crate::shared::state::AppState;
use crate::shared::utils::{bad_request, db_error, internal_error, ApiError};

const STALENESS_HOURS: i64 = 4;
const SUMMARY_MAX_TOKENS: u32 = 120;

#[derive(Debug, Queryable)]
pub struct DailySummary {
    pub organization_id: Uuid,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct DailySummaryRequest {
    pub organization_id: Option<Uuid>,
}

pub fn is_stale(generated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - generated_at > Duration::hours(STALENESS_HOURS)
}

pub fn recent_lead_names(names: &[String]) -> String {
    if names.is_empty() {
        return "None".to_string();
    }
    let start = names.len().saturating_sub(5);
    names[start..].join(", ")
}

pub fn summary_prompt(unread: usize, synced: usize, failed: usize, new_leads: &str) -> String {
    format!(
        "You are an AI GTM Assistant. Summarize recent org activity in under 3 sentences.\n\n\
         Data:\n\
         - Unread messages: {unread}\n\
         - Leads synced: {synced}\n\
         - Leads failed: {failed}\n\
         - New leads: {new_leads}"
    )
}

// POST /api/summary/daily
//
// The stored summary is reused while fresh; the staleness check is
// check-then-act, so two concurrent requests past the window may both
// regenerate. The upsert makes that harmless.
pub async fn daily_summary(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DailySummaryRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(organization_id) = req.organization_id else {
        return Err(bad_request("Missing organization_id"));
    };

    let existing = {
        let mut conn = state.conn.get().map_err(db_error)?;
        daily_summaries::table
            .find(organization_id)
            .first::<DailySummary>(&mut conn)
            .optional()
            .map_err(db_error)?
    };

    let now = Utc::now();
    if let Some(existing) = existing {
        if !is_stale(existing.generated_at, now) {
            return Ok(Json(json!({ "summary": existing.summary, "cached": true })));
        }
    }

    let (org_messages, org_leads) = {
        let mut conn = state.conn.get().map_err(db_error)?;
        let org_messages: Vec<Message> = messages::table
            .filter(messages::organization_id.eq(organization_id))
            .load(&mut conn)
            .map_err(|_| internal_error("Failed to fetch org data"))?;
        let org_leads: Vec<Lead> = leads::table
            .filter(leads::organization_id.eq(organization_id))
            .order(leads::created_at.asc())
            .load(&mut conn)
            .map_err(|_| internal_error("Failed to fetch org data"))?;
        (org_messages, org_leads)
    };

    let unread = org_messages.iter().filter(|m| m.read_by.is_empty()).count();
    let synced = org_leads.iter().filter(|l| l.status == STATUS_SYNCED).count();
    let failed = org_leads.iter().filter(|l| l.status == STATUS_FAILED).count();
    let names: Vec<String> = org_leads.iter().map(|l| l.name.clone()).collect();
    let new_leads = recent_lead_names(&names);

    let request = ChatRequest::user(summary_prompt(unread, synced, failed, &new_leads))
        .with_system("You summarize GTM performance and collaboration updates for teams.")
        .with_max_tokens(SUMMARY_MAX_TOKENS);

    let summary = match state.llm.complete(request).await {
        Ok(text) => {
            let trimmed = text.trim().to_string();
            if trimmed.is_empty() {
                return Err(internal_error("Failed to generate summary"));
            }
            trimmed
        }
        Err(e) => {
            log::error!("summary generation failed for org {organization_id}: {e}");
            return Err(internal_error("Failed to generate summary"));
        }
    };

    {
        let mut conn = state.conn.get().map_err(db_error)?;
        diesel::insert_into(daily_summaries::table)
            .values((
                daily_summaries::organization_id.eq(organization_id),
                daily_summaries::summary.eq(&summary),
                daily_summaries::generated_at.eq(now),
            ))
            .on_conflict(daily_summaries::organization_id)
            .do_update()
            .set((
                daily_summaries::summary.eq(&summary),
                daily_summaries::generated_at.eq(now),
            ))
            .execute(&mut conn)
            .map_err(db_error)?;
    }

    log_activity(
        &state.conn,
        NewActivity::new(
            None,
            Some(organization_id),
            "summary-generated",
            "AI summary generated for org.",
        ),
    );

    Ok(Json(json!({ "summary": summary, "cached": false })))
}
