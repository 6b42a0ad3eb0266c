use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::activity::{log_activity, NewActivity};
use crate::llm::ChatRequest;
use crate::shared::schema::leads;
use crate::shared::state::AppState;
use crate::shared::utils::{bad_request, ApiError};

pub fn outreach_prompt(
    name: &str,
    email: &str,
    company: &str,
    title: Option<&str>,
    persona_summary: &str,
    outreach_tone: &str,
) -> String {
    format!(
        "You are an expert GTM strategist. Craft a personalized cold outreach message based on the following lead data:\n\n\
         Name: {name}\n\
         Title: {title}\n\
         Company: {company}\n\
         Email: {email}\n\
         Persona Summary: {persona_summary}\n\
         Tone: {outreach_tone}\n\n\
         Keep it concise, persuasive, and professional. Return ONLY the email body as plain text.",
        title = title.unwrap_or("N/A"),
    )
}

#[derive(Debug, Deserialize)]
pub struct GenerateOutreachRequest {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub persona_summary: Option<String>,
    pub outreach_tone: Option<String>,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SaveOutreachRequest {
    pub id: Option<Uuid>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkSentRequest {
    pub id: Option<Uuid>,
    pub sent: Option<bool>,
}

// POST /api/generate
//
// Fails closed when enrichment has not run: persona_summary and outreach_tone
// are required alongside the core lead fields.
pub async fn generate_outreach(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateOutreachRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(id), Some(name), Some(email), Some(company), Some(persona_summary), Some(outreach_tone)) = (
        req.id,
        req.name.filter(|s| !s.trim().is_empty()),
        req.email.filter(|s| !s.trim().is_empty()),
        req.company.filter(|s| !s.trim().is_empty()),
        req.persona_summary.filter(|s| !s.trim().is_empty()),
        req.outreach_tone.filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(bad_request("Missing required fields for outreach generation"));
    };

    let prompt = outreach_prompt(
        &name,
        &email,
        &company,
        req.title.as_deref(),
        &persona_summary,
        &outreach_tone,
    );

    let message = match state.llm.complete(ChatRequest::user(prompt)).await {
        Ok(text) => {
            let trimmed = text.trim().to_string();
            if trimmed.is_empty() {
                return Err(ai_failure(
                    &state,
                    &req.user_id,
                    &req.organization_id,
                    &name,
                    &email,
                    "Empty response from model",
                ));
            }
            trimmed
        }
        Err(e) => {
            return Err(ai_failure(
                &state,
                &req.user_id,
                &req.organization_id,
                &name,
                &email,
                e,
            ))
        }
    };

    let update = state.conn.get().map_err(|e| e.to_string()).and_then(|mut conn| {
        diesel::update(leads::table.filter(leads::id.eq(id)))
            .set(leads::outreach_message.eq(&message))
            .execute(&mut conn)
            .map_err(|e| e.to_string())
    });
    if let Err(e) = update {
        return Err(ai_failure(
            &state,
            &req.user_id,
            &req.organization_id,
            &name,
            &email,
            format!("Outreach update failed: {e}"),
        ));
    }

    log_activity(
        &state.conn,
        NewActivity::new(
            req.user_id,
            req.organization_id,
            "ai-outreach",
            format!("Generated outreach message for \"{name}\" ({email})"),
        )
        .with_metadata(json!({
            "company": company,
            "title": req.title,
            "outreach_tone": outreach_tone,
        })),
    );

    Ok(Json(json!({ "success": true, "outreach_message": message })))
}

fn ai_failure(
    state: &AppState,
    user_id: &Option<Uuid>,
    organization_id: &Option<Uuid>,
    name: &str,
    email: &str,
    err: impl std::fmt::Display,
) -> ApiError {
    log_activity(
        &state.conn,
        NewActivity::new(
            *user_id,
            *organization_id,
            "ai-error",
            format!("Failed to generate outreach for \"{name}\" ({email})"),
        )
        .with_metadata(json!({ "error": err.to_string() })),
    );
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to generate outreach message" })),
    )
}

// POST /api/save
pub async fn save_outreach(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveOutreachRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let (Some(id), Some(message)) = (req.id, req.message) else {
        return Err(bad_request("Missing required fields"));
    };

    let mut conn = state.conn.get().map_err(save_failure)?;
    diesel::update(leads::table.filter(leads::id.eq(id)))
        .set(leads::outreach_message.eq(message))
        .execute(&mut conn)
        .map_err(save_failure)?;

    Ok(Json(json!({ "success": true })))
}

// POST /api/sent
pub async fn mark_sent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MarkSentRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let (Some(id), Some(sent)) = (req.id, req.sent) else {
        return Err(bad_request("Missing required fields"));
    };

    let mut conn = state.conn.get().map_err(save_failure)?;
    diesel::update(leads::table.filter(leads::id.eq(id)))
        .set(leads::sent.eq(sent))
        .execute(&mut conn)
        .map_err(save_failure)?;

    Ok(Json(json!({ "success": true })))
}

fn save_failure(err: impl std::fmt::Display) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": err.to_string() })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_uses_na_for_missing_title() {
        let prompt = outreach_prompt("Jane", "jane@x.com", "Acme", None, "VP persona", "warm");
        assert!(prompt.contains("Title: N/A"));
        assert!(prompt.contains("Persona Summary: VP persona"));
        assert!(prompt.contains("Tone: warm"));
    }

    #[test]
    fn prompt_includes_title_when_present() {
        let prompt = outreach_prompt(
            "Jane",
            "jane@x.com",
            "Acme",
            Some("CTO"),
            "persona",
            "direct",
        );
        assert!(prompt.contains("Title: CTO"));
    }
}
