use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::activity::{log_activity, NewActivity};
use crate::llm::ChatRequest;
use crate::shared::schema::leads;
use crate::shared::state::AppState;
use crate::shared::utils::{bad_request, db_error, ApiError};

/// First `{...}` block in the model output. The prompt asks for pure JSON but
/// models routinely wrap it in prose, so the block is located before parsing.
static JSON_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

#[derive(Debug, Error)]
pub enum EnrichmentParseError {
    #[error("no JSON block found in AI response")]
    NoJsonBlock,
    #[error("enrichment payload did not match the expected schema: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("lead score {0} is outside the 1-100 range")]
    ScoreOutOfRange(i32),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnrichmentPayload {
    pub persona_summary: String,
    pub lead_score: i32,
    pub outreach_tone: String,
}

pub fn extract_json_block(text: &str) -> Option<&str> {
    JSON_BLOCK.find(text).map(|m| m.as_str())
}

/// Locate and deserialize the enrichment payload, validating the score range
/// before anything is written back to the lead.
pub fn parse_enrichment(text: &str) -> Result<EnrichmentPayload, EnrichmentParseError> {
    let block = extract_json_block(text).ok_or(EnrichmentParseError::NoJsonBlock)?;
    let payload: EnrichmentPayload = serde_json::from_str(block)?;
    if !(1..=100).contains(&payload.lead_score) {
        return Err(EnrichmentParseError::ScoreOutOfRange(payload.lead_score));
    }
    Ok(payload)
}

pub fn enrichment_prompt(name: &str, email: &str, company: &str, title: Option<&str>) -> String {
    let title_line = title
        .map(|t| format!("- Title: {t}\n"))
        .unwrap_or_default();
    format!(
        "You are a lead enrichment expert. Given the following data:\n\n\
         - Name: {name}\n\
         - Email: {email}\n\
         - Company: {company}\n\
         {title_line}\n\
         Generate:\n\
         1. A 1-sentence persona summary.\n\
         2. A lead score (1-100) based on intent.\n\
         3. A suggested outreach tone.\n\n\
         Respond only in JSON format. Example:\n\
         {{\n\
           \"persona_summary\": \"...\",\n\
           \"lead_score\": 87,\n\
           \"outreach_tone\": \"Professional and concise\"\n\
         }}"
    )
}

#[derive(Debug, Deserialize)]
pub struct EnrichLeadRequest {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
}

// POST /api/enrich-lead
pub async fn enrich_lead(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnrichLeadRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(id), Some(name), Some(email), Some(company)) = (
        req.id,
        req.name.filter(|s| !s.trim().is_empty()),
        req.email.filter(|s| !s.trim().is_empty()),
        req.company.filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(bad_request("Missing required lead fields"));
    };

    let prompt = enrichment_prompt(&name, &email, &company, req.title.as_deref());

    let payload = match state.llm.complete(ChatRequest::user(prompt)).await {
        Ok(text) => match parse_enrichment(&text) {
            Ok(payload) => payload,
            Err(e) => {
                return Err(ai_failure(&state, &req.user_id, &req.organization_id, &name, &email, e))
            }
        },
        Err(e) => {
            return Err(ai_failure(&state, &req.user_id, &req.organization_id, &name, &email, e))
        }
    };

    let mut conn = state.conn.get().map_err(db_error)?;
    diesel::update(leads::table.filter(leads::id.eq(id)))
        .set((
            leads::persona_summary.eq(&payload.persona_summary),
            leads::lead_score.eq(payload.lead_score),
            leads::outreach_tone.eq(&payload.outreach_tone),
            leads::enriched_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .map_err(db_error)?;

    log_activity(
        &state.conn,
        NewActivity::new(
            req.user_id,
            req.organization_id,
            "ai-enrichment",
            format!("Enriched lead \"{name}\" ({email})"),
        )
        .with_metadata(json!({
            "lead_score": payload.lead_score,
            "outreach_tone": payload.outreach_tone,
        })),
    );

    Ok(Json(json!({ "success": true, "enrichment": payload })))
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
            format!("Failed to enrich lead \"{name}\" ({email})"),
        )
        .with_metadata(json!({ "error": err.to_string() })),
    );
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to enrich lead", "details": err.to_string() })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_block_from_prose() {
        let text = "Sure! Here you go:\n{\"persona_summary\": \"x\", \"lead_score\": 10, \"outreach_tone\": \"warm\"}\nHope that helps.";
        let block = extract_json_block(text).unwrap();
        assert!(block.starts_with('{'));
        assert!(block.ends_with('}'));
    }

    #[test]
    fn parses_valid_enrichment() {
        let text = r#"{"persona_summary": "VP of Sales at a mid-market SaaS", "lead_score": 87, "outreach_tone": "Professional and concise"}"#;
        let payload = parse_enrichment(text).unwrap();
        assert_eq!(payload.lead_score, 87);
        assert_eq!(payload.outreach_tone, "Professional and concise");
    }

    #[test]
    fn rejects_response_without_json_block() {
        let err = parse_enrichment("I could not produce an answer.").unwrap_err();
        assert!(matches!(err, EnrichmentParseError::NoJsonBlock));
    }

    #[test]
    fn rejects_malformed_payload() {
        let err = parse_enrichment(r#"{"persona_summary": "x"}"#).unwrap_err();
        assert!(matches!(err, EnrichmentParseError::InvalidPayload(_)));
    }

    #[test]
    fn rejects_score_outside_range() {
        let low = r#"{"persona_summary": "x", "lead_score": 0, "outreach_tone": "warm"}"#;
        assert!(matches!(
            parse_enrichment(low).unwrap_err(),
            EnrichmentParseError::ScoreOutOfRange(0)
        ));
        let high = r#"{"persona_summary": "x", "lead_score": 101, "outreach_tone": "warm"}"#;
        assert!(matches!(
            parse_enrichment(high).unwrap_err(),
            EnrichmentParseError::ScoreOutOfRange(101)
        ));
    }

    #[test]
    fn prompt_includes_title_only_when_present() {
        let with_title = enrichment_prompt("Jane", "jane@x.com", "Acme", Some("CTO"));
        assert!(with_title.contains("- Title: CTO"));
        let without_title = enrichment_prompt("Jane", "jane@x.com", "Acme", None);
        assert!(!without_title.contains("- Title:"));
    }
}
