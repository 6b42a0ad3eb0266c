//! Handler tests against a real PostgreSQL database.
//!
//! Each test acquires its own pool from `DATABASE_URL` and works inside a
//! freshly generated organization, so runs are isolated without cleanup.
//! When the variable is unset or the database is unreachable the tests skip.

use std::sync::{Arc, Once};

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use diesel::prelude::*;
use uuid::Uuid;

use gtmserver::crm::{ContactFields, CrmClient, CrmError};
use gtmserver::leads::{self, CreateLeadRequest, Lead, STATUS_NEW};
use gtmserver::llm::{ChatRequest, LlmError, LlmProvider};
use gtmserver::messages::{self, MarkReadRequest, Message, PostMessageRequest};
use gtmserver::shared::schema::{activity_logs, leads as leads_schema, messages as messages_schema};
use gtmserver::shared::state::AppState;
use gtmserver::shared::utils::{create_conn, run_migrations};
use gtmserver::summary::{self, DailySummaryRequest};
use gtmserver::tags::{self, AssignTagRequest, RemoveTagRequest};

struct CannedLlm(&'static str);

#[async_trait]
impl LlmProvider for CannedLlm {
    async fn complete(&self, _request: ChatRequest) -> Result<String, LlmError> {
        Ok(self.0.to_string())
    }
}

struct AcceptingCrm;

#[async_trait]
impl CrmClient for AcceptingCrm {
    async fn sync_contact(&self, _contact: &ContactFields) -> Result<(), CrmError> {
        Ok(())
    }
}

static MIGRATE: Once = Once::new();

fn test_state(llm_reply: &'static str) -> Option<Arc<AppState>> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = create_conn(&url).ok()?;
    if pool.get().is_err() {
        return None;
    }
    MIGRATE.call_once(|| {
        if let Err(e) = run_migrations(&pool) {
            eprintln!("migrations failed: {e}");
        }
    });
    Some(Arc::new(AppState {
        conn: pool,
        llm: Arc::new(CannedLlm(llm_reply)),
        crm: Arc::new(AcceptingCrm),
    }))
}

async fn create_test_lead(state: &Arc<AppState>, org: Uuid, user: Uuid) -> Lead {
    let (status, Json(body)) = leads::create_lead(
        State(state.clone()),
        Json(CreateLeadRequest {
            name: Some("Jane Doe".to_string()),
            email: Some(format!("jane+{org}@example.com")),
            title: Some("CTO".to_string()),
            company: Some("Acme".to_string()),
            user_id: Some(user),
            organization_id: Some(org),
            tags: Vec::new(),
            notes: String::new(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_value(body["lead"].clone()).unwrap()
}

fn activity_count(state: &Arc<AppState>, org: Uuid, kind: &str) -> i64 {
    let mut conn = state.conn.get().unwrap();
    activity_logs::table
        .filter(activity_logs::organization_id.eq(org))
        .filter(activity_logs::type_.eq(kind))
        .count()
        .get_result(&mut conn)
        .unwrap()
}

#[tokio::test]
async fn created_lead_starts_new_and_is_logged() {
    let Some(state) = test_state("unused") else {
        eprintln!("skipping: DATABASE_URL not set or database unreachable");
        return;
    };
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();

    let lead = create_test_lead(&state, org, user).await;

    assert_eq!(lead.status, STATUS_NEW);
    assert!(lead.synced_at.is_none());
    assert_eq!(activity_count(&state, org, "lead-added"), 1);
}

#[tokio::test]
async fn assigning_same_tag_twice_keeps_one_entry() {
    let Some(state) = test_state("unused") else {
        eprintln!("skipping: DATABASE_URL not set or database unreachable");
        return;
    };
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    let lead = create_test_lead(&state, org, user).await;
    let tag_id = Uuid::new_v4();

    for _ in 0..2 {
        let Json(body) = tags::assign_tag(
            State(state.clone()),
            Json(AssignTagRequest {
                lead_id: Some(lead.id),
                tag_id: Some(tag_id),
                user_id: Some(user),
                organization_id: Some(org),
                label: Some("Hot".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(body["success"], true);
    }

    let mut conn = state.conn.get().unwrap();
    let stored: Lead = leads_schema::table.find(lead.id).first(&mut conn).unwrap();
    assert_eq!(stored.tags, vec![tag_id]);
}

#[tokio::test]
async fn removing_tag_clears_it_from_lead() {
    let Some(state) = test_state("unused") else {
        eprintln!("skipping: DATABASE_URL not set or database unreachable");
        return;
    };
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    let lead = create_test_lead(&state, org, user).await;
    let tag_id = Uuid::new_v4();

    tags::assign_tag(
        State(state.clone()),
        Json(AssignTagRequest {
            lead_id: Some(lead.id),
            tag_id: Some(tag_id),
            user_id: Some(user),
            organization_id: Some(org),
            label: Some("Hot".to_string()),
        }),
    )
    .await
    .unwrap();

    tags::remove_tag(
        State(state.clone()),
        Json(RemoveTagRequest {
            lead_id: Some(lead.id),
            tag: Some(tag_id),
            user_id: Some(user),
            organization_id: Some(org),
        }),
    )
    .await
    .unwrap();

    let mut conn = state.conn.get().unwrap();
    let stored: Lead = leads_schema::table.find(lead.id).first(&mut conn).unwrap();
    assert!(stored.tags.is_empty());
}

#[tokio::test]
async fn assigning_tag_to_missing_lead_is_not_found_and_unlogged() {
    let Some(state) = test_state("unused") else {
        eprintln!("skipping: DATABASE_URL not set or database unreachable");
        return;
    };
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();

    let err = tags::assign_tag(
        State(state.clone()),
        Json(AssignTagRequest {
            lead_id: Some(Uuid::new_v4()),
            tag_id: Some(Uuid::new_v4()),
            user_id: Some(user),
            organization_id: Some(org),
            label: Some("Hot".to_string()),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.0, StatusCode::NOT_FOUND);
    assert_eq!(activity_count(&state, org, "tag-assigned"), 0);
}

#[tokio::test]
async fn read_by_unions_readers_without_duplicates() {
    let Some(state) = test_state("unused") else {
        eprintln!("skipping: DATABASE_URL not set or database unreachable");
        return;
    };
    let org = Uuid::new_v4();
    let author = Uuid::new_v4();
    let reader_a = Uuid::new_v4();
    let reader_b = Uuid::new_v4();

    let (status, Json(body)) = messages::post_message(
        State(state.clone()),
        Json(PostMessageRequest {
            user_id: Some(author),
            organization_id: Some(org),
            content: Some("standup at ten".to_string()),
            type_: None,
            username: Some("jane".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    let message_id: Uuid = serde_json::from_value(body["message"]["id"].clone()).unwrap();

    for reader in [reader_a, reader_a, reader_b] {
        messages::mark_read(
            State(state.clone()),
            Path(message_id),
            Json(MarkReadRequest {
                user_id: Some(reader),
                organization_id: Some(org),
            }),
        )
        .await
        .unwrap();
    }

    let mut conn = state.conn.get().unwrap();
    let stored: Message = messages_schema::table
        .find(message_id)
        .first(&mut conn)
        .unwrap();
    assert_eq!(stored.read_by.len(), 2);
    assert!(stored.read_by.contains(&reader_a));
    assert!(stored.read_by.contains(&reader_b));
}

#[tokio::test]
async fn marking_missing_message_read_is_not_found_and_unlogged() {
    let Some(state) = test_state("unused") else {
        eprintln!("skipping: DATABASE_URL not set or database unreachable");
        return;
    };
    let org = Uuid::new_v4();

    let err = messages::mark_read(
        State(state.clone()),
        Path(Uuid::new_v4()),
        Json(MarkReadRequest {
            user_id: Some(Uuid::new_v4()),
            organization_id: Some(org),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.0, StatusCode::NOT_FOUND);
    assert_eq!(activity_count(&state, org, "message-read"), 0);
}

#[tokio::test]
async fn daily_summary_is_cached_within_window() {
    let Some(state) = test_state("Pipeline looks healthy.") else {
        eprintln!("skipping: DATABASE_URL not set or database unreachable");
        return;
    };
    let org = Uuid::new_v4();

    let Json(first) = summary::daily_summary(
        State(state.clone()),
        Json(DailySummaryRequest {
            organization_id: Some(org),
        }),
    )
    .await
    .unwrap();
    assert_eq!(first["cached"], false);
    assert_eq!(first["summary"], "Pipeline looks healthy.");

    let Json(second) = summary::daily_summary(
        State(state.clone()),
        Json(DailySummaryRequest {
            organization_id: Some(org),
        }),
    )
    .await
    .unwrap();
    assert_eq!(second["cached"], true);
    assert_eq!(second["summary"], "Pipeline looks healthy.");
}
