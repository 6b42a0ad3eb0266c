//! API route table.
//!
//! Mounts every handler from the feature modules into a single router,
//! nested under `/api` by the server entrypoint.

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::shared::state::AppState;

/// The complete application: `/api` routes plus CORS and request tracing.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", configure_api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // ===== Leads =====
        .route(
            "/leads",
            get(crate::leads::list_leads).post(crate::leads::create_lead),
        )
        .route(
            "/leads/:id",
            put(crate::leads::update_lead)
                .patch(crate::leads::update_lead)
                .delete(crate::leads::delete_lead),
        )
        .route("/leads/sync", post(crate::leads::sync_lead))
        .route("/dashboard/leads", get(crate::leads::dashboard_leads))
        // ===== AI enrichment & outreach =====
        .route("/enrich-lead", post(crate::enrichment::enrich_lead))
        .route("/generate", post(crate::outreach::generate_outreach))
        .route("/save", post(crate::outreach::save_outreach))
        .route("/sent", post(crate::outreach::mark_sent))
        // ===== Tags =====
        .route(
            "/tags",
            get(crate::tags::list_tags).post(crate::tags::create_tag),
        )
        .route(
            "/tags/:id",
            patch(crate::tags::update_tag).delete(crate::tags::delete_tag),
        )
        .route("/tags/assign", post(crate::tags::assign_tag))
        .route("/tags/remove", post(crate::tags::remove_tag))
        // ===== Messages =====
        .route(
            "/messages",
            get(crate::messages::list_messages).post(crate::messages::post_message),
        )
        .route("/messages/:id/read", patch(crate::messages::mark_read))
        // ===== Organizations =====
        .route("/org/check/:user_id", get(crate::orgs::check_membership))
        .route("/org/create", post(crate::orgs::create_org))
        .route("/org/users", get(crate::orgs::list_org_users))
        // ===== Preferences =====
        .route("/preferences", post(crate::preferences::save_preferences))
        .route("/preferences/:id", get(crate::preferences::get_preferences))
        // ===== Integrations =====
        .route(
            "/integrations/:id",
            get(crate::integrations::list_integrations)
                .delete(crate::integrations::delete_integration),
        )
        // ===== Daily summary =====
        .route("/summary/daily", post(crate::summary::daily_summary))
}
