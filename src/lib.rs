pub mod activity;
pub mod api_router;
pub mod config;
pub mod crm;
pub mod enrichment;
pub mod integrations;
pub mod leads;
pub mod llm;
pub mod messages;
pub mod orgs;
pub mod outreach;
pub mod preferences;
pub mod shared;
pub mod summary;
pub mod tags;
