use crate::crm::CrmClient;
use crate::llm::LlmProvider;
use crate::shared::utils::DbPool;
use std::sync::Arc;

pub struct AppState {
    pub conn: DbPool,
    pub llm: Arc<dyn LlmProvider>,
    pub crm: Arc<dyn CrmClient>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            llm: Arc::clone(&self.llm),
            crm: Arc::clone(&self.crm),
        }
    }
}
