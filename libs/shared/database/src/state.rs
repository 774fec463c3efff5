use std::sync::Arc;

use shared_config::AppConfig;

use crate::supabase::SupabaseClient;

/// Process-wide state handed to every router.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<SupabaseClient>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let db = Arc::new(SupabaseClient::new(&config));
        Self {
            config: Arc::new(config),
            db,
        }
    }
}
