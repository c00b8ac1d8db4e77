use crate::audit::ProgramCatalog;
use crate::config::ServerConfig;
use crate::db::CreditDbManager;

/// Shared state handed to every request handler.
pub struct AppState {
    pub db: CreditDbManager,
    pub catalog: ProgramCatalog,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(db: CreditDbManager, catalog: ProgramCatalog, config: ServerConfig) -> Self {
        Self {
            db,
            catalog,
            config,
        }
    }
}
