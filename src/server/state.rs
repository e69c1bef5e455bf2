//! Server state and configuration.

use std::sync::Arc;

use crate::config::TicketConfig;
use crate::error::TicketError;
use crate::font::FontBook;
use crate::loader::AssetLoader;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Directory or base URL the template paths resolve against
    pub asset_root: String,
}

/// Application state shared across handlers.
pub struct AppState {
    pub ticket: Arc<TicketConfig>,
    pub fonts: Arc<FontBook>,
    pub loader: AssetLoader,
}

impl AppState {
    pub fn new(ticket: Arc<TicketConfig>, fonts: Arc<FontBook>, loader: AssetLoader) -> Self {
        Self {
            ticket,
            fonts,
            loader,
        }
    }

    /// Load fonts and set up the asset loader for `ticket`.
    pub fn from_config(config: &ServerConfig, ticket: TicketConfig) -> Result<Self, TicketError> {
        let fonts = FontBook::from_config(&ticket)?;
        let loader = AssetLoader::from_root(&config.asset_root)?;
        Ok(Self::new(Arc::new(ticket), Arc::new(fonts), loader))
    }
}
