pub mod api;
pub mod backend;
pub mod chargemap;
pub mod config;
pub mod session;

use chargemap::ChargeMapClient;
use config::Config;

pub struct AppState {
    pub config: Config,
    pub chargemap: ChargeMapClient,
}

impl AppState {
    pub fn new(config: Config, chargemap: ChargeMapClient) -> Self {
        Self { config, chargemap }
    }
}
