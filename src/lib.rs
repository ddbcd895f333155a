pub mod config;
pub mod error;
pub mod fare;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use services::ai::GeminiClient;
use services::geocode::NominatimClient;
use services::routing::OsrmClient;
use store::GroupStore;

pub use config::Config;
pub use error::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub routing: OsrmClient,
    pub geocoder: NominatimClient,
    pub advisor: Option<GeminiClient>,
    pub groups: GroupStore,
}
