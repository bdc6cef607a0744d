pub mod analysis_api_client;
pub mod anam_persona_gateway;
mod http;
pub mod presets;

pub use analysis_api_client::HttpAnalysisGateway;
pub use anam_persona_gateway::{AnamPersonaGateway, StreamConnector};
pub use presets::{find_preset, get_default_presets};
